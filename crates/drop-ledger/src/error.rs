//! Engine error taxonomy.

use drop_types::LookupError;

use crate::store::StoreError;

/// Errors returned by scoreboard and tracker operations.
///
/// None of these are fatal: the engine stays usable after any of them. All
/// variants except [`LedgerError::Persistence`] guarantee that no state was
/// changed.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Boss name not in the catalog
    #[error("boss '{0}' not found")]
    UnknownBoss(String),
    /// Drop name not listed for the boss
    #[error("drop '{drop}' not found for {boss}")]
    UnknownDrop { boss: String, drop: String },
    /// Team name or member identity not in the roster
    #[error("'{0}' not found in any team roster")]
    UnknownTeam(String),
    /// Removal requested for a drop the team has no occurrences of
    #[error("no {drop} from {boss} recorded for {team} to remove")]
    NothingToRemove {
        team: String,
        boss: String,
        drop: String,
    },
    /// Caller lacks the admin or leader rights the operation requires
    #[error("'{0}' does not have permission to do that")]
    Unauthorized(String),
    /// Reset confirmation with a token that was never issued or already used
    #[error("no pending reset matches that confirmation")]
    UnknownResetToken,
    /// Reset confirmation arrived after the confirmation window closed
    #[error("the reset confirmation window has expired")]
    ResetExpired,
    /// The change is applied in memory but may not survive a restart
    #[error("change applied but not saved: {0}")]
    Persistence(#[from] StoreError),
}

impl From<LookupError> for LedgerError {
    fn from(e: LookupError) -> Self {
        match e {
            LookupError::UnknownBoss(boss) => LedgerError::UnknownBoss(boss),
            LookupError::UnknownDrop { boss, drop } => LedgerError::UnknownDrop { boss, drop },
        }
    }
}

impl LedgerError {
    /// Returns true if in-memory state was changed before the error occurred.
    pub fn state_changed(&self) -> bool {
        matches!(self, LedgerError::Persistence(_))
    }
}
