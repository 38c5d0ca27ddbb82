//! Two-phase reset confirmation.
//!
//! Wiping the ledger takes a request followed by a confirmation from the same
//! identity within a time window. Each request gets its own token.

use std::collections::HashMap;
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::error::LedgerError;

/// Default confirmation window.
pub const DEFAULT_CONFIRM_WINDOW: Duration = Duration::from_secs(60);

/// An issued, not yet confirmed reset request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingReset {
    pub token: Uuid,
    pub initiator: String,
    pub expires_at: Instant,
}

/// Tracks outstanding reset requests.
#[derive(Debug)]
pub struct ResetGate {
    window: Duration,
    pending: HashMap<Uuid, PendingReset>,
}

impl Default for ResetGate {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIRM_WINDOW)
    }
}

impl ResetGate {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: HashMap::new(),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Issues a new token for `initiator`.
    pub fn request(&mut self, initiator: &str, now: Instant) -> PendingReset {
        self.pending.retain(|_, p| p.expires_at > now);
        let pending = PendingReset {
            token: Uuid::new_v4(),
            initiator: initiator.to_string(),
            expires_at: now + self.window,
        };
        self.pending.insert(pending.token, pending.clone());
        pending
    }

    /// Consumes the token if `confirmer` issued it and it has not expired.
    ///
    /// A confirmation by someone else leaves the request pending.
    pub fn confirm(&mut self, token: Uuid, confirmer: &str, now: Instant) -> Result<(), LedgerError> {
        self.take(token, confirmer, now).map(|_| ())
    }

    /// Discards the request. Only the initiator may cancel.
    pub fn cancel(&mut self, token: Uuid, identity: &str, now: Instant) -> Result<(), LedgerError> {
        self.take(token, identity, now).map(|_| ())
    }

    /// Number of requests still awaiting confirmation.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    fn take(&mut self, token: Uuid, identity: &str, now: Instant) -> Result<PendingReset, LedgerError> {
        let pending = self.pending.get(&token).ok_or(LedgerError::UnknownResetToken)?;
        if pending.initiator != identity {
            return Err(LedgerError::Unauthorized(identity.to_string()));
        }
        let expired = now >= pending.expires_at;
        let pending = self
            .pending
            .remove(&token)
            .ok_or(LedgerError::UnknownResetToken)?;
        if expired {
            return Err(LedgerError::ResetExpired);
        }
        Ok(pending)
    }
}
