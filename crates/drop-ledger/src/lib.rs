//! Drop ledger and scoring engine.
//!
//! Turns a stream of (team, boss, drop) reports into per-drop occurrence
//! counters and per-team point totals under a diminishing-returns rule:
//! repeated identical drops are worth half once a team has recorded them past
//! the boss's threshold (1 occurrence, or 4 for extended-tier bosses).
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  award/remove  ┌────────────┐  save   ┌──────────────┐
//! │ chat / CLI   │ ─────────────▶ │ Scoreboard │ ──────▶ │ Store (JSON) │
//! └──────────────┘                └────────────┘         └──────────────┘
//!        │  identity                   ▲
//!        └──▶ Tracker (roster, admin) ─┘
//! ```
//!
//! # Modules
//!
//! - [`rules`]: The diminishing-value rule
//! - [`ledger`]: Occurrence counters, team totals, full recount
//! - [`scoreboard`]: Award, remove, recalculate, stats, leaderboard
//! - [`store`]: Pair-atomic JSON persistence
//! - [`access`]: Admin authorization
//! - [`reset`]: Two-phase reset confirmation
//! - [`config`]: TOML configuration
//! - [`report`]: Caller-facing text

pub mod access;
pub mod config;
pub mod error;
pub mod ledger;
pub mod report;
pub mod reset;
pub mod rules;
pub mod scoreboard;
pub mod store;

// Re-export engine types
pub use error::LedgerError;
pub use ledger::{recount, Ledger, LedgerEntry, LedgerState, TeamTotals};
pub use rules::{award_value, cumulative_value, is_repeat, Tier, EXTENDED_THRESHOLD, STANDARD_THRESHOLD};
pub use scoreboard::{AwardResult, DropCount, RemoveResult, Scoreboard, SharedScoreboard, TeamStats};

// Re-export persistence types
pub use store::{JsonFileStore, MemoryStore, Store, StoreError, StoredState};

// Re-export access and reset types
pub use access::{AllowList, Authorizer};
pub use reset::{PendingReset, ResetGate};

// Re-export config types
pub use config::{default_config_toml, ConfigError, TrackerConfig};

use drop_types::{BossDefinition, Catalog, CatalogError, Points, Roster, RosterError, TeamId};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

/// Errors that can occur while setting up a [`Tracker`].
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    /// Error loading configuration
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    /// Error loading the boss catalog
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),
    /// Error loading the team roster
    #[error("Roster error: {0}")]
    Roster(#[from] RosterError),
    /// Error reading stored state
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Command entry point used by chat handlers, scheduled jobs and the CLI.
///
/// Resolves member identities to teams, checks admin and leader rights, and
/// forwards to the shared [`Scoreboard`].
pub struct Tracker {
    scoreboard: SharedScoreboard,
    catalog: Arc<Catalog>,
    roster: Arc<Roster>,
    authorizer: Box<dyn Authorizer>,
    resets: Mutex<ResetGate>,
}

impl std::fmt::Debug for Tracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tracker")
            .field("scoreboard", &self.scoreboard)
            .finish_non_exhaustive()
    }
}

impl Tracker {
    /// Creates a tracker around an already loaded scoreboard.
    pub fn new(scoreboard: Scoreboard, authorizer: Box<dyn Authorizer>, resets: ResetGate) -> Self {
        let catalog = Arc::clone(scoreboard.catalog());
        let roster = Arc::clone(scoreboard.roster());
        Self {
            scoreboard: SharedScoreboard::new(scoreboard),
            catalog,
            roster,
            authorizer,
            resets: Mutex::new(resets),
        }
    }

    /// Loads catalog, roster and stored state as described by `config`.
    pub fn from_config(config: &TrackerConfig) -> Result<Self, TrackerError> {
        let files = &config.files;
        let catalog = Catalog::from_file(&files.catalog, &config.scoring.extended_tier_bosses)?;
        for name in &config.scoring.extended_tier_bosses {
            if catalog.boss(name).is_none() {
                warn!(boss = %name, "Extended-tier boss is not in the catalog");
            }
        }
        let roster = Roster::from_file(&files.roster)?;
        info!(
            bosses = catalog.len(),
            teams = roster.teams().len(),
            members = roster.members().len(),
            "Loaded catalog and roster"
        );

        let store = JsonFileStore::new(&files.ledger, &files.totals);
        let scoreboard = Scoreboard::load(Arc::new(catalog), Arc::new(roster), Box::new(store))?;
        let admins = AllowList::new(config.access.admins.iter().cloned());
        if admins.is_empty() {
            warn!("No admins configured; admin commands are disabled");
        }

        Ok(Self::new(
            scoreboard,
            Box::new(admins),
            ResetGate::new(config.reset.confirm_window()),
        ))
    }

    /// Creates a tracker from a configuration file.
    pub fn from_config_file(path: &std::path::Path) -> Result<Self, TrackerError> {
        let config = TrackerConfig::from_file(path)?;
        Self::from_config(&config)
    }

    pub fn scoreboard(&self) -> &SharedScoreboard {
        &self.scoreboard
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// Re-reads stored state, picking up changes made by other processes.
    pub fn refresh(&self) -> Result<(), StoreError> {
        self.scoreboard.reload()
    }

    /// Team the identity belongs to. First roster match wins.
    pub fn resolve_team(&self, identity: &str) -> Result<TeamId, LedgerError> {
        self.roster
            .lookup_team(identity)
            .cloned()
            .ok_or_else(|| LedgerError::UnknownTeam(identity.to_string()))
    }

    pub fn is_authorized(&self, identity: &str) -> bool {
        self.authorizer.is_authorized(identity)
    }

    /// A member reports a drop for their own team.
    pub fn report_drop(&self, identity: &str, boss: &str, drop: &str) -> Result<AwardResult, LedgerError> {
        let team = self.resolve_team(identity)?;
        info!(identity, team = %team, boss, drop, "Drop reported");
        self.scoreboard.award(team.as_str(), boss, drop)
    }

    /// An admin adds a drop to any team.
    pub fn admin_award(
        &self,
        identity: &str,
        team: &str,
        boss: &str,
        drop: &str,
    ) -> Result<AwardResult, LedgerError> {
        self.require_admin(identity)?;
        info!(identity, team, boss, drop, "Admin drop");
        self.scoreboard.award(team, boss, drop)
    }

    /// A team leader removes a drop from the team they lead.
    pub fn leader_remove(&self, identity: &str, boss: &str, drop: &str) -> Result<RemoveResult, LedgerError> {
        let team = self
            .roster
            .leader_team(identity)
            .cloned()
            .ok_or_else(|| LedgerError::Unauthorized(identity.to_string()))?;
        info!(identity, team = %team, boss, drop, "Leader removal");
        self.scoreboard.remove(team.as_str(), boss, drop)
    }

    /// An admin removes a drop from any team.
    pub fn admin_remove(
        &self,
        identity: &str,
        team: &str,
        boss: &str,
        drop: &str,
    ) -> Result<RemoveResult, LedgerError> {
        self.require_admin(identity)?;
        info!(identity, team, boss, drop, "Admin removal");
        self.scoreboard.remove(team, boss, drop)
    }

    /// An admin rebuilds every total from the ledger.
    pub fn recalculate(&self, identity: &str) -> Result<(), LedgerError> {
        self.require_admin(identity)?;
        self.scoreboard.recalculate_all()
    }

    /// Stats of the identity's own team.
    pub fn my_team_stats(&self, identity: &str) -> Result<TeamStats, LedgerError> {
        let team = self.resolve_team(identity)?;
        self.scoreboard.team_stats(team.as_str())
    }

    pub fn team_stats(&self, team: &str) -> Result<TeamStats, LedgerError> {
        self.scoreboard.team_stats(team)
    }

    pub fn all_team_stats(&self) -> Vec<TeamStats> {
        self.scoreboard.all_team_stats()
    }

    pub fn leaderboard(&self) -> Vec<(TeamId, Points)> {
        self.scoreboard.leaderboard()
    }

    /// Catalog entry of one boss.
    pub fn boss(&self, name: &str) -> Result<&BossDefinition, LedgerError> {
        self.catalog
            .boss(name)
            .ok_or_else(|| LedgerError::UnknownBoss(name.to_string()))
    }

    /// Full catalog listing, admin only.
    pub fn all_bosses(&self, identity: &str) -> Result<&[BossDefinition], LedgerError> {
        self.require_admin(identity)?;
        Ok(self.catalog.bosses())
    }

    /// First phase of a reset: an admin asks for a confirmation token.
    pub fn request_reset(&self, identity: &str) -> Result<PendingReset, LedgerError> {
        self.request_reset_at(identity, Instant::now())
    }

    /// Second phase of a reset: the same admin confirms and all data is wiped.
    pub fn confirm_reset(&self, token: Uuid, identity: &str) -> Result<(), LedgerError> {
        self.confirm_reset_at(token, identity, Instant::now())
    }

    /// Discards a pending reset.
    pub fn cancel_reset(&self, token: Uuid, identity: &str) -> Result<(), LedgerError> {
        self.lock_resets().cancel(token, identity, Instant::now())?;
        info!(identity, "Reset cancelled");
        Ok(())
    }

    pub fn request_reset_at(&self, identity: &str, now: Instant) -> Result<PendingReset, LedgerError> {
        self.require_admin(identity)?;
        let mut resets = self.lock_resets();
        let pending = resets.request(identity, now);
        info!(
            identity,
            token = %pending.token,
            window_secs = resets.window().as_secs(),
            "Reset requested"
        );
        Ok(pending)
    }

    pub fn confirm_reset_at(&self, token: Uuid, identity: &str, now: Instant) -> Result<(), LedgerError> {
        self.lock_resets().confirm(token, identity, now)?;
        warn!(identity, "Reset confirmed, clearing all team data");
        self.scoreboard.reset()
    }

    fn require_admin(&self, identity: &str) -> Result<(), LedgerError> {
        if self.authorizer.is_authorized(identity) {
            Ok(())
        } else {
            warn!(identity, "Unauthorized admin command");
            Err(LedgerError::Unauthorized(identity.to_string()))
        }
    }

    fn lock_resets(&self) -> std::sync::MutexGuard<'_, ResetGate> {
        self.resets.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drop_types::fixtures;
    use rust_decimal::Decimal;
    use std::time::Duration;

    fn tracker() -> Tracker {
        let scoreboard = Scoreboard::in_memory(
            Arc::new(fixtures::sample_catalog()),
            Arc::new(fixtures::sample_roster()),
        );
        Tracker::new(
            scoreboard,
            Box::new(AllowList::new(fixtures::sample_admins())),
            ResetGate::new(Duration::from_secs(30)),
        )
    }

    #[test]
    fn test_report_drop_uses_member_team() {
        let tracker = tracker();
        let result = tracker.report_drop("featherfall", "Zulrah", "magic fang").unwrap();

        assert_eq!(result.team.as_str(), "Team Armadyl");
        assert_eq!(tracker.team_stats("Team Armadyl").unwrap().total_points, Decimal::from(10));
    }

    #[test]
    fn test_report_drop_unknown_member() {
        let tracker = tracker();
        assert!(matches!(
            tracker.report_drop("stranger", "Zulrah", "Magic fang"),
            Err(LedgerError::UnknownTeam(_))
        ));
    }

    #[test]
    fn test_duplicate_identity_resolves_to_first_team() {
        let tracker = tracker();
        assert_eq!(tracker.resolve_team("doubleagent").unwrap().as_str(), "Team Bandos");

        let result = tracker.report_drop("doubleagent", "Vorkath", "Jar of decay").unwrap();
        assert_eq!(result.team.as_str(), "Team Bandos");
        assert_eq!(tracker.team_stats("Team Zamorak").unwrap().total_points, Decimal::ZERO);
    }

    #[test]
    fn test_admin_commands_require_allow_list() {
        let tracker = tracker();

        assert!(matches!(
            tracker.admin_award("featherfall", "Team Zaros", "Zulrah", "Magic fang"),
            Err(LedgerError::Unauthorized(_))
        ));
        assert!(matches!(tracker.recalculate("nexling"), Err(LedgerError::Unauthorized(_))));
        assert!(tracker.all_bosses("nexling").is_err());

        tracker.admin_award("dufwha", "Team Zaros", "Zulrah", "Magic fang").unwrap();
        assert_eq!(tracker.leaderboard()[0].0.as_str(), "Team Zaros");
        assert_eq!(tracker.all_bosses("dufwha").unwrap().len(), 5);
    }

    #[test]
    fn test_admin_award_unknown_team() {
        let tracker = tracker();
        assert!(matches!(
            tracker.admin_award("dufwha", "Team Guthix", "Zulrah", "Magic fang"),
            Err(LedgerError::UnknownTeam(_))
        ));
    }

    #[test]
    fn test_leader_remove_requires_leader() {
        let tracker = tracker();
        tracker.report_drop("holyhalo", "Vorkath", "Jar of decay").unwrap();

        assert!(matches!(
            tracker.leader_remove("holyhalo", "Vorkath", "Jar of decay"),
            Err(LedgerError::Unauthorized(_))
        ));

        let removed = tracker.leader_remove("dufwha", "Vorkath", "Jar of decay").unwrap();
        assert_eq!(removed.team.as_str(), "Team Saradomin");
        assert_eq!(removed.removed_points, Decimal::from(15));
    }

    #[test]
    fn test_leader_remove_uses_led_team() {
        let tracker = tracker();
        tracker.admin_award("dufwha", "Team Zamorak", "Zulrah", "Magic fang").unwrap();

        // doubleagent is a member of Bandos but leads Zamorak
        let removed = tracker.leader_remove("doubleagent", "Zulrah", "Magic fang").unwrap();
        assert_eq!(removed.team.as_str(), "Team Zamorak");
    }

    #[test]
    fn test_two_phase_reset() {
        let tracker = tracker();
        tracker.report_drop("nexling", "Zulrah", "Pet snakeling").unwrap();
        let now = Instant::now();

        assert!(tracker.request_reset_at("nexling", now).is_err());
        let pending = tracker.request_reset_at("smacksmackk", now).unwrap();

        assert!(matches!(
            tracker.confirm_reset_at(pending.token, "dufwha", now),
            Err(LedgerError::Unauthorized(_))
        ));
        assert_eq!(tracker.team_stats("Team Zaros").unwrap().total_points, Decimal::from(50));

        tracker.confirm_reset_at(pending.token, "smacksmackk", now).unwrap();
        assert_eq!(tracker.team_stats("Team Zaros").unwrap().total_points, Decimal::ZERO);
    }

    #[test]
    fn test_expired_reset_keeps_data() {
        let tracker = tracker();
        tracker.report_drop("nexling", "Zulrah", "Pet snakeling").unwrap();
        let now = Instant::now();
        let pending = tracker.request_reset_at("dufwha", now).unwrap();

        let late = now + Duration::from_secs(31);
        assert!(matches!(
            tracker.confirm_reset_at(pending.token, "dufwha", late),
            Err(LedgerError::ResetExpired)
        ));
        assert_eq!(tracker.team_stats("Team Zaros").unwrap().total_points, Decimal::from(50));
    }

    #[test]
    fn test_injected_authorizer() {
        let scoreboard = Scoreboard::in_memory(
            Arc::new(fixtures::sample_catalog()),
            Arc::new(fixtures::sample_roster()),
        );
        let roster = fixtures::sample_roster();
        let leaders_are_admins = move |identity: &str| roster.is_leader(identity);
        let tracker = Tracker::new(scoreboard, Box::new(leaders_are_admins), ResetGate::default());

        assert!(tracker.is_authorized("nexling"));
        assert!(!tracker.is_authorized("ancientone"));
    }

    #[test]
    fn test_my_team_stats() {
        let tracker = tracker();
        tracker.report_drop("goblinking", "Vorkath", "Vorkath's head").unwrap();

        let stats = tracker.my_team_stats("goblinking").unwrap();
        assert_eq!(stats.team.as_str(), "Team Bandos");
        assert_eq!(stats.drops.len(), 1);
    }
}
