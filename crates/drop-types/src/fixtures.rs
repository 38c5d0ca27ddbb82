//! Sample data fixtures for testing.
//!
//! Enable the `test-fixtures` feature to access these helpers.
//!
//! # Example
//!
//! ```ignore
//! // In your Cargo.toml:
//! // [dev-dependencies]
//! // drop-types = { path = "../drop-types", features = ["test-fixtures"] }
//!
//! use drop_types::fixtures;
//!
//! let catalog = fixtures::sample_catalog();
//! let roster = fixtures::sample_roster();
//! ```

use crate::{Catalog, Roster};

/// Extended-tier bosses in the sample catalog.
pub const SAMPLE_EXTENDED_TIER: &[&str] = &["Barrows Chests", "Moons of Peril"];

/// Raw `drops.json` used by [`sample_catalog`].
pub const SAMPLE_DROPS_JSON: &str = include_str!("../tests/fixtures/drops.json");

/// Raw `team_roster.json` used by [`sample_roster`].
pub const SAMPLE_ROSTER_JSON: &str = include_str!("../tests/fixtures/team_roster.json");

/// Returns the sample catalog.
///
/// Contains 5 bosses:
/// - Barrows Chests and Moons of Peril (extended tier)
/// - Vorkath, Zulrah
/// - Chambers of Xeric, including a fractional 25.5 point drop
pub fn sample_catalog() -> Catalog {
    Catalog::from_json(SAMPLE_DROPS_JSON, SAMPLE_EXTENDED_TIER)
        .expect("Failed to parse sample drops.json")
}

/// Returns the sample roster.
///
/// Contains 5 teams with one leader each. `doubleagent` is (invalidly) listed
/// on both Team Bandos, as a member, and Team Zamorak, as a leader.
pub fn sample_roster() -> Roster {
    Roster::from_json(SAMPLE_ROSTER_JSON).expect("Failed to parse sample team_roster.json")
}

/// Admin identities that pair with the sample roster.
pub fn sample_admins() -> Vec<String> {
    vec![
        "smacksmackk".to_string(),
        "titaniumbutter".to_string(),
        "dufwha".to_string(),
    ]
}
