//! Shared reference data for the drop tracker.
//!
//! This crate contains pure data structures with no scoring logic: the boss
//! catalog, the team roster, and the point type. It is a dependency for all
//! other crates in the workspace.

pub mod catalog;
pub mod ordered;
pub mod points;
pub mod roster;

#[cfg(any(test, feature = "test-fixtures"))]
pub mod fixtures;

// Re-export catalog types
pub use catalog::{BossDefinition, Catalog, CatalogError, DropDefinition, LookupError};

// Re-export roster types
pub use roster::{Member, Role, Roster, RosterError, TeamId};

// Re-export point helpers
pub use points::{format_points, halve, Points};

pub use ordered::OrderedEntries;
