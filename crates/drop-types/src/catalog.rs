//! Boss and drop reference data.
//!
//! The catalog is loaded once at startup from a `drops.json` file shaped as
//! `{ "<boss>": [ { "drop": "<name>", "points": <number> }, ... ], ... }` and
//! never changes afterwards. Whether a boss is extended-tier is not part of
//! that file; callers supply the list of extended-tier boss names.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::ordered::OrderedEntries;
use crate::points::Points;

/// A single rewardable drop of a boss.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DropDefinition {
    /// Canonical drop name, unique within its boss
    #[serde(rename = "drop")]
    pub name: String,
    /// Value of a first (non-repeat) occurrence
    #[serde(rename = "points")]
    pub base_points: Points,
}

impl DropDefinition {
    pub fn new(name: impl Into<String>, base_points: Points) -> Self {
        Self {
            name: name.into(),
            base_points,
        }
    }

    /// Case-insensitive exact comparison against a user-supplied name.
    pub fn matches(&self, name: &str) -> bool {
        self.name == name || self.name.to_lowercase() == name.to_lowercase()
    }
}

/// A boss and the drops it can award.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BossDefinition {
    pub name: String,
    /// Drops in catalog order
    pub drops: Vec<DropDefinition>,
    /// Extended-tier bosses keep full value for the first four occurrences
    pub extended_tier: bool,
}

impl BossDefinition {
    pub fn new(name: impl Into<String>, drops: Vec<DropDefinition>, extended_tier: bool) -> Self {
        Self {
            name: name.into(),
            drops,
            extended_tier,
        }
    }

    /// Finds a drop by case-insensitive name.
    pub fn drop(&self, name: &str) -> Option<&DropDefinition> {
        self.drops.iter().find(|d| d.matches(name))
    }
}

/// Immutable collection of bosses.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Catalog {
    bosses: Vec<BossDefinition>,
}

impl Catalog {
    /// Builds a catalog, rejecting duplicate bosses, duplicate drop names
    /// within a boss, and non-positive point values.
    pub fn new(bosses: Vec<BossDefinition>) -> Result<Self, CatalogError> {
        for (i, boss) in bosses.iter().enumerate() {
            if bosses[..i].iter().any(|b| b.name == boss.name) {
                return Err(CatalogError::DuplicateBoss(boss.name.clone()));
            }
            for (j, drop) in boss.drops.iter().enumerate() {
                if drop.base_points <= Decimal::ZERO {
                    return Err(CatalogError::NonPositivePoints {
                        boss: boss.name.clone(),
                        drop: drop.name.clone(),
                    });
                }
                if boss.drops[..j].iter().any(|d| d.matches(&drop.name)) {
                    return Err(CatalogError::DuplicateDrop {
                        boss: boss.name.clone(),
                        drop: drop.name.clone(),
                    });
                }
            }
        }
        Ok(Self { bosses })
    }

    /// Parses a `drops.json` document.
    ///
    /// Bosses named in `extended_tier_bosses` get the extended-tier flag.
    pub fn from_json<S: AsRef<str>>(
        json: &str,
        extended_tier_bosses: &[S],
    ) -> Result<Self, CatalogError> {
        let raw: OrderedEntries<Vec<DropDefinition>> = serde_json::from_str(json)?;
        let bosses = raw
            .into_inner()
            .into_iter()
            .map(|(name, drops)| {
                let extended_tier = extended_tier_bosses.iter().any(|b| b.as_ref() == name);
                BossDefinition::new(name, drops, extended_tier)
            })
            .collect();
        Self::new(bosses)
    }

    /// Loads a `drops.json` file.
    pub fn from_file<S: AsRef<str>>(
        path: &Path,
        extended_tier_bosses: &[S],
    ) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content, extended_tier_bosses)
    }

    /// All bosses in catalog order.
    pub fn bosses(&self) -> &[BossDefinition] {
        &self.bosses
    }

    /// Finds a boss by exact name.
    pub fn boss(&self, name: &str) -> Option<&BossDefinition> {
        self.bosses.iter().find(|b| b.name == name)
    }

    /// Resolves a drop. The boss name must match exactly; the drop name is
    /// matched case-insensitively and resolves to the canonical definition.
    pub fn lookup_drop(
        &self,
        boss: &str,
        drop: &str,
    ) -> Result<(&BossDefinition, &DropDefinition), LookupError> {
        let boss_def = self
            .boss(boss)
            .ok_or_else(|| LookupError::UnknownBoss(boss.to_string()))?;
        let drop_def = boss_def.drop(drop).ok_or_else(|| LookupError::UnknownDrop {
            boss: boss.to_string(),
            drop: drop.to_string(),
        })?;
        Ok((boss_def, drop_def))
    }

    pub fn len(&self) -> usize {
        self.bosses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bosses.is_empty()
    }
}

/// A failed catalog lookup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    #[error("boss '{0}' not found")]
    UnknownBoss(String),
    #[error("drop '{drop}' not found for {boss}")]
    UnknownDrop { boss: String, drop: String },
}

/// Errors that can occur while loading a catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("boss '{0}' is listed more than once")]
    DuplicateBoss(String),
    #[error("drop '{drop}' is listed more than once for {boss}")]
    DuplicateDrop { boss: String, drop: String },
    #[error("drop '{drop}' of {boss} must be worth more than zero points")]
    NonPositivePoints { boss: String, drop: String },
}
