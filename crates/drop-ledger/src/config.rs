//! Configuration loading for the tracker.
//!
//! All tracker settings are loaded from a TOML configuration file. Every
//! section is optional and falls back to its defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Complete tracker configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Data file locations
    #[serde(default)]
    pub files: FilesConfig,
    /// Scoring rule settings
    #[serde(default)]
    pub scoring: ScoringConfig,
    /// Admin access settings
    #[serde(default)]
    pub access: AccessConfig,
    /// Reset confirmation settings
    #[serde(default)]
    pub reset: ResetConfig,
    /// Scheduled leaderboard announcements
    #[serde(default)]
    pub announce: AnnounceConfig,
}

impl TrackerConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parses configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Loads `path` if it exists, otherwise returns the defaults.
    pub fn from_file_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Serializes the configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Data file locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilesConfig {
    /// Boss and drop catalog
    pub catalog: PathBuf,
    /// Team roster
    pub roster: PathBuf,
    /// Persisted occurrence counters
    pub ledger: PathBuf,
    /// Persisted team totals
    pub totals: PathBuf,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            catalog: PathBuf::from("drops.json"),
            roster: PathBuf::from("team_roster.json"),
            ledger: PathBuf::from("team_drop_counts.json"),
            totals: PathBuf::from("team_total_points.json"),
        }
    }
}

impl FilesConfig {
    /// Resolves relative paths against `base`.
    pub fn relative_to(&self, base: &Path) -> Self {
        let join = |p: &PathBuf| {
            if p.is_absolute() {
                p.clone()
            } else {
                base.join(p)
            }
        };
        Self {
            catalog: join(&self.catalog),
            roster: join(&self.roster),
            ledger: join(&self.ledger),
            totals: join(&self.totals),
        }
    }
}

/// Scoring rule settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Bosses that keep full value for the first four occurrences
    pub extended_tier_bosses: Vec<String>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            extended_tier_bosses: vec!["Barrows Chests".to_string(), "Moons of Peril".to_string()],
        }
    }
}

/// Admin access settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessConfig {
    /// Identities allowed to run admin commands
    pub admins: Vec<String>,
}

/// Reset confirmation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResetConfig {
    /// Seconds a reset request stays open for confirmation
    pub confirm_window_secs: u64,
}

impl Default for ResetConfig {
    fn default() -> Self {
        Self {
            confirm_window_secs: 60,
        }
    }
}

impl ResetConfig {
    pub fn confirm_window(&self) -> Duration {
        Duration::from_secs(self.confirm_window_secs)
    }
}

/// Scheduled leaderboard announcements.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnounceConfig {
    /// Minutes between announcements
    pub interval_minutes: u64,
}

impl Default for AnnounceConfig {
    fn default() -> Self {
        Self {
            interval_minutes: 60,
        }
    }
}

impl AnnounceConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_minutes.max(1) * 60)
    }
}

/// Errors that can occur during configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error reading config file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Error parsing TOML config
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    /// Error serializing TOML config
    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

/// Generates a default configuration file content.
pub fn default_config_toml() -> String {
    r#"# Drop Tracker Configuration

[files]
catalog = "drops.json"
roster = "team_roster.json"
ledger = "team_drop_counts.json"
totals = "team_total_points.json"

[scoring]
extended_tier_bosses = ["Barrows Chests", "Moons of Peril"]

[access]
admins = []

[reset]
confirm_window_secs = 60

[announce]
interval_minutes = 60
"#
    .to_string()
}
