//! Durable storage for the ledger and team totals.
//!
//! The two records live in separate JSON files so each can be read on its
//! own, but they are written as a pair: each file goes to a temporary sibling
//! that is synced and then renamed over the target, ledger first. Both
//! records carry the same generation number, so a crash between the two
//! renames shows up on the next load as a generation mismatch and the totals
//! are rebuilt from the ledger.
//!
//! Files without a generation, the bare maps written by earlier versions of the
//! bot, are accepted as-is.

use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::ledger::{Ledger, LedgerState, TeamTotals};

/// State as read back from storage, before consistency checks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoredState {
    pub ledger: Ledger,
    pub totals: TeamTotals,
    /// `None` when the ledger record is absent or unversioned
    pub ledger_generation: Option<u64>,
    /// `None` when the totals record is absent or unversioned
    pub totals_generation: Option<u64>,
    pub ledger_present: bool,
    pub totals_present: bool,
}

impl StoredState {
    /// True when both records come from the same write.
    ///
    /// A pair with only one record present is never consistent, whatever its
    /// generation.
    pub fn is_consistent(&self) -> bool {
        self.ledger_present == self.totals_present
            && self.ledger_generation == self.totals_generation
    }

    /// Highest generation seen in either record.
    pub fn generation(&self) -> u64 {
        self.ledger_generation
            .max(self.totals_generation)
            .unwrap_or(0)
    }
}

/// Persistence backend for the scoring engine.
pub trait Store: Send + Sync {
    /// Reads both records. Absent records load as empty, not as errors.
    fn load(&self) -> Result<StoredState, StoreError>;

    /// Writes both records so that a later load sees both or detects the gap.
    fn save(&mut self, state: &LedgerState) -> Result<(), StoreError>;
}

/// On-disk record: either versioned or a bare map.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Record<T> {
    Versioned { generation: u64, teams: T },
    Bare(T),
}

#[derive(Serialize)]
struct RecordRef<'a, T> {
    generation: u64,
    teams: &'a T,
}

/// Stores the ledger and totals as two JSON files.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    ledger_path: PathBuf,
    totals_path: PathBuf,
}

impl JsonFileStore {
    pub fn new(ledger_path: impl Into<PathBuf>, totals_path: impl Into<PathBuf>) -> Self {
        Self {
            ledger_path: ledger_path.into(),
            totals_path: totals_path.into(),
        }
    }

    /// Uses the default file names inside `dir`.
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(
            dir.join("team_drop_counts.json"),
            dir.join("team_total_points.json"),
        )
    }

    pub fn ledger_path(&self) -> &Path {
        &self.ledger_path
    }

    pub fn totals_path(&self) -> &Path {
        &self.totals_path
    }
}

impl Store for JsonFileStore {
    fn load(&self) -> Result<StoredState, StoreError> {
        let (ledger, ledger_generation) = read_record::<Ledger>(&self.ledger_path)?;
        let (totals, totals_generation) = read_record::<TeamTotals>(&self.totals_path)?;
        Ok(StoredState {
            ledger_present: ledger.is_some(),
            totals_present: totals.is_some(),
            ledger: ledger.unwrap_or_default(),
            totals: totals.unwrap_or_default(),
            ledger_generation,
            totals_generation,
        })
    }

    fn save(&mut self, state: &LedgerState) -> Result<(), StoreError> {
        write_record(&self.ledger_path, state.generation, &state.ledger)?;
        write_record(&self.totals_path, state.generation, &state.totals)?;
        debug!(generation = state.generation, "Saved ledger and totals");
        Ok(())
    }
}

fn read_record<T>(path: &Path) -> Result<(Option<T>, Option<u64>), StoreError>
where
    T: for<'de> Deserialize<'de>,
{
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok((None, None)),
        Err(e) => return Err(StoreError::io(path, e)),
    };
    let record: Record<T> =
        serde_json::from_str(&content).map_err(|e| StoreError::json(path, e))?;
    Ok(match record {
        Record::Versioned { generation, teams } => (Some(teams), Some(generation)),
        Record::Bare(teams) => (Some(teams), None),
    })
}

fn write_record<T: Serialize>(path: &Path, generation: u64, teams: &T) -> Result<(), StoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
    }

    let tmp_path = temp_path(path);
    let file = File::create(&tmp_path).map_err(|e| StoreError::io(&tmp_path, e))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &RecordRef { generation, teams })
        .map_err(|e| StoreError::json(&tmp_path, e))?;
    writer.flush().map_err(|e| StoreError::io(&tmp_path, e))?;
    let file = writer
        .into_inner()
        .map_err(|e| StoreError::io(&tmp_path, e.into_error()))?;
    file.sync_all().map_err(|e| StoreError::io(&tmp_path, e))?;

    fs::rename(&tmp_path, path).map_err(|e| StoreError::io(path, e))
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Keeps the last saved state in memory. For tests and dry runs.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    saved: Option<LedgerState>,
    saves: u64,
    fail_writes: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from previously saved state.
    pub fn with_state(state: LedgerState) -> Self {
        Self {
            saved: Some(state),
            ..Self::default()
        }
    }

    /// Makes every subsequent save fail.
    pub fn failing() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    pub fn set_fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    pub fn saved(&self) -> Option<&LedgerState> {
        self.saved.as_ref()
    }

    /// Number of successful saves.
    pub fn save_count(&self) -> u64 {
        self.saves
    }
}

impl Store for MemoryStore {
    fn load(&self) -> Result<StoredState, StoreError> {
        Ok(match &self.saved {
            Some(state) => StoredState {
                ledger: state.ledger.clone(),
                totals: state.totals.clone(),
                ledger_generation: Some(state.generation),
                totals_generation: Some(state.generation),
                ledger_present: true,
                totals_present: true,
            },
            None => StoredState::default(),
        })
    }

    fn save(&mut self, state: &LedgerState) -> Result<(), StoreError> {
        if self.fail_writes {
            return Err(StoreError::Unavailable("memory store is read-only".to_string()));
        }
        self.saved = Some(state.clone());
        self.saves += 1;
        Ok(())
    }
}

/// Errors that can occur while reading or writing stored state.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("JSON error in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    fn json(path: &Path, source: serde_json::Error) -> Self {
        StoreError::Json {
            path: path.to_path_buf(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drop_types::{fixtures, TeamId};
    use rust_decimal::Decimal;
    use tempfile::tempdir;

    fn sample_state() -> LedgerState {
        let roster = fixtures::sample_roster();
        let mut state = LedgerState::empty(&roster);
        let zaros = TeamId::new("Team Zaros");
        state.ledger.increment(&zaros, "Zulrah", "Magic fang");
        state.totals.add(&zaros, Decimal::new(125, 1));
        state.generation = 3;
        state
    }

    #[test]
    fn test_missing_files_load_empty() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::in_dir(dir.path());

        let loaded = store.load().unwrap();
        assert_eq!(loaded, StoredState::default());
        assert!(loaded.is_consistent());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let mut store = JsonFileStore::in_dir(dir.path());
        let state = sample_state();

        store.save(&state).unwrap();
        let loaded = store.load().unwrap();

        assert_eq!(loaded.ledger, state.ledger);
        assert_eq!(loaded.totals, state.totals);
        assert_eq!(loaded.generation(), 3);
        assert!(loaded.is_consistent());
    }

    #[test]
    fn test_no_temp_files_left_behind() {
        let dir = tempdir().unwrap();
        let mut store = JsonFileStore::in_dir(dir.path());
        store.save(&sample_state()).unwrap();

        let names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 2);
        assert!(names.iter().all(|n| !n.ends_with(".tmp")));
    }

    #[test]
    fn test_generation_mismatch_detected() {
        let dir = tempdir().unwrap();
        let mut store = JsonFileStore::in_dir(dir.path());
        let mut state = sample_state();
        store.save(&state).unwrap();

        // Simulate a crash after the ledger rename of the next save.
        state.generation = 4;
        write_record(store.ledger_path(), state.generation, &state.ledger).unwrap();

        let loaded = store.load().unwrap();
        assert!(!loaded.is_consistent());
        assert_eq!(loaded.generation(), 4);
    }

    #[test]
    fn test_loads_legacy_bare_maps() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("team_drop_counts.json"),
            r#"{ "Team Zaros": { "Zulrah": { "Magic fang": 2 } }, "Team Bandos": {} }"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("team_total_points.json"),
            r#"{ "Team Zaros": 15.0, "Team Bandos": 0 }"#,
        )
        .unwrap();

        let loaded = JsonFileStore::in_dir(dir.path()).load().unwrap();

        assert!(loaded.is_consistent());
        assert_eq!(loaded.ledger.count("Team Zaros", "Zulrah", "Magic fang"), 2);
        assert_eq!(loaded.totals.get("Team Zaros"), Decimal::from(15));
    }

    #[test]
    fn test_legacy_ledger_without_totals_is_inconsistent() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("team_drop_counts.json"),
            r#"{ "Team Bandos": { "Vorkath": { "Draconic visage": 2 } } }"#,
        )
        .unwrap();

        let loaded = JsonFileStore::in_dir(dir.path()).load().unwrap();

        assert!(loaded.ledger_present);
        assert!(!loaded.totals_present);
        assert_eq!(loaded.ledger_generation, None);
        assert!(!loaded.is_consistent());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("team_total_points.json"), "{ not json").unwrap();

        let err = JsonFileStore::in_dir(dir.path()).load().unwrap_err();
        assert!(matches!(err, StoreError::Json { .. }));
    }

    #[test]
    fn test_memory_store_failing() {
        let mut store = MemoryStore::failing();
        assert!(store.save(&sample_state()).is_err());
        assert_eq!(store.save_count(), 0);

        store.set_fail_writes(false);
        store.save(&sample_state()).unwrap();
        assert_eq!(store.saved().unwrap().generation, 3);
    }
}
