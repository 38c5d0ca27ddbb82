//! Occurrence counters and team totals.
//!
//! [`Ledger`] maps team → boss → drop → occurrence count. A zero count is
//! never stored: decrementing to zero removes the drop entry, and the boss
//! entry with it once empty. [`TeamTotals`] holds the derived point total of
//! each team.

use drop_types::{Catalog, Points, Roster, TeamId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

use crate::rules::{cumulative_value, Tier};

/// Drop name → occurrence count.
pub type DropCounts = BTreeMap<String, u32>;

/// Boss name → drop counts.
pub type BossCounts = BTreeMap<String, DropCounts>;

/// One (team, boss, drop) counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub team: TeamId,
    pub boss: String,
    pub drop: String,
    pub count: u32,
}

/// Per-team, per-boss, per-drop occurrence counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ledger {
    teams: BTreeMap<TeamId, BossCounts>,
}

impl Ledger {
    /// Creates a ledger with an empty record for every roster team.
    pub fn for_roster(roster: &Roster) -> Self {
        let mut ledger = Self::default();
        ledger.ensure_teams(roster);
        ledger
    }

    /// Adds an empty record for roster teams that have none.
    pub fn ensure_teams(&mut self, roster: &Roster) {
        for team in roster.teams() {
            self.teams.entry(team.clone()).or_default();
        }
    }

    /// Current count, zero when absent.
    pub fn count(&self, team: &str, boss: &str, drop: &str) -> u32 {
        self.teams
            .get(team)
            .and_then(|bosses| bosses.get(boss))
            .and_then(|drops| drops.get(drop))
            .copied()
            .unwrap_or(0)
    }

    /// Records one more occurrence and returns the new count.
    pub fn increment(&mut self, team: &TeamId, boss: &str, drop: &str) -> u32 {
        let count = self
            .teams
            .entry(team.clone())
            .or_default()
            .entry(boss.to_string())
            .or_default()
            .entry(drop.to_string())
            .or_insert(0);
        *count += 1;
        *count
    }

    /// Removes one occurrence and returns the remaining count, or `None` if
    /// there was nothing to remove. Empty entries are pruned.
    pub fn decrement(&mut self, team: &str, boss: &str, drop: &str) -> Option<u32> {
        let bosses = self.teams.get_mut(team)?;
        let drops = bosses.get_mut(boss)?;
        let count = drops.get_mut(drop)?;
        if *count == 0 {
            return None;
        }
        *count -= 1;
        let remaining = *count;
        if remaining == 0 {
            drops.remove(drop);
            if drops.is_empty() {
                bosses.remove(boss);
            }
        }
        Some(remaining)
    }

    /// Counters of one team, keyed by boss.
    pub fn team(&self, team: &str) -> Option<&BossCounts> {
        self.teams.get(team)
    }

    /// Teams that have a record, including ones outside the roster.
    pub fn teams(&self) -> impl Iterator<Item = &TeamId> {
        self.teams.keys()
    }

    /// Every non-zero counter, ordered by team, boss and drop.
    pub fn entries(&self) -> impl Iterator<Item = LedgerEntry> + '_ {
        self.teams.iter().flat_map(|(team, bosses)| {
            bosses.iter().flat_map(move |(boss, drops)| {
                drops
                    .iter()
                    .filter(|(_, count)| **count > 0)
                    .map(move |(drop, count)| LedgerEntry {
                        team: team.clone(),
                        boss: boss.clone(),
                        drop: drop.clone(),
                        count: *count,
                    })
            })
        })
    }

    /// Drops explicit zero counts and boss records left empty by them.
    ///
    /// Loaded files may have been edited by hand.
    pub fn prune_zeros(&mut self) {
        for bosses in self.teams.values_mut() {
            for drops in bosses.values_mut() {
                drops.retain(|_, count| *count > 0);
            }
            bosses.retain(|_, drops| !drops.is_empty());
        }
    }

    /// Total number of recorded occurrences across all teams.
    pub fn total_occurrences(&self) -> u64 {
        self.entries().map(|e| u64::from(e.count)).sum()
    }
}

/// Derived point total per team.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TeamTotals {
    teams: BTreeMap<TeamId, Points>,
}

impl TeamTotals {
    /// Creates a zero total for every roster team.
    pub fn for_roster(roster: &Roster) -> Self {
        let mut totals = Self::default();
        totals.ensure_teams(roster);
        totals
    }

    /// Adds a zero total for roster teams that have none.
    pub fn ensure_teams(&mut self, roster: &Roster) {
        for team in roster.teams() {
            self.teams.entry(team.clone()).or_insert(Decimal::ZERO);
        }
    }

    /// Current total, zero when absent.
    pub fn get(&self, team: &str) -> Points {
        self.teams.get(team).copied().unwrap_or(Decimal::ZERO)
    }

    pub fn add(&mut self, team: &TeamId, points: Points) {
        *self.teams.entry(team.clone()).or_insert(Decimal::ZERO) += points;
    }

    pub fn subtract(&mut self, team: &TeamId, points: Points) {
        *self.teams.entry(team.clone()).or_insert(Decimal::ZERO) -= points;
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TeamId, Points)> {
        self.teams.iter().map(|(team, points)| (team, *points))
    }
}

/// The mutable state the scoring engine owns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LedgerState {
    pub ledger: Ledger,
    pub totals: TeamTotals,
    /// Incremented on every persisted mutation
    pub generation: u64,
}

impl LedgerState {
    /// Empty ledger and zero totals for every roster team.
    pub fn empty(roster: &Roster) -> Self {
        Self {
            ledger: Ledger::for_roster(roster),
            totals: TeamTotals::for_roster(roster),
            generation: 0,
        }
    }
}

/// Recomputes every roster team's total from the ledger.
///
/// Each occurrence contributes its own value under the diminishing rule, so
/// the result always equals what incremental awarding would have produced.
/// Entries for unknown bosses, unknown drops, or teams outside the roster
/// contribute nothing.
pub fn recount(catalog: &Catalog, roster: &Roster, ledger: &Ledger) -> TeamTotals {
    let mut totals = TeamTotals::for_roster(roster);

    for entry in ledger.entries() {
        let Some(team) = roster.team(entry.team.as_str()) else {
            warn!(team = %entry.team, "Skipping ledger team that is not in the roster");
            continue;
        };
        let (boss, drop) = match catalog.lookup_drop(&entry.boss, &entry.drop) {
            Ok(found) => found,
            Err(e) => {
                warn!(team = %team, boss = %entry.boss, drop = %entry.drop, "Skipping ledger entry: {}", e);
                continue;
            }
        };
        totals.add(team, cumulative_value(drop.base_points, Tier::of(boss), entry.count));
    }

    totals
}
