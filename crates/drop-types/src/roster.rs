//! Team membership.
//!
//! Loaded once from `team_roster.json`:
//! `{ "<team>": [ { "discord_user": "<identity>", "role": "member" | "leader" }, ... ] }`.
//! Team order in the file is the roster iteration order; identity resolution
//! scans it front to back and the first match wins.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::path::Path;

use crate::ordered::OrderedEntries;

/// Identifier of a team from the fixed roster.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TeamId(String);

impl TeamId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for TeamId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Role of a member within their team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    Member,
    Leader,
}

/// A roster entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Member {
    pub identity: String,
    pub team: TeamId,
    pub role: Role,
}

impl Member {
    pub fn is_leader(&self) -> bool {
        self.role == Role::Leader
    }
}

#[derive(Debug, Deserialize)]
struct MemberRecord {
    discord_user: String,
    #[serde(default)]
    role: Role,
}

/// The closed set of teams and their members.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Roster {
    teams: Vec<TeamId>,
    members: Vec<Member>,
}

impl Roster {
    /// Builds a roster from teams and their members, in iteration order.
    pub fn new(teams: Vec<(TeamId, Vec<(String, Role)>)>) -> Result<Self, RosterError> {
        let mut roster = Roster::default();
        for (team, members) in teams {
            if roster.teams.contains(&team) {
                return Err(RosterError::DuplicateTeam(team.to_string()));
            }
            for (identity, role) in members {
                roster.members.push(Member {
                    identity,
                    team: team.clone(),
                    role,
                });
            }
            roster.teams.push(team);
        }
        Ok(roster)
    }

    /// Parses a `team_roster.json` document.
    pub fn from_json(json: &str) -> Result<Self, RosterError> {
        let raw: OrderedEntries<Vec<MemberRecord>> = serde_json::from_str(json)?;
        let teams = raw
            .into_inner()
            .into_iter()
            .map(|(team, members)| {
                let members = members.into_iter().map(|m| (m.discord_user, m.role)).collect();
                (TeamId::new(team), members)
            })
            .collect();
        Self::new(teams)
    }

    /// Loads a `team_roster.json` file.
    pub fn from_file(path: &Path) -> Result<Self, RosterError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Teams in roster order.
    pub fn teams(&self) -> &[TeamId] {
        &self.teams
    }

    /// Every member entry in roster order.
    pub fn members(&self) -> &[Member] {
        &self.members
    }

    /// Resolves a team by its exact name.
    pub fn team(&self, name: &str) -> Option<&TeamId> {
        self.teams.iter().find(|t| t.as_str() == name)
    }

    /// Returns the first team the identity belongs to.
    pub fn lookup_team(&self, identity: &str) -> Option<&TeamId> {
        self.members
            .iter()
            .find(|m| m.identity == identity)
            .map(|m| &m.team)
    }

    /// Returns the first team in which the identity is a leader.
    pub fn leader_team(&self, identity: &str) -> Option<&TeamId> {
        self.members
            .iter()
            .find(|m| m.identity == identity && m.is_leader())
            .map(|m| &m.team)
    }

    pub fn is_leader(&self, identity: &str) -> bool {
        self.leader_team(identity).is_some()
    }
}

/// Errors that can occur while loading a roster.
#[derive(Debug, thiserror::Error)]
pub enum RosterError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("team '{0}' is listed more than once")]
    DuplicateTeam(String),
}
