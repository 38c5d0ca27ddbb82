//! Caller-facing text.
//!
//! Everything here is presentation: point values are rendered with
//! [`format_points`], which drops the fractional part of integral values.

use drop_types::{format_points, BossDefinition, Points, TeamId};
use rust_decimal::Decimal;

use crate::rules::Tier;
use crate::scoreboard::{AwardResult, RemoveResult, TeamStats};

/// English ordinal: 1st, 2nd, 3rd, 4th, 11th, 21st.
pub fn ordinal(n: u32) -> String {
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{}{}", n, suffix)
}

/// Announcement for a recorded drop.
pub fn award_message(result: &AwardResult) -> String {
    let points = format_points(result.awarded_points);
    match (result.is_repeat, result.tier) {
        (false, _) => format!(
            "{} from {} is worth {} points! Added to {}.",
            result.drop, result.boss, points, result.team
        ),
        (true, Tier::Extended) => {
            let nth = ordinal(result.occurrence);
            format!(
                "Congratulations on a {} drop! {} from {} is worth {} points since it is a {} drop! Added to {}.",
                nth, result.drop, result.boss, points, nth, result.team
            )
        }
        (true, Tier::Standard) => format!(
            "Congratulations on a duplicate drop! {} from {} is worth {} points since it is a duplicate! Added to {}.",
            result.drop, result.boss, points, result.team
        ),
    }
}

/// Confirmation for a removed drop.
pub fn remove_message(result: &RemoveResult) -> String {
    format!(
        "Removed 1 {} from {} for {} (-{} points).",
        result.drop,
        result.boss,
        result.team,
        format_points(result.removed_points)
    )
}

/// Multi-line stats block for one team.
pub fn team_stats_text(stats: &TeamStats) -> String {
    let mut text = format!("{} Stats\n", stats.team);
    for entry in &stats.drops {
        text.push_str(&format!(
            "- {} from {}: {} times\n",
            entry.drop, entry.boss, entry.count
        ));
    }
    text.push_str(&format!("Total Points: {}\n", format_points(stats.total_points)));
    text
}

/// One line per team, in leaderboard order.
pub fn leaderboard_lines(board: &[(TeamId, Points)]) -> Vec<String> {
    board
        .iter()
        .map(|(team, points)| format!("{}: {} points", team, format_points(*points)))
        .collect()
}

/// Catalog listing for one boss.
pub fn boss_text(boss: &BossDefinition) -> String {
    let mut text = format!("{} Drops", boss.name);
    if boss.extended_tier {
        text.push_str(" (full value for the first 4)");
    }
    text.push('\n');
    for drop in &boss.drops {
        text.push_str(&format!(
            "  {}: Points: {}\n",
            drop.name,
            format_points(drop.base_points)
        ));
    }
    text
}

/// Top three of a leaderboard.
#[derive(Debug, Clone, PartialEq)]
pub struct Standings {
    /// `None` while every team is still at zero
    pub leader: Option<(TeamId, Points)>,
    pub second: Option<(TeamId, Points)>,
    pub third: Option<(TeamId, Points)>,
}

impl Standings {
    /// Expects a leaderboard sorted highest first.
    pub fn from_leaderboard(board: &[(TeamId, Points)]) -> Self {
        let all_zero = board.iter().all(|(_, p)| *p == Decimal::ZERO);
        Self {
            leader: if all_zero { None } else { board.first().cloned() },
            second: board.get(1).cloned(),
            third: board.get(2).cloned(),
        }
    }

    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![match &self.leader {
            Some((team, points)) => {
                format!("Current Leader: {} with {} points.", team, format_points(*points))
            }
            None => "No team is currently leading.".to_string(),
        }];
        if let Some((team, points)) = &self.second {
            lines.push(format!("Second Place: {} with {} points.", team, format_points(*points)));
        }
        if let Some((team, points)) = &self.third {
            lines.push(format!("Third Place: {} with {} points.", team, format_points(*points)));
        }
        lines
    }
}
