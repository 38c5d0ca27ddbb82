//! The diminishing-value rule.
//!
//! A drop is worth its full base value until the team has recorded it
//! `threshold` times; every later occurrence is worth half. There is exactly
//! one halving, however far past the threshold the count goes. Award, removal
//! and full recount all go through [`award_value`].

use drop_types::{halve, BossDefinition, Points};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Prior occurrences at full value for a standard boss.
pub const STANDARD_THRESHOLD: u32 = 1;

/// Prior occurrences at full value for an extended-tier boss.
pub const EXTENDED_THRESHOLD: u32 = 4;

/// Diminishing-rule class of a boss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Standard,
    Extended,
}

impl Tier {
    pub fn of(boss: &BossDefinition) -> Self {
        if boss.extended_tier {
            Tier::Extended
        } else {
            Tier::Standard
        }
    }

    /// Number of occurrences awarded at full value.
    pub fn threshold(self) -> u32 {
        match self {
            Tier::Standard => STANDARD_THRESHOLD,
            Tier::Extended => EXTENDED_THRESHOLD,
        }
    }
}

/// True if an occurrence recorded after `prior_count` others is a repeat.
pub fn is_repeat(tier: Tier, prior_count: u32) -> bool {
    prior_count >= tier.threshold()
}

/// Value awarded for the occurrence that follows `prior_count` earlier ones.
pub fn award_value(base_points: Points, tier: Tier, prior_count: u32) -> Points {
    if is_repeat(tier, prior_count) {
        halve(base_points)
    } else {
        base_points
    }
}

/// Value that was awarded for the most recent of `count` occurrences.
///
/// Returns `None` when there is nothing recorded.
pub fn last_award_value(base_points: Points, tier: Tier, count: u32) -> Option<Points> {
    count
        .checked_sub(1)
        .map(|prior| award_value(base_points, tier, prior))
}

/// Sum of every occurrence's individual award for `count` occurrences.
///
/// Equal to awarding `count` times in sequence: the first `threshold`
/// occurrences at full value, the rest at half.
pub fn cumulative_value(base_points: Points, tier: Tier, count: u32) -> Points {
    let threshold = tier.threshold();
    let full = Decimal::from(count.min(threshold)) * base_points;
    let halved = Decimal::from(count.saturating_sub(threshold)) * halve(base_points);
    full + halved
}
