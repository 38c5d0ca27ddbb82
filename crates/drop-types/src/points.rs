//! Point values.
//!
//! Points are exact decimals so that halving a base value never drifts.
//! Rendering drops the fractional part of integral values; that only happens
//! here, at the display boundary, never inside scoring arithmetic.

use rust_decimal::Decimal;

/// A point amount. Serialized as a JSON number.
pub type Points = Decimal;

/// Returns half of a point value, exactly.
pub fn halve(points: Points) -> Points {
    points / Decimal::TWO
}

/// Formats points without trailing zeros: `10`, `2.5`, `12.75`.
pub fn format_points(points: Points) -> String {
    points.normalize().to_string()
}
