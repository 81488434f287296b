//! Lenient decimal coercion for remote monetary fields.
//!
//! The remote platform is inconsistent about numeric fields: `total_spent`
//! arrives as a string, variant prices sometimes as numbers, and any of them
//! may be missing or null. Ingestion must not fail on malformed input, so
//! every monetary field is coerced: missing, null, or unparsable values
//! become zero.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Coerce a raw JSON value into a [`Decimal`], defaulting to zero.
///
/// Accepts JSON strings (`"199.99"`) and numbers (`199.99`); everything else
/// - null, objects, arrays, booleans, garbage strings - coerces to zero.
#[must_use]
pub fn coerce_decimal(raw: &Value) -> Decimal {
    match raw {
        Value::String(s) => s.trim().parse().unwrap_or(Decimal::ZERO),
        // Going through the literal representation keeps the exact decimal
        // digits instead of routing through f64.
        Value::Number(n) => n.to_string().parse().unwrap_or(Decimal::ZERO),
        _ => Decimal::ZERO,
    }
}

/// Clamp a decimal below at zero.
///
/// Customer lifetime spend and product prices are non-negative; a negative
/// remote value is malformed input and coerces to zero.
#[must_use]
pub fn non_negative(value: Decimal) -> Decimal {
    value.max(Decimal::ZERO)
}

/// Serde `deserialize_with` helper for lenient monetary fields.
///
/// Combine with `#[serde(default)]` so a missing field also lands on zero:
///
/// ```rust,ignore
/// #[serde(default, deserialize_with = "tidepool_core::money::lenient")]
/// total_spent: Decimal,
/// ```
///
/// # Errors
///
/// Never fails on malformed values; only on a malformed JSON stream.
pub fn lenient<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Value::deserialize(deserializer)?;
    Ok(coerce_decimal(&raw))
}
