//! Remote record types, decoded leniently.
//!
//! The remote platform sends monetary fields as strings, numbers, or null
//! depending on the endpoint and record age. Malformed input must degrade,
//! not abort ingestion, so every monetary field goes through
//! [`tidepool_core::money::lenient`] (missing/null/unparsable coerces to
//! zero) and timestamps through an equally forgiving parser.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tidepool_core::money;

/// A customer as returned by `customers.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteCustomer {
    pub id: i64,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    /// Lifetime spend; a string on the wire ("199.99").
    #[serde(default, deserialize_with = "money::lenient")]
    pub total_spent: Decimal,
}

/// A product variant; only the price is ingested.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteVariant {
    #[serde(default, deserialize_with = "money::lenient")]
    pub price: Decimal,
}

/// A product as returned by `products.json`.
///
/// The stored price is the first variant's price, matching how the shop
/// presents a default variant.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteProduct {
    pub id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub variants: Vec<RemoteVariant>,
}

/// The customer stub embedded in an order. Only the id is carried; the
/// reference stays nullable and unenforced locally.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteOrderCustomer {
    pub id: i64,
}

/// An order as returned by `orders.json?status=any`.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteOrder {
    pub id: i64,
    #[serde(default, rename = "total_price", deserialize_with = "money::lenient")]
    pub total: Decimal,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub customer: Option<RemoteOrderCustomer>,
    /// When the order was placed, remote-side. `None` when missing or
    /// unparsable; the conversion layer falls back to sync time.
    #[serde(default, deserialize_with = "lenient_datetime")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Parse an RFC 3339 timestamp, treating anything malformed as absent.
fn lenient_datetime<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Value::deserialize(deserializer)?;
    Ok(raw.as_str().and_then(|s| {
        DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }))
}
