//! Entity kinds synced from the remote platform.

use serde::{Deserialize, Serialize};

/// The three remote collections a sync ingests, in their fixed ingestion
/// order: customers, then products, then orders.
///
/// Used to tag fetch failures and to label per-entity counts in sync
/// reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Customer,
    Product,
    Order,
}

impl EntityKind {
    /// All kinds in ingestion order.
    pub const ORDERED: [Self; 3] = [Self::Customer, Self::Product, Self::Order];

    /// Stable lowercase name, matching the serde representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Product => "product",
            Self::Order => "order",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
