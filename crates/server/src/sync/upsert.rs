//! Idempotent batch application with skip-and-log semantics.
//!
//! The upserter walks one decoded page at a time, converts each remote
//! record, and commits it individually. A record that fails to store is
//! logged and skipped - per-record problems never abort the batch. Only the
//! count of records actually committed is reported.

use tidepool_core::TenantId;
use tracing::warn;

use crate::shopify::types::{RemoteCustomer, RemoteOrder, RemoteProduct};

use super::convert;
use super::store::SyncStore;

/// Applies decoded remote batches through a [`SyncStore`].
pub struct Upserter<'a, S> {
    store: &'a S,
}

impl<'a, S: SyncStore> Upserter<'a, S> {
    #[must_use]
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Upsert a batch of customers, returning the number committed.
    pub async fn apply_customers(&self, tenant_id: TenantId, batch: Vec<RemoteCustomer>) -> u64 {
        let mut committed = 0;
        for remote in batch {
            let record = convert::customer_record(remote);
            match self.store.upsert_customer(tenant_id, &record).await {
                Ok(()) => committed += 1,
                Err(error) => warn!(
                    %tenant_id,
                    external_id = %record.external_id,
                    %error,
                    "skipping customer upsert"
                ),
            }
        }
        committed
    }

    /// Upsert a batch of products, returning the number committed.
    pub async fn apply_products(&self, tenant_id: TenantId, batch: Vec<RemoteProduct>) -> u64 {
        let mut committed = 0;
        for remote in batch {
            let record = convert::product_record(remote);
            match self.store.upsert_product(tenant_id, &record).await {
                Ok(()) => committed += 1,
                Err(error) => warn!(
                    %tenant_id,
                    external_id = %record.external_id,
                    %error,
                    "skipping product upsert"
                ),
            }
        }
        committed
    }

    /// Upsert a batch of orders, returning the number committed.
    pub async fn apply_orders(&self, tenant_id: TenantId, batch: Vec<RemoteOrder>) -> u64 {
        let mut committed = 0;
        for remote in batch {
            let record = convert::order_record(remote);
            match self.store.upsert_order(tenant_id, &record).await {
                Ok(()) => committed += 1,
                Err(error) => warn!(
                    %tenant_id,
                    external_id = %record.external_id,
                    %error,
                    "skipping order upsert"
                ),
            }
        }
        committed
    }
}
