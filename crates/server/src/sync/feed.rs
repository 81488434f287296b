//! Read port over the remote platform.
//!
//! The orchestrator never talks to HTTP directly: it consumes pages through
//! [`RemoteFeed`] and builds one feed per tenant through [`FeedFactory`].
//! Tests script these ports with fakes; production wires them to
//! `shopify::RestClient`.

use crate::shopify::ShopifyError;
use crate::shopify::types::{RemoteCustomer, RemoteOrder, RemoteProduct};

use super::store::TenantCredentials;

/// One page of decoded remote records plus the opaque cursor for the next
/// page, if any. A `None` cursor ends the collection.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<String>,
}

/// Paginated, authenticated reader of one tenant's remote collections.
///
/// Each call fetches one page; passing `None` restarts at the first page, so
/// a fresh sync always performs a full refresh. Implementations handle their
/// own transient-failure retries and surface only escalated errors.
// Callers are always concrete (the REST client in production, scripted fakes
// in tests), so the futures' auto traits resolve at the call site.
#[allow(async_fn_in_trait)]
pub trait RemoteFeed: Send + Sync {
    async fn customers_page(
        &self,
        cursor: Option<&str>,
    ) -> Result<Page<RemoteCustomer>, ShopifyError>;

    async fn products_page(&self, cursor: Option<&str>)
    -> Result<Page<RemoteProduct>, ShopifyError>;

    async fn orders_page(&self, cursor: Option<&str>) -> Result<Page<RemoteOrder>, ShopifyError>;
}

/// Builds a [`RemoteFeed`] for one tenant's credentials.
pub trait FeedFactory: Send + Sync {
    type Feed: RemoteFeed;

    fn feed(&self, credentials: &TenantCredentials) -> Self::Feed;
}
