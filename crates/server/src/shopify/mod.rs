//! Shopify Admin REST client.
//!
//! Authenticated, paginated reader of one tenant's remote entity
//! collections. Consumes the REST surface only:
//!
//! - `GET /admin/api/{version}/customers.json`
//! - `GET /admin/api/{version}/products.json`
//! - `GET /admin/api/{version}/orders.json?status=any`
//!
//! with the `X-Shopify-Access-Token` header. Pagination follows the opaque
//! `page_info` cursor from the `Link` response header until none remains;
//! no cursor survives across syncs, so every sync is a full refresh.
//!
//! # Failure handling
//!
//! - 429 retries with exponential backoff and jitter (honoring
//!   `Retry-After`), bounded by the configured retry count, then escalates.
//! - 401/403 fail immediately as a permanent credential failure.
//! - Other network/timeout/5xx failures retry with the same bound.
//!
//! No error is swallowed here; the sync orchestrator tags escalated errors
//! with the entity kind being fetched.

mod rest;
pub mod types;

pub use rest::{RestClient, RestFeedFactory};

use thiserror::Error;

/// Errors that can occur when reading from the Shopify REST API.
#[derive(Debug, Error)]
pub enum ShopifyError {
    /// HTTP transport failed (connect, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body was not the expected JSON shape.
    #[error("unexpected response shape: {0}")]
    Decode(String),

    /// Rate limited by the remote platform.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Authentication/authorization failed. Permanent; never retried.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Remote returned an unexpected status.
    #[error("API error (status {status}): {body}")]
    Api { status: u16, body: String },

    /// The bounded retry budget ran out on a transient failure.
    #[error("retries exhausted after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: Box<ShopifyError>,
    },
}

impl ShopifyError {
    /// Whether retrying can never help (credential failures).
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }
}
