//! Multi-tenant ingestion/synchronization core.
//!
//! A sync pulls one tenant's customers, products, and orders from the remote
//! platform and merges them into the local store. The moving parts:
//!
//! - [`feed`] - the read port over the remote API and the factory that
//!   builds one feed per tenant (implemented by `shopify::RestClient`)
//! - [`store`] - the write port over local storage and the credential
//!   lookup port (implemented by the db repositories)
//! - [`guard`] - per-tenant mutual exclusion; at most one sync per tenant
//! - [`upsert`] - idempotent per-record merge with skip-and-log semantics
//! - [`orchestrator`] - drives one run: guard, credentials, customers,
//!   products, orders, in that fixed order
//!
//! Every sync is a full refresh: no cursor persists between runs, nothing is
//! ever deleted, and re-running against unchanged remote data is a no-op on
//! business fields. A failed run reports the counts it committed; the
//! recovery path is an idempotent re-run, not rollback.

pub mod convert;
pub mod feed;
pub mod guard;
pub mod orchestrator;
pub mod store;
pub mod upsert;

pub use guard::SyncGuard;
pub use orchestrator::SyncOrchestrator;

use serde::Serialize;
use thiserror::Error;
use tidepool_core::{EntityKind, TenantId};

use crate::db::RepositoryError;
use crate::shopify::ShopifyError;

/// Per-entity counts of records committed by a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub customers: u64,
    pub products: u64,
    pub orders: u64,
}

/// A failed run: what went wrong plus everything committed before it did.
///
/// Committed upserts are never rolled back, so the partial counts are real
/// rows; the caller re-runs to finish the job.
#[derive(Debug)]
pub struct SyncFailure {
    /// The terminating error.
    pub error: SyncError,
    /// Counts committed before the failing step.
    pub partial: SyncReport,
}

impl SyncFailure {
    #[must_use]
    pub const fn new(error: SyncError, partial: SyncReport) -> Self {
        Self { error, partial }
    }

    /// The entity stage that failed, when the error is stage-scoped.
    #[must_use]
    pub const fn stage(&self) -> Option<EntityKind> {
        match &self.error {
            SyncError::Fetch { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

impl std::fmt::Display for SyncFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl std::error::Error for SyncFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Run-terminating sync errors.
///
/// Per-record problems (malformed fields, individual storage failures) never
/// surface here; they are coerced or skip-and-logged inside the batch.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Another sync already holds this tenant's guard.
    #[error("sync already in progress for tenant {0}")]
    SyncInProgress(TenantId),

    /// No such tenant onboarded.
    #[error("tenant not found: {0}")]
    TenantNotFound(TenantId),

    /// Credential lookup hit a storage failure.
    #[error("credential lookup failed: {0}")]
    Credentials(#[source] RepositoryError),

    /// A whole-batch fetch failed at the client level.
    #[error("fetching {kind} pages failed: {source}")]
    Fetch {
        kind: EntityKind,
        #[source]
        source: ShopifyError,
    },
}
