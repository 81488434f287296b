//! Write port over local storage, plus credential resolution.
//!
//! Each upsert is atomic per record and idempotent: applying the same record
//! twice leaves the same stored state (modulo the `updated_at` stamp). No
//! multi-record transaction spans a batch - a crash mid-batch leaves a
//! partially-applied state that the next run reconciles.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use secrecy::SecretString;
use tidepool_core::{ExternalId, TenantId};

use crate::db::RepositoryError;

/// Remote credentials resolved for one tenant.
pub struct TenantCredentials {
    pub name: String,
    pub shop_domain: String,
    pub access_token: SecretString,
}

impl std::fmt::Debug for TenantCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenantCredentials")
            .field("name", &self.name)
            .field("shop_domain", &self.shop_domain)
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}

/// Resolves a tenant id to its remote domain and access token.
#[allow(async_fn_in_trait)]
pub trait CredentialStore: Send + Sync {
    /// Look up a tenant's credentials; `None` if the tenant does not exist.
    async fn lookup(
        &self,
        tenant_id: TenantId,
    ) -> Result<Option<TenantCredentials>, RepositoryError>;
}

/// A decoded, coerced customer ready for storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerRecord {
    pub external_id: ExternalId,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    /// Non-negative; malformed remote values have already coerced to zero.
    pub total_spent: Decimal,
}

/// A decoded, coerced product ready for storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductRecord {
    pub external_id: ExternalId,
    pub title: String,
    /// First variant's price; non-negative, coerced.
    pub price: Decimal,
}

/// A decoded, coerced order ready for storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRecord {
    pub external_id: ExternalId,
    pub total: Decimal,
    pub currency: String,
    /// Nullable reference by external id; deliberately unenforced - the
    /// referenced customer may never have been synced.
    pub customer_external_id: Option<ExternalId>,
    /// Remote-origin timestamp (sync time when the remote one was missing).
    pub placed_at: DateTime<Utc>,
}

/// Idempotent per-record merge into local storage.
///
/// Insert on first sight (record id = external id), overwrite mutable fields
/// and refresh `updated_at` on every subsequent sync that observes the
/// record. Nothing is ever deleted.
#[allow(async_fn_in_trait)]
pub trait SyncStore: Send + Sync {
    async fn upsert_customer(
        &self,
        tenant_id: TenantId,
        record: &CustomerRecord,
    ) -> Result<(), RepositoryError>;

    async fn upsert_product(
        &self,
        tenant_id: TenantId,
        record: &ProductRecord,
    ) -> Result<(), RepositoryError>;

    async fn upsert_order(
        &self,
        tenant_id: TenantId,
        record: &OrderRecord,
    ) -> Result<(), RepositoryError>;
}
