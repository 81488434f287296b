//! Tenant repository: onboarding CRUD and credential resolution.
//!
//! The tenant row is the isolation boundary of the whole system: it owns the
//! remote credential and every synced record. Rows are created once at
//! onboarding and read-only afterwards from the sync core's perspective.

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;
use tidepool_core::TenantId;
use uuid::Uuid;

use crate::sync::store::{CredentialStore, TenantCredentials};

use super::RepositoryError;

// =============================================================================
// Types
// =============================================================================

/// An onboarded tenant.
///
/// Implements `Debug` manually to redact the access token.
#[derive(Clone)]
pub struct Tenant {
    /// Tenant identifier.
    pub id: TenantId,
    /// Display name.
    pub name: String,
    /// Remote shop domain (e.g., your-store.myshopify.com).
    pub shop_domain: String,
    /// Remote API access token (redacted in debug output).
    pub access_token: SecretString,
    /// Contact email captured at onboarding.
    pub email: Option<String>,
    /// When the tenant was onboarded.
    pub created_at: DateTime<Utc>,
}

impl std::fmt::Debug for Tenant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tenant")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("shop_domain", &self.shop_domain)
            .field("access_token", &"[REDACTED]")
            .field("email", &self.email)
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Input for onboarding a new tenant.
pub struct NewTenant {
    /// Display name.
    pub name: String,
    /// Remote shop domain.
    pub shop_domain: String,
    /// Remote API access token.
    pub access_token: SecretString,
    /// Contact email.
    pub email: Option<String>,
}

/// Internal row type for `PostgreSQL` queries.
#[derive(Debug, sqlx::FromRow)]
struct TenantRow {
    id: Uuid,
    name: String,
    shop_domain: String,
    access_token: String,
    email: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<TenantRow> for Tenant {
    fn from(row: TenantRow) -> Self {
        Self {
            id: TenantId::new(row.id),
            name: row.name,
            shop_domain: row.shop_domain,
            access_token: SecretString::from(row.access_token),
            email: row.email,
            created_at: row.created_at,
        }
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for tenant database operations.
pub struct TenantRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> TenantRepository<'a> {
    /// Create a new tenant repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Onboard a new tenant.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the shop domain is already
    /// onboarded, `RepositoryError::Database` for any other query failure.
    pub async fn create(&self, tenant: NewTenant) -> Result<Tenant, RepositoryError> {
        let id = TenantId::generate();

        let row = sqlx::query_as::<_, TenantRow>(
            r"
            INSERT INTO tenants (id, name, shop_domain, access_token, email)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, name, shop_domain, access_token, email, created_at
            ",
        )
        .bind(id.as_uuid())
        .bind(&tenant.name)
        .bind(&tenant.shop_domain)
        .bind(tenant.access_token.expose_secret())
        .bind(&tenant.email)
        .fetch_one(self.pool)
        .await
        .map_err(|e| {
            if e.as_database_error()
                .is_some_and(|db| db.is_unique_violation())
            {
                RepositoryError::Conflict(format!(
                    "shop domain already onboarded: {}",
                    tenant.shop_domain
                ))
            } else {
                RepositoryError::Database(e)
            }
        })?;

        Ok(Tenant::from(row))
    }

    /// Get a tenant by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: TenantId) -> Result<Option<Tenant>, RepositoryError> {
        let row = sqlx::query_as::<_, TenantRow>(
            r"
            SELECT id, name, shop_domain, access_token, email, created_at
            FROM tenants
            WHERE id = $1
            ",
        )
        .bind(id.as_uuid())
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Tenant::from))
    }

    /// List all tenants, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Tenant>, RepositoryError> {
        let rows = sqlx::query_as::<_, TenantRow>(
            r"
            SELECT id, name, shop_domain, access_token, email, created_at
            FROM tenants
            ORDER BY created_at DESC
            ",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Tenant::from).collect())
    }
}

impl CredentialStore for TenantRepository<'_> {
    async fn lookup(
        &self,
        tenant_id: TenantId,
    ) -> Result<Option<TenantCredentials>, RepositoryError> {
        Ok(self.get(tenant_id).await?.map(|tenant| TenantCredentials {
            name: tenant.name,
            shop_domain: tenant.shop_domain,
            access_token: tenant.access_token,
        }))
    }
}
