//! Commerce record repository: the storage side of the sync core.
//!
//! One upsert per record, each atomic on its own. The composite
//! `(tenant_id, external_id)` key scopes uniqueness per tenant, and
//! `ON CONFLICT ... DO UPDATE` makes re-applying identical remote data a
//! no-op on business fields beyond refreshing `updated_at`.

use sqlx::PgPool;
use tidepool_core::TenantId;

use crate::sync::store::{CustomerRecord, OrderRecord, ProductRecord, SyncStore};

use super::RepositoryError;

/// Repository for synced customer/product/order rows.
pub struct RecordRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> RecordRepository<'a> {
    /// Create a new record repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }
}

impl SyncStore for RecordRepository<'_> {
    async fn upsert_customer(
        &self,
        tenant_id: TenantId,
        record: &CustomerRecord,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO customers (tenant_id, external_id, first_name, last_name, email, total_spent)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (tenant_id, external_id) DO UPDATE
            SET first_name = EXCLUDED.first_name,
                last_name = EXCLUDED.last_name,
                email = EXCLUDED.email,
                total_spent = EXCLUDED.total_spent,
                updated_at = now()
            ",
        )
        .bind(tenant_id.as_uuid())
        .bind(record.external_id.as_str())
        .bind(&record.first_name)
        .bind(&record.last_name)
        .bind(&record.email)
        .bind(record.total_spent)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    async fn upsert_product(
        &self,
        tenant_id: TenantId,
        record: &ProductRecord,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO products (tenant_id, external_id, title, price)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (tenant_id, external_id) DO UPDATE
            SET title = EXCLUDED.title,
                price = EXCLUDED.price,
                updated_at = now()
            ",
        )
        .bind(tenant_id.as_uuid())
        .bind(record.external_id.as_str())
        .bind(&record.title)
        .bind(record.price)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    async fn upsert_order(
        &self,
        tenant_id: TenantId,
        record: &OrderRecord,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO orders (tenant_id, external_id, total, currency, customer_external_id, placed_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (tenant_id, external_id) DO UPDATE
            SET total = EXCLUDED.total,
                currency = EXCLUDED.currency,
                customer_external_id = EXCLUDED.customer_external_id,
                updated_at = now()
            ",
        )
        .bind(tenant_id.as_uuid())
        .bind(record.external_id.as_str())
        .bind(record.total)
        .bind(&record.currency)
        .bind(
            record
                .customer_external_id
                .as_ref()
                .map(tidepool_core::ExternalId::as_str),
        )
        .bind(record.placed_at)
        .execute(self.pool)
        .await?;

        Ok(())
    }
}
