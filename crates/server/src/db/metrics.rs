//! Dashboard read-side aggregates.
//!
//! Thin plumbing over the synced records: totals, a 30-day order trend
//! grouped by day, and the top customers by lifetime spend. Consumed by the
//! dashboard routes only; the sync core never reads through here.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use tidepool_core::TenantId;

use super::RepositoryError;

/// Aggregated totals for one tenant.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_customers: i64,
    pub total_orders: i64,
    pub total_products: i64,
    pub total_revenue: Decimal,
}

/// One day of order activity.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub orders: i64,
    pub revenue: Decimal,
}

/// A customer ranked by lifetime spend.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TopCustomer {
    pub external_id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub total_spent: Decimal,
}

/// Repository for dashboard aggregate queries.
pub struct MetricsRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> MetricsRepository<'a> {
    /// Create a new metrics repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Aggregated totals for the tenant.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn stats(&self, tenant_id: TenantId) -> Result<DashboardStats, RepositoryError> {
        let total_customers =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM customers WHERE tenant_id = $1")
                .bind(tenant_id.as_uuid())
                .fetch_one(self.pool)
                .await?;

        let total_orders =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM orders WHERE tenant_id = $1")
                .bind(tenant_id.as_uuid())
                .fetch_one(self.pool)
                .await?;

        let total_products =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM products WHERE tenant_id = $1")
                .bind(tenant_id.as_uuid())
                .fetch_one(self.pool)
                .await?;

        let total_revenue = sqlx::query_scalar::<_, Decimal>(
            "SELECT COALESCE(SUM(total), 0) FROM orders WHERE tenant_id = $1",
        )
        .bind(tenant_id.as_uuid())
        .fetch_one(self.pool)
        .await?;

        Ok(DashboardStats {
            total_customers,
            total_orders,
            total_products,
            total_revenue,
        })
    }

    /// Orders of the last 30 days, grouped by day.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn orders_trend(
        &self,
        tenant_id: TenantId,
    ) -> Result<Vec<TrendPoint>, RepositoryError> {
        let points = sqlx::query_as::<_, TrendPoint>(
            r"
            SELECT placed_at::date AS date,
                   COUNT(*) AS orders,
                   COALESCE(SUM(total), 0) AS revenue
            FROM orders
            WHERE tenant_id = $1
              AND placed_at >= now() - INTERVAL '30 days'
            GROUP BY placed_at::date
            ORDER BY date
            ",
        )
        .bind(tenant_id.as_uuid())
        .fetch_all(self.pool)
        .await?;

        Ok(points)
    }

    /// Top 5 customers by lifetime spend.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn top_customers(
        &self,
        tenant_id: TenantId,
    ) -> Result<Vec<TopCustomer>, RepositoryError> {
        let customers = sqlx::query_as::<_, TopCustomer>(
            r"
            SELECT external_id, first_name, last_name, email, total_spent
            FROM customers
            WHERE tenant_id = $1
            ORDER BY total_spent DESC
            LIMIT 5
            ",
        )
        .bind(tenant_id.as_uuid())
        .fetch_all(self.pool)
        .await?;

        Ok(customers)
    }
}
