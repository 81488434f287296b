//! Dashboard aggregate routes.

use axum::{Json, Router, extract::State, routing::get};
use tracing::instrument;

use crate::db::MetricsRepository;
use crate::db::metrics::{DashboardStats, TopCustomer, TrendPoint};
use crate::error::AppError;
use crate::middleware::TenantContext;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/dashboard/stats", get(stats))
        .route("/api/dashboard/orders-trend", get(orders_trend))
        .route("/api/dashboard/top-customers", get(top_customers))
}

/// Aggregated totals, cached briefly to keep dashboard refreshes cheap.
#[instrument(skip(state, tenant), fields(tenant_id = %tenant.0.id))]
async fn stats(
    State(state): State<AppState>,
    tenant: TenantContext,
) -> Result<Json<DashboardStats>, AppError> {
    let TenantContext(tenant) = tenant;

    let stats = state
        .stats_cache()
        .try_get_with(tenant.id, async {
            MetricsRepository::new(state.pool()).stats(tenant.id).await
        })
        .await
        .map_err(|error| AppError::Internal(format!("stats aggregation failed: {error}")))?;

    Ok(Json(stats))
}

/// Orders of the last 30 days grouped by day.
async fn orders_trend(
    State(state): State<AppState>,
    TenantContext(tenant): TenantContext,
) -> Result<Json<Vec<TrendPoint>>, AppError> {
    let trend = MetricsRepository::new(state.pool())
        .orders_trend(tenant.id)
        .await?;
    Ok(Json(trend))
}

/// Top 5 customers by lifetime spend.
async fn top_customers(
    State(state): State<AppState>,
    TenantContext(tenant): TenantContext,
) -> Result<Json<Vec<TopCustomer>>, AppError> {
    let customers = MetricsRepository::new(state.pool())
        .top_customers(tenant.id)
        .await?;
    Ok(Json(customers))
}
