//! Sync trigger route.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    response::{IntoResponse, Response},
    routing::post,
};
use serde::Serialize;
use tracing::instrument;

use crate::db::{RecordRepository, TenantRepository};
use crate::middleware::TenantContext;
use crate::state::AppState;
use crate::sync::{SyncOrchestrator, SyncReport};

/// Success payload for a completed sync.
#[derive(Debug, Serialize)]
struct SyncResponse {
    message: &'static str,
    stats: SyncReport,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/api/ingest/sync", post(trigger_sync))
}

/// Run a full sync for the requesting tenant.
///
/// Returns per-entity counts on success. On failure the response still
/// carries the counts committed before the failing stage plus the stage
/// itself; 409 means a sync is already running for this tenant.
#[instrument(skip(state, tenant), fields(tenant_id = %tenant.0.id))]
async fn trigger_sync(State(state): State<AppState>, tenant: TenantContext) -> Response {
    let TenantContext(tenant) = tenant;

    let orchestrator = SyncOrchestrator::new(
        TenantRepository::new(state.pool()),
        RecordRepository::new(state.pool()),
        state.feeds().clone(),
        Arc::clone(state.guard()),
    );

    let outcome = orchestrator.start_sync(tenant.id).await;

    // Even a failed run may have committed rows; drop the cached aggregates
    // either way.
    state.stats_cache().invalidate(&tenant.id).await;

    match outcome {
        Ok(stats) => (
            axum::http::StatusCode::OK,
            Json(SyncResponse {
                message: "Sync completed successfully",
                stats,
            }),
        )
            .into_response(),
        Err(failure) => failure.into_response(),
    }
}
