//! HTTP route wiring.
//!
//! Thin plumbing over the repositories and the sync core. Health endpoints
//! live in `main.rs`; everything here is JSON under `/api`.

pub mod dashboard;
pub mod sync;
pub mod tenants;

use axum::Router;

use crate::state::AppState;

/// All application routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(tenants::routes())
        .merge(sync::routes())
        .merge(dashboard::routes())
}
