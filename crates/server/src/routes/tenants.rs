//! Tenant onboarding routes.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tidepool_core::TenantId;
use tracing::{info, instrument};

use crate::db::TenantRepository;
use crate::db::tenants::{NewTenant, Tenant};
use crate::error::AppError;
use crate::state::AppState;

/// Onboarding request body.
#[derive(Debug, Deserialize)]
pub struct OnboardRequest {
    pub name: String,
    pub shop_domain: String,
    pub access_token: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// API view of a tenant. The access token never leaves the server.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantView {
    pub id: TenantId,
    pub name: String,
    pub shop_domain: String,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Tenant> for TenantView {
    fn from(tenant: Tenant) -> Self {
        Self {
            id: tenant.id,
            name: tenant.name,
            shop_domain: tenant.shop_domain,
            email: tenant.email,
            created_at: tenant.created_at,
        }
    }
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/tenants/onboard", post(onboard))
        .route("/api/tenants", get(list))
}

/// Onboard a new tenant.
#[instrument(skip(state, request))]
async fn onboard(
    State(state): State<AppState>,
    Json(request): Json<OnboardRequest>,
) -> Result<(StatusCode, Json<TenantView>), AppError> {
    if request.name.trim().is_empty()
        || request.shop_domain.trim().is_empty()
        || request.access_token.trim().is_empty()
    {
        return Err(AppError::BadRequest(
            "name, shop_domain, and access_token are required".to_string(),
        ));
    }

    let tenant = TenantRepository::new(state.pool())
        .create(NewTenant {
            name: request.name.trim().to_string(),
            shop_domain: request.shop_domain.trim().to_string(),
            access_token: SecretString::from(request.access_token),
            email: request.email,
        })
        .await?;

    info!(tenant_id = %tenant.id, shop_domain = %tenant.shop_domain, "tenant onboarded");

    Ok((StatusCode::CREATED, Json(TenantView::from(tenant))))
}

/// List onboarded tenants.
async fn list(State(state): State<AppState>) -> Result<Json<Vec<TenantView>>, AppError> {
    let tenants = TenantRepository::new(state.pool()).list().await?;
    Ok(Json(tenants.into_iter().map(TenantView::from).collect()))
}
