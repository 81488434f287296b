//! Tenant-scoping extractor.
//!
//! Tenant-scoped routes require the `x-tenant-id` header. The extractor
//! resolves the header to an onboarded tenant row, rejecting with 400 when
//! the header is missing or malformed and 404 when no such tenant exists.

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;
use tidepool_core::TenantId;

use crate::db::TenantRepository;
use crate::db::tenants::Tenant;
use crate::state::AppState;

/// Header carrying the tenant id on scoped routes.
pub const TENANT_HEADER: &str = "x-tenant-id";

/// Extractor that resolves the `x-tenant-id` header to a [`Tenant`].
///
/// # Example
///
/// ```rust,ignore
/// async fn scoped_handler(
///     TenantContext(tenant): TenantContext,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", tenant.name)
/// }
/// ```
pub struct TenantContext(pub Tenant);

/// Error returned when the tenant header is missing or unresolvable.
#[derive(Debug)]
pub enum TenantRejection {
    /// The `x-tenant-id` header was not sent.
    MissingHeader,
    /// The header value is not a tenant id.
    InvalidId(String),
    /// No tenant is onboarded under this id.
    NotFound(String),
    /// The lookup itself failed.
    Database,
}

impl IntoResponse for TenantRejection {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::MissingHeader => (
                StatusCode::BAD_REQUEST,
                format!("{TENANT_HEADER} header is required"),
            ),
            Self::InvalidId(raw) => (StatusCode::BAD_REQUEST, format!("invalid tenant id: {raw}")),
            Self::NotFound(id) => (StatusCode::NOT_FOUND, format!("tenant not found: {id}")),
            Self::Database => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl FromRequestParts<AppState> for TenantContext {
    type Rejection = TenantRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(TENANT_HEADER)
            .ok_or(TenantRejection::MissingHeader)?
            .to_str()
            .map_err(|_| TenantRejection::InvalidId("<non-ascii>".to_string()))?;

        let tenant_id: TenantId = raw
            .parse()
            .map_err(|_| TenantRejection::InvalidId(raw.to_string()))?;

        let tenant = TenantRepository::new(state.pool())
            .get(tenant_id)
            .await
            .map_err(|error| {
                tracing::error!(%error, "tenant lookup failed");
                TenantRejection::Database
            })?
            .ok_or_else(|| TenantRejection::NotFound(raw.to_string()))?;

        Ok(Self(tenant))
    }
}
