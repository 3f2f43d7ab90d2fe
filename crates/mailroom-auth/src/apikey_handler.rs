//! API key lifecycle handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, post},
    Json, Router,
};
use serde_json::json;
use tracing::error;
use uuid::Uuid;

use mailroom_core::problemdetails::Problem;
use utoipa::OpenApi;

use crate::middleware::{AuthState, RequireApiKey};
use crate::apikey_service::{
    ApiKeyListResponse, ApiKeyResponse, CreateApiKeyRequest, CreateApiKeyResponse,
};

#[derive(OpenApi)]
#[openapi(
    paths(create_api_key, list_api_keys, revoke_api_key),
    components(schemas(
        CreateApiKeyRequest,
        CreateApiKeyResponse,
        ApiKeyResponse,
        ApiKeyListResponse,
    )),
    info(
        title = "API Keys API",
        description = "API endpoints for managing API keys",
        version = "1.0.0"
    )
)]
pub struct ApiDoc;

/// Configure API key routes
pub fn routes() -> Router<Arc<AuthState>> {
    Router::new()
        .route("/v1/api-keys", post(create_api_key).get(list_api_keys))
        .route("/v1/api-keys/{id}", delete(revoke_api_key))
}

/// Create a new API key
#[utoipa::path(
    tag = "API Keys",
    post,
    path = "/v1/api-keys",
    request_body = CreateApiKeyRequest,
    responses(
        (status = 201, description = "API key created; the secret is only returned here", body = CreateApiKeyResponse),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_api_key(
    RequireApiKey(auth): RequireApiKey,
    State(state): State<Arc<AuthState>>,
    Json(request): Json<CreateApiKeyRequest>,
) -> Result<impl IntoResponse, Problem> {
    let created = state
        .api_key_service
        .create_api_key(auth.tenant_id(), request)
        .await
        .map_err(|e| {
            error!("Failed to create API key: {}", e);
            e.to_problem()
        })?;

    Ok((StatusCode::CREATED, Json(created)))
}

/// List the tenant's active API keys
#[utoipa::path(
    tag = "API Keys",
    get,
    path = "/v1/api-keys",
    responses(
        (status = 200, description = "Active API keys, never including secrets", body = ApiKeyListResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_api_keys(
    RequireApiKey(auth): RequireApiKey,
    State(state): State<Arc<AuthState>>,
) -> Result<impl IntoResponse, Problem> {
    let keys = state
        .api_key_service
        .list_api_keys(auth.tenant_id())
        .await
        .map_err(|e| {
            error!("Failed to list API keys: {}", e);
            e.to_problem()
        })?;

    Ok(Json(keys))
}

/// Revoke an API key
#[utoipa::path(
    tag = "API Keys",
    delete,
    path = "/v1/api-keys/{id}",
    params(("id" = Uuid, Path, description = "API key id")),
    responses(
        (status = 200, description = "API key revoked"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Unknown id or owned by a different tenant")
    ),
    security(("bearer_auth" = []))
)]
pub async fn revoke_api_key(
    RequireApiKey(auth): RequireApiKey,
    State(state): State<Arc<AuthState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, Problem> {
    state
        .api_key_service
        .revoke_api_key(auth.tenant_id(), id)
        .await
        .map_err(|e| e.to_problem())?;

    Ok(Json(json!({ "message": "API key deleted successfully" })))
}
