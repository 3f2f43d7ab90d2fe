//! Bearer authentication middleware and the `RequireApiKey` extractor
//!
//! The middleware resolves the bearer secret (if any) and stashes the
//! authenticated principal as a request extension. Handlers opt in to
//! authentication by taking `RequireApiKey`, which turns a missing
//! principal into a 401 problem response.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use mailroom_core::error_builder::unauthorized;
use mailroom_core::problemdetails::Problem;

use crate::apikey_service::ApiKeyService;
use crate::types::AuthPrincipal;

/// Shared state for the auth middleware.
pub struct AuthState {
    pub api_key_service: Arc<ApiKeyService>,
}

pub async fn auth_middleware(
    State(state): State<Arc<AuthState>>,
    mut req: Request,
    next: Next,
) -> Response {
    if let Some(token) = extract_bearer(&req) {
        // Routes that don't require auth continue without a principal;
        // the RequireApiKey extractor rejects later where one is needed.
        if let Ok(principal) = state.api_key_service.authenticate(&token).await {
            req.extensions_mut().insert(principal);
        }
    }

    next.run(req).await
}

fn extract_bearer(req: &Request) -> Option<String> {
    req.headers()
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
}

/// Extractor that fails with 401 when the request carries no valid,
/// active API key.
pub struct RequireApiKey(pub AuthPrincipal);

impl<S> FromRequestParts<S> for RequireApiKey
where
    S: Send + Sync,
{
    type Rejection = Problem;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthPrincipal>()
            .cloned()
            .map(RequireApiKey)
            .ok_or_else(|| {
                unauthorized()
                    .detail("Invalid or inactive API key")
                    .build()
            })
    }
}
