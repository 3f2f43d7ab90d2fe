//! Email send and read handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use tracing::error;
use uuid::Uuid;

use mailroom_auth::RequireApiKey;
use mailroom_core::problemdetails::Problem;

use crate::handlers::types::{
    AnalyticsOverviewResponse, AppState, EmailListResponse, SendEmailRequestBody,
    SendEmailResponseBody,
};
use crate::job::EmailJob;
use crate::ledger::ListJobsQuery;

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(send_email, list_emails, get_email, analytics_overview),
    components(schemas(
        SendEmailRequestBody,
        SendEmailResponseBody,
        EmailListResponse,
        AnalyticsOverviewResponse,
        EmailJob,
        crate::job::Recipient,
        crate::job::RecipientKind,
        crate::job::Attachment,
        crate::job::JobStatus,
        crate::providers::ProviderKind,
    )),
    info(
        title = "Emails API",
        description = "API endpoints for sending emails and reading delivery state",
        version = "1.0.0"
    )
)]
pub struct ApiDoc;

/// Configure email routes
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/v1/emails", post(send_email).get(list_emails))
        .route("/v1/emails/{id}", get(get_email))
        .route("/v1/analytics/overview", get(analytics_overview))
}

/// Accept an email for delivery
#[utoipa::path(
    tag = "Emails",
    post,
    path = "/v1/emails",
    request_body = SendEmailRequestBody,
    responses(
        (status = 201, description = "Email accepted and queued", body = SendEmailResponseBody),
        (status = 401, description = "Unauthorized"),
        (status = 422, description = "Invalid request body"),
        (status = 429, description = "Monthly send quota exceeded"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = []))
)]
pub async fn send_email(
    RequireApiKey(auth): RequireApiKey,
    State(state): State<Arc<AppState>>,
    Json(body): Json<SendEmailRequestBody>,
) -> Result<impl IntoResponse, Problem> {
    let immediate = body.send_immediately;
    let response = state
        .email_service
        .ingest(&auth, body.into())
        .await
        .map_err(|e| {
            error!("Failed to accept email: {}", e);
            e.to_problem()
        })?;

    Ok((
        StatusCode::CREATED,
        Json(SendEmailResponseBody::from_response(response, immediate)),
    ))
}

/// List the tenant's emails, newest first
#[utoipa::path(
    tag = "Emails",
    get,
    path = "/v1/emails",
    params(ListJobsQuery),
    responses(
        (status = 200, description = "Emails matching the filter", body = EmailListResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_emails(
    RequireApiKey(auth): RequireApiKey,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListJobsQuery>,
) -> Result<impl IntoResponse, Problem> {
    let emails = state
        .email_service
        .list_jobs(&auth, query)
        .await
        .map_err(|e| {
            error!("Failed to list emails: {}", e);
            e.to_problem()
        })?;

    let total = emails.len() as u64;
    Ok(Json(EmailListResponse { emails, total }))
}

/// Fetch one email by id
#[utoipa::path(
    tag = "Emails",
    get,
    path = "/v1/emails/{id}",
    params(("id" = Uuid, Path, description = "Email id")),
    responses(
        (status = 200, description = "The email and its delivery state", body = EmailJob),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Unknown id or owned by a different tenant")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_email(
    RequireApiKey(auth): RequireApiKey,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, Problem> {
    let email = state
        .email_service
        .get_job(&auth, id)
        .await
        .map_err(|e| e.to_problem())?;

    Ok(Json(email))
}

/// Delivery statistics and quota usage for the tenant
#[utoipa::path(
    tag = "Analytics",
    get,
    path = "/v1/analytics/overview",
    responses(
        (status = 200, description = "Per-status counts and quota usage", body = AnalyticsOverviewResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn analytics_overview(
    RequireApiKey(auth): RequireApiKey,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, Problem> {
    let overview = state
        .email_service
        .analytics_overview(&auth)
        .await
        .map_err(|e| {
            error!("Failed to compute analytics overview: {}", e);
            e.to_problem()
        })?;

    Ok(Json(AnalyticsOverviewResponse::from(overview)))
}
