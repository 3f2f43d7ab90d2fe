use clap::Args;
use colored::Colorize;
use std::sync::Arc;

use axum::{routing::get, Json, Router};
use serde_json::json;
use tokio::net::TcpListener;
use tracing::{debug, info};

use mailroom_auth::{
    auth_middleware, ApiKeyService, AuthState, CreateApiKeyRequest, CredentialStore,
    InMemoryCredentialStore, InMemoryTenantStore, Tenant, TenantStore,
};
use mailroom_core::AppSettings;
use mailroom_email::{
    AppState, DeliveryWorker, EmailService, InMemoryJobLedger, JobLedger, ProviderRegistry,
};
use mailroom_queue::MpscDispatchQueue;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(Args)]
pub struct ServeCommand {
    /// Address to bind the API server to
    #[arg(long, env = "MAILROOM_BIND_ADDRESS")]
    pub address: Option<String>,

    /// Name of the tenant created at startup. The stores are
    /// in-process, so every deployment needs one to hand out its
    /// first API key.
    #[arg(long, default_value = "default", env = "MAILROOM_BOOTSTRAP_TENANT")]
    pub bootstrap_tenant: String,
}

impl ServeCommand {
    pub fn execute(self) -> anyhow::Result<()> {
        let mut settings = AppSettings::from_env();
        if let Some(address) = self.address {
            settings.bind_address = address;
        }

        let rt = tokio::runtime::Runtime::new()?;
        rt.block_on(run_server(settings, self.bootstrap_tenant))
    }
}

async fn run_server(settings: AppSettings, bootstrap_tenant: String) -> anyhow::Result<()> {
    let credentials: Arc<dyn CredentialStore> = Arc::new(InMemoryCredentialStore::new());
    let tenants: Arc<dyn TenantStore> = Arc::new(InMemoryTenantStore::new());
    let ledger: Arc<dyn JobLedger> = Arc::new(InMemoryJobLedger::new());

    let api_key_service = Arc::new(ApiKeyService::new(credentials.clone(), tenants.clone()));
    let auth_state = Arc::new(AuthState {
        api_key_service: api_key_service.clone(),
    });

    debug!("Creating dispatch queue (capacity {})", settings.queue_capacity);
    let (queue, receiver) = MpscDispatchQueue::create_channel(settings.queue_capacity);

    let email_service = Arc::new(EmailService::new(
        ledger.clone(),
        tenants.clone(),
        Arc::new(queue.clone()),
    ));
    let app_state = Arc::new(AppState { email_service });

    bootstrap(
        tenants.as_ref(),
        &api_key_service,
        &bootstrap_tenant,
        settings.default_tenant_quota,
    )
    .await?;

    let worker = DeliveryWorker::new(
        ledger,
        Arc::new(ProviderRegistry::with_defaults()),
        &settings,
    );
    worker.reconcile(&queue).await?;
    tokio::spawn(worker.run(Box::new(receiver)));

    let app = Router::new()
        .route("/health", get(health))
        .merge(mailroom_auth::apikey_handler::routes().with_state(auth_state.clone()))
        .merge(mailroom_email::handlers::routes().with_state(app_state))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            auth_middleware,
        ))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api_doc()));

    let listener = TcpListener::bind(&settings.bind_address).await?;
    info!("Mailroom API listening on {}", settings.bind_address);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "healthy" }))
}

/// Merge the per-crate API docs and attach the bearer security scheme
/// the handlers reference.
fn api_doc() -> utoipa::openapi::OpenApi {
    let mut doc = mailroom_email::handlers::emails::ApiDoc::openapi();
    doc.merge(mailroom_auth::apikey_handler::ApiDoc::openapi());

    if let Some(components) = doc.components.as_mut() {
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .build(),
            ),
        );
    }

    doc
}

/// Create the startup tenant and its first API key, and print the
/// plaintext secret once. It is not recoverable afterwards.
async fn bootstrap(
    tenants: &dyn TenantStore,
    api_key_service: &ApiKeyService,
    tenant_name: &str,
    quota_limit: u64,
) -> anyhow::Result<()> {
    let tenant = Tenant::new(tenant_name, quota_limit);
    let tenant_id = tenant.id;
    tenants.insert(tenant).await?;

    let created = api_key_service
        .create_api_key(
            tenant_id,
            CreateApiKeyRequest {
                name: "bootstrap".to_string(),
            },
        )
        .await?;

    println!();
    println!(
        "{}",
        "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━".bright_green()
    );
    println!(
        "{}",
        "   Tenant created, initial API key below"
            .bright_green()
            .bold()
    );
    println!(
        "{}",
        "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━".bright_green()
    );
    println!();
    println!(
        "{} {}",
        "Tenant:".bright_white().bold(),
        tenant_name.bright_cyan()
    );
    println!(
        "{} {}",
        "API key:".bright_white().bold(),
        created.api_key.bright_cyan()
    );
    println!();
    println!(
        "{}",
        "Store this key securely - it won't be shown again.".bright_white()
    );
    println!();

    Ok(())
}
