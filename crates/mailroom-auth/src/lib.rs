//! API-key authentication and tenant quota state for Mailroom
//!
//! A credential is a bearer secret with a fixed `mk_` prefix. Only its
//! SHA-256 digest is ever stored; the plaintext is returned exactly
//! once, at creation. Tenants carry a monthly send quota whose
//! admission check is a single atomic operation on the store.

pub mod apikey_handler;
pub mod apikey_service;
pub mod middleware;
pub mod store;
pub mod types;

pub use apikey_service::{
    ApiKeyListResponse, ApiKeyResponse, ApiKeyService, CreateApiKeyRequest, CreateApiKeyResponse,
};
pub use middleware::{auth_middleware, AuthState, RequireApiKey};
pub use store::{CredentialStore, InMemoryCredentialStore, InMemoryTenantStore, TenantStore};
pub use types::{ApiKey, AuthError, AuthPrincipal, Tenant, KEY_PREFIX};
