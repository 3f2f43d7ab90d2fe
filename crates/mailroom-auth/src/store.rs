//! Credential and tenant stores
//!
//! Both stores are external collaborators of the pipeline; the traits
//! are the seam and the in-memory implementations back tests and
//! single-process deployments.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::types::{ApiKey, AuthError, Tenant};

#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn insert(&self, key: ApiKey) -> Result<(), AuthError>;

    /// Look up an active credential by secret digest.
    async fn find_active_by_hash(&self, key_hash: &str) -> Result<Option<ApiKey>, AuthError>;

    /// List active credentials for a tenant, newest first.
    async fn list_active(&self, tenant_id: Uuid) -> Result<Vec<ApiKey>, AuthError>;

    /// Record a successful authentication. Best effort: callers do not
    /// fail the auth decision on an error here.
    async fn touch_last_used(&self, id: Uuid) -> Result<(), AuthError>;

    /// Soft-delete a tenant's credential. Returns false when the id is
    /// unknown or owned by a different tenant.
    async fn deactivate(&self, id: Uuid, tenant_id: Uuid) -> Result<bool, AuthError>;
}

#[async_trait]
pub trait TenantStore: Send + Sync {
    async fn insert(&self, tenant: Tenant) -> Result<(), AuthError>;

    async fn find_active(&self, id: Uuid) -> Result<Option<Tenant>, AuthError>;

    /// Atomic quota admission: increments `used_this_period` only when
    /// it is below `quota_limit`, otherwise fails with `QuotaExceeded`.
    /// Check and increment happen under one critical section so two
    /// concurrent calls can never both win the last slot.
    async fn try_admit(&self, id: Uuid) -> Result<(), AuthError>;
}

/// In-memory credential store for single-process deployments.
#[derive(Default)]
pub struct InMemoryCredentialStore {
    keys: Mutex<HashMap<Uuid, ApiKey>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn insert(&self, key: ApiKey) -> Result<(), AuthError> {
        self.keys.lock().await.insert(key.id, key);
        Ok(())
    }

    async fn find_active_by_hash(&self, key_hash: &str) -> Result<Option<ApiKey>, AuthError> {
        let keys = self.keys.lock().await;
        Ok(keys
            .values()
            .find(|k| k.is_active && k.key_hash == key_hash)
            .cloned())
    }

    async fn list_active(&self, tenant_id: Uuid) -> Result<Vec<ApiKey>, AuthError> {
        let keys = self.keys.lock().await;
        let mut result: Vec<ApiKey> = keys
            .values()
            .filter(|k| k.is_active && k.tenant_id == tenant_id)
            .cloned()
            .collect();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(result)
    }

    async fn touch_last_used(&self, id: Uuid) -> Result<(), AuthError> {
        let mut keys = self.keys.lock().await;
        if let Some(key) = keys.get_mut(&id) {
            key.last_used_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn deactivate(&self, id: Uuid, tenant_id: Uuid) -> Result<bool, AuthError> {
        let mut keys = self.keys.lock().await;
        match keys.get_mut(&id) {
            Some(key) if key.tenant_id == tenant_id => {
                key.is_active = false;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

/// In-memory tenant store for single-process deployments.
#[derive(Default)]
pub struct InMemoryTenantStore {
    tenants: Mutex<HashMap<Uuid, Tenant>>,
}

impl InMemoryTenantStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TenantStore for InMemoryTenantStore {
    async fn insert(&self, tenant: Tenant) -> Result<(), AuthError> {
        self.tenants.lock().await.insert(tenant.id, tenant);
        Ok(())
    }

    async fn find_active(&self, id: Uuid) -> Result<Option<Tenant>, AuthError> {
        let tenants = self.tenants.lock().await;
        Ok(tenants.get(&id).filter(|t| t.is_active).cloned())
    }

    async fn try_admit(&self, id: Uuid) -> Result<(), AuthError> {
        let mut tenants = self.tenants.lock().await;
        let tenant = tenants
            .get_mut(&id)
            .filter(|t| t.is_active)
            .ok_or_else(|| AuthError::NotFound(format!("Tenant {} not found", id)))?;

        if tenant.used_this_period >= tenant.quota_limit {
            return Err(AuthError::QuotaExceeded {
                limit: tenant.quota_limit,
            });
        }

        tenant.used_this_period += 1;
        Ok(())
    }
}
