//! Runtime configuration

use serde::{Deserialize, Serialize};

/// Application settings for the send pipeline
/// All fields have sensible defaults for easy onboarding
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Address the HTTP API binds to
    pub bind_address: String,
    /// Capacity of the in-process dispatch queue
    pub queue_capacity: usize,
    /// Seconds the worker waits on the queue before looping again
    pub queue_wait_secs: u64,
    /// Seconds a single provider call may take before it is treated
    /// as a delivery failure
    pub provider_timeout_secs: u64,
    /// Seconds the worker backs off after an unexpected error
    pub worker_backoff_secs: u64,
    /// Monthly send quota assigned to newly registered tenants
    pub default_tenant_quota: u64,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8001".to_string(),
            queue_capacity: 1024,
            queue_wait_secs: 1,
            provider_timeout_secs: 30,
            worker_backoff_secs: 1,
            default_tenant_quota: 10_000,
        }
    }
}

impl AppSettings {
    /// Load settings from the environment, falling back to defaults.
    ///
    /// Recognized variables: `MAILROOM_BIND_ADDRESS`,
    /// `MAILROOM_QUEUE_CAPACITY`, `MAILROOM_PROVIDER_TIMEOUT_SECS`,
    /// `MAILROOM_DEFAULT_TENANT_QUOTA`.
    pub fn from_env() -> Self {
        let mut settings = Self::default();

        if let Ok(addr) = std::env::var("MAILROOM_BIND_ADDRESS") {
            settings.bind_address = addr;
        }
        if let Some(capacity) = env_parse("MAILROOM_QUEUE_CAPACITY") {
            settings.queue_capacity = capacity;
        }
        if let Some(timeout) = env_parse("MAILROOM_PROVIDER_TIMEOUT_SECS") {
            settings.provider_timeout_secs = timeout;
        }
        if let Some(quota) = env_parse("MAILROOM_DEFAULT_TENANT_QUOTA") {
            settings.default_tenant_quota = quota;
        }

        settings
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}
