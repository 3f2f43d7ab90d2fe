//! Delivery transports and their registry

pub mod mock;
pub mod sendgrid;
pub mod ses;
pub mod smtp;
pub mod traits;

pub use mock::MockProvider;
pub use sendgrid::SendgridProvider;
pub use ses::SesProvider;
pub use smtp::SmtpProvider;
pub use traits::{DeliveryReceipt, EmailProvider, ProviderKind};

use std::collections::HashMap;
use std::sync::Arc;

/// Maps a job's `provider` field to its transport adapter.
///
/// Selection is a pure lookup; a `ProviderKind` with no registered
/// adapter is an `UnsupportedProvider` failure at delivery time.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: HashMap<ProviderKind, Arc<dyn EmailProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the stock transports. Postmark is a declared
    /// `ProviderKind` without an adapter here, so selecting it fails
    /// delivery as unsupported.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(SmtpProvider::new()));
        registry.register(Arc::new(SendgridProvider::new()));
        registry.register(Arc::new(SesProvider::new()));
        registry
    }

    pub fn register(&mut self, provider: Arc<dyn EmailProvider>) {
        self.providers.insert(provider.kind(), provider);
    }

    pub fn get(&self, kind: ProviderKind) -> Option<Arc<dyn EmailProvider>> {
        self.providers.get(&kind).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry_contents() {
        let registry = ProviderRegistry::with_defaults();
        assert!(registry.get(ProviderKind::Smtp).is_some());
        assert!(registry.get(ProviderKind::Sendgrid).is_some());
        assert!(registry.get(ProviderKind::AwsSes).is_some());
        assert!(registry.get(ProviderKind::Postmark).is_none());
    }

    #[test]
    fn test_register_overrides_existing_kind() {
        let mut registry = ProviderRegistry::with_defaults();
        let mock = Arc::new(MockProvider::new());
        registry.register(mock.clone());

        let resolved = registry.get(ProviderKind::Smtp).unwrap();
        assert_eq!(resolved.kind(), ProviderKind::Smtp);
    }
}
