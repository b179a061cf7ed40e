use std::sync::Arc;

use tracing::{info, warn};

use crate::config::{self, ClientOptions};
use crate::core::error::RegistryError;
use crate::core::traits::{PluginHost, Provider};
use crate::provider::CodexProvider;

/// Registers the Codex provider and its config schema with a host.
pub struct CodexPlugin {
    provider: Arc<dyn Provider>,
}

impl CodexPlugin {
    pub fn new(client_options: ClientOptions) -> Self {
        Self::with_provider(Arc::new(CodexProvider::new(client_options)))
    }

    pub fn with_provider(provider: Arc<dyn Provider>) -> Self {
        Self { provider }
    }

    pub fn provider_id(&self) -> &str {
        self.provider.id()
    }

    /// Registers the provider, then its schema. A rejected schema rolls the
    /// provider registration back so the host is left unchanged.
    pub fn load(&self, host: &dyn PluginHost) -> Result<(), RegistryError> {
        let provider_id = self.provider.id();
        host.register_provider(Arc::clone(&self.provider))?;

        if let Err(error) = host.register_config_schema(provider_id, config::config_schema()) {
            warn!(provider = provider_id, error = %error, "config schema rejected");
            if let Err(rollback) = host.unregister_provider(provider_id) {
                warn!(provider = provider_id, error = %rollback, "provider rollback failed");
            }
            return Err(error);
        }

        info!(provider = provider_id, "plugin loaded");
        Ok(())
    }

    /// Removes both registrations. Both are attempted; the first failure
    /// is returned.
    pub fn unload(&self, host: &dyn PluginHost) -> Result<(), RegistryError> {
        let provider_id = self.provider.id();
        let provider = host.unregister_provider(provider_id);
        let schema = host.unregister_config_schema(provider_id);

        info!(provider = provider_id, "plugin unloaded");
        provider.and(schema)
    }
}

impl Default for CodexPlugin {
    fn default() -> Self {
        Self::new(ClientOptions::default())
    }
}
