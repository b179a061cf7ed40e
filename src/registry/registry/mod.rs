use std::collections::BTreeSet;
use std::sync::{Arc, RwLock};

use tracing::info;

use crate::core::error::RegistryError;
use crate::core::traits::{PluginHost, Provider};
use crate::core::types::{ConfigSchema, FieldControl};

/// In-process host registry plugins register providers and config schemas into.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: RwLock<Vec<(String, Arc<dyn Provider>)>>,
    schemas: RwLock<Vec<(String, ConfigSchema)>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `provider` under its id, replacing any earlier registration.
    pub fn register(&self, provider: Arc<dyn Provider>) {
        let provider_id = provider.id().to_string();
        let mut providers = self
            .providers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some((_, existing)) = providers
            .iter_mut()
            .find(|(registered, _)| *registered == provider_id)
        {
            *existing = provider;
            return;
        }

        providers.push((provider_id, provider));
    }

    pub fn resolve_provider(&self, provider_id: &str) -> Result<Arc<dyn Provider>, RegistryError> {
        self.providers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .find(|(registered, _)| registered == provider_id)
            .map(|(_, provider)| Arc::clone(provider))
            .ok_or_else(|| RegistryError::ProviderNotRegistered {
                provider: provider_id.to_string(),
            })
    }

    /// Registered provider ids, in registration order.
    pub fn provider_ids(&self) -> Vec<String> {
        self.providers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .map(|(provider_id, _)| provider_id.clone())
            .collect()
    }

    pub fn config_schema(&self, provider_id: &str) -> Result<ConfigSchema, RegistryError> {
        self.schemas
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .find(|(registered, _)| registered == provider_id)
            .map(|(_, schema)| schema.clone())
            .ok_or_else(|| RegistryError::SchemaNotRegistered {
                provider: provider_id.to_string(),
            })
    }
}

impl PluginHost for ProviderRegistry {
    fn register_provider(&self, provider: Arc<dyn Provider>) -> Result<(), RegistryError> {
        info!(provider = provider.id(), "registering provider");
        self.register(provider);
        Ok(())
    }

    fn unregister_provider(&self, provider_id: &str) -> Result<(), RegistryError> {
        let mut providers = self
            .providers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let before = providers.len();
        providers.retain(|(registered, _)| registered != provider_id);

        if providers.len() == before {
            return Err(RegistryError::ProviderNotRegistered {
                provider: provider_id.to_string(),
            });
        }
        info!(provider = provider_id, "unregistered provider");
        Ok(())
    }

    fn register_config_schema(
        &self,
        provider_id: &str,
        schema: ConfigSchema,
    ) -> Result<(), RegistryError> {
        validate_schema(provider_id, &schema)?;

        let mut schemas = self
            .schemas
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match schemas
            .iter_mut()
            .find(|(registered, _)| registered == provider_id)
        {
            Some((_, existing)) => *existing = schema,
            None => schemas.push((provider_id.to_string(), schema)),
        }
        Ok(())
    }

    fn unregister_config_schema(&self, provider_id: &str) -> Result<(), RegistryError> {
        let mut schemas = self
            .schemas
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let before = schemas.len();
        schemas.retain(|(registered, _)| registered != provider_id);

        if schemas.len() == before {
            return Err(RegistryError::SchemaNotRegistered {
                provider: provider_id.to_string(),
            });
        }
        Ok(())
    }
}

fn validate_schema(provider_id: &str, schema: &ConfigSchema) -> Result<(), RegistryError> {
    let invalid = |reason: String| RegistryError::InvalidSchema {
        provider: provider_id.to_string(),
        reason,
    };

    let mut seen = BTreeSet::new();
    for field in &schema.fields {
        if field.key.trim().is_empty() {
            return Err(invalid("field key must not be blank".to_string()));
        }
        if !seen.insert(field.key.as_str()) {
            return Err(invalid(format!("duplicate field key: {}", field.key)));
        }
        if field.control == FieldControl::Select && field.options.is_empty() {
            return Err(invalid(format!(
                "select field {} has no options",
                field.key
            )));
        }
    }

    Ok(())
}
