use std::sync::Arc;

use async_trait::async_trait;

use crate::backend::CodexExecConnector;
use crate::catalog;
use crate::client::CodexClient;
use crate::config::ClientOptions;
use crate::core::traits::{BackendConnector, Provider, ProviderClient};
use crate::core::types::{CredentialType, ProviderInfo};
use crate::credentials::{Credential, CredentialValidator};

/// The Codex provider as the host sees it.
pub struct CodexProvider {
    connector: Arc<dyn BackendConnector>,
    client_options: ClientOptions,
}

impl CodexProvider {
    pub fn new(client_options: ClientOptions) -> Self {
        Self::with_connector(Arc::new(CodexExecConnector), client_options)
    }

    pub fn with_connector(
        connector: Arc<dyn BackendConnector>,
        client_options: ClientOptions,
    ) -> Self {
        Self {
            connector,
            client_options,
        }
    }
}

impl Default for CodexProvider {
    fn default() -> Self {
        Self::new(ClientOptions::default())
    }
}

#[async_trait]
impl Provider for CodexProvider {
    fn id(&self) -> &str {
        catalog::PROVIDER_ID
    }

    fn info(&self) -> ProviderInfo {
        catalog::provider_info()
    }

    fn credential_type(&self) -> CredentialType {
        CredentialType::ApiKey
    }

    async fn validate_credentials(&self, credential: &str) -> bool {
        CredentialValidator::new(Arc::clone(&self.connector), self.client_options.clone())
            .validate(credential)
            .await
    }

    fn create_client(&self, credential: &str) -> Arc<dyn ProviderClient> {
        Arc::new(CodexClient::new(
            Credential::new(credential),
            self.client_options.clone(),
            Arc::clone(&self.connector),
        ))
    }
}
