use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::catalog;
use crate::config::ClientOptions;
use crate::core::error::RuntimeError;
use crate::core::traits::{
    BackendConnection, BackendConnector, NormalizedEventStream, ProviderClient,
};
use crate::core::types::{ModelInfo, QueryOptions, ThreadOptions};
use crate::credentials::Credential;
use crate::session::SessionAdapter;

/// Host-facing client bound to one credential.
///
/// Construction never touches the backend. The first operation that needs
/// it connects; concurrent first callers share that single attempt, and a
/// failed attempt is retried by the next caller.
pub struct CodexClient {
    credential: Credential,
    options: ClientOptions,
    connector: Arc<dyn BackendConnector>,
    connection: OnceCell<Arc<dyn BackendConnection>>,
}

impl CodexClient {
    pub fn new(
        credential: Credential,
        options: ClientOptions,
        connector: Arc<dyn BackendConnector>,
    ) -> Self {
        Self {
            credential,
            options,
            connector,
            connection: OnceCell::new(),
        }
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    async fn connection(&self) -> Result<Arc<dyn BackendConnection>, RuntimeError> {
        self.connection
            .get_or_try_init(|| async {
                debug!(command = ?self.options.command.program, "connecting to Codex backend");
                self.connector
                    .connect(&self.credential, &self.options)
                    .await
                    .map_err(RuntimeError::from)
            })
            .await
            .map(Arc::clone)
    }

    pub(crate) async fn discover_models(&self) -> Result<Vec<ModelInfo>, RuntimeError> {
        let connection = self.connection().await?;
        let models = connection.list_models().await?;
        Ok(catalog::normalize_models(models))
    }

    async fn probe(&self) -> Result<(), RuntimeError> {
        let connection = self.connection().await?;
        let mut thread_options = ThreadOptions::new(self.options.resolve_working_directory()?);
        thread_options.model = self.options.default_model.clone();
        connection.start_thread(&thread_options).await?;
        Ok(())
    }
}

#[async_trait]
impl ProviderClient for CodexClient {
    async fn query(&self, options: QueryOptions) -> Result<NormalizedEventStream, RuntimeError> {
        let connection = self.connection().await?;
        let working_directory = self.options.resolve_working_directory()?;

        SessionAdapter::new(connection, working_directory)
            .with_default_model(self.options.default_model.clone())
            .query(options)
            .await
    }

    async fn list_models(&self) -> Vec<String> {
        match self.discover_models().await {
            Ok(models) => models.into_iter().map(|model| model.model_id).collect(),
            Err(error) => {
                warn!(error = %error, "model discovery failed");
                Vec::new()
            }
        }
    }

    async fn health_check(&self) -> bool {
        match self.probe().await {
            Ok(()) => true,
            Err(error) => {
                warn!(error = %error, "health check failed");
                false
            }
        }
    }
}
