use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures::Stream;
use serde_json::Value;

use crate::config::ClientOptions;
use crate::core::error::{BackendError, RegistryError, RuntimeError};
use crate::core::types::{
    BackendEvent, ConfigSchema, CredentialType, ModelInfo, NormalizedEvent, ProviderInfo,
    QueryOptions, ThreadOptions,
};
use crate::credentials::Credential;

/// Raw event stream of one backend run, in arrival order.
pub type BackendEventStream =
    Pin<Box<dyn Stream<Item = Result<BackendEvent, BackendError>> + Send>>;

/// Normalized event stream handed to the host.
///
/// An `Err` item is terminal: it carries a transport failure detected after
/// streaming began. Failures the backend reports as data arrive as
/// [`NormalizedEvent::Error`] instead.
pub type NormalizedEventStream =
    Pin<Box<dyn Stream<Item = Result<NormalizedEvent, RuntimeError>> + Send>>;

/// Connection factory for the backend.
///
/// Loading or launching the backend happens here, so a failure to load is
/// observable as a setup error distinct from query failures.
#[async_trait]
pub trait BackendConnector: Send + Sync {
    async fn connect(
        &self,
        credential: &Credential,
        options: &ClientOptions,
    ) -> Result<Arc<dyn BackendConnection>, BackendError>;
}

/// A live backend connection, shared by every query of one client.
#[async_trait]
pub trait BackendConnection: Send + Sync {
    /// Starts a fresh thread with the given run parameters.
    async fn start_thread(
        &self,
        options: &ThreadOptions,
    ) -> Result<Box<dyn BackendThread>, BackendError>;

    /// Resumes a thread by token. Rejected or expired tokens are errors;
    /// implementations must not start a new thread instead.
    async fn resume_thread(
        &self,
        thread_id: &str,
        options: &ThreadOptions,
    ) -> Result<Box<dyn BackendThread>, BackendError>;

    async fn list_models(&self) -> Result<Vec<ModelInfo>, BackendError>;
}

#[async_trait]
pub trait BackendThread: Send {
    /// Thread token, when the backend has already assigned one.
    fn id(&self) -> Option<String>;

    /// Issues one turn and returns its event stream.
    async fn run_streamed(&mut self, input: &str) -> Result<BackendEventStream, BackendError>;
}

/// Host-side handler for an external tool. This crate never invokes it;
/// the host does when the backend routes a call back.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, arguments: Value) -> Result<Value, String>;
}

/// Stable identity and client factory a host uses to talk to a backend.
#[async_trait]
pub trait Provider: Send + Sync {
    fn id(&self) -> &str;

    fn info(&self) -> ProviderInfo;

    fn credential_type(&self) -> CredentialType;

    /// Never fails; malformed or rejected credentials yield `false`.
    async fn validate_credentials(&self, credential: &str) -> bool;

    /// Builds a client without touching the network.
    fn create_client(&self, credential: &str) -> Arc<dyn ProviderClient>;
}

#[async_trait]
pub trait ProviderClient: Send + Sync {
    async fn query(&self, options: QueryOptions) -> Result<NormalizedEventStream, RuntimeError>;

    /// Best-effort model discovery; empty on failure.
    async fn list_models(&self) -> Vec<String>;

    async fn health_check(&self) -> bool;
}

/// Registration surface the host exposes to plugins at load time.
pub trait PluginHost: Send + Sync {
    fn register_provider(&self, provider: Arc<dyn Provider>) -> Result<(), RegistryError>;

    fn unregister_provider(&self, provider_id: &str) -> Result<(), RegistryError>;

    fn register_config_schema(
        &self,
        provider_id: &str,
        schema: ConfigSchema,
    ) -> Result<(), RegistryError>;

    fn unregister_config_schema(&self, provider_id: &str) -> Result<(), RegistryError>;
}

const _: () = {
    fn _assert_object_safe(
        _: &dyn BackendConnector,
        _: &dyn BackendConnection,
        _: &dyn BackendThread,
        _: &dyn Provider,
        _: &dyn ProviderClient,
        _: &dyn PluginHost,
    ) {
    }
};
