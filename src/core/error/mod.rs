use thiserror::Error;

/// Prefix every caller-facing query failure carries, naming the backend.
pub const QUERY_FAILED_PREFIX: &str = "Codex query failed";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid timeout: {timeout_ms} ms")]
    InvalidTimeout { timeout_ms: u64 },
    #[error("invalid setting {key}: {reason}")]
    InvalidSetting { key: String, reason: String },
    #[error("invalid provider options: {reason}")]
    InvalidProviderOptions { reason: String },
    #[error("working directory unavailable: {reason}")]
    WorkingDirectoryUnavailable { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("backend failed to launch: {message}")]
    Launch { message: String },
    #[error(
        "credentials rejected{context}: {message}",
        context = format_context(None, .request_id.as_deref(), None)
    )]
    CredentialsRejected {
        request_id: Option<String>,
        message: String,
    },
    #[error(
        "transport error{context}: {message}",
        context = format_context(None, .request_id.as_deref(), None)
    )]
    Transport {
        request_id: Option<String>,
        message: String,
    },
    #[error(
        "status error{context}: {message}",
        context = format_context(None, .request_id.as_deref(), Some(*.status_code))
    )]
    Status {
        status_code: u16,
        request_id: Option<String>,
        message: String,
    },
    #[error(
        "session rejected{context}: {message}",
        context = format_context(Some(.thread_id.as_str()), None, None)
    )]
    SessionRejected { thread_id: String, message: String },
    #[error("protocol error: {message}")]
    Protocol { message: String },
    #[error("serialization error: {message}")]
    Serialization { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("provider not registered: {provider}")]
    ProviderNotRegistered { provider: String },
    #[error("config schema not registered: {provider}")]
    SchemaNotRegistered { provider: String },
    #[error("invalid config schema for {provider}: {reason}")]
    InvalidSchema { provider: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    ConfigError(#[from] ConfigError),
    #[error("catalog serialization failed: {message}")]
    Serialization { message: String },
    #[error("Codex backend unavailable: {message}")]
    BackendUnavailable { message: String },
    #[error(
        "{prefix}{context}: {message}",
        prefix = QUERY_FAILED_PREFIX,
        context = format_context(.thread_id.as_deref(), None, None)
    )]
    QueryFailed {
        thread_id: Option<String>,
        message: String,
    },
}

impl RuntimeError {
    /// Wraps a backend failure observed while serving `thread_id`.
    pub fn query_failed(thread_id: Option<String>, error: BackendError) -> Self {
        match error {
            BackendError::Launch { message } => Self::BackendUnavailable { message },
            BackendError::SessionRejected { thread_id, message } => Self::QueryFailed {
                thread_id: Some(thread_id),
                message,
            },
            other => Self::QueryFailed {
                thread_id,
                message: other.to_string(),
            },
        }
    }
}

impl From<BackendError> for RuntimeError {
    fn from(error: BackendError) -> Self {
        Self::query_failed(None, error)
    }
}

fn format_context(
    thread_id: Option<&str>,
    request_id: Option<&str>,
    status_code: Option<u16>,
) -> String {
    let mut context = Vec::new();

    if let Some(thread_id) = thread_id {
        context.push(format!("thread_id={thread_id}"));
    }
    if let Some(request_id) = request_id {
        context.push(format!("request_id={request_id}"));
    }
    if let Some(status_code) = status_code {
        context.push(format!("status_code={status_code}"));
    }

    if context.is_empty() {
        String::new()
    } else {
        format!(" [{}]", context.join(", "))
    }
}
