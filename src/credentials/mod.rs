use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::client::CodexClient;
use crate::config::ClientOptions;
use crate::core::traits::BackendConnector;

/// Prefix every well-formed API key starts with.
pub const API_KEY_PREFIX: &str = "sk-";

/// Opaque API key. Held in memory only; `Debug` never prints it.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into().trim().to_string())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Cheap syntactic check run before any network use.
    pub fn is_well_formed(&self) -> bool {
        self.0.len() > API_KEY_PREFIX.len()
            && self.0.starts_with(API_KEY_PREFIX)
            && !self.0.chars().any(char::is_whitespace)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// Syntax check first, live check only once the syntax passes.
pub struct CredentialValidator {
    connector: Arc<dyn BackendConnector>,
    options: ClientOptions,
}

impl CredentialValidator {
    pub fn new(connector: Arc<dyn BackendConnector>, options: ClientOptions) -> Self {
        Self { connector, options }
    }

    pub async fn validate(&self, raw: &str) -> bool {
        let credential = Credential::new(raw);
        if !credential.is_well_formed() {
            debug!("credential rejected by syntax check");
            return false;
        }

        let client = CodexClient::new(
            credential,
            self.options.clone(),
            Arc::clone(&self.connector),
        );
        match client.discover_models().await {
            Ok(_) => true,
            Err(error) => {
                warn!(error = %error, "credential rejected by live check");
                false
            }
        }
    }
}
