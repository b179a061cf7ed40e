//! Client options and the host-facing config schema.
//!
//! The schema keys and [`ClientOptions::from_settings`] share one set of
//! constants, so whatever the host UI collects parses back into options.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde_json::json;

use crate::catalog;
use crate::core::error::ConfigError;
use crate::core::types::{ConfigField, ConfigSchema, FieldControl, SelectOption};

pub const SETTING_API_KEY: &str = "api_key";
pub const SETTING_MODEL: &str = "model";
pub const SETTING_BASE_URL: &str = "base_url";
pub const SETTING_CODEX_PATH: &str = "codex_path";
pub const SETTING_TIMEOUT_MS: &str = "timeout_ms";

pub const DEFAULT_CODEX_PROGRAM: &str = "codex";
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// How to launch the backend executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: PathBuf,
    /// Arguments placed before the backend's own arguments.
    pub leading_args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            leading_args: Vec::new(),
        }
    }

    pub fn with_leading_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.leading_args = args.into_iter().map(Into::into).collect();
        self
    }
}

impl Default for CommandSpec {
    fn default() -> Self {
        Self::new(DEFAULT_CODEX_PROGRAM)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    pub base_url: Option<String>,
    pub command: CommandSpec,
    pub default_model: Option<String>,
    /// Directory runs execute in. `None` resolves to the host process's
    /// current directory at query time.
    pub working_directory: Option<PathBuf>,
    pub timeout_ms: u64,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            base_url: None,
            command: CommandSpec::default(),
            default_model: None,
            working_directory: None,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl ClientOptions {
    /// Parses the string settings the host collected through
    /// [`config_schema`]. Unknown keys and the credential are ignored here.
    pub fn from_settings(settings: &BTreeMap<String, String>) -> Result<Self, ConfigError> {
        let mut options = Self::default();

        if let Some(base_url) = non_blank(settings, SETTING_BASE_URL) {
            options = options.with_base_url(base_url);
        }
        if let Some(model) = non_blank(settings, SETTING_MODEL) {
            options.default_model = Some(model.to_string());
        }
        if let Some(path) = non_blank(settings, SETTING_CODEX_PATH) {
            options.command = CommandSpec::new(path);
        }
        if let Some(raw) = non_blank(settings, SETTING_TIMEOUT_MS) {
            let timeout_ms = raw
                .parse::<u64>()
                .map_err(|error| ConfigError::InvalidSetting {
                    key: SETTING_TIMEOUT_MS.to_string(),
                    reason: error.to_string(),
                })?;
            options = options.with_timeout_ms(timeout_ms)?;
        }

        Ok(options)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = normalize_base_url(base_url);
        self
    }

    pub fn with_command(mut self, command: CommandSpec) -> Self {
        self.command = command;
        self
    }

    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = Some(model.into());
        self
    }

    pub fn with_working_directory(mut self, working_directory: impl Into<PathBuf>) -> Self {
        self.working_directory = Some(working_directory.into());
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Result<Self, ConfigError> {
        if timeout_ms == 0 {
            return Err(ConfigError::InvalidTimeout { timeout_ms });
        }
        self.timeout_ms = timeout_ms;
        Ok(self)
    }

    /// The configured working directory, or the host's current one.
    pub fn resolve_working_directory(&self) -> Result<PathBuf, ConfigError> {
        match &self.working_directory {
            Some(path) => Ok(path.clone()),
            None => std::env::current_dir().map_err(|error| {
                ConfigError::WorkingDirectoryUnavailable {
                    reason: error.to_string(),
                }
            }),
        }
    }
}

/// Declarative field list the host renders to collect credentials and options.
pub fn config_schema() -> ConfigSchema {
    let info = catalog::provider_info();
    let model_options = info
        .catalog
        .models
        .iter()
        .map(|model| SelectOption {
            value: model.model_id.clone(),
            label: model
                .display_name
                .clone()
                .unwrap_or_else(|| model.model_id.clone()),
        })
        .collect();

    ConfigSchema {
        fields: vec![
            ConfigField {
                key: SETTING_API_KEY.to_string(),
                control: FieldControl::Password,
                label: "API key".to_string(),
                placeholder: Some("sk-...".to_string()),
                required: true,
                help: Some("OpenAI API key used by the Codex agent".to_string()),
                options: Vec::new(),
                default: None,
            },
            ConfigField {
                key: SETTING_MODEL.to_string(),
                control: FieldControl::Select,
                label: "Default model".to_string(),
                placeholder: None,
                required: false,
                help: Some("Used when a query does not name a model".to_string()),
                options: model_options,
                default: Some(json!(info.default_model)),
            },
            ConfigField {
                key: SETTING_BASE_URL.to_string(),
                control: FieldControl::Text,
                label: "Base URL".to_string(),
                placeholder: Some("https://api.openai.com/v1".to_string()),
                required: false,
                help: Some("Override for OpenAI-compatible gateways".to_string()),
                options: Vec::new(),
                default: None,
            },
            ConfigField {
                key: SETTING_CODEX_PATH.to_string(),
                control: FieldControl::Text,
                label: "Codex executable".to_string(),
                placeholder: Some(DEFAULT_CODEX_PROGRAM.to_string()),
                required: false,
                help: Some("Path to the codex CLI when it is not on PATH".to_string()),
                options: Vec::new(),
                default: None,
            },
            ConfigField {
                key: SETTING_TIMEOUT_MS.to_string(),
                control: FieldControl::Number,
                label: "Request timeout (ms)".to_string(),
                placeholder: None,
                required: false,
                help: Some("Timeout for model discovery requests".to_string()),
                options: Vec::new(),
                default: Some(json!(DEFAULT_TIMEOUT_MS)),
            },
        ],
    }
}

fn non_blank<'a>(settings: &'a BTreeMap<String, String>, key: &str) -> Option<&'a str> {
    settings
        .get(key)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
}

fn normalize_base_url(base_url: impl Into<String>) -> Option<String> {
    let value = base_url.into();
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    Some(trimmed.trim_end_matches('/').to_string())
}
