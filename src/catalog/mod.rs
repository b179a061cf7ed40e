use crate::core::error::RuntimeError;
use crate::core::types::{CredentialType, ModelCatalog, ModelInfo, ProviderInfo};

pub const PROVIDER_ID: &str = "codex";
pub const PROVIDER_DISPLAY_NAME: &str = "OpenAI Codex";
pub const DEFAULT_MODEL: &str = "gpt-5.1-codex";

const PROVIDER_DESCRIPTION: &str =
    "OpenAI Codex coding agent with session resume, tool use and reasoning effort control";

/// Static capability descriptor the host uses for discovery.
pub fn provider_info() -> ProviderInfo {
    ProviderInfo {
        id: PROVIDER_ID.to_string(),
        display_name: PROVIDER_DISPLAY_NAME.to_string(),
        description: PROVIDER_DESCRIPTION.to_string(),
        credential_type: CredentialType::ApiKey,
        default_model: DEFAULT_MODEL.to_string(),
        catalog: builtin_static_catalog(),
    }
}

pub fn builtin_static_catalog() -> ModelCatalog {
    let mut models = vec![
        model("gpt-5.1-codex", "GPT-5.1 Codex"),
        model("gpt-5.1-codex-mini", "GPT-5.1 Codex Mini"),
        model("gpt-5.1", "GPT-5.1"),
        model("gpt-5-codex", "GPT-5 Codex"),
        model("gpt-5", "GPT-5"),
    ];
    sort_models(&mut models);

    ModelCatalog { models }
}

pub fn export_catalog_json(catalog: &ModelCatalog) -> Result<String, RuntimeError> {
    let mut normalized = catalog.clone();
    sort_models(&mut normalized.models);

    serde_json::to_string_pretty(&normalized).map_err(|error| RuntimeError::Serialization {
        message: error.to_string(),
    })
}

/// Orders models by id and drops repeated ids, keeping the first occurrence.
pub(crate) fn normalize_models(models: Vec<ModelInfo>) -> Vec<ModelInfo> {
    let mut normalized: Vec<ModelInfo> = Vec::with_capacity(models.len());
    for model in models {
        if normalized
            .iter()
            .any(|existing| existing.model_id == model.model_id)
        {
            continue;
        }
        normalized.push(model);
    }

    sort_models(&mut normalized);
    normalized
}

fn model(model_id: &str, display_name: &str) -> ModelInfo {
    ModelInfo {
        model_id: model_id.to_string(),
        display_name: Some(display_name.to_string()),
    }
}

fn sort_models(models: &mut [ModelInfo]) {
    models.sort_by(|left, right| left.model_id.cmp(&right.model_id));
}
