use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::config::{normalize_base_url, Config, DEFAULT_MODEL};
use crate::history::{LogEntry, RecipeLog};
use crate::llm::{
    call_chat_completion, normalize_images, CompletionError, CompletionRequest, InvalidImageError,
};
use crate::recipe::{parse_recipe, Recipe, RecipeError};

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateRequest {
    pub prompt: String,
    #[serde(default)]
    pub images: Option<Vec<String>>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("API Key not provided and not found in environment.")]
    MissingCredential,
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    InvalidImage(#[from] InvalidImageError),
    #[error(transparent)]
    Upstream(#[from] CompletionError),
    #[error(transparent)]
    Recipe(#[from] RecipeError),
}

/// Credential, endpoint and model after applying request overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

/// Request override first, then process configuration, then the built-in default.
pub fn resolve_target(
    config: &Config,
    request: &GenerateRequest,
) -> Result<ResolvedTarget, GenerateError> {
    let api_key = non_blank(request.api_key.as_deref())
        .or_else(|| non_blank(Some(config.openai_api_key.as_str())))
        .ok_or(GenerateError::MissingCredential)?
        .to_string();

    let base_url = match non_blank(request.base_url.as_deref()) {
        Some(value) => normalize_base_url(value)
            .map_err(|err| GenerateError::BadRequest(err.to_string()))?,
        None => config.openai_base_url.clone(),
    };

    let model = non_blank(request.model.as_deref())
        .or_else(|| non_blank(Some(config.openai_model.as_str())))
        .unwrap_or(DEFAULT_MODEL)
        .to_string();

    Ok(ResolvedTarget {
        api_key,
        base_url,
        model,
    })
}

/// Writes the entry on the blocking pool. Failures are logged and dropped.
async fn record_generation(log: Arc<dyn RecipeLog>, entry: LogEntry) {
    let entry_id = entry.id.clone();
    match tokio::task::spawn_blocking(move || log.put(&entry)).await {
        Ok(Ok(location)) => info!(
            "Logged generation {} as {}/{} ({})",
            entry_id,
            location.date,
            location.file_name,
            location.path.display()
        ),
        Ok(Err(err)) => error!("Failed to log result {}: {}", entry_id, err),
        Err(err) => error!("Result logging task for {} failed: {}", entry_id, err),
    }
}

pub async fn generate_recipe(
    config: &Config,
    log: Arc<dyn RecipeLog>,
    request: GenerateRequest,
) -> Result<Recipe, GenerateError> {
    if request.prompt.trim().is_empty() {
        return Err(GenerateError::BadRequest("prompt must not be empty".to_string()));
    }

    let target = resolve_target(config, &request)?;
    let images = normalize_images(request.images.as_deref().unwrap_or_default())?;

    info!(
        "Generating recipe: model={} images={} base_url={}",
        target.model,
        images.len(),
        target.base_url
    );

    let content = call_chat_completion(CompletionRequest {
        api_key: &target.api_key,
        base_url: &target.base_url,
        model: &target.model,
        prompt: &request.prompt,
        images: &images,
        temperature: config.openai_temperature,
        timeout: Duration::from_secs(config.openai_timeout_seconds),
    })
    .await?;

    let validated = parse_recipe(&content).map_err(|err| {
        if !err.violations().is_empty() {
            warn!(
                "Model output for model={} violated the recipe schema in {} field(s)",
                target.model,
                err.violations().len()
            );
        }
        err
    })?;

    let entry = LogEntry::new(&request.prompt, images.len(), &target.model, validated.raw);
    record_generation(log, entry).await;

    Ok(validated.recipe)
}
