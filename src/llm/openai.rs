use std::time::Duration;

use reqwest::StatusCode;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::RECIPE_SYSTEM_PROMPT;
use crate::utils::http::get_http_client;
use crate::utils::timing::log_llm_timing;

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("Invalid response from AI provider (no choices returned)")]
    NoChoices,
    #[error("Empty response from AI")]
    EmptyContent,
    #[error("AI provider request failed with status {status}: {detail}")]
    Status { status: StatusCode, detail: String },
    #[error("AI provider request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Everything one chat completion call needs. Credential, endpoint and model
/// are already resolved by the caller.
#[derive(Debug, Clone)]
pub struct CompletionRequest<'a> {
    pub api_key: &'a str,
    pub base_url: &'a str,
    pub model: &'a str,
    pub prompt: &'a str,
    pub images: &'a [String],
    pub temperature: f32,
    pub timeout: Duration,
}

fn truncate_for_log(value: &str, limit: usize) -> String {
    if value.chars().count() <= limit {
        return value.to_string();
    }
    let truncated: String = value.chars().take(limit).collect();
    format!("{truncated}... (truncated)")
}

fn summarize_error_body(body: &str) -> (Option<String>, String) {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return (None, "empty response body".to_string());
    }

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        let message = value
            .pointer("/error/message")
            .and_then(|v| v.as_str())
            .map(|v| v.to_string())
            .or_else(|| {
                value
                    .get("message")
                    .and_then(|v| v.as_str())
                    .map(|v| v.to_string())
            });
        return (message, truncate_for_log(&value.to_string(), 2000));
    }

    (None, truncate_for_log(trimmed, 2000))
}

fn build_user_content(prompt: &str, images: &[String]) -> Value {
    let mut parts = Vec::with_capacity(images.len() + 1);
    parts.push(json!({
        "type": "text",
        "text": format!("Generate a recipe for: {prompt}")
    }));

    for image_url in images {
        parts.push(json!({
            "type": "image_url",
            "image_url": { "url": image_url }
        }));
    }

    Value::Array(parts)
}

pub fn build_payload(request: &CompletionRequest<'_>) -> Value {
    json!({
        "model": request.model,
        "messages": [
            { "role": "system", "content": RECIPE_SYSTEM_PROMPT },
            { "role": "user", "content": build_user_content(request.prompt, request.images) }
        ],
        "response_format": { "type": "json_object" },
        "temperature": request.temperature,
    })
}

async fn call_chat_api(
    request: &CompletionRequest<'_>,
    payload: &Value,
) -> Result<Value, CompletionError> {
    let image_sizes: Vec<usize> = request.images.iter().map(|image| image.len()).collect();
    debug!(
        "Chat completion request: model={}, images={}, image_sizes={:?}",
        request.model,
        request.images.len(),
        image_sizes
    );

    let response = get_http_client()
        .post(format!(
            "{}/chat/completions",
            request.base_url.trim_end_matches('/')
        ))
        .bearer_auth(request.api_key)
        .timeout(request.timeout)
        .json(payload)
        .send()
        .await?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let (message, body_summary) = summarize_error_body(&body);
        warn!(
            "Chat completion API error: status={}, body={}",
            status, body_summary
        );
        return Err(CompletionError::Status {
            status,
            detail: message.unwrap_or(body_summary),
        });
    }

    let value = response.json::<Value>().await?;
    debug!("Chat completion response received for model={}", request.model);
    Ok(value)
}

pub fn extract_completion_text(response: &Value) -> Result<String, CompletionError> {
    let first_choice = response
        .get("choices")
        .and_then(|v| v.as_array())
        .and_then(|choices| choices.first())
        .ok_or_else(|| {
            warn!(
                "Chat completion returned no choices: {}",
                truncate_for_log(&response.to_string(), 2000)
            );
            CompletionError::NoChoices
        })?;

    let content = first_choice
        .get("message")
        .and_then(|v| v.get("content"))
        .and_then(|v| v.as_str())
        .unwrap_or("");

    if content.trim().is_empty() {
        return Err(CompletionError::EmptyContent);
    }
    Ok(content.to_string())
}

/// Sends the recipe prompt and returns the raw completion text. No retries.
pub async fn call_chat_completion(request: CompletionRequest<'_>) -> Result<String, CompletionError> {
    let payload = build_payload(&request);
    let metadata = json!({ "image_count": request.images.len() });

    log_llm_timing(
        "openai-compatible",
        request.model,
        "recipe:generate",
        Some(metadata),
        || async {
            let response = call_chat_api(&request, &payload).await?;
            extract_completion_text(&response)
        },
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request<'a>(images: &'a [String]) -> CompletionRequest<'a> {
        CompletionRequest {
            api_key: "sk-test",
            base_url: "https://api.example.com/v1",
            model: "gpt-4o",
            prompt: "rainy Tokyo night",
            images,
            temperature: 0.7,
            timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn payload_requests_json_object_with_system_prompt() {
        let images: Vec<String> = Vec::new();
        let payload = build_payload(&request(&images));

        assert_eq!(payload["model"], "gpt-4o");
        assert_eq!(payload["response_format"]["type"], "json_object");
        assert_eq!(payload["messages"][0]["role"], "system");
        assert_eq!(payload["messages"][0]["content"], RECIPE_SYSTEM_PROMPT);

        let user_content = payload["messages"][1]["content"].as_array().unwrap();
        assert_eq!(user_content.len(), 1);
        assert_eq!(
            user_content[0]["text"],
            "Generate a recipe for: rainy Tokyo night"
        );
    }

    #[test]
    fn payload_adds_one_block_per_image() {
        let images = vec![
            "data:image/png;base64,AAAA".to_string(),
            "https://example.com/a.jpg".to_string(),
        ];
        let payload = build_payload(&request(&images));
        let user_content = payload["messages"][1]["content"].as_array().unwrap();

        assert_eq!(user_content.len(), 3);
        assert_eq!(user_content[1]["type"], "image_url");
        assert_eq!(user_content[1]["image_url"]["url"], images[0]);
        assert_eq!(user_content[2]["image_url"]["url"], images[1]);
    }

    #[test]
    fn missing_choices_is_an_upstream_failure() {
        let err = extract_completion_text(&json!({ "choices": [] })).unwrap_err();
        assert!(matches!(err, CompletionError::NoChoices));

        let err = extract_completion_text(&json!({ "id": "x" })).unwrap_err();
        assert!(matches!(err, CompletionError::NoChoices));
    }

    #[test]
    fn blank_content_is_an_upstream_failure() {
        let response = json!({ "choices": [{ "message": { "content": "   " } }] });
        let err = extract_completion_text(&response).unwrap_err();
        assert!(matches!(err, CompletionError::EmptyContent));

        let response = json!({ "choices": [{ "message": { "content": null } }] });
        assert!(matches!(
            extract_completion_text(&response).unwrap_err(),
            CompletionError::EmptyContent
        ));
    }

    #[test]
    fn returns_first_choice_content() {
        let response = json!({ "choices": [{ "message": { "content": "{\"a\":1}" } }] });
        assert_eq!(extract_completion_text(&response).unwrap(), "{\"a\":1}");
    }

    #[test]
    fn error_body_prefers_provider_message() {
        let (message, _) =
            summarize_error_body(r#"{"error":{"message":"Incorrect API key provided"}}"#);
        assert_eq!(message.as_deref(), Some("Incorrect API key provided"));

        let (message, summary) = summarize_error_body("  ");
        assert!(message.is_none());
        assert_eq!(summary, "empty response body");
    }
}
