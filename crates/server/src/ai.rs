//! Language-model client (Anthropic Messages API).
//!
//! Clause extraction and notice drafting go through this module. Calls carry
//! a per-call timeout and are never made while a database transaction is
//! open.

use serde::Deserialize;
use serde_json::json;

use shared_types::AppError;

use crate::config::settings;

const API_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";

/// Map model tiers to concrete model ids.
fn model_id(tier: &str) -> &'static str {
    match tier {
        "haiku" => "claude-haiku-4-5-20251001",
        "opus" => "claude-opus-4-5-20250620",
        _ => "claude-sonnet-4-5-20250929",
    }
}

/// A completed language-model response.
#[derive(Debug, Clone)]
pub struct AiResponse {
    pub content: String,
    pub model: String,
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub latency_ms: u128,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    model: String,
    usage: Usage,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: i64,
    output_tokens: i64,
}

/// Generate a language-model response.
///
/// `tier` is one of "haiku", "sonnet", "opus". Transport and non-2xx
/// failures surface as `UpstreamError`.
#[tracing::instrument(skip_all, fields(tier = tier, max_tokens = max_tokens))]
pub async fn generate_response(
    system_prompt: &str,
    user_prompt: &str,
    tier: &str,
    max_tokens: u32,
    temperature: f32,
    timeout: std::time::Duration,
) -> Result<AiResponse, AppError> {
    let api_key = settings()
        .anthropic_api_key
        .clone()
        .ok_or_else(|| AppError::upstream("ANTHROPIC_API_KEY is not configured"))?;

    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| AppError::internal(format!("Failed to build HTTP client: {}", e)))?;

    let body = json!({
        "model": model_id(tier),
        "max_tokens": max_tokens,
        "temperature": temperature,
        "system": system_prompt,
        "messages": [{ "role": "user", "content": user_prompt }],
    });

    let start = std::time::Instant::now();
    let response = client
        .post(API_URL)
        .header("x-api-key", api_key)
        .header("anthropic-version", API_VERSION)
        .json(&body)
        .send()
        .await
        .map_err(|e| AppError::upstream(format!("Language model request failed: {}", e)))?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(AppError::upstream(format!(
            "Language model error ({}): {}",
            status, body
        )));
    }

    let parsed: MessagesResponse = response
        .json()
        .await
        .map_err(|e| AppError::upstream(format!("Malformed language model response: {}", e)))?;

    let latency_ms = start.elapsed().as_millis();
    let content = parsed
        .content
        .iter()
        .find(|b| b.block_type == "text")
        .map(|b| b.text.clone())
        .unwrap_or_default();

    tracing::info!(
        model = %parsed.model,
        input_tokens = parsed.usage.input_tokens,
        output_tokens = parsed.usage.output_tokens,
        latency_ms = latency_ms as u64,
        "Language model call completed"
    );

    Ok(AiResponse {
        content,
        model: parsed.model,
        input_tokens: parsed.usage.input_tokens,
        output_tokens: parsed.usage.output_tokens,
        latency_ms,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_mapping_defaults_to_sonnet() {
        assert_eq!(model_id("haiku"), "claude-haiku-4-5-20251001");
        assert_eq!(model_id("opus"), "claude-opus-4-5-20250620");
        assert_eq!(model_id("sonnet"), "claude-sonnet-4-5-20250929");
        assert_eq!(model_id("unknown"), "claude-sonnet-4-5-20250929");
    }

    #[test]
    fn messages_response_parses() {
        let raw = r#"{
            "content": [{"type": "text", "text": "[]"}],
            "model": "claude-sonnet-4-5-20250929",
            "usage": {"input_tokens": 120, "output_tokens": 4}
        }"#;
        let parsed: MessagesResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.content[0].text, "[]");
        assert_eq!(parsed.usage.input_tokens, 120);
    }
}
