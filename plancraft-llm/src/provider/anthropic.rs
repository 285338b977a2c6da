//! Anthropic Claude provider implementation

use super::*;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Anthropic requires an explicit output budget on every request
const DEFAULT_MAX_TOKENS: usize = 8192;

/// Anthropic Claude provider
pub struct AnthropicProvider {
    client: Client,
    config: ProviderConfig,
}

impl AnthropicProvider {
    pub fn new(config: ProviderConfig) -> Result<Self, ProviderError> {
        let client = http_client(&config)?;
        Ok(Self { client, config })
    }

    fn base_url(&self) -> &str {
        self.config.base_url.as_deref().unwrap_or("https://api.anthropic.com/v1")
    }
}

impl LlmProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn default_model(&self) -> &str {
        self.config.default_model.as_deref().unwrap_or("claude-sonnet-4-20250514")
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError> {
        let model = request.model.as_deref().unwrap_or(self.default_model());
        let api_request = build_request(model, &request);

        let api_key = self.config.api_key.as_ref()
            .ok_or(ProviderError::AuthenticationFailed)?;

        let url = format!("{}/messages", self.base_url());
        tracing::debug!(provider = "anthropic", %model, %url, messages = api_request.messages.len(), "sending completion request");

        let mut req = self.client
            .post(&url)
            .header("x-api-key", api_key)
            .header("content-type", "application/json")
            .json(&api_request);

        for (key, value) in &self.config.headers {
            req = req.header(key, value);
        }

        let response = req.send().await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let body = response.text().await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        decode_response(&body)
    }
}

/// System messages move to the top-level `system` field; several are joined.
fn build_request(model: &str, request: &CompletionRequest) -> AnthropicRequest {
    let mut system: Vec<&str> = Vec::new();
    let mut messages = Vec::new();
    for msg in &request.messages {
        if msg.role == Role::System {
            system.push(&msg.content);
        } else {
            messages.push(AnthropicMessage::from(msg));
        }
    }

    AnthropicRequest {
        model: model.to_string(),
        messages,
        system: if system.is_empty() { None } else { Some(system.join("\n\n")) },
        max_tokens: request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        temperature: request.temperature,
        stop_sequences: request.stop.clone(),
    }
}

/// Decode a messages-API response body, concatenating its text blocks.
pub(crate) fn decode_response(body: &str) -> Result<CompletionResponse, ProviderError> {
    let api_response: AnthropicResponse = serde_json::from_str(body)
        .map_err(|e| ProviderError::Parse(e.to_string()))?;

    let content: String = api_response.content.iter()
        .filter_map(|block| match block {
            ContentBlock::Text { text } => Some(text.as_str()),
            ContentBlock::Other => None,
        })
        .collect();

    let finish_reason = match api_response.stop_reason.as_deref() {
        Some("end_turn") | Some("stop_sequence") => FinishReason::Stop,
        Some("max_tokens") => FinishReason::Length,
        _ => FinishReason::Unknown,
    };

    let usage = Usage {
        prompt_tokens: api_response.usage.input_tokens,
        completion_tokens: api_response.usage.output_tokens,
        total_tokens: api_response.usage.input_tokens + api_response.usage.output_tokens,
    };

    Ok(CompletionResponse {
        id: api_response.id,
        model: api_response.model,
        content: if content.is_empty() { None } else { Some(content) },
        finish_reason,
        usage,
    })
}

// ============================================================================
// Anthropic API Types
// ============================================================================

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    messages: Vec<AnthropicMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    max_tokens: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop_sequences: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: String,
    content: String,
}

impl From<&ChatMessage> for AnthropicMessage {
    fn from(msg: &ChatMessage) -> Self {
        let role = match msg.role {
            Role::User | Role::System => "user",
            Role::Assistant => "assistant",
        };
        Self {
            role: role.into(),
            content: msg.content.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    #[serde(default)]
    id: String,
    #[serde(default)]
    model: String,
    content: Vec<ContentBlock>,
    stop_reason: Option<String>,
    usage: AnthropicUsage,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: usize,
    output_tokens: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::test_server::serve_once;

    const MESSAGE: &str = r#"{
        "id": "msg_01",
        "type": "message",
        "role": "assistant",
        "model": "claude-sonnet-4-20250514",
        "content": [
            {"type": "text", "text": "=== FILE: main.py ===\n"},
            {"type": "thinking", "thinking": "hidden"},
            {"type": "text", "text": "print('hi')\n"}
        ],
        "stop_reason": "end_turn",
        "usage": {"input_tokens": 30, "output_tokens": 10}
    }"#;

    #[test]
    fn test_build_request_lifts_system_prompt() {
        let request = CompletionRequest::new(vec![
            ChatMessage::system("You are a developer"),
            ChatMessage::user("Implement the plan"),
        ]);
        let api_request = build_request("claude-sonnet-4-20250514", &request);

        assert_eq!(api_request.system.as_deref(), Some("You are a developer"));
        assert_eq!(api_request.messages.len(), 1);
        assert_eq!(api_request.messages[0].role, "user");
        assert_eq!(api_request.max_tokens, DEFAULT_MAX_TOKENS);
    }

    #[test]
    fn test_decode_response_joins_text_blocks() {
        let response = decode_response(MESSAGE).unwrap();
        assert_eq!(response.content.as_deref(), Some("=== FILE: main.py ===\nprint('hi')\n"));
        assert_eq!(response.finish_reason, FinishReason::Stop);
        assert_eq!(response.usage.total_tokens, 40);
    }

    #[test]
    fn test_decode_response_truncated() {
        let body = r#"{"id": "m", "model": "c", "content": [], "stop_reason": "max_tokens",
                       "usage": {"input_tokens": 1, "output_tokens": 0}}"#;
        let response = decode_response(body).unwrap();
        assert_eq!(response.finish_reason, FinishReason::Length);
        assert!(response.content.is_none());
    }

    #[tokio::test]
    async fn test_complete_against_local_server() {
        let (base_url, server) = serve_once(200, MESSAGE).await;
        let provider = AnthropicProvider::new(
            ProviderConfig::anthropic("sk-ant-test").with_base_url(base_url),
        )
        .unwrap();

        let text = provider
            .chat(vec![ChatMessage::system("sys"), ChatMessage::user("go")])
            .await
            .unwrap();
        assert!(text.contains("print('hi')"));

        let raw = server.await.unwrap().to_ascii_lowercase();
        assert!(raw.starts_with("post /messages"));
        assert!(raw.contains("x-api-key: sk-ant-test"));
        assert!(raw.contains("anthropic-version: 2023-06-01"));
    }

    #[tokio::test]
    async fn test_complete_maps_rate_limit() {
        let (base_url, _server) = serve_once(429, r#"{"type": "error"}"#).await;
        let provider = AnthropicProvider::new(
            ProviderConfig::anthropic("sk-ant-test").with_base_url(base_url),
        )
        .unwrap();

        let err = provider.prompt("go").await.unwrap_err();
        assert!(matches!(err, ProviderError::RateLimited { .. }));
    }
}
