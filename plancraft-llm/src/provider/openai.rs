//! OpenAI-compatible provider implementation
//!
//! Works with OpenAI, Azure OpenAI, vLLM, Ollama, and other OpenAI-compatible APIs.

use super::*;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// OpenAI-compatible provider
pub struct OpenAIProvider {
    client: Client,
    config: ProviderConfig,
}

impl OpenAIProvider {
    pub fn new(config: ProviderConfig) -> Result<Self, ProviderError> {
        let client = http_client(&config)?;
        Ok(Self { client, config })
    }

    fn base_url(&self) -> &str {
        self.config.base_url.as_deref().unwrap_or("https://api.openai.com/v1")
    }
}

impl LlmProvider for OpenAIProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn default_model(&self) -> &str {
        self.config.default_model.as_deref().unwrap_or("gpt-4o")
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError> {
        let model = request.model.as_deref().unwrap_or(self.default_model());

        let api_request = OpenAIRequest {
            model: model.to_string(),
            messages: request.messages.iter().map(OpenAIMessage::from).collect(),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            stop: request.stop.clone(),
        };

        let url = format!("{}/chat/completions", self.base_url());
        tracing::debug!(provider = "openai", %model, %url, messages = api_request.messages.len(), "sending completion request");

        let mut req = self.client.post(&url).json(&api_request);

        if let Some(api_key) = &self.config.api_key {
            if !api_key.is_empty() {
                req = req.header("Authorization", format!("Bearer {}", api_key));
            }
        }

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

/// Decode a chat-completions response body.
pub(crate) fn decode_response(body: &str) -> Result<CompletionResponse, ProviderError> {
    let api_response: OpenAIResponse = serde_json::from_str(body)
        .map_err(|e| ProviderError::Parse(e.to_string()))?;

    let choice = api_response.choices.into_iter().next()
        .ok_or_else(|| ProviderError::Parse("No choices in response".into()))?;

    let finish_reason = match choice.finish_reason.as_deref() {
        Some("stop") => FinishReason::Stop,
        Some("length") => FinishReason::Length,
        Some("content_filter") => FinishReason::ContentFilter,
        _ => FinishReason::Unknown,
    };

    let usage = api_response.usage.map(|u| Usage {
        prompt_tokens: u.prompt_tokens,
        completion_tokens: u.completion_tokens,
        total_tokens: u.total_tokens,
    }).unwrap_or_default();

    Ok(CompletionResponse {
        id: api_response.id,
        model: api_response.model,
        content: choice.message.content,
        finish_reason,
        usage,
    })
}

// ============================================================================
// OpenAI API Types
// ============================================================================

#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<Vec<String>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAIMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
}

impl From<&ChatMessage> for OpenAIMessage {
    fn from(msg: &ChatMessage) -> Self {
        Self {
            role: msg.role.as_str().into(),
            content: Some(msg.content.clone()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    #[serde(default)]
    id: String,
    #[serde(default)]
    model: String,
    choices: Vec<OpenAIChoice>,
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIUsage {
    prompt_tokens: usize,
    completion_tokens: usize,
    total_tokens: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::test_server::serve_once;

    const COMPLETION: &str = r##"{
        "id": "chatcmpl-123",
        "object": "chat.completion",
        "model": "gpt-4o-2024-08-06",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": "# Plan\n\n1. Build it"},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 12, "completion_tokens": 7, "total_tokens": 19}
    }"##;

    #[test]
    fn test_decode_response() {
        let response = decode_response(COMPLETION).unwrap();
        assert_eq!(response.id, "chatcmpl-123");
        assert_eq!(response.finish_reason, FinishReason::Stop);
        assert_eq!(response.usage.total_tokens, 19);
        assert_eq!(response.content.as_deref(), Some("# Plan\n\n1. Build it"));
    }

    #[test]
    fn test_decode_response_without_choices() {
        let err = decode_response(r#"{"id": "x", "model": "m", "choices": []}"#).unwrap_err();
        assert!(matches!(err, ProviderError::Parse(_)));

        let err = decode_response("not json").unwrap_err();
        assert!(matches!(err, ProviderError::Parse(_)));
    }

    #[test]
    fn test_message_wire_format() {
        let value = serde_json::to_value(OpenAIMessage::from(&ChatMessage::system("be brief"))).unwrap();
        assert_eq!(value, serde_json::json!({"role": "system", "content": "be brief"}));
    }

    #[tokio::test]
    async fn test_complete_against_local_server() {
        let (base_url, server) = serve_once(200, COMPLETION).await;
        let provider = OpenAIProvider::new(ProviderConfig::openai("sk-test").with_base_url(base_url)).unwrap();

        let request = CompletionRequest::new(vec![
            ChatMessage::system("You are a planner"),
            ChatMessage::user("Build a todo app"),
        ])
        .with_temperature(0.2);
        let text = provider.complete(request).await.unwrap().into_text().unwrap();
        assert!(text.starts_with("# Plan"));

        let raw = server.await.unwrap();
        assert!(raw.starts_with("POST /chat/completions"));
        assert!(raw.to_ascii_lowercase().contains("authorization: bearer sk-test"));
        assert!(raw.contains("\"model\":\"gpt-4o\""));
        assert!(raw.contains("Build a todo app"));
    }

    #[tokio::test]
    async fn test_complete_maps_unauthorized() {
        let (base_url, _server) = serve_once(401, r#"{"error": {"message": "bad key"}}"#).await;
        let provider = OpenAIProvider::new(ProviderConfig::openai("sk-bad").with_base_url(base_url)).unwrap();

        let err = provider.prompt("hello").await.unwrap_err();
        assert!(matches!(err, ProviderError::AuthenticationFailed));
    }
}
