use std::time::Duration;

use futures::future::BoxFuture;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use codeloom_core::config::ModelConfig;
use codeloom_core::error::{CodeloomError, Result, ServiceErrorKind};
use codeloom_core::traits::GenerationService;

use super::{classify_status, classify_transport};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct AnthropicService {
    http: Client,
}

impl AnthropicService {
    pub fn new() -> Self {
        Self {
            http: Client::new(),
        }
    }
}

impl Default for AnthropicService {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    temperature: f32,
    system: String,
    messages: Vec<ApiMessage>,
}

#[derive(Serialize)]
struct ApiMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: Option<ErrorDetail>,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

impl AnthropicService {
    async fn request(&self, config: ModelConfig, system: String, user: String) -> Result<String> {
        let api_key = config
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                CodeloomError::service(ServiceErrorKind::Auth, "no API key configured")
            })?;

        let url = config
            .base_url
            .as_deref()
            .map(|b| format!("{}/v1/messages", b.trim_end_matches('/')))
            .unwrap_or_else(|| ANTHROPIC_API_URL.to_string());

        let body = MessagesRequest {
            model: config.model_id.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            system,
            messages: vec![ApiMessage {
                role: "user",
                content: user,
            }],
        };

        debug!(model = %config.model_id, url = %url, "sending completion request");

        let response = self
            .http
            .post(&url)
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .json(&body)
            .send()
            .await
            .map_err(|e| CodeloomError::service(classify_transport(&e), e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let kind = classify_status(status);
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&text)
                .ok()
                .and_then(|e| e.error)
                .map(|e| e.message)
                .unwrap_or(text);
            return Err(CodeloomError::service(
                kind,
                format!("HTTP {}: {}", status.as_u16(), message),
            ));
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| CodeloomError::service(ServiceErrorKind::Other, e.to_string()))?;

        let text: String = parsed
            .content
            .into_iter()
            .filter_map(|b| match b {
                ContentBlock::Text { text } => Some(text),
                ContentBlock::Other => None,
            })
            .collect::<Vec<_>>()
            .join("");

        if text.is_empty() {
            return Err(CodeloomError::service(
                ServiceErrorKind::Other,
                "completion had no text content",
            ));
        }
        Ok(text)
    }
}

impl GenerationService for AnthropicService {
    fn complete(
        &self,
        config: &ModelConfig,
        system: &str,
        user: &str,
    ) -> BoxFuture<'_, Result<String>> {
        let config = config.clone();
        let system = system.to_string();
        let user = user.to_string();
        Box::pin(async move { self.request(config, system, user).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_api_key_is_auth_error() {
        let service = AnthropicService::new();
        let config = ModelConfig {
            provider: "anthropic".into(),
            ..Default::default()
        };
        let err = service.complete(&config, "system", "user").await.unwrap_err();
        match err {
            CodeloomError::Service { kind, .. } => assert_eq!(kind, ServiceErrorKind::Auth),
            other => panic!("expected Service error, got {other:?}"),
        }
    }

    #[test]
    fn test_response_parsing() {
        let json = r#"{"content":[{"type":"text","text":"hello"},{"type":"tool_use","id":"x"}]}"#;
        let parsed: MessagesResponse = serde_json::from_str(json).unwrap();
        let text: String = parsed
            .content
            .into_iter()
            .filter_map(|b| match b {
                ContentBlock::Text { text } => Some(text),
                ContentBlock::Other => None,
            })
            .collect();
        assert_eq!(text, "hello");
    }
}
