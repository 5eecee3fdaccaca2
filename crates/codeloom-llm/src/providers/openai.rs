use std::time::Duration;

use futures::future::BoxFuture;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use codeloom_core::config::ModelConfig;
use codeloom_core::error::{CodeloomError, Result, ServiceErrorKind};
use codeloom_core::traits::GenerationService;

use super::{classify_status, classify_transport};

const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Client for OpenAI and OpenAI-compatible chat completion endpoints.
pub struct OpenAiService {
    http: Client,
}

impl OpenAiService {
    pub fn new() -> Self {
        Self {
            http: Client::new(),
        }
    }
}

impl Default for OpenAiService {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ApiMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ApiMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: Option<ErrorDetail>,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

impl OpenAiService {
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
            .map(|b| format!("{}/chat/completions", b.trim_end_matches('/')))
            .unwrap_or_else(|| OPENAI_API_URL.to_string());

        let body = ChatRequest {
            model: config.model_id.clone(),
            messages: vec![
                ApiMessage {
                    role: "system",
                    content: system,
                },
                ApiMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        };

        debug!(model = %config.model_id, url = %url, "sending completion request");

        let response = self
            .http
            .post(&url)
            .bearer_auth(api_key)
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

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| CodeloomError::service(ServiceErrorKind::Other, e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| {
                CodeloomError::service(ServiceErrorKind::Other, "completion had no content")
            })
    }
}

impl GenerationService for OpenAiService {
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
        let service = OpenAiService::new();
        let config = ModelConfig::default();
        let err = service.complete(&config, "system", "user").await.unwrap_err();
        match err {
            CodeloomError::Service { kind, .. } => assert_eq!(kind, ServiceErrorKind::Auth),
            other => panic!("expected Service error, got {other:?}"),
        }
    }

    #[test]
    fn test_request_serialization() {
        let body = ChatRequest {
            model: "gpt-4o".into(),
            messages: vec![ApiMessage {
                role: "user",
                content: "hi".into(),
            }],
            temperature: 0.1,
            max_tokens: 2000,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "gpt-4o");
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["max_tokens"], 2000);
    }
}
