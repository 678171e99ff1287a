// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! OpenAI chat-completions provider for wagate.
//!
//! [`OpenAiProvider`] implements [`CompletionProvider`]: one system and one
//! user message in, the trimmed first choice out. Invalid credentials,
//! rate limiting and empty answers are reported as distinct
//! [`ProviderFailure`] kinds.

pub mod types;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderValue};
use tracing::{debug, info};

use wagate_config::model::OpenAiConfig;
use wagate_core::{
    AdapterType, CompletionProvider, HealthStatus, PluginAdapter, ProviderFailure, WagateError,
};

use crate::types::{ApiErrorResponse, ChatMessage, ChatRequest, ChatResponse};

/// Chat-completions client.
#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl OpenAiProvider {
    /// Build a provider from configuration. Fails without an API key.
    pub fn new(config: &OpenAiConfig) -> Result<Self, WagateError> {
        let api_key = config
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| WagateError::Config("openai.api_key is required".into()))?;

        let mut headers = HeaderMap::new();
        headers.insert(
            "authorization",
            HeaderValue::from_str(&format!("Bearer {api_key}")).map_err(|e| {
                WagateError::Config(format!("invalid API key header value: {e}"))
            })?,
        );
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| WagateError::Provider {
                kind: ProviderFailure::Other,
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        info!(model = %config.model, "OpenAI provider initialized");
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

fn failure_for(status: StatusCode) -> ProviderFailure {
    match status.as_u16() {
        401 => ProviderFailure::InvalidCredentials,
        429 => ProviderFailure::RateLimited,
        _ => ProviderFailure::Other,
    }
}

#[async_trait]
impl PluginAdapter for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Completion
    }

    async fn health_check(&self) -> Result<HealthStatus, WagateError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), WagateError> {
        Ok(())
    }
}

#[async_trait]
impl CompletionProvider for OpenAiProvider {
    async fn generate(&self, user_text: &str, system_prompt: &str) -> Result<String, WagateError> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage::system(system_prompt), ChatMessage::user(user_text)],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| WagateError::Provider {
                kind: ProviderFailure::Other,
                message: format!("HTTP request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        debug!(status = %status, "completion response received");

        if !status.is_success() {
            let detail = serde_json::from_str::<ApiErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(WagateError::provider(
                failure_for(status),
                format!("OpenAI returned {status}: {detail}"),
            ));
        }

        let parsed: ChatResponse =
            serde_json::from_str(&body).map_err(|e| WagateError::Provider {
                kind: ProviderFailure::Other,
                message: format!("failed to parse API response: {e}"),
                source: Some(Box::new(e)),
            })?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or_else(|| {
                WagateError::provider(ProviderFailure::EmptyResponse, "no response generated")
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(base_url: &str) -> OpenAiProvider {
        OpenAiProvider::new(&OpenAiConfig {
            api_key: Some("sk-test".into()),
            base_url: base_url.to_string(),
            ..OpenAiConfig::default()
        })
        .unwrap()
    }

    fn reply(content: &str) -> serde_json::Value {
        json!({"choices": [{"index": 0, "message": {"role": "assistant", "content": content}}]})
    }

    #[tokio::test]
    async fn generate_sends_system_and_user_messages() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({
                "model": "gpt-3.5-turbo",
                "max_tokens": 500,
                "messages": [
                    {"role": "system", "content": "sé breve"},
                    {"role": "user", "content": "hola"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply("  ¡Hola! 👋 \n")))
            .mount(&server)
            .await;

        let text = provider(&server.uri()).generate("hola", "sé breve").await.unwrap();
        assert_eq!(text, "¡Hola! 👋");
    }

    #[tokio::test]
    async fn unauthorized_is_invalid_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_json(
                json!({"error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}}),
            ))
            .mount(&server)
            .await;

        let err = provider(&server.uri()).generate("hola", "s").await.unwrap_err();
        assert_eq!(err.provider_failure(), Some(ProviderFailure::InvalidCredentials));
        assert!(err.to_string().contains("Incorrect API key"), "got: {err}");
    }

    #[tokio::test]
    async fn too_many_requests_is_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .mount(&server)
            .await;

        let err = provider(&server.uri()).generate("hola", "s").await.unwrap_err();
        assert_eq!(err.provider_failure(), Some(ProviderFailure::RateLimited));
    }

    #[tokio::test]
    async fn blank_choice_is_empty_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply("   ")))
            .mount(&server)
            .await;

        let err = provider(&server.uri()).generate("hola", "s").await.unwrap_err();
        assert_eq!(err.provider_failure(), Some(ProviderFailure::EmptyResponse));
    }

    #[test]
    fn missing_api_key_is_config_error() {
        let err = OpenAiProvider::new(&OpenAiConfig::default()).unwrap_err();
        assert!(matches!(err, WagateError::Config(_)));
    }
}
