// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the Evolution API.
//!
//! Provides [`EvolutionClient`], which handles authentication, request
//! construction and response decoding for the instance and message
//! endpoints.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use wagate_core::{ConnectionStatus, WagateError};

/// Events the webhook is subscribed to on instance creation.
const WEBHOOK_EVENTS: [&str; 5] = [
    "QRCODE_UPDATED",
    "CONNECTION_UPDATE",
    "MESSAGES_UPSERT",
    "MESSAGES_UPDATE",
    "SEND_MESSAGE",
];

const WEBHOOK_ATTEMPTS: u32 = 3;

#[derive(Debug, Serialize)]
struct SendTextRequest<'a> {
    number: &'a str,
    #[serde(rename = "textMessage")]
    text_message: TextMessage<'a>,
}

#[derive(Debug, Serialize)]
struct TextMessage<'a> {
    text: &'a str,
}

/// Thin JSON client over an Evolution API server.
#[derive(Debug, Clone)]
pub struct EvolutionClient {
    client: reqwest::Client,
    base_url: String,
    webhook_backoff: Duration,
}

impl EvolutionClient {
    /// Creates a client for `base_url`, sending `api_key` as the `apikey` header.
    pub fn new(
        base_url: &str,
        api_key: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, WagateError> {
        let mut headers = HeaderMap::new();
        headers.insert("content-type", HeaderValue::from_static("application/json"));
        if let Some(key) = api_key {
            headers.insert(
                "apikey",
                HeaderValue::from_str(key).map_err(|e| {
                    WagateError::Config(format!("invalid bridge API key header value: {e}"))
                })?,
            );
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| WagateError::Bridge {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            webhook_backoff: Duration::from_millis(500),
        })
    }

    /// Shortens the webhook retry backoff (tests only).
    #[cfg(test)]
    pub fn with_webhook_backoff(mut self, backoff: Duration) -> Self {
        self.webhook_backoff = backoff;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Sends a text and returns the bridge's message id, when it reports one.
    pub async fn send_text(
        &self,
        instance: &str,
        to: &str,
        body: &str,
    ) -> Result<Option<String>, WagateError> {
        let number = to.trim_start_matches('+');
        let request = SendTextRequest {
            number,
            text_message: TextMessage { text: body },
        };
        let response = self
            .post(&format!("/message/sendText/{instance}"), &request)
            .await?;
        Ok(response
            .pointer("/key/id")
            .and_then(Value::as_str)
            .map(str::to_string))
    }

    /// Creates an instance; returns the raw creation response.
    pub async fn create_instance(&self, instance: &str) -> Result<Value, WagateError> {
        let request = json!({
            "instanceName": instance,
            "qrcode": true,
            "integration": "WHATSAPP-BAILEYS",
        });
        self.post("/instance/create", &request).await
    }

    /// Points the instance webhook at `url`, retrying with exponential backoff.
    pub async fn set_webhook(&self, instance: &str, url: &str) -> Result<(), WagateError> {
        let request = json!({
            "enabled": true,
            "url": url,
            "webhook_by_events": false,
            "webhook_base64": false,
            "events": WEBHOOK_EVENTS,
        });

        let mut last_error = None;
        for attempt in 0..WEBHOOK_ATTEMPTS {
            tokio::time::sleep(self.webhook_backoff * 2u32.pow(attempt)).await;
            match self
                .post(&format!("/webhook/set/{instance}"), &request)
                .await
            {
                Ok(_) => {
                    info!(instance, "webhook configured");
                    return Ok(());
                }
                Err(e) => {
                    warn!(
                        instance,
                        attempt = attempt + 1,
                        max = WEBHOOK_ATTEMPTS,
                        error = %e,
                        "failed to configure webhook"
                    );
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| WagateError::bridge("webhook configuration failed")))
    }

    pub async fn connection_state(&self, instance: &str) -> Result<ConnectionStatus, WagateError> {
        let response = self
            .get(&format!("/instance/connectionState/{instance}"))
            .await?;
        let state = response
            .pointer("/instance/state")
            .or_else(|| response.get("state"))
            .and_then(Value::as_str);
        Ok(match state {
            Some("open") => ConnectionStatus::Connected,
            Some("connecting") | Some("close") => ConnectionStatus::Connecting,
            _ => ConnectionStatus::Disconnected,
        })
    }

    pub async fn qr_code(&self, instance: &str) -> Result<Option<String>, WagateError> {
        let response = self.get(&format!("/instance/connect/{instance}")).await?;
        Ok(qr_from(&response))
    }

    pub async fn logout(&self, instance: &str) -> Result<(), WagateError> {
        let response = self
            .client
            .delete(self.url(&format!("/instance/logout/{instance}")))
            .send()
            .await
            .map_err(request_failed)?;
        decode(response).await.map(|_| ())
    }

    async fn post<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<Value, WagateError> {
        let response = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(request_failed)?;
        decode(response).await
    }

    async fn get(&self, path: &str) -> Result<Value, WagateError> {
        let response = self
            .client
            .get(self.url(path))
            .send()
            .await
            .map_err(request_failed)?;
        decode(response).await
    }
}

/// Base64 QR image in a creation or connect response.
pub(crate) fn qr_from(response: &Value) -> Option<String> {
    response
        .pointer("/qrcode/base64")
        .or_else(|| response.get("base64"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn request_failed(e: reqwest::Error) -> WagateError {
    WagateError::Bridge {
        message: format!("HTTP request failed: {e}"),
        source: Some(Box::new(e)),
    }
}

async fn decode(response: reqwest::Response) -> Result<Value, WagateError> {
    let status = response.status();
    let body = response.text().await.map_err(|e| WagateError::Bridge {
        message: format!("failed to read response body: {e}"),
        source: Some(Box::new(e)),
    })?;
    debug!(status = %status, "bridge response received");

    if !status.is_success() {
        return Err(WagateError::bridge(format!(
            "Evolution API returned {status}: {body}"
        )));
    }
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&body).map_err(|e| WagateError::Bridge {
        message: format!("failed to parse bridge response: {e}"),
        source: Some(Box::new(e)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(base_url: &str) -> EvolutionClient {
        EvolutionClient::new(base_url, Some("secret"), Duration::from_secs(5))
            .unwrap()
            .with_webhook_backoff(Duration::from_millis(1))
    }

    #[tokio::test]
    async fn send_text_strips_plus_and_returns_key_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/message/sendText/wa-mvp"))
            .and(header("apikey", "secret"))
            .and(body_json(json!({"number": "5215550001", "textMessage": {"text": "hola"}})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"key": {"id": "MSG1"}})))
            .mount(&server)
            .await;

        let id = test_client(&server.uri())
            .send_text("wa-mvp", "+5215550001", "hola")
            .await
            .unwrap();
        assert_eq!(id.as_deref(), Some("MSG1"));
    }

    #[tokio::test]
    async fn non_success_status_is_a_bridge_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/message/sendText/wa-mvp"))
            .respond_with(ResponseTemplate::new(404).set_body_string("instance not found"))
            .mount(&server)
            .await;

        let err = test_client(&server.uri())
            .send_text("wa-mvp", "1", "x")
            .await
            .unwrap_err();
        assert!(matches!(err, WagateError::Bridge { .. }));
        assert!(err.to_string().contains("instance not found"), "got: {err}");
    }

    #[tokio::test]
    async fn connection_state_maps_bridge_states() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/instance/connectionState/a"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"instance": {"state": "open"}})),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/instance/connectionState/b"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"state": "close"})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/instance/connectionState/c"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"state": "closed"})))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        assert_eq!(client.connection_state("a").await.unwrap(), ConnectionStatus::Connected);
        assert_eq!(client.connection_state("b").await.unwrap(), ConnectionStatus::Connecting);
        assert_eq!(client.connection_state("c").await.unwrap(), ConnectionStatus::Disconnected);
    }

    #[tokio::test]
    async fn set_webhook_retries_until_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/webhook/set/wa-mvp"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/webhook/set/wa-mvp"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"webhook": {}})))
            .mount(&server)
            .await;

        test_client(&server.uri())
            .set_webhook("wa-mvp", "https://gw.example.com/webhooks/evolution")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn set_webhook_gives_up_after_three_attempts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/webhook/set/wa-mvp"))
            .respond_with(ResponseTemplate::new(500))
            .expect(3)
            .mount(&server)
            .await;

        let result = test_client(&server.uri())
            .set_webhook("wa-mvp", "https://gw.example.com/webhooks/evolution")
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn qr_code_reads_either_layout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/instance/connect/wa-mvp"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"base64": "QR"})))
            .mount(&server)
            .await;

        let qr = test_client(&server.uri()).qr_code("wa-mvp").await.unwrap();
        assert_eq!(qr.as_deref(), Some("QR"));
        assert_eq!(
            qr_from(&json!({"qrcode": {"base64": "NESTED"}})).as_deref(),
            Some("NESTED")
        );
    }
}
