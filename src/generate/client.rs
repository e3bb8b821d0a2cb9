//! Core `PoemGenerator` trait, `GenerationError`, and the shared
//! chat-completions transport.
//!
//! `ChatClient` calls any OpenAI-compatible `/v1/chat/completions` endpoint.
//! Connection details (`base_url`, `api_key`, `model`, `timeout_secs`) come
//! from the [`GenerationConfig`] passed to each call; nothing is hardcoded
//! and nothing is cached between calls.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::camera::CaptureArtifact;
use crate::config::GenerationConfig;

// ---------------------------------------------------------------------------
// GenerationError
// ---------------------------------------------------------------------------

/// Errors that can occur while turning an image into text.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// HTTP transport or connection error.
    #[error("request failed: {0}")]
    Request(String),

    /// The request did not complete within the configured timeout.
    #[error("generation timed out after {0}s")]
    Timeout(u64),

    /// The service answered with a non-success status.
    #[error("service error {status}: {message}")]
    Service { status: u16, message: String },

    /// The response body could not be parsed as expected JSON.
    #[error("failed to parse response: {0}")]
    Parse(String),

    /// The service returned a response with no usable text content.
    #[error("service returned an empty response")]
    EmptyResponse,

    /// The captured image could not be prepared for upload.
    #[error("image unusable: {0}")]
    Image(String),
}

impl GenerationError {
    fn from_reqwest(e: reqwest::Error, timeout_secs: u64) -> Self {
        if e.is_timeout() {
            GenerationError::Timeout(timeout_secs)
        } else {
            GenerationError::Request(e.to_string())
        }
    }

    /// `true` for [`GenerationError::Timeout`].
    pub fn is_timeout(&self) -> bool {
        matches!(self, GenerationError::Timeout(_))
    }
}

// ---------------------------------------------------------------------------
// PoemGenerator trait
// ---------------------------------------------------------------------------

/// Turns one captured frame into short text.
///
/// Implementors must be `Send + Sync` so they can be shared across tasks
/// (e.g. wrapped in `Arc<dyn PoemGenerator>`).  Implementations never retry:
/// one invocation is one external call (two for the caption-then-poem
/// strategy), each bounded by the configured timeout.
#[async_trait]
pub trait PoemGenerator: Send + Sync {
    async fn generate(&self, image: &CaptureArtifact) -> Result<String, GenerationError>;
}

// ---------------------------------------------------------------------------
// ChatClient
// ---------------------------------------------------------------------------

/// Thin wrapper over `reqwest::Client` speaking the chat-completions format.
#[derive(Clone, Default)]
pub struct ChatClient {
    http: reqwest::Client,
}

impl ChatClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Send `messages` and return the first choice's trimmed content.
    ///
    /// The `Authorization: Bearer …` header is attached only when
    /// `config.api_key` is a non-empty string.
    pub async fn complete(
        &self,
        config: &GenerationConfig,
        messages: serde_json::Value,
    ) -> Result<String, GenerationError> {
        let url = format!(
            "{}/v1/chat/completions",
            config.base_url.trim_end_matches('/')
        );

        let body = serde_json::json!({
            "model":    config.model,
            "messages": messages,
            "stream":   false,
        });

        let timeout_secs = config.timeout_secs;
        let mut req = self
            .http
            .post(&url)
            .timeout(Duration::from_secs(timeout_secs))
            .json(&body);

        let key = config.api_key.as_deref().unwrap_or("");
        if !key.is_empty() {
            req = req.bearer_auth(key);
        }

        let response = req
            .send()
            .await
            .map_err(|e| GenerationError::from_reqwest(e, timeout_secs))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(GenerationError::Service {
                status: status.as_u16(),
                message: service_message(&text),
            });
        }

        let json: serde_json::Value = response.json().await.map_err(|e| {
            if e.is_timeout() {
                GenerationError::Timeout(timeout_secs)
            } else {
                GenerationError::Parse(e.to_string())
            }
        })?;

        let content = json["choices"][0]["message"]["content"]
            .as_str()
            .ok_or(GenerationError::EmptyResponse)?
            .trim()
            .to_string();

        if content.is_empty() {
            return Err(GenerationError::EmptyResponse);
        }

        Ok(content)
    }
}

/// Pull `error.message` out of an OpenAI-style error body, else the raw body.
fn service_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

/// `data:` URL carrying the artifact as base64 JPEG.
pub fn image_data_url(image: &CaptureArtifact) -> Result<String, GenerationError> {
    use base64::Engine as _;

    if image.bytes.is_empty() {
        return Err(GenerationError::Image("no image data".into()));
    }
    let encoded = base64::engine::general_purpose::STANDARD.encode(&image.bytes);
    Ok(format!("data:image/jpeg;base64,{encoded}"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer, api_key: Option<&str>) -> GenerationConfig {
        GenerationConfig {
            base_url: server.uri(),
            api_key: api_key.map(str::to_string),
            model: "vision-model".into(),
            timeout_secs: 2,
            ..GenerationConfig::default()
        }
    }

    fn chat_reply(content: &str) -> serde_json::Value {
        serde_json::json!({
            "choices": [ { "message": { "role": "assistant", "content": content } } ]
        })
    }

    #[tokio::test]
    async fn complete_returns_trimmed_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_reply("  a poem \n")))
            .expect(1)
            .mount(&server)
            .await;

        let client = ChatClient::new();
        let text = client
            .complete(&config_for(&server, Some("sk-test")), serde_json::json!([]))
            .await
            .unwrap();
        assert_eq!(text, "a poem");
    }

    #[tokio::test]
    async fn non_success_is_service_error_with_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
                "error": { "message": "Rate limit reached" }
            })))
            .mount(&server)
            .await;

        let err = ChatClient::new()
            .complete(&config_for(&server, None), serde_json::json!([]))
            .await
            .unwrap_err();
        match err {
            GenerationError::Service { status, message } => {
                assert_eq!(status, 429);
                assert_eq!(message, "Rate limit reached");
            }
            other => panic!("expected Service, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn slow_service_is_timeout_not_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(chat_reply("late"))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let mut config = config_for(&server, None);
        config.timeout_secs = 1;
        let err = ChatClient::new()
            .complete(&config, serde_json::json!([]))
            .await
            .unwrap_err();
        assert!(err.is_timeout(), "got {err:?}");
    }

    #[tokio::test]
    async fn unreachable_service_is_request_error() {
        let config = GenerationConfig {
            base_url: "http://127.0.0.1:9".into(),
            timeout_secs: 2,
            ..GenerationConfig::default()
        };
        let err = ChatClient::new()
            .complete(&config, serde_json::json!([]))
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::Request(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn missing_content_is_empty_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_reply("   ")))
            .mount(&server)
            .await;

        let err = ChatClient::new()
            .complete(&config_for(&server, None), serde_json::json!([]))
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::EmptyResponse));
    }

    #[test]
    fn data_url_is_base64_jpeg() {
        let image = CaptureArtifact::from_bytes(b"abc".to_vec(), "/nonexistent/a.jpg");
        assert_eq!(image_data_url(&image).unwrap(), "data:image/jpeg;base64,YWJj");
    }

    #[test]
    fn empty_image_is_rejected() {
        let image = CaptureArtifact::from_bytes(Vec::new(), "/nonexistent/a.jpg");
        assert!(matches!(
            image_data_url(&image),
            Err(GenerationError::Image(_))
        ));
    }
}
