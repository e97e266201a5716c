//! OpenAI-compatible chat-completions backend
//!
//! Works with any provider exposing `POST {base_url}/chat/completions`
//! (OpenRouter by default). The request asks for a JSON object response
//! at temperature 0.

use crate::{BackendError, GenerationBackend, GenerationRequest, ResponseFormat};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Default provider endpoint
pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Default model identifier
pub const DEFAULT_MODEL: &str = "mistralai/devstral-2512:free";

/// Longest error body kept in [`BackendError::Http`]
const MAX_ERROR_BODY: usize = 512;

/// HTTP backend for OpenAI-compatible providers
#[derive(Clone)]
pub struct OpenAiCompatibleBackend {
    base_url: String,
    model: String,
    api_key: String,
    temperature: f32,
    timeout: Duration,
    client: reqwest::Client,
}

impl fmt::Debug for OpenAiCompatibleBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiCompatibleBackend")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl OpenAiCompatibleBackend {
    /// Start building a backend authenticated with `api_key`
    #[inline]
    #[must_use]
    pub fn builder(api_key: impl Into<String>) -> OpenAiCompatibleBuilder {
        OpenAiCompatibleBuilder {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.0,
            timeout: Duration::from_secs(60),
        }
    }

    /// Model identifier sent with each request
    #[inline]
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    fn map_transport(&self, error: &reqwest::Error) -> BackendError {
        if error.is_timeout() {
            BackendError::Timeout {
                after: self.timeout,
            }
        } else if error.is_connect() {
            BackendError::Unavailable(format!("cannot reach {}", self.base_url))
        } else if error.is_decode() {
            BackendError::MalformedOutput(error.to_string())
        } else {
            BackendError::Http {
                status: error.status().map_or(0, |s| s.as_u16()),
                body: error.to_string(),
            }
        }
    }
}

/// Builder for [`OpenAiCompatibleBackend`]
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleBuilder {
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
    timeout: Duration,
}

impl OpenAiCompatibleBuilder {
    /// With provider base URL (without the `/chat/completions` suffix)
    #[inline]
    #[must_use]
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// With model identifier
    #[inline]
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// With sampling temperature
    #[inline]
    #[must_use]
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// With per-request timeout
    #[inline]
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build the backend
    ///
    /// # Errors
    /// Returns `BackendError::Unavailable` if the HTTP client cannot be created
    pub fn build(self) -> Result<OpenAiCompatibleBackend, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| BackendError::Unavailable(format!("HTTP client setup failed: {e}")))?;

        Ok(OpenAiCompatibleBackend {
            base_url: self.base_url,
            model: self.model,
            api_key: self.api_key,
            temperature: self.temperature,
            timeout: self.timeout,
            client,
        })
    }
}

/// Request body for `/chat/completions`
#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormatBody>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormatBody {
    #[serde(rename = "type")]
    kind: &'static str,
}

/// Response body from `/chat/completions`
#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

fn retry_after(response: &reqwest::Response) -> Option<Duration> {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

#[async_trait]
impl GenerationBackend for OpenAiCompatibleBackend {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, BackendError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.instruction,
                },
            ],
            temperature: self.temperature,
            response_format: match request.format {
                ResponseFormat::Json => Some(ResponseFormatBody {
                    kind: "json_object",
                }),
            },
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_transport(&e))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(BackendError::Unavailable(format!(
                "credentials rejected by {} (HTTP {})",
                self.base_url,
                status.as_u16()
            )));
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(BackendError::RateLimited {
                retry_after: retry_after(&response),
            });
        }
        if !status.is_success() {
            let mut body = response.text().await.unwrap_or_default();
            if body.len() > MAX_ERROR_BODY {
                let cut = (0..=MAX_ERROR_BODY)
                    .rev()
                    .find(|i| body.is_char_boundary(*i))
                    .unwrap_or(0);
                body.truncate(cut);
            }
            return Err(BackendError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| BackendError::MalformedOutput(format!("unreadable envelope: {e}")))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| {
                BackendError::MalformedOutput("response contained no message content".into())
            })?;

        tracing::debug!(model = %self.model, bytes = content.len(), "backend response received");
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve a single canned HTTP response and return the base URL
    async fn serve_once(response: String) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut received = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                received.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&received).to_string();
                if let Some(end) = text.find("\r\n\r\n") {
                    let length = text[..end]
                        .lines()
                        .find_map(|l| {
                            let lower = l.to_ascii_lowercase();
                            lower
                                .strip_prefix("content-length:")
                                .map(|v| v.trim().parse::<usize>().unwrap_or(0))
                        })
                        .unwrap_or(0);
                    if received.len() >= end + 4 + length {
                        break;
                    }
                }
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
        });
        format!("http://{addr}")
    }

    fn http_response(status: &str, headers: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n{headers}\r\n{body}",
            body.len()
        )
    }

    fn backend(base_url: &str) -> OpenAiCompatibleBackend {
        OpenAiCompatibleBackend::builder("test-key")
            .base_url(base_url)
            .model("test-model")
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap()
    }

    fn request() -> GenerationRequest {
        GenerationRequest::json("system rules", "analyze calc.py")
    }

    #[tokio::test]
    async fn returns_first_choice_content() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"{\"ok\":true}"}}]}"#;
        let url = serve_once(http_response("200 OK", "", body)).await;
        let text = backend(&url).generate(&request()).await.unwrap();
        assert_eq!(text, r#"{"ok":true}"#);
    }

    #[tokio::test]
    async fn rate_limit_carries_retry_after() {
        let url = serve_once(http_response("429 Too Many Requests", "Retry-After: 3\r\n", "{}")).await;
        let err = backend(&url).generate(&request()).await.unwrap_err();
        assert_eq!(
            err,
            BackendError::RateLimited {
                retry_after: Some(Duration::from_secs(3))
            }
        );
    }

    #[tokio::test]
    async fn rejected_credentials_are_unavailable() {
        let url = serve_once(http_response("401 Unauthorized", "", "{}")).await;
        let err = backend(&url).generate(&request()).await.unwrap_err();
        assert!(matches!(err, BackendError::Unavailable(_)));
    }

    #[tokio::test]
    async fn server_error_is_transient_http() {
        let url = serve_once(http_response("503 Service Unavailable", "", "{\"error\":\"busy\"}")).await;
        let err = backend(&url).generate(&request()).await.unwrap_err();
        assert!(matches!(err, BackendError::Http { status: 503, .. }));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn empty_choices_are_malformed() {
        let url = serve_once(http_response("200 OK", "", r#"{"choices":[]}"#)).await;
        let err = backend(&url).generate(&request()).await.unwrap_err();
        assert!(matches!(err, BackendError::MalformedOutput(_)));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_unavailable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let err = backend(&format!("http://{addr}"))
            .generate(&request())
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Unavailable(_)));
    }

    #[test]
    fn debug_hides_api_key() {
        let backend = OpenAiCompatibleBackend::builder("secret-key").build().unwrap();
        let printed = format!("{backend:?}");
        assert!(!printed.contains("secret-key"));
        assert_eq!(backend.model(), DEFAULT_MODEL);
    }
}
