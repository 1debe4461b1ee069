//! HTTP request dispatcher.
//!
//! Resolves settings against the registry, builds the wire request, sends it
//! with an explicit timeout and extracts the generated text. Only metadata
//! (provider, model, text length, status) is logged, never the text itself.

use std::time::Duration;

use async_trait::async_trait;
use proofly_core::{CorrectionRequest, ProofreadError, TimeoutConfig};
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::registry::{resolve, ResolvedProvider};
use crate::traits::Dispatcher;
use crate::wire::{build_request, extract_text, invalid_shape};

// ─────────────────────────────────────────────
// HttpDispatcher
// ─────────────────────────────────────────────

/// The production [`Dispatcher`], backed by a pooled `reqwest::Client`.
pub struct HttpDispatcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl std::fmt::Debug for HttpDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpDispatcher")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl HttpDispatcher {
    pub fn new(timeouts: &TimeoutConfig) -> Self {
        Self::with_client(reqwest::Client::new(), timeouts)
    }

    /// Share an existing client (and its connection pool).
    pub fn with_client(client: reqwest::Client, timeouts: &TimeoutConfig) -> Self {
        Self {
            client,
            timeout: timeouts.request(),
        }
    }
}

#[async_trait]
impl Dispatcher for HttpDispatcher {
    async fn invoke(&self, request: &CorrectionRequest) -> Result<String, ProofreadError> {
        let provider = resolve(&request.settings)?;
        let wire = build_request(&provider, &request.settings.api_key, &request.text)?;

        debug!(
            provider = provider.key(),
            model = %provider.model,
            format = %provider.wire_format,
            text_len = request.text.chars().count(),
            "Dispatching correction"
        );

        let mut builder = self
            .client
            .post(&wire.url)
            .timeout(self.timeout)
            .json(&wire.body);
        for (name, value) in wire.auth.headers() {
            builder = builder.header(name, value);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| transport_error(e, &provider, self.timeout))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| transport_error(e, &provider, self.timeout))?;

        if !status.is_success() {
            error!(
                provider = provider.key(),
                model = %provider.model,
                status = status.as_u16(),
                "Provider returned an error status"
            );
            return Err(ProofreadError::ProviderHttp {
                provider: provider.key().to_string(),
                model: provider.model.clone(),
                status: status.as_u16(),
                body,
            });
        }

        let parsed: Value = match serde_json::from_str(&body) {
            Ok(v) => v,
            Err(e) => {
                warn!(provider = provider.key(), error = %e, "Response body is not JSON");
                return Err(invalid_shape(provider.wire_format, provider.key(), &Value::Null));
            }
        };

        let text = extract_text(provider.wire_format, provider.key(), &parsed)?;
        debug!(
            provider = provider.key(),
            response_len = text.chars().count(),
            "Correction received"
        );
        Ok(text)
    }
}

/// Map a `reqwest` failure to `Timeout` or `Network`.
///
/// The URL is stripped from the message since it may carry a query-string key.
pub(crate) fn transport_error(
    e: reqwest::Error,
    provider: &ResolvedProvider,
    timeout: Duration,
) -> ProofreadError {
    transport_error_at(e, provider, &provider.endpoint, timeout)
}

/// Same as [`transport_error`] for a URL other than the main endpoint.
pub(crate) fn transport_error_at(
    e: reqwest::Error,
    provider: &ResolvedProvider,
    endpoint: &str,
    timeout: Duration,
) -> ProofreadError {
    let endpoint = endpoint.split('?').next().unwrap_or(endpoint).to_string();
    if e.is_timeout() {
        warn!(provider = provider.key(), endpoint = %endpoint, "Request timed out");
        ProofreadError::Timeout {
            provider: provider.key().to_string(),
            endpoint,
            local: provider.is_local(),
            timeout_secs: timeout.as_secs(),
        }
    } else {
        let e = e.without_url();
        error!(provider = provider.key(), endpoint = %endpoint, error = %e, "HTTP request failed");
        ProofreadError::Network {
            provider: provider.key().to_string(),
            endpoint,
            local: provider.is_local(),
            message: e.to_string(),
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{WireFormat, PROVIDERS};
    use proofly_core::{ErrorKind, ProviderSettings};
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn dispatcher() -> HttpDispatcher {
        HttpDispatcher::new(&TimeoutConfig::default())
    }

    fn settings(provider: &str, endpoint: String, key: &str) -> ProviderSettings {
        ProviderSettings {
            provider: provider.into(),
            model: String::new(),
            api_key: key.into(),
            custom_endpoint: endpoint,
            custom_format: None,
        }
    }

    #[tokio::test]
    async fn test_ollama_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .and(body_partial_json(json!({
                "model": "llama2",
                "prompt": "fix this",
                "stream": false,
                "options": {"temperature": 0.1}
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"response": "Corrected text."})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let req = CorrectionRequest::new(
            "fix this",
            settings("ollama", format!("{}/api/generate", server.uri()), ""),
        );
        let text = dispatcher().invoke(&req).await.unwrap();
        assert_eq!(text, "Corrected text.");
        assert_eq!(crate::normalize::normalize(&text), "Corrected text.");
    }

    #[tokio::test]
    async fn test_local_ollama_sends_no_auth() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"response": "ok"})))
            .mount(&server)
            .await;

        let req = CorrectionRequest::new(
            "p",
            settings("local", format!("{}/api/generate", server.uri()), "ignored"),
        );
        dispatcher().invoke(&req).await.unwrap();

        let received = server.received_requests().await.unwrap();
        assert_eq!(received.len(), 1);
        assert!(received[0].headers.get("authorization").is_none());
    }

    #[tokio::test]
    async fn test_openai_bearer_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("Authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({
                "model": "gpt-3.5-turbo",
                "messages": [{"role": "user", "content": "p"}],
                "temperature": 0.1,
                "max_tokens": 2000
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "Fixed."}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let req = CorrectionRequest::new(
            "p",
            settings("openai", format!("{}/v1/chat/completions", server.uri()), "sk-test"),
        );
        assert_eq!(dispatcher().invoke(&req).await.unwrap(), "Fixed.");
    }

    #[tokio::test]
    async fn test_anthropic_headers_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "sk-ant"))
            .and(header("anthropic-version", "2023-06-01"))
            .and(body_partial_json(json!({
                "model": "claude-3-haiku-20240307",
                "max_tokens": 2000,
                "messages": [{"role": "user", "content": "p"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": [{"type": "text", "text": "Done."}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let req = CorrectionRequest::new(
            "p",
            settings("anthropic", format!("{}/v1/messages", server.uri()), "sk-ant"),
        );
        assert_eq!(dispatcher().invoke(&req).await.unwrap(), "Done.");
    }

    #[tokio::test]
    async fn test_anthropic_401_keeps_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(
                ResponseTemplate::new(401).set_body_string(r#"{"error":"invalid api key"}"#),
            )
            .mount(&server)
            .await;

        let req = CorrectionRequest::new(
            "p",
            settings("anthropic", format!("{}/v1/messages", server.uri()), "sk-bad"),
        );
        match dispatcher().invoke(&req).await.unwrap_err() {
            ProofreadError::ProviderHttp { status, body, .. } => {
                assert_eq!(status, 401);
                assert_eq!(body, r#"{"error":"invalid api key"}"#);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_google_key_in_query_string() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-pro:generateContent"))
            .and(query_param("key", "g-key"))
            .and(body_partial_json(json!({
                "contents": [{"parts": [{"text": "p"}]}],
                "generationConfig": {"temperature": 0.1, "maxOutputTokens": 2000}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{"content": {"parts": [{"text": "Gemini."}]}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let req = CorrectionRequest::new(
            "p",
            settings(
                "google",
                format!("{}/v1beta/models/gemini-pro:generateContent", server.uri()),
                "g-key",
            ),
        );
        assert_eq!(dispatcher().invoke(&req).await.unwrap(), "Gemini.");

        let received = server.received_requests().await.unwrap();
        assert!(received[0].headers.get("authorization").is_none());
    }

    #[tokio::test]
    async fn test_cohere_bearer_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/generate"))
            .and(header("Authorization", "Bearer co-key"))
            .and(body_partial_json(json!({
                "model": "command",
                "prompt": "p",
                "max_tokens": 2000,
                "temperature": 0.1
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"generations": [{"text": "Co."}]})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let req = CorrectionRequest::new(
            "p",
            settings("cohere", format!("{}/v1/generate", server.uri()), "co-key"),
        );
        assert_eq!(dispatcher().invoke(&req).await.unwrap(), "Co.");
    }

    #[tokio::test]
    async fn test_huggingface_array_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/microsoft/DialoGPT-medium"))
            .and(header("Authorization", "Bearer hf_x"))
            .and(body_partial_json(json!({
                "inputs": "p",
                "parameters": {"max_new_tokens": 2000, "temperature": 0.1}
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([{"generated_text": "HF."}])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let req = CorrectionRequest::new(
            "p",
            settings("huggingface", format!("{}/models", server.uri()), "hf_x"),
        );
        assert_eq!(dispatcher().invoke(&req).await.unwrap(), "HF.");
    }

    #[tokio::test]
    async fn test_replicate_token_auth() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/predictions"))
            .and(header("Authorization", "Token r8_x"))
            .and(body_partial_json(json!({
                "version": "meta/llama-2-7b-chat",
                "input": {"prompt": "p", "max_length": 2000, "temperature": 0.1}
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"output": ["Rep", "licated."]})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let req = CorrectionRequest::new(
            "p",
            settings("replicate", format!("{}/v1/predictions", server.uri()), "r8_x"),
        );
        assert_eq!(dispatcher().invoke(&req).await.unwrap(), "Replicated.");
    }

    #[tokio::test]
    async fn test_custom_format_override() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/generate"))
            .and(body_partial_json(json!({"stream": false})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"response": "C."})))
            .expect(1)
            .mount(&server)
            .await;

        let mut s = settings("custom", format!("{}/generate", server.uri()), "");
        s.model = "mine".into();
        s.custom_format = Some("ollama".into());
        let req = CorrectionRequest::new("p", s);
        assert_eq!(dispatcher().invoke(&req).await.unwrap(), "C.");
    }

    /// Canned success body for each format.
    fn success_body(format: WireFormat) -> Value {
        match format {
            WireFormat::Ollama => json!({"response": "ok"}),
            WireFormat::OpenAi => json!({"choices": [{"message": {"content": "ok"}}]}),
            WireFormat::Anthropic => json!({"content": [{"text": "ok"}]}),
            WireFormat::Google => json!({"candidates": [{"content": {"parts": [{"text": "ok"}]}}]}),
            WireFormat::Cohere => json!({"generations": [{"text": "ok"}]}),
            WireFormat::HuggingFace => json!([{"generated_text": "ok"}]),
            WireFormat::Replicate => json!({"output": ["ok"]}),
        }
    }

    #[tokio::test]
    async fn test_every_descriptor_sends_exactly_one_request() {
        for descriptor in PROVIDERS {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .respond_with(
                    ResponseTemplate::new(200).set_body_json(success_body(descriptor.wire_format)),
                )
                .expect(1)
                .mount(&server)
                .await;

            let endpoint = match descriptor.wire_format {
                WireFormat::HuggingFace => format!("{}/models", server.uri()),
                _ => format!("{}/endpoint", server.uri()),
            };
            let req = CorrectionRequest::new("p", settings(descriptor.key, endpoint, "k"));
            let text = dispatcher().invoke(&req).await.unwrap();
            assert_eq!(text, "ok", "{}", descriptor.key);

            let received = server.received_requests().await.unwrap();
            assert_eq!(received.len(), 1, "{}", descriptor.key);
            let auth = received[0]
                .headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let expected = match descriptor.wire_format {
                _ if descriptor.is_local => None,
                WireFormat::OpenAi | WireFormat::Cohere | WireFormat::HuggingFace => {
                    Some("Bearer k".to_string())
                }
                WireFormat::Replicate => Some("Token k".to_string()),
                WireFormat::Ollama | WireFormat::Anthropic | WireFormat::Google => None,
            };
            assert_eq!(auth, expected, "{}", descriptor.key);

            if descriptor.wire_format == WireFormat::Anthropic {
                assert!(received[0].headers.get("x-api-key").is_some());
            }
            if descriptor.wire_format == WireFormat::Google {
                assert_eq!(received[0].url.query(), Some("key=k"));
            }
            server.verify().await;
        }
    }

    #[tokio::test]
    async fn test_missing_key_makes_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let req = CorrectionRequest::new(
            "p",
            settings("openai", format!("{}/v1/chat/completions", server.uri()), ""),
        );
        let err = dispatcher().invoke(&req).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingCredentials);
    }

    #[tokio::test]
    async fn test_unknown_provider_makes_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let req = CorrectionRequest::new("p", settings("skynet", server.uri(), "k"));
        let err = dispatcher().invoke(&req).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownProvider);
    }

    #[tokio::test]
    async fn test_non_json_body_is_shape_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let req = CorrectionRequest::new(
            "p",
            settings("ollama", format!("{}/api/generate", server.uri()), ""),
        );
        let err = dispatcher().invoke(&req).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidResponseShape);
    }

    #[tokio::test]
    async fn test_timeout_is_classified() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"response": "late"}))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let timeouts = TimeoutConfig {
            request_secs: 1,
            ..Default::default()
        };
        let req = CorrectionRequest::new(
            "p",
            settings("ollama", format!("{}/api/generate", server.uri()), ""),
        );
        let err = HttpDispatcher::new(&timeouts).invoke(&req).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Timeout);
    }

    #[tokio::test]
    async fn test_connection_refused_is_network() {
        // Bind then drop to get a port nothing listens on.
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let req = CorrectionRequest::new(
            "p",
            settings("ollama", format!("http://127.0.0.1:{port}/api/generate"), ""),
        );
        let err = dispatcher().invoke(&req).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Network);
        assert!(err.suggestion().unwrap().contains("ollama serve"));
    }
}
