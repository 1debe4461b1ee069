//! Wire formats — one request builder and one response extractor per format.
//!
//! Both functions match exhaustively on [`WireFormat`], so adding a format
//! fails to compile until it has a body shape and an extraction path.

use proofly_core::ProofreadError;
use serde_json::{json, Value};

use crate::registry::{ResolvedProvider, WireFormat};

/// Sampling temperature sent with every correction.
pub const TEMPERATURE: f64 = 0.1;
/// Output token budget sent with every correction.
pub const MAX_TOKENS: u32 = 2000;
/// `anthropic-version` header value.
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

// ─────────────────────────────────────────────
// Request
// ─────────────────────────────────────────────

/// How a request authenticates.
#[derive(Clone, PartialEq, Eq)]
pub enum Auth {
    None,
    /// `Authorization: Bearer <key>`
    Bearer(String),
    /// `Authorization: Token <key>` (Replicate)
    Token(String),
    /// `x-api-key: <key>` plus `anthropic-version`
    AnthropicKey(String),
    /// `?key=<key>` (Google). Already folded into the URL.
    QueryKey,
}

impl std::fmt::Debug for Auth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Auth::None => "None",
            Auth::Bearer(_) => "Bearer([REDACTED])",
            Auth::Token(_) => "Token([REDACTED])",
            Auth::AnthropicKey(_) => "AnthropicKey([REDACTED])",
            Auth::QueryKey => "QueryKey",
        };
        f.write_str(name)
    }
}

impl Auth {
    /// Header name/value pairs to attach.
    pub fn headers(&self) -> Vec<(&'static str, String)> {
        match self {
            Auth::None | Auth::QueryKey => Vec::new(),
            Auth::Bearer(key) => vec![("Authorization", format!("Bearer {key}"))],
            Auth::Token(key) => vec![("Authorization", format!("Token {key}"))],
            Auth::AnthropicKey(key) => vec![
                ("x-api-key", key.clone()),
                ("anthropic-version", ANTHROPIC_VERSION.to_string()),
            ],
        }
    }
}

/// A fully built provider request, ready to POST.
#[derive(Clone, Debug)]
pub struct WireRequest {
    /// Target URL. For Google this carries the API key; never log it.
    pub url: String,
    pub auth: Auth,
    pub body: Value,
}

/// Build the request for one correction.
///
/// Fails with `MissingCredentials` for a remote provider without a key, and
/// with `InvalidRequest` when `custom` has no endpoint. Nothing is sent here.
pub fn build_request(
    provider: &ResolvedProvider,
    api_key: &str,
    prompt: &str,
) -> Result<WireRequest, ProofreadError> {
    let key = api_key.trim();
    check_credentials(provider, key)?;

    if provider.endpoint.is_empty() {
        return Err(ProofreadError::InvalidRequest(format!(
            "no endpoint configured for provider '{}'",
            provider.key()
        )));
    }

    let model = provider.model.as_str();
    let mut url = provider.endpoint.clone();

    let (auth, body) = match provider.wire_format {
        WireFormat::Ollama => (
            Auth::None,
            json!({
                "model": model,
                "prompt": prompt,
                "stream": false,
                "options": { "temperature": TEMPERATURE }
            }),
        ),
        WireFormat::OpenAi => (
            bearer_unless_local(provider, key),
            json!({
                "model": model,
                "messages": [{ "role": "user", "content": prompt }],
                "temperature": TEMPERATURE,
                "max_tokens": MAX_TOKENS
            }),
        ),
        WireFormat::Anthropic => (
            if key.is_empty() {
                Auth::None
            } else {
                Auth::AnthropicKey(key.to_string())
            },
            json!({
                "model": model,
                "max_tokens": MAX_TOKENS,
                "messages": [{ "role": "user", "content": prompt }]
            }),
        ),
        WireFormat::Google => {
            if !key.is_empty() {
                url = with_query_key(&url, key);
            }
            (
                Auth::QueryKey,
                json!({
                    "contents": [{ "parts": [{ "text": prompt }] }],
                    "generationConfig": {
                        "temperature": TEMPERATURE,
                        "maxOutputTokens": MAX_TOKENS
                    }
                }),
            )
        }
        WireFormat::Cohere => (
            bearer_unless_local(provider, key),
            json!({
                "model": model,
                "prompt": prompt,
                "max_tokens": MAX_TOKENS,
                "temperature": TEMPERATURE
            }),
        ),
        WireFormat::HuggingFace => {
            url = huggingface_model_url(&url, model);
            (
                bearer_unless_local(provider, key),
                json!({
                    "inputs": prompt,
                    "parameters": {
                        "max_new_tokens": MAX_TOKENS,
                        "temperature": TEMPERATURE
                    }
                }),
            )
        }
        WireFormat::Replicate => (
            if key.is_empty() {
                Auth::None
            } else {
                Auth::Token(key.to_string())
            },
            json!({
                "version": model,
                "input": {
                    "prompt": prompt,
                    "max_length": MAX_TOKENS,
                    "temperature": TEMPERATURE
                }
            }),
        ),
    };

    Ok(WireRequest { url, auth, body })
}

/// Remote providers other than `custom` need a key before anything is sent.
pub fn check_credentials(provider: &ResolvedProvider, api_key: &str) -> Result<(), ProofreadError> {
    if provider.descriptor.requires_api_key() && api_key.trim().is_empty() {
        return Err(ProofreadError::MissingCredentials {
            provider: provider.key().to_string(),
            display_name: provider.descriptor.display_name.to_string(),
        });
    }
    Ok(())
}

fn bearer_unless_local(provider: &ResolvedProvider, key: &str) -> Auth {
    if provider.is_local() || key.is_empty() {
        Auth::None
    } else {
        Auth::Bearer(key.to_string())
    }
}

/// Append `key=<key>` to a URL that may already carry a query string.
pub(crate) fn with_query_key(url: &str, key: &str) -> String {
    let sep = if url.contains('?') { '&' } else { '?' };
    format!("{url}{sep}key={key}")
}

/// The inference API addresses models by path: `<base>/models/<model>`.
fn huggingface_model_url(endpoint: &str, model: &str) -> String {
    let base = endpoint.trim_end_matches('/');
    if base.ends_with("/models") && !model.is_empty() {
        format!("{base}/{model}")
    } else {
        endpoint.to_string()
    }
}

// ─────────────────────────────────────────────
// Response
// ─────────────────────────────────────────────

/// Human-readable path of the field each format reads.
pub fn expected_field(format: WireFormat) -> &'static str {
    match format {
        WireFormat::Ollama => "response",
        WireFormat::OpenAi => "choices[0].message.content",
        WireFormat::Anthropic => "content[0].text",
        WireFormat::Google => "candidates[0].content.parts[0].text",
        WireFormat::Cohere => "generations[0].text",
        WireFormat::HuggingFace => "generated_text",
        WireFormat::Replicate => "output",
    }
}

/// Pull the generated text out of a parsed response body.
///
/// A present-but-empty string is returned as `""`. A missing field is an
/// `InvalidResponseShape` error listing the body's top-level keys.
pub fn extract_text(
    format: WireFormat,
    provider: &str,
    body: &Value,
) -> Result<String, ProofreadError> {
    let found = match format {
        WireFormat::Ollama => str_at(body, &["response"]).map(str::to_string),
        WireFormat::OpenAi => body
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .or_else(|| str_at(body, &["text"]))
            .or_else(|| str_at(body, &["response"]))
            .map(str::to_string),
        WireFormat::Anthropic => body
            .pointer("/content/0/text")
            .and_then(Value::as_str)
            .map(str::to_string),
        WireFormat::Google => body
            .pointer("/candidates/0/content/parts/0/text")
            .and_then(Value::as_str)
            .map(str::to_string),
        WireFormat::Cohere => body
            .pointer("/generations/0/text")
            .and_then(Value::as_str)
            .map(str::to_string),
        WireFormat::HuggingFace => match body {
            Value::Array(items) => items
                .first()
                .and_then(|first| first.get("generated_text"))
                .and_then(Value::as_str)
                .map(str::to_string),
            _ => str_at(body, &["generated_text"]).map(str::to_string),
        },
        WireFormat::Replicate => match body.get("output") {
            Some(Value::Array(parts)) => Some(
                parts
                    .iter()
                    .map(|p| match p {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect::<String>(),
            ),
            Some(Value::String(s)) => Some(s.clone()),
            _ => None,
        },
    };

    found.ok_or_else(|| invalid_shape(format, provider, body))
}

fn str_at<'a>(body: &'a Value, path: &[&str]) -> Option<&'a str> {
    let mut cur = body;
    for key in path {
        cur = cur.get(*key)?;
    }
    cur.as_str()
}

/// Build the shape error for a body lacking the expected field.
pub fn invalid_shape(format: WireFormat, provider: &str, body: &Value) -> ProofreadError {
    let keys = match body {
        Value::Object(map) => map.keys().cloned().collect(),
        Value::Array(items) => items
            .first()
            .and_then(Value::as_object)
            .map(|m| m.keys().map(|k| format!("[0].{k}")).collect())
            .unwrap_or_default(),
        _ => Vec::new(),
    };
    ProofreadError::InvalidResponseShape {
        provider: provider.to_string(),
        expected: expected_field(format),
        keys,
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
