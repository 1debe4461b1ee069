//! Connectivity prober — answers "will proofreading work with these settings?"
//!
//! - Ollama: version check, model listing, model resolution, trial generation
//! - OpenAI-compatible local servers: model listing, trial chat completion
//! - Remote providers: one authenticated GET to validate the API key
//! - `custom`: a HEAD request for reachability only
//!
//! Every call carries its own timeout, and timeouts stay distinguishable from
//! other failures in the returned report.

use std::time::Duration;

use proofly_core::{
    ConnectivityDetails, ConnectivityReport, ErrorKind, InferenceTest, ProofreadError,
    ProviderSettings, TimeoutConfig,
};
use reqwest::Url;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::dispatcher::transport_error_at;
use crate::registry::{resolve, ResolvedProvider, WireFormat};
use crate::wire::{check_credentials, with_query_key, Auth};

/// Prompt sent by trial generations.
const TRIAL_PROMPT: &str = "Hello";
/// Token budget of a trial generation.
const TRIAL_TOKENS: u32 = 5;

// ─────────────────────────────────────────────
// Model resolution
// ─────────────────────────────────────────────

/// Match a configured model name against the installed models.
///
/// Tiers, first hit wins: exact name, `<name>:latest`, then any `<name>:<tag>`.
pub fn resolve_model(configured: &str, available: &[String]) -> Option<String> {
    let latest = format!("{configured}:latest");
    let tagged = format!("{configured}:");
    available
        .iter()
        .find(|m| m.as_str() == configured)
        .or_else(|| available.iter().find(|m| **m == latest))
        .or_else(|| available.iter().find(|m| m.starts_with(&tagged)))
        .cloned()
}

// ─────────────────────────────────────────────
// ConnectivityProber
// ─────────────────────────────────────────────

/// Runs connection tests against the configured provider.
pub struct ConnectivityProber {
    client: reqwest::Client,
    timeouts: TimeoutConfig,
}

impl std::fmt::Debug for ConnectivityProber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectivityProber")
            .field("timeouts", &self.timeouts)
            .finish()
    }
}

impl ConnectivityProber {
    pub fn new(timeouts: &TimeoutConfig) -> Self {
        Self::with_client(reqwest::Client::new(), timeouts)
    }

    pub fn with_client(client: reqwest::Client, timeouts: &TimeoutConfig) -> Self {
        Self {
            client,
            timeouts: timeouts.clone(),
        }
    }

    /// Probe the provider described by `settings`. Never fails: every
    /// problem is folded into the returned report.
    pub async fn test_connection(&self, settings: &ProviderSettings) -> ConnectivityReport {
        let provider = match resolve(settings) {
            Ok(p) => p,
            Err(e) => return ConnectivityReport::from_error(&e),
        };

        info!(
            provider = provider.key(),
            model = %provider.model,
            "Testing connection"
        );

        let result = if provider.is_local() {
            match provider.wire_format {
                WireFormat::Ollama => self.probe_ollama(&provider).await,
                _ => self.probe_openai_local(&provider).await,
            }
        } else if provider.descriptor.is_custom() {
            self.probe_custom(&provider, &settings.api_key).await
        } else {
            self.probe_remote(&provider, &settings.api_key).await
        };

        let report = result.unwrap_or_else(|e| ConnectivityReport::from_error(&e));
        debug!(provider = provider.key(), ok = report.ok, "Connection test finished");
        report
    }

    // ── Ollama ──

    async fn probe_ollama(
        &self,
        provider: &ResolvedProvider,
    ) -> Result<ConnectivityReport, ProofreadError> {
        // 1. Server up?
        let version_url = ollama_url(&provider.endpoint, "/api/version")?;
        let (status, body) = self
            .get(provider, &version_url, self.timeouts.health(), &Auth::None)
            .await?;
        if !is_success(status) {
            return Ok(http_failure(provider, "Ollama server", status, &body));
        }
        let version = parse_json(&body)
            .and_then(|v| v.get("version").and_then(Value::as_str).map(str::to_string));

        let mut details = ConnectivityDetails {
            version: version.clone(),
            configured_model: Some(provider.model.clone()),
            endpoint: Some(provider.endpoint.clone()),
            ..Default::default()
        };
        let running = match &version {
            Some(v) => format!("Ollama {v} is running"),
            None => "Ollama is running".to_string(),
        };

        // 2. Model list. Failure here is informative, not fatal.
        let tags_url = ollama_url(&provider.endpoint, "/api/tags")?;
        let listing = self
            .get(provider, &tags_url, self.timeouts.models(), &Auth::None)
            .await;
        let models = match listing {
            Ok((status, body)) if is_success(status) => model_names(&body, "/models", "name"),
            Ok((status, _)) => {
                warn!(provider = provider.key(), status, "Model listing failed");
                return Ok(ConnectivityReport::success(running)
                    .with_warning(format!("Cannot list models (HTTP {status})."))
                    .with_details(details));
            }
            Err(e) => {
                warn!(provider = provider.key(), error = %e, "Model listing failed");
                return Ok(ConnectivityReport::success(running)
                    .with_warning(format!("Cannot list models: {e}"))
                    .with_details(details));
            }
        };

        // 3. Resolve the configured model.
        details.available_models = Some(models.clone());
        let resolved = resolve_model(&provider.model, &models);
        debug!(
            provider = provider.key(),
            configured = %provider.model,
            resolved = resolved.as_deref().unwrap_or("-"),
            "Model resolution"
        );
        details.resolved_model = resolved.clone();
        let Some(resolved) = resolved else {
            return Ok(model_failure(provider, &models, details));
        };

        // 4. Trial generation.
        let generate_url = ollama_url(&provider.endpoint, "/api/generate")?;
        let body = json!({
            "model": resolved,
            "prompt": TRIAL_PROMPT,
            "stream": false,
            "options": { "num_predict": TRIAL_TOKENS }
        });
        let outcome = self.trial(provider, &generate_url, &body, &Auth::None).await?;
        details.inference_test = Some(outcome);

        Ok(finish_with_trial(
            ConnectivityReport::success(format!("{running} with model '{resolved}'")),
            outcome,
            &resolved,
            self.timeouts.inference_secs,
        )
        .with_details(details))
    }

    // ── OpenAI-compatible local servers ──

    async fn probe_openai_local(
        &self,
        provider: &ResolvedProvider,
    ) -> Result<ConnectivityReport, ProofreadError> {
        let models_url = openai_models_url(&provider.endpoint)?;
        let (status, body) = self
            .get(provider, &models_url, self.timeouts.models(), &Auth::None)
            .await?;
        if !is_success(status) {
            return Ok(http_failure(provider, provider.descriptor.display_name, status, &body));
        }

        let models = model_names(&body, "/data", "id");
        let mut details = ConnectivityDetails {
            available_models: Some(models.clone()),
            configured_model: Some(provider.model.clone()),
            endpoint: Some(provider.endpoint.clone()),
            ..Default::default()
        };

        let running = format!("{} is running", provider.descriptor.display_name);
        if models.is_empty() {
            return Ok(ConnectivityReport::failure(
                format!("{running} but no model is loaded"),
                ErrorKind::ModelNotFound,
            )
            .with_suggestion(format!(
                "Load a model in {} before proofreading.",
                provider.descriptor.display_name
            ))
            .with_details(details));
        }

        // These servers usually answer with whatever model is loaded, so an
        // unknown name is only a warning.
        let resolved = resolve_model(&provider.model, &models);
        details.resolved_model = resolved.clone();
        let trial_model = resolved.clone().unwrap_or_else(|| provider.model.clone());

        let body = json!({
            "model": trial_model,
            "messages": [{ "role": "user", "content": TRIAL_PROMPT }],
            "max_tokens": TRIAL_TOKENS
        });
        let outcome = self
            .trial(provider, &provider.endpoint, &body, &Auth::None)
            .await?;
        details.inference_test = Some(outcome);

        let mut report = finish_with_trial(
            ConnectivityReport::success(format!("{running} with model '{trial_model}'")),
            outcome,
            &trial_model,
            self.timeouts.inference_secs,
        );
        if resolved.is_none() && report.warning.is_none() {
            report = report.with_warning(format!(
                "Model '{}' is not in the server's list ({}); the loaded model will be used.",
                provider.model,
                models.join(", ")
            ));
        }
        Ok(report.with_details(details))
    }

    // ── Remote providers ──

    async fn probe_remote(
        &self,
        provider: &ResolvedProvider,
        api_key: &str,
    ) -> Result<ConnectivityReport, ProofreadError> {
        check_credentials(provider, api_key)?;
        let key = api_key.trim();
        let name = provider.descriptor.display_name;

        let Some(models_endpoint) = provider.descriptor.models_endpoint else {
            return Ok(ConnectivityReport::success(format!("API key for {name} is set"))
                .with_warning(format!(
                    "{name} has no listing endpoint, so the key was not validated."
                )));
        };

        let url = key_check_url(provider, models_endpoint)?;
        let (url, auth) = match provider.wire_format {
            WireFormat::Google => (with_query_key(&url, key), Auth::QueryKey),
            WireFormat::Anthropic => (url, Auth::AnthropicKey(key.to_string())),
            WireFormat::Replicate => (url, Auth::Token(key.to_string())),
            WireFormat::Ollama
            | WireFormat::OpenAi
            | WireFormat::Cohere
            | WireFormat::HuggingFace => (url, Auth::Bearer(key.to_string())),
        };

        let (status, body) = self
            .get(provider, &url, self.timeouts.key_check(), &auth)
            .await?;
        let details = ConnectivityDetails {
            status: Some(status),
            endpoint: Some(provider.endpoint.clone()),
            configured_model: Some(provider.model.clone()),
            ..Default::default()
        };

        if is_success(status) {
            return Ok(ConnectivityReport::success(format!("API key for {name} is valid"))
                .with_details(details));
        }

        let err = ProofreadError::ProviderHttp {
            provider: provider.key().to_string(),
            model: provider.model.clone(),
            status,
            body,
        };
        let message = match status {
            401 | 403 => format!("{name} rejected the API key (HTTP {status})"),
            _ => format!("{name} key check failed with HTTP {status}"),
        };
        let mut report = ConnectivityReport::failure(message, ErrorKind::ProviderHttp);
        report.suggestion = err.suggestion();
        Ok(report.with_details(details))
    }

    // ── Custom endpoint ──

    async fn probe_custom(
        &self,
        provider: &ResolvedProvider,
        api_key: &str,
    ) -> Result<ConnectivityReport, ProofreadError> {
        if provider.endpoint.is_empty() {
            return Ok(ConnectivityReport::failure(
                "No custom endpoint configured",
                ErrorKind::InvalidRequest,
            )
            .with_suggestion("Enter the endpoint URL in the settings."));
        }

        let mut request = self
            .client
            .head(&provider.endpoint)
            .timeout(self.timeouts.head());
        if !api_key.trim().is_empty() {
            request = request.bearer_auth(api_key.trim());
        }
        let response = request.send().await.map_err(|e| {
            transport_error_at(e, provider, &provider.endpoint, self.timeouts.head())
        })?;

        let status = response.status().as_u16();
        let details = ConnectivityDetails {
            status: Some(status),
            endpoint: Some(provider.endpoint.clone()),
            ..Default::default()
        };
        let report =
            ConnectivityReport::success(format!("Endpoint is reachable (HTTP {status})"));
        let report = if status >= 400 {
            report.with_warning(
                "The endpoint answered HEAD with an error status; this is normal for POST-only APIs, but the response format cannot be verified.",
            )
        } else {
            report
        };
        Ok(report.with_details(details))
    }

    // ── HTTP helpers ──

    async fn get(
        &self,
        provider: &ResolvedProvider,
        url: &str,
        timeout: Duration,
        auth: &Auth,
    ) -> Result<(u16, String), ProofreadError> {
        let mut request = self.client.get(url).timeout(timeout);
        for (name, value) in auth.headers() {
            request = request.header(name, value);
        }
        let response = request
            .send()
            .await
            .map_err(|e| transport_error_at(e, provider, url, timeout))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| transport_error_at(e, provider, url, timeout))?;
        Ok((status, body))
    }

    /// Classify a trial generation. Only a non-timeout transport failure is
    /// escalated, since the server already answered the earlier steps.
    async fn trial(
        &self,
        provider: &ResolvedProvider,
        url: &str,
        body: &Value,
        auth: &Auth,
    ) -> Result<InferenceTest, ProofreadError> {
        let timeout = self.timeouts.inference();
        let mut request = self.client.post(url).timeout(timeout).json(body);
        for (name, value) in auth.headers() {
            request = request.header(name, value);
        }

        match request.send().await {
            Ok(resp) if resp.status().is_success() => Ok(InferenceTest::Passed),
            Ok(resp) => {
                warn!(
                    provider = provider.key(),
                    status = resp.status().as_u16(),
                    "Trial generation failed"
                );
                Ok(InferenceTest::Failed)
            }
            Err(e) if e.is_timeout() => {
                warn!(provider = provider.key(), "Trial generation timed out");
                Ok(InferenceTest::Timeout)
            }
            Err(e) => Err(transport_error_at(e, provider, url, timeout)),
        }
    }
}

// ─────────────────────────────────────────────
// Report helpers
// ─────────────────────────────────────────────

fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

fn parse_json(body: &str) -> Option<Value> {
    serde_json::from_str(body).ok()
}

/// Collect `<field>` of each element under the array at `pointer`.
fn model_names(body: &str, pointer: &str, field: &str) -> Vec<String> {
    parse_json(body)
        .and_then(|v| v.pointer(pointer).and_then(Value::as_array).cloned())
        .unwrap_or_default()
        .iter()
        .filter_map(|m| m.get(field).and_then(Value::as_str).map(str::to_string))
        .collect()
}

fn http_failure(
    provider: &ResolvedProvider,
    what: &str,
    status: u16,
    body: &str,
) -> ConnectivityReport {
    let err = ProofreadError::ProviderHttp {
        provider: provider.key().to_string(),
        model: provider.model.clone(),
        status,
        body: body.to_string(),
    };
    let mut report = ConnectivityReport::failure(
        format!("{what} responded with HTTP {status}"),
        ErrorKind::ProviderHttp,
    );
    report.suggestion = err.suggestion();
    report.with_details(ConnectivityDetails {
        status: Some(status),
        endpoint: Some(provider.endpoint.clone()),
        ..Default::default()
    })
}

fn model_failure(
    provider: &ResolvedProvider,
    models: &[String],
    details: ConnectivityDetails,
) -> ConnectivityReport {
    let model = &provider.model;
    if models.is_empty() {
        return ConnectivityReport::failure("No models are installed", ErrorKind::ModelNotFound)
            .with_suggestion(format!("Download a model first: ollama pull {model}"))
            .with_details(details);
    }
    ConnectivityReport::failure(
        format!(
            "Model '{model}' is not installed. Available models: {}",
            models.join(", ")
        ),
        ErrorKind::ModelNotFound,
    )
    .with_suggestion(format!(
        "Download it with: ollama pull {model} (or pick one of the installed models)"
    ))
    .with_details(details)
}

fn finish_with_trial(
    report: ConnectivityReport,
    outcome: InferenceTest,
    model: &str,
    inference_secs: u64,
) -> ConnectivityReport {
    match outcome {
        InferenceTest::Passed => report,
        InferenceTest::Failed => report.with_warning(format!(
            "Model '{model}' is available but a trial generation failed."
        )),
        InferenceTest::Timeout => report
            .with_warning(format!(
                "Model '{model}' did not answer a trial generation within {inference_secs}s."
            ))
            .with_suggestion(
                "The model may be loading for the first time; wait a moment and try again.",
            ),
    }
}

// ─────────────────────────────────────────────
// URL helpers
// ─────────────────────────────────────────────

fn parse_url(endpoint: &str) -> Result<Url, ProofreadError> {
    Url::parse(endpoint)
        .map_err(|e| ProofreadError::InvalidRequest(format!("invalid endpoint URL '{endpoint}': {e}")))
}

/// `http://host:11434/api/generate` + `/api/tags` → `http://host:11434/api/tags`.
/// A path prefix in front of `/api/` (reverse proxies) is kept.
pub(crate) fn ollama_url(endpoint: &str, api_path: &str) -> Result<String, ProofreadError> {
    let mut url = parse_url(endpoint)?;
    let prefix = url
        .path()
        .find("/api/")
        .map(|i| url.path()[..i].to_string())
        .unwrap_or_default();
    url.set_path(&format!("{prefix}{api_path}"));
    url.set_query(None);
    Ok(url.to_string())
}

/// The `/models` listing next to an OpenAI-style chat completions endpoint.
pub(crate) fn openai_models_url(endpoint: &str) -> Result<String, ProofreadError> {
    let mut url = parse_url(endpoint)?;
    let path = url.path().to_string();
    let models_path = if let Some(i) = path.find("/chat/completions") {
        format!("{}/models", &path[..i])
    } else if let Some(i) = path.find("/v1") {
        format!("{}/v1/models", &path[..i])
    } else {
        "/v1/models".to_string()
    };
    url.set_path(&models_path);
    url.set_query(None);
    Ok(url.to_string())
}

/// Where to validate the key. An overridden endpoint moves the check to the
/// same host.
fn key_check_url(
    provider: &ResolvedProvider,
    models_endpoint: &str,
) -> Result<String, ProofreadError> {
    if provider.endpoint == provider.descriptor.default_endpoint {
        return Ok(models_endpoint.to_string());
    }
    if provider.wire_format == WireFormat::OpenAi {
        return openai_models_url(&provider.endpoint);
    }
    let listing = parse_url(models_endpoint)?;
    let mut url = parse_url(&provider.endpoint)?;
    url.set_path(listing.path());
    url.set_query(listing.query());
    Ok(url.to_string())
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
