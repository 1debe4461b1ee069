//! The `Proofreader` façade called by UI layers.
//!
//! Every operation reads the settings fresh from the injected store, so a
//! save is visible to the very next request.

use std::sync::Arc;

use proofly_core::config::Config;
use proofly_core::store::{load_settings, save_settings};
use proofly_core::types::{validate_text, MAX_TEXT_CHARS};
use proofly_core::{
    ConfigStore, ConnectivityReport, CorrectionRequest, ProofreadContext, ProofreadError,
    ProviderSettings, SettingsPatch, Suggestion,
};
use proofly_providers::{normalize, ConnectivityProber, Dispatcher, HttpDispatcher};
use tracing::{debug, info};

use crate::prompt::{correction_prompt, suggestion_prompt_from_context, suggestions_prompt};
use crate::suggestions::parse_suggestions;

/// Proofreading operations over an injected store and dispatcher.
pub struct Proofreader {
    store: Arc<dyn ConfigStore>,
    dispatcher: Arc<dyn Dispatcher>,
    prober: ConnectivityProber,
    max_text_chars: usize,
}

impl std::fmt::Debug for Proofreader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Proofreader")
            .field("prober", &self.prober)
            .field("max_text_chars", &self.max_text_chars)
            .finish()
    }
}

impl Proofreader {
    pub fn new(
        store: Arc<dyn ConfigStore>,
        dispatcher: Arc<dyn Dispatcher>,
        prober: ConnectivityProber,
    ) -> Self {
        Self {
            store,
            dispatcher,
            prober,
            max_text_chars: MAX_TEXT_CHARS,
        }
    }

    /// Wire up the HTTP dispatcher and prober from a loaded config, sharing
    /// one connection pool.
    pub fn from_config(config: &Config, store: Arc<dyn ConfigStore>) -> Self {
        let client = reqwest::Client::new();
        let dispatcher = HttpDispatcher::with_client(client.clone(), &config.timeouts);
        let prober = ConnectivityProber::with_client(client, &config.timeouts);
        Self::new(store, Arc::new(dispatcher), prober).with_max_text_chars(config.max_text_chars)
    }

    pub fn with_max_text_chars(mut self, max: usize) -> Self {
        self.max_text_chars = max;
        self
    }

    // ── Corrections ──

    /// Correct spelling and grammar in `text`.
    pub async fn proofread(&self, text: &str) -> Result<String, ProofreadError> {
        validate_text(text, self.max_text_chars)?;
        let settings = load_settings(self.store.as_ref()).await?;
        info!(
            provider = %settings.provider,
            text_len = text.chars().count(),
            "Proofreading"
        );
        self.correct(correction_prompt(text), settings).await
    }

    /// Correct `text` with a caller-built instruction (sent verbatim).
    pub async fn proofread_with_context(
        &self,
        text: &str,
        context: &ProofreadContext,
    ) -> Result<String, ProofreadError> {
        validate_text(text, self.max_text_chars)?;
        require_prompt(context)?;
        let settings = load_settings(self.store.as_ref()).await?;
        info!(
            provider = %settings.provider,
            context = context.kind.as_deref().unwrap_or("-"),
            text_len = text.chars().count(),
            "Proofreading with context"
        );
        self.correct(context.prompt.clone(), settings).await
    }

    async fn correct(
        &self,
        prompt: String,
        settings: ProviderSettings,
    ) -> Result<String, ProofreadError> {
        let request = CorrectionRequest::new(prompt, settings);
        let raw = self.dispatcher.invoke(&request).await?;
        let cleaned = normalize(&raw);
        debug!(
            raw_len = raw.chars().count(),
            cleaned_len = cleaned.chars().count(),
            "Response normalized"
        );
        Ok(cleaned)
    }

    // ── Suggestions ──

    /// Up to five suggested changes for `text`.
    pub async fn get_suggestions(&self, text: &str) -> Result<Vec<Suggestion>, ProofreadError> {
        validate_text(text, self.max_text_chars)?;
        let settings = load_settings(self.store.as_ref()).await?;
        let request = CorrectionRequest::new(suggestions_prompt(text), settings);
        let raw = self.dispatcher.invoke(&request).await?;
        Ok(parse_suggestions(&raw, text))
    }

    /// Suggestions using a context prompt with its output cues rewritten.
    pub async fn get_suggestions_with_context(
        &self,
        text: &str,
        context: &ProofreadContext,
    ) -> Result<Vec<Suggestion>, ProofreadError> {
        validate_text(text, self.max_text_chars)?;
        require_prompt(context)?;
        let settings = load_settings(self.store.as_ref()).await?;
        let prompt = suggestion_prompt_from_context(&context.prompt);
        let raw = self
            .dispatcher
            .invoke(&CorrectionRequest::new(prompt, settings))
            .await?;
        Ok(parse_suggestions(&raw, text))
    }

    // ── Settings ──

    pub async fn get_settings(&self) -> Result<ProviderSettings, ProofreadError> {
        load_settings(self.store.as_ref()).await
    }

    /// Merge a partial update into the stored settings.
    pub async fn save_settings(
        &self,
        patch: &SettingsPatch,
    ) -> Result<ProviderSettings, ProofreadError> {
        let saved = save_settings(self.store.as_ref(), patch).await?;
        info!(provider = %saved.provider, "Settings saved");
        Ok(saved)
    }

    // ── Diagnostics ──

    /// Probe the currently configured provider.
    pub async fn test_connection(&self) -> ConnectivityReport {
        match load_settings(self.store.as_ref()).await {
            Ok(settings) => self.prober.test_connection(&settings).await,
            Err(e) => ConnectivityReport::from_error(&e),
        }
    }
}

fn require_prompt(context: &ProofreadContext) -> Result<(), ProofreadError> {
    if context.prompt.trim().is_empty() {
        return Err(ProofreadError::InvalidRequest("context prompt is empty".into()));
    }
    Ok(())
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
