//! Configuration schema.
//!
//! Hierarchy: `Config` → `ProviderSettings` (persisted as `llmSettings`),
//! `TimeoutConfig`, and the text length cap.
//!
//! JSON on disk uses **camelCase** keys; Rust uses snake_case.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::MAX_TEXT_CHARS;
use crate::utils::mask_secret;

// ─────────────────────────────────────────────
// Root Config
// ─────────────────────────────────────────────

/// Root configuration — loaded from `~/.proofly/config.json` + env vars.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub llm_settings: ProviderSettings,
    pub timeouts: TimeoutConfig,
    /// Longest user text accepted for a single correction.
    pub max_text_chars: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm_settings: ProviderSettings::default(),
            timeouts: TimeoutConfig::default(),
            max_text_chars: MAX_TEXT_CHARS,
        }
    }
}

// ─────────────────────────────────────────────
// Provider settings
// ─────────────────────────────────────────────

/// The user's provider selection.
///
/// Read before every request and replaced only through a merged save.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderSettings {
    /// Registry key (e.g. `"ollama"`, `"openai"`).
    pub provider: String,
    /// Overrides the provider's default model when non-empty.
    pub model: String,
    /// Required for remote providers other than `custom`.
    pub api_key: String,
    /// Overrides the provider's default endpoint when non-empty.
    pub custom_endpoint: String,
    /// Wire format spoken by a `custom` endpoint. Ignored for other providers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_format: Option<String>,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            provider: "local".to_string(),
            model: "llama2".to_string(),
            api_key: String::new(),
            custom_endpoint: String::new(),
            custom_format: None,
        }
    }
}

impl std::fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_key", &mask_secret(&self.api_key))
            .field("custom_endpoint", &self.custom_endpoint)
            .field("custom_format", &self.custom_format)
            .finish()
    }
}

impl ProviderSettings {
    /// Settings for a provider key with everything else left at defaults.
    pub fn for_provider(provider: &str) -> Self {
        Self {
            provider: provider.to_string(),
            model: String::new(),
            ..Default::default()
        }
    }

    /// Whether an API key is set.
    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    /// Merge a partial update into these settings.
    pub fn apply(&mut self, patch: &SettingsPatch) {
        if let Some(ref v) = patch.provider {
            self.provider = v.clone();
        }
        if let Some(ref v) = patch.model {
            self.model = v.clone();
        }
        if let Some(ref v) = patch.api_key {
            self.api_key = v.clone();
        }
        if let Some(ref v) = patch.custom_endpoint {
            self.custom_endpoint = v.clone();
        }
        if let Some(ref v) = patch.custom_format {
            self.custom_format = if v.is_empty() { None } else { Some(v.clone()) };
        }
    }
}

/// A partial settings update, as sent by `saveSettings`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SettingsPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_format: Option<String>,
}

impl SettingsPatch {
    /// Whether the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

// ─────────────────────────────────────────────
// Timeouts
// ─────────────────────────────────────────────

/// Per-request timeouts, in seconds. No outbound call waits forever.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TimeoutConfig {
    /// Correction and suggestion requests.
    pub request_secs: u64,
    /// Local server version/health check.
    pub health_secs: u64,
    /// Local model listing.
    pub models_secs: u64,
    /// Trial generation during a connection test.
    pub inference_secs: u64,
    /// Remote API key validation.
    pub key_check_secs: u64,
    /// Custom endpoint reachability (HEAD).
    pub head_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 60,
            health_secs: 5,
            models_secs: 10,
            inference_secs: 15,
            key_check_secs: 10,
            head_secs: 10,
        }
    }
}

impl TimeoutConfig {
    pub fn request(&self) -> Duration {
        Duration::from_secs(self.request_secs)
    }

    pub fn health(&self) -> Duration {
        Duration::from_secs(self.health_secs)
    }

    pub fn models(&self) -> Duration {
        Duration::from_secs(self.models_secs)
    }

    pub fn inference(&self) -> Duration {
        Duration::from_secs(self.inference_secs)
    }

    pub fn key_check(&self) -> Duration {
        Duration::from_secs(self.key_check_secs)
    }

    pub fn head(&self) -> Duration {
        Duration::from_secs(self.head_secs)
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
