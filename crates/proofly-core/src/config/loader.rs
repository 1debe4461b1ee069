//! Config loader — reads `~/.proofly/config.json`, applies legacy migrations
//! and env var overrides.
//!
//! # Loading precedence
//! 1. Defaults (from `Config::default()`)
//! 2. JSON file at `~/.proofly/config.json`
//! 3. Environment variables `PROOFLY_<SECTION>__<FIELD>` (override JSON)

use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::{debug, info, warn};

use super::schema::{Config, ProviderSettings};

/// Default config file path.
pub fn get_config_path() -> PathBuf {
    crate::utils::get_data_path().join("config.json")
}

/// Load configuration from the default path + env vars.
///
/// Falls back to `Config::default()` if the file doesn't exist or can't be parsed.
pub fn load_config(path: Option<&Path>) -> Config {
    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);

    apply_env_overrides(load_config_from_path(&config_path))
}

/// Load config from a specific file path, without env overrides.
fn load_config_from_path(path: &Path) -> Config {
    if !path.exists() {
        info!("No config file found at {}, using defaults", path.display());
        return Config::default();
    }

    debug!("Loading config from {}", path.display());

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to read config file {}: {}", path.display(), e);
            return Config::default();
        }
    };

    let mut raw: serde_json::Value = match serde_json::from_str(&content) {
        Ok(v) => v,
        Err(e) => {
            warn!("Failed to parse config JSON: {}", e);
            return Config::default();
        }
    };

    migrate_config(&mut raw);

    match serde_json::from_value(raw) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to deserialize config: {}", e);
            Config::default()
        }
    }
}

/// Save configuration to disk (pretty-printed JSON with camelCase keys).
pub fn save_config(config: &Config, path: Option<&Path>) -> anyhow::Result<()> {
    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(&config_path, json)
        .with_context(|| format!("failed to write {}", config_path.display()))?;
    debug!("Config saved to {}", config_path.display());
    Ok(())
}

/// Apply legacy config migrations.
///
/// - top-level `settings` → `llmSettings`
/// - `llmSettings.endpoint` → `llmSettings.customEndpoint`
pub(crate) fn migrate_config(raw: &mut serde_json::Value) {
    let Some(obj) = raw.as_object_mut() else {
        return;
    };

    if !obj.contains_key("llmSettings") {
        if let Some(old) = obj.remove("settings") {
            obj.insert("llmSettings".to_string(), old);
            debug!("Migrated settings → llmSettings");
        }
    }

    if let Some(settings) = obj.get_mut("llmSettings").and_then(|v| v.as_object_mut()) {
        if !settings.contains_key("customEndpoint") {
            if let Some(endpoint) = settings.remove("endpoint") {
                settings.insert("customEndpoint".to_string(), endpoint);
                debug!("Migrated llmSettings.endpoint → llmSettings.customEndpoint");
            }
        }
    }
}

/// Apply environment variable overrides on top of a loaded config.
///
/// Supported overrides:
/// - `PROOFLY_LLM__PROVIDER` → `llmSettings.provider`
/// - `PROOFLY_LLM__MODEL` → `llmSettings.model`
/// - `PROOFLY_LLM__API_KEY` → `llmSettings.apiKey`
/// - `PROOFLY_LLM__CUSTOM_ENDPOINT` → `llmSettings.customEndpoint`
/// - `PROOFLY_TIMEOUTS__REQUEST_SECS` → `timeouts.requestSecs`
/// - `PROOFLY_MAX_TEXT_CHARS` → `maxTextChars`
pub fn apply_env_overrides(config: Config) -> Config {
    apply_overrides_with(config, |name| std::env::var(name).ok())
}

/// Same as [`apply_env_overrides`] with an injectable variable lookup.
pub fn apply_overrides_with(
    mut config: Config,
    lookup: impl Fn(&str) -> Option<String>,
) -> Config {
    apply_settings_overrides_with(&mut config.llm_settings, &lookup);

    if let Some(val) = lookup("PROOFLY_TIMEOUTS__REQUEST_SECS") {
        if let Ok(n) = val.parse::<u64>() {
            config.timeouts.request_secs = n;
        }
    }
    if let Some(val) = lookup("PROOFLY_MAX_TEXT_CHARS") {
        if let Ok(n) = val.parse::<usize>() {
            config.max_text_chars = n;
        }
    }

    config
}

/// Apply the `PROOFLY_LLM__*` overrides to a settings value.
pub fn apply_settings_overrides_with(
    settings: &mut ProviderSettings,
    lookup: &impl Fn(&str) -> Option<String>,
) {
    if let Some(val) = lookup("PROOFLY_LLM__PROVIDER") {
        settings.provider = val;
    }
    if let Some(val) = lookup("PROOFLY_LLM__MODEL") {
        settings.model = val;
    }
    if let Some(val) = lookup("PROOFLY_LLM__API_KEY") {
        settings.api_key = val;
    }
    if let Some(val) = lookup("PROOFLY_LLM__CUSTOM_ENDPOINT") {
        settings.custom_endpoint = val;
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_temp_json(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn test_load_missing_file() {
        let config = load_config_from_path(Path::new("/nonexistent/path/config.json"));
        assert_eq!(config, Config::default());
        assert_eq!(config.max_text_chars, 10_000);
    }

    #[test]
    fn test_load_valid_json() {
        let file = write_temp_json(
            r#"{
            "llmSettings": {
                "provider": "openai",
                "model": "gpt-4o-mini",
                "apiKey": "sk-test"
            },
            "timeouts": { "requestSecs": 30 }
        }"#,
        );

        let config = load_config_from_path(file.path());
        assert_eq!(config.llm_settings.provider, "openai");
        assert_eq!(config.llm_settings.model, "gpt-4o-mini");
        assert_eq!(config.llm_settings.api_key, "sk-test");
        assert_eq!(config.timeouts.request_secs, 30);
        // Defaults preserved
        assert_eq!(config.timeouts.health_secs, 5);
    }

    #[test]
    fn test_load_invalid_json_returns_defaults() {
        let file = write_temp_json("not valid json {{{");
        let config = load_config_from_path(file.path());
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_empty_json() {
        let file = write_temp_json("{}");
        let config = load_config_from_path(file.path());
        assert_eq!(config.llm_settings.provider, "local");
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = Config::default();
        config.llm_settings.provider = "anthropic".to_string();
        config.llm_settings.api_key = "sk-ant-test".to_string();

        save_config(&config, Some(&path)).unwrap();

        let reloaded = load_config_from_path(&path);
        assert_eq!(reloaded.llm_settings.provider, "anthropic");
        assert_eq!(reloaded.llm_settings.api_key, "sk-ant-test");
    }

    #[test]
    fn test_migrate_legacy_settings_key() {
        let file = write_temp_json(
            r#"{
            "settings": {
                "provider": "custom",
                "endpoint": "http://localhost:5000/generate"
            }
        }"#,
        );

        let config = load_config_from_path(file.path());
        assert_eq!(config.llm_settings.provider, "custom");
        assert_eq!(
            config.llm_settings.custom_endpoint,
            "http://localhost:5000/generate"
        );
    }

    #[test]
    fn test_migrate_no_overwrite() {
        let mut raw = serde_json::json!({
            "llmSettings": {
                "customEndpoint": "http://new",
                "endpoint": "http://old"
            },
            "settings": { "provider": "openai" }
        });
        migrate_config(&mut raw);
        assert_eq!(raw["llmSettings"]["customEndpoint"], "http://new");
        assert!(raw["llmSettings"].get("provider").is_none());
    }

    #[test]
    fn test_env_override_settings() {
        let config = apply_overrides_with(
            Config::default(),
            env(&[
                ("PROOFLY_LLM__PROVIDER", "groq"),
                ("PROOFLY_LLM__MODEL", "llama3-8b-8192"),
                ("PROOFLY_LLM__API_KEY", "gsk-env"),
            ]),
        );
        assert_eq!(config.llm_settings.provider, "groq");
        assert_eq!(config.llm_settings.model, "llama3-8b-8192");
        assert_eq!(config.llm_settings.api_key, "gsk-env");
    }

    #[test]
    fn test_env_override_numbers() {
        let config = apply_overrides_with(
            Config::default(),
            env(&[
                ("PROOFLY_TIMEOUTS__REQUEST_SECS", "90"),
                ("PROOFLY_MAX_TEXT_CHARS", "not-a-number"),
            ]),
        );
        assert_eq!(config.timeouts.request_secs, 90);
        // Unparseable values are ignored
        assert_eq!(config.max_text_chars, 10_000);
    }

    #[test]
    fn test_saved_json_uses_camel_case() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        save_config(&Config::default(), Some(&path)).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let raw: serde_json::Value = serde_json::from_str(&content).unwrap();

        assert!(raw.get("llmSettings").is_some());
        assert!(raw["timeouts"].get("requestSecs").is_some());
        assert!(raw.get("llm_settings").is_none());
    }
}
