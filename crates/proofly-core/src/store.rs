//! Configuration store — the key-value seam settings are persisted through.
//!
//! `get` returns only the requested keys that exist; `set` replaces the given
//! top-level keys in one write. Settings are always merged client-side before
//! that single write, so no read-modify-write transaction is needed.
//!
//! Environment overrides are read-only: saves merge against what is stored,
//! never against the overridden view.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::config::loader::{apply_settings_overrides_with, migrate_config};
use crate::config::{ProviderSettings, SettingsPatch};
use crate::error::ProofreadError;

/// Store key under which [`ProviderSettings`] live.
pub const SETTINGS_KEY: &str = "llmSettings";

/// Async key-value configuration store.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Fetch the given keys. Missing keys are simply absent from the map.
    async fn get(&self, keys: &[&str]) -> Result<Map<String, Value>, ProofreadError>;

    /// Fetch the given keys exactly as stored, without read-time overrides.
    async fn get_stored(&self, keys: &[&str]) -> Result<Map<String, Value>, ProofreadError> {
        self.get(keys).await
    }

    /// Write the given top-level keys, leaving other keys untouched.
    async fn set(&self, data: Map<String, Value>) -> Result<(), ProofreadError>;
}

// ─────────────────────────────────────────────
// MemoryStore
// ─────────────────────────────────────────────

/// In-process store, used by tests and embedders that persist elsewhere.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<Map<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-populated with settings.
    pub fn with_settings(settings: &ProviderSettings) -> Self {
        let mut data = Map::new();
        if let Ok(v) = serde_json::to_value(settings) {
            data.insert(SETTINGS_KEY.to_string(), v);
        }
        Self {
            data: RwLock::new(data),
        }
    }
}

#[async_trait]
impl ConfigStore for MemoryStore {
    async fn get(&self, keys: &[&str]) -> Result<Map<String, Value>, ProofreadError> {
        let data = self.data.read().await;
        Ok(select_keys(&data, keys))
    }

    async fn set(&self, data: Map<String, Value>) -> Result<(), ProofreadError> {
        let mut guard = self.data.write().await;
        guard.extend(data);
        Ok(())
    }
}

// ─────────────────────────────────────────────
// JsonFileStore
// ─────────────────────────────────────────────

/// Store backed by a single JSON document (`~/.proofly/config.json`).
///
/// `PROOFLY_LLM__*` environment variables override the stored settings on read.
pub struct JsonFileStore {
    path: PathBuf,
    env_lookup: Option<EnvLookup>,
    write_lock: Mutex<()>,
}

type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

impl std::fmt::Debug for JsonFileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonFileStore")
            .field("path", &self.path)
            .field("env_overrides", &self.env_lookup.is_some())
            .finish()
    }
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            env_lookup: Some(Arc::new(|name: &str| std::env::var(name).ok())),
            write_lock: Mutex::new(()),
        }
    }

    /// Store at the default config path.
    pub fn default_path() -> Self {
        Self::new(crate::config::get_config_path())
    }

    /// Disable environment overrides (reads return exactly what is on disk).
    pub fn without_env_overrides(mut self) -> Self {
        self.env_lookup = None;
        self
    }

    /// Resolve overrides through `lookup` instead of the process environment.
    pub fn with_env_lookup(
        mut self,
        lookup: impl Fn(&str) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        self.env_lookup = Some(Arc::new(lookup));
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_document(&self) -> Result<Map<String, Value>, ProofreadError> {
        if !tokio::fs::try_exists(&self.path).await.unwrap_or(false) {
            return Ok(Map::new());
        }
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| store_error(&self.path, "read", e))?;
        if content.trim().is_empty() {
            return Ok(Map::new());
        }
        let mut raw: Value = serde_json::from_str(&content)
            .map_err(|e| store_error(&self.path, "parse", e))?;
        migrate_config(&mut raw);
        match raw {
            Value::Object(map) => Ok(map),
            _ => Err(ProofreadError::Store(format!(
                "{} does not contain a JSON object",
                self.path.display()
            ))),
        }
    }
}

#[async_trait]
impl ConfigStore for JsonFileStore {
    async fn get(&self, keys: &[&str]) -> Result<Map<String, Value>, ProofreadError> {
        let mut selected = self.get_stored(keys).await?;
        let Some(lookup) = self.env_lookup.as_ref() else {
            return Ok(selected);
        };

        if keys.contains(&SETTINGS_KEY) {
            let mut settings = selected
                .get(SETTINGS_KEY)
                .and_then(|v| serde_json::from_value::<ProviderSettings>(v.clone()).ok())
                .unwrap_or_default();
            let before = settings.clone();
            apply_settings_overrides_with(&mut settings, &|name: &str| lookup(name));
            if settings != before {
                debug!("applied PROOFLY_LLM__* overrides to stored settings");
                if let Ok(v) = serde_json::to_value(&settings) {
                    selected.insert(SETTINGS_KEY.to_string(), v);
                }
            }
        }

        Ok(selected)
    }

    async fn get_stored(&self, keys: &[&str]) -> Result<Map<String, Value>, ProofreadError> {
        let doc = self.read_document().await?;
        Ok(select_keys(&doc, keys))
    }

    async fn set(&self, data: Map<String, Value>) -> Result<(), ProofreadError> {
        let _guard = self.write_lock.lock().await;

        let mut doc = self.read_document().await?;
        doc.extend(data);

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| store_error(parent, "create", e))?;
        }
        let json = serde_json::to_string_pretty(&Value::Object(doc))
            .map_err(|e| store_error(&self.path, "serialize", e))?;
        tokio::fs::write(&self.path, json)
            .await
            .map_err(|e| store_error(&self.path, "write", e))?;

        debug!(path = %self.path.display(), "config store written");
        Ok(())
    }
}

fn store_error(path: &Path, op: &str, e: impl std::fmt::Display) -> ProofreadError {
    ProofreadError::Store(format!("failed to {op} {}: {e}", path.display()))
}

fn select_keys(data: &Map<String, Value>, keys: &[&str]) -> Map<String, Value> {
    keys.iter()
        .filter_map(|k| data.get(*k).map(|v| (k.to_string(), v.clone())))
        .collect()
}

// ─────────────────────────────────────────────
// Settings helpers
// ─────────────────────────────────────────────

/// Read the settings, filling missing fields with defaults.
///
/// Unreadable stored settings degrade to defaults with a warning.
pub async fn load_settings(store: &dyn ConfigStore) -> Result<ProviderSettings, ProofreadError> {
    let data = store.get(&[SETTINGS_KEY]).await?;
    Ok(settings_from(data))
}

fn settings_from(mut data: Map<String, Value>) -> ProviderSettings {
    let Some(raw) = data.remove(SETTINGS_KEY) else {
        debug!("no saved settings found, using defaults");
        return ProviderSettings::default();
    };

    match serde_json::from_value::<ProviderSettings>(raw) {
        Ok(settings) => {
            debug!(
                provider = %settings.provider,
                model = %settings.model,
                has_api_key = settings.has_api_key(),
                "settings loaded"
            );
            settings
        }
        Err(e) => {
            warn!("stored settings are malformed, using defaults: {e}");
            ProviderSettings::default()
        }
    }
}

/// Merge a partial update into the stored settings and write them once.
///
/// The merge base is the stored document, so values that only come from
/// environment overrides are never persisted.
pub async fn save_settings(
    store: &dyn ConfigStore,
    patch: &SettingsPatch,
) -> Result<ProviderSettings, ProofreadError> {
    let mut settings = settings_from(store.get_stored(&[SETTINGS_KEY]).await?);
    settings.apply(patch);

    let value = serde_json::to_value(&settings)
        .map_err(|e| ProofreadError::Store(format!("failed to serialize settings: {e}")))?;
    let mut data = Map::new();
    data.insert(SETTINGS_KEY.to_string(), value);
    store.set(data).await?;

    debug!(provider = %settings.provider, "settings saved");
    Ok(settings)
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_memory_store_defaults_when_empty() {
        let store = MemoryStore::new();
        let settings = load_settings(&store).await.unwrap();
        assert_eq!(settings, ProviderSettings::default());
    }

    #[tokio::test]
    async fn test_memory_store_get_only_requested_keys() {
        let store = MemoryStore::new();
        let mut data = Map::new();
        data.insert("a".into(), json!(1));
        data.insert("b".into(), json!(2));
        store.set(data).await.unwrap();

        let got = store.get(&["a", "missing"]).await.unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got["a"], json!(1));
    }

    #[tokio::test]
    async fn test_save_settings_merges_patch() {
        let store = MemoryStore::with_settings(&ProviderSettings {
            provider: "openai".into(),
            model: "gpt-4o-mini".into(),
            api_key: "sk-old".into(),
            ..Default::default()
        });

        let saved = save_settings(
            &store,
            &SettingsPatch {
                api_key: Some("sk-new".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(saved.provider, "openai");
        assert_eq!(saved.model, "gpt-4o-mini");
        assert_eq!(saved.api_key, "sk-new");
        assert_eq!(load_settings(&store).await.unwrap(), saved);
    }

    #[tokio::test]
    async fn test_malformed_settings_fall_back_to_defaults() {
        let store = MemoryStore::new();
        let mut data = Map::new();
        data.insert(SETTINGS_KEY.into(), json!("not an object"));
        store.set(data).await.unwrap();

        let settings = load_settings(&store).await.unwrap();
        assert_eq!(settings.provider, "local");
    }

    #[tokio::test]
    async fn test_file_store_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("config.json")).without_env_overrides();
        let got = store.get(&[SETTINGS_KEY]).await.unwrap();
        assert!(got.is_empty());
    }

    #[tokio::test]
    async fn test_file_store_preserves_other_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"timeouts":{"requestSecs":42}}"#).unwrap();

        let store = JsonFileStore::new(&path).without_env_overrides();
        save_settings(
            &store,
            &SettingsPatch {
                provider: Some("anthropic".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let raw: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["timeouts"]["requestSecs"], 42);
        assert_eq!(raw["llmSettings"]["provider"], "anthropic");
    }

    #[tokio::test]
    async fn test_file_store_round_trip_creates_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a").join("b").join("config.json");
        let store = JsonFileStore::new(&path).without_env_overrides();

        save_settings(
            &store,
            &SettingsPatch {
                provider: Some("cohere".into()),
                api_key: Some("co-key".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let settings = load_settings(&store).await.unwrap();
        assert_eq!(settings.provider, "cohere");
        assert_eq!(settings.api_key, "co-key");
    }

    #[tokio::test]
    async fn test_file_store_rejects_non_object() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "[1, 2, 3]").unwrap();

        let store = JsonFileStore::new(&path).without_env_overrides();
        let err = store.get(&[SETTINGS_KEY]).await.unwrap_err();
        assert!(matches!(err, ProofreadError::Store(_)));
    }

    #[tokio::test]
    async fn test_file_store_migrates_legacy_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"settings":{"provider":"custom","endpoint":"http://x"}}"#)
            .unwrap();

        let store = JsonFileStore::new(&path).without_env_overrides();
        let settings = load_settings(&store).await.unwrap();
        assert_eq!(settings.provider, "custom");
        assert_eq!(settings.custom_endpoint, "http://x");
    }

    #[tokio::test]
    async fn test_env_overrides_never_written_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"llmSettings":{"provider":"openai","apiKey":"sk-stored"}}"#)
            .unwrap();
        let store = JsonFileStore::new(&path).with_env_lookup(|name| {
            (name == "PROOFLY_LLM__API_KEY").then(|| "sk-from-env-secret".to_string())
        });

        let saved = save_settings(
            &store,
            &SettingsPatch {
                model: Some("gpt-4o".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(saved.api_key, "sk-stored");

        let on_disk = std::fs::read_to_string(&path).unwrap();
        assert!(!on_disk.contains("sk-from-env-secret"));
        assert!(on_disk.contains("gpt-4o"));

        let settings = load_settings(&store).await.unwrap();
        assert_eq!(settings.api_key, "sk-from-env-secret");
        assert_eq!(settings.model, "gpt-4o");

        let stored = store.get_stored(&[SETTINGS_KEY]).await.unwrap();
        assert_eq!(stored[SETTINGS_KEY]["apiKey"], "sk-stored");
    }
}
