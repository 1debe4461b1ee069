//! Provider registry — static descriptors for every supported backend.
//!
//! Each `ProviderDescriptor` says where a provider lives, which model to use
//! when the user has not picked one, whether it runs on this machine, and
//! which wire format it speaks. The wire format alone decides request and
//! response shape.

use proofly_core::{ProofreadError, ProviderSettings};
use tracing::warn;

// ─────────────────────────────────────────────
// WireFormat
// ─────────────────────────────────────────────

/// The request/response family a provider speaks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WireFormat {
    Ollama,
    OpenAi,
    Anthropic,
    Google,
    Cohere,
    HuggingFace,
    Replicate,
}

impl WireFormat {
    /// Every format, for exhaustive tests and UI pickers.
    pub const ALL: [WireFormat; 7] = [
        WireFormat::Ollama,
        WireFormat::OpenAi,
        WireFormat::Anthropic,
        WireFormat::Google,
        WireFormat::Cohere,
        WireFormat::HuggingFace,
        WireFormat::Replicate,
    ];

    /// Canonical lowercase name (e.g. `"openai"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            WireFormat::Ollama => "ollama",
            WireFormat::OpenAi => "openai",
            WireFormat::Anthropic => "anthropic",
            WireFormat::Google => "google",
            WireFormat::Cohere => "cohere",
            WireFormat::HuggingFace => "huggingface",
            WireFormat::Replicate => "replicate",
        }
    }

    /// Strict parse; `None` for names that are not a known format.
    pub fn parse(name: &str) -> Option<WireFormat> {
        let lower = name.trim().to_lowercase();
        WireFormat::ALL.into_iter().find(|f| f.as_str() == lower)
    }

    /// Lenient parse: unknown names fall back to the OpenAI-compatible shape.
    pub fn from_name(name: &str) -> WireFormat {
        WireFormat::parse(name).unwrap_or_else(|| {
            warn!(format = name, "unknown wire format, using openai-compatible");
            WireFormat::OpenAi
        })
    }
}

impl std::fmt::Display for WireFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─────────────────────────────────────────────
// ProviderDescriptor
// ─────────────────────────────────────────────

/// UI grouping for the provider picker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProviderCategory {
    /// Self-hosted on this machine.
    Local,
    /// First-party commercial APIs.
    Commercial,
    /// Third-party hosts serving open models.
    OpenModel,
    /// User-supplied endpoint.
    Custom,
}

/// Static metadata describing one provider.
#[derive(Clone, Debug)]
pub struct ProviderDescriptor {
    /// Registry key (e.g. `"lm-studio"`).
    pub key: &'static str,
    /// Human-readable name for logs and the UI.
    pub display_name: &'static str,
    /// Runs on `127.0.0.1`/`localhost` without an API key.
    pub is_local: bool,
    /// Endpoint used when the user has not set one.
    pub default_endpoint: &'static str,
    /// Model used when the user has not set one.
    pub default_model: &'static str,
    /// Request/response family.
    pub wire_format: WireFormat,
    /// Authenticated GET used to validate an API key. `None` when the
    /// provider has no such endpoint (or needs no key).
    pub models_endpoint: Option<&'static str>,
    pub category: ProviderCategory,
}

impl ProviderDescriptor {
    /// Whether requests need a user-supplied API key.
    pub fn requires_api_key(&self) -> bool {
        !self.is_local && !self.is_custom()
    }

    pub fn is_custom(&self) -> bool {
        self.key == CUSTOM_PROVIDER
    }
}

/// Key of the user-supplied endpoint escape hatch.
pub const CUSTOM_PROVIDER: &str = "custom";

/// Every supported provider, in UI order.
pub static PROVIDERS: &[ProviderDescriptor] = &[
    // ── Local / self-hosted ──
    ProviderDescriptor {
        key: "local",
        display_name: "Ollama (Local)",
        is_local: true,
        default_endpoint: "http://127.0.0.1:11434/api/generate",
        default_model: "llama2",
        wire_format: WireFormat::Ollama,
        models_endpoint: None,
        category: ProviderCategory::Local,
    },
    ProviderDescriptor {
        key: "ollama",
        display_name: "Ollama",
        is_local: true,
        default_endpoint: "http://127.0.0.1:11434/api/generate",
        default_model: "llama2",
        wire_format: WireFormat::Ollama,
        models_endpoint: None,
        category: ProviderCategory::Local,
    },
    ProviderDescriptor {
        key: "llama-cpp",
        display_name: "llama.cpp Server",
        is_local: true,
        default_endpoint: "http://localhost:8080/v1/chat/completions",
        default_model: "model",
        wire_format: WireFormat::OpenAi,
        models_endpoint: None,
        category: ProviderCategory::Local,
    },
    ProviderDescriptor {
        key: "lm-studio",
        display_name: "LM Studio",
        is_local: true,
        default_endpoint: "http://localhost:1234/v1/chat/completions",
        default_model: "local-model",
        wire_format: WireFormat::OpenAi,
        models_endpoint: None,
        category: ProviderCategory::Local,
    },
    ProviderDescriptor {
        key: "jan",
        display_name: "Jan",
        is_local: true,
        default_endpoint: "http://localhost:1337/v1/chat/completions",
        default_model: "trinity-v1",
        wire_format: WireFormat::OpenAi,
        models_endpoint: None,
        category: ProviderCategory::Local,
    },
    // ── Commercial APIs ──
    ProviderDescriptor {
        key: "openai",
        display_name: "OpenAI",
        is_local: false,
        default_endpoint: "https://api.openai.com/v1/chat/completions",
        default_model: "gpt-3.5-turbo",
        wire_format: WireFormat::OpenAi,
        models_endpoint: Some("https://api.openai.com/v1/models"),
        category: ProviderCategory::Commercial,
    },
    ProviderDescriptor {
        key: "anthropic",
        display_name: "Anthropic Claude",
        is_local: false,
        default_endpoint: "https://api.anthropic.com/v1/messages",
        default_model: "claude-3-haiku-20240307",
        wire_format: WireFormat::Anthropic,
        models_endpoint: Some("https://api.anthropic.com/v1/models"),
        category: ProviderCategory::Commercial,
    },
    ProviderDescriptor {
        key: "google",
        display_name: "Google Gemini",
        is_local: false,
        default_endpoint:
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-pro:generateContent",
        default_model: "gemini-pro",
        wire_format: WireFormat::Google,
        models_endpoint: Some("https://generativelanguage.googleapis.com/v1beta/models"),
        category: ProviderCategory::Commercial,
    },
    ProviderDescriptor {
        key: "mistral",
        display_name: "Mistral AI",
        is_local: false,
        default_endpoint: "https://api.mistral.ai/v1/chat/completions",
        default_model: "mistral-tiny",
        wire_format: WireFormat::OpenAi,
        models_endpoint: Some("https://api.mistral.ai/v1/models"),
        category: ProviderCategory::Commercial,
    },
    ProviderDescriptor {
        key: "groq",
        display_name: "Groq",
        is_local: false,
        default_endpoint: "https://api.groq.com/openai/v1/chat/completions",
        default_model: "llama2-70b-4096",
        wire_format: WireFormat::OpenAi,
        models_endpoint: Some("https://api.groq.com/openai/v1/models"),
        category: ProviderCategory::Commercial,
    },
    ProviderDescriptor {
        key: "together",
        display_name: "Together AI",
        is_local: false,
        default_endpoint: "https://api.together.xyz/v1/chat/completions",
        default_model: "meta-llama/Llama-2-7b-chat-hf",
        wire_format: WireFormat::OpenAi,
        models_endpoint: Some("https://api.together.xyz/v1/models"),
        category: ProviderCategory::Commercial,
    },
    ProviderDescriptor {
        key: "perplexity",
        display_name: "Perplexity",
        is_local: false,
        default_endpoint: "https://api.perplexity.ai/chat/completions",
        default_model: "llama-2-70b-chat",
        wire_format: WireFormat::OpenAi,
        models_endpoint: None,
        category: ProviderCategory::Commercial,
    },
    ProviderDescriptor {
        key: "cohere",
        display_name: "Cohere",
        is_local: false,
        default_endpoint: "https://api.cohere.ai/v1/generate",
        default_model: "command",
        wire_format: WireFormat::Cohere,
        models_endpoint: Some("https://api.cohere.ai/v1/models"),
        category: ProviderCategory::Commercial,
    },
    // ── Open-model hosts ──
    ProviderDescriptor {
        key: "huggingface",
        display_name: "Hugging Face",
        is_local: false,
        default_endpoint: "https://api-inference.huggingface.co/models",
        default_model: "microsoft/DialoGPT-medium",
        wire_format: WireFormat::HuggingFace,
        models_endpoint: Some("https://huggingface.co/api/whoami-v2"),
        category: ProviderCategory::OpenModel,
    },
    ProviderDescriptor {
        key: "replicate",
        display_name: "Replicate",
        is_local: false,
        default_endpoint: "https://api.replicate.com/v1/predictions",
        default_model: "meta/llama-2-7b-chat",
        wire_format: WireFormat::Replicate,
        models_endpoint: Some("https://api.replicate.com/v1/account"),
        category: ProviderCategory::OpenModel,
    },
    ProviderDescriptor {
        key: "fireworks",
        display_name: "Fireworks AI",
        is_local: false,
        default_endpoint: "https://api.fireworks.ai/inference/v1/chat/completions",
        default_model: "accounts/fireworks/models/llama-v2-7b-chat",
        wire_format: WireFormat::OpenAi,
        models_endpoint: Some("https://api.fireworks.ai/inference/v1/models"),
        category: ProviderCategory::OpenModel,
    },
    ProviderDescriptor {
        key: "deepinfra",
        display_name: "DeepInfra",
        is_local: false,
        default_endpoint: "https://api.deepinfra.com/v1/openai/chat/completions",
        default_model: "meta-llama/Llama-2-7b-chat-hf",
        wire_format: WireFormat::OpenAi,
        models_endpoint: Some("https://api.deepinfra.com/v1/openai/models"),
        category: ProviderCategory::OpenModel,
    },
    ProviderDescriptor {
        key: "anyscale",
        display_name: "Anyscale",
        is_local: false,
        default_endpoint: "https://api.endpoints.anyscale.com/v1/chat/completions",
        default_model: "meta-llama/Llama-2-7b-chat-hf",
        wire_format: WireFormat::OpenAi,
        models_endpoint: Some("https://api.endpoints.anyscale.com/v1/models"),
        category: ProviderCategory::OpenModel,
    },
    ProviderDescriptor {
        key: "openrouter",
        display_name: "OpenRouter",
        is_local: false,
        default_endpoint: "https://openrouter.ai/api/v1/chat/completions",
        default_model: "openai/gpt-3.5-turbo",
        wire_format: WireFormat::OpenAi,
        models_endpoint: Some("https://openrouter.ai/api/v1/auth/key"),
        category: ProviderCategory::OpenModel,
    },
    ProviderDescriptor {
        key: "novita",
        display_name: "Novita AI",
        is_local: false,
        default_endpoint: "https://api.novita.ai/v3/openai/chat/completions",
        default_model: "gryphe/mythomax-l2-13b",
        wire_format: WireFormat::OpenAi,
        models_endpoint: Some("https://api.novita.ai/v3/openai/models"),
        category: ProviderCategory::OpenModel,
    },
    // ── Custom endpoint ──
    ProviderDescriptor {
        key: CUSTOM_PROVIDER,
        display_name: "Custom Endpoint",
        is_local: false,
        default_endpoint: "",
        default_model: "",
        wire_format: WireFormat::OpenAi,
        models_endpoint: None,
        category: ProviderCategory::Custom,
    },
];

// ─────────────────────────────────────────────
// Lookup
// ─────────────────────────────────────────────

/// Find a provider descriptor by exact key.
pub fn find_by_key(key: &str) -> Option<&'static ProviderDescriptor> {
    PROVIDERS.iter().find(|d| d.key == key)
}

/// All descriptors in one category, in UI order.
pub fn by_category(
    category: ProviderCategory,
) -> impl Iterator<Item = &'static ProviderDescriptor> {
    PROVIDERS.iter().filter(move |d| d.category == category)
}

/// Settings resolved against the registry: what a request will actually use.
#[derive(Clone, Debug)]
pub struct ResolvedProvider {
    pub descriptor: &'static ProviderDescriptor,
    /// `customEndpoint` if set, else the descriptor default.
    pub endpoint: String,
    /// `model` if set, else the descriptor default.
    pub model: String,
    /// The descriptor's format, or the user's `customFormat` for `custom`.
    pub wire_format: WireFormat,
}

impl ResolvedProvider {
    pub fn key(&self) -> &'static str {
        self.descriptor.key
    }

    pub fn is_local(&self) -> bool {
        self.descriptor.is_local
    }
}

/// Resolve settings to a descriptor plus effective endpoint, model and format.
///
/// Fails with `UnknownProvider` when the key is not in the registry.
pub fn resolve(settings: &ProviderSettings) -> Result<ResolvedProvider, ProofreadError> {
    let descriptor =
        find_by_key(settings.provider.trim()).ok_or_else(|| ProofreadError::UnknownProvider {
            provider: settings.provider.clone(),
        })?;

    let endpoint = non_empty(&settings.custom_endpoint)
        .unwrap_or(descriptor.default_endpoint)
        .to_string();
    let model = non_empty(&settings.model)
        .unwrap_or(descriptor.default_model)
        .to_string();

    let wire_format = match (descriptor.is_custom(), settings.custom_format.as_deref()) {
        (true, Some(name)) => WireFormat::from_name(name),
        _ => descriptor.wire_format,
    };

    Ok(ResolvedProvider {
        descriptor,
        endpoint,
        model,
        wire_format,
    })
}

fn non_empty(s: &str) -> Option<&str> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_providers_have_unique_keys() {
        let keys: Vec<&str> = PROVIDERS.iter().map(|d| d.key).collect();
        let mut unique = keys.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(keys.len(), unique.len(), "Duplicate provider keys found");
    }

    #[test]
    fn test_provider_count() {
        assert_eq!(PROVIDERS.len(), 21);
    }

    #[test]
    fn test_category_sizes() {
        assert_eq!(by_category(ProviderCategory::Local).count(), 5);
        assert_eq!(by_category(ProviderCategory::Commercial).count(), 8);
        assert_eq!(by_category(ProviderCategory::OpenModel).count(), 7);
        assert_eq!(by_category(ProviderCategory::Custom).count(), 1);
    }

    #[test]
    fn test_every_format_is_claimed() {
        for format in WireFormat::ALL {
            assert!(
                PROVIDERS.iter().any(|d| d.wire_format == format),
                "no provider speaks {format}"
            );
        }
    }

    #[test]
    fn test_locals_are_loopback_and_keyless() {
        for d in by_category(ProviderCategory::Local) {
            assert!(d.is_local, "{} should be local", d.key);
            assert!(!d.requires_api_key());
            assert!(
                d.default_endpoint.starts_with("http://127.0.0.1")
                    || d.default_endpoint.starts_with("http://localhost"),
                "{} endpoint is not loopback",
                d.key
            );
        }
    }

    #[test]
    fn test_remote_providers_are_https_with_defaults() {
        for d in PROVIDERS.iter().filter(|d| d.requires_api_key()) {
            assert!(d.default_endpoint.starts_with("https://"), "{}", d.key);
            assert!(!d.default_model.is_empty(), "{}", d.key);
            assert!(!d.display_name.is_empty(), "{}", d.key);
        }
    }

    #[test]
    fn test_custom_has_empty_defaults() {
        let d = find_by_key("custom").unwrap();
        assert!(d.default_endpoint.is_empty());
        assert!(d.default_model.is_empty());
        assert!(!d.requires_api_key());
        assert!(d.is_custom());
    }

    #[test]
    fn test_find_by_key() {
        let d = find_by_key("anthropic").unwrap();
        assert_eq!(d.display_name, "Anthropic Claude");
        assert_eq!(d.wire_format, WireFormat::Anthropic);
        assert!(find_by_key("does-not-exist").is_none());
        assert!(find_by_key("OpenAI").is_none());
    }

    #[test]
    fn test_wire_format_parse() {
        assert_eq!(WireFormat::parse("Anthropic"), Some(WireFormat::Anthropic));
        assert_eq!(WireFormat::parse("huggingface"), Some(WireFormat::HuggingFace));
        assert_eq!(WireFormat::parse("soap"), None);
        assert_eq!(WireFormat::from_name("soap"), WireFormat::OpenAi);
        for f in WireFormat::ALL {
            assert_eq!(WireFormat::parse(f.as_str()), Some(f));
        }
    }

    // ── resolve ──

    #[test]
    fn test_resolve_uses_defaults() {
        let r = resolve(&ProviderSettings::for_provider("mistral")).unwrap();
        assert_eq!(r.endpoint, "https://api.mistral.ai/v1/chat/completions");
        assert_eq!(r.model, "mistral-tiny");
        assert_eq!(r.wire_format, WireFormat::OpenAi);
    }

    #[test]
    fn test_resolve_prefers_overrides() {
        let settings = ProviderSettings {
            provider: "ollama".into(),
            model: "mistral".into(),
            custom_endpoint: "http://10.0.0.2:11434/api/generate".into(),
            ..Default::default()
        };
        let r = resolve(&settings).unwrap();
        assert_eq!(r.endpoint, "http://10.0.0.2:11434/api/generate");
        assert_eq!(r.model, "mistral");
        assert!(r.is_local());
    }

    #[test]
    fn test_resolve_unknown_provider() {
        let err = resolve(&ProviderSettings::for_provider("skynet")).unwrap_err();
        assert!(matches!(err, ProofreadError::UnknownProvider { ref provider } if provider == "skynet"));
    }

    #[test]
    fn test_custom_format_only_for_custom() {
        let mut settings = ProviderSettings::for_provider("custom");
        settings.custom_format = Some("anthropic".into());
        assert_eq!(resolve(&settings).unwrap().wire_format, WireFormat::Anthropic);

        settings.provider = "openai".into();
        assert_eq!(resolve(&settings).unwrap().wire_format, WireFormat::OpenAi);
    }

    #[test]
    fn test_custom_unknown_format_falls_back() {
        let mut settings = ProviderSettings::for_provider("custom");
        settings.custom_format = Some("grpc".into());
        assert_eq!(resolve(&settings).unwrap().wire_format, WireFormat::OpenAi);
    }
}
