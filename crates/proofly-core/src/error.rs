//! Error taxonomy for every proofreading path.
//!
//! Each variant carries the provider key, model or endpoint involved so the
//! UI layer can render a specific message. User text never appears here.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Coarse error classification, serialized into results and reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    UnknownProvider,
    MissingCredentials,
    ProviderHttp,
    Network,
    Timeout,
    InvalidResponseShape,
    InvalidRequest,
    Store,
    /// Reported by the connectivity prober when the configured model is not installed.
    ModelNotFound,
}

/// Every failure the dispatcher, prober or store can surface.
#[derive(Clone, Debug, Error)]
pub enum ProofreadError {
    /// The configured provider key has no registry entry.
    #[error("unknown provider '{provider}'")]
    UnknownProvider { provider: String },

    /// A remote provider needs an API key and none is configured.
    #[error("API key required for {display_name}")]
    MissingCredentials {
        provider: String,
        display_name: String,
    },

    /// The provider answered with a non-2xx status. `body` is kept verbatim.
    #[error("{provider} request failed with HTTP {status}: {body}")]
    ProviderHttp {
        provider: String,
        model: String,
        status: u16,
        body: String,
    },

    /// Connection refused, DNS failure, TLS failure and the like.
    #[error("cannot reach {provider} at {endpoint}: {message}")]
    Network {
        provider: String,
        endpoint: String,
        local: bool,
        message: String,
    },

    /// The request exceeded its timeout.
    #[error("{provider} did not answer within {timeout_secs}s ({endpoint})")]
    Timeout {
        provider: String,
        endpoint: String,
        local: bool,
        timeout_secs: u64,
    },

    /// The body parsed but lacked the field the wire format promises.
    #[error(
        "{provider} returned an unexpected response: expected `{expected}`, found keys [{}]",
        .keys.join(", ")
    )]
    InvalidResponseShape {
        provider: String,
        expected: &'static str,
        keys: Vec<String>,
    },

    /// The request was rejected before anything was sent.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The configuration store failed to read or write.
    #[error("configuration store error: {0}")]
    Store(String),
}

impl ProofreadError {
    /// The coarse kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownProvider { .. } => ErrorKind::UnknownProvider,
            Self::MissingCredentials { .. } => ErrorKind::MissingCredentials,
            Self::ProviderHttp { .. } => ErrorKind::ProviderHttp,
            Self::Network { .. } => ErrorKind::Network,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::InvalidResponseShape { .. } => ErrorKind::InvalidResponseShape,
            Self::InvalidRequest(_) => ErrorKind::InvalidRequest,
            Self::Store(_) => ErrorKind::Store,
        }
    }

    /// Whether a manual retry has a reasonable chance of succeeding.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ProviderHttp { status, .. } => *status >= 500 || *status == 429,
            Self::Network { .. } | Self::Timeout { .. } => true,
            _ => false,
        }
    }

    /// Actionable remediation text, when there is something the user can do.
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::UnknownProvider { .. } => {
                Some("Choose one of the supported providers in the settings.".into())
            }
            Self::MissingCredentials { display_name, .. } => {
                Some(format!("Add an API key for {display_name} in the settings."))
            }
            Self::ProviderHttp { status, model, .. } => match status {
                401 | 403 => Some(format!(
                    "Check that the API key is valid and has access to model '{model}'."
                )),
                404 => Some(format!(
                    "Check the endpoint URL and that model '{model}' exists (for Ollama: ollama pull {model})."
                )),
                429 => Some("The provider is rate limiting requests; wait and try again.".into()),
                s if *s >= 500 => {
                    Some("The provider had a server error; try again in a moment.".into())
                }
                _ => None,
            },
            Self::Network {
                local: true,
                endpoint,
                ..
            } => Some(format!(
                "Make sure the local server is running (for Ollama: ollama serve) and listening at {endpoint}."
            )),
            Self::Network { local: false, .. } => {
                Some("Check your internet connection and the endpoint URL.".into())
            }
            Self::Timeout { local: true, .. } => Some(
                "The model may be loading for the first time; wait a moment and try again.".into(),
            ),
            Self::Timeout { local: false, .. } => {
                Some("The provider is slow to respond; try again shortly.".into())
            }
            Self::InvalidResponseShape { .. } => Some(
                "The provider API may have changed; check the endpoint and the provider type.".into(),
            ),
            Self::InvalidRequest(_) | Self::Store(_) => None,
        }
    }

    /// The readable string handed to the UI layer.
    pub fn user_message(&self) -> String {
        match self.suggestion() {
            Some(hint) => format!("{self}\n{hint}"),
            None => self.to_string(),
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
