//! Message surface.
//!
//! UI layers talk to the service with JSON objects tagged by `action`. Every
//! request gets exactly one response; failures are reported in-band as
//! `{success: false, error}` rather than as transport errors.

use proofly_core::{
    ConnectivityReport, ProofreadContext, ProviderSettings, SettingsPatch, Suggestion,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::proofreader::Proofreader;

/// Error text for anything that is not a well-formed known action.
pub const UNKNOWN_ACTION: &str = "Unknown action";

/// A request from a UI layer.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum ClientRequest {
    Proofread {
        text: String,
    },
    ProofreadWithContext {
        text: String,
        context: ProofreadContext,
    },
    GetSuggestions {
        text: String,
    },
    GetSuggestionsWithContext {
        text: String,
        context: ProofreadContext,
    },
    GetSettings,
    SaveSettings {
        #[serde(default)]
        settings: SettingsPatch,
    },
    TestConnection,
}

impl ClientRequest {
    fn action(&self) -> &'static str {
        match self {
            Self::Proofread { .. } => "proofread",
            Self::ProofreadWithContext { .. } => "proofreadWithContext",
            Self::GetSuggestions { .. } => "getSuggestions",
            Self::GetSuggestionsWithContext { .. } => "getSuggestionsWithContext",
            Self::GetSettings => "getSettings",
            Self::SaveSettings { .. } => "saveSettings",
            Self::TestConnection => "testConnection",
        }
    }
}

/// The reply to a [`ClientRequest`].
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ClientResponse {
    Corrected {
        success: bool,
        #[serde(rename = "correctedText")]
        corrected_text: String,
    },
    Suggestions {
        success: bool,
        suggestions: Vec<Suggestion>,
    },
    Settings {
        settings: ProviderSettings,
    },
    Saved {
        success: bool,
    },
    Report(ConnectivityReport),
    Error {
        success: bool,
        error: String,
    },
}

impl ClientResponse {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            success: false,
            error: message.into(),
        }
    }

    pub fn unknown_action() -> Self {
        Self::error(UNKNOWN_ACTION)
    }
}

/// Run one request against the service.
pub async fn handle(service: &Proofreader, request: ClientRequest) -> ClientResponse {
    let action = request.action();
    debug!(action, "Handling client request");

    let response = match request {
        ClientRequest::Proofread { text } => match service.proofread(&text).await {
            Ok(corrected_text) => ClientResponse::Corrected {
                success: true,
                corrected_text,
            },
            Err(e) => ClientResponse::error(e.user_message()),
        },
        ClientRequest::ProofreadWithContext { text, context } => {
            match service.proofread_with_context(&text, &context).await {
                Ok(corrected_text) => ClientResponse::Corrected {
                    success: true,
                    corrected_text,
                },
                Err(e) => ClientResponse::error(e.user_message()),
            }
        }
        ClientRequest::GetSuggestions { text } => match service.get_suggestions(&text).await {
            Ok(suggestions) => ClientResponse::Suggestions {
                success: true,
                suggestions,
            },
            Err(e) => ClientResponse::error(e.user_message()),
        },
        ClientRequest::GetSuggestionsWithContext { text, context } => {
            match service.get_suggestions_with_context(&text, &context).await {
                Ok(suggestions) => ClientResponse::Suggestions {
                    success: true,
                    suggestions,
                },
                Err(e) => ClientResponse::error(e.user_message()),
            }
        }
        ClientRequest::GetSettings => match service.get_settings().await {
            Ok(settings) => ClientResponse::Settings { settings },
            Err(e) => ClientResponse::error(e.user_message()),
        },
        ClientRequest::SaveSettings { settings } => match service.save_settings(&settings).await {
            Ok(_) => ClientResponse::Saved { success: true },
            Err(e) => ClientResponse::error(e.user_message()),
        },
        ClientRequest::TestConnection => ClientResponse::Report(service.test_connection().await),
    };

    if let ClientResponse::Error { ref error, .. } = response {
        warn!(action, "Request failed: {error}");
    }
    response
}

/// Decode a raw JSON request and run it. Malformed requests and unknown
/// actions both get [`UNKNOWN_ACTION`].
pub async fn handle_value(service: &Proofreader, raw: Value) -> ClientResponse {
    match serde_json::from_value::<ClientRequest>(raw) {
        Ok(request) => handle(service, request).await,
        Err(e) => {
            debug!("Rejected client request: {e}");
            ClientResponse::unknown_action()
        }
    }
}

/// One JSON line in, one JSON line out.
pub async fn handle_line(service: &Proofreader, line: &str) -> String {
    let response = match serde_json::from_str::<Value>(line) {
        Ok(raw) => handle_value(service, raw).await,
        Err(e) => {
            debug!("Client line is not JSON: {e}");
            ClientResponse::unknown_action()
        }
    };
    serde_json::to_string(&response).unwrap_or_else(|e| {
        warn!("Failed to serialize response: {e}");
        format!(r#"{{"success":false,"error":"{UNKNOWN_ACTION}"}}"#)
    })
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
