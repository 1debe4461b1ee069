//! Shared request, result and report types.

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

use crate::config::ProviderSettings;
use crate::error::{ErrorKind, ProofreadError};

/// Longest user text accepted by default for one correction.
pub const MAX_TEXT_CHARS: usize = 10_000;

// ─────────────────────────────────────────────
// Correction request / result
// ─────────────────────────────────────────────

/// One correction call: the instruction payload plus the active settings.
///
/// `text` is sent verbatim as the provider's prompt/content field; templating
/// the user's text into an instruction happens before this point.
#[derive(Clone, Debug)]
pub struct CorrectionRequest {
    pub text: String,
    pub settings: ProviderSettings,
}

impl CorrectionRequest {
    pub fn new(text: impl Into<String>, settings: ProviderSettings) -> Self {
        Self {
            text: text.into(),
            settings,
        }
    }
}

/// Reject blank input and input longer than `max_chars` characters.
pub fn validate_text(text: &str, max_chars: usize) -> Result<(), ProofreadError> {
    if text.trim().is_empty() {
        return Err(ProofreadError::InvalidRequest("text is empty".into()));
    }
    let len = text.chars().count();
    if len > max_chars {
        return Err(ProofreadError::InvalidRequest(format!(
            "text is {len} characters long; the limit is {max_chars}"
        )));
    }
    Ok(())
}

/// Outcome of a correction: corrected text or a classified failure.
#[derive(Clone, Debug, PartialEq)]
pub enum CorrectionResult {
    Corrected { text: String },
    Failed { error_kind: ErrorKind, message: String },
}

impl CorrectionResult {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Corrected { .. })
    }
}

impl From<Result<String, ProofreadError>> for CorrectionResult {
    fn from(result: Result<String, ProofreadError>) -> Self {
        match result {
            Ok(text) => Self::Corrected { text },
            Err(e) => Self::Failed {
                error_kind: e.kind(),
                message: e.user_message(),
            },
        }
    }
}

/// Serialized as `{ok: true, text}` or `{ok: false, errorKind, message}`.
impl Serialize for CorrectionResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Corrected { text } => {
                let mut st = serializer.serialize_struct("CorrectionResult", 2)?;
                st.serialize_field("ok", &true)?;
                st.serialize_field("text", text)?;
                st.end()
            }
            Self::Failed {
                error_kind,
                message,
            } => {
                let mut st = serializer.serialize_struct("CorrectionResult", 3)?;
                st.serialize_field("ok", &false)?;
                st.serialize_field("errorKind", error_kind)?;
                st.serialize_field("message", message)?;
                st.end()
            }
        }
    }
}

// ─────────────────────────────────────────────
// Context & suggestions
// ─────────────────────────────────────────────

/// A site-specific instruction chosen by the UI layer.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofreadContext {
    /// Fully built instruction, passed through verbatim.
    pub prompt: String,
    /// Optional label (e.g. `"email"`), used only for logging.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

/// A single proposed change.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Suggestion {
    #[serde(rename = "type")]
    pub kind: String,
    pub original: String,
    pub corrected: String,
    pub explanation: String,
}

// ─────────────────────────────────────────────
// Connectivity report
// ─────────────────────────────────────────────

/// Outcome of the optional trial generation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InferenceTest {
    Passed,
    Failed,
    Timeout,
}

/// Structured details gathered while probing.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectivityDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_models: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub configured_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inference_test: Option<InferenceTest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

/// Result of `testConnection`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectivityReport {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    pub checked_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<ConnectivityDetails>,
}

impl ConnectivityReport {
    /// A passing report.
    pub fn success(info: impl Into<String>) -> Self {
        Self {
            ok: true,
            info: Some(info.into()),
            checked_at: crate::utils::timestamp(),
            ..Default::default()
        }
    }

    /// A failing report.
    pub fn failure(error: impl Into<String>, kind: ErrorKind) -> Self {
        Self {
            ok: false,
            error: Some(error.into()),
            error_kind: Some(kind),
            checked_at: crate::utils::timestamp(),
            ..Default::default()
        }
    }

    /// A failing report built from a typed error, carrying its suggestion.
    pub fn from_error(err: &ProofreadError) -> Self {
        let mut report = Self::failure(err.to_string(), err.kind());
        report.suggestion = err.suggestion();
        report
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warning = Some(warning.into());
        self
    }

    pub fn with_details(mut self, details: ConnectivityDetails) -> Self {
        self.details = Some(details);
        self
    }

    /// Whether the failure was a timeout (drives "still loading" guidance).
    pub fn timed_out(&self) -> bool {
        self.error_kind == Some(ErrorKind::Timeout)
            || self
                .details
                .as_ref()
                .and_then(|d| d.inference_test)
                .is_some_and(|t| t == InferenceTest::Timeout)
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_text_limits() {
        assert!(validate_text("hello", 10).is_ok());
        assert!(validate_text("   \n", 10).is_err());
        let long = "a".repeat(11);
        let err = validate_text(&long, 10).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
        assert!(err.to_string().contains("11"));
    }

    #[test]
    fn test_validate_counts_chars_not_bytes() {
        let text = "é".repeat(10);
        assert!(validate_text(&text, 10).is_ok());
    }

    #[test]
    fn test_correction_result_shapes() {
        let ok = CorrectionResult::from(Ok("Fixed.".to_string()));
        let raw = serde_json::to_value(&ok).unwrap();
        assert_eq!(raw, serde_json::json!({"ok": true, "text": "Fixed."}));

        let failed = CorrectionResult::from(Err(ProofreadError::UnknownProvider {
            provider: "nope".into(),
        }));
        assert!(!failed.is_ok());
        let raw = serde_json::to_value(&failed).unwrap();
        assert_eq!(raw["ok"], false);
        assert_eq!(raw["errorKind"], "unknownProvider");
        assert!(raw.get("text").is_none());
        assert!(raw["message"].as_str().unwrap().contains("nope"));
    }

    #[test]
    fn test_suggestion_uses_type_key() {
        let s: Suggestion = serde_json::from_str(
            r#"{"original":"teh","corrected":"the","type":"spelling","explanation":"typo"}"#,
        )
        .unwrap();
        assert_eq!(s.kind, "spelling");
        let raw = serde_json::to_value(&s).unwrap();
        assert_eq!(raw["type"], "spelling");
    }

    #[test]
    fn test_suggestion_missing_fields_default() {
        let s: Suggestion = serde_json::from_str(r#"{"original":"x"}"#).unwrap();
        assert_eq!(s.original, "x");
        assert!(s.corrected.is_empty());
    }

    #[test]
    fn test_report_serialization_omits_empty() {
        let report = ConnectivityReport::success("ok").with_details(ConnectivityDetails {
            resolved_model: Some("llama2:7b".into()),
            inference_test: Some(InferenceTest::Passed),
            ..Default::default()
        });
        let raw = serde_json::to_value(&report).unwrap();
        assert_eq!(raw["ok"], true);
        assert!(raw.get("error").is_none());
        assert_eq!(raw["details"]["resolvedModel"], "llama2:7b");
        assert_eq!(raw["details"]["inferenceTest"], "passed");
    }

    #[test]
    fn test_report_from_error_is_timeout_aware() {
        let err = ProofreadError::Timeout {
            provider: "ollama".into(),
            endpoint: "http://127.0.0.1:11434/api/version".into(),
            local: true,
            timeout_secs: 5,
        };
        let report = ConnectivityReport::from_error(&err);
        assert!(!report.ok);
        assert!(report.timed_out());
        assert!(report.suggestion.is_some());
    }
}
