//! Suggestion parsing.
//!
//! Models are asked for a JSON array but often answer with prose. The reply is
//! parsed as JSON first (the whole text, then the outermost `[...]`), then by
//! a line heuristic.

use proofly_core::utils::truncate_string;
use proofly_core::Suggestion;
use proofly_providers::normalize;
use serde_json::Value;
use tracing::debug;

/// Most suggestions returned for one request.
pub const MAX_SUGGESTIONS: usize = 5;

/// Parse a model reply into at most [`MAX_SUGGESTIONS`] suggestions.
pub fn parse_suggestions(response: &str, original: &str) -> Vec<Suggestion> {
    let cleaned = normalize(response);
    if cleaned.is_empty() {
        return Vec::new();
    }

    let mut suggestions = match parse_json(&cleaned) {
        Some(parsed) => {
            debug!(count = parsed.len(), "parsed JSON suggestions");
            parsed
        }
        None => {
            let parsed = parse_lines(&cleaned, original);
            debug!(count = parsed.len(), "parsed suggestions by line heuristic");
            parsed
        }
    };
    suggestions.truncate(MAX_SUGGESTIONS);
    suggestions
}

fn parse_json(text: &str) -> Option<Vec<Suggestion>> {
    if let Some(list) = suggestions_from_str(text) {
        return Some(list);
    }
    let start = text.find('[')?;
    let end = text.rfind(']')?;
    (start < end)
        .then(|| suggestions_from_str(&text[start..=end]))
        .flatten()
}

fn suggestions_from_str(text: &str) -> Option<Vec<Suggestion>> {
    match serde_json::from_str::<Value>(text).ok()? {
        Value::Array(items) => Some(
            items
                .into_iter()
                .filter_map(|item| serde_json::from_value::<Suggestion>(item).ok())
                .filter(|s| !s.original.is_empty() || !s.corrected.is_empty())
                .collect(),
        ),
        _ => None,
    }
}

fn parse_lines(text: &str, original: &str) -> Vec<Suggestion> {
    let mut out = Vec::new();

    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if line.contains('→') || line.contains("->") {
            let parts: Vec<&str> = line
                .split(['→'])
                .flat_map(|p| p.split("->"))
                .map(str::trim)
                .collect();
            if let [from, to] = parts.as_slice() {
                out.push(Suggestion {
                    kind: "Correction".into(),
                    original: strip_quotes(from),
                    corrected: strip_quotes(to),
                    explanation: format!(
                        "Context-aware improvement for {}",
                        truncate_string(original, 23)
                    ),
                });
            }
        } else {
            let lower = line.to_lowercase();
            if lower.contains("suggest") || lower.contains("improve") {
                out.push(Suggestion {
                    kind: "Suggestion".into(),
                    original: truncate_string(original, 53),
                    corrected: line.to_string(),
                    explanation: "General improvement suggestion".into(),
                });
            }
        }
    }

    if out.is_empty() {
        out.push(Suggestion {
            kind: "General".into(),
            original: original.to_string(),
            corrected: text.trim().to_string(),
            explanation: "AI-generated improvement".into(),
        });
    }
    out
}

fn strip_quotes(s: &str) -> String {
    s.chars().filter(|c| *c != '"' && *c != '\'').collect()
}
