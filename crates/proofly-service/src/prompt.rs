//! Prompt templates.
//!
//! The dispatcher sends whatever these return verbatim, so the wording here is
//! the whole instruction the model sees.

use once_cell::sync::Lazy;
use regex::Regex;

/// Instruction for a plain correction.
pub fn correction_prompt(text: &str) -> String {
    format!(
        "INSTRUCTION: Correct spelling and grammar errors in the text below. Output ONLY the corrected text. Do NOT include any introductory phrases, explanations, or conversational text.\n\
         \n\
         INPUT TEXT:\n\
         \"{text}\"\n\
         \n\
         OUTPUT (corrected text only):"
    )
}

/// Instruction asking for a JSON array of suggestions.
pub fn suggestions_prompt(text: &str) -> String {
    format!(
        "Analyze the following text and provide specific spelling and grammar corrections. Return a JSON array of suggestions with the format: [{{\"original\": \"mistake\", \"corrected\": \"correction\", \"type\": \"spelling|grammar\", \"explanation\": \"brief explanation\"}}].\n\
         \n\
         Text to analyze:\n\
         \"{text}\"\n\
         \n\
         Suggestions:"
    )
}

static RETURN_ONLY: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"(?i)Return only the corrected text.*?:").ok());
static CORRECTED_CUE: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"(?i)Corrected.*?:").ok());

/// Turn a context correction prompt into a suggestions prompt by swapping its
/// output cues.
pub fn suggestion_prompt_from_context(prompt: &str) -> String {
    let mut out = prompt.to_string();
    if let Some(re) = RETURN_ONLY.as_ref() {
        out = re
            .replace_all(&out, "Provide specific suggestions for improvement:")
            .into_owned();
    }
    if let Some(re) = CORRECTED_CUE.as_ref() {
        out = re.replace_all(&out, "Suggestions:").into_owned();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_correction_prompt_quotes_text() {
        let p = correction_prompt("teh cat");
        assert!(p.starts_with("INSTRUCTION: Correct spelling and grammar errors"));
        assert!(p.contains("INPUT TEXT:\n\"teh cat\"\n\nOUTPUT (corrected text only):"));
        assert!(p.ends_with("OUTPUT (corrected text only):"));
    }

    #[test]
    fn test_suggestions_prompt_requests_json() {
        let p = suggestions_prompt("teh cat");
        assert!(p.contains(r#"[{"original": "mistake""#));
        assert!(p.contains("Text to analyze:\n\"teh cat\""));
        assert!(p.ends_with("Suggestions:"));
    }

    #[test]
    fn test_context_prompt_rewrite() {
        let prompt = "Fix this email. Return only the corrected text, nothing else:\n\"hi\"\nCorrected email:";
        let out = suggestion_prompt_from_context(prompt);
        assert!(out.contains("Provide specific suggestions for improvement:"));
        assert!(out.ends_with("Suggestions:"));
        assert!(!out.to_lowercase().contains("return only"));
    }

    #[test]
    fn test_context_prompt_without_cues_unchanged() {
        let prompt = "Polish this tweet: hello";
        assert_eq!(suggestion_prompt_from_context(prompt), prompt);
    }
}
