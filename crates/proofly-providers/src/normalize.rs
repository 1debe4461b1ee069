//! Response normalizer — turns raw provider text into the corrected text.
//!
//! Models like to wrap their answer in chatter ("Here's the corrected text:",
//! "Hope this helps!"), quotes or markdown fences. [`normalize`] removes at
//! most one of each, in this order:
//!
//! 1. one leading wrapper clause
//! 2. one trailing closer (a run of closing lines counts as one)
//! 3. one fully enclosing quote pair and one enclosing code fence
//! 4. horizontal whitespace at the edges, then 3+ edge newlines down to 2
//!
//! Everything in between (bullets, numbering, indentation, blank lines) is
//! returned byte-for-byte. The rule lists are heuristics; content that
//! happens to start like a preamble will lose that first clause.
//!
//! Known limitations, since each pass strips only one layer:
//!
//! - nested enclosing quotes lose one pair per call, so `'""'` becomes `""`
//!   and a second call returns an empty string
//! - a closer hidden inside enclosing quotes, e.g.
//!   `'\n\n\nHope this helps\n\n\n'`, survives the first call and is
//!   removed by the second

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::trace;

/// Colon must end the line; following blank lines are consumed too.
const LINE_END: &str = r"[ \t]*(?:\r?\n(?:[ \t]*\r?\n)*|$)";
/// Text may follow on the same line.
const SAME_LINE_OK: &str = r"[ \t]*(?:\r?\n(?:[ \t]*\r?\n)*)?";

const ACK: &str = r"(?:sure|certainly|of course|absolutely|okay|ok)";

/// Leading wrapper rules, tried in order. The first match is removed.
static WRAPPERS: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        // "Here is the corrected text: ..." / "Sure, here's the improved version:"
        format!(
            r"(?i)^\s*(?:{ACK}\b[!,.]?\s*)?here(?:'s|’s|\s+is|\s+are)\s+(?:the\s+|your\s+|my\s+)?(?:corrected|improved|fixed|revised|proofread|edited|polished)\s+(?:text|version|sentence|paragraph)\b[^\n:]*:{SAME_LINE_OK}"
        ),
        // "Here is the fix:" alone on its line; same-line text is content
        format!(
            r"(?i)^\s*(?:{ACK}\b[!,.]?\s*)?here(?:'s|’s|\s+is|\s+are)\b[^\n]*?:{LINE_END}"
        ),
        // "Corrected text:" / "The revised version is:"
        format!(
            r"(?i)^\s*(?:the\s+)?(?:corrected|improved|fixed|revised|proofread|edited)\s+(?:text|version|sentence|paragraph)(?:\s+is)?[ \t]*:{SAME_LINE_OK}"
        ),
        // "Output:" / "OUTPUT (corrected text only):"
        format!(r"(?i)^\s*output(?:[ \t]*\([^)\n]*\))?[ \t]*:{SAME_LINE_OK}"),
        // "Here you go!" on its own line
        format!(r"(?i)^\s*here(?:\s+you\s+go|\s+it\s+is)[!.:]?{LINE_END}"),
        // "I'd be happy to help! Here is ...:"
        format!(
            r"(?i)^\s*(?:i(?:'d|’d|\s+would)\s+be\s+(?:happy|glad)\s+to\s+help|let\s+me\s+help|i\s+can\s+help)[^\n]*?:{LINE_END}"
        ),
        // A bare "Sure!" line
        format!(r"(?i)^\s*{ACK}[!.]?[ \t]*\r?\n(?:[ \t]*\r?\n)*"),
    ])
});

/// Trailing closer rules. Each must start on its own line and run to the end.
static CLOSERS: Lazy<Vec<Regex>> = Lazy::new(|| {
    let phrase = [
        r"(?:i\s+)?hope\s+(?:this|that|it)\s+helps",
        r"let\s+me\s+know\s+(?:if|whether)",
        r"feel\s+free\s+to",
        r"is\s+there\s+anything\s+else",
        r"(?:(?:all|the|your|these|this)\s+)?(?:text|code|formatting|items|steps|list|changes|corrections)\s+(?:looks?|is|are)\s+(?:good|great|perfect|correct|fine)\b",
    ]
    .join("|");
    compile(&[format!(r"(?i)(?:\s*\n[ \t]*(?:{phrase})[^\n]*)+\s*$")])
});

fn compile(patterns: &[String]) -> Vec<Regex> {
    patterns
        .iter()
        .filter_map(|p| match Regex::new(p) {
            Ok(re) => Some(re),
            Err(e) => {
                tracing::error!(error = %e, "invalid normalizer pattern");
                None
            }
        })
        .collect()
}

// ─────────────────────────────────────────────
// Entry points
// ─────────────────────────────────────────────

/// Normalize raw provider output into plain corrected text.
///
/// Blank input yields `""`. Deterministic and side-effect free.
pub fn normalize(raw: &str) -> String {
    if raw.trim().is_empty() {
        return String::new();
    }

    let mut text = strip_wrapper(raw);
    text = strip_closer(text);

    let (mut quoted, mut fenced) = (false, false);
    loop {
        if !quoted {
            if let Some(inner) = strip_enclosing_quotes(text) {
                trace!("removed enclosing quotes");
                text = inner;
                quoted = true;
                continue;
            }
        }
        if !fenced {
            if let Some(inner) = strip_fences(text) {
                trace!("removed code fences");
                text = inner;
                fenced = true;
                continue;
            }
        }
        break;
    }

    let tidied = tidy_edges(text);
    if tidied.trim().is_empty() {
        String::new()
    } else {
        tidied
    }
}

/// [`normalize`] for a possibly absent response.
pub fn normalize_opt(raw: Option<&str>) -> String {
    raw.map(normalize).unwrap_or_default()
}

// ─────────────────────────────────────────────
// Rules
// ─────────────────────────────────────────────

fn strip_wrapper(text: &str) -> &str {
    for (idx, re) in WRAPPERS.iter().enumerate() {
        if let Some(m) = re.find(text) {
            trace!(rule = idx, "removed leading wrapper");
            return &text[m.end()..];
        }
    }
    text
}

fn strip_closer(text: &str) -> &str {
    for re in CLOSERS.iter() {
        if let Some(m) = re.find(text) {
            trace!("removed trailing closer");
            return &text[..m.start()];
        }
    }
    text
}

/// Remove one quote pair that encloses the whole (trimmed) text.
///
/// The pair only counts when the inner text has no other quote of the same
/// kind; apostrophes inside words (`it's`) are allowed within `'…'`.
fn strip_enclosing_quotes(text: &str) -> Option<&str> {
    let t = text.trim();
    for q in ['"', '\''] {
        if t.len() >= 2 && t.starts_with(q) && t.ends_with(q) {
            let inner = &t[1..t.len() - 1];
            if encloses(inner, q) {
                return Some(inner);
            }
        }
    }
    None
}

fn encloses(inner: &str, quote: char) -> bool {
    if quote == '"' {
        return !inner.contains('"');
    }
    let chars: Vec<char> = inner.chars().collect();
    chars.iter().enumerate().all(|(i, &c)| {
        c != '\''
            || (i > 0
                && i + 1 < chars.len()
                && chars[i - 1].is_alphanumeric()
                && chars[i + 1].is_alphanumeric())
    })
}

/// Remove an opening ```` ```lang ```` line and a closing ```` ``` ```` line
/// when they bracket the whole text as a single block.
fn strip_fences(text: &str) -> Option<&str> {
    let t = text.trim();
    let rest = t.strip_prefix("```")?;
    let newline = rest.find('\n')?;
    let tag = rest[..newline].trim_end_matches(['\r', ' ', '\t']);
    if !tag
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '_' | '+' | '#' | '.' | '-'))
    {
        return None;
    }

    let body = &rest[newline + 1..];
    let body = body.strip_suffix("```")?;
    let body = body.trim_end_matches([' ', '\t']);
    let body = body.strip_suffix('\n')?;
    let body = body.strip_suffix('\r').unwrap_or(body);

    // Two blocks with prose between them are not one fenced answer.
    if body.lines().any(|l| l.trim_start().starts_with("```")) {
        return None;
    }
    Some(body)
}

const HORIZONTAL: [char; 2] = [' ', '\t'];

/// Trim spaces/tabs at both edges, then cap edge newlines at two.
///
/// Leading indentation of a multi-line text is kept since it is usually
/// code structure.
fn tidy_edges(text: &str) -> String {
    let mut t = text.trim_end_matches(HORIZONTAL);
    let first_line = t.split('\n').next().unwrap_or("");
    if first_line.trim().is_empty() || !t.contains('\n') {
        t = t.trim_start_matches(HORIZONTAL);
    }

    let leading = t.len() - t.trim_start_matches(['\r', '\n']).len();
    let t_lead = if count_newlines(&t[..leading]) >= 3 {
        format!("\n\n{}", &t[leading..])
    } else {
        t.to_string()
    };

    let body = t_lead.trim_end_matches(['\r', '\n']);
    let trailing = &t_lead[body.len()..];
    if count_newlines(trailing) >= 3 {
        format!("{body}\n\n")
    } else {
        t_lead
    }
}

fn count_newlines(s: &str) -> usize {
    s.chars().filter(|&c| c == '\n').count()
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
