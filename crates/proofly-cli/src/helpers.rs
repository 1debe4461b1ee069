//! Shared CLI helpers — input resolution, result printing, banners.

use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use colored::Colorize;

use proofly_core::Suggestion;

/// `"-"` reads the text from stdin, `"@path"` reads it from a file; anything
/// else is the text itself.
pub fn resolve_text(arg: &str) -> Result<String> {
    if arg == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read text from stdin")?;
        return Ok(buf);
    }
    if let Some(path) = arg.strip_prefix('@') {
        let path = expand_tilde(path);
        return std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()));
    }
    Ok(arg.to_string())
}

/// Expand `~` at the start of a path to the user's home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs_next::home_dir() {
            return home.join(rest);
        }
    }
    if path == "~" {
        if let Some(home) = dirs_next::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

/// Print corrected text to stdout.
pub fn print_correction(text: &str) {
    if text.is_empty() {
        println!("{}", "(empty response)".dimmed());
    } else {
        println!("{text}");
    }
}

/// Print suggestions as a numbered list.
pub fn print_suggestions(suggestions: &[Suggestion]) {
    if suggestions.is_empty() {
        println!("{}", "No suggestions.".green());
        return;
    }
    for (i, s) in suggestions.iter().enumerate() {
        println!(
            "{:>2}. {} {} {}  {}",
            i + 1,
            s.original.red(),
            "→".dimmed(),
            s.corrected.green(),
            format!("[{}]", display_kind(s)).dimmed()
        );
        if !s.explanation.is_empty() {
            println!("    {}", s.explanation.dimmed());
        }
    }
}

fn display_kind(s: &Suggestion) -> &str {
    if s.kind.is_empty() {
        "general"
    } else {
        &s.kind
    }
}

/// Print the banner shown at REPL start.
pub fn print_banner(provider: &str, model: &str) {
    let version = env!("CARGO_PKG_VERSION");
    println!();
    println!("{}  v{}", "📝 Proofly".cyan().bold(), version.dimmed());
    println!("{}", format!("Provider: {provider} · model: {model}").dimmed());
    println!(
        "{}",
        "Type or paste text to correct, or \"exit\" to quit.".dimmed()
    );
    println!();
}

/// Print a "working" placeholder (for non-log mode).
pub fn print_thinking() {
    eprint!("{}", "⠿ correcting...".dimmed());
}

/// Clear the "working" placeholder.
pub fn clear_thinking() {
    eprint!("\r{}\r", " ".repeat(40));
}

/// `✓` in green or `✗` in red.
pub fn check_mark(ok: bool) -> String {
    if ok {
        "✓".green().to_string()
    } else {
        "✗".red().to_string()
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
