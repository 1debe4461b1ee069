//! Interactive proofreading REPL.
//!
//! Uses `rustyline` for readline-style editing with persistent history.

use anyhow::Result;
use rustyline::config::Configurer;
use rustyline::history::DefaultHistory;
use rustyline::{DefaultEditor, Editor};
use tracing::debug;

use proofly_core::ProofreadContext;
use proofly_service::Proofreader;

use crate::helpers;

/// Exit commands (case-insensitive match).
const EXIT_COMMANDS: &[&str] = &["exit", "quit", "/exit", "/quit", ":q"];

/// Run the interactive REPL loop.
pub async fn run(service: &Proofreader, context: Option<&ProofreadContext>) -> Result<()> {
    let settings = service.get_settings().await.unwrap_or_default();
    helpers::print_banner(&settings.provider, &settings.model);

    let mut editor = create_editor()?;

    loop {
        let input = match editor.readline("Text: ") {
            Ok(line) => line,
            Err(rustyline::error::ReadlineError::Interrupted) => break,
            Err(rustyline::error::ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("Input error: {e}");
                break;
            }
        };

        let trimmed = input.trim();
        if trimmed.is_empty() {
            continue;
        }

        if is_exit_command(trimmed) {
            println!("\nGoodbye! 👋");
            break;
        }

        let _ = editor.add_history_entry(&input);

        debug!(chars = trimmed.chars().count(), "proofreading input");
        helpers::print_thinking();

        let result = match context {
            Some(ctx) => {
                // The instruction embeds the text, so each line gets its own copy.
                let ctx = ProofreadContext {
                    prompt: format!("{}\n\n{}", ctx.prompt, trimmed),
                    kind: ctx.kind.clone(),
                };
                service.proofread_with_context(trimmed, &ctx).await
            }
            None => service.proofread(trimmed).await,
        };

        helpers::clear_thinking();
        match result {
            Ok(corrected) => {
                helpers::print_correction(&corrected);
                println!();
            }
            Err(e) => eprintln!("\n❌ {}\n", e.user_message()),
        }
    }

    save_history(&mut editor);

    Ok(())
}

/// Create a rustyline editor with history.
fn create_editor() -> Result<Editor<(), DefaultHistory>> {
    let mut editor = DefaultEditor::new()?;
    editor.set_max_history_size(1000)?;

    let history_path = history_path();
    if history_path.exists() {
        let _ = editor.load_history(&history_path);
        debug!("loaded REPL history from {}", history_path.display());
    }

    Ok(editor)
}

/// Save history to disk.
fn save_history(editor: &mut Editor<(), DefaultHistory>) {
    let path = history_path();
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    if let Err(e) = editor.save_history(&path) {
        debug!("failed to save history: {e}");
    }
}

/// Path to the history file.
fn history_path() -> std::path::PathBuf {
    proofly_core::utils::get_data_path()
        .join("history")
        .join("cli_history")
}

/// Check if input is an exit command.
fn is_exit_command(input: &str) -> bool {
    let lower = input.to_lowercase();
    EXIT_COMMANDS.contains(&lower.as_str())
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_commands() {
        assert!(is_exit_command("exit"));
        assert!(is_exit_command("QUIT"));
        assert!(is_exit_command(":q"));
        assert!(!is_exit_command("teh cat"));
        assert!(!is_exit_command(""));
    }

    #[test]
    fn history_path_under_data_dir() {
        let path = history_path();
        assert!(path.to_string_lossy().contains(".proofly"));
        assert!(path.to_string_lossy().contains("history"));
    }
}
