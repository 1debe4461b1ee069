//! Proofly CLI — entry point.
//!
//! # Commands
//!
//! - `proofly proofread [TEXT]` — correct text (single-shot, or a REPL when omitted)
//! - `proofly suggest TEXT` — list suggested changes
//! - `proofly providers` — list supported providers
//! - `proofly status` — show the active configuration
//! - `proofly config show|set` — inspect or change provider settings
//! - `proofly test` — probe the configured provider
//! - `proofly bridge` — JSON-lines message surface over stdin/stdout

mod bridge;
mod config_cmd;
mod helpers;
mod providers_cmd;
mod repl;
mod status;
mod test_cmd;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use proofly_core::config::load_config;
use proofly_core::{JsonFileStore, ProofreadContext};
use proofly_service::Proofreader;

// ─────────────────────────────────────────────
// CLI definition
// ─────────────────────────────────────────────

/// 📝 Proofly — spelling and grammar correction through any LLM provider
#[derive(Parser)]
#[command(name = "proofly", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Correct text (single-shot, or interactive REPL when TEXT is omitted)
    Proofread {
        /// Text to correct, "-" for stdin or "@FILE". Omit for REPL mode.
        text: Option<String>,

        /// Full instruction to send instead of the built-in template
        #[arg(long)]
        prompt: Option<String>,

        /// Label for the instruction (e.g. "email"), used in logs
        #[arg(long, requires = "prompt")]
        context: Option<String>,

        /// Enable debug logging
        #[arg(long, default_value_t = false)]
        logs: bool,
    },

    /// Show suggested changes for a text
    Suggest {
        /// Text to analyze, "-" for stdin or "@FILE"
        text: String,

        /// Print suggestions as JSON
        #[arg(long, default_value_t = false)]
        json: bool,

        /// Enable debug logging
        #[arg(long, default_value_t = false)]
        logs: bool,
    },

    /// List supported providers
    Providers,

    /// Show configuration and provider status
    Status,

    /// Inspect or change provider settings
    Config {
        #[command(subcommand)]
        action: config_cmd::ConfigCommands,
    },

    /// Test connectivity to the configured provider
    Test {
        /// Print the raw report as JSON
        #[arg(long, default_value_t = false)]
        json: bool,

        /// Enable debug logging
        #[arg(long, default_value_t = false)]
        logs: bool,
    },

    /// Serve the JSON message surface over stdin/stdout (one object per line)
    Bridge {
        /// Enable debug logging (to stderr)
        #[arg(long, default_value_t = false)]
        logs: bool,
    },
}

impl Commands {
    /// Whether `--logs` was passed; commands without the flag log warnings only.
    fn verbose_logs(&self) -> bool {
        match self {
            Commands::Proofread { logs, .. }
            | Commands::Suggest { logs, .. }
            | Commands::Test { logs, .. }
            | Commands::Bridge { logs } => *logs,
            Commands::Providers | Commands::Status | Commands::Config { .. } => false,
        }
    }
}

// ─────────────────────────────────────────────
// Entrypoint
// ─────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.command.verbose_logs());

    match cli.command {
        Commands::Proofread {
            text,
            prompt,
            context,
            ..
        } => {
            let context = prompt.map(|prompt| ProofreadContext {
                prompt,
                kind: context,
            });
            run_proofread(text, context).await
        }
        Commands::Suggest { text, json, .. } => run_suggest(&text, json).await,
        Commands::Providers => providers_cmd::run().await,
        Commands::Status => status::run().await,
        Commands::Config { action } => config_cmd::dispatch(action).await,
        Commands::Test { json, .. } => test_cmd::run(&build_service(), json).await,
        Commands::Bridge { .. } => bridge::run(&build_service()).await,
    }
}

// ─────────────────────────────────────────────
// Proofread / suggest
// ─────────────────────────────────────────────

async fn run_proofread(text: Option<String>, context: Option<ProofreadContext>) -> Result<()> {
    let service = build_service();

    let Some(text) = text else {
        return repl::run(&service, context.as_ref()).await;
    };
    let text = helpers::resolve_text(&text)?;

    info!(chars = text.chars().count(), "proofreading single text");
    let corrected = match context {
        Some(ctx) => service.proofread_with_context(&text, &ctx).await,
        None => service.proofread(&text).await,
    }
    .map_err(|e| anyhow::anyhow!(e.user_message()))
    .context("proofreading failed")?;

    helpers::print_correction(&corrected);
    Ok(())
}

async fn run_suggest(text: &str, json: bool) -> Result<()> {
    let service = build_service();
    let text = helpers::resolve_text(text)?;

    let suggestions = service
        .get_suggestions(&text)
        .await
        .map_err(|e| anyhow::anyhow!(e.user_message()))
        .context("suggestion request failed")?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&suggestions).context("failed to encode suggestions")?
        );
    } else {
        helpers::print_suggestions(&suggestions);
    }
    Ok(())
}

/// Build the service from `~/.proofly/config.json` (plus env overrides).
pub fn build_service() -> Proofreader {
    let config = load_config(None);
    let store = Arc::new(JsonFileStore::default_path());
    Proofreader::from_config(&config, store)
}

/// Initialize tracing/logging. Output goes to stderr so stdout stays clean
/// for results and the bridge protocol.
fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("proofly=debug,info")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
