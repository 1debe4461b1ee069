//! `proofly config` — inspect or change the stored provider settings.

use anyhow::{bail, Context, Result};
use clap::Subcommand;
use colored::Colorize;

use proofly_core::config::get_config_path;
use proofly_core::store::{load_settings, save_settings};
use proofly_core::utils::mask_secret;
use proofly_core::{ConfigStore, JsonFileStore, ProviderSettings, SettingsPatch};
use proofly_providers::{find_by_key, WireFormat};

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the stored provider settings
    Show,

    /// Change provider settings (only the given fields are updated)
    Set {
        /// Provider key (see `proofly providers`)
        #[arg(long)]
        provider: Option<String>,

        /// Model name; empty string resets to the provider default
        #[arg(long)]
        model: Option<String>,

        /// API key; empty string clears it
        #[arg(long)]
        api_key: Option<String>,

        /// Endpoint override; empty string resets to the provider default
        #[arg(long)]
        endpoint: Option<String>,

        /// Wire format for the `custom` provider
        #[arg(long)]
        format: Option<String>,
    },
}

pub async fn dispatch(action: ConfigCommands) -> Result<()> {
    // Writes go to what is on disk, not to env-overridden values.
    let store = JsonFileStore::new(get_config_path()).without_env_overrides();

    match action {
        ConfigCommands::Show => {
            let settings = load_settings(&store).await?;
            print_settings(&settings);
            Ok(())
        }
        ConfigCommands::Set {
            provider,
            model,
            api_key,
            endpoint,
            format,
        } => {
            let patch = SettingsPatch {
                provider,
                model,
                api_key,
                custom_endpoint: endpoint,
                custom_format: format,
            };
            let saved = apply_patch(&store, &patch).await?;
            println!(
                "  {} saved to {}",
                "✓".green(),
                store.path().display()
            );
            print_settings(&saved);
            Ok(())
        }
    }
}

/// Validate and persist a settings patch.
async fn apply_patch(store: &dyn ConfigStore, patch: &SettingsPatch) -> Result<ProviderSettings> {
    if patch.is_empty() {
        bail!("nothing to change: pass at least one of --provider, --model, --api-key, --endpoint, --format");
    }
    if let Some(ref key) = patch.provider {
        if find_by_key(key.trim()).is_none() {
            bail!("unknown provider '{key}' (run `proofly providers` for the list)");
        }
    }
    if let Some(ref format) = patch.custom_format {
        if !format.is_empty() && WireFormat::parse(format).is_none() {
            let known: Vec<&str> = WireFormat::ALL.iter().map(|f| f.as_str()).collect();
            bail!("unknown wire format '{format}' (expected one of: {})", known.join(", "));
        }
    }

    save_settings(store, patch)
        .await
        .context("failed to save settings")
}

fn print_settings(settings: &ProviderSettings) {
    println!();
    println!("  {:<18} {}", "Provider:".bold(), settings.provider);
    println!("  {:<18} {}", "Model:".bold(), or_default(&settings.model));
    println!("  {:<18} {}", "API key:".bold(), mask_secret(&settings.api_key));
    println!(
        "  {:<18} {}",
        "Endpoint:".bold(),
        or_default(&settings.custom_endpoint)
    );
    if let Some(ref format) = settings.custom_format {
        println!("  {:<18} {}", "Format:".bold(), format);
    }
    println!();
}

fn or_default(value: &str) -> String {
    if value.is_empty() {
        "(provider default)".dimmed().to_string()
    } else {
        value.to_string()
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
