//! `proofly status` — show configuration and the resolved provider.

use anyhow::Result;
use colored::Colorize;

use proofly_core::config::{get_config_path, load_config};
use proofly_core::store::load_settings;
use proofly_core::utils::mask_secret;
use proofly_core::JsonFileStore;
use proofly_providers::resolve;

/// Run the status command.
pub async fn run() -> Result<()> {
    let config = load_config(None);
    let config_path = get_config_path();
    let settings = load_settings(&JsonFileStore::default_path()).await?;

    println!();
    println!("{}", "📝 Proofly Status".cyan().bold());
    println!();

    let config_exists = config_path.exists();
    println!(
        "  {:<18} {} {}",
        "Config:".bold(),
        config_path.display(),
        if config_exists {
            "✓".green().to_string()
        } else {
            "(not found, using defaults)".yellow().to_string()
        }
    );

    match resolve(&settings) {
        Ok(resolved) => {
            println!(
                "  {:<18} {} ({})",
                "Provider:".bold(),
                resolved.descriptor.display_name,
                resolved.key().dimmed()
            );
            println!("  {:<18} {}", "Model:".bold(), display_or_dash(&resolved.model));
            println!(
                "  {:<18} {}",
                "Endpoint:".bold(),
                display_or_dash(&resolved.endpoint)
            );
            println!("  {:<18} {}", "Wire format:".bold(), resolved.wire_format);

            let key_status = if settings.has_api_key() {
                format!("{} {}", "✓".green(), mask_secret(&settings.api_key).dimmed())
            } else if resolved.descriptor.requires_api_key() {
                format!("{}", "✗ missing (required)".red())
            } else {
                format!("{}", "· not needed".dimmed())
            };
            println!("  {:<18} {}", "API key:".bold(), key_status);
        }
        Err(e) => {
            println!("  {:<18} {}", "Provider:".bold(), e.to_string().red());
        }
    }

    println!();
    println!(
        "  {:<18} {}",
        "Timeouts:".bold(),
        format!(
            "request {}s · health {}s · models {}s · inference {}s",
            config.timeouts.request_secs,
            config.timeouts.health_secs,
            config.timeouts.models_secs,
            config.timeouts.inference_secs
        )
        .dimmed()
    );
    println!(
        "  {:<18} {}",
        "Max text:".bold(),
        format!("{} chars", config.max_text_chars).dimmed()
    );
    println!();

    Ok(())
}

fn display_or_dash(value: &str) -> &str {
    if value.is_empty() {
        "-"
    } else {
        value
    }
}
