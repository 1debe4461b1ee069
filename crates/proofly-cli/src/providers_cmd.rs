//! `proofly providers` — list every supported provider, grouped by category.

use anyhow::Result;
use colored::Colorize;

use proofly_core::store::load_settings;
use proofly_core::JsonFileStore;
use proofly_providers::{by_category, ProviderCategory, ProviderDescriptor};

const CATEGORIES: [ProviderCategory; 4] = [
    ProviderCategory::Local,
    ProviderCategory::Commercial,
    ProviderCategory::OpenModel,
    ProviderCategory::Custom,
];

/// Run the providers command.
pub async fn run() -> Result<()> {
    let current = load_settings(&JsonFileStore::default_path())
        .await
        .map(|s| s.provider)
        .unwrap_or_default();

    println!();
    println!("{}", "📝 Proofly Providers".cyan().bold());

    for category in CATEGORIES {
        println!();
        println!("  {}", category_label(category).bold());
        for descriptor in by_category(category) {
            println!("{}", provider_line(descriptor, descriptor.key == current));
        }
    }
    println!();

    Ok(())
}

fn category_label(category: ProviderCategory) -> &'static str {
    match category {
        ProviderCategory::Local => "Local",
        ProviderCategory::Commercial => "Commercial",
        ProviderCategory::OpenModel => "Open-model hosts",
        ProviderCategory::Custom => "Custom",
    }
}

fn provider_line(d: &ProviderDescriptor, current: bool) -> String {
    let marker = if current {
        "●".green().to_string()
    } else {
        " ".to_string()
    };
    let model = if d.default_model.is_empty() {
        "-".to_string()
    } else {
        d.default_model.to_string()
    };
    let key_note = if d.requires_api_key() { "key" } else { "" };
    format!(
        "  {marker} {:<12} {:<22} {} {}",
        d.key,
        d.display_name,
        format!("[{} · {model}]", d.wire_format).dimmed(),
        key_note.yellow()
    )
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
