//! `proofly test` — probe the configured provider and print the report.

use anyhow::{bail, Context, Result};
use colored::Colorize;

use proofly_core::{ConnectivityReport, InferenceTest};
use proofly_service::Proofreader;

use crate::helpers::check_mark;

/// Run the connection test. Fails (non-zero exit) when the report is not ok.
pub async fn run(service: &Proofreader, json: bool) -> Result<()> {
    let settings = service.get_settings().await?;
    if !json {
        println!();
        println!(
            "{} {} {}",
            "📝 Testing".cyan().bold(),
            settings.provider.bold(),
            "...".dimmed()
        );
    }

    let report = service.test_connection().await;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("failed to encode report")?
        );
    } else {
        for line in report_lines(&report) {
            println!("{line}");
        }
        println!();
    }

    if !report.ok {
        bail!("connection test failed");
    }
    Ok(())
}

fn report_lines(report: &ConnectivityReport) -> Vec<String> {
    let mut lines = Vec::new();

    let headline = if report.ok {
        report.info.as_deref().unwrap_or("Connection OK")
    } else {
        report.error.as_deref().unwrap_or("Connection failed")
    };
    lines.push(format!("  {} {}", check_mark(report.ok), headline));

    if let Some(ref warning) = report.warning {
        lines.push(format!("  {} {}", "!".yellow().bold(), warning.yellow()));
    }
    if let Some(ref suggestion) = report.suggestion {
        lines.push(format!("  {} {}", "→".cyan(), suggestion));
    }

    if let Some(ref details) = report.details {
        if let Some(ref version) = details.version {
            lines.push(format!("    {:<16} {}", "version", version.dimmed()));
        }
        if let Some(ref endpoint) = details.endpoint {
            lines.push(format!("    {:<16} {}", "endpoint", endpoint.dimmed()));
        }
        if let Some(ref model) = details.resolved_model {
            lines.push(format!("    {:<16} {}", "model", model));
        }
        if let Some(ref models) = details.available_models {
            lines.push(format!(
                "    {:<16} {}",
                "installed",
                models.join(", ").dimmed()
            ));
        }
        if let Some(test) = details.inference_test {
            let label = match test {
                InferenceTest::Passed => "passed".green(),
                InferenceTest::Failed => "failed".red(),
                InferenceTest::Timeout => "timed out".yellow(),
            };
            lines.push(format!("    {:<16} {}", "inference", label));
        }
    }

    lines
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
