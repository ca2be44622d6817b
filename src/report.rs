//! Console and JSON renderings of a scrape batch.

use crate::models::{AggregateStats, SiteOutcome};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::error::Error;
use std::path::Path;
use tokio::fs;
use tracing::{error, info, instrument};

const RULE_WIDTH: usize = 70;

fn rule() -> String {
    "=".repeat(RULE_WIDTH)
}

/// Header printed before a batch starts.
pub fn render_banner(urls: &[String]) -> String {
    let mut lines = vec![
        rule(),
        "Tech Trends Database Scraper - Multi-Site Collection".to_string(),
        rule(),
        format!("\nTarget websites: {}", urls.len()),
    ];
    lines.extend(
        urls.iter()
            .enumerate()
            .map(|(i, url)| format!("  {}. {url}", i + 1)),
    );
    lines.join("\n")
}

/// Per-source results followed by the aggregated statistics.
///
/// # Arguments
///
/// * `outcomes` - One entry per source URL, in any order
/// * `stats` - Totals computed from the same outcomes
///
/// # Returns
///
/// The report text. Sources are marked `[OK]` or `[FAIL]`; the `Errors`
/// line appears only for sources that had errors and the `Message` line
/// only for sources that carry one.
pub fn render_report(outcomes: &[SiteOutcome], stats: &AggregateStats) -> String {
    let mut lines = vec![rule(), "DETAILED RESULTS BY WEBSITE".to_string(), rule()];

    for outcome in outcomes {
        let icon = if outcome.is_success() {
            "[OK]"
        } else {
            "[FAIL]"
        };
        lines.push(format!("\n{icon} {}", outcome.url));
        lines.push(format!("   Created: {} articles", outcome.created));
        lines.push(format!("   Skipped: {} duplicates", outcome.skipped));
        if outcome.errors > 0 {
            lines.push(format!("   Errors:  {}", outcome.errors));
        }
        if let Some(message) = &outcome.message {
            lines.push(format!("   Message: {message}"));
        }
    }

    lines.extend([
        format!("\n{}", rule()),
        "AGGREGATED STATISTICS".to_string(),
        rule(),
        format!("\nTotal URLs Processed: {}", stats.total_sources),
        format!("Successful: {}", stats.successful_sources),
        format!("Failed: {}", stats.failed_sources),
        "\nTotal Articles:".to_string(),
        format!("  Created: {}", stats.total_created),
        format!("  Skipped (duplicates): {}", stats.total_skipped),
        format!("  Errors: {}", stats.total_errors),
        format!("  Total Processed: {}", stats.total_processed()),
        format!("\n{}", rule()),
    ]);
    lines.join("\n")
}

#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    generated_at: DateTime<Utc>,
    results: &'a [SiteOutcome],
    stats: &'a AggregateStats,
    total_processed: usize,
}

/// Write outcomes and stats as pretty JSON, creating parent directories.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn write_json_report(
    path: &Path,
    outcomes: &[SiteOutcome],
    stats: &AggregateStats,
) -> Result<(), Box<dyn Error>> {
    let report = JsonReport {
        generated_at: Utc::now(),
        results: outcomes,
        stats,
        total_processed: stats.total_processed(),
    };
    let json = serde_json::to_string_pretty(&report)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await.inspect_err(|e| {
            error!(dir = %parent.display(), error = %e, "Failed to create report dir");
        })?;
    }

    fs::write(path, json).await?;
    info!("Wrote JSON report");
    Ok(())
}
