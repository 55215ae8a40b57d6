//! Plain-text cards for calculation results and cache state.

use std::fmt::Write;

use poshlina_core::money::format_rub;
use poshlina_core::{CalculationResult, DataFreshnessStatus, DataVersionInfo, ExemptionCategory, ExemptionManager};
use poshlina_sync::{CacheStatistics, UpdateReport};

const LABEL_WIDTH: usize = 22;

// ── Public API ──

/// Render a calculation result as a vertical card.
pub fn result_card(result: &CalculationResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== State fee: {} ===", format_rub(result.final_fee));
    let _ = writeln!(out, "{} jurisdiction, schedule {}", result.court_type, result.schedule_version);
    let _ = writeln!(out);

    section(&mut out, "Summary");
    row(&mut out, "claim_amount", &format_rub(result.claim_amount));
    row(&mut out, "base_fee", &format_rub(result.base_fee));
    if let Some(id) = &result.exemption_id {
        row(&mut out, "exemption", id);
        row(&mut out, "exemption_discount", &format_rub(result.exemption_discount));
    }
    row(&mut out, "final_fee", &format_rub(result.final_fee));
    row(&mut out, "effective_rate", &format!("{:.2}%", result.effective_rate));
    let _ = writeln!(out);

    section(&mut out, "Breakdown");
    for item in &result.breakdown {
        let _ = writeln!(out, "  {:<LABEL_WIDTH$} {}", format_rub(item.amount), item.description);
        let _ = writeln!(out, "  {:<LABEL_WIDTH$} {}", "", item.formula);
        let _ = writeln!(out, "  {:<LABEL_WIDTH$} {}", "", item.legal_basis);
    }
    let _ = writeln!(out);

    section(&mut out, "Legal references");
    for reference in &result.legal_references {
        let _ = writeln!(out, "  {} ({})", reference.article, reference.description);
        let _ = writeln!(out, "    {} (verified {})", reference.url, reference.last_verified);
    }
    out
}

/// One line per exemption, with savings when a base fee is known.
pub fn exemption_list(exemptions: &[&ExemptionCategory], base_fee: Option<f64>) -> String {
    let mut out = String::new();
    if exemptions.is_empty() {
        let _ = writeln!(out, "(no exemptions available)");
        return out;
    }
    for exemption in exemptions {
        let _ = writeln!(out, "{:<LABEL_WIDTH$} {}", exemption.id, exemption.name);
        let detail = match base_fee {
            Some(fee) => ExemptionManager::get_exemption_description(fee, exemption)
                .unwrap_or_else(|e| e.to_string()),
            None => format!("{} ({})", exemption.description, exemption.legal_basis),
        };
        let _ = writeln!(out, "{:<LABEL_WIDTH$} {}", "", detail);
    }
    out
}

pub fn freshness_card(status: &DataFreshnessStatus, versions: &[DataVersionInfo]) -> String {
    let mut out = String::new();
    section(&mut out, "Data freshness");
    row(&mut out, "last_update", &status.last_update.to_rfc3339());
    row(&mut out, "days_since_update", &status.days_since_update.to_string());
    row(&mut out, "up_to_date", yes_no(status.is_up_to_date));
    if let Some(warning) = &status.warning {
        row(&mut out, "warning", warning);
    }
    for info in versions {
        let _ = writeln!(out);
        section(&mut out, &format!("Version {}", info.version));
        row(&mut out, "release_date", &info.release_date.date_naive().to_string());
        row(&mut out, "source", &info.source);
        row(&mut out, "checksum", &info.checksum);
    }
    out
}

pub fn stats_card(stats: &CacheStatistics) -> String {
    let mut out = String::new();
    section(&mut out, "Cache");
    row(&mut out, "schedules_cached", &stats.schedules_cached.to_string());
    row(&mut out, "exemption_sets_cached", &stats.exemption_sets_cached.to_string());
    row(&mut out, "total_size_bytes", &stats.total_size_bytes.to_string());
    let last = stats
        .last_update
        .map(|ts| ts.to_rfc3339())
        .unwrap_or_else(|| "never".to_string());
    row(&mut out, "last_update", &last);
    row(&mut out, "offline_ready", yes_no(stats.is_offline_ready));
    out
}

pub fn update_report(report: &UpdateReport) -> String {
    let mut out = String::new();
    section(&mut out, "Refresh");
    for court in &report.updated {
        row(&mut out, court.as_str(), "updated");
    }
    for (court, error) in &report.failed {
        row(&mut out, court.as_str(), &format!("kept current data ({error})"));
    }
    let exemptions = match &report.exemptions_error {
        Some(error) => format!("kept current data ({error})"),
        None => "updated".to_string(),
    };
    row(&mut out, "exemptions", &exemptions);
    out
}

// ── Helpers ──

fn section(out: &mut String, header: &str) {
    let _ = writeln!(out, "{header}");
}

fn row(out: &mut String, label: &str, value: &str) {
    let _ = writeln!(out, "  {label:<LABEL_WIDTH$} {value}");
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}
