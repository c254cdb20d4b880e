use std::collections::BTreeMap;
use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::models::AggregationResult;

fn ranked(stats: &BTreeMap<String, usize>) -> Vec<(&String, &usize)> {
    let mut entries: Vec<(&String, &usize)> = stats.iter().collect();
    entries.sort_by(|a, b| b.1.cmp(a.1));
    entries
}

fn write_counts(output: &mut String, title: &str, stats: &BTreeMap<String, usize>) {
    let _ = writeln!(output);
    let _ = writeln!(output, "## {title}");

    if stats.is_empty() {
        let _ = writeln!(output, "No consultations in scope.");
        return;
    }
    for (label, count) in ranked(stats) {
        let _ = writeln!(output, "- {label}: {count}");
    }
}

pub fn build_report(result: &AggregationResult, generated_at: DateTime<Utc>) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Klinik Pemerintah Digital: Consultation Summary");
    let _ = writeln!(
        output,
        "Generated {} for access level `{}`",
        generated_at.format("%Y-%m-%d %H:%M UTC"),
        result.overview.access_level
    );
    let _ = writeln!(output);
    let _ = writeln!(
        output,
        "{} consultations in scope, {} in the last 30 days.",
        result.overview.total, result.overview.last_30_days
    );

    write_counts(&mut output, "By Status", &result.status_stats);
    write_counts(&mut output, "By Category", &result.kategori_stats);
    write_counts(&mut output, "By Topic", &result.topik_stats);
    write_counts(&mut output, "By Province", &result.provinsi_stats);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Monthly Trend");
    let _ = writeln!(output, "| Month | Consultations |");
    let _ = writeln!(output, "|---|---|");
    for entry in &result.monthly_trend {
        let _ = writeln!(output, "| {} | {} |", entry.name, entry.count);
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Units");
    if result.unit_stats.is_empty() {
        let _ = writeln!(output, "No units in scope.");
    } else {
        for unit in &result.unit_stats {
            let _ = writeln!(output, "- {} (#{}): {}", unit.nama_unit, unit.unit_id, unit.count);
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Top Keywords");
    if result.top_keywords.is_empty() {
        let _ = writeln!(output, "No keywords extracted for this scope.");
    } else {
        for keyword in &result.top_keywords {
            let _ = writeln!(output, "- {} ({})", keyword.keyword, keyword.count);
        }
    }

    output
}
