//! Results reporting and formatting.

use chrono::{DateTime, Utc};
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Table};
use serde::{Deserialize, Serialize};
use surge_core::Summary;

/// Everything reported about one scenario run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResults {
    pub scenario: String,
    pub description: String,
    pub started_at: DateTime<Utc>,
    pub users: u32,
    /// Configured duration
    pub duration_secs: u64,
    /// Wall time until the last user finished
    pub elapsed_secs: f64,
    pub dry_run: bool,
    pub users_failed: u32,
    pub passes_completed: u64,
    pub step_names: Vec<String>,
    pub summary: Summary,
}

impl RunResults {
    fn step_name(&self, index: usize) -> String {
        self.step_names
            .get(index)
            .cloned()
            .unwrap_or_else(|| format!("step-{}", index + 1))
    }
}

/// Formats test results for output.
pub struct ResultsReport;

impl ResultsReport {
    /// Format results as console tables: overview, then one row per step.
    pub fn format_table(results: &RunResults) -> String {
        let summary = &results.summary;

        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .apply_modifier(UTF8_ROUND_CORNERS)
            .set_header(vec![format!("Load Test Results: {}", results.scenario)]);

        if results.dry_run {
            table.add_row(vec!["Mode:", "dry run (no network)"]);
        }
        table.add_row(vec![
            "Duration:",
            &format!(
                "{:.1}s (configured {}s)",
                results.elapsed_secs, results.duration_secs
            ),
        ]);
        table.add_row(vec!["Users:", &format!("{}", results.users)]);
        table.add_row(vec![
            "Total Requests:",
            &format!("{}", summary.total_requests),
        ]);
        table.add_row(vec![
            "Errors:",
            &format!("{} ({:.1}%)", summary.total_errors, summary.error_rate()),
        ]);
        table.add_row(vec![
            "Requests/sec:",
            &format!("{:.1}", summary.requests_per_second),
        ]);

        table.add_row(vec!["", ""]);
        table.add_row(vec!["Latency (ms)", "min / avg / p50 / p90 / p95 / p99 / max"]);
        table.add_row(vec![
            "",
            &format!(
                "{:.1} / {:.1} / {:.1} / {:.1} / {:.1} / {:.1} / {:.1}",
                summary.min_duration_ms,
                summary.average_duration_ms,
                summary.latency.p50,
                summary.latency.p90,
                summary.latency.p95,
                summary.latency.p99,
                summary.max_duration_ms
            ),
        ]);

        if !summary.status_counts.is_empty() {
            table.add_row(vec!["", ""]);
            for (code, count) in &summary.status_counts {
                table.add_row(vec![format!("HTTP {}:", code), count.to_string()]);
            }
        }
        if !summary.error_counts.is_empty() {
            table.add_row(vec!["", ""]);
            for (message, count) in &summary.error_counts {
                table.add_row(vec![format!("{}:", message), count.to_string()]);
            }
        }

        let mut steps = Table::new();
        steps
            .load_preset(UTF8_FULL)
            .apply_modifier(UTF8_ROUND_CORNERS)
            .set_header(vec!["Step", "Requests", "Errors", "Avg (ms)"]);
        for step in &summary.steps {
            steps.add_row(vec![
                results.step_name(step.step),
                step.requests.to_string(),
                step.errors.to_string(),
                format!("{:.1}", step.average_duration_ms),
            ]);
        }

        format!("{}\n{}", table, steps)
    }

    /// Format results as JSON.
    pub fn format_json(results: &RunResults) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(results)?)
    }

    /// Format results as CSV row.
    pub fn format_csv(results: &RunResults) -> String {
        let summary = &results.summary;
        format!(
            "{},{},{},{},{},{},{:.1},{:.1},{:.1},{:.1},{:.1},{:.1}",
            results.started_at.to_rfc3339(),
            csv_escape(&results.scenario),
            results.users,
            results.duration_secs,
            summary.total_requests,
            summary.total_errors,
            summary.requests_per_second,
            summary.average_duration_ms,
            summary.latency.p50,
            summary.latency.p90,
            summary.latency.p99,
            summary.max_duration_ms
        )
    }

    /// CSV header row.
    pub fn csv_header() -> &'static str {
        "timestamp,scenario,users,duration,requests,errors,rps,avg,p50,p90,p99,max"
    }
}

/// Quote a field containing separators, quotes or newlines.
fn csv_escape(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
