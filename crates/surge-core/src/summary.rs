//! Reduction of recorded outcomes into the final report numbers.
//!
//! Conventions:
//! - Durations are milliseconds throughout.
//! - Failure outcomes have no status code. They are counted in
//!   `total_errors` and, when their message is non-empty, in `error_counts`,
//!   but never in `status_counts`. So the status counts always sum to
//!   `total_requests - total_errors`.

use hdrhistogram::Histogram;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::outcome::Outcome;

/// Latency percentiles in milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LatencyPercentiles {
    pub p50: f64,
    pub p90: f64,
    pub p95: f64,
    pub p99: f64,
}

/// Per-step breakdown.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepSummary {
    /// Zero-based position of the step in the chain
    pub step: usize,
    pub requests: u64,
    pub errors: u64,
    pub average_duration_ms: f64,
}

/// Aggregate view of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub total_requests: u64,
    pub total_errors: u64,
    pub average_duration_ms: f64,
    pub min_duration_ms: f64,
    pub max_duration_ms: f64,
    pub latency: LatencyPercentiles,
    /// Outcomes per second between the first start and the last end
    pub requests_per_second: f64,
    pub status_counts: BTreeMap<u16, u64>,
    pub error_counts: BTreeMap<String, u64>,
    pub steps: Vec<StepSummary>,
}

impl Summary {
    /// Outcomes that received a response.
    pub fn success_count(&self) -> u64 {
        self.total_requests - self.total_errors
    }

    /// Share of failed outcomes, 0-100.
    pub fn error_rate(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            (self.total_errors as f64 / self.total_requests as f64) * 100.0
        }
    }
}

/// Summarize a collection of outcomes. Pure; empty input gives
/// `Summary::default()`.
pub fn summarize(outcomes: &[Outcome]) -> Summary {
    if outcomes.is_empty() {
        return Summary::default();
    }

    let mut summary = Summary {
        total_requests: outcomes.len() as u64,
        min_duration_ms: f64::MAX,
        ..Summary::default()
    };
    let mut total_ms = 0.0;
    let mut steps: BTreeMap<usize, (u64, u64, f64)> = BTreeMap::new();
    let mut histogram = Histogram::<u64>::new(3).ok();

    for outcome in outcomes {
        let ms = outcome.duration_ms();
        total_ms += ms;
        summary.min_duration_ms = summary.min_duration_ms.min(ms);
        summary.max_duration_ms = summary.max_duration_ms.max(ms);
        if let Some(h) = histogram.as_mut() {
            // Microsecond resolution
            h.record((ms * 1000.0).max(0.0) as u64).ok();
        }

        let entry = steps.entry(outcome.step).or_insert((0, 0, 0.0));
        entry.0 += 1;
        entry.2 += ms;

        match outcome.status_code() {
            Some(code) => *summary.status_counts.entry(code).or_insert(0) += 1,
            None => {
                summary.total_errors += 1;
                entry.1 += 1;
                if let Some(message) = outcome.error_message().filter(|m| !m.is_empty()) {
                    *summary.error_counts.entry(message.to_string()).or_insert(0) += 1;
                }
            }
        }
    }

    summary.average_duration_ms = total_ms / outcomes.len() as f64;

    if let Some(h) = histogram {
        summary.latency = LatencyPercentiles {
            p50: h.value_at_percentile(50.0) as f64 / 1000.0,
            p90: h.value_at_percentile(90.0) as f64 / 1000.0,
            p95: h.value_at_percentile(95.0) as f64 / 1000.0,
            p99: h.value_at_percentile(99.0) as f64 / 1000.0,
        };
    }

    let first_start = outcomes.iter().map(|o| o.started_at).min();
    let last_end = outcomes.iter().map(|o| o.ended_at).max();
    if let (Some(first), Some(last)) = (first_start, last_end) {
        let span = last - first;
        let span_secs = match span.num_microseconds() {
            Some(us) => us as f64 / 1_000_000.0,
            None => span.num_milliseconds() as f64 / 1000.0,
        };
        if span_secs > 0.0 {
            summary.requests_per_second = outcomes.len() as f64 / span_secs;
        }
    }

    summary.steps = steps
        .into_iter()
        .map(|(step, (requests, errors, total))| StepSummary {
            step,
            requests,
            errors,
            average_duration_ms: total / requests as f64,
        })
        .collect();

    summary
}
