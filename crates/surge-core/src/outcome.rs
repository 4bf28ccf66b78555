//! Outcome records: one per executed step.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

/// Final status of one step attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// A response was received; any status code, including 4xx/5xx
    Http { code: u16 },
    /// The request could not be built or transmitted
    Failed { message: String },
}

/// Timing and status of one executed step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub user_id: u32,
    /// Zero-based position of the step in the chain
    pub step: usize,
    /// Zero-based pass number of the user
    pub pass: u64,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub status: OutcomeStatus,
}

impl Outcome {
    pub fn duration(&self) -> chrono::Duration {
        self.ended_at - self.started_at
    }

    pub fn duration_ms(&self) -> f64 {
        let duration = self.duration();
        match duration.num_microseconds() {
            Some(us) => us as f64 / 1000.0,
            None => duration.num_milliseconds() as f64,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.status, OutcomeStatus::Failed { .. })
    }

    pub fn status_code(&self) -> Option<u16> {
        match self.status {
            OutcomeStatus::Http { code } => Some(code),
            OutcomeStatus::Failed { .. } => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.status {
            OutcomeStatus::Failed { message } => Some(message),
            OutcomeStatus::Http { .. } => None,
        }
    }
}

/// Wall-clock timestamps driven by the monotonic tokio clock.
///
/// Timestamps never go backwards, so outcome durations are never negative,
/// and they follow tokio's paused clock in tests.
#[derive(Debug, Clone, Copy)]
pub struct RunClock {
    origin: Instant,
    wall: DateTime<Utc>,
}

impl RunClock {
    pub fn start() -> Self {
        Self {
            origin: Instant::now(),
            wall: Utc::now(),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        let elapsed = chrono::Duration::from_std(self.origin.elapsed())
            .unwrap_or_else(|_| chrono::Duration::zero());
        self.wall + elapsed
    }
}
