//! Think-time pacing and the cooperative run deadline.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;
use tokio::task::yield_now;
use tokio::time::{sleep_until, Instant};

use crate::config::LoadConfig;

// Stand-in for "never" when a duration overflows the clock.
const FAR_FUTURE: Duration = Duration::from_secs(60 * 60 * 24 * 365 * 30);

/// Absolute point in time after which no new work may start.
///
/// The deadline is the only stop signal of a run. Users poll it before each
/// pass, before each pause and before each request; an in-flight request is
/// never interrupted.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    at: Instant,
}

impl Deadline {
    /// Deadline `duration` from now.
    pub fn after(duration: Duration) -> Self {
        let now = Instant::now();
        let at = now
            .checked_add(duration)
            .unwrap_or_else(|| now + FAR_FUTURE);
        Self { at }
    }

    /// Deadline at an absolute instant.
    pub fn at(at: Instant) -> Self {
        Self { at }
    }

    pub fn instant(&self) -> Instant {
        self.at
    }

    pub fn is_elapsed(&self) -> bool {
        Instant::now() >= self.at
    }

    /// Time left before the deadline, zero once elapsed.
    pub fn remaining(&self) -> Duration {
        self.at.saturating_duration_since(Instant::now())
    }

    /// Sleep for `pause`, cut short by the deadline.
    ///
    /// Returns `true` if the full pause elapsed before the deadline, `false`
    /// if the deadline was reached first.
    pub async fn pause(&self, pause: Duration) -> bool {
        if pause.is_zero() {
            // Yield so a zero think time cannot starve the other users
            yield_now().await;
            return !self.is_elapsed();
        }
        let wake = Instant::now().checked_add(pause).unwrap_or(self.at);
        if wake >= self.at {
            sleep_until(self.at).await;
            return false;
        }
        sleep_until(wake).await;
        !self.is_elapsed()
    }
}

/// Per-user think-time generator: fixed interval plus uniform jitter.
pub struct ThinkTime {
    fixed: Duration,
    jitter: Duration,
    rng: StdRng,
}

impl ThinkTime {
    pub fn new(fixed: Duration, jitter: Duration, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { fixed, jitter, rng }
    }

    /// Generator for one virtual user of a run.
    pub fn for_user(config: &LoadConfig, user_id: u32) -> Self {
        Self::new(config.think_time, config.think_jitter, config.user_seed(user_id))
    }

    /// Draw the pause for the next step.
    pub fn next_pause(&mut self) -> Duration {
        if self.jitter.is_zero() {
            return self.fixed;
        }
        let max_micros = u64::try_from(self.jitter.as_micros()).unwrap_or(u64::MAX);
        let jitter = Duration::from_micros(self.rng.gen_range(0..=max_micros));
        self.fixed.saturating_add(jitter)
    }
}
