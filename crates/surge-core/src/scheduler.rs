//! Load test orchestration: one concurrent task per virtual user, bounded by
//! a shared deadline.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{error, info};

use crate::chain::{Step, StepChain};
use crate::config::LoadConfig;
use crate::error::{SurgeError, SurgeResult};
use crate::outcome::{Outcome, RunClock};
use crate::pacing::{Deadline, ThinkTime};
use crate::store::OutcomeStore;
use crate::summary::{summarize, Summary};
use crate::transport::{HttpTransportFactory, TransportFactory};
use crate::user::VirtualUser;

/// Bookkeeping of one completed run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    pub users_started: u32,
    /// Users whose transport could not be created or whose task died
    pub users_failed: u32,
    pub passes_completed: u64,
    pub steps_executed: u64,
    pub elapsed: Duration,
}

/// A configured load test: step chain, settings and the outcome store.
///
/// The store is owned here for the lifetime of a run; users only hold a
/// shared handle for appending.
pub struct LoadTest {
    chain: StepChain,
    config: LoadConfig,
    transport: Arc<dyn TransportFactory>,
    store: Arc<OutcomeStore>,
    running: AtomicBool,
}

/// Clears the running flag when a run ends or its future is dropped.
struct RunGuard<'a>(&'a AtomicBool);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl LoadTest {
    /// Create a load test over HTTP.
    pub fn new(chain: StepChain, config: LoadConfig) -> SurgeResult<Self> {
        config.validate()?;
        Ok(Self {
            chain,
            config,
            transport: Arc::new(HttpTransportFactory::default()),
            store: Arc::new(OutcomeStore::new()),
            running: AtomicBool::new(false),
        })
    }

    /// Replace the transport used by every user.
    pub fn with_transport(mut self, factory: Arc<dyn TransportFactory>) -> Self {
        self.transport = factory;
        self
    }

    /// Run the test to completion.
    ///
    /// Only configuration errors are returned. Request failures become
    /// outcomes, and a user whose task fails is logged and counted in
    /// [`RunStats::users_failed`] without affecting the others. Outcomes of
    /// a previous run are discarded. Calling `run` while another run of the
    /// same test is in progress fails with [`SurgeError::AlreadyRunning`]
    /// and leaves that run untouched.
    pub async fn run(&self) -> SurgeResult<RunStats> {
        debug_assert!(!self.chain.is_empty());
        self.config.validate()?;

        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(SurgeError::AlreadyRunning);
        }
        let _guard = RunGuard(&self.running);

        self.store.clear().await;
        let started = Instant::now();
        let clock = RunClock::start();
        let deadline = Deadline::after(self.config.duration);

        info!(
            users = self.config.users,
            steps = self.chain.len(),
            duration_secs = self.config.duration.as_secs_f64(),
            "Starting load test"
        );

        let mut stats = RunStats::default();
        let mut users = JoinSet::new();
        for user_id in 1..=self.config.users {
            let transport = match self.transport.create(user_id) {
                Ok(transport) => transport,
                Err(e) => {
                    error!(user = user_id, error = %e, "Failed to create transport, user skipped");
                    stats.users_failed += 1;
                    continue;
                }
            };
            let user = VirtualUser::new(
                user_id,
                self.chain.clone(),
                ThinkTime::for_user(&self.config, user_id),
                deadline,
                self.store.clone(),
                clock,
                transport,
            );
            users.spawn(user.run());
            stats.users_started += 1;
        }

        while let Some(joined) = users.join_next().await {
            match joined {
                Ok(report) => {
                    stats.passes_completed += report.passes_completed;
                    stats.steps_executed += report.steps_executed;
                }
                Err(e) => {
                    error!(error = %e, "Virtual user task failed");
                    stats.users_failed += 1;
                }
            }
        }
        stats.elapsed = started.elapsed();

        info!(
            outcomes = self.store.recorded(),
            errors = self.store.errors(),
            elapsed_secs = stats.elapsed.as_secs_f64(),
            "Load test finished"
        );
        Ok(stats)
    }

    /// All outcomes recorded by the last run.
    pub async fn outcomes(&self) -> Vec<Outcome> {
        self.store.snapshot().await
    }

    /// Summary of the outcomes recorded so far.
    ///
    /// Called during a run this reflects a partial snapshot.
    pub async fn summary(&self) -> Summary {
        summarize(&self.outcomes().await)
    }

    pub fn config(&self) -> &LoadConfig {
        &self.config
    }

    pub fn first_step(&self) -> &Step {
        self.chain.first()
    }

    pub fn chain(&self) -> &StepChain {
        &self.chain
    }

    /// Shared handle on the store, for live progress reporting.
    pub fn store(&self) -> Arc<OutcomeStore> {
        self.store.clone()
    }
}
