//! The virtual user loop.

use std::sync::Arc;
use tracing::debug;

use crate::chain::StepChain;
use crate::executor::StepExecutor;
use crate::outcome::RunClock;
use crate::pacing::{Deadline, ThinkTime};
use crate::request::StepResponse;
use crate::store::OutcomeStore;
use crate::transport::Transport;

/// What one user did during a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UserReport {
    pub user_id: u32,
    /// Passes that reached the last step
    pub passes_completed: u64,
    pub steps_executed: u64,
}

/// One simulated client walking the chain until the deadline.
///
/// A user is single-threaded internally: its steps never overlap, so its
/// outcomes are strictly ordered by start time.
pub struct VirtualUser {
    id: u32,
    chain: StepChain,
    think: ThinkTime,
    deadline: Deadline,
    store: Arc<OutcomeStore>,
    clock: RunClock,
    transport: Box<dyn Transport>,
}

impl VirtualUser {
    pub fn new(
        id: u32,
        chain: StepChain,
        think: ThinkTime,
        deadline: Deadline,
        store: Arc<OutcomeStore>,
        clock: RunClock,
        transport: Box<dyn Transport>,
    ) -> Self {
        Self {
            id,
            chain,
            think,
            deadline,
            store,
            clock,
            transport,
        }
    }

    /// Run passes until the deadline elapses.
    ///
    /// Reaching the deadline is the normal way out; the transport is dropped
    /// on return.
    pub async fn run(mut self) -> UserReport {
        debug!(user = self.id, "User started");
        let mut report = UserReport {
            user_id: self.id,
            ..UserReport::default()
        };

        while !self.deadline.is_elapsed() {
            let finished = self.run_pass(report.passes_completed, &mut report).await;
            if !finished {
                break;
            }
            report.passes_completed += 1;
        }

        debug!(
            user = self.id,
            passes = report.passes_completed,
            steps = report.steps_executed,
            "User stopped"
        );
        report
    }

    /// Walk the chain once from the first step.
    ///
    /// Returns `false` if the deadline stopped the pass early.
    async fn run_pass(&mut self, pass: u64, report: &mut UserReport) -> bool {
        let chain = self.chain.clone();
        let executor = StepExecutor::new(
            self.id,
            self.transport.as_ref(),
            &self.store,
            self.clock,
        );
        let mut previous: Option<StepResponse> = None;

        for (index, step) in chain.iter().enumerate() {
            if self.deadline.is_elapsed() {
                return false;
            }
            let pause = self.think.next_pause();
            if !self.deadline.pause(pause).await {
                return false;
            }

            let result = executor.execute(step, index, pass, previous.as_ref()).await;
            report.steps_executed += 1;
            previous = result.response;
        }
        true
    }
}
