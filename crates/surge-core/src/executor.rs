//! Execution of a single step.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use tracing::debug;

use crate::chain::Step;
use crate::error::StepError;
use crate::outcome::{Outcome, OutcomeStatus, RunClock};
use crate::request::{StepRequest, StepResponse};
use crate::store::OutcomeStore;
use crate::transport::Transport;

/// Result of executing one step.
#[derive(Debug)]
pub struct StepResult {
    /// The outcome that was appended to the store
    pub outcome: Outcome,
    /// Response to hand to the next step, `None` when the step failed
    pub response: Option<StepResponse>,
}

/// Runs steps for one virtual user over that user's private transport.
///
/// Every call to [`execute`](Self::execute) appends exactly one outcome,
/// whether the request succeeded or not. Failures are recorded and swallowed.
pub struct StepExecutor<'a> {
    user_id: u32,
    transport: &'a dyn Transport,
    store: &'a OutcomeStore,
    clock: RunClock,
}

impl<'a> StepExecutor<'a> {
    pub fn new(
        user_id: u32,
        transport: &'a dyn Transport,
        store: &'a OutcomeStore,
        clock: RunClock,
    ) -> Self {
        Self {
            user_id,
            transport,
            store,
            clock,
        }
    }

    /// Build, send and record one step.
    pub async fn execute(
        &self,
        step: &Step,
        index: usize,
        pass: u64,
        previous: Option<&StepResponse>,
    ) -> StepResult {
        let started_at = self.clock.now();
        let result = match build_request(step, previous) {
            Ok(request) => self.transport.send(request).await,
            Err(e) => Err(e),
        };
        let ended_at = self.clock.now();

        let (status, response) = match result {
            Ok(response) => (
                OutcomeStatus::Http {
                    code: response.status,
                },
                Some(response),
            ),
            Err(e) => {
                debug!(user = self.user_id, step = %step.name(), error = %e, "Step failed");
                (
                    OutcomeStatus::Failed {
                        message: e.to_string(),
                    },
                    None,
                )
            }
        };

        let outcome = Outcome {
            user_id: self.user_id,
            step: index,
            pass,
            started_at,
            ended_at,
            status,
        };
        self.store.append(outcome.clone()).await;

        StepResult { outcome, response }
    }
}

/// Invoke the step's factory, turning a panic into a step failure.
fn build_request(step: &Step, previous: Option<&StepResponse>) -> Result<StepRequest, StepError> {
    panic::catch_unwind(AssertUnwindSafe(|| step.build_request(previous)))
        .unwrap_or_else(|payload| Err(StepError::Panicked(panic_message(payload.as_ref()))))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
