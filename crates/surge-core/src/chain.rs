//! The ordered, read-only chain of steps executed by every virtual user.

use std::fmt;
use std::sync::Arc;

use crate::error::{StepError, SurgeError, SurgeResult};
use crate::request::{StepRequest, StepResponse};

/// Builds the outbound request of a step from the previous step's response.
///
/// The response is `None` for the first step of every pass, and after a
/// failed step.
pub type RequestFactory =
    dyn Fn(Option<&StepResponse>) -> Result<StepRequest, StepError> + Send + Sync;

/// One request/response unit of a scenario.
#[derive(Clone)]
pub struct Step {
    name: String,
    factory: Arc<RequestFactory>,
}

impl Step {
    pub fn new<F>(name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(Option<&StepResponse>) -> Result<StepRequest, StepError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            factory: Arc::new(factory),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Invoke the request factory.
    pub fn build_request(&self, previous: Option<&StepResponse>) -> Result<StepRequest, StepError> {
        (self.factory)(previous)
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step").field("name", &self.name).finish()
    }
}

/// Immutable, non-empty sequence of steps.
///
/// Cloning is cheap; all users and all passes share the same steps.
#[derive(Debug, Clone)]
pub struct StepChain {
    steps: Arc<[Step]>,
}

impl StepChain {
    /// Create a chain, rejecting an empty step list.
    pub fn new(steps: Vec<Step>) -> SurgeResult<Self> {
        if steps.is_empty() {
            return Err(SurgeError::EmptyChain);
        }
        Ok(Self {
            steps: steps.into(),
        })
    }

    pub fn first(&self) -> &Step {
        &self.steps[0]
    }

    pub fn get(&self, index: usize) -> Option<&Step> {
        self.steps.get(index)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Step> {
        self.steps.iter()
    }

    pub fn names(&self) -> Vec<String> {
        self.steps.iter().map(|s| s.name.clone()).collect()
    }
}
