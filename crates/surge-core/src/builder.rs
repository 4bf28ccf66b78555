//! Fluent construction of a [`LoadTest`].

use std::sync::Arc;
use std::time::Duration;

use crate::chain::{Step, StepChain};
use crate::config::LoadConfig;
use crate::error::{StepError, SurgeResult};
use crate::request::{StepRequest, StepResponse};
use crate::scheduler::LoadTest;
use crate::transport::TransportFactory;

/// Assembles settings and the ordered step chain.
///
/// ```
/// use std::time::Duration;
/// use surge_core::{ScenarioBuilder, StepRequest};
///
/// let test = ScenarioBuilder::new()
///     .with_users(30)
///     .with_duration(Duration::from_secs(60))
///     .with_think_time(Duration::from_secs(1))
///     .with_random_think_time(Duration::from_secs(1))
///     .then(|_| Ok(StepRequest::get("http://localhost:5036/forecast")))
///     .then(|prev| {
///         let prev = prev.ok_or_else(|| surge_core::StepError::build("no forecast"))?;
///         Ok(StepRequest::post("http://localhost:5036/forecast").with_json_body_from(prev))
///     })
///     .build()
///     .unwrap();
///
/// assert_eq!(test.chain().len(), 2);
/// assert_eq!(test.first_step().name(), "step-1");
/// ```
#[derive(Default)]
pub struct ScenarioBuilder {
    config: LoadConfig,
    steps: Vec<Step>,
    transport: Option<Arc<dyn TransportFactory>>,
}

impl ScenarioBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace all settings at once.
    pub fn with_config(mut self, config: LoadConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_users(mut self, users: u32) -> Self {
        self.config.users = users;
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.config.duration = duration;
        self
    }

    /// Fixed pause before every step.
    pub fn with_think_time(mut self, think_time: Duration) -> Self {
        self.config.think_time = think_time;
        self
    }

    /// Maximum random pause added to the think time.
    pub fn with_random_think_time(mut self, jitter: Duration) -> Self {
        self.config.think_jitter = jitter;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    pub fn with_transport(mut self, factory: impl TransportFactory + 'static) -> Self {
        self.transport = Some(Arc::new(factory));
        self
    }

    /// Append an unnamed step.
    pub fn then<F>(self, factory: F) -> Self
    where
        F: Fn(Option<&StepResponse>) -> Result<StepRequest, StepError> + Send + Sync + 'static,
    {
        let name = format!("step-{}", self.steps.len() + 1);
        self.then_named(name, factory)
    }

    /// Append a named step.
    pub fn then_named<F>(self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(Option<&StepResponse>) -> Result<StepRequest, StepError> + Send + Sync + 'static,
    {
        self.then_step(Step::new(name, factory))
    }

    pub fn then_step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    /// Validate and produce the load test.
    pub fn build(self) -> SurgeResult<LoadTest> {
        let chain = StepChain::new(self.steps)?;
        let test = LoadTest::new(chain, self.config)?;
        Ok(match self.transport {
            Some(factory) => test.with_transport(factory),
            None => test,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SurgeError;

    #[test]
    fn test_build_without_steps_fails() {
        let result = ScenarioBuilder::new().with_users(3).build();
        assert!(matches!(result, Err(SurgeError::EmptyChain)));
    }

    #[test]
    fn test_build_with_zero_users_fails() {
        let result = ScenarioBuilder::new()
            .with_users(0)
            .then(|_| Ok(StepRequest::get("http://x")))
            .build();
        assert!(matches!(result, Err(SurgeError::InvalidUserCount(0))));
    }

    #[test]
    fn test_defaults_and_setters() {
        let test = ScenarioBuilder::new()
            .then(|_| Ok(StepRequest::get("http://x")))
            .build()
            .unwrap();
        assert_eq!(test.config(), &LoadConfig::default());

        let test = ScenarioBuilder::new()
            .with_users(5)
            .with_duration(Duration::from_secs(10))
            .with_think_time(Duration::from_millis(100))
            .with_random_think_time(Duration::from_millis(50))
            .with_seed(9)
            .then_named("login", |_| Ok(StepRequest::post("http://x/login")))
            .then(|_| Ok(StepRequest::get("http://x/home")))
            .build()
            .unwrap();

        let config = test.config();
        assert_eq!(config.users, 5);
        assert_eq!(config.duration, Duration::from_secs(10));
        assert_eq!(config.think_time, Duration::from_millis(100));
        assert_eq!(config.think_jitter, Duration::from_millis(50));
        assert_eq!(config.seed, Some(9));
        assert_eq!(test.chain().names(), vec!["login", "step-2"]);
    }
}
