//! Virtual-user load generation engine.
//!
//! A [`LoadTest`] launches one concurrent virtual user per configured user.
//! Each user walks the same read-only [`StepChain`] over and over: pause for
//! the think time, build the step's request from the previous response,
//! send it, record one [`Outcome`]. All users stop starting new work when
//! the shared [`Deadline`] passes. After the run, [`summarize`] reduces the
//! recorded outcomes to a [`Summary`].
//!
//! ```no_run
//! use std::time::Duration;
//! use surge_core::{ScenarioBuilder, StepRequest};
//!
//! # async fn demo() -> surge_core::SurgeResult<()> {
//! let test = ScenarioBuilder::new()
//!     .with_users(10)
//!     .with_duration(Duration::from_secs(30))
//!     .with_think_time(Duration::from_millis(500))
//!     .then(|_| Ok(StepRequest::get("http://localhost:8080/health")))
//!     .build()?;
//!
//! test.run().await?;
//! let summary = test.summary().await;
//! println!("{} requests, {:.1}ms avg", summary.total_requests, summary.average_duration_ms);
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod chain;
pub mod config;
pub mod error;
pub mod executor;
pub mod outcome;
pub mod pacing;
pub mod request;
pub mod scheduler;
pub mod store;
pub mod summary;
pub mod transport;
pub mod user;

pub use builder::ScenarioBuilder;
pub use chain::{RequestFactory, Step, StepChain};
pub use config::LoadConfig;
pub use error::{StepError, SurgeError, SurgeResult};
pub use executor::{StepExecutor, StepResult};
pub use outcome::{Outcome, OutcomeStatus, RunClock};
pub use pacing::{Deadline, ThinkTime};
pub use request::{StepRequest, StepResponse};
pub use scheduler::{LoadTest, RunStats};
pub use store::OutcomeStore;
pub use summary::{summarize, LatencyPercentiles, StepSummary, Summary};
pub use transport::{
    HttpTransport, HttpTransportFactory, StubBehavior, StubTransportFactory, Transport,
    TransportFactory,
};
pub use user::{UserReport, VirtualUser};

pub use reqwest::Method;
