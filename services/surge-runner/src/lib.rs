//! Scenario files, run orchestration and result reports for the `surge` CLI.
//!
//! This crate provides tools to:
//! - Load load-test scenarios from YAML
//! - Run them with a live progress bar
//! - Output results in multiple formats (console, JSON, CSV)

pub mod report;
pub mod runner;
pub mod scenario;

pub use report::{ResultsReport, RunResults};
pub use runner::ScenarioRunner;
pub use scenario::{BodySource, ScenarioFile, StepDefinition};
