//! Shared test utilities for the surge workspace.
//!
//! This crate provides common testing infrastructure including:
//! - A local mock target service to point load tests at
//! - Scenario file fixtures
//! - Tolerance assertions for timing statistics and request counts
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```
//!
//! Then import in your tests:
//!
//! ```ignore
//! use test_utils::{MockTarget, assert_approx_eq};
//! ```

pub mod fixtures;
pub mod mock_target;

// Re-export commonly used items at the crate root
pub use fixtures::*;
pub use mock_target::{MockTarget, SECURE_TOKEN};

/// Assert that a float lies within `expected ± tolerance`.
///
/// ```ignore
/// use test_utils::assert_approx_eq;
///
/// assert_approx_eq!(summary.requests_per_second, 16.67, 0.01);
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($actual:expr, $expected:expr, $tolerance:expr) => {{
        let actual = $actual as f64;
        let expected = $expected as f64;
        let tolerance = $tolerance as f64;
        if (actual - expected).abs() > tolerance {
            panic!(
                "assertion failed: value `{}` not within {} of `{}`",
                actual, tolerance, expected
            );
        }
    }};
}

/// Assert that a count lies within `expected ± tolerance`.
///
/// Used for request counts of timed runs, which may be off by one at the
/// deadline boundary.
///
/// ```ignore
/// use test_utils::assert_count_near;
///
/// assert_count_near!(outcomes.len(), 20, 1);
/// ```
#[macro_export]
macro_rules! assert_count_near {
    ($actual:expr, $expected:expr, $tolerance:expr) => {{
        let actual = $actual as i64;
        let expected = $expected as i64;
        let tolerance = $tolerance as i64;
        if (actual - expected).abs() > tolerance {
            panic!(
                "assertion failed: count `{}` not within {} of `{}`",
                actual, tolerance, expected
            );
        }
    }};
}
