//! Load test configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{SurgeError, SurgeResult};

/// Immutable settings for one load test run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadConfig {
    /// Number of concurrent virtual users
    pub users: u32,
    /// Total wall-clock duration of the run
    pub duration: Duration,
    /// Fixed pause before every step
    pub think_time: Duration,
    /// Upper bound of the random pause added on top of `think_time`
    pub think_jitter: Duration,
    /// Optional seed for reproducible think-time jitter
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            users: 1,
            duration: Duration::from_secs(120),
            think_time: Duration::from_secs(1),
            think_jitter: Duration::from_secs(1),
            seed: None,
        }
    }
}

impl LoadConfig {
    /// Validate configuration.
    pub fn validate(&self) -> SurgeResult<()> {
        if self.users == 0 {
            return Err(SurgeError::InvalidUserCount(self.users));
        }
        Ok(())
    }

    /// Seed for the jitter generator of one user, if the run is seeded.
    ///
    /// Every user gets a different but reproducible stream.
    pub fn user_seed(&self, user_id: u32) -> Option<u64> {
        self.seed.map(|seed| {
            seed ^ (u64::from(user_id)).wrapping_mul(0x9E37_79B9_7F4A_7C15)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = LoadConfig::default();
        assert_eq!(config.users, 1);
        assert_eq!(config.duration, Duration::from_secs(120));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_users_rejected() {
        let config = LoadConfig {
            users: 0,
            ..LoadConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(SurgeError::InvalidUserCount(0))
        ));
    }

    #[test]
    fn test_user_seeds_differ_per_user() {
        let config = LoadConfig {
            seed: Some(42),
            ..LoadConfig::default()
        };
        let a = config.user_seed(1).unwrap();
        let b = config.user_seed(2).unwrap();
        assert_ne!(a, b);
        assert_eq!(config.user_seed(1), Some(a));
        assert_eq!(LoadConfig::default().user_seed(1), None);
    }
}
