//! Concurrency-safe, append-only sink for outcomes.

use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;

use crate::outcome::Outcome;

/// Outcome store shared by every virtual user of a run.
///
/// Appends take a short async lock on a growable buffer, so no write is
/// lost under any number of concurrent callers. Counters are atomic and can
/// be read without the lock while a run is in progress.
#[derive(Debug, Default)]
pub struct OutcomeStore {
    outcomes: Mutex<Vec<Outcome>>,
    recorded: AtomicU64,
    errors: AtomicU64,
}

impl OutcomeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one outcome.
    pub async fn append(&self, outcome: Outcome) {
        let is_error = outcome.is_error();
        self.outcomes.lock().await.push(outcome);
        self.recorded.fetch_add(1, Ordering::Relaxed);
        if is_error {
            self.errors.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Copy of everything recorded so far.
    ///
    /// Appends racing with the snapshot may or may not be included.
    pub async fn snapshot(&self) -> Vec<Outcome> {
        self.outcomes.lock().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.outcomes.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.outcomes.lock().await.is_empty()
    }

    /// Drop all outcomes and reset the counters.
    pub async fn clear(&self) {
        let mut outcomes = self.outcomes.lock().await;
        outcomes.clear();
        self.recorded.store(0, Ordering::Relaxed);
        self.errors.store(0, Ordering::Relaxed);
    }

    /// Lock-free count of recorded outcomes.
    pub fn recorded(&self) -> u64 {
        self.recorded.load(Ordering::Relaxed)
    }

    /// Lock-free count of recorded failure outcomes.
    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::{OutcomeStatus, RunClock};
    use std::sync::Arc;

    fn outcome(user_id: u32, status: OutcomeStatus) -> Outcome {
        let clock = RunClock::start();
        Outcome {
            user_id,
            step: 0,
            pass: 0,
            started_at: clock.now(),
            ended_at: clock.now(),
            status,
        }
    }

    #[tokio::test]
    async fn test_append_and_snapshot() {
        let store = OutcomeStore::new();
        assert!(store.is_empty().await);

        store.append(outcome(1, OutcomeStatus::Http { code: 200 })).await;
        store
            .append(outcome(
                2,
                OutcomeStatus::Failed {
                    message: "refused".to_string(),
                },
            ))
            .await;

        let snapshot = store.snapshot().await;
        assert_eq!(snapshot.len(), 2);
        assert_eq!(store.recorded(), 2);
        assert_eq!(store.errors(), 1);

        store.clear().await;
        assert_eq!(store.len().await, 0);
        assert_eq!(store.recorded(), 0);
        assert_eq!(store.errors(), 0);
        // Earlier snapshots are unaffected
        assert_eq!(snapshot.len(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_appends_are_not_lost() {
        let store = Arc::new(OutcomeStore::new());
        let mut handles = Vec::new();
        for user in 0..32u32 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                for _ in 0..250 {
                    store.append(outcome(user, OutcomeStatus::Http { code: 200 })).await;
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(store.len().await, 32 * 250);
        assert_eq!(store.recorded(), 32 * 250);
    }
}
