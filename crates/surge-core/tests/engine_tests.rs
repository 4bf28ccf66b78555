//! End-to-end engine behaviour over the deterministic stub transport.
//!
//! All tests run on tokio's paused clock, so timings are exact.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use surge_core::{
    LoadConfig, LoadTest, ScenarioBuilder, Step, StepChain, StepError, StepRequest, StepResponse,
    StubTransportFactory, SurgeError,
};
use test_utils::assert_count_near;

fn get(
    url: &'static str,
) -> impl Fn(Option<&StepResponse>) -> Result<StepRequest, StepError> + Send + Sync + 'static {
    move |_| Ok(StepRequest::get(url))
}

// ============================================================================
// Deadline behaviour
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_elapsed_deadline_records_nothing() {
    let test = ScenarioBuilder::new()
        .with_users(8)
        .with_duration(Duration::ZERO)
        .with_think_time(Duration::from_millis(10))
        .with_random_think_time(Duration::ZERO)
        .with_transport(StubTransportFactory::ok())
        .then(get("http://x/a"))
        .build()
        .unwrap();

    let stats = test.run().await.unwrap();

    assert_eq!(stats.users_started, 8);
    assert_eq!(stats.steps_executed, 0);
    assert!(test.outcomes().await.is_empty());
    let summary = test.summary().await;
    assert_eq!(summary.total_requests, 0);
    assert_eq!(summary.total_errors, 0);
    assert_eq!(summary.average_duration_ms, 0.0);
    assert!(summary.status_counts.is_empty());
    assert!(summary.error_counts.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_single_user_count_tracks_duration_over_think_time() {
    let duration = Duration::from_secs(3);
    let think = Duration::from_millis(150);
    let test = ScenarioBuilder::new()
        .with_users(1)
        .with_duration(duration)
        .with_think_time(think)
        .with_random_think_time(Duration::ZERO)
        .with_transport(StubTransportFactory::ok())
        .then(get("http://x/a"))
        .build()
        .unwrap();

    test.run().await.unwrap();

    let expected = duration.as_millis() / think.as_millis();
    assert_count_near!(test.outcomes().await.len(), expected, 1);
}

#[tokio::test(start_paused = true)]
async fn test_run_returns_only_after_in_flight_requests() {
    let test = ScenarioBuilder::new()
        .with_users(3)
        .with_duration(Duration::from_millis(200))
        .with_think_time(Duration::from_millis(150))
        .with_random_think_time(Duration::ZERO)
        .with_transport(StubTransportFactory::ok().with_latency(Duration::from_millis(400)))
        .then(get("http://x/slow"))
        .build()
        .unwrap();

    let start = tokio::time::Instant::now();
    let stats = test.run().await.unwrap();

    // Each user starts one request at 150ms which completes at 550ms
    assert_eq!(start.elapsed(), Duration::from_millis(550));
    assert_eq!(stats.steps_executed, 3);
    assert_eq!(test.outcomes().await.len(), 3);
}

// ============================================================================
// Chained steps
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_chained_steps_are_ordered_per_user_and_pass() {
    let factory = Arc::new(StubTransportFactory::echo(200).with_latency(Duration::from_millis(7)));
    let chain = StepChain::new(vec![
        Step::new("get-a", |_| {
            StepRequest::get("http://x/a").with_json(&serde_json::json!({"from": "a"}))
        }),
        Step::new("post-b", |prev| {
            let prev = prev.ok_or_else(|| StepError::build("missing /a response"))?;
            Ok(StepRequest::post("http://x/b").with_json_body_from(prev))
        }),
    ])
    .unwrap();
    let config = LoadConfig {
        users: 5,
        duration: Duration::from_secs(2),
        think_time: Duration::from_millis(100),
        think_jitter: Duration::ZERO,
        seed: None,
    };
    let test = LoadTest::new(chain, config).unwrap().with_transport(factory.clone());

    test.run().await.unwrap();
    let outcomes = test.outcomes().await;
    assert!(!outcomes.is_empty());

    let mut by_pass: HashMap<(u32, u64), Vec<&surge_core::Outcome>> = HashMap::new();
    for outcome in &outcomes {
        assert!(outcome.duration() >= chrono::Duration::zero());
        assert!(!outcome.is_error());
        by_pass
            .entry((outcome.user_id, outcome.pass))
            .or_default()
            .push(outcome);
    }

    for ((user, pass), steps) in &by_pass {
        let first = steps.iter().find(|o| o.step == 0);
        let second = steps.iter().find(|o| o.step == 1);
        if let (Some(first), Some(second)) = (first, second) {
            assert!(
                second.started_at > first.ended_at,
                "user {} pass {}: step 2 started before step 1 ended",
                user,
                pass
            );
        }
    }

    // Every POST carried the body returned by the GET
    let sent = factory.sent_requests().await;
    for (_, request) in sent.iter().filter(|(_, r)| r.url.ends_with("/b")) {
        assert_eq!(request.body.as_deref(), Some(&br#"{"from":"a"}"#[..]));
    }
}

#[tokio::test(start_paused = true)]
async fn test_outcomes_of_one_user_strictly_ordered() {
    let test = ScenarioBuilder::new()
        .with_users(4)
        .with_duration(Duration::from_secs(1))
        .with_think_time(Duration::from_millis(20))
        .with_random_think_time(Duration::from_millis(30))
        .with_seed(11)
        .with_transport(StubTransportFactory::ok().with_latency(Duration::from_millis(3)))
        .then(get("http://x/a"))
        .then(get("http://x/b"))
        .then(get("http://x/c"))
        .build()
        .unwrap();

    test.run().await.unwrap();
    let outcomes = test.outcomes().await;

    for user in 1..=4 {
        let mine: Vec<_> = outcomes.iter().filter(|o| o.user_id == user).collect();
        assert!(!mine.is_empty());
        for pair in mine.windows(2) {
            assert!(pair[1].started_at > pair[0].ended_at);
        }
    }
}

// ============================================================================
// Failure isolation
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_unreachable_target_yields_full_error_summary() {
    let test = ScenarioBuilder::new()
        .with_users(3)
        .with_duration(Duration::from_millis(1000))
        .with_think_time(Duration::from_millis(100))
        .with_random_think_time(Duration::ZERO)
        .with_transport(StubTransportFactory::failing("connection refused"))
        .then(get("http://x/a"))
        .then(get("http://x/b"))
        .build()
        .unwrap();

    test.run().await.unwrap();
    let summary = test.summary().await;

    assert!(summary.total_requests > 0);
    assert_eq!(summary.total_errors, summary.total_requests);
    assert_eq!(summary.error_rate(), 100.0);
    assert!(summary.status_counts.is_empty());
    assert_eq!(
        summary.error_counts.get("Request failed: connection refused"),
        Some(&summary.total_requests)
    );
}

#[tokio::test(start_paused = true)]
async fn test_panicking_step_does_not_stop_user() {
    let test = ScenarioBuilder::new()
        .with_users(2)
        .with_duration(Duration::from_millis(1050))
        .with_think_time(Duration::from_millis(100))
        .with_random_think_time(Duration::ZERO)
        .with_transport(StubTransportFactory::ok())
        .then(get("http://x/a"))
        .then(|_| panic!("template exploded"))
        .build()
        .unwrap();

    let stats = test.run().await.unwrap();
    assert_eq!(stats.users_failed, 0);

    let summary = test.summary().await;
    // Ten steps per user: five passes, each with one success and one failure
    assert_eq!(summary.total_requests, 20);
    assert_eq!(summary.total_errors, 10);
    assert_eq!(summary.status_counts.get(&200), Some(&10));
    assert_eq!(
        summary.error_counts.get("Request factory panicked: template exploded"),
        Some(&10)
    );
}

#[tokio::test(start_paused = true)]
async fn test_summary_invariants_hold_for_mixed_run() {
    let test = ScenarioBuilder::new()
        .with_users(5)
        .with_duration(Duration::from_secs(2))
        .with_think_time(Duration::from_millis(50))
        .with_random_think_time(Duration::from_millis(50))
        .with_seed(3)
        .with_transport(StubTransportFactory::respond(503, "busy").with_latency(Duration::from_millis(4)))
        .then(get("http://x/a"))
        .then(|prev| match prev {
            Some(r) if r.is_success() => Ok(StepRequest::get("http://x/b")),
            _ => Err(StepError::build("upstream not ready")),
        })
        .build()
        .unwrap();

    test.run().await.unwrap();
    let outcomes = test.outcomes().await;
    let summary = surge_core::summarize(&outcomes);

    assert_eq!(summary.total_requests, outcomes.len() as u64);
    assert_eq!(summary.total_requests, summary.success_count() + summary.total_errors);
    let status_total: u64 = summary.status_counts.values().sum();
    assert_eq!(status_total, summary.total_requests - summary.total_errors);
    assert!(!summary.error_counts.contains_key(""));
    assert!(summary.average_duration_ms >= summary.min_duration_ms);
    assert!(summary.average_duration_ms <= summary.max_duration_ms);
    assert_eq!(summarize_twice(&outcomes), (summary.clone(), summary));
}

fn summarize_twice(outcomes: &[surge_core::Outcome]) -> (surge_core::Summary, surge_core::Summary) {
    (surge_core::summarize(outcomes), surge_core::summarize(outcomes))
}

// ============================================================================
// Configuration errors
// ============================================================================

#[test]
fn test_configuration_errors_fail_fast() {
    assert!(matches!(
        ScenarioBuilder::new().build(),
        Err(SurgeError::EmptyChain)
    ));
    assert!(matches!(
        ScenarioBuilder::new().with_users(0).then(get("http://x")).build(),
        Err(SurgeError::InvalidUserCount(0))
    ));
}
