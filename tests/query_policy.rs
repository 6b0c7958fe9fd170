//! Retry, backoff and poll-cancellation decisions seen from outside the crate.

use std::ops::ControlFlow;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use resilience_gateway::config::ResilienceConfig;
use resilience_gateway::resilience::{
    FailureClass, FetchKind, PollOutcome, Poller, QueryError, QueryPolicy, RefetchTrigger,
};

#[test]
fn network_errors_are_never_retried() {
    let policy = QueryPolicy::default();
    for error in [
        QueryError::with_code("NETWORK_ERROR"),
        QueryError::with_code("ERR_NETWORK_CHANGED"),
        QueryError::with_message("TypeError: Failed to fetch"),
        QueryError::with_message("connect ECONNREFUSED 127.0.0.1:3000"),
    ] {
        assert_eq!(error.class(), FailureClass::NetworkUnreachable, "{error}");
        assert!(!policy.retry(0, &error), "{error}");
    }
}

#[test]
fn server_errors_get_exactly_one_retry() {
    let policy = QueryPolicy::default();
    let error = QueryError::with_status(500);
    assert!(policy.retry(0, &error));
    assert!(!policy.retry(1, &error));

    // A status wins over any network-looking message.
    let rejected = QueryError {
        status: Some(503),
        code: Some("NETWORK_ERROR".into()),
        message: None,
    };
    assert_eq!(rejected.class(), FailureClass::ServerRejected);
}

#[test]
fn backoff_doubles_then_caps() {
    let policy = QueryPolicy::default();
    assert_eq!(policy.retry_delay(0), Duration::from_secs(1));
    assert_eq!(policy.retry_delay(3), Duration::from_secs(8));
    assert_eq!(policy.retry_delay(10), Duration::from_secs(30));
    assert_eq!(policy.retry_delay(u32::MAX), Duration::from_secs(30));
}

#[test]
fn one_shot_decision_carries_delay() {
    let policy = QueryPolicy::default();
    let first = policy.decide(FetchKind::OneShot, 0, &QueryError::with_status(502));
    assert!(first.retry);
    assert_eq!(first.delay, Duration::from_secs(1));

    let second = policy.decide(FetchKind::OneShot, 1, &QueryError::with_status(502));
    assert!(!second.retry);
}

#[test]
fn implicit_refetch_disabled_by_default() {
    let policy = QueryPolicy::default();
    assert!(!policy.should_refetch_on(RefetchTrigger::WindowFocus));
    assert!(!policy.should_refetch_on(RefetchTrigger::NetworkReconnect));
    assert!(policy.should_refetch_on(RefetchTrigger::Explicit));
}

#[test]
fn policy_follows_configuration() {
    let mut config = ResilienceConfig::default();
    config.query.max_retries = 3;
    config.query.max_delay_ms = 5_000;
    let policy = QueryPolicy::from(&config.query);

    let error = QueryError::with_status(500);
    assert!(policy.retry(2, &error));
    assert!(!policy.retry(3, &error));
    assert_eq!(policy.retry_delay(4), Duration::from_secs(5));
    assert!(!policy.retry(0, &QueryError::with_code("NETWORK_ERROR")));
}

#[tokio::test(start_paused = true)]
async fn status_poll_stops_when_network_drops() {
    let calls = Arc::new(AtomicU32::new(0));
    let seen = Arc::new(AtomicU32::new(0));
    let (c, s) = (calls.clone(), seen.clone());

    let handle = Poller::new(QueryPolicy::default(), Duration::from_secs(30)).spawn(
        move || {
            let n = c.fetch_add(1, Ordering::SeqCst);
            async move {
                match n {
                    0 => Ok("PENDING"),
                    1 => Err(QueryError::with_status(500)),
                    _ => Err(QueryError::with_message("Failed to fetch")),
                }
            }
        },
        move |_| {
            s.fetch_add(1, Ordering::SeqCst);
            ControlFlow::Continue(())
        },
    );

    match handle.join().await {
        PollOutcome::Cancelled(error) => assert_eq!(error.class(), FailureClass::NetworkUnreachable),
        other => panic!("expected cancellation, got {other:?}"),
    }
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(seen.load(Ordering::SeqCst), 1);
}
