//! Query retry and polling policy.
//!
//! The policy is a pure decision object consumed by whatever orchestrates
//! data fetching. It never sleeps or schedules anything itself.

use std::time::Duration;

use crate::config::QueryConfig;
use crate::observability::metrics;
use crate::resilience::backoff::exponential_delay;
use crate::resilience::classify::{FailureClass, QueryError};

/// Kind of fetch being evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchKind {
    /// A single request issued by the caller.
    OneShot,
    /// A recurring poll with its own interval.
    Poll { interval: Duration },
}

/// What triggered a potential refetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefetchTrigger {
    WindowFocus,
    NetworkReconnect,
    Interval,
    Explicit,
}

/// Outcome of evaluating one failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryDecision {
    pub retry: bool,
    pub delay: Duration,
}

impl RetryDecision {
    pub fn give_up() -> Self {
        Self {
            retry: false,
            delay: Duration::ZERO,
        }
    }

    pub fn after(delay: Duration) -> Self {
        Self { retry: true, delay }
    }
}

/// Retry/backoff/poll-cancellation policy.
///
/// Defaults: one retry for one-shot fetches, `min(1000 * 2^attempt, 30000)`
/// ms between attempts, no implicit refetch on window focus or network
/// reconnect.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub refetch_on_window_focus: bool,
    /// When `false`, data stays stale after connectivity returns until the
    /// next poll tick or an explicit refresh.
    pub refetch_on_reconnect: bool,
}

impl Default for QueryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 1,
            base_delay_ms: 1000,
            max_delay_ms: 30_000,
            refetch_on_window_focus: false,
            refetch_on_reconnect: false,
        }
    }
}

impl From<&QueryConfig> for QueryPolicy {
    fn from(config: &QueryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay_ms: config.base_delay_ms,
            max_delay_ms: config.max_delay_ms,
            refetch_on_window_focus: config.refetch_on_window_focus,
            refetch_on_reconnect: config.refetch_on_reconnect,
        }
    }
}

impl QueryPolicy {
    /// Should a one-shot fetch that has failed `failure_count` times before
    /// this failure be retried?
    pub fn retry(&self, failure_count: u32, error: &QueryError) -> bool {
        match error.class() {
            FailureClass::NetworkUnreachable => false,
            FailureClass::ServerRejected | FailureClass::Other => failure_count < self.max_retries,
        }
    }

    /// Delay before retry number `attempt`.
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        exponential_delay(attempt, self.base_delay_ms, self.max_delay_ms)
    }

    /// Should a recurring poll be cancelled after `error`?
    pub fn poll_cancel(&self, error: &QueryError) -> bool {
        error.class() == FailureClass::NetworkUnreachable
    }

    /// Whether an implicit trigger may start a refetch.
    pub fn should_refetch_on(&self, trigger: RefetchTrigger) -> bool {
        match trigger {
            RefetchTrigger::WindowFocus => self.refetch_on_window_focus,
            RefetchTrigger::NetworkReconnect => self.refetch_on_reconnect,
            RefetchTrigger::Interval | RefetchTrigger::Explicit => true,
        }
    }

    /// Full decision for one failed attempt.
    pub fn decide(&self, kind: FetchKind, attempt: u32, error: &QueryError) -> RetryDecision {
        let class = error.class();
        let decision = match kind {
            FetchKind::OneShot => {
                if self.retry(attempt, error) {
                    RetryDecision::after(self.retry_delay(attempt))
                } else {
                    RetryDecision::give_up()
                }
            }
            FetchKind::Poll { interval } => {
                if self.poll_cancel(error) {
                    RetryDecision::give_up()
                } else {
                    RetryDecision::after(interval)
                }
            }
        };

        metrics::record_retry_decision(class.as_str(), decision.retry);
        tracing::debug!(
            class = class.as_str(),
            ?kind,
            attempt,
            retry = decision.retry,
            delay_ms = decision.delay.as_millis() as u64,
            error = %error,
            "Evaluated fetch failure"
        );
        decision
    }
}
