//! Recurring poll driven by [`QueryPolicy`].

use std::future::Future;
use std::ops::ControlFlow;
use std::time::Duration;

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::resilience::classify::QueryError;
use crate::resilience::policy::{FetchKind, QueryPolicy, RefetchTrigger};
use crate::resilience::signals::{Signal, SignalSource};

/// Why a poll stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// The network was unreachable; polling a dead network is pointless.
    Cancelled(QueryError),
    /// Stopped by [`PollHandle::cancel`] or by dropping the handle.
    Stopped,
    /// The data callback asked to stop (terminal data reached).
    Completed,
}

/// Handle to a spawned poll. Dropping it stops the poll.
#[derive(Debug)]
pub struct PollHandle {
    cancel: watch::Sender<bool>,
    task: JoinHandle<PollOutcome>,
}

impl PollHandle {
    /// Stop the poll, aborting an in-flight fetch.
    pub fn cancel(&self) {
        let _ = self.cancel.send(true);
    }

    /// Wait for the poll to end.
    pub async fn join(self) -> PollOutcome {
        let PollHandle { cancel, task } = self;
        let outcome = task.await.unwrap_or(PollOutcome::Stopped);
        drop(cancel);
        outcome
    }
}

/// Fixed-interval poller.
pub struct Poller {
    policy: QueryPolicy,
    interval: Duration,
    signals: Option<broadcast::Receiver<Signal>>,
}

impl Poller {
    pub fn new(policy: QueryPolicy, interval: Duration) -> Self {
        Self {
            policy,
            interval,
            signals: None,
        }
    }

    /// Listen for focus/connectivity signals. They only trigger a refetch
    /// when the policy allows it.
    pub fn with_signals(mut self, source: &dyn SignalSource) -> Self {
        self.signals = Some(source.subscribe());
        self
    }

    /// Spawn the poll loop. `fetch` runs on every tick, `on_data` receives
    /// each successful result.
    pub fn spawn<F, Fut, T, S>(self, fetch: F, on_data: S) -> PollHandle
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, QueryError>> + Send + 'static,
        S: FnMut(T) -> ControlFlow<()> + Send + 'static,
        T: Send + 'static,
    {
        let (cancel, cancel_rx) = watch::channel(false);
        let task = tokio::spawn(self.run(fetch, on_data, cancel_rx));
        PollHandle { cancel, task }
    }

    async fn run<F, Fut, T, S>(
        mut self,
        mut fetch: F,
        mut on_data: S,
        mut cancel: watch::Receiver<bool>,
    ) -> PollOutcome
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, QueryError>>,
        S: FnMut(T) -> ControlFlow<()>,
    {
        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut failures = 0u32;

        loop {
            let trigger = tokio::select! {
                _ = cancel.changed() => return PollOutcome::Stopped,
                _ = ticker.tick() => RefetchTrigger::Interval,
                signal = next_signal(&mut self.signals) => match signal {
                    Signal::WindowFocus => RefetchTrigger::WindowFocus,
                    Signal::Online => RefetchTrigger::NetworkReconnect,
                    Signal::Offline => continue,
                },
            };

            if !self.policy.should_refetch_on(trigger) {
                tracing::debug!(?trigger, "Implicit refetch suppressed");
                continue;
            }

            let result = tokio::select! {
                _ = cancel.changed() => {
                    tracing::debug!("Poll cancelled mid-flight");
                    return PollOutcome::Stopped;
                }
                result = fetch() => result,
            };

            match result {
                Ok(data) => {
                    failures = 0;
                    if on_data(data).is_break() {
                        tracing::debug!("Poll reached terminal data");
                        return PollOutcome::Completed;
                    }
                }
                Err(error) => {
                    let decision = self.policy.decide(
                        FetchKind::Poll { interval: self.interval },
                        failures,
                        &error,
                    );
                    if !decision.retry {
                        tracing::warn!(error = %error, "Network unreachable, cancelling poll");
                        return PollOutcome::Cancelled(error);
                    }
                    failures = failures.saturating_add(1);
                }
            }
        }
    }
}

async fn next_signal(signals: &mut Option<broadcast::Receiver<Signal>>) -> Signal {
    loop {
        match signals {
            Some(rx) => match rx.recv().await {
                Ok(signal) => return signal,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => *signals = None,
            },
            None => std::future::pending::<()>().await,
        }
    }
}
