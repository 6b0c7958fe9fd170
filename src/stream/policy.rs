//! Reconnect delay schedules.

use std::time::Duration;

use crate::config::{ReconnectConfig, ReconnectStrategy};
use crate::resilience::backoff::calculate_backoff;

/// Delay schedule between consecutive failed connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    Immediate,
    Fixed { delay: Duration },
    /// `step * failures`.
    Linear { step: Duration },
    /// `base * 2^(failures - 1)` capped at `max`, plus up to 10% jitter.
    Exponential { base: Duration, max: Duration },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub backoff: Backoff,
    /// Consecutive connection attempts before the client gives up.
    /// `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl ReconnectPolicy {
    pub fn immediate() -> Self {
        Self {
            backoff: Backoff::Immediate,
            max_attempts: None,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    /// Delay before the next attempt after `failures` consecutive failed or
    /// dropped connections, or `None` once the attempt budget is spent.
    pub fn next_delay(&self, failures: u32) -> Option<Duration> {
        if let Some(max) = self.max_attempts {
            if failures >= max {
                return None;
            }
        }
        let delay = match self.backoff {
            Backoff::Immediate => Duration::ZERO,
            Backoff::Fixed { delay } => delay,
            Backoff::Linear { step } => step.saturating_mul(failures),
            Backoff::Exponential { base, max } => {
                calculate_backoff(failures, base.as_millis() as u64, max.as_millis() as u64)
            }
        };
        Some(delay)
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        ReconnectPolicy::from(&ReconnectConfig::default())
    }
}

impl From<&ReconnectConfig> for ReconnectPolicy {
    fn from(config: &ReconnectConfig) -> Self {
        let base = Duration::from_millis(config.base_delay_ms);
        let backoff = match config.strategy {
            ReconnectStrategy::Immediate => Backoff::Immediate,
            ReconnectStrategy::Fixed => Backoff::Fixed { delay: base },
            ReconnectStrategy::Linear => Backoff::Linear { step: base },
            ReconnectStrategy::Exponential => Backoff::Exponential {
                base,
                max: Duration::from_millis(config.max_delay_ms),
            },
        };
        Self {
            backoff,
            max_attempts: config.max_attempts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_matches_two_second_steps() {
        let policy = ReconnectPolicy::from(&ReconnectConfig {
            strategy: ReconnectStrategy::Linear,
            base_delay_ms: 2000,
            max_attempts: Some(5),
            ..ReconnectConfig::default()
        });
        assert_eq!(policy.next_delay(1), Some(Duration::from_secs(2)));
        assert_eq!(policy.next_delay(4), Some(Duration::from_secs(8)));
        assert_eq!(policy.next_delay(5), None);
    }

    #[test]
    fn exponential_is_capped() {
        let policy = ReconnectPolicy {
            backoff: Backoff::Exponential {
                base: Duration::from_millis(100),
                max: Duration::from_millis(1000),
            },
            max_attempts: None,
        };
        let first = policy.next_delay(1).unwrap();
        assert!(first >= Duration::from_millis(100) && first <= Duration::from_millis(110));
        let late = policy.next_delay(20).unwrap();
        assert!(late >= Duration::from_millis(1000) && late <= Duration::from_millis(1100));
    }

    #[test]
    fn immediate_and_fixed() {
        assert_eq!(ReconnectPolicy::immediate().next_delay(7), Some(Duration::ZERO));
        let fixed = ReconnectPolicy {
            backoff: Backoff::Fixed { delay: Duration::from_millis(500) },
            max_attempts: None,
        };
        assert_eq!(fixed.next_delay(1), fixed.next_delay(9));
    }

    #[test]
    fn max_attempts_counts_consecutive_attempts() {
        let policy = ReconnectPolicy::immediate().with_max_attempts(3);
        assert!(policy.next_delay(2).is_some());
        assert!(policy.next_delay(3).is_none());
    }

    #[test]
    fn default_follows_config_default() {
        assert!(matches!(ReconnectPolicy::default().backoff, Backoff::Exponential { .. }));
        assert_eq!(ReconnectPolicy::default().max_attempts, None);
    }
}
