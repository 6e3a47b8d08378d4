//! Retry policies.
//!
//! Retries happen inside the isolation envelope: every attempt of one
//! invocation shares the same execution-timeout budget.

use std::time::Duration;

use crate::{ClientError, RetryPolicy, RetryState, Retryer};

/// Exponential back-off retryer.
///
/// Only errors classified [`RetryPolicy::Retryable`] are retried. The delay
/// starts at `period` and grows by 1.5x per attempt up to `max_period`; a
/// server-supplied `Retry-After` replaces the computed delay but is still
/// capped by `max_period`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefaultRetryer {
    period: Duration,
    max_period: Duration,
    max_attempts: u32,
}

impl DefaultRetryer {
    pub const DEFAULT_PERIOD: Duration = Duration::from_millis(100);
    pub const DEFAULT_MAX_PERIOD: Duration = Duration::from_secs(1);
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

    /// `max_attempts` counts the first attempt; 1 means never retry.
    pub fn new(period: Duration, max_period: Duration, max_attempts: u32) -> Self {
        Self {
            period,
            max_period: max_period.max(period),
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}

impl Default for DefaultRetryer {
    fn default() -> Self {
        Self::new(
            Self::DEFAULT_PERIOD,
            Self::DEFAULT_MAX_PERIOD,
            Self::DEFAULT_MAX_ATTEMPTS,
        )
    }
}

impl Retryer for DefaultRetryer {
    fn start(&self) -> Box<dyn RetryState> {
        Box::new(BackoffState {
            config: *self,
            attempt: 1,
        })
    }
}

struct BackoffState {
    config: DefaultRetryer,
    attempt: u32,
}

impl BackoffState {
    // period * 1.5^(attempt - 1), in integer nanoseconds.
    fn backoff(&self) -> Duration {
        let n = self.attempt - 1;
        let scaled = 3u128
            .checked_pow(n)
            .and_then(|num| self.config.period.as_nanos().checked_mul(num))
            .map(|product| product >> n);
        match scaled.and_then(|nanos| u64::try_from(nanos).ok()) {
            Some(nanos) => Duration::from_nanos(nanos).min(self.config.max_period),
            None => self.config.max_period,
        }
    }
}

impl RetryState for BackoffState {
    fn next_delay(&mut self, error: &ClientError) -> Option<Duration> {
        let hint = match error.retry_policy() {
            RetryPolicy::NonRetryable => return None,
            RetryPolicy::Retryable { after } => after,
        };
        if self.attempt >= self.config.max_attempts {
            return None;
        }
        let delay = match hint {
            Some(after) => after.min(self.config.max_period),
            None => self.backoff(),
        };
        self.attempt += 1;
        Some(delay)
    }
}

/// Never retries.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverRetry;

impl Retryer for NeverRetry {
    fn start(&self) -> Box<dyn RetryState> {
        Box::new(NeverRetry)
    }
}

impl RetryState for NeverRetry {
    fn next_delay(&mut self, _error: &ClientError) -> Option<Duration> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CommandKey, DecodeError, TransportError};

    fn transport_error() -> ClientError {
        ClientError::Transport {
            command_key: CommandKey::new("Vehicles#list()").unwrap(),
            source: TransportError::Io {
                message: "reset".into(),
            },
        }
    }

    #[test]
    fn backs_off_exponentially_and_stops_after_max_attempts() {
        let mut state = DefaultRetryer::default().start();
        let delays: Vec<_> = std::iter::from_fn(|| state.next_delay(&transport_error())).collect();
        assert_eq!(
            delays,
            [
                Duration::from_millis(100),
                Duration::from_millis(150),
                Duration::from_millis(225),
                Duration::from_micros(337_500),
            ]
        );
    }

    #[test]
    fn delay_is_capped_by_max_period() {
        let retryer = DefaultRetryer::new(Duration::from_millis(800), Duration::from_secs(1), 4);
        let mut state = retryer.start();
        state.next_delay(&transport_error());
        assert_eq!(state.next_delay(&transport_error()), Some(Duration::from_secs(1)));
    }

    #[test]
    fn each_invocation_starts_fresh() {
        let retryer = DefaultRetryer::new(Duration::from_millis(10), Duration::from_secs(1), 2);
        let mut first = retryer.start();
        assert!(first.next_delay(&transport_error()).is_some());
        assert!(first.next_delay(&transport_error()).is_none());
        assert!(retryer.start().next_delay(&transport_error()).is_some());
    }

    #[test]
    fn non_retryable_errors_are_surfaced() {
        let decode = ClientError::Decode {
            command_key: CommandKey::new("Vehicles#list()").unwrap(),
            source: DecodeError::new("bad"),
        };
        assert!(DefaultRetryer::default().start().next_delay(&decode).is_none());
        assert!(NeverRetry.start().next_delay(&transport_error()).is_none());
    }
}
