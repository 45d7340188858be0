use std::time::Duration;

use log::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    Fixed(Duration),
    Exponential { initial: Duration, max: Duration },
}

impl Backoff {
    /// Delay before retry number `retry` (1 for the first retry).
    pub fn delay_for(&self, retry: u32) -> Duration {
        match *self {
            Self::Fixed(delay) => delay,
            Self::Exponential { initial, max } => {
                let factor = 1_u32
                    .checked_shl(retry.saturating_sub(1))
                    .unwrap_or(u32::MAX);
                initial.saturating_mul(factor).min(max)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Backoff,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryExhausted<E> {
    pub attempts: u32,
    pub last_error: E,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// `retries` extra attempts after the first, `delay` apart.
    pub fn fixed(retries: u32, delay: Duration) -> Self {
        Self::new(retries.saturating_add(1), Backoff::Fixed(delay))
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn backoff(&self) -> Backoff {
        self.backoff
    }

    /// Runs `op` until it succeeds or the attempts are used up, calling
    /// `sleep` with the backoff delay between attempts. `op` receives the
    /// zero-based attempt number.
    pub fn run<T, E, S, F>(&self, mut sleep: S, mut op: F) -> Result<T, RetryExhausted<E>>
    where
        E: std::fmt::Display,
        S: FnMut(Duration),
        F: FnMut(u32) -> Result<T, E>,
    {
        let mut attempt = 0;
        loop {
            match op(attempt) {
                Ok(value) => return Ok(value),
                Err(err) => {
                    attempt += 1;
                    if attempt >= self.max_attempts {
                        return Err(RetryExhausted {
                            attempts: attempt,
                            last_error: err,
                        });
                    }
                    warn!(
                        "attempt {attempt}/{} failed: {err}; retrying",
                        self.max_attempts
                    );
                    sleep(self.backoff.delay_for(attempt));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_policy_counts_first_attempt() {
        let policy = RetryPolicy::fixed(2, Duration::from_millis(500));
        assert_eq!(policy.max_attempts(), 3);
        assert_eq!(RetryPolicy::new(0, Backoff::Fixed(Duration::ZERO)).max_attempts(), 1);
    }

    #[test]
    fn exponential_backoff_doubles_and_caps() {
        let backoff = Backoff::Exponential {
            initial: Duration::from_millis(100),
            max: Duration::from_millis(350),
        };
        assert_eq!(backoff.delay_for(1), Duration::from_millis(100));
        assert_eq!(backoff.delay_for(2), Duration::from_millis(200));
        assert_eq!(backoff.delay_for(3), Duration::from_millis(350));
        assert_eq!(backoff.delay_for(40), Duration::from_millis(350));
    }

    #[test]
    fn succeeds_after_transient_failures() {
        let policy = RetryPolicy::fixed(2, Duration::from_millis(500));
        let mut sleeps = Vec::new();
        let result = policy.run(
            |delay| sleeps.push(delay),
            |attempt| if attempt < 2 { Err("boom") } else { Ok(attempt) },
        );
        assert_eq!(result, Ok(2));
        assert_eq!(sleeps, vec![Duration::from_millis(500); 2]);
    }

    #[test]
    fn reports_last_error_when_exhausted() {
        let policy = RetryPolicy::fixed(2, Duration::from_millis(500));
        let mut calls = 0;
        let result: Result<(), _> = policy.run(
            |_| {},
            |attempt| {
                calls += 1;
                Err(format!("failure {attempt}"))
            },
        );
        assert_eq!(calls, 3);
        assert_eq!(
            result,
            Err(RetryExhausted {
                attempts: 3,
                last_error: "failure 2".to_string(),
            })
        );
    }

    #[test]
    fn no_sleep_after_first_success() {
        let policy = RetryPolicy::fixed(2, Duration::from_millis(500));
        let mut slept = false;
        let result: Result<u8, RetryExhausted<&str>> = policy.run(|_| slept = true, |_| Ok(7));
        assert_eq!(result, Ok(7));
        assert!(!slept);
    }
}
