//! Bounded retries around engine work.

use std::fmt::Display;
use tracing::error;

/// Runs a unit of work up to `max_attempts` times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3 }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self { max_attempts }
    }

    /// Number of attempts actually made; always at least one.
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Calls `work` with the 1-based attempt number until it succeeds or the
    /// attempts are used up. Every failure is logged; the last one is returned.
    pub fn run<T, E, F>(&self, mut work: F) -> Result<T, E>
    where
        E: Display,
        F: FnMut(u32) -> Result<T, E>,
    {
        let attempts = self.attempts();
        let mut attempt = 1;
        loop {
            match work(attempt) {
                Ok(value) => return Ok(value),
                Err(e) if attempt < attempts => {
                    error!(attempt, attempts, "analysis failed, retrying: {}", e);
                    attempt += 1;
                }
                Err(e) => {
                    error!(attempt, attempts, "analysis failed, giving up: {}", e);
                    return Err(e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failing_until(successful_attempt: u32) -> impl FnMut(u32) -> Result<u32, String> {
        move |attempt| {
            if attempt >= successful_attempt {
                Ok(attempt)
            } else {
                Err(format!("failure {}", attempt))
            }
        }
    }

    #[test]
    fn test_succeeds_after_r_minus_one_failures() {
        let policy = RetryPolicy::new(3);
        assert_eq!(policy.run(failing_until(3)), Ok(3));
    }

    #[test]
    fn test_r_failures_propagate_last_error() {
        let policy = RetryPolicy::new(3);
        assert_eq!(policy.run(failing_until(4)), Err("failure 3".to_string()));
    }

    #[test]
    fn test_first_success_stops() {
        let mut calls = 0;
        let result: Result<(), String> = RetryPolicy::new(5).run(|_| {
            calls += 1;
            Ok(())
        });
        assert!(result.is_ok());
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_zero_attempts_still_runs_once() {
        let policy = RetryPolicy::new(0);
        assert_eq!(policy.attempts(), 1);
        assert_eq!(policy.run(failing_until(2)), Err("failure 1".to_string()));
    }
}
