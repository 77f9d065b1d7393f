//! Small utilities shared by the test suites.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rand::Rng;

use crate::config::Config;
use crate::error::{ApiError, Result};

const LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Uniform integer between `min` and `max`, both inclusive, in either order.
pub fn random_int(min: i64, max: i64) -> i64 {
    let (low, high) = if min <= max { (min, max) } else { (max, min) };
    rand::thread_rng().gen_range(low..=high)
}

/// Current epoch milliseconds plus a random offset, for preset pet ids.
pub fn generate_unique_id() -> i64 {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default();
    millis + random_int(1, 9999)
}

/// `len` random ASCII letters.
pub fn random_string(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| LETTERS[rng.gen_range(0..LETTERS.len())] as char)
        .collect()
}

pub fn sleep(duration: Duration) {
    std::thread::sleep(duration);
}

/// Fixed attempt count with a fixed delay between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// One attempt plus `config.retries` more.
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_attempts: config.retries + 1,
            ..Self::default()
        }
    }
}

/// Run `op` until it succeeds or `policy.max_attempts` is used up, sleeping
/// `policy.delay` between attempts. The last error is returned unchanged.
/// An attempt is never interrupted; the delay only starts once it finished.
pub fn retry<T, E, F>(policy: &RetryPolicy, mut op: F) -> std::result::Result<T, E>
where
    F: FnMut() -> std::result::Result<T, E>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(e) if attempt >= max_attempts => return Err(e),
            Err(_) => {
                tracing::debug!(attempt, max_attempts, "attempt failed, retrying");
                sleep(policy.delay);
                attempt += 1;
            }
        }
    }
}

pub fn assert_status_code(actual: u16, expected: u16) -> Result<()> {
    if actual != expected {
        return Err(ApiError::UnexpectedStatus { expected, actual });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Environment;

    fn fast(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            delay: Duration::from_millis(1),
        }
    }

    #[test]
    fn random_int_stays_in_bounds() {
        for _ in 0..200 {
            let n = random_int(1, 3);
            assert!((1..=3).contains(&n));
        }
        assert_eq!(random_int(7, 7), 7);
    }

    #[test]
    fn random_int_accepts_reversed_bounds() {
        for _ in 0..200 {
            let n = random_int(5, 1);
            assert!((1..=5).contains(&n));
        }
    }

    #[test]
    fn random_string_uses_letters_only() {
        let s = random_string(32);
        assert_eq!(s.len(), 32);
        assert!(s.chars().all(|c| c.is_ascii_alphabetic()));
        assert!(random_string(0).is_empty());
    }

    #[test]
    fn unique_ids_are_in_the_epoch_millis_range() {
        let id = generate_unique_id();
        assert!(id > 1_600_000_000_000);
    }

    #[test]
    fn retry_returns_first_success() {
        let mut calls = 0;
        let result: std::result::Result<u32, &str> = retry(&fast(3), || {
            calls += 1;
            if calls < 2 {
                Err("flaky")
            } else {
                Ok(calls)
            }
        });
        assert_eq!(result, Ok(2));
        assert_eq!(calls, 2);
    }

    #[test]
    fn retry_returns_last_error_after_exhausting_attempts() {
        let mut calls = 0;
        let result: std::result::Result<(), String> = retry(&fast(3), || {
            calls += 1;
            Err(format!("failure {calls}"))
        });
        assert_eq!(result, Err("failure 3".to_string()));
        assert_eq!(calls, 3);
    }

    #[test]
    fn retry_with_zero_attempts_still_tries_once() {
        let mut calls = 0;
        let _: std::result::Result<(), ()> = retry(&fast(0), || {
            calls += 1;
            Err(())
        });
        assert_eq!(calls, 1);
    }

    #[test]
    fn policy_from_config_adds_one_attempt() {
        let policy = RetryPolicy::from_config(&Config::for_environment(Environment::Production));
        assert_eq!(policy.max_attempts, 3);
        let policy = RetryPolicy::from_config(&Config::for_environment(Environment::Development));
        assert_eq!(policy.max_attempts, 1);
    }

    #[test]
    fn status_assertion() {
        assert!(assert_status_code(200, 200).is_ok());
        let err = assert_status_code(404, 200).unwrap_err();
        assert_eq!(err.to_string(), "Expected status 200 but got 404");
    }
}
