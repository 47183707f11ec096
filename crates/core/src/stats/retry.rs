//! Fixed-delay retry loop for stats calls.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

use crate::config::StatsConfig;
use crate::metrics;

use super::StatsError;

/// How a failing stats call is retried.
///
/// Timeouts wait `timeout_delay`, every other error waits `error_delay`.
/// The delay never grows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub timeout_delay: Duration,
    pub error_delay: Duration,
    /// `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl RetryPolicy {
    /// Retry immediately, forever. Mostly for tests.
    pub fn immediate() -> Self {
        Self {
            timeout_delay: Duration::ZERO,
            error_delay: Duration::ZERO,
            max_attempts: None,
        }
    }

    fn delay_for(&self, error: &StatsError) -> Duration {
        if error.is_timeout() {
            self.timeout_delay
        } else {
            self.error_delay
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            timeout_delay: Duration::from_secs(10),
            error_delay: Duration::from_secs(15),
            max_attempts: None,
        }
    }
}

impl From<&StatsConfig> for RetryPolicy {
    fn from(config: &StatsConfig) -> Self {
        Self {
            timeout_delay: Duration::from_secs(config.timeout_retry_delay_secs),
            error_delay: Duration::from_secs(config.error_retry_delay_secs),
            max_attempts: config.max_attempts,
        }
    }
}

/// Run `op` until it succeeds.
///
/// `label` identifies the call in log lines, e.g. `"team 1610612737"`.
pub async fn retry_until_ok<T, F, Fut>(
    label: &str,
    policy: &RetryPolicy,
    mut op: F,
) -> Result<T, StatsError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StatsError>>,
{
    let mut attempts: u32 = 0;

    loop {
        attempts += 1;
        let error = match op().await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        if policy.max_attempts.is_some_and(|max| attempts >= max) {
            return Err(StatsError::Exhausted {
                attempts,
                last_error: error.to_string(),
            });
        }

        let delay = policy.delay_for(&error);
        if error.is_timeout() {
            metrics::FETCH_RETRIES.with_label_values(&["timeout"]).inc();
            warn!(
                call = label,
                attempt = attempts,
                "Timeout fetching {}. Retrying in {}s...",
                label,
                delay.as_secs()
            );
        } else {
            metrics::FETCH_RETRIES.with_label_values(&["error"]).inc();
            warn!(
                call = label,
                attempt = attempts,
                error = %error,
                "Error fetching {}: {}. Retrying in {}s...",
                label,
                error,
                delay.as_secs()
            );
        }

        sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_returns_first_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let value = retry_until_ok("ok", &RetryPolicy::immediate(), || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, StatsError>(7)
            }
        })
        .await
        .unwrap();

        assert_eq!(value, 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retries_through_mixed_errors() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let value = retry_until_ok("flaky", &RetryPolicy::immediate(), || {
            let counter = Arc::clone(&counter);
            async move {
                match counter.fetch_add(1, Ordering::SeqCst) {
                    0 => Err(StatsError::Timeout),
                    1 => Err(StatsError::Connection("reset".to_string())),
                    2 => Err(StatsError::Api {
                        status: 500,
                        message: "boom".to_string(),
                    }),
                    _ => Ok("done"),
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(value, "done");
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_max_attempts_gives_up() {
        let policy = RetryPolicy {
            max_attempts: Some(3),
            ..RetryPolicy::immediate()
        };
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let err = retry_until_ok("down", &policy, || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(StatsError::Timeout)
            }
        })
        .await
        .unwrap_err();

        assert!(matches!(err, StatsError::Exhausted { attempts: 3, .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_delay_selection() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(&StatsError::Timeout), Duration::from_secs(10));
        assert_eq!(
            policy.delay_for(&StatsError::Parse("bad".to_string())),
            Duration::from_secs(15)
        );
        assert!(policy.max_attempts.is_none());
    }

    #[test]
    fn test_policy_from_config() {
        let config = StatsConfig {
            timeout_retry_delay_secs: 1,
            error_retry_delay_secs: 2,
            max_attempts: Some(4),
            ..StatsConfig::default()
        };
        let policy = RetryPolicy::from(&config);
        assert_eq!(policy.timeout_delay, Duration::from_secs(1));
        assert_eq!(policy.error_delay, Duration::from_secs(2));
        assert_eq!(policy.max_attempts, Some(4));
    }
}
