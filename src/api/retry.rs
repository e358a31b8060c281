//! Request retry policy
//!
//! A fixed number of attempts with a fixed pause between them. Every
//! error is retried the same way.

use backoff::backoff::Backoff;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::config::RetryConfig;
use crate::error::{Error, Result};

/// Constant delay, bounded retry count
#[derive(Debug, Clone)]
struct FixedAttempts {
    retries: u32,
    remaining: u32,
    delay: Duration,
}

impl Backoff for FixedAttempts {
    fn reset(&mut self) {
        self.remaining = self.retries;
    }

    fn next_backoff(&mut self) -> Option<Duration> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        Some(self.delay)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    attempts: u32,
    delay: Duration,
}

impl RetryPolicy {
    /// `attempts` counts the first try; zero is treated as one
    pub fn new(attempts: u32, delay: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            delay,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(config.attempts, Duration::from_millis(config.delay_ms))
    }

    /// Single attempt
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Run `operation` until it succeeds or the attempts are used up.
    /// The last error is returned.
    pub async fn run<T, F, Fut>(&self, what: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let backoff = FixedAttempts {
            retries: self.attempts - 1,
            remaining: self.attempts - 1,
            delay: self.delay,
        };

        backoff::future::retry_notify(
            backoff,
            || {
                let attempt = operation();
                async move { attempt.await.map_err(backoff::Error::transient) }
            },
            |err: Error, wait: Duration| {
                warn!("{} failed: {}. Retrying in {:?}", what, err, wait);
            },
        )
        .await
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}
