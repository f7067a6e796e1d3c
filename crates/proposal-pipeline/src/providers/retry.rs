//! Bounded retry on rate limiting

use async_trait::async_trait;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

use crate::config::RetryConfig;
use crate::error::{Error, Result};

use super::llm::{CompletionProvider, CompletionRequest, ModelTier};

/// Fixed-delay, bounded-attempt retry policy
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts including the first
    pub max_attempts: u32,
    /// Delay between attempts
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self::new(config.max_attempts, config.delay())
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// Run `operation`, retrying errors for which [`Error::is_retryable`] holds
    pub async fn run<F, Fut, T>(&self, operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.run_with(operation, Error::is_retryable).await
    }

    /// Run `operation`, retrying errors accepted by `is_retryable`
    ///
    /// Non-retryable errors are returned immediately. When the attempt bound
    /// is reached the last error is wrapped in [`Error::RetriesExhausted`].
    pub async fn run_with<F, Fut, T, P>(&self, mut operation: F, is_retryable: P) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
        P: Fn(&Error) -> bool,
    {
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if !is_retryable(&e) => return Err(e),
                Err(e) if attempt >= self.max_attempts => {
                    tracing::warn!("Giving up after {} attempts: {}", attempt, e);
                    return Err(Error::RetriesExhausted {
                        attempts: attempt,
                        last: Box::new(e),
                    });
                }
                Err(e) => {
                    tracing::warn!(
                        "Request failed (attempt {}/{}), retrying in {:?}: {}",
                        attempt,
                        self.max_attempts,
                        self.delay,
                        e
                    );
                    if !self.delay.is_zero() {
                        sleep(self.delay).await;
                    }
                }
            }
        }
    }
}

/// Provider wrapper applying a [`RetryPolicy`] to every call
pub struct RetryingClient {
    inner: Arc<dyn CompletionProvider>,
    policy: RetryPolicy,
    attempts: AtomicU64,
    rate_limited: AtomicU64,
}

impl RetryingClient {
    pub fn new(inner: Arc<dyn CompletionProvider>, policy: RetryPolicy) -> Self {
        Self {
            inner,
            policy,
            attempts: AtomicU64::new(0),
            rate_limited: AtomicU64::new(0),
        }
    }

    /// Remote calls issued so far, retries included
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::Relaxed)
    }

    /// Calls that came back rate limited
    pub fn rate_limited(&self) -> u64 {
        self.rate_limited.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl CompletionProvider for RetryingClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        self.policy
            .run(move || async move {
                self.attempts.fetch_add(1, Ordering::Relaxed);
                let result = self.inner.complete(request).await;
                if matches!(result, Err(Error::RateLimited { .. })) {
                    self.rate_limited.fetch_add(1, Ordering::Relaxed);
                }
                result
            })
            .await
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn model(&self, tier: ModelTier) -> String {
        self.inner.model(tier)
    }
}
