use super::VisionBackend;
use crate::models::CaptionRequest;
use crate::{Error, Result};
use async_trait::async_trait;
use std::time::Duration;
use tokio_retry::strategy::ExponentialBackoff;
use tokio_retry::RetryIf;

/// Bounded retry around another backend.
///
/// Each attempt reissues the same request. Precondition errors such as a
/// missing credential are returned immediately. With an attempt timeout set,
/// a stalled attempt fails with [`Error::Timeout`] and is retried like any
/// other upstream failure.
pub struct RetryingBackend<B> {
    inner: B,
    max_attempts: usize,
    backoff_factor_ms: u64,
    max_delay: Duration,
    attempt_timeout: Option<Duration>,
}

/// Upper bound on a single backoff sleep unless overridden.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(10);

impl<B: VisionBackend> RetryingBackend<B> {
    pub fn new(inner: B, max_attempts: usize) -> Self {
        Self {
            inner,
            max_attempts: max_attempts.max(1),
            backoff_factor_ms: 250,
            max_delay: DEFAULT_MAX_DELAY,
            attempt_timeout: None,
        }
    }

    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = Some(timeout);
        self
    }

    /// Delays grow as 2, 4, 8... times `factor_ms`.
    pub fn with_backoff(mut self, factor_ms: u64, max_delay: Duration) -> Self {
        self.backoff_factor_ms = factor_ms;
        self.max_delay = max_delay;
        self
    }
}

#[async_trait]
impl<B: VisionBackend> VisionBackend for RetryingBackend<B> {
    async fn complete(&self, api_key: &str, request: &CaptionRequest) -> Result<String> {
        let strategy = ExponentialBackoff::from_millis(2)
            .factor(self.backoff_factor_ms)
            .max_delay(self.max_delay)
            .take(self.max_attempts - 1);

        let max_attempts = self.max_attempts;
        let attempt_timeout = self.attempt_timeout;
        let inner = &self.inner;
        let mut attempt = 0;
        RetryIf::spawn(
            strategy,
            move || {
                attempt += 1;
                tracing::debug!("Vision backend attempt {}/{}", attempt, max_attempts);
                async move {
                    match attempt_timeout {
                        Some(limit) => {
                            let call = inner.complete(api_key, request);
                            tokio::time::timeout(limit, call)
                                .await
                                .unwrap_or_else(|_| Err(Error::Timeout(limit)))
                        }
                        None => inner.complete(api_key, request).await,
                    }
                }
            },
            |e: &Error| {
                let retryable = !e.is_precondition();
                if retryable {
                    tracing::warn!("Vision backend call failed: {}", e);
                }
                retryable
            },
        )
        .await
    }
}
