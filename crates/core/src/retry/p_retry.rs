//! Bounded, abort-aware retries with exponential backoff.

use crate::context::AbortSignal;
use crate::errors::FrameworkError;
use futures::future::BoxFuture;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Where a failed attempt stands in the retry loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryAttempt {
    /// 1-based number of the attempt that just failed.
    pub attempt: u32,
    /// Retries still available after this failure.
    pub remaining: u32,
}

pub type ShouldRetryFn = Arc<dyn Fn(&FrameworkError, RetryAttempt) -> bool + Send + Sync>;

/// Diagnostic hook. An error returned here ends the loop with that error.
pub type FailedAttemptFn = Arc<
    dyn Fn(FrameworkError, RetryAttempt) -> BoxFuture<'static, Result<(), FrameworkError>>
        + Send
        + Sync,
>;

/// Options of [`p_retry`].
#[derive(Clone)]
pub struct RetryOptions {
    /// Retries after the first attempt.
    pub retries: u32,
    pub factor: f64,
    /// Unit of the backoff; the delay before attempt `n > 1` is
    /// `base_delay * round(factor^(n - 1))`.
    pub base_delay: Duration,
    pub signal: Option<AbortSignal>,
    pub should_retry: Option<ShouldRetryFn>,
    pub on_failed_attempt: Option<FailedAttemptFn>,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            retries: 0,
            factor: 2.0,
            base_delay: Duration::from_secs(1),
            signal: None,
            should_retry: None,
            on_failed_attempt: None,
        }
    }
}

impl RetryOptions {
    pub fn new(retries: u32) -> Self {
        Self {
            retries,
            ..Self::default()
        }
    }

    pub fn with_factor(mut self, factor: f64) -> Self {
        self.factor = factor;
        self
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    pub fn with_signal(mut self, signal: AbortSignal) -> Self {
        self.signal = Some(signal);
        self
    }

    pub fn should_retry<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&FrameworkError, RetryAttempt) -> bool + Send + Sync + 'static,
    {
        self.should_retry = Some(Arc::new(predicate));
        self
    }

    pub fn on_failed_attempt<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(FrameworkError, RetryAttempt) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), FrameworkError>> + Send + 'static,
    {
        self.on_failed_attempt = Some(Arc::new(
            move |error: FrameworkError,
                  attempt: RetryAttempt|
                  -> BoxFuture<'static, Result<(), FrameworkError>> {
                Box::pin(hook(error, attempt))
            },
        ));
        self
    }

    /// Sleep before the given attempt. Zero for the first one, saturating at
    /// `Duration::MAX`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        let exponent = i32::try_from(attempt - 1).unwrap_or(i32::MAX);
        let multiplier = self.factor.powi(exponent).round();
        if multiplier.is_nan() || multiplier <= 0.0 {
            return Duration::ZERO;
        }
        Duration::try_from_secs_f64(multiplier * self.base_delay.as_secs_f64())
            .unwrap_or(Duration::MAX)
    }
}

impl fmt::Debug for RetryOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryOptions")
            .field("retries", &self.retries)
            .field("factor", &self.factor)
            .field("base_delay", &self.base_delay)
            .field("signal", &self.signal)
            .field("should_retry", &self.should_retry.is_some())
            .field("on_failed_attempt", &self.on_failed_attempt.is_some())
            .finish()
    }
}

/// Calls `operation` until it succeeds, up to `1 + options.retries` times.
///
/// The operation receives the 1-based attempt number. Abort errors end the
/// loop at once with their underlying cause. The whole loop, backoff sleeps
/// included, races `options.signal`.
///
/// # Errors
///
/// Returns the last attempt's error once retries are exhausted or
/// `should_retry` declines, an abort error if the signal fires, or the error
/// returned by `on_failed_attempt`.
pub async fn p_retry<T, F, Fut>(operation: F, options: RetryOptions) -> Result<T, FrameworkError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, FrameworkError>>,
{
    match options.signal.clone() {
        Some(signal) => {
            tokio::select! {
                biased;
                _ = signal.cancelled() => {
                    warn!(reason = ?signal.reason(), "Retry loop aborted");
                    Err(FrameworkError::abort(signal.reason()))
                }
                result = attempts(operation, &options) => result,
            }
        }
        None => attempts(operation, &options).await,
    }
}

async fn attempts<T, F, Fut>(mut operation: F, options: &RetryOptions) -> Result<T, FrameworkError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, FrameworkError>>,
{
    let mut attempt = 1;
    let mut remaining = options.retries;
    loop {
        let delay = options.delay_for_attempt(attempt);
        if !delay.is_zero() {
            debug!(attempt, ?delay, "Waiting before retry");
            tokio::time::sleep(delay).await;
        }

        let error = match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(error) => error,
        };
        if error.is_abort() {
            return Err(error.abort_cause());
        }

        let state = RetryAttempt { attempt, remaining };
        if let Some(hook) = &options.on_failed_attempt {
            hook(error.clone(), state).await?;
        }
        if remaining == 0 {
            return Err(error);
        }
        if let Some(should_retry) = &options.should_retry {
            if !should_retry(&error, state) {
                return Err(error);
            }
        }

        debug!(attempt, remaining, error = %error, "Attempt failed, retrying");
        attempt += 1;
        remaining -= 1;
    }
}
