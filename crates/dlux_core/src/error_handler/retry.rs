//! Options and results for [`ErrorHandlerService::handle_async`](super::ErrorHandlerService::handle_async).

use std::time::Duration;

/// Called once with the final error after all retries failed.
pub type OnErrorCallback<E> = Box<dyn FnOnce(&E) + Send>;

/// Retry policy and fallback for one `handle_async` call.
pub struct HandleAsyncOptions<T, E> {
    /// Extra attempts after the first failure. `None` uses the configured default.
    pub retries: Option<u32>,
    /// Base back-off; attempt `n` waits `retry_delay * 2^n`. `None` uses the configured default.
    pub retry_delay: Option<Duration>,
    /// Returned as `data` when every attempt failed.
    pub fallback_value: Option<T>,
    /// Invoked with the final error.
    pub on_error: Option<OnErrorCallback<E>>,
}

impl<T, E> Default for HandleAsyncOptions<T, E> {
    fn default() -> Self {
        Self {
            retries: None,
            retry_delay: None,
            fallback_value: None,
            on_error: None,
        }
    }
}

impl<T, E> HandleAsyncOptions<T, E> {
    /// Set the retry count.
    pub fn retries(mut self, retries: u32) -> Self {
        self.retries = Some(retries);
        self
    }

    /// Set the base back-off delay.
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = Some(delay);
        self
    }

    /// Set the fallback value.
    pub fn fallback(mut self, value: T) -> Self {
        self.fallback_value = Some(value);
        self
    }

    /// Set the final-error callback.
    pub fn on_error(mut self, callback: impl FnOnce(&E) + Send + 'static) -> Self {
        self.on_error = Some(Box::new(callback));
        self
    }
}

/// Structured result of `handle_async`: callers branch on `success`
/// instead of matching an error.
#[derive(Debug, Clone, PartialEq)]
pub struct AsyncOutcome<T, E> {
    /// Whether some attempt succeeded.
    pub success: bool,
    /// The value on success, the fallback on failure.
    pub data: Option<T>,
    /// The last error on failure.
    pub error: Option<E>,
    /// Number of times the operation ran.
    pub attempts: u32,
}

impl<T, E> AsyncOutcome<T, E> {
    /// Create a successful outcome
    pub fn success(data: T, attempts: u32) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            attempts,
        }
    }

    /// Create a failed outcome
    pub fn failure(error: E, fallback: Option<T>, attempts: u32) -> Self {
        Self {
            success: false,
            data: fallback,
            error: Some(error),
            attempts,
        }
    }

    /// Convert into a plain `Result`, dropping any fallback.
    pub fn into_result(self) -> Result<T, Option<E>> {
        match (self.success, self.data) {
            (true, Some(data)) => Ok(data),
            _ => Err(self.error),
        }
    }
}

/// Back-off before retry number `attempt` (0-based): `base * 2^attempt`.
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt))
}
