use std::any::type_name;
use std::fmt;
use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

/// Default number of retries performed by [`GenericRetry`] after the first attempt.
pub const DEFAULT_MAX_RETRY: u32 = 3;

/// Drives the retry loop of an operation.
///
/// An executor calls the operation until it succeeds, until the executor's policy
/// declines to retry a failure, or until it has made `max_retry + 1` attempts. It returns
/// the first successful result or the last error, unchanged. Whether and how long to
/// wait between attempts is up to the executor.
///
/// [`GenericRetry`] is the stock implementation. Implement this trait to plug a different
/// retry policy into [`retry_with_stats()`][crate::retry_with_stats].
pub trait RetryExecutor<E> {
    /// Executes `operation` according to the retry policy of the executor.
    ///
    /// # Errors
    ///
    /// Returns the error of the last attempt if no attempt succeeded.
    fn execute<T, F>(&self, operation: F) -> Result<T, E>
    where
        F: FnMut() -> Result<T, E>;
}

/// Retries failed operations that a handler deems retryable, with optional exponential
/// backoff between attempts.
///
/// The handler receives each error and returns whether the operation may be retried.
/// Errors that the handler rejects are returned immediately.
///
/// # Example
///
/// ```
/// use std::time::Duration;
///
/// use retry_stats::{GenericRetry, RetryExecutor};
///
/// let executor = GenericRetry::builder(|e: &std::io::Error| {
///     e.kind() == std::io::ErrorKind::TimedOut
/// })
/// .max_retry(2)
/// .sleep(Duration::from_millis(1))
/// .backoff_factor(2)
/// .build();
///
/// let mut calls = 0;
/// let result: Result<u32, std::io::Error> = executor.execute(|| {
///     calls += 1;
///     if calls < 3 {
///         Err(std::io::Error::new(std::io::ErrorKind::TimedOut, "slow"))
///     } else {
///         Ok(calls)
///     }
/// });
///
/// assert_eq!(result.unwrap(), 3);
/// ```
pub struct GenericRetry<H> {
    handler: H,
    max_retry: u32,

    /// Delay before the first retry.
    sleep: Duration,

    /// Each subsequent retry waits this many times longer than the previous one.
    /// A factor of 1 keeps the delay constant.
    backoff_factor: u32,

    sleep_cap: Option<Duration>,
}

impl<H> GenericRetry<H> {
    /// Creates an executor that retries up to `max_retry` times without sleeping.
    #[must_use]
    pub fn new(handler: H, max_retry: u32) -> Self {
        Self::builder(handler).max_retry(max_retry).build()
    }

    /// Creates a builder for an executor with a custom backoff configuration.
    #[must_use]
    pub fn builder(handler: H) -> GenericRetryBuilder<H> {
        GenericRetryBuilder {
            handler,
            max_retry: DEFAULT_MAX_RETRY,
            sleep: Duration::ZERO,
            backoff_factor: 1,
            sleep_cap: None,
        }
    }

    /// The maximum number of attempts made after the first one.
    #[must_use]
    pub fn max_retry(&self) -> u32 {
        self.max_retry
    }

    /// How long to wait before the given retry (1-based).
    fn delay_before(&self, retry: u32) -> Duration {
        let multiplier = self
            .backoff_factor
            .saturating_pow(retry.saturating_sub(1));
        let delay = self.sleep.saturating_mul(multiplier);

        self.sleep_cap.map_or(delay, |cap| delay.min(cap))
    }
}

impl<H> fmt::Debug for GenericRetry<H> {
    #[cfg_attr(test, mutants::skip)] // No API contract.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("max_retry", &self.max_retry)
            .field("sleep", &self.sleep)
            .field("backoff_factor", &self.backoff_factor)
            .field("sleep_cap", &self.sleep_cap)
            .finish_non_exhaustive()
    }
}

impl<E, H> RetryExecutor<E> for GenericRetry<H>
where
    H: Fn(&E) -> bool,
{
    fn execute<T, F>(&self, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Result<T, E>,
    {
        let mut retry: u32 = 0;

        loop {
            let error = match operation() {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            if !(self.handler)(&error) {
                debug!(retry, "failure is not retryable");
                return Err(error);
            }

            if retry >= self.max_retry {
                warn!(
                    max_retry = self.max_retry,
                    "giving up after exhausting all retries"
                );
                return Err(error);
            }

            retry = retry
                .checked_add(1)
                .expect("guarded by the max_retry check above");

            let delay = self.delay_before(retry);
            debug!(retry, ?delay, "retrying after failure");

            pause(delay);
        }
    }
}

fn pause(delay: Duration) {
    if !delay.is_zero() {
        thread::sleep(delay);
    }
}

/// Creates instances of [`GenericRetry`].
///
/// Use `GenericRetry::builder()` to create a new instance of this builder.
#[must_use]
pub struct GenericRetryBuilder<H> {
    handler: H,
    max_retry: u32,
    sleep: Duration,
    backoff_factor: u32,
    sleep_cap: Option<Duration>,
}

impl<H> GenericRetryBuilder<H> {
    /// Sets the maximum number of attempts made after the first one.
    /// Defaults to [`DEFAULT_MAX_RETRY`].
    pub fn max_retry(self, max_retry: u32) -> Self {
        Self { max_retry, ..self }
    }

    /// Sets the delay before the first retry. Defaults to no delay.
    pub fn sleep(self, sleep: Duration) -> Self {
        Self { sleep, ..self }
    }

    /// Sets the factor by which the delay grows from one retry to the next.
    /// Defaults to 1, which keeps the delay constant.
    ///
    /// A factor of 0 is treated as 1.
    pub fn backoff_factor(self, backoff_factor: u32) -> Self {
        Self {
            backoff_factor: backoff_factor.max(1),
            ..self
        }
    }

    /// Sets an upper limit for the delay between attempts. Defaults to no limit.
    pub fn sleep_cap(self, sleep_cap: Duration) -> Self {
        Self {
            sleep_cap: Some(sleep_cap),
            ..self
        }
    }

    /// Builds the executor with the current configuration.
    pub fn build(self) -> GenericRetry<H> {
        GenericRetry {
            handler: self.handler,
            max_retry: self.max_retry,
            sleep: self.sleep,
            backoff_factor: self.backoff_factor,
            sleep_cap: self.sleep_cap,
        }
    }
}

impl<H> fmt::Debug for GenericRetryBuilder<H> {
    #[cfg_attr(test, mutants::skip)] // No API contract.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("max_retry", &self.max_retry)
            .field("sleep", &self.sleep)
            .field("backoff_factor", &self.backoff_factor)
            .field("sleep_cap", &self.sleep_cap)
            .finish_non_exhaustive()
    }
}
