use std::fmt::Display;
use std::time::Instant;

use tracing::debug;

use crate::{Attempt, CategoryName, FailureRecord, RecordStats, RetryExecutor, StatEntry};

/// Executes `operation` through `executor`, recording the timing and outcome of every
/// attempt under `category`.
///
/// Each time the executor invokes the operation, the wall-clock duration of the call and
/// either success or a [`FailureRecord`] describing the error is appended to a new
/// [`StatEntry`]. The executor alone decides whether to retry; this function only observes.
///
/// The entry is recorded into `recorder` exactly once, when the call finishes - whether the
/// operation eventually succeeded, failed for the last time or panicked. An attempt that
/// panics is not itself listed in the entry.
///
/// Returns the result of the executor unchanged. Errors are never converted or swallowed.
///
/// # Example
///
/// ```
/// use retry_stats::{GenericRetry, StatsRegistry, retry_with_stats};
///
/// let registry = StatsRegistry::local();
/// let executor = GenericRetry::new(|_: &std::num::ParseIntError| true, 3);
///
/// let mut inputs = ["x", "y", "42"].into_iter();
/// let value = retry_with_stats(&registry, "parse", &executor, || {
///     inputs.next().unwrap().parse::<u32>()
/// })
/// .unwrap();
///
/// assert_eq!(value, 42);
///
/// let stats = registry.category_stats("parse");
/// assert_eq!(stats.success(), 1);
/// assert_eq!(stats.retry(), 2);
/// ```
///
/// # Errors
///
/// Returns the error of the last attempt if the executor gave up.
///
/// # Panics
///
/// Panics if `recorder` is a [`StatsRegistry`][crate::StatsRegistry] that has not been
/// set up. The operation is not started in that case.
pub fn retry_with_stats<R, X, T, E, F>(
    recorder: &R,
    category: impl Into<CategoryName>,
    executor: &X,
    mut operation: F,
) -> Result<T, E>
where
    R: RecordStats + ?Sized,
    X: RetryExecutor<E> + ?Sized,
    E: Display,
    F: FnMut() -> Result<T, E>,
{
    assert!(
        recorder.is_configured(),
        "the statistics registry must be set up before retry_with_stats() is called"
    );

    // The guard hands the entry to the recorder when it goes out of scope, which also
    // happens during unwinding.
    let mut entry = scopeguard::guard(StatEntry::new(category.into()), |entry| {
        recorder.record(entry);
    });

    executor.execute(|| {
        let started = Instant::now();
        let result = operation();
        let elapsed = started.elapsed();

        let failure = result.as_ref().err().map(FailureRecord::from_error);

        if let Some(failure) = &failure {
            debug!(
                category = %entry.category(),
                attempt = entry.attempts().len().saturating_add(1),
                ?elapsed,
                %failure,
                "attempt failed"
            );
        }

        entry.push_attempt(Attempt::new(elapsed, failure));
        result
    })
}
