use std::fmt::{self, Display};
use std::io;
use std::sync::Arc;

use distribution::{Bucketer, DEFAULT_GROWTH_FACTOR, DEFAULT_NUM_FINITE_BUCKETS, Distribution};
use foldhash::{HashMap, HashMapExt};

use crate::{CategoryName, StatEntry, StatsRegistry};

/// Lower bound of the first finite attempt duration bucket, in milliseconds.
///
/// Attempts are often much faster than a millisecond, so the buckets start at one
/// microsecond. Five buckets per decade then reach far beyond any realistic duration.
const ATTEMPT_MILLIS_SCALE: f64 = 0.001;

fn attempt_millis_bucketer() -> Bucketer {
    Bucketer::geometric(
        DEFAULT_GROWTH_FACTOR,
        DEFAULT_NUM_FINITE_BUCKETS,
        ATTEMPT_MILLIS_SCALE,
    )
    .expect("the attempt duration bucketer configuration is always valid")
}

/// Aggregate outcome counts of one statistics category.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CategoryStats {
    success: u64,
    failure: u64,
    retry: u64,
}

impl CategoryStats {
    fn add_entry(&mut self, entry: &StatEntry) {
        if entry.is_success() {
            self.success = self.success.wrapping_add(1);
        } else {
            self.failure = self.failure.wrapping_add(1);
        }

        let retries = u64::try_from(entry.retry_count()).unwrap_or(u64::MAX);
        self.retry = self.retry.saturating_add(retries);
    }

    /// Number of retried operations that eventually succeeded.
    #[must_use]
    pub fn success(&self) -> u64 {
        self.success
    }

    /// Number of retried operations where every attempt failed.
    #[must_use]
    pub fn failure(&self) -> u64 {
        self.failure
    }

    /// Total number of attempts made beyond the first one, over all operations.
    #[must_use]
    pub fn retry(&self) -> u64 {
        self.retry
    }

    /// Number of retried operations, successful or not.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.success.wrapping_add(self.failure)
    }
}

impl StatsRegistry {
    /// Returns the aggregate counts of a category.
    ///
    /// A category without any entries reports all zeros.
    #[must_use]
    pub fn category_stats(&self, category: &str) -> CategoryStats {
        self.inspect(|entries| {
            let mut stats = CategoryStats::default();

            for entry in entries.iter().filter(|entry| entry.category() == category) {
                stats.add_entry(entry);
            }

            stats
        })
    }
}

/// A human- and machine-readable report of the retry statistics in a registry.
///
/// For human-readable output, use the `Display` trait implementation.
///
/// For machine-readable output, inspect report contents via the provided methods.
#[derive(Debug)]
pub struct StatsReport {
    // Sorted by category name, ascending.
    categories: Box<[CategoryReport]>,
}

impl StatsReport {
    /// Generates a report covering every category recorded in the registry.
    ///
    /// # Example
    ///
    /// ```
    /// use retry_stats::{GenericRetry, StatsRegistry, StatsReport, retry_with_stats};
    ///
    /// let registry = StatsRegistry::local();
    /// let executor = GenericRetry::new(|_: &std::fmt::Error| true, 1);
    ///
    /// retry_with_stats(&registry, "render", &executor, || Ok::<_, std::fmt::Error>(())).unwrap();
    ///
    /// let report = StatsReport::collect(&registry);
    /// println!("{report}");
    /// ```
    #[must_use]
    pub fn collect(registry: &StatsRegistry) -> Self {
        // All categories share one bucketer, in milliseconds.
        let bucketer = Arc::new(attempt_millis_bucketer());

        let mut category_to_report = HashMap::new();

        registry.inspect(|entries| {
            for entry in entries {
                category_to_report
                    .entry(entry.category().clone())
                    .or_insert_with(|| CategoryReport::new(entry.category().clone(), &bucketer))
                    .add_entry(entry);
            }
        });

        let mut categories = category_to_report.into_values().collect::<Vec<_>>();
        categories.sort_by(|a, b| a.name.cmp(&b.name));

        Self {
            categories: categories.into_boxed_slice(),
        }
    }

    /// Iterates through all the categories in the report, in ascending order of name.
    pub fn categories(&self) -> impl Iterator<Item = &CategoryReport> {
        self.categories.iter()
    }

    /// The report of a single category, if it has any entries.
    #[must_use]
    pub fn category(&self, name: &str) -> Option<&CategoryReport> {
        self.categories
            .binary_search_by(|report| report.name.as_ref().cmp(name))
            .ok()
            .and_then(|index| self.categories.get(index))
    }
}

impl Display for StatsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for category in &self.categories {
            write!(f, "{category}")?;
        }

        Ok(())
    }
}

/// The retry statistics of a single category.
///
/// Part of a collected [`StatsReport`].
#[derive(Debug)]
pub struct CategoryReport {
    name: CategoryName,
    stats: CategoryStats,
    attempt_millis: Distribution,
}

impl CategoryReport {
    fn new(name: CategoryName, bucketer: &Arc<Bucketer>) -> Self {
        Self {
            name,
            stats: CategoryStats::default(),
            attempt_millis: Distribution::new(Arc::clone(bucketer)),
        }
    }

    fn add_entry(&mut self, entry: &StatEntry) {
        self.stats.add_entry(entry);

        for attempt in entry.attempts() {
            self.attempt_millis
                .add(attempt.elapsed().as_secs_f64() * 1000.0);
        }
    }

    /// The name of the category.
    #[must_use]
    pub fn name(&self) -> &CategoryName {
        &self.name
    }

    /// The aggregate outcome counts of the category.
    #[must_use]
    pub fn stats(&self) -> CategoryStats {
        self.stats
    }

    /// The distribution of the durations of every attempt, in milliseconds.
    #[must_use]
    pub fn attempt_millis(&self) -> &Distribution {
        &self.attempt_millis
    }
}

impl Display for CategoryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", CategoryBlock::new(&self.name, self.stats))?;
        writeln!(f, "attempt duration (ms): {}", self.attempt_millis)
    }
}

const BLOCK_LINE: &str = "************************************************************";
const BLOCK_EDGE: &str = "**";

/// The boxed summary of one category, as written by [`report_category_stats()`].
struct CategoryBlock<'a> {
    name: &'a str,
    stats: CategoryStats,
}

impl<'a> CategoryBlock<'a> {
    fn new(name: &'a str, stats: CategoryStats) -> Self {
        Self { name, stats }
    }
}

impl Display for CategoryBlock<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{BLOCK_LINE}")?;
        writeln!(f, "{BLOCK_EDGE} Performance Statistics for {}", self.name)?;
        writeln!(f, "{BLOCK_EDGE}")?;
        writeln!(f, "{BLOCK_EDGE} Success: {}", self.stats.success)?;
        writeln!(f, "{BLOCK_EDGE} Failure: {}", self.stats.failure)?;
        writeln!(f, "{BLOCK_EDGE} Retries: {}", self.stats.retry)?;
        writeln!(f, "{BLOCK_EDGE} Total: {}", self.stats.total())?;
        writeln!(f, "{BLOCK_LINE}")
    }
}

/// Writes the summary block of one category to `out`.
///
/// A category without any entries is reported with all counts at zero.
///
/// # Errors
///
/// Returns any error that `out` returns.
pub fn report_category_stats(
    out: &mut impl io::Write,
    registry: &StatsRegistry,
    category: &str,
) -> io::Result<()> {
    let stats = registry.category_stats(category);
    write!(out, "{}", CategoryBlock::new(category, stats))
}

/// Writes the summary block of every category that has entries to `out`, in ascending
/// order of category name. Writes nothing if the registry has no entries.
///
/// # Errors
///
/// Returns any error that `out` returns.
pub fn report_stats(out: &mut impl io::Write, registry: &StatsRegistry) -> io::Result<()> {
    for category in registry.categories() {
        report_category_stats(out, registry, &category)?;
    }

    Ok(())
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    #![allow(clippy::indexing_slicing, reason = "panic is fine in tests")]

    use std::time::Duration;

    use super::*;
    use crate::{Attempt, FailureRecord, RecordStats};

    fn ok() -> Attempt {
        Attempt::fake(Duration::from_millis(12), None)
    }

    fn failed() -> Attempt {
        Attempt::fake(
            Duration::from_millis(250),
            Some(FailureRecord::new("Timeout", "took too long")),
        )
    }

    fn populated_registry() -> StatsRegistry {
        let registry = StatsRegistry::local();

        registry.record(StatEntry::fake("gsutil", vec![failed(), failed(), ok()]));
        registry.record(StatEntry::fake("gsutil", vec![ok()]));
        registry.record(StatEntry::fake("gsutil", vec![failed(), failed(), failed()]));
        registry.record(StatEntry::fake("apt", vec![failed(), ok()]));

        registry
    }

    #[test]
    fn category_stats_count_success_failure_and_retries() {
        let registry = populated_registry();

        let stats = registry.category_stats("gsutil");
        assert_eq!(stats.success(), 2);
        assert_eq!(stats.failure(), 1);
        assert_eq!(stats.retry(), 4);
        assert_eq!(stats.total(), 3);

        let stats = registry.category_stats("apt");
        assert_eq!(stats.success(), 1);
        assert_eq!(stats.failure(), 0);
        assert_eq!(stats.retry(), 1);
    }

    #[test]
    fn unknown_category_is_all_zeros() {
        let registry = populated_registry();

        assert_eq!(registry.category_stats("nope"), CategoryStats::default());
        assert_eq!(
            StatsRegistry::new().category_stats("nope"),
            CategoryStats::default()
        );
    }

    #[test]
    fn category_block_has_expected_format() {
        let registry = populated_registry();

        let mut out = Vec::new();
        report_category_stats(&mut out, &registry, "gsutil").unwrap();

        let expected = "\
************************************************************
** Performance Statistics for gsutil
**
** Success: 2
** Failure: 1
** Retries: 4
** Total: 3
************************************************************
";

        assert_eq!(String::from_utf8(out).unwrap(), expected);
    }

    #[test]
    fn report_stats_lists_categories_in_order() {
        let registry = populated_registry();

        let mut out = Vec::new();
        report_stats(&mut out, &registry).unwrap();
        let output = String::from_utf8(out).unwrap();

        let apt = output.find("Statistics for apt").unwrap();
        let gsutil = output.find("Statistics for gsutil").unwrap();
        assert!(apt < gsutil);
    }

    #[test]
    fn report_stats_of_empty_registry_writes_nothing() {
        let mut out = Vec::new();
        report_stats(&mut out, &StatsRegistry::local()).unwrap();

        assert!(out.is_empty());
    }

    #[test]
    fn collected_report_matches_category_stats() {
        let registry = populated_registry();
        let report = StatsReport::collect(&registry);

        let names = report
            .categories()
            .map(|c| c.name().to_string())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["apt", "gsutil"]);

        let gsutil = report.category("gsutil").unwrap();
        assert_eq!(gsutil.stats(), registry.category_stats("gsutil"));

        // Every attempt lands in the latency distribution.
        assert_eq!(gsutil.attempt_millis().count(), 7);

        assert!(report.category("nope").is_none());
    }

    #[test]
    fn collected_report_display_contains_blocks_and_latency() {
        let report = StatsReport::collect(&populated_registry());
        let output = report.to_string();

        println!("{output}");

        assert!(output.contains("** Performance Statistics for apt"));
        assert!(output.contains("** Performance Statistics for gsutil"));
        assert!(output.contains("attempt duration (ms): "));
    }

    #[test]
    fn sub_millisecond_attempts_are_bucketed_above_underflow() {
        let registry = StatsRegistry::local();

        for _ in 0..10 {
            registry.record(StatEntry::fake(
                "fast",
                vec![Attempt::fake(Duration::from_micros(200), None)],
            ));
        }

        let report = StatsReport::collect(&registry);
        let attempt_millis = report.category("fast").unwrap().attempt_millis();

        let buckets = attempt_millis.buckets().collect::<Vec<_>>();
        assert_eq!(buckets.len(), 1);

        let (index, count) = buckets[0];
        assert_eq!(count, 10);
        assert_ne!(index, attempt_millis.bucketer().underflow_bucket());

        let (lower, upper) = attempt_millis.bucketer().bucket_boundaries(index).unwrap();
        assert!(lower <= 0.2 && 0.2 < upper);
    }
}
