use std::collections::BTreeMap;
use std::fmt::{self, Display};
use std::sync::Arc;

use num_traits::AsPrimitive;

use crate::{Bucketer, HistogramScale, format_bound};

/// A running histogram of observed values, bucketed by a shared [`Bucketer`].
///
/// Alongside the per-bucket counts, the distribution tracks the number of values added
/// and their sum. Only buckets that have received at least one value take up space.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
///
/// use distribution::{Bucketer, Distribution};
///
/// let bucketer = Arc::new(Bucketer::fixed_width(10.0, 5).unwrap());
/// let mut latencies = Distribution::new(Arc::clone(&bucketer));
///
/// latencies.add(3);
/// latencies.add(12.5);
/// latencies.add(999);
///
/// assert_eq!(latencies.count(), 3);
/// assert_eq!(latencies.bucket_count(1), 1);
/// assert_eq!(latencies.bucket_count(2), 1);
/// assert_eq!(latencies.bucket_count(bucketer.overflow_bucket()), 1);
/// ```
///
/// # Thread safety
///
/// Adding values requires exclusive access. Use one distribution per thread and combine
/// them with [`merge_from()`][Self::merge_from], or guard a shared one with a lock.
#[derive(Clone, Debug)]
pub struct Distribution {
    bucketer: Arc<Bucketer>,

    sum: f64,
    count: u64,

    // Keys are always valid bucket indexes of `bucketer`.
    buckets: BTreeMap<usize, u64>,
}

impl Distribution {
    /// Creates an empty distribution that uses the given bucketer.
    #[must_use]
    pub fn new(bucketer: Arc<Bucketer>) -> Self {
        Self {
            bucketer,
            sum: 0.0,
            count: 0,
            buckets: BTreeMap::new(),
        }
    }

    /// Adds one value to the distribution.
    ///
    /// Any value is accepted. Values outside the finite bucket range are counted
    /// in the underflow or overflow bucket.
    #[inline]
    pub fn add(&mut self, value: impl AsPrimitive<f64>) {
        self.add_batch(value, 1);
    }

    /// Adds `count` occurrences of the same value in one call.
    ///
    /// Adding a batch of zero occurrences has no effect.
    pub fn add_batch(&mut self, value: impl AsPrimitive<f64>, count: u64) {
        if count == 0 {
            return;
        }

        let value = value.as_();
        let index = self.bucketer.bucket_for_value(value);

        // Counts near u64::MAX are outside the supported range and may wrap.
        let bucket = self.buckets.entry(index).or_insert(0);
        *bucket = bucket.wrapping_add(count);

        self.count = self.count.wrapping_add(count);

        #[expect(
            clippy::cast_precision_loss,
            reason = "batch sizes near 2^53 are outside the supported range"
        )]
        let batch_sum = value * count as f64;
        self.sum += batch_sum;
    }

    /// Merges the data set of another distribution into this one.
    ///
    /// This is typically used to combine per-thread distributions for reporting.
    ///
    /// # Panics
    ///
    /// Panics if the two distributions do not use equivalent bucketers, as their
    /// bucket indexes would not be comparable.
    pub fn merge_from(&mut self, other: &Self) {
        assert!(
            Arc::ptr_eq(&self.bucketer, &other.bucketer) || self.bucketer == other.bucketer,
            "cannot merge distributions that use different bucketers"
        );

        for (&index, &count) in &other.buckets {
            let bucket = self.buckets.entry(index).or_insert(0);
            *bucket = bucket.wrapping_add(count);
        }

        self.count = self.count.wrapping_add(other.count);
        self.sum += other.sum;
    }

    /// The bucketer that assigns values to buckets.
    #[must_use]
    pub fn bucketer(&self) -> &Arc<Bucketer> {
        &self.bucketer
    }

    /// Sum of all added values.
    #[must_use]
    pub fn sum(&self) -> f64 {
        self.sum
    }

    /// Number of added values.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Mean of all added values, or `None` if nothing has been added.
    #[must_use]
    pub fn mean(&self) -> Option<f64> {
        #[expect(
            clippy::cast_precision_loss,
            reason = "the mean is an approximation by nature"
        )]
        let count = self.count as f64;

        (self.count != 0).then(|| self.sum / count)
    }

    /// Number of values that landed in the bucket with the given index.
    ///
    /// Buckets that never received a value report zero, as do indexes
    /// beyond the range of the bucketer.
    #[must_use]
    pub fn bucket_count(&self, index: usize) -> u64 {
        self.buckets.get(&index).copied().unwrap_or(0)
    }

    /// Iterates over `(bucket index, count)` pairs for every bucket that has received
    /// at least one value, in ascending order of bucket index.
    pub fn buckets(&self) -> impl Iterator<Item = (usize, u64)> {
        self.buckets.iter().map(|(&index, &count)| (index, count))
    }

    /// Whether no values have been added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

impl Display for Distribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.count == 0 {
            // If there is no recorded data, we just report a flat zero no questions asked.
            return writeln!(f, "0");
        }

        writeln!(
            f,
            "{}; sum {}; mean {}",
            self.count,
            self.sum,
            self.mean().unwrap_or_default()
        )?;

        // Labels are measured first so that the columns line up.
        let rows = self
            .buckets()
            .map(|(index, count)| {
                let (lower, upper) = self
                    .bucketer
                    .bucket_boundaries(index)
                    .expect("distribution only stores valid bucket indexes");

                (format_bound(lower), format_bound(upper), count)
            })
            .collect::<Vec<_>>();

        let lower_width = rows.iter().map(|r| r.0.len()).max().unwrap_or(0);
        let upper_width = rows.iter().map(|r| r.1.len()).max().unwrap_or(0);
        let count_width = rows
            .iter()
            .map(|r| r.2.to_string().len())
            .max()
            .unwrap_or(0);

        let scale = HistogramScale::new(rows.iter().map(|r| r.2));

        for (lower, upper, count) in rows {
            write!(
                f,
                "[{lower:>lower_width$}, {upper:>upper_width$}) [ {count:>count_width$} ]: "
            )?;
            scale.write_bar(count, f)?;
            writeln!(f)?;
        }

        Ok(())
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    #![allow(clippy::float_cmp, reason = "sums of small integers are exact")]

    use std::fmt::Write;

    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(Distribution: Send, Sync, Clone);

    fn unit_bucketer() -> Arc<Bucketer> {
        Arc::new(Bucketer::fixed_width(1.0, 3).unwrap())
    }

    #[test]
    fn new_distribution_is_empty() {
        let distribution = Distribution::new(unit_bucketer());

        assert!(distribution.is_empty());
        assert_eq!(distribution.count(), 0);
        assert_eq!(distribution.sum(), 0.0);
        assert_eq!(distribution.mean(), None);
        assert_eq!(distribution.buckets().count(), 0);
    }

    #[test]
    fn add_updates_count_sum_and_bucket() {
        let mut distribution = Distribution::new(unit_bucketer());

        distribution.add(-0.5);
        distribution.add(0.0);
        distribution.add(0.5);
        distribution.add(1.0);
        distribution.add(100);

        assert_eq!(distribution.count(), 5);
        assert_eq!(distribution.sum(), 101.0);
        assert_eq!(distribution.mean(), Some(101.0 / 5.0));

        assert_eq!(
            distribution.buckets().collect::<Vec<_>>(),
            vec![(0, 1), (1, 2), (2, 1), (4, 1)]
        );

        assert_eq!(distribution.bucket_count(3), 0);
        assert_eq!(distribution.bucket_count(1000), 0);
    }

    #[test]
    fn count_matches_bucket_total() {
        let mut distribution = Distribution::new(Arc::new(Bucketer::default_geometric()));

        let values = [0.1, 1.0, 2.0, 3.5, 1e3, 1e30, -7.0, 42.0];
        for value in values {
            distribution.add(value);
        }

        assert_eq!(distribution.count(), values.len() as u64);
        assert_eq!(distribution.buckets().map(|(_, c)| c).sum::<u64>(), 8);
        assert_eq!(distribution.sum(), values.iter().sum::<f64>());
    }

    #[test]
    fn add_batch_records_many_at_once() {
        let mut distribution = Distribution::new(unit_bucketer());

        distribution.add_batch(2.5, 4);
        distribution.add_batch(0.5, 0);

        assert_eq!(distribution.count(), 4);
        assert_eq!(distribution.sum(), 10.0);
        assert_eq!(distribution.bucket_count(3), 4);
        assert_eq!(distribution.bucket_count(1), 0);
    }

    #[test]
    fn merge_combines_data() {
        let bucketer = unit_bucketer();

        let mut first = Distribution::new(Arc::clone(&bucketer));
        first.add(0.5);
        first.add(2.5);

        let mut second = Distribution::new(Arc::new(Bucketer::fixed_width(1.0, 3).unwrap()));
        second.add(0.25);
        second.add(-3);

        first.merge_from(&second);

        assert_eq!(first.count(), 4);
        assert_eq!(first.sum(), 0.5 + 2.5 + 0.25 - 3.0);
        assert_eq!(
            first.buckets().collect::<Vec<_>>(),
            vec![(0, 1), (1, 2), (3, 1)]
        );

        // The source is untouched.
        assert_eq!(second.count(), 2);
    }

    #[test]
    #[should_panic]
    fn merge_with_different_bucketer_panics() {
        let mut first = Distribution::new(unit_bucketer());
        let second = Distribution::new(Arc::new(Bucketer::fixed_width(2.0, 3).unwrap()));

        first.merge_from(&second);
    }

    #[test]
    fn display_of_empty_distribution_is_zero() {
        let distribution = Distribution::new(unit_bucketer());

        assert_eq!(distribution.to_string(), "0\n");
    }

    #[test]
    fn display_contains_expected_information() {
        let mut distribution = Distribution::new(unit_bucketer());

        distribution.add_batch(0.5, 40);
        distribution.add(2.5);
        distribution.add(-1);

        let mut output = String::new();
        write!(&mut output, "{distribution}").unwrap();

        println!("{output}");

        assert!(output.starts_with("42; sum 21.5; mean "));
        assert!(output.contains("[-inf, 0) [  1 ]: "));
        assert!(output.contains("[   0, 1) [ 40 ]: "));
        assert!(output.contains("[   2, 3) [  1 ]: "));

        // Empty buckets are not listed.
        assert!(!output.contains("[   1, 2)"));
    }
}
