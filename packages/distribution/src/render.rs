use std::cmp;
use std::fmt::{self, Write};
use std::num::NonZero;

/// We auto-scale histogram bars when rendering. This is the number of characters
/// that we use to represent the largest bucket.
///
/// One character never represents less than one value, so histograms with small counts
/// render narrower than this. Due to aliasing, a bar may also overshoot it slightly.
const HISTOGRAM_BAR_WIDTH_CHARS: u64 = 50;

/// Pre-allocated bar characters, longer than the typical bar width to handle aliasing.
const HISTOGRAM_BAR_CHARS: &str =
    "∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎";

/// The '∎' character is U+220E which encodes to 3 bytes in UTF-8.
const BYTES_PER_HISTOGRAM_BAR_CHAR: NonZero<usize> = NonZero::new(3).unwrap();

#[expect(
    clippy::integer_division,
    reason = "the constant consists of whole characters"
)]
const HISTOGRAM_BAR_CHARS_LEN: usize =
    HISTOGRAM_BAR_CHARS.len() / BYTES_PER_HISTOGRAM_BAR_CHAR.get();

/// The auto-scaling step of histogram bars.
#[derive(Debug)]
pub(crate) struct HistogramScale {
    /// One character is rendered for each `count_per_char` values (rounded down).
    count_per_char: NonZero<u64>,
}

impl HistogramScale {
    pub(crate) fn new(counts: impl Iterator<Item = u64>) -> Self {
        let max_count = counts.max().unwrap_or(0);

        // Integer steps suffer from aliasing when there are few values. The relative sizes
        // stay right and the printed counts give the ground truth.
        #[expect(
            clippy::integer_division,
            reason = "we accept the loss of precision here - the bar might not always reach 100% of desired width or even overshoot it"
        )]
        let count_per_char = NonZero::new(cmp::max(max_count / HISTOGRAM_BAR_WIDTH_CHARS, 1))
            .expect("guarded by max()");

        Self { count_per_char }
    }

    pub(crate) fn write_bar(&self, count: u64, f: &mut impl Write) -> fmt::Result {
        let bar_width = usize::try_from(count / self.count_per_char).unwrap_or(usize::MAX);

        let mut remaining = bar_width;

        while remaining > 0 {
            let chunk_chars = remaining.min(HISTOGRAM_BAR_CHARS_LEN);

            let byte_end = chunk_chars
                .checked_mul(BYTES_PER_HISTOGRAM_BAR_CHAR.get())
                .expect("we are seeking into a small constant value, overflow impossible");

            #[expect(
                clippy::string_slice,
                reason = "safe slicing - ∎ characters have known UTF-8 encoding"
            )]
            f.write_str(&HISTOGRAM_BAR_CHARS[..byte_end])?;

            remaining = remaining
                .checked_sub(chunk_chars)
                .expect("guarded by min() above");
        }

        Ok(())
    }
}

/// Formats a bucket bound for display, using `-inf`/`+inf` for the synthetic bounds and
/// dropping the fraction of whole numbers.
pub(crate) fn format_bound(bound: f64) -> String {
    if bound == f64::NEG_INFINITY {
        "-inf".to_string()
    } else if bound == f64::INFINITY {
        "+inf".to_string()
    } else if bound.fract() == 0.0 && bound.abs() < 1e15 {
        format!("{bound:.0}")
    } else {
        format!("{bound:.3}")
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn bar_scales_to_largest_count() {
        let scale = HistogramScale::new([1_000_u64, 10, 500].into_iter());

        let mut full = String::new();
        scale.write_bar(1_000, &mut full).unwrap();
        assert_eq!(full.chars().count(), 50);

        let mut half = String::new();
        scale.write_bar(500, &mut half).unwrap();
        assert_eq!(half.chars().count(), 25);

        let mut tiny = String::new();
        scale.write_bar(10, &mut tiny).unwrap();
        assert!(tiny.is_empty());
    }

    #[test]
    fn small_counts_get_one_char_each() {
        let scale = HistogramScale::new([3_u64, 1].into_iter());

        let mut bar = String::new();
        scale.write_bar(3, &mut bar).unwrap();
        assert_eq!(bar, "∎∎∎");
    }

    #[test]
    fn long_bars_span_multiple_chunks() {
        let scale = HistogramScale::new([1_u64].into_iter());

        let mut bar = String::new();
        scale.write_bar(250, &mut bar).unwrap();
        assert_eq!(bar.chars().count(), 250);
    }

    #[test]
    fn bounds_format_compactly() {
        assert_eq!(format_bound(f64::NEG_INFINITY), "-inf");
        assert_eq!(format_bound(f64::INFINITY), "+inf");
        assert_eq!(format_bound(40.0), "40");
        assert_eq!(format_bound(-3.0), "-3");
        assert_eq!(format_bound(1.584_893_192_461_113_6), "1.585");
    }
}
