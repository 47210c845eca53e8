use crate::{Bucketer, DEFAULT_NUM_FINITE_BUCKETS, Result};

/// Creates instances of [`Bucketer`].
///
/// Exactly one of `width` or `growth_factor` must be set to a non-zero value.
///
/// Use `Bucketer::builder()` to create a new instance of this builder.
///
/// # Example
///
/// ```
/// use distribution::Bucketer;
///
/// // Bounds at 0.5, 1, 2, 4, ... milliseconds.
/// let bucketer = Bucketer::builder()
///     .growth_factor(2.0)
///     .scale(0.5)
///     .num_finite_buckets(16)
///     .build()
///     .unwrap();
///
/// assert_eq!(bucketer.bucket_for_value(1.5), 2);
/// ```
#[derive(Clone, Debug)]
#[must_use]
pub struct BucketerBuilder {
    width: f64,
    growth_factor: f64,
    num_finite_buckets: usize,
    scale: f64,
}

impl BucketerBuilder {
    pub(crate) fn new() -> Self {
        Self {
            width: 0.0,
            growth_factor: 0.0,
            num_finite_buckets: DEFAULT_NUM_FINITE_BUCKETS,
            scale: 1.0,
        }
    }

    /// Sets the width of each finite bucket, selecting fixed-width bucketing.
    pub fn width(self, width: f64) -> Self {
        Self { width, ..self }
    }

    /// Sets the ratio between consecutive finite bounds, selecting geometric bucketing.
    pub fn growth_factor(self, growth_factor: f64) -> Self {
        Self {
            growth_factor,
            ..self
        }
    }

    /// Sets the number of finite buckets. Defaults to [`DEFAULT_NUM_FINITE_BUCKETS`].
    pub fn num_finite_buckets(self, num_finite_buckets: usize) -> Self {
        Self {
            num_finite_buckets,
            ..self
        }
    }

    /// Sets the multiplier applied to geometric bounds. Defaults to 1.
    ///
    /// The scale is the lower bound of the first finite bucket of a geometric bucketer.
    /// It has no effect on fixed-width bucketers.
    pub fn scale(self, scale: f64) -> Self {
        Self { scale, ..self }
    }

    /// Builds the bucketer with the current configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`][crate::Error::InvalidConfiguration] if
    /// both or neither of `width` and `growth_factor` are set, or if any parameter
    /// is negative, non-finite or (for `scale`) zero.
    ///
    /// # Panics
    ///
    /// Panics if the computed bucket bounds are not strictly increasing. This is a
    /// misconfiguration that cannot be detected from the parameters alone, for example
    /// a growth factor not greater than 1 or bounds that overflow to infinity.
    pub fn build(self) -> Result<Bucketer> {
        Bucketer::new(
            self.width,
            self.growth_factor,
            self.num_finite_buckets,
            self.scale,
        )
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    #![allow(clippy::indexing_slicing, reason = "panic is fine in tests")]
    #![allow(clippy::float_cmp, reason = "configuration values are copied verbatim")]

    use super::*;

    #[test]
    fn builder_defaults_to_hundred_finite_buckets() {
        let bucketer = Bucketer::builder().width(2.5).build().unwrap();

        assert_eq!(bucketer.num_finite_buckets(), 100);
        assert_eq!(bucketer.scale(), 1.0);
    }

    #[test]
    fn builder_passes_all_parameters() {
        let bucketer = Bucketer::builder()
            .growth_factor(3.0)
            .num_finite_buckets(7)
            .scale(0.25)
            .build()
            .unwrap();

        assert_eq!(bucketer.growth_factor(), 3.0);
        assert_eq!(bucketer.width(), 0.0);
        assert_eq!(bucketer.num_finite_buckets(), 7);
        assert_eq!(bucketer.scale(), 0.25);
        assert_eq!(bucketer.lower_bounds()[1], 0.25);
    }

    #[test]
    fn later_setter_overrides_earlier() {
        let bucketer = Bucketer::builder()
            .width(1.0)
            .width(4.0)
            .num_finite_buckets(2)
            .build()
            .unwrap();

        assert_eq!(bucketer.bucket_boundaries(2).unwrap(), (4.0, 8.0));
    }
}
