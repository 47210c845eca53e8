use std::cmp::Ordering;
use std::iter;

use crate::{BucketerBuilder, Error, Result};

/// Ten to the power of 0.2, which yields five geometric buckets per decade.
pub const DEFAULT_GROWTH_FACTOR: f64 = 1.584_893_192_461_113_6;

/// Number of finite buckets used by [`Bucketer::default_geometric()`].
pub const DEFAULT_NUM_FINITE_BUCKETS: usize = 100;

/// Assigns real-valued measurements to one of a fixed set of contiguous, non-overlapping,
/// half-open `[lower, upper)` intervals.
///
/// Every bucketer has `num_finite_buckets` finite buckets plus two synthetic ones:
///
/// * bucket `0` is the underflow bucket, covering `(-inf, first finite lower bound)`.
/// * bucket `total_buckets() - 1` is the overflow bucket, covering
///   `[last finite upper bound, +inf)`.
///
/// The finite buckets are laid out using exactly one of two schemes:
///
/// * **Fixed width** - finite bucket `i` (1-based) covers `[(i-1) * width, i * width)`.
/// * **Geometric** - finite bucket `i` covers `[scale * g^(i-1), scale * g^i)`.
///
/// A bucketer is immutable once built. Share it between many [`Distribution`][1] instances
/// via `Arc`.
///
/// # Example
///
/// ```
/// use distribution::Bucketer;
///
/// let bucketer = Bucketer::fixed_width(10.0, 5).unwrap();
///
/// assert_eq!(bucketer.total_buckets(), 7);
/// assert_eq!(bucketer.bucket_for_value(-1.0), 0);
/// assert_eq!(bucketer.bucket_for_value(0.0), 1);
/// assert_eq!(bucketer.bucket_for_value(49.9), 5);
/// assert_eq!(bucketer.bucket_for_value(50.0), 6);
/// ```
///
/// [1]: crate::Distribution
#[derive(Clone, Debug, PartialEq)]
pub struct Bucketer {
    width: f64,
    growth_factor: f64,
    scale: f64,
    num_finite_buckets: usize,

    /// One entry per bucket, strictly ascending, starting with negative infinity.
    lower_bounds: Box<[f64]>,
}

impl Bucketer {
    /// Creates a builder for a bucketer with custom parameters.
    ///
    /// Prefer [`fixed_width()`][Self::fixed_width] or [`geometric()`][Self::geometric]
    /// unless the parameters come from configuration data.
    #[must_use]
    #[cfg_attr(test, mutants::skip)] // Gets replaced with itself by different name, bad mutation.
    pub fn builder() -> BucketerBuilder {
        BucketerBuilder::new()
    }

    /// Creates a bucketer whose finite buckets all have the same `width`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] if `width` is not a finite positive number.
    pub fn fixed_width(width: f64, num_finite_buckets: usize) -> Result<Self> {
        Self::builder()
            .width(width)
            .num_finite_buckets(num_finite_buckets)
            .build()
    }

    /// Creates a bucketer whose finite bucket bounds grow by `growth_factor` from one
    /// bucket to the next, starting at `scale`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] if `growth_factor` is not a finite positive
    /// number or if `scale` is not a finite positive number.
    ///
    /// # Panics
    ///
    /// Panics if the resulting bucket bounds are not strictly increasing, which happens
    /// when `growth_factor` is not greater than 1 or when the bounds overflow to infinity.
    pub fn geometric(growth_factor: f64, num_finite_buckets: usize, scale: f64) -> Result<Self> {
        Self::builder()
            .growth_factor(growth_factor)
            .num_finite_buckets(num_finite_buckets)
            .scale(scale)
            .build()
    }

    /// The conventional monitoring bucketer: geometric with five buckets per decade,
    /// [`DEFAULT_NUM_FINITE_BUCKETS`] finite buckets and a scale of 1.
    #[must_use]
    pub fn default_geometric() -> Self {
        Self::geometric(DEFAULT_GROWTH_FACTOR, DEFAULT_NUM_FINITE_BUCKETS, 1.0)
            .expect("the default geometric configuration is always valid")
    }

    pub(crate) fn new(
        width: f64,
        growth_factor: f64,
        num_finite_buckets: usize,
        scale: f64,
    ) -> Result<Self> {
        if !width.is_finite() || width < 0.0 {
            return Err(invalid(format!(
                "width must be a finite non-negative number (was {width})"
            )));
        }

        if !growth_factor.is_finite() || growth_factor < 0.0 {
            return Err(invalid(format!(
                "growth factor must be a finite non-negative number (was {growth_factor})"
            )));
        }

        if !scale.is_finite() || scale <= 0.0 {
            return Err(invalid(format!(
                "scale must be a finite positive number (was {scale})"
            )));
        }

        if width != 0.0 && growth_factor != 0.0 {
            return Err(invalid(
                "a bucketer must have either a width or a growth factor, not both".to_string(),
            ));
        }

        if width == 0.0 && growth_factor == 0.0 {
            return Err(invalid(
                "a bucketer must have either a width or a growth factor".to_string(),
            ));
        }

        let total_buckets = num_finite_buckets
            .checked_add(2)
            .ok_or_else(|| invalid(format!("too many finite buckets ({num_finite_buckets})")))?;

        // The finite buckets need one more bound than there are buckets, as the last
        // upper bound doubles as the lower bound of the overflow bucket.
        #[expect(
            clippy::cast_precision_loss,
            reason = "bucket counts stay far below the range where f64 loses integer precision"
        )]
        let finite_bounds = (0..=num_finite_buckets).map(|i| {
            let i = i as f64;

            if width == 0.0 {
                scale * growth_factor.powf(i)
            } else {
                width * i
            }
        });

        let lower_bounds = iter::once(f64::NEG_INFINITY)
            .chain(finite_bounds)
            .collect::<Vec<_>>()
            .into_boxed_slice();

        assert_eq!(
            lower_bounds.len(),
            total_buckets,
            "every bucket must have exactly one lower bound"
        );

        #[expect(
            clippy::indexing_slicing,
            reason = "windows() guarantees that we have exactly two elements"
        )]
        {
            assert!(
                lower_bounds.windows(2).all(|w| w[0] < w[1]),
                "bucket lower bounds must be strictly increasing \
                 (width {width}, growth factor {growth_factor}, scale {scale}, \
                 {num_finite_buckets} finite buckets)"
            );
        }

        Ok(Self {
            width,
            growth_factor,
            scale,
            num_finite_buckets,
            lower_bounds,
        })
    }

    /// Returns the index of the bucket that `value` belongs to.
    ///
    /// This is the unique index `i` for which `lower_bounds()[i] <= value` and the next
    /// lower bound (if any) is greater than `value`. A value exactly on a boundary belongs
    /// to the bucket that the boundary opens, not the one it closes.
    ///
    /// `NaN` is not ordered relative to any bound and lands in the overflow bucket.
    #[must_use]
    pub fn bucket_for_value(&self, value: f64) -> usize {
        // Upper-bound search: count the bounds that are not greater than the value.
        // The first bound is negative infinity, so the count is at least 1 for every value.
        self.lower_bounds
            .partition_point(|bound| !matches!(value.partial_cmp(bound), Some(Ordering::Less)))
            .saturating_sub(1)
    }

    /// Returns the `(lower, upper)` boundaries of the bucket with the given index.
    ///
    /// The lower boundary is inclusive and the upper one exclusive. The underflow bucket
    /// starts at negative infinity and the overflow bucket ends at positive infinity.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BucketIndexOutOfRange`] if `index` is not less than
    /// [`total_buckets()`][Self::total_buckets].
    pub fn bucket_boundaries(&self, index: usize) -> Result<(f64, f64)> {
        let lower = *self
            .lower_bounds
            .get(index)
            .ok_or(Error::BucketIndexOutOfRange {
                index,
                total_buckets: self.total_buckets(),
            })?;

        let upper = index
            .checked_add(1)
            .and_then(|next| self.lower_bounds.get(next))
            .copied()
            .unwrap_or(f64::INFINITY);

        Ok((lower, upper))
    }

    /// Width of each finite bucket, or zero for geometric bucketers.
    #[must_use]
    pub fn width(&self) -> f64 {
        self.width
    }

    /// Ratio between consecutive finite bounds, or zero for fixed-width bucketers.
    #[must_use]
    pub fn growth_factor(&self) -> f64 {
        self.growth_factor
    }

    /// Multiplier applied to geometric bounds.
    #[must_use]
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Number of buckets, not counting underflow and overflow.
    #[must_use]
    pub fn num_finite_buckets(&self) -> usize {
        self.num_finite_buckets
    }

    /// Number of buckets, including underflow and overflow.
    #[must_use]
    pub fn total_buckets(&self) -> usize {
        self.lower_bounds.len()
    }

    /// Index of the bucket that catches values below the first finite bound.
    #[must_use]
    #[cfg_attr(test, mutants::skip)] // Constant by definition.
    pub fn underflow_bucket(&self) -> usize {
        0
    }

    /// Index of the bucket that catches values at or above the last finite bound.
    #[must_use]
    pub fn overflow_bucket(&self) -> usize {
        self.total_buckets().saturating_sub(1)
    }

    /// The inclusive lower bound of every bucket, in ascending order.
    ///
    /// The first entry is always negative infinity.
    #[must_use]
    pub fn lower_bounds(&self) -> &[f64] {
        &self.lower_bounds
    }
}

fn invalid(problem: String) -> Error {
    Error::InvalidConfiguration { problem }
}
