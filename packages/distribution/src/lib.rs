#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Histogram bucketing for monitoring data.
//!
//! A [`Bucketer`] maps any real-valued measurement to one of a fixed set of contiguous,
//! half-open buckets. A [`Distribution`] uses a bucketer to accumulate a histogram of
//! observed values, together with their count and sum.
//!
//! # Bucketing schemes
//!
//! Two schemes are supported, selected at construction time:
//!
//! * **Fixed width** - every finite bucket has the same width, starting at zero.
//! * **Geometric** - bucket bounds grow by a constant factor, starting at a scale.
//!   This suits latencies and sizes that span several orders of magnitude.
//!
//! Every bucketer also has an underflow bucket (index 0) and an overflow bucket
//! (the last index) that catch values outside the finite range.
//!
//! ```
//! use distribution::Bucketer;
//!
//! // [0, 10), [10, 20), ..., [40, 50) plus underflow and overflow.
//! let sizes = Bucketer::fixed_width(10.0, 5).unwrap();
//! assert_eq!(sizes.total_buckets(), 7);
//! assert_eq!(sizes.bucket_boundaries(5).unwrap(), (40.0, 50.0));
//!
//! // Five buckets per decade, starting at 1.
//! let latencies = Bucketer::default_geometric();
//! assert_eq!(latencies.bucket_for_value(0.5), 0);
//! assert_eq!(latencies.bucket_for_value(1.0), 1);
//! ```
//!
//! # Accumulating values
//!
//! ```
//! use std::sync::Arc;
//!
//! use distribution::{Bucketer, Distribution};
//!
//! let bucketer = Arc::new(Bucketer::default_geometric());
//!
//! let mut request_millis = Distribution::new(Arc::clone(&bucketer));
//! request_millis.add(12);
//! request_millis.add(250.5);
//!
//! assert_eq!(request_millis.count(), 2);
//! println!("{request_millis}");
//! ```
//!
//! # Panic policy
//!
//! Building a bucketer whose bounds turn out not to be strictly increasing panics.
//! Such a configuration can only come from a programming error, for example a geometric
//! growth factor that is not greater than 1.
//!
//! Merging distributions that use different bucketers panics.
//!
//! Adding values never panics. Counts near `u64::MAX` may wrap.

mod bucketer;
mod bucketer_builder;
mod distribution;
mod error;
mod render;

pub use bucketer::*;
pub use bucketer_builder::*;
pub use distribution::*;
pub use error::*;
pub(crate) use render::*;
