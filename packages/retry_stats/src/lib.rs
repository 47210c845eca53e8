#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Instrumented retries.
//!
//! Wraps a retry loop so that every attempt of an operation is timed and its outcome
//! recorded under a named category. The recorded statistics can later be summarized per
//! category as success, failure and retry counts, or rendered as a report that also
//! includes the distribution of attempt durations.
//!
//! # Recording
//!
//! Create one [`StatsRegistry`] at the top of the program, set it up and pass it to
//! [`retry_with_stats()`] together with an executor that implements the retry policy:
//!
//! ```
//! use std::io;
//!
//! use retry_stats::{GenericRetry, StatsRegistry, report_stats, retry_with_stats};
//!
//! let registry = StatsRegistry::new();
//! registry.setup_local().unwrap();
//!
//! let executor = GenericRetry::new(|e: &io::Error| e.kind() == io::ErrorKind::Interrupted, 3);
//!
//! let mut calls = 0;
//! let bytes = retry_with_stats(&registry, "download", &executor, || {
//!     calls += 1;
//!     if calls == 1 {
//!         Err(io::Error::from(io::ErrorKind::Interrupted))
//!     } else {
//!         Ok(1024)
//!     }
//! })
//! .unwrap();
//!
//! assert_eq!(bytes, 1024);
//!
//! let stats = registry.category_stats("download");
//! assert_eq!(stats.success(), 1);
//! assert_eq!(stats.retry(), 1);
//!
//! report_stats(&mut io::stdout(), &registry).unwrap();
//! ```
//!
//! # Worker threads
//!
//! A registry set up with [`StatsRegistry::setup_shared()`] hands out [`StatsHandle`]s.
//! A handle can be moved to a worker thread and used as the recorder there. The
//! registry sees the entries of all handles whenever it is read.
//!
//! # Custom retry policies
//!
//! [`GenericRetry`] retries errors accepted by a handler function, optionally sleeping
//! with exponential backoff between attempts. Any other policy can be plugged in by
//! implementing [`RetryExecutor`].
//!
//! # Logging
//!
//! Failed attempts, retries and recorded entries are reported via `tracing` events.
//! The crate never installs a subscriber.

mod entry;
mod error;
mod executor;
mod registry;
mod report;
mod retry;

pub use entry::*;
pub use error::*;
pub use executor::*;
pub use registry::*;
pub use report::*;
pub use retry::*;
