use thiserror::Error;

/// Errors that can occur when configuring or inspecting a [`Bucketer`][crate::Bucketer].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The caller supplied a combination of bucketer parameters that does not describe
    /// exactly one valid bucketing scheme.
    #[error("invalid bucketer configuration: {problem}")]
    InvalidConfiguration {
        /// A human-readable description of the problem.
        problem: String,
    },

    /// The caller asked about a bucket that the bucketer does not have.
    #[error("bucket index {index} is out of range, the bucketer has {total_buckets} buckets")]
    BucketIndexOutOfRange {
        /// The index that was requested.
        index: usize,

        /// The number of buckets in the bucketer, including underflow and overflow.
        total_buckets: usize,
    },
}

/// A specialized `Result` type for bucketing operations, returning the crate's
/// [`Error`] type as the error value.
pub(crate) type Result<T> = std::result::Result<T, Error>;
