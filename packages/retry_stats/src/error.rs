use thiserror::Error;

use crate::StatsMode;

/// Errors that can occur when setting up a [`StatsRegistry`][crate::StatsRegistry]
/// or obtaining handles from it.
///
/// Errors returned by the operations being retried are never converted into this type.
/// They reach the caller of [`retry_with_stats()`][crate::retry_with_stats] unchanged.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Statistics were requested from a registry that has not been set up yet.
    ///
    /// Call [`setup_local()`][crate::StatsRegistry::setup_local] or
    /// [`setup_shared()`][crate::StatsRegistry::setup_shared] first.
    #[error("the statistics registry has not been set up")]
    UnconfiguredStats,

    /// The registry was already set up and cannot be set up a second time.
    #[error("the statistics registry is already set up in {mode:?} mode")]
    AlreadyConfigured {
        /// The mode the registry is currently in.
        mode: StatsMode,
    },

    /// A worker handle was requested from a registry that was set up in local mode.
    ///
    /// Worker handles exist only for registries set up in shared mode, which must happen
    /// before the worker threads that will record into the registry are spawned.
    #[error("worker handles are only available from a registry set up in shared mode")]
    NotShared,
}

/// A specialized `Result` type for registry operations, returning the crate's
/// [`Error`] type as the error value.
pub(crate) type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::fmt::Debug;

    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(Error: Send, Sync, Debug);

    #[test]
    fn already_configured_names_mode() {
        let error = Error::AlreadyConfigured {
            mode: StatsMode::Shared,
        };

        assert!(error.to_string().contains("Shared"));
    }
}
