use std::any::type_name;
use std::borrow::Cow;
use std::fmt::{self, Display};
use std::time::Duration;

/// The name of a statistics category, used for grouping and reporting.
///
/// Typically category names are `&'static str` constants but owned strings are
/// also accepted for categories that are only known at runtime.
pub type CategoryName = Cow<'static, str>;

/// Describes why an attempt failed.
///
/// The `kind` identifies the error type and the `message` is its `Display` output, so
/// reports can group failures by kind without parsing strings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FailureRecord {
    kind: String,
    message: String,
}

impl FailureRecord {
    /// Creates a failure record from its parts.
    #[must_use]
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// Describes an error value, using the unqualified name of its type as the kind.
    #[must_use]
    pub fn from_error<E>(error: &E) -> Self
    where
        E: Display + ?Sized,
    {
        Self {
            kind: short_type_name::<E>(),
            message: error.to_string(),
        }
    }

    /// Describes an error value with a kind chosen by the caller.
    ///
    /// Use this when the type of the error does not identify the failure, for example
    /// with boxed trait objects or with one error type that covers many failure modes.
    #[must_use]
    pub fn from_error_with_kind<E>(kind: impl Into<String>, error: &E) -> Self
    where
        E: Display + ?Sized,
    {
        Self::new(kind, error.to_string())
    }

    /// The kind of failure, typically the name of the error type.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// The human-readable failure message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for FailureRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// Smart pointers whose pointee names the failure better than the pointer itself.
const TRANSPARENT_WRAPPERS: &[&str] = &["Box", "Arc", "Rc"];

/// `my_crate::net::FetchError<alloc::string::String>` becomes `FetchError`.
///
/// Smart pointers and references are looked through, so `Box<FetchError>` is also
/// `FetchError`. Trait objects keep a `dyn` prefix, as their concrete type is unknown:
/// `Box<dyn core::error::Error + Send + Sync>` becomes `dyn Error`.
fn short_type_name<T: ?Sized>() -> String {
    let mut name = type_name::<T>();

    loop {
        name = name.trim_start_matches('&').trim_start_matches("mut ");

        let Some((outer, inner)) = name.split_once('<') else {
            break;
        };

        let outer = last_path_segment(outer);

        if !TRANSPARENT_WRAPPERS.iter().any(|wrapper| *wrapper == outer) {
            break;
        }

        name = inner.strip_suffix('>').unwrap_or(inner);
    }

    let (prefix, name) = match name.strip_prefix("dyn ") {
        Some(bounds) => ("dyn ", bounds.split(" + ").next().unwrap_or(bounds)),
        None => ("", name),
    };

    let without_generics = name.split('<').next().unwrap_or(name);

    format!("{prefix}{}", last_path_segment(without_generics))
}

fn last_path_segment(path: &str) -> &str {
    path.rsplit("::").next().unwrap_or(path)
}

/// One execution try of a retried operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attempt {
    elapsed: Duration,

    // None if the attempt succeeded.
    failure: Option<FailureRecord>,
}

impl Attempt {
    pub(crate) fn new(elapsed: Duration, failure: Option<FailureRecord>) -> Self {
        Self { elapsed, failure }
    }

    /// Wall-clock time the attempt took.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Why the attempt failed, or `None` if it succeeded.
    #[must_use]
    pub fn failure(&self) -> Option<&FailureRecord> {
        self.failure.as_ref()
    }

    /// Whether the attempt succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }

    /// Creates an `Attempt` with fake data for testing purposes.
    ///
    /// This constructor is only available with the `test-util` feature.
    #[cfg(any(test, feature = "test-util"))]
    #[must_use]
    pub fn fake(elapsed: Duration, failure: Option<FailureRecord>) -> Self {
        Self::new(elapsed, failure)
    }
}

/// The statistics of one call to [`retry_with_stats()`][crate::retry_with_stats]:
/// its category and every attempt it made, in chronological order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatEntry {
    category: CategoryName,
    attempts: Vec<Attempt>,
}

impl StatEntry {
    pub(crate) fn new(category: CategoryName) -> Self {
        Self {
            category,
            attempts: Vec::new(),
        }
    }

    pub(crate) fn push_attempt(&mut self, attempt: Attempt) {
        self.attempts.push(attempt);
    }

    /// The category the operation was recorded under.
    #[must_use]
    pub fn category(&self) -> &CategoryName {
        &self.category
    }

    /// Every attempt, in the order they were made.
    #[must_use]
    pub fn attempts(&self) -> &[Attempt] {
        &self.attempts
    }

    /// Whether any attempt succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.attempts.iter().any(Attempt::is_success)
    }

    /// Number of attempts beyond the first one.
    #[must_use]
    pub fn retry_count(&self) -> usize {
        self.attempts.len().saturating_sub(1)
    }

    /// Creates a `StatEntry` with fake data for testing purposes.
    ///
    /// This constructor is only available with the `test-util` feature and allows
    /// creating arbitrary test data without running any operation.
    #[cfg(any(test, feature = "test-util"))]
    #[must_use]
    pub fn fake(category: impl Into<CategoryName>, attempts: Vec<Attempt>) -> Self {
        Self {
            category: category.into(),
            attempts,
        }
    }
}
