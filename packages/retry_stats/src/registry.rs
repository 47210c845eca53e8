use std::sync::mpsc::{self, Receiver, Sender};

use parking_lot::Mutex;
use tracing::{trace, warn};

use crate::{CategoryName, Error, Result, StatEntry};

/// How a [`StatsRegistry`] collects entries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum StatsMode {
    /// Entries are recorded only through the registry itself.
    Local,

    /// Entries may additionally be recorded from worker threads through
    /// [`StatsHandle`]s, which forward them to the registry.
    Shared,
}

/// Anything that can receive finished [`StatEntry`] values.
///
/// Implemented by [`StatsRegistry`] and by the [`StatsHandle`] that worker threads use
/// to record into a shared registry.
pub trait RecordStats {
    /// Appends a finished entry. Entries are never modified or removed once recorded.
    fn record(&self, entry: StatEntry);

    /// Whether the recorder is ready to accept entries.
    ///
    /// [`retry_with_stats()`][crate::retry_with_stats] refuses to start an operation
    /// on a recorder that is not ready.
    fn is_configured(&self) -> bool {
        true
    }
}

/// The collection of retry statistics of a process.
///
/// A registry is created once by the top-level composition root of the program and passed
/// by reference to any code that performs instrumented retries. It starts out uninitialized
/// and must be set up in one of two modes before use:
///
/// * [`StatsMode::Local`] - entries are recorded through the registry itself. Share the
///   registry by reference (it is `Sync`) if multiple threads need it.
/// * [`StatsMode::Shared`] - in addition, [`StatsHandle`]s can be handed out to worker
///   threads that do not have access to the registry. Handles forward their entries to
///   the registry over a channel; the registry absorbs them whenever it is read.
///
/// The collection is append-only. Reading it never removes anything.
///
/// # Example
///
/// ```
/// use std::thread;
///
/// use retry_stats::{GenericRetry, StatsRegistry, retry_with_stats};
///
/// let registry = StatsRegistry::new();
///
/// // Must happen before any worker is given a handle.
/// registry.setup_shared().unwrap();
///
/// let handle = registry.handle().unwrap();
/// let worker = thread::spawn(move || {
///     let executor = GenericRetry::new(|_: &std::fmt::Error| true, 3);
///     retry_with_stats(&handle, "upload", &executor, || Ok::<_, std::fmt::Error>(()))
/// });
/// worker.join().unwrap().unwrap();
///
/// assert_eq!(registry.category_stats("upload").success(), 1);
/// ```
#[derive(Debug)]
pub struct StatsRegistry {
    state: Mutex<RegistryState>,
}

#[derive(Debug)]
enum RegistryState {
    Uninitialized,
    Local(Vec<StatEntry>),
    Shared(SharedCollection),
}

#[derive(Debug)]
struct SharedCollection {
    entries: Vec<StatEntry>,

    // Handed out (cloned) to every worker handle.
    sender: Sender<StatEntry>,

    // Entries sent by worker handles that have not yet been moved into `entries`.
    inbox: Receiver<StatEntry>,
}

impl SharedCollection {
    fn new() -> Self {
        let (sender, inbox) = mpsc::channel();

        Self {
            entries: Vec::new(),
            sender,
            inbox,
        }
    }

    fn absorb_inbox(&mut self) {
        self.entries.extend(self.inbox.try_iter());
    }
}

impl StatsRegistry {
    /// Creates a registry that has not been set up yet.
    ///
    /// Call [`setup_local()`][Self::setup_local] or [`setup_shared()`][Self::setup_shared]
    /// before recording anything into it.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(RegistryState::Uninitialized),
        }
    }

    /// Creates a registry that is already set up in local mode.
    #[must_use]
    pub fn local() -> Self {
        Self {
            state: Mutex::new(RegistryState::Local(Vec::new())),
        }
    }

    /// Creates a registry that is already set up in shared mode.
    #[must_use]
    pub fn shared() -> Self {
        Self {
            state: Mutex::new(RegistryState::Shared(SharedCollection::new())),
        }
    }

    /// Sets up the registry in local mode.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyConfigured`] if the registry was already set up.
    pub fn setup_local(&self) -> Result<()> {
        self.setup(RegistryState::Local(Vec::new()))
    }

    /// Sets up the registry in shared mode.
    ///
    /// This must happen before spawning the worker threads that will record into the
    /// registry, as they need a [`handle()`][Self::handle] to do so.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyConfigured`] if the registry was already set up.
    pub fn setup_shared(&self) -> Result<()> {
        self.setup(RegistryState::Shared(SharedCollection::new()))
    }

    fn setup(&self, configured: RegistryState) -> Result<()> {
        let mut state = self.state.lock();

        if let Some(mode) = state.mode() {
            return Err(Error::AlreadyConfigured { mode });
        }

        *state = configured;
        Ok(())
    }

    /// The mode the registry was set up in, or `None` if it has not been set up.
    #[must_use]
    pub fn mode(&self) -> Option<StatsMode> {
        self.state.lock().mode()
    }

    /// Creates a handle that worker threads can use to record into this registry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnconfiguredStats`] if the registry has not been set up and
    /// [`Error::NotShared`] if it was set up in local mode.
    pub fn handle(&self) -> Result<StatsHandle> {
        match &*self.state.lock() {
            RegistryState::Uninitialized => Err(Error::UnconfiguredStats),
            RegistryState::Local(_) => Err(Error::NotShared),
            RegistryState::Shared(shared) => Ok(StatsHandle {
                sender: shared.sender.clone(),
            }),
        }
    }

    /// Returns a snapshot of every entry recorded so far.
    ///
    /// An uninitialized registry has no entries.
    #[must_use]
    pub fn entries(&self) -> Vec<StatEntry> {
        self.inspect(<[StatEntry]>::to_vec)
    }

    /// Returns the names of all categories that have at least one entry, sorted and
    /// without duplicates.
    #[must_use]
    pub fn categories(&self) -> Vec<CategoryName> {
        let mut categories = self.inspect(|entries| {
            entries
                .iter()
                .map(|entry| entry.category().clone())
                .collect::<Vec<_>>()
        });

        categories.sort();
        categories.dedup();
        categories
    }

    /// Calls `f` with every entry recorded so far, absorbing any entries that
    /// worker handles have sent in the meantime.
    pub(crate) fn inspect<R>(&self, f: impl FnOnce(&[StatEntry]) -> R) -> R {
        let mut state = self.state.lock();

        match &mut *state {
            RegistryState::Uninitialized => f(&[]),
            RegistryState::Local(entries) => f(entries),
            RegistryState::Shared(shared) => {
                shared.absorb_inbox();
                f(&shared.entries)
            }
        }
    }
}

impl Default for StatsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistryState {
    fn mode(&self) -> Option<StatsMode> {
        match self {
            Self::Uninitialized => None,
            Self::Local(_) => Some(StatsMode::Local),
            Self::Shared(_) => Some(StatsMode::Shared),
        }
    }
}

impl RecordStats for StatsRegistry {
    /// # Panics
    ///
    /// Panics if the registry has not been set up.
    fn record(&self, entry: StatEntry) {
        let mut state = self.state.lock();

        let entries = match &mut *state {
            RegistryState::Uninitialized => {
                panic!("{}", Error::UnconfiguredStats)
            }
            RegistryState::Local(entries) => entries,
            RegistryState::Shared(shared) => &mut shared.entries,
        };

        trace!(
            category = %entry.category(),
            attempts = entry.attempts().len(),
            success = entry.is_success(),
            "recording retry statistics"
        );

        entries.push(entry);
    }

    fn is_configured(&self) -> bool {
        self.mode().is_some()
    }
}

/// Records entries into a [`StatsRegistry`] set up in shared mode, from any thread.
///
/// Obtain one via [`StatsRegistry::handle()`] and move it (or clones of it) to
/// worker threads.
#[derive(Clone, Debug)]
pub struct StatsHandle {
    sender: Sender<StatEntry>,
}

impl RecordStats for StatsHandle {
    fn record(&self, entry: StatEntry) {
        trace!(
            category = %entry.category(),
            attempts = entry.attempts().len(),
            success = entry.is_success(),
            "forwarding retry statistics to registry"
        );

        if let Err(mpsc::SendError(entry)) = self.sender.send(entry) {
            // The registry is gone, so nobody can ever read this entry.
            warn!(
                category = %entry.category(),
                "statistics registry dropped before worker finished, entry discarded"
            );
        }
    }
}
