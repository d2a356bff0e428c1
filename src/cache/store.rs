//! Snapshot store with TTL freshness and an in-flight fetch flag.

use chrono::{DateTime, Duration, Utc};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

/// Default time a snapshot stays fresh after it was stored.
pub const DEFAULT_TTL_SECS: i64 = 5 * 60;

/// A consistent view of the store at one instant.
#[derive(Debug, Clone)]
pub struct CacheSnapshot<T> {
  /// Items in the order they were stored
  pub items: Arc<[T]>,
  /// When the items were stored (epoch zero if never)
  pub last_updated: DateTime<Utc>,
  /// Whether a fetch is currently running
  pub in_progress: bool,
}

impl<T> CacheSnapshot<T> {
  /// A snapshot is fresh when it holds at least one item and is younger than `ttl`.
  pub fn is_fresh(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
    !self.items.is_empty() && now - self.last_updated < ttl
  }
}

/// Outcome of [`CacheStore::try_begin_fetch`].
#[derive(Debug, Clone)]
pub enum FetchStart<T> {
  /// The snapshot is fresh; no fetch is needed
  Fresh(Arc<[T]>),
  /// Another fetch holds the flag
  InFlight,
  /// The flag is now set and the caller owns the fetch
  Started,
}

/// Diagnostic summary of the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheInfo {
  pub project_count: usize,
  pub last_updated: DateTime<Utc>,
  pub in_progress: bool,
  pub age: Duration,
  pub is_valid: bool,
}

impl fmt::Display for CacheInfo {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(f, "projects:     {}", self.project_count)?;
    if self.last_updated == DateTime::<Utc>::UNIX_EPOCH {
      writeln!(f, "last updated: never")?;
    } else {
      writeln!(
        f,
        "last updated: {}",
        self.last_updated.format("%Y-%m-%d %H:%M:%S UTC")
      )?;
      writeln!(f, "age:          {}s", self.age.num_seconds())?;
    }
    writeln!(f, "loading:      {}", self.in_progress)?;
    write!(f, "valid:        {}", self.is_valid)
  }
}

struct CacheState<T> {
  items: Arc<[T]>,
  last_updated: DateTime<Utc>,
  in_progress: bool,
}

impl<T> CacheState<T> {
  fn empty() -> Self {
    Self {
      items: Arc::from(Vec::new()),
      last_updated: DateTime::<Utc>::UNIX_EPOCH,
      in_progress: false,
    }
  }
}

/// Holds the single authoritative snapshot of a list.
///
/// Every mutation swaps the whole list under the write lock, so readers
/// always observe either the previous or the next complete list.
pub struct CacheStore<T> {
  state: RwLock<CacheState<T>>,
  ttl: Duration,
}

impl<T> CacheStore<T> {
  /// Create an empty store with the default TTL.
  pub fn new() -> Self {
    Self {
      state: RwLock::new(CacheState::empty()),
      ttl: Duration::seconds(DEFAULT_TTL_SECS),
    }
  }

  /// Set how long a stored snapshot stays fresh.
  pub fn with_ttl(mut self, ttl: Duration) -> Self {
    self.ttl = ttl;
    self
  }

  pub fn ttl(&self) -> Duration {
    self.ttl
  }

  /// Current snapshot. Never blocks on a fetch.
  pub fn read(&self) -> CacheSnapshot<T> {
    let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
    CacheSnapshot {
      items: Arc::clone(&state.items),
      last_updated: state.last_updated,
      in_progress: state.in_progress,
    }
  }

  /// Cached items if the snapshot is still fresh.
  pub fn fresh(&self) -> Option<Arc<[T]>> {
    let snapshot = self.read();
    snapshot
      .is_fresh(self.ttl, Utc::now())
      .then_some(snapshot.items)
  }

  pub fn is_valid(&self) -> bool {
    self.read().is_fresh(self.ttl, Utc::now())
  }

  /// Swap in a new list and stamp it with the current time.
  pub fn replace(&self, items: Arc<[T]>) {
    let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
    state.items = items;
    state.last_updated = Utc::now();
  }

  /// Decide under one write lock whether the caller should fetch.
  ///
  /// Unless `force`, a fresh snapshot is returned as is. Otherwise the
  /// in-flight flag is set if it was clear, and the caller must end the
  /// fetch with [`CacheStore::finish_fetch`].
  pub fn try_begin_fetch(&self, force: bool) -> FetchStart<T> {
    let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
    if !force && !state.items.is_empty() && Utc::now() - state.last_updated < self.ttl {
      return FetchStart::Fresh(Arc::clone(&state.items));
    }
    if state.in_progress {
      return FetchStart::InFlight;
    }
    state.in_progress = true;
    FetchStart::Started
  }

  /// Store the outcome of a fetch and clear the in-flight flag in one step.
  pub fn finish_fetch(&self, items: Arc<[T]>) {
    let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
    state.items = items;
    state.last_updated = Utc::now();
    state.in_progress = false;
  }

  /// Reset to the initial empty state.
  pub fn clear(&self) {
    let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
    *state = CacheState::empty();
  }

  pub fn info(&self) -> CacheInfo {
    let snapshot = self.read();
    let now = Utc::now();
    CacheInfo {
      project_count: snapshot.items.len(),
      last_updated: snapshot.last_updated,
      in_progress: snapshot.in_progress,
      age: now - snapshot.last_updated,
      is_valid: snapshot.is_fresh(self.ttl, now),
    }
  }
}

impl<T> Default for CacheStore<T> {
  fn default() -> Self {
    Self::new()
  }
}
