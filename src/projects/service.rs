//! Project catalog service: cache, fetch coordination and live updates.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::api_types::into_project_list;
use super::fallback;
use super::types::{ProjectList, ProjectRecord};
use crate::cache::{
  invoke_isolated, Callback, CacheInfo, CacheStore, FetchStart, SubscriberRegistry, Subscription,
  DEFAULT_TTL_SECS,
};
use crate::config::CacheConfig;
use crate::store::DocumentStore;

/// Tunables for a [`ProjectService`].
#[derive(Debug, Clone)]
pub struct ServiceSettings {
  /// Collection holding one document per project
  pub collection: String,
  /// How long a fetched catalog is served without asking the store again
  pub ttl: chrono::Duration,
  /// Upper bound on a single fetch before falling back
  pub fetch_timeout: Duration,
}

impl Default for ServiceSettings {
  fn default() -> Self {
    Self {
      collection: "proyectos".to_string(),
      ttl: chrono::Duration::seconds(DEFAULT_TTL_SECS),
      fetch_timeout: Duration::from_secs(10),
    }
  }
}

impl From<&CacheConfig> for ServiceSettings {
  fn from(config: &CacheConfig) -> Self {
    Self {
      collection: config.collection.clone(),
      ttl: i64::try_from(config.ttl_secs)
        .ok()
        .and_then(chrono::Duration::try_seconds)
        .unwrap_or(chrono::Duration::MAX),
      fetch_timeout: Duration::from_secs(config.fetch_timeout_secs),
    }
  }
}

struct Inner<S> {
  store: S,
  settings: ServiceSettings,
  cache: CacheStore<ProjectRecord>,
  subscribers: SubscriberRegistry<ProjectRecord>,
  /// Bumped each time a fetch commits its outcome
  fetch_done: watch::Sender<u64>,
  realtime: Mutex<Option<JoinHandle<()>>>,
}

/// Shared access point to the project catalog.
///
/// Cheap to clone; all clones share one cache, one subscriber list and one
/// push channel.
///
/// `get_projects` never fails. It serves, in order of preference, a fresh
/// cached catalog, the result of a new fetch, or the built-in fallback
/// catalog when the store cannot be reached.
pub struct ProjectService<S: DocumentStore> {
  inner: Arc<Inner<S>>,
}

impl<S: DocumentStore> ProjectService<S> {
  /// Create a service with default settings.
  pub fn new(store: S) -> Self {
    Self::with_settings(store, ServiceSettings::default())
  }

  pub fn with_settings(store: S, settings: ServiceSettings) -> Self {
    let cache = CacheStore::new().with_ttl(settings.ttl);
    Self {
      inner: Arc::new(Inner {
        store,
        settings,
        cache,
        subscribers: SubscriberRegistry::new(),
        fetch_done: watch::channel(0).0,
        realtime: Mutex::new(None),
      }),
    }
  }

  pub fn settings(&self) -> &ServiceSettings {
    &self.inner.settings
  }

  /// Get the project catalog.
  ///
  /// 1. Unless `force_refresh`, a fresh cache is returned immediately
  /// 2. If a fetch is already running, wait for it and return its outcome
  /// 3. Otherwise fetch from the store; on failure seed the fallback catalog
  ///
  /// The fetch runs on its own task, so dropping this future does not
  /// cancel a fetch other callers may be waiting on.
  pub async fn get_projects(&self, force_refresh: bool) -> ProjectList {
    // Subscribe before looking at the flag so a fetch finishing in between
    // is not missed
    let mut done = self.inner.fetch_done.subscribe();

    match self.inner.cache.try_begin_fetch(force_refresh) {
      FetchStart::Fresh(projects) => {
        debug!(count = projects.len(), "serving cached projects");
        projects
      }
      FetchStart::InFlight => {
        debug!("project fetch already in flight, waiting");
        let _ = done.changed().await;
        self.inner.cache.read().items
      }
      FetchStart::Started => {
        let mut ticket = FetchTicket {
          inner: Arc::clone(&self.inner),
          committed: false,
        };
        let fetch = tokio::spawn(async move {
          let projects = ticket.inner.refresh().await;
          ticket.committed = true;
          projects
        });

        match fetch.await {
          Ok(projects) => projects,
          Err(err) => {
            error!(error = %err, "project fetch task failed");
            self.inner.cache.read().items
          }
        }
      }
    }
  }

  /// Register a callback for catalog changes.
  ///
  /// If the cache already holds projects the callback is invoked once with
  /// them before this returns.
  pub fn subscribe<F>(&self, callback: F) -> Subscription<ProjectRecord>
  where
    F: Fn(&[ProjectRecord]) + Send + Sync + 'static,
  {
    let callback: Callback<ProjectRecord> = Arc::new(callback);
    let subscription = self.inner.subscribers.register(Arc::clone(&callback));

    let snapshot = self.inner.cache.read();
    if !snapshot.items.is_empty() {
      invoke_isolated(subscription.id(), &callback, &snapshot.items);
    }

    subscription
  }

  /// The built-in catalog, bypassing the cache.
  pub fn get_hardcoded_projects(&self) -> ProjectList {
    fallback::projects()
  }

  /// Drop the cached catalog. The next `get_projects` fetches again.
  pub fn clear_cache(&self) {
    self.inner.cache.clear();
    info!("project cache cleared");
  }

  pub fn cache_info(&self) -> CacheInfo {
    self.inner.cache.info()
  }

  /// Start applying pushed snapshots from the store.
  ///
  /// Does nothing while a push channel is already running. Outside a Tokio
  /// runtime the channel cannot run and an error is logged instead.
  pub fn start_realtime(&self) {
    let mut slot = self
      .inner
      .realtime
      .lock()
      .unwrap_or_else(PoisonError::into_inner);

    if slot.as_ref().is_some_and(|task| !task.is_finished()) {
      debug!("real-time listener already active");
      return;
    }

    let Ok(runtime) = Handle::try_current() else {
      error!("real-time listener needs a Tokio runtime");
      return;
    };

    let collection = &self.inner.settings.collection;
    let mut updates = match self.inner.store.subscribe(collection) {
      Ok(updates) => updates,
      Err(err) => {
        error!(collection = %collection, error = %err, "failed to start real-time listener");
        return;
      }
    };

    let inner = Arc::clone(&self.inner);
    *slot = Some(runtime.spawn(async move {
      while let Some(update) = updates.recv().await {
        match update {
          Ok(documents) if documents.is_empty() => {
            debug!("ignoring empty real-time snapshot");
          }
          Ok(documents) => {
            let projects = into_project_list(documents);
            info!(count = projects.len(), "real-time update received");
            inner.cache.replace(projects);
            inner.notify();
          }
          Err(err) => {
            warn!(error = %err, "real-time listener error, keeping cached projects");
            break;
          }
        }
      }
      debug!("real-time listener finished");
    }));
    info!(collection = %collection, "real-time listener started");
  }

  /// Stop the push channel. Safe to call when it is not running.
  pub fn stop_realtime(&self) {
    let task = self
      .inner
      .realtime
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .take();

    if let Some(task) = task {
      task.abort();
      info!("real-time listener stopped");
    }
  }

  pub fn is_realtime_active(&self) -> bool {
    self
      .inner
      .realtime
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .as_ref()
      .is_some_and(|task| !task.is_finished())
  }
}

impl<S: DocumentStore> Inner<S> {
  /// Fetch from the store and commit the outcome. The caller has set the
  /// in-flight flag.
  async fn refresh(&self) -> ProjectList {
    let collection = &self.settings.collection;
    info!(collection = %collection, "fetching projects");

    let fetched =
      tokio::time::timeout(self.settings.fetch_timeout, self.store.fetch_all(collection)).await;

    let projects = match fetched {
      Ok(Ok(documents)) => {
        let projects = into_project_list(documents);
        info!(count = projects.len(), "fetched projects");
        projects
      }
      Ok(Err(err)) => {
        warn!(error = %err, "failed to fetch projects, using fallback");
        fallback::projects()
      }
      Err(_) => {
        warn!(
          timeout_ms = self.settings.fetch_timeout.as_millis() as u64,
          "project fetch timed out, using fallback"
        );
        fallback::projects()
      }
    };

    self.commit(Arc::clone(&projects));
    projects
  }

  /// Store a fetch outcome, clear the flag, wake waiters, then notify.
  fn commit(&self, projects: ProjectList) {
    self.cache.finish_fetch(projects);
    self.fetch_done.send_modify(|generation| *generation += 1);
    self.notify();
  }

  /// Tell every subscriber about the committed catalog.
  fn notify(&self) {
    let snapshot = self.cache.read();
    self.subscribers.notify_all(&snapshot.items);
  }
}

/// Owned by the task running a fetch. If that task ends without committing,
/// the fallback catalog is committed so the flag never stays set.
struct FetchTicket<S: DocumentStore> {
  inner: Arc<Inner<S>>,
  committed: bool,
}

impl<S: DocumentStore> Drop for FetchTicket<S> {
  fn drop(&mut self) {
    if !self.committed {
      warn!("project fetch ended without a result, using fallback");
      self.inner.commit(fallback::projects());
    }
  }
}

impl<S: DocumentStore> Clone for ProjectService<S> {
  fn clone(&self) -> Self {
    Self {
      inner: Arc::clone(&self.inner),
    }
  }
}
