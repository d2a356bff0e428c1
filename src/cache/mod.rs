//! Generic in-memory snapshot cache with change notification.
//!
//! This module knows nothing about projects or Firestore. It provides:
//! - A TTL-bound snapshot store holding one ordered list replaced wholesale
//! - An in-flight flag so a single fetcher can be coordinated
//! - A callback registry notified after every committed replacement

mod store;
mod subscribers;

pub use store::{CacheInfo, CacheSnapshot, CacheStore, FetchStart, DEFAULT_TTL_SECS};
pub use subscribers::{Callback, SubscriberRegistry, Subscription};
pub(crate) use subscribers::invoke_isolated;
