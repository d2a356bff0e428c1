//! Callback registry notified whenever the cached list changes.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use tracing::{debug, error};

/// A consumer callback receiving the full current list.
pub type Callback<T> = Arc<dyn Fn(&[T]) + Send + Sync>;

struct Entries<T> {
  next_id: u64,
  callbacks: Vec<(u64, Callback<T>)>,
}

/// Ordered set of registered callbacks.
pub struct SubscriberRegistry<T> {
  entries: Arc<Mutex<Entries<T>>>,
}

impl<T> SubscriberRegistry<T> {
  pub fn new() -> Self {
    Self {
      entries: Arc::new(Mutex::new(Entries {
        next_id: 0,
        callbacks: Vec::new(),
      })),
    }
  }

  /// Register a callback. It is not invoked until the next notification.
  pub fn register(&self, callback: Callback<T>) -> Subscription<T> {
    let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
    let id = entries.next_id;
    entries.next_id += 1;
    entries.callbacks.push((id, callback));
    debug!(subscriber = id, "subscriber registered");

    Subscription {
      id,
      entries: Arc::downgrade(&self.entries),
    }
  }

  pub fn len(&self) -> usize {
    self
      .entries
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .callbacks
      .len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Invoke every registered callback with `items`, in registration order.
  ///
  /// The registry is copied before iterating so callbacks may subscribe or
  /// unsubscribe while being notified. A panicking callback is logged and
  /// skipped.
  pub fn notify_all(&self, items: &[T]) {
    let callbacks: Vec<(u64, Callback<T>)> = self
      .entries
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .callbacks
      .clone();

    debug!(
      subscribers = callbacks.len(),
      items = items.len(),
      "notifying subscribers"
    );
    for (id, callback) in callbacks {
      invoke_isolated(id, &callback, items);
    }
  }
}

impl<T> Default for SubscriberRegistry<T> {
  fn default() -> Self {
    Self::new()
  }
}

/// Run one callback, containing any panic it raises.
pub(crate) fn invoke_isolated<T>(id: u64, callback: &Callback<T>, items: &[T]) {
  if panic::catch_unwind(AssertUnwindSafe(|| callback(items))).is_err() {
    error!(subscriber = id, "subscriber callback panicked");
  }
}

/// Handle returned by [`SubscriberRegistry::register`].
///
/// Dropping the handle does not unsubscribe; call [`Subscription::unsubscribe`].
pub struct Subscription<T> {
  id: u64,
  entries: Weak<Mutex<Entries<T>>>,
}

impl<T> Subscription<T> {
  pub fn id(&self) -> u64 {
    self.id
  }

  /// Remove the callback. Repeated calls, or calls after the registry is
  /// gone, do nothing.
  pub fn unsubscribe(&self) {
    let Some(entries) = self.entries.upgrade() else {
      return;
    };
    let mut entries = entries.lock().unwrap_or_else(PoisonError::into_inner);
    let before = entries.callbacks.len();
    entries.callbacks.retain(|(id, _)| *id != self.id);
    if entries.callbacks.len() != before {
      debug!(subscriber = self.id, "subscriber removed");
    }
  }
}

impl<T> std::fmt::Debug for Subscription<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Subscription")
      .field("id", &self.id)
      .finish_non_exhaustive()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn recorder() -> (Arc<Mutex<Vec<Vec<u32>>>>, Callback<u32>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let callback: Callback<u32> = Arc::new(move |items: &[u32]| {
      sink.lock().unwrap().push(items.to_vec());
    });
    (seen, callback)
  }

  #[test]
  fn test_register_does_not_invoke() {
    let registry = SubscriberRegistry::new();
    let (seen, callback) = recorder();
    registry.register(callback);

    assert!(seen.lock().unwrap().is_empty());
    assert_eq!(registry.len(), 1);
  }

  #[test]
  fn test_notify_all_in_registration_order() {
    let registry = SubscriberRegistry::new();
    let order = Arc::new(Mutex::new(Vec::new()));

    for tag in ["first", "second", "third"] {
      let order = Arc::clone(&order);
      registry.register(Arc::new(move |_: &[u32]| {
        order.lock().unwrap().push(tag);
      }));
    }

    registry.notify_all(&[1, 2]);
    assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
  }

  #[test]
  fn test_notify_passes_full_list() {
    let registry = SubscriberRegistry::new();
    let (seen, callback) = recorder();
    registry.register(callback);

    registry.notify_all(&[7, 8, 9]);
    assert_eq!(*seen.lock().unwrap(), vec![vec![7, 8, 9]]);
  }

  #[test]
  fn test_unsubscribe_is_idempotent() {
    let registry = SubscriberRegistry::new();
    let (seen, callback) = recorder();
    let subscription = registry.register(callback);

    subscription.unsubscribe();
    subscription.unsubscribe();
    registry.notify_all(&[1]);

    assert!(seen.lock().unwrap().is_empty());
    assert!(registry.is_empty());
  }

  #[test]
  fn test_unsubscribe_only_removes_own_callback() {
    let registry = SubscriberRegistry::new();
    let (first_seen, first) = recorder();
    let (second_seen, second) = recorder();
    let first_sub = registry.register(first);
    registry.register(second);

    first_sub.unsubscribe();
    registry.notify_all(&[3]);

    assert!(first_seen.lock().unwrap().is_empty());
    assert_eq!(second_seen.lock().unwrap().len(), 1);
  }

  #[test]
  fn test_unsubscribe_after_registry_dropped() {
    let registry = SubscriberRegistry::new();
    let (_seen, callback) = recorder();
    let subscription = registry.register(callback);
    drop(registry);

    subscription.unsubscribe();
  }

  #[test]
  fn test_panicking_callback_does_not_block_others() {
    let registry = SubscriberRegistry::new();
    registry.register(Arc::new(|_: &[u32]| panic!("subscriber failure")));
    let (seen, callback) = recorder();
    registry.register(callback);

    registry.notify_all(&[5]);
    assert_eq!(*seen.lock().unwrap(), vec![vec![5]]);
  }

  #[test]
  fn test_callback_may_register_during_notify() {
    let registry = Arc::new(SubscriberRegistry::new());
    let inner = Arc::clone(&registry);
    registry.register(Arc::new(move |_: &[u32]| {
      inner.register(Arc::new(|_: &[u32]| {}));
    }));

    registry.notify_all(&[1]);
    assert_eq!(registry.len(), 2);
  }
}
