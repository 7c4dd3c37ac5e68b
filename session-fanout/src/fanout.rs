//! Ordered subscriber registry
//!
//! `ListenerFanout` keeps subscribers in insertion order without duplicates
//! and delivers every published event to each of them in that order.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex};

use crate::event::SessionEvent;
use crate::listener::{same_listener, ListenerHandle};

/// Ordered set of session subscribers
///
/// Registry mutation happens under a mutex. `publish()` takes a snapshot of
/// the registry and delivers outside the lock, so a subscriber may subscribe,
/// unsubscribe or publish from inside its own handler without deadlocking.
/// Changes made during a delivery take effect from the next `publish()`.
///
/// A subscriber that panics is logged and skipped; delivery continues with
/// the next subscriber.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use session_fanout::{ListenerFanout, ListenerHandle, SessionEvent};
///
/// let fanout = ListenerFanout::new();
/// let listener: ListenerHandle = Arc::new(|event: &SessionEvent| {
///     println!("{}", event);
/// });
///
/// fanout.subscribe(Arc::clone(&listener));
/// fanout.subscribe(Arc::clone(&listener)); // already present, ignored
/// assert_eq!(fanout.len(), 1);
///
/// assert_eq!(fanout.publish(&SessionEvent::Connected), 1);
/// ```
#[derive(Default)]
pub struct ListenerFanout {
    listeners: Mutex<Vec<ListenerHandle>>,
}

impl ListenerFanout {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a subscriber unless the same handle is already registered
    ///
    /// Returns `true` if the subscriber was added.
    pub fn subscribe(&self, listener: ListenerHandle) -> bool {
        let mut listeners = self.lock();
        if listeners.iter().any(|l| same_listener(l, &listener)) {
            tracing::debug!("Subscriber already registered, ignoring");
            return false;
        }

        listeners.push(listener);
        tracing::debug!("Subscriber registered ({} total)", listeners.len());
        true
    }

    /// Remove a subscriber by identity
    ///
    /// Returns `true` if the subscriber was registered.
    pub fn unsubscribe(&self, listener: &ListenerHandle) -> bool {
        let mut listeners = self.lock();
        let before = listeners.len();
        listeners.retain(|l| !same_listener(l, listener));
        let removed = listeners.len() != before;

        if removed {
            tracing::debug!("Subscriber removed ({} remaining)", listeners.len());
        }
        removed
    }

    /// Replace every subscriber with exactly this one
    pub fn set_sole_subscriber(&self, listener: ListenerHandle) {
        let mut listeners = self.lock();
        listeners.clear();
        listeners.push(listener);
        tracing::debug!("Sole subscriber set");
    }

    /// Deliver an event to every current subscriber in registration order
    ///
    /// Returns the number of subscribers that handled the event without
    /// panicking.
    pub fn publish(&self, event: &SessionEvent) -> usize {
        let snapshot = self.snapshot();
        let mut delivered = 0;

        for (index, listener) in snapshot.iter().enumerate() {
            let outcome = catch_unwind(AssertUnwindSafe(|| listener.on_event(event)));
            match outcome {
                Ok(()) => delivered += 1,
                Err(_) => {
                    tracing::error!(
                        "Subscriber #{} panicked while handling {}; continuing delivery",
                        index,
                        event
                    );
                }
            }
        }

        tracing::trace!("Published {} to {}/{} subscribers", event, delivered, snapshot.len());
        delivered
    }

    /// Check whether a handle is registered
    pub fn contains(&self, listener: &ListenerHandle) -> bool {
        self.lock().iter().any(|l| same_listener(l, listener))
    }

    /// Number of registered subscribers
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no subscriber is registered
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Remove every subscriber
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn snapshot(&self) -> Vec<ListenerHandle> {
        self.lock().iter().map(Arc::clone).collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<ListenerHandle>> {
        // A panicking subscriber never holds this lock, so poisoning can only
        // come from a bug in this module; recover the data either way.
        self.listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for ListenerFanout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerFanout")
            .field("subscriber_count", &self.len())
            .finish()
    }
}
