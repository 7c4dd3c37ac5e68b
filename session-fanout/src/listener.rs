//! Subscriber capability
//!
//! A subscriber is anything that can receive `SessionEvent`s. Subscribers
//! are registered by identity (`Arc` pointer), so the same `Arc` can be
//! unsubscribed later without needing `PartialEq` on the listener itself.

use std::sync::Arc;

use crate::event::SessionEvent;

/// Event sink for session lifecycle events
///
/// Implementations are called on the engine thread, in registration order.
/// They may call back into the session broker; such calls are queued
/// behind the event currently being delivered.
///
/// Closures implement this trait directly:
///
/// ```rust
/// use std::sync::Arc;
/// use session_fanout::{ListenerHandle, SessionEvent};
///
/// let listener: ListenerHandle = Arc::new(|event: &SessionEvent| {
///     println!("session event: {}", event);
/// });
/// # let _ = listener;
/// ```
pub trait SessionListener: Send + Sync {
    /// Handle one session event
    fn on_event(&self, event: &SessionEvent);
}

impl<F> SessionListener for F
where
    F: Fn(&SessionEvent) + Send + Sync,
{
    fn on_event(&self, event: &SessionEvent) {
        self(event)
    }
}

/// Shared handle to a registered subscriber
pub type ListenerHandle = Arc<dyn SessionListener>;

/// Compare two handles by identity
///
/// Only the data pointer is compared; vtable pointers for the same type may
/// differ between codegen units.
pub fn same_listener(a: &ListenerHandle, b: &ListenerHandle) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_closure_listener() {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let listener: ListenerHandle = Arc::new(move |_: &SessionEvent| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        listener.on_event(&SessionEvent::Loading);
        listener.on_event(&SessionEvent::Started);

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_identity() {
        let a: ListenerHandle = Arc::new(|_: &SessionEvent| {});
        let b: ListenerHandle = Arc::new(|_: &SessionEvent| {});
        let a2 = Arc::clone(&a);

        assert!(same_listener(&a, &a2));
        assert!(!same_listener(&a, &b));
    }
}
