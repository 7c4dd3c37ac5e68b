//! Blocking iteration over session events
//!
//! `channel_listener()` creates a subscriber that forwards every event into a
//! `std::sync::mpsc` channel, and an `EventIterator` that consumes it. The
//! iterator can wait forever (`recv`, `for event in events`), poll
//! (`try_recv`, `try_iter`) or wait with a deadline (`recv_timeout`,
//! `timeout_iter`).

use std::sync::{mpsc, Arc};
use std::time::Duration;

use crate::event::SessionEvent;
use crate::listener::SessionListener;

/// Subscriber that forwards events into a channel
///
/// Events published after the matching `EventIterator` is dropped are
/// silently discarded.
#[derive(Debug)]
pub struct ChannelListener {
    tx: mpsc::Sender<SessionEvent>,
}

impl SessionListener for ChannelListener {
    fn on_event(&self, event: &SessionEvent) {
        if self.tx.send(event.clone()).is_err() {
            tracing::trace!("Event iterator dropped, discarding {}", event);
        }
    }
}

/// Create a channel-backed subscriber and the iterator that drains it
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use std::time::Duration;
/// use session_fanout::{channel_listener, ListenerFanout, SessionEvent};
///
/// let fanout = ListenerFanout::new();
/// let (listener, events) = channel_listener();
/// fanout.subscribe(listener);
///
/// fanout.publish(&SessionEvent::Connected);
/// assert_eq!(
///     events.recv_timeout(Duration::from_millis(100)),
///     Some(SessionEvent::Connected)
/// );
/// ```
pub fn channel_listener() -> (Arc<ChannelListener>, EventIterator) {
    let (tx, rx) = mpsc::channel();
    (Arc::new(ChannelListener { tx }), EventIterator::new(rx))
}

/// Receiving end of a `ChannelListener`
///
/// Iterating blocks on the engine's next published event.
#[derive(Debug)]
pub struct EventIterator {
    rx: mpsc::Receiver<SessionEvent>,
}

impl EventIterator {
    pub(crate) fn new(rx: mpsc::Receiver<SessionEvent>) -> Self {
        Self { rx }
    }

    /// Wait for the next published event
    ///
    /// Returns `None` if every sender is gone.
    pub fn recv(&self) -> Option<SessionEvent> {
        self.rx.recv().ok()
    }

    /// Wait up to `timeout` for the next published event
    ///
    /// Returns `None` if the timeout expires or the channel is closed.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<SessionEvent> {
        self.rx.recv_timeout(timeout).ok()
    }

    /// Take an already published event, if any
    pub fn try_recv(&self) -> Option<SessionEvent> {
        self.rx.try_recv().ok()
    }

    /// Non-blocking iterator over the events currently queued
    pub fn try_iter(&self) -> TryIter<'_> {
        TryIter { inner: self }
    }

    /// Blocking iterator that stops after `timeout` passes without an event
    pub fn timeout_iter(&self, timeout: Duration) -> TimeoutIter<'_> {
        TimeoutIter {
            inner: self,
            timeout,
        }
    }
}

impl Iterator for EventIterator {
    type Item = SessionEvent;

    /// Block until the next session event
    fn next(&mut self) -> Option<Self::Item> {
        self.recv()
    }
}

/// Drains the events published so far, see `EventIterator::try_iter`
pub struct TryIter<'a> {
    inner: &'a EventIterator,
}

impl<'a> Iterator for TryIter<'a> {
    type Item = SessionEvent;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.try_recv()
    }
}

/// Yields events until `timeout` passes without one, see `EventIterator::timeout_iter`
pub struct TimeoutIter<'a> {
    inner: &'a EventIterator,
    timeout: Duration,
}

impl<'a> Iterator for TimeoutIter<'a> {
    type Item = SessionEvent;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.recv_timeout(self.timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn test_nothing_published_yet() {
        let (_listener, iter) = channel_listener();
        assert!(iter.try_recv().is_none());
    }

    #[test]
    fn test_forwarding() {
        let (listener, iter) = channel_listener();

        listener.on_event(&SessionEvent::Loading);

        assert_eq!(iter.try_recv(), Some(SessionEvent::Loading));
        assert!(iter.try_recv().is_none());
    }

    #[test]
    fn test_recv_timeout() {
        let (_listener, iter) = channel_listener();

        let started_at = Instant::now();
        assert_eq!(iter.recv_timeout(Duration::from_millis(50)), None);
        assert!(started_at.elapsed() >= Duration::from_millis(45));
    }

    #[test]
    fn test_event_published_from_other_thread() {
        let (listener, iter) = channel_listener();

        thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            listener.on_event(&SessionEvent::Started);
        });

        assert_eq!(
            iter.recv_timeout(Duration::from_millis(500)),
            Some(SessionEvent::Started)
        );
    }

    #[test]
    fn test_try_iter_preserves_order() {
        let (listener, iter) = channel_listener();

        listener.on_event(&SessionEvent::Connected);
        listener.on_event(&SessionEvent::Loading);
        listener.on_event(&SessionEvent::Started);

        let events: Vec<_> = iter.try_iter().collect();
        assert_eq!(
            events,
            vec![
                SessionEvent::Connected,
                SessionEvent::Loading,
                SessionEvent::Started
            ]
        );
    }

    #[test]
    fn test_listener_dropped_ends_iteration() {
        let (listener, iter) = channel_listener();
        drop(listener);
        assert!(iter.recv().is_none());
    }

    #[test]
    fn test_send_after_iterator_dropped() {
        let (listener, iter) = channel_listener();
        drop(iter);
        // Must not panic
        listener.on_event(&SessionEvent::Stopped);
    }
}
