//! Session event fan-out
//!
//! Ordered, identity-based subscriber registry for radio playback sessions,
//! plus a channel-backed subscriber for blocking iteration.
//!
//! # Features
//!
//! - **Ordered delivery**: events reach subscribers in registration order
//! - **Identity registration**: subscribers are `Arc` handles compared by pointer
//! - **Fault isolation**: a panicking subscriber does not stop delivery to the rest
//! - **Re-entrancy**: subscribers may mutate the registry from inside a handler
//! - **Blocking iteration**: `channel_listener()` turns the event stream into an iterator
//!
//! # Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use session_fanout::{channel_listener, ListenerFanout, SessionEvent};
//!
//! let fanout = Arc::new(ListenerFanout::new());
//! let (listener, events) = channel_listener();
//! fanout.subscribe(listener);
//!
//! fanout.publish(&SessionEvent::Loading);
//! fanout.publish(&SessionEvent::Started);
//!
//! let received: Vec<_> = events.try_iter().collect();
//! assert_eq!(received, vec![SessionEvent::Loading, SessionEvent::Started]);
//! ```
//!
//! # Architecture
//!
//! ```text
//! ListenerFanout
//!     │
//!     └── listeners: Mutex<Vec<Arc<dyn SessionListener>>>
//!             │
//!             ├── closures, plugin bridges, ...
//!             │
//!             └── ChannelListener ── mpsc::channel<SessionEvent>
//!                                         │
//!                                         └── EventIterator
//! ```

// Modules
pub mod event;
pub mod fanout;
pub mod iter;
pub mod listener;

// Re-exports - Public API
pub use event::{SessionEvent, SessionFailure};
pub use fanout::ListenerFanout;
pub use iter::{channel_listener, ChannelListener, EventIterator, TimeoutIter, TryIter};
pub use listener::{same_listener, ListenerHandle, SessionListener};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::event::{SessionEvent, SessionFailure};
    pub use crate::fanout::ListenerFanout;
    pub use crate::iter::{channel_listener, EventIterator};
    pub use crate::listener::{ListenerHandle, SessionListener};
}
