//! CPU wake lock
//!
//! Background playback needs the CPU to keep running after the screen turns
//! off. The engine holds one partial wake lock from attach until destroy;
//! how the lock is taken is up to the `WakeLockHost`.

use crate::error::LeaseError;

/// Identifier the host hands out for a held wake lock
pub type WakeLockId = u64;

/// Tag reported to the OS for the engine's wake lock
pub const DEFAULT_WAKE_LOCK_TAG: &str = "BackgroundMode";

/// Host primitive that keeps the CPU awake
pub trait WakeLockHost: Send + Sync {
    /// Take a partial wake lock labelled `tag`
    fn acquire_wake_lock(&self, tag: &str) -> Result<WakeLockId, LeaseError>;
    fn release_wake_lock(&self, id: WakeLockId);
}
