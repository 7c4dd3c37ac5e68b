//! Engine host attachment seam
//!
//! On a mobile platform the engine lives in a separately started background
//! service. `EngineHost` starts or binds that service and later reports
//! whether the engine's collaborators became available. If the service dies
//! after that, the host reports it through a `HostLink`.

use std::sync::Weak;

use radio_engine::EngineServices;

use crate::broker::BrokerShared;
use crate::error::HostError;

/// Host process that carries the playback engine
pub trait EngineHost: Send + Sync {
    /// Begin attaching
    ///
    /// Returning an error fails the attempt immediately. Otherwise the host
    /// reports the outcome through `completion`, either later from any
    /// thread or synchronously before returning.
    fn attach(&self, completion: AttachCompletion) -> Result<(), HostError>;

    /// Unbind from the host process
    fn detach(&self);
}

/// One-shot callback for an attachment attempt
///
/// Completions of attempts superseded by a disconnect or a newer connect
/// are dropped.
pub struct AttachCompletion {
    generation: u64,
    broker: Weak<BrokerShared>,
}

impl AttachCompletion {
    pub(crate) fn new(generation: u64, broker: Weak<BrokerShared>) -> Self {
        Self { generation, broker }
    }

    /// Attempt number this completion belongs to
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Handle for reporting that the attached host went away
    ///
    /// Take it before calling `complete`, which consumes the completion.
    pub fn link(&self) -> HostLink {
        HostLink {
            generation: self.generation,
            broker: self.broker.clone(),
        }
    }

    /// Report the outcome of the attachment
    pub fn complete(self, outcome: Result<EngineServices, HostError>) {
        match self.broker.upgrade() {
            Some(broker) => broker.finish_attach(self.generation, outcome),
            None => tracing::debug!(
                "Broker dropped before attachment {} completed",
                self.generation
            ),
        }
    }
}

impl std::fmt::Debug for AttachCompletion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttachCompletion")
            .field("generation", &self.generation)
            .finish()
    }
}

/// Reports the loss of an attached host process
///
/// Reports for an attachment that was already disconnected or superseded
/// are ignored.
#[derive(Clone)]
pub struct HostLink {
    generation: u64,
    broker: Weak<BrokerShared>,
}

impl HostLink {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The host process died or unbound on its own
    ///
    /// Shuts the engine down, drops any pending play and publishes
    /// `Disconnected`. `EngineHost::detach` is not called.
    pub fn lost(&self) {
        match self.broker.upgrade() {
            Some(broker) => broker.host_lost(self.generation),
            None => tracing::debug!("Broker dropped before host {} was lost", self.generation),
        }
    }
}

impl std::fmt::Debug for HostLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostLink")
            .field("generation", &self.generation)
            .finish()
    }
}
