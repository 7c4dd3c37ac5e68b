//! Mock engine host for integration testing
//!
//! Wraps the recording engine mocks and controls how attachment completes.

#![allow(dead_code)]

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use radio_engine::testing::MockServices;
use radio_session::{AttachCompletion, EngineHost, HostError, HostLink};

/// How `attach` behaves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachMode {
    /// Complete successfully from inside `attach`
    AutoComplete,
    /// Keep the completion until the test calls `complete_next`
    Manual,
    /// Return an error from `attach`
    FailImmediately,
    /// Accept, then report a failure through the completion
    FailAsync,
}

struct HostState {
    mode: Mutex<AttachMode>,
    attaches: AtomicU32,
    detaches: AtomicU32,
    pending: Mutex<VecDeque<AttachCompletion>>,
    links: Mutex<Vec<HostLink>>,
}

/// Engine host whose attachment outcome is scripted by the test
#[derive(Clone)]
pub struct MockEngineHost {
    state: Arc<HostState>,
    pub mocks: MockServices,
}

impl MockEngineHost {
    pub fn new(mode: AttachMode) -> Self {
        Self::with_mocks(mode, MockServices::new())
    }

    pub fn with_mocks(mode: AttachMode, mocks: MockServices) -> Self {
        Self {
            state: Arc::new(HostState {
                mode: Mutex::new(mode),
                attaches: AtomicU32::new(0),
                detaches: AtomicU32::new(0),
                pending: Mutex::new(VecDeque::new()),
                links: Mutex::new(Vec::new()),
            }),
            mocks,
        }
    }

    pub fn set_mode(&self, mode: AttachMode) {
        *self.state.mode.lock() = mode;
    }

    pub fn attach_count(&self) -> u32 {
        self.state.attaches.load(Ordering::SeqCst)
    }

    pub fn detach_count(&self) -> u32 {
        self.state.detaches.load(Ordering::SeqCst)
    }

    pub fn pending_count(&self) -> usize {
        self.state.pending.lock().len()
    }

    /// Simulate the host process of attempt `nth` (1-based) dying
    pub fn lose_attempt(&self, nth: usize) -> bool {
        let link = self.state.links.lock().get(nth.wrapping_sub(1)).cloned();
        match link {
            Some(link) => {
                link.lost();
                true
            }
            None => false,
        }
    }

    /// Simulate the most recently attached host process dying
    pub fn lose_host(&self) -> bool {
        let link = self.state.links.lock().last().cloned();
        match link {
            Some(link) => {
                link.lost();
                true
            }
            None => false,
        }
    }

    /// Complete the oldest held attachment successfully
    pub fn complete_next(&self) -> bool {
        let completion = self.state.pending.lock().pop_front();
        match completion {
            Some(completion) => {
                completion.complete(Ok(self.mocks.services()));
                true
            }
            None => false,
        }
    }

    /// Fail the oldest held attachment
    pub fn fail_next(&self, error: HostError) -> bool {
        let completion = self.state.pending.lock().pop_front();
        match completion {
            Some(completion) => {
                completion.complete(Err(error));
                true
            }
            None => false,
        }
    }
}

impl EngineHost for MockEngineHost {
    fn attach(&self, completion: AttachCompletion) -> Result<(), HostError> {
        self.state.attaches.fetch_add(1, Ordering::SeqCst);
        self.state.links.lock().push(completion.link());
        let mode = *self.state.mode.lock();
        match mode {
            AttachMode::AutoComplete => completion.complete(Ok(self.mocks.services())),
            AttachMode::Manual => self.state.pending.lock().push_back(completion),
            AttachMode::FailImmediately => {
                return Err(HostError::BindRefused("mock host".to_string()))
            }
            AttachMode::FailAsync => {
                completion.complete(Err(HostError::Unavailable("mock host".to_string())))
            }
        }
        Ok(())
    }

    fn detach(&self) {
        self.state.detaches.fetch_add(1, Ordering::SeqCst);
    }
}
