//! Background engine thread
//!
//! Consumes `EngineInput`s in FIFO order. Each input is applied under the
//! session lock, and the resulting events are published after the lock is
//! released, so subscribers may call back into the broker freely.

use std::io;
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};

use session_fanout::ListenerFanout;

use crate::machine::{EngineInput, PlaybackCore};
use crate::session::SharedSession;

/// Name of the engine thread
pub const ENGINE_THREAD_NAME: &str = "radio-engine";

/// Whether the calling thread is an engine thread
pub fn on_engine_thread() -> bool {
    std::thread::current().name() == Some(ENGINE_THREAD_NAME)
}

/// Spawns the engine thread
///
/// `input_tx` lets the worker re-queue settle requests behind newer inputs.
pub fn spawn_engine_worker(
    core: PlaybackCore,
    session: SharedSession,
    fanout: Arc<ListenerFanout>,
    input_rx: mpsc::Receiver<EngineInput>,
    input_tx: mpsc::Sender<EngineInput>,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(ENGINE_THREAD_NAME.to_string())
        .spawn(move || run_engine_loop(core, session, fanout, input_rx, input_tx))
}

fn run_engine_loop(
    mut core: PlaybackCore,
    session: SharedSession,
    fanout: Arc<ListenerFanout>,
    input_rx: mpsc::Receiver<EngineInput>,
    input_tx: mpsc::Sender<EngineInput>,
) {
    tracing::info!("Engine worker started");

    // Whether anything ran since the last settle request was seen
    let mut busy = false;

    while let Ok(input) = input_rx.recv() {
        match input {
            EngineInput::Settle(ack) => {
                if busy {
                    busy = false;
                    if input_tx.send(EngineInput::Settle(ack)).is_err() {
                        return;
                    }
                } else {
                    let _ = ack.send(());
                }
            }
            EngineInput::Shutdown { announce } => {
                tracing::info!("Engine worker received shutdown command");
                core.destroy(&mut session.lock());
                if let Some(event) = announce {
                    fanout.publish(&event);
                }
                break;
            }
            input => {
                busy = true;
                let events = core.handle(&mut session.lock(), input);
                for event in &events {
                    tracing::debug!("Publishing {}", event);
                    fanout.publish(event);
                }
            }
        }
    }

    tracing::info!("Engine worker stopped");
}
