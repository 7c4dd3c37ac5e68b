//! Property-based tests for the session broker
//!
//! Random command sequences are issued from several threads at once. Once
//! everything settles the session must be in a consistent state and the
//! published event stream must be well formed.

mod mock_host;

use proptest::prelude::*;
use std::sync::Arc;
use std::thread;

use mock_host::{AttachMode, MockEngineHost};
use radio_engine::testing::PlayerCall;
use radio_session::{FocusEvent, PlayRequest, PlaybackState, SessionConfig, SessionEvent};
use test_helpers::{initialized_broker, record, SETTLE};

// ============================================================================
// Strategies
// ============================================================================

#[derive(Debug, Clone)]
enum Op {
    Play(i32),
    Stop,
    Connect,
    Disconnect,
    Focus(FocusEvent),
    HostLost,
}

fn focus_strategy() -> impl Strategy<Value = FocusEvent> {
    prop_oneof![
        Just(FocusEvent::Lost),
        Just(FocusEvent::LostTransient),
        Just(FocusEvent::LostTransientCanDuck),
        Just(FocusEvent::Regained),
    ]
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => prop_oneof![Just(-1), Just(3), Just(4)].prop_map(Op::Play),
        2 => Just(Op::Stop),
        1 => Just(Op::Connect),
        2 => Just(Op::Disconnect),
        2 => focus_strategy().prop_map(Op::Focus),
        1 => Just(Op::HostLost),
    ]
}

fn thread_ops_strategy() -> impl Strategy<Value = Vec<Vec<Op>>> {
    prop::collection::vec(prop::collection::vec(op_strategy(), 1..12), 1..4)
}

// ============================================================================
// Helpers
// ============================================================================

fn apply(broker: &radio_session::SessionBroker, host: &MockEngineHost, op: &Op) {
    match op {
        Op::Play(code) => {
            broker.play(PlayRequest::from_code(*code)).unwrap();
        }
        Op::Stop => broker.stop().unwrap(),
        Op::Connect => broker.connect().unwrap(),
        Op::Disconnect => broker.disconnect().unwrap(),
        Op::Focus(event) => {
            if let Some(sink) = broker.focus_sink() {
                sink.deliver(*event);
            }
        }
        Op::HostLost => {
            host.lose_host();
        }
    }
}

/// Every `Started` must follow its own `Loading`
fn starts_are_preceded_by_loading(events: &[SessionEvent]) -> bool {
    let mut loading_seen = false;
    for event in events {
        match event {
            SessionEvent::Loading => loading_seen = true,
            SessionEvent::Started => {
                if !loading_seen {
                    return false;
                }
                loading_seen = false;
            }
            _ => {}
        }
    }
    true
}

/// `Connected` and `Disconnected` strictly alternate, starting with `Connected`
fn connection_events_alternate(events: &[SessionEvent]) -> bool {
    let mut connected = false;
    for event in events.iter().filter(|e| e.is_connection_event()) {
        match event {
            SessionEvent::Connected if !connected => connected = true,
            SessionEvent::Disconnected if connected => connected = false,
            _ => return false,
        }
    }
    true
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Concurrent play/stop/disconnect sequences settle into a consistent session
    #[test]
    fn prop_concurrent_commands_settle_consistently(threads in thread_ops_strategy()) {
        let (broker, host) =
            initialized_broker(AttachMode::AutoComplete, SessionConfig::default());
        let broker = Arc::new(broker);
        let events = record(&broker);

        thread::scope(|scope| {
            for ops in &threads {
                let broker = Arc::clone(&broker);
                let host = host.clone();
                scope.spawn(move || {
                    for op in ops {
                        apply(&broker, &host, op);
                    }
                });
            }
        });
        prop_assert!(broker.settle(SETTLE));

        let snapshot = broker.snapshot();
        prop_assert!(!snapshot.connecting);
        prop_assert!(snapshot.pending_play.is_none());
        prop_assert_eq!(snapshot.connected, broker.focus_sink().is_some());
        if !snapshot.connected {
            prop_assert_eq!(snapshot.state, PlaybackState::Idle);
        }

        broker.disconnect().unwrap();
        let received: Vec<_> = events.try_iter().collect();

        // Every player that was created has been released exactly once
        prop_assert_eq!(
            host.mocks.media.created_count() as usize,
            host.mocks.media.count_calls(&PlayerCall::Release)
        );
        prop_assert_eq!(broker.state(), PlaybackState::Idle);
        prop_assert_eq!(host.mocks.power.held(), 0);
        prop_assert!(starts_are_preceded_by_loading(&received), "events: {:?}", received);
        prop_assert!(connection_events_alternate(&received), "events: {:?}", received);
        prop_assert!(!received.iter().any(|e| e.is_error()), "events: {:?}", received);
    }

    /// A single-threaded play always ends up playing on exactly one player
    #[test]
    fn prop_play_after_any_sequence_plays(ops in prop::collection::vec(op_strategy(), 0..16)) {
        let (broker, host) =
            initialized_broker(AttachMode::AutoComplete, SessionConfig::default());

        for op in &ops {
            apply(&broker, &host, op);
        }
        broker.play(PlayRequest::default()).unwrap();
        prop_assert!(broker.settle(SETTLE));

        let state = broker.state();
        prop_assert!(
            state == PlaybackState::Playing,
            "state {:?} after {:?}",
            state,
            ops
        );
        let live_players = host.mocks.media.created_count() as usize
            - host.mocks.media.count_calls(&PlayerCall::Release);
        prop_assert_eq!(live_players, 1);
    }
}
