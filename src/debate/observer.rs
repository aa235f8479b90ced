//! Progress notifications emitted while a debate runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use super::types::{Phase, Turn};

/// Receives debate progress synchronously, in the order it happens.
pub trait DebateObserver: Send + Sync {
    /// Called after a turn has been appended to the transcript.
    fn on_turn(&self, turn: &Turn);

    /// Called when a phase begins.
    fn on_phase(&self, phase: Phase);
}

/// Observer that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl DebateObserver for NoopObserver {
    fn on_turn(&self, _turn: &Turn) {}

    fn on_phase(&self, _phase: Phase) {}
}

// ============================================================================
// Debate Events
// ============================================================================

/// Events emitted during the debate process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DebateEvent {
    /// A participant produced a turn.
    TurnProduced {
        /// The appended turn.
        turn: Turn,
        /// When the turn was recorded.
        timestamp: DateTime<Utc>,
    },
    /// A phase has started.
    PhaseStarted {
        /// The new phase.
        phase: Phase,
        /// When the phase started.
        timestamp: DateTime<Utc>,
    },
}

impl DebateEvent {
    /// Creates a TurnProduced event.
    pub fn turn_produced(turn: Turn) -> Self {
        Self::TurnProduced {
            turn,
            timestamp: Utc::now(),
        }
    }

    /// Creates a PhaseStarted event.
    pub fn phase_started(phase: Phase) -> Self {
        Self::PhaseStarted {
            phase,
            timestamp: Utc::now(),
        }
    }

    /// Returns the timestamp of the event.
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::TurnProduced { timestamp, .. } | Self::PhaseStarted { timestamp, .. } => {
                *timestamp
            }
        }
    }
}

/// Forwards notifications into an unbounded channel.
///
/// Sending never blocks, so delivery stays synchronous with the engine. Events
/// sent after the receiver is dropped are discarded.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    event_tx: mpsc::UnboundedSender<DebateEvent>,
}

impl ChannelObserver {
    /// Wraps an existing sender.
    pub fn new(event_tx: mpsc::UnboundedSender<DebateEvent>) -> Self {
        Self { event_tx }
    }

    /// Creates an observer together with the receiving end.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<DebateEvent>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        (Self::new(event_tx), event_rx)
    }

    fn send_event(&self, event: DebateEvent) {
        let _ = self.event_tx.send(event);
    }
}

impl DebateObserver for ChannelObserver {
    fn on_turn(&self, turn: &Turn) {
        self.send_event(DebateEvent::turn_produced(turn.clone()));
    }

    fn on_phase(&self, phase: Phase) {
        self.send_event(DebateEvent::phase_started(phase));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debate::types::Participant;

    fn turn(round: u32) -> Turn {
        Turn {
            round,
            participant: Participant::debater(1, "Alice", "m"),
            content: format!("round {round}"),
        }
    }

    #[test]
    fn test_channel_preserves_order() {
        let (observer, mut event_rx) = ChannelObserver::channel();

        observer.on_phase(Phase::FreeDebate);
        observer.on_turn(&turn(1));
        observer.on_phase(Phase::ContrarianPhase);
        observer.on_turn(&turn(2));

        let mut events = Vec::new();
        while let Ok(event) = event_rx.try_recv() {
            events.push(event);
        }

        assert_eq!(events.len(), 4);
        assert!(matches!(
            events[0],
            DebateEvent::PhaseStarted {
                phase: Phase::FreeDebate,
                ..
            }
        ));
        assert!(matches!(&events[1], DebateEvent::TurnProduced { turn, .. } if turn.round == 1));
        assert!(matches!(
            events[2],
            DebateEvent::PhaseStarted {
                phase: Phase::ContrarianPhase,
                ..
            }
        ));
        assert!(matches!(&events[3], DebateEvent::TurnProduced { turn, .. } if turn.round == 2));
        assert!(events[0].timestamp() <= events[3].timestamp());
    }

    #[test]
    fn test_dropped_receiver_is_ignored() {
        let (observer, event_rx) = ChannelObserver::channel();
        drop(event_rx);
        observer.on_turn(&turn(1));
        observer.on_phase(Phase::FreeDebate);
    }

    #[test]
    fn test_event_serialization() {
        let event = DebateEvent::phase_started(Phase::ContrarianPhase);
        let json = serde_json::to_string(&event).expect("serialize");
        assert!(json.contains("PhaseStarted"));
        assert!(json.contains("contrarian_phase"));
    }
}
