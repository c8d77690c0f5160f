use serde::Serialize;

use crate::state::state_machine::{FinishReason, RoomPhase, TurnPhase};

/// Wire-friendly name of the current phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseKind {
    /// Accepting participants.
    Lobby,
    /// Acting on the round's item.
    Act,
    /// Voting on submissions.
    Vote,
    /// Per-round outcome display.
    RoundResults,
    /// Final standings.
    Results,
}

impl From<&RoomPhase> for PhaseKind {
    fn from(phase: &RoomPhase) -> Self {
        match phase {
            RoomPhase::Lobby => Self::Lobby,
            RoomPhase::Round(TurnPhase::Act) => Self::Act,
            RoomPhase::Round(TurnPhase::Vote) => Self::Vote,
            RoomPhase::RoundResults => Self::RoundResults,
            RoomPhase::Results => Self::Results,
        }
    }
}

/// Wire-friendly reason a game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishKind {
    /// The item sequence was exhausted.
    RoundsExhausted,
    /// Only one participant (at most) survived.
    LastSurvivor,
    /// Every board cell was played.
    BoardCleared,
    /// The host stopped the game.
    ManualStop,
}

impl From<&FinishReason> for FinishKind {
    fn from(reason: &FinishReason) -> Self {
        match reason {
            FinishReason::RoundsExhausted => Self::RoundsExhausted,
            FinishReason::LastSurvivor => Self::LastSurvivor,
            FinishReason::BoardCleared => Self::BoardCleared,
            FinishReason::ManualStop => Self::ManualStop,
        }
    }
}
