use std::time::Instant;

use thiserror::Error;
use uuid::Uuid;

/// High-level phases a room can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomPhase {
    /// Accepting participants; nothing is being played.
    Lobby,
    /// A round is in progress, in one of the turn sub-phases.
    Round(TurnPhase),
    /// Per-round outcome display (explanation game only).
    RoundResults,
    /// Terminal standings for the whole game.
    Results,
}

/// Fine-grained sub-phase while a round is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    /// Participants perform the round's primary action: answer a question,
    /// write an explanation, or pick and resolve a board cell.
    Act,
    /// Participants vote on the recorded submissions, one at a time.
    Vote,
}

/// Indicates why gameplay transitioned to the final results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    /// The item sequence was played to the end.
    RoundsExhausted,
    /// At most one participant remains alive.
    LastSurvivor,
    /// Every board cell has been answered.
    BoardCleared,
    /// The host stopped the game early.
    ManualStop,
}

/// Events that can be applied to the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomEvent {
    /// Leave the lobby and begin the first round.
    Start,
    /// Hand the turn to the next actor within the same sub-phase, or begin
    /// the next quiz round. Bumps the version so stale countdowns die.
    AdvanceTurn,
    /// Every participant has submitted; open the voting phase.
    OpenVoting,
    /// Every participant has voted; show the round outcome.
    ShowRoundResults,
    /// Start the next round from the round-results display.
    NextRound,
    /// Transition to the final results.
    Finish(FinishReason),
    /// Return a finished room to the lobby.
    Replay,
}

/// Error returned when attempting to apply an invalid transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// The phase the state machine was in when the invalid event was received.
    pub from: RoomPhase,
    /// The event that cannot be applied from this phase.
    pub event: RoomEvent,
}

/// Errors that can occur when planning a state machine transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    /// A transition is already pending and must be applied or aborted.
    AlreadyPending,
    /// The requested transition is not valid from the current phase.
    InvalidTransition(InvalidTransition),
}

/// Errors that can occur when applying a planned state machine transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyError {
    /// No transition is currently pending.
    NoPending,
    /// Plan ID does not match the pending plan.
    IdMismatch {
        /// Expected plan ID.
        expected: PlanId,
        /// Provided plan ID.
        got: PlanId,
    },
    /// State machine phase changed since the plan was created.
    PhaseMismatch {
        /// Phase when plan was created.
        expected: RoomPhase,
        /// Current phase.
        actual: RoomPhase,
    },
    /// State machine version changed since the plan was created.
    VersionMismatch {
        /// Version when plan was created.
        expected: usize,
        /// Current version.
        actual: usize,
    },
}

/// Errors that can occur when aborting a planned state machine transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortError {
    /// No transition is currently pending.
    NoPending,
    /// Plan ID does not match the pending plan.
    IdMismatch {
        /// Expected plan ID.
        expected: PlanId,
        /// Provided plan ID.
        got: PlanId,
    },
}

/// Unique identifier for a planned state transition.
pub type PlanId = Uuid;

/// A planned state machine transition that has been validated but not yet applied.
#[derive(Debug, Clone)]
pub struct Plan {
    /// Unique identifier for this plan.
    pub id: PlanId,
    /// Phase the state machine is currently in.
    pub from: RoomPhase,
    /// Phase the state machine will transition to.
    pub to: RoomPhase,
    /// Event that triggered this transition.
    pub event: RoomEvent,
    /// Version number after applying this transition.
    pub version_next: usize,
    /// Timestamp when this plan was created.
    pub pending_since: Instant,
}

/// Snapshot of the current state machine state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Current phase of the state machine.
    pub phase: RoomPhase,
    /// Version number of the state machine (increments on each transition).
    pub version: usize,
    /// Pending transition phase, if a transition is planned but not yet applied.
    pub pending: Option<RoomPhase>,
}

/// State machine implementing the lobby → rounds → results flow shared by
/// every game variant.
#[derive(Debug, Clone)]
pub struct RoomStateMachine {
    phase: RoomPhase,
    version: usize,
    pending: Option<Plan>,
}

impl Default for RoomStateMachine {
    fn default() -> Self {
        Self {
            phase: RoomPhase::Lobby,
            version: 0,
            pending: None,
        }
    }
}

impl RoomStateMachine {
    /// Create a new state machine initialised in the lobby.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inspect the current phase.
    pub fn phase(&self) -> RoomPhase {
        self.phase
    }

    /// Current version number. Increments on every applied transition, which
    /// makes it a cheap staleness guard for countdown expiries.
    pub fn version(&self) -> usize {
        self.version
    }

    /// Create a snapshot of the current state machine state.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            phase: self.phase,
            version: self.version,
            pending: self.pending.as_ref().map(|plan| plan.to),
        }
    }

    /// Plan a transition by validating that the event can be applied from the
    /// current phase. Returns a Plan that can later be applied or aborted.
    pub fn plan(&mut self, event: RoomEvent) -> Result<Plan, PlanError> {
        if self.pending.is_some() {
            return Err(PlanError::AlreadyPending);
        }

        let next = self
            .compute_transition(event.clone())
            .map_err(PlanError::InvalidTransition)?;

        let plan = Plan {
            id: Uuid::new_v4(),
            from: self.phase,
            to: next,
            event,
            version_next: self.version + 1,
            pending_since: Instant::now(),
        };

        self.pending = Some(plan.clone());

        Ok(plan)
    }

    /// Apply a planned transition, moving the state machine to the next phase.
    /// Returns the new phase after the transition.
    pub fn apply(&mut self, plan_id: PlanId) -> Result<RoomPhase, ApplyError> {
        let plan = self.pending.take().ok_or(ApplyError::NoPending)?;

        if plan.id != plan_id {
            let expected_plan_id = plan.id;
            self.pending = Some(plan);
            return Err(ApplyError::IdMismatch {
                expected: expected_plan_id,
                got: plan_id,
            });
        }

        if self.phase != plan.from {
            return Err(ApplyError::PhaseMismatch {
                expected: plan.from,
                actual: self.phase,
            });
        }

        if self.version + 1 != plan.version_next {
            return Err(ApplyError::VersionMismatch {
                expected: plan.version_next,
                actual: self.version + 1,
            });
        }

        self.phase = plan.to;
        self.version = plan.version_next;
        self.pending = None;

        Ok(self.phase)
    }

    /// Abort a planned transition without applying it, returning the state
    /// machine to its previous state.
    pub fn abort(&mut self, plan_id: PlanId) -> Result<(), AbortError> {
        let plan = self.pending.as_ref().ok_or(AbortError::NoPending)?;

        if plan.id != plan_id {
            return Err(AbortError::IdMismatch {
                expected: plan.id,
                got: plan_id,
            });
        }

        self.pending = None;
        Ok(())
    }

    /// Compute a transition from an event if the transition is valid.
    fn compute_transition(&self, event: RoomEvent) -> Result<RoomPhase, InvalidTransition> {
        let next = match (self.phase, event) {
            (RoomPhase::Lobby, RoomEvent::Start) => RoomPhase::Round(TurnPhase::Act),
            // Same sub-phase, next actor (or next quiz round); the version
            // bump is the point of the transition.
            (RoomPhase::Round(sub), RoomEvent::AdvanceTurn) => RoomPhase::Round(sub),
            (RoomPhase::Round(TurnPhase::Act), RoomEvent::OpenVoting) => {
                RoomPhase::Round(TurnPhase::Vote)
            }
            (RoomPhase::Round(TurnPhase::Vote), RoomEvent::ShowRoundResults) => {
                RoomPhase::RoundResults
            }
            (RoomPhase::RoundResults, RoomEvent::NextRound) => RoomPhase::Round(TurnPhase::Act),
            (RoomPhase::Round(_), RoomEvent::Finish(..))
            | (RoomPhase::RoundResults, RoomEvent::Finish(..)) => RoomPhase::Results,
            (RoomPhase::Results, RoomEvent::Replay) => RoomPhase::Lobby,
            (from, event) => return Err(InvalidTransition { from, event }),
        };

        Ok(next)
    }
}
