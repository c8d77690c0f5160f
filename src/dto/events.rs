use serde::Serialize;
use uuid::Uuid;

use crate::dto::common::PhaseKind;
use crate::dto::room::{CellView, ParticipantSummary, RoundResultsView};

/// Envelope carried to sync subscribers after each committed transition.
#[derive(Debug, Clone)]
pub struct SyncEvent {
    /// Room the event belongs to.
    pub room_id: Uuid,
    /// Event name, e.g. `phase_changed`.
    pub event: String,
    /// JSON-encoded payload.
    pub data: String,
}

impl SyncEvent {
    /// Convenience wrapper that serialises `payload` into the data field.
    pub fn json<T>(room_id: Uuid, event: &str, payload: &T) -> serde_json::Result<Self>
    where
        T: Serialize,
    {
        Ok(Self {
            room_id,
            event: event.to_string(),
            data: serde_json::to_string(payload)?,
        })
    }
}

#[derive(Debug, Serialize)]
/// Broadcast when a participant joins the lobby.
pub struct ParticipantJoinedEvent {
    /// The new participant.
    pub participant: ParticipantSummary,
}

#[derive(Debug, Serialize)]
/// Broadcast when a participant leaves the lobby.
pub struct ParticipantLeftEvent {
    /// Who left.
    pub participant_id: Uuid,
}

#[derive(Debug, Serialize)]
/// Broadcast whenever the room phase changes (including same-phase turn
/// handoffs, which re-announce the acting participant).
pub struct PhaseChangedEvent {
    /// New phase.
    pub phase: PhaseKind,
    /// Zero-based round index, when a game is running.
    pub round_index: Option<usize>,
    /// Participant expected to act next, when the phase has one.
    pub actor: Option<Uuid>,
}

#[derive(Debug, Serialize)]
/// Broadcast when a quiz turn resolves, by answer or by timeout.
pub struct AnswerResolvedEvent {
    /// Responder the turn belonged to.
    pub responder: Option<Uuid>,
    /// Whether the answer matched.
    pub correct: bool,
    /// Whether the responder was eliminated.
    pub eliminated: bool,
}

#[derive(Debug, Serialize)]
/// Broadcast when an explanation lands. Carries counts only: authorship
/// stays hidden until the round results.
pub struct SubmissionRecordedEvent {
    /// Submissions recorded so far this round.
    pub submitted: usize,
    /// Participants still to submit.
    pub pending: usize,
}

#[derive(Debug, Serialize)]
/// Broadcast when a vote is cast (or declined). Counts only.
pub struct VoteRecordedEvent {
    /// Votes cast so far this round.
    pub votes: usize,
    /// Voters still to act.
    pub pending: usize,
}

#[derive(Debug, Serialize)]
/// Broadcast when an explanation round has been tallied.
pub struct RoundResultsEvent {
    /// The revealed outcome.
    pub results: RoundResultsView,
}

#[derive(Debug, Serialize)]
/// Broadcast when a board cell is opened.
pub struct CellPickedEvent {
    /// The opened cell.
    pub cell: CellView,
    /// Participant whose turn it was to pick.
    pub picker: Option<Uuid>,
}

#[derive(Debug, Serialize)]
/// Broadcast when a board cell is resolved.
pub struct CellResolvedEvent {
    /// Category column.
    pub category: usize,
    /// Point row.
    pub row: usize,
    /// Participant the answer was attributed to, if anyone.
    pub awarded_to: Option<Uuid>,
    /// Whether the attribution was for a correct answer.
    pub correct: bool,
    /// The awarded participant's score after the update.
    pub score: Option<i64>,
}

#[derive(Debug, Serialize)]
/// Broadcast when a countdown starts for an act window.
pub struct TimerArmedEvent {
    /// Seconds on the clock.
    pub seconds: u64,
}
