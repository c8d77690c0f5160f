use serde::Serialize;
use uuid::Uuid;

use crate::content::Item;
use crate::dto::common::{FinishKind, PhaseKind};
use crate::state::roster::Participant;

/// Public view of a participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParticipantSummary {
    /// Participant identifier.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Whether the participant can still act.
    pub alive: bool,
    /// Whether this participant created the lobby.
    pub is_host: bool,
    /// Current score.
    pub score: i64,
}

impl From<&Participant> for ParticipantSummary {
    fn from(participant: &Participant) -> Self {
        Self {
            id: participant.id,
            name: participant.name.clone(),
            alive: participant.alive,
            is_host: participant.is_host,
            score: participant.score,
        }
    }
}

/// What the acting participant sees of the current item. The correct answer
/// is deliberately absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemPrompt {
    /// Question or term text.
    pub prompt: String,
    /// Display category.
    pub category: String,
    /// Answer choices, already shuffled; empty for free-response items.
    pub choices: Vec<String>,
}

impl From<&Item> for ItemPrompt {
    fn from(item: &Item) -> Self {
        Self {
            prompt: item.prompt.clone(),
            category: item.category.clone(),
            choices: item.choices.clone(),
        }
    }
}

/// An explanation as shown to voters: text only, no author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionView {
    /// Submission identifier used when casting a vote.
    pub id: Uuid,
    /// The explanation text.
    pub text: String,
}

/// Ballot for the participant whose turn it is to vote: every submission
/// except their own, in randomized order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VotingView {
    /// Whose vote is being collected.
    pub voter: Uuid,
    /// Term the submissions explain.
    pub term: String,
    /// Candidate submissions, anonymized and shuffled.
    pub candidates: Vec<SubmissionView>,
}

/// Outcome of a resolved quiz turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnswerOutcome {
    /// Responder the turn belonged to; absent when nobody was alive to act.
    pub responder: Option<Uuid>,
    /// Whether the answer matched.
    pub correct: bool,
    /// Whether the responder was eliminated.
    pub eliminated: bool,
    /// Whether the game moved to the final results.
    pub finished: bool,
}

/// Outcome of an explanation round, revealed in the round-results phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoundResultsView {
    /// Author of the winning submission, looked up from the roster.
    pub winner: Option<ParticipantSummary>,
    /// Winning explanation text.
    pub winning_text: Option<String>,
    /// Total votes cast this round.
    pub votes_cast: usize,
}

/// An open board cell as presented to the room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CellView {
    /// Category column.
    pub category: usize,
    /// Point row.
    pub row: usize,
    /// Points at stake.
    pub points: i64,
    /// The clue text.
    pub prompt: String,
}

/// Result of resolving a board cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CellOutcome {
    /// Category column.
    pub category: usize,
    /// Point row.
    pub row: usize,
    /// Points the cell was worth.
    pub points: i64,
    /// Participant the answer was attributed to, if anyone.
    pub awarded_to: Option<Uuid>,
    /// Whether the attribution was for a correct answer.
    pub correct: bool,
    /// The awarded participant's score after the update.
    pub score: Option<i64>,
    /// Whether the board is now cleared and the game over.
    pub finished: bool,
}

/// Covered-cell view of the whole grid: point values and played flags only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoardView {
    /// Columns in category order.
    pub columns: Vec<Vec<BoardCellView>>,
}

/// One covered cell of the grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoardCellView {
    /// Points at stake.
    pub points: i64,
    /// Whether the cell has been played.
    pub answered: bool,
}

/// Final standings once a game has ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameResultsView {
    /// Why the game ended.
    pub reason: FinishKind,
    /// Overall winner, when the variant defines one.
    pub winner: Option<ParticipantSummary>,
    /// Participants ranked by score (stable on ties).
    pub scoreboard: Vec<ParticipantSummary>,
    /// Rounds fully resolved.
    pub rounds_played: usize,
}

/// Lightweight snapshot of a room for listings and reconnects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoomSnapshot {
    /// Room identifier.
    pub room_id: Uuid,
    /// Current phase.
    pub phase: PhaseKind,
    /// Zero-based round index, when a game is running.
    pub round_index: Option<usize>,
    /// Participants in turn order.
    pub participants: Vec<ParticipantSummary>,
}
