use indexmap::IndexMap;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::config::{BoardRules, GameRules, GameVariant};
use crate::content::Item;
use crate::state::state_machine::FinishReason;
use crate::state::turns::{CircularTurns, PassOrder};

/// Anonymous explanation recorded during the act phase.
///
/// The author link exists only here; views built before the results phase
/// must never expose it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    /// Submission identifier, referenced by votes.
    pub id: Uuid,
    /// Participant who wrote the text. Revealed only with the round results.
    pub author: Uuid,
    /// The explanation itself.
    pub text: String,
}

/// Coordinates of one board cell (category column, point row).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRef {
    /// Zero-based category column.
    pub category: usize,
    /// Zero-based point row.
    pub row: usize,
}

/// One clue of the board grid.
#[derive(Debug, Clone)]
pub struct BoardCell {
    /// The question behind the cell.
    pub item: Item,
    /// Points at stake.
    pub points: i64,
    /// Whether the cell has been played.
    pub answered: bool,
}

/// Category-major grid of clues for the board variant.
#[derive(Debug, Clone)]
pub struct Board {
    columns: Vec<Vec<BoardCell>>,
}

impl Board {
    /// Chunk the shuffled item sequence into category columns, one cell per
    /// rung of the point ladder.
    pub fn build(items: &[Item], rules: &BoardRules) -> Self {
        let mut cursor = items.iter();
        let mut columns = Vec::with_capacity(rules.category_count);
        for _ in 0..rules.category_count {
            let column: Vec<BoardCell> = rules
                .point_ladder
                .iter()
                .map_while(|points| {
                    cursor.next().map(|item| BoardCell {
                        item: item.clone(),
                        points: *points,
                        answered: false,
                    })
                })
                .collect();
            columns.push(column);
        }
        Self { columns }
    }

    /// Cell at the given coordinates.
    pub fn cell(&self, at: CellRef) -> Option<&BoardCell> {
        self.columns.get(at.category)?.get(at.row)
    }

    /// Mutable cell access.
    pub(crate) fn cell_mut(&mut self, at: CellRef) -> Option<&mut BoardCell> {
        self.columns.get_mut(at.category)?.get_mut(at.row)
    }

    /// Whether every cell has been played.
    pub fn is_cleared(&self) -> bool {
        self.columns
            .iter()
            .all(|column| column.iter().all(|cell| cell.answered))
    }

    /// Number of cells not yet played.
    pub fn remaining(&self) -> usize {
        self.columns
            .iter()
            .map(|column| column.iter().filter(|cell| !cell.answered).count())
            .sum()
    }

    /// All columns in category order.
    pub fn columns(&self) -> &[Vec<BoardCell>] {
        &self.columns
    }
}

/// Live state of the round currently being played. Recreated per round.
#[derive(Debug, Clone, Default)]
pub struct Round {
    /// Zero-based round index; also indexes the item sequence.
    pub index: usize,
    /// Whether the round outcome has been applied.
    pub resolved: bool,
    /// Cell currently open on the board (board variant only).
    pub cell: Option<CellRef>,
}

impl Round {
    fn new(index: usize) -> Self {
        Self {
            index,
            resolved: false,
            cell: None,
        }
    }
}

/// What a resolved round produced, kept for the results views.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundOutcome {
    /// A quiz responder answered (or timed out).
    Quiz {
        /// Who was on the spot.
        responder: Uuid,
        /// Whether the answer matched.
        correct: bool,
        /// Whether the responder was eliminated as a result.
        eliminated: bool,
    },
    /// An explanation round was tallied.
    Explain {
        /// Author of the winning submission, if any votes were cast.
        winner: Option<Uuid>,
        /// The winning submission.
        submission: Option<Uuid>,
        /// Total votes cast this round.
        votes_cast: usize,
    },
    /// A board cell was resolved.
    Cell {
        /// Which cell.
        at: CellRef,
        /// Participant the answer was attributed to, if anyone.
        awarded_to: Option<Uuid>,
        /// Whether the attribution was for a correct answer.
        correct: bool,
        /// Points the cell was worth.
        points: i64,
    },
}

/// Aggregate gameplay state for a running game, owned by a room.
///
/// Created when the room leaves the lobby and dropped when it returns; no
/// child entity outlives it.
#[derive(Debug, Clone)]
pub struct RoomGame {
    /// Game instance identifier.
    pub id: Uuid,
    /// Creation timestamp for auditing/debugging.
    pub created_at: OffsetDateTime,
    /// Variant being played.
    pub variant: GameVariant,
    /// Shuffled item sequence, fixed for the lifetime of the game.
    pub items: Vec<Item>,
    /// State of the round in progress.
    pub round: Round,
    /// Circular responder rotation (quiz and board variants).
    pub turns: CircularTurns,
    /// Single-pass cursor (explanation authors, then voters).
    pub pass: PassOrder,
    /// Submissions of the current round, in submission order.
    pub submissions: IndexMap<Uuid, Submission>,
    /// Votes of the current round: voter id → submission id.
    pub votes: IndexMap<Uuid, Uuid>,
    /// Clue grid (board variant only).
    pub board: Option<Board>,
    /// Rounds fully resolved so far.
    pub rounds_played: usize,
    /// Outcome of the most recently resolved round.
    pub last_outcome: Option<RoundOutcome>,
    /// Why the game ended, once it has.
    pub finish_reason: Option<FinishReason>,
}

impl RoomGame {
    /// Build a fresh game over an already-prepared item sequence.
    pub fn new(rules: &GameRules, items: Vec<Item>) -> Self {
        let board = matches!(rules.variant, GameVariant::Board)
            .then(|| Board::build(&items, &rules.board));

        Self {
            id: Uuid::new_v4(),
            created_at: OffsetDateTime::now_utc(),
            variant: rules.variant,
            items,
            round: Round::new(0),
            turns: CircularTurns::new(),
            pass: PassOrder::new(),
            submissions: IndexMap::new(),
            votes: IndexMap::new(),
            board,
            rounds_played: 0,
            last_outcome: None,
            finish_reason: None,
        }
    }

    /// Item driving the current round, if the sequence still covers it.
    pub fn current_item(&self) -> Option<&Item> {
        self.items.get(self.round.index)
    }

    /// Whether another round exists after the current one.
    pub fn has_rounds_remaining(&self) -> bool {
        self.round.index + 1 < self.items.len()
    }

    /// Replace the round state for the given index, clearing the per-round
    /// submissions, votes, and pass cursor.
    pub fn begin_round(&mut self, index: usize) {
        self.round = Round::new(index);
        self.pass.reset();
        self.submissions.clear();
        self.votes.clear();
    }

    /// Record an explanation for the current round. Returns the submission id.
    pub fn record_submission(&mut self, author: Uuid, text: String) -> Uuid {
        let submission = Submission {
            id: Uuid::new_v4(),
            author,
            text,
        };
        let id = submission.id;
        self.submissions.insert(id, submission);
        id
    }
}
