//! Board quiz: participants take turns opening cells on a category × points
//! grid; the host attributes each answer, scores clamp at zero, and the game
//! ends when the board is cleared.

use tracing::info;
use uuid::Uuid;

use crate::config::GameVariant;
use crate::dto::room::{BoardCellView, BoardView, CellOutcome, CellView, ParticipantSummary};
use crate::error::EngineError;
use crate::scoring;
use crate::services::rounds;
use crate::services::{sync_events, timer};
use crate::state::game::CellRef;
use crate::state::transitions::run_checked_transition_with_broadcast;
use crate::state::{FinishReason, RoomEvent, SharedRoom, TurnPhase};

/// Covered view of the grid: point values and played flags only.
pub async fn board_view(room: &SharedRoom) -> Result<BoardView, EngineError> {
    rounds::ensure_variant(room, GameVariant::Board)?;
    room.read_game(|game| {
        game.board.as_ref().map(|board| BoardView {
            columns: board
                .columns()
                .iter()
                .map(|column| {
                    column
                        .iter()
                        .map(|cell| BoardCellView {
                            points: cell.points,
                            answered: cell.answered,
                        })
                        .collect()
                })
                .collect(),
        })
    })
    .await?
    .ok_or_else(|| EngineError::InvalidState("no board for this game".into()))
}

/// Participant whose turn it is to pick a cell.
pub async fn current_picker(room: &SharedRoom) -> Result<Option<ParticipantSummary>, EngineError> {
    rounds::ensure_variant(room, GameVariant::Board)?;
    rounds::ensure_turn_phase(room, TurnPhase::Act).await?;
    let roster = room.read_roster(|r| r.clone()).await;
    room.read_game(|game| {
        game.turns
            .current_responder(&roster)
            .map(ParticipantSummary::from)
    })
    .await
}

/// Open a cell, revealing its clue to the room. Only one cell may be open at
/// a time and a played cell cannot be reopened.
pub async fn pick_cell(
    room: &SharedRoom,
    category: usize,
    row: usize,
) -> Result<CellView, EngineError> {
    rounds::ensure_variant(room, GameVariant::Board)?;
    let _gate = room.lock_gate().await;
    rounds::ensure_turn_phase(room, TurnPhase::Act).await?;

    let at = CellRef { category, row };
    let view = room
        .with_game_mut(|game| {
            if game.round.cell.is_some() {
                return Err(EngineError::InvalidState(
                    "a cell is already open; resolve it first".into(),
                ));
            }
            let board = game
                .board
                .as_ref()
                .ok_or_else(|| EngineError::InvalidState("no board for this game".into()))?;
            let cell = board
                .cell(at)
                .ok_or_else(|| EngineError::NotFound(format!("no cell at {category},{row}")))?;
            if cell.answered {
                return Err(EngineError::InvalidState("cell has already been played".into()));
            }
            let view = CellView {
                category,
                row,
                points: cell.points,
                prompt: cell.item.prompt.clone(),
            };
            game.round.cell = Some(at);
            Ok(view)
        })
        .await??;

    let roster = room.read_roster(|r| r.clone()).await;
    let picker = room
        .read_game(|game| game.turns.current_responder(&roster).map(|p| p.id))
        .await?;
    info!(room = %room.id(), category, row, "cell opened");
    sync_events::broadcast_cell_picked(room, &view, picker);
    Ok(view)
}

/// The open cell's full clue, answer included, for the host to read out.
pub async fn open_cell(room: &SharedRoom) -> Result<(CellView, String), EngineError> {
    rounds::ensure_variant(room, GameVariant::Board)?;
    rounds::ensure_turn_phase(room, TurnPhase::Act).await?;
    room.read_game(|game| {
        let at = game.round.cell?;
        let cell = game.board.as_ref()?.cell(at)?;
        Some((
            CellView {
                category: at.category,
                row: at.row,
                points: cell.points,
                prompt: cell.item.prompt.clone(),
            },
            cell.item.answer.clone(),
        ))
    })
    .await?
    .ok_or_else(|| EngineError::InvalidState("no cell is open".into()))
}

/// Close the open cell, optionally attributing it: `Some((id, true))` adds
/// the cell's points to that participant, `Some((id, false))` deducts them
/// (clamped at zero), `None` skips the cell entirely.
pub async fn resolve_cell(
    room: &SharedRoom,
    award: Option<(Uuid, bool)>,
) -> Result<CellOutcome, EngineError> {
    rounds::ensure_variant(room, GameVariant::Board)?;
    let version = room.version().await;
    rounds::ensure_turn_phase(room, TurnPhase::Act).await?;

    let (at, points, remaining) = room
        .read_game(|game| {
            let at = game
                .round
                .cell
                .ok_or_else(|| EngineError::InvalidState("no cell is open".into()))?;
            let board = game
                .board
                .as_ref()
                .ok_or_else(|| EngineError::InvalidState("no board for this game".into()))?;
            let cell = board
                .cell(at)
                .ok_or_else(|| EngineError::NotFound("open cell vanished".into()))?;
            Ok::<(CellRef, i64, usize), EngineError>((at, cell.points, board.remaining()))
        })
        .await??;

    if let Some((participant, _)) = award {
        let known = room.read_roster(|r| r.get(participant).is_some()).await;
        if !known {
            return Err(EngineError::NotFound(format!(
                "participant `{participant}` not found"
            )));
        }
    }

    let cleared = remaining <= 1;
    let event = if cleared {
        RoomEvent::Finish(FinishReason::BoardCleared)
    } else {
        RoomEvent::AdvanceTurn
    };

    let outcome = run_checked_transition_with_broadcast(room, version, event, || async move {
        room.timer().cancel().await;

        let score = match award {
            Some((participant, correct)) => {
                room.with_roster_mut(|roster| scoring::award(roster, participant, points, correct))
                    .await
            }
            None => None,
        };

        let roster_after = room.read_roster(|r| r.clone()).await;
        room.with_game_mut(|game| {
            if let Some(board) = game.board.as_mut() {
                if let Some(cell) = board.cell_mut(at) {
                    cell.answered = true;
                }
            }
            game.rounds_played += 1;
            game.last_outcome = Some(crate::state::game::RoundOutcome::Cell {
                at,
                awarded_to: award.map(|(id, _)| id),
                correct: award.map(|(_, correct)| correct).unwrap_or(false),
                points,
            });
            if cleared {
                game.round.resolved = true;
                game.finish_reason = Some(FinishReason::BoardCleared);
            } else {
                let next = game.round.index + 1;
                game.turns.advance(&roster_after);
                game.begin_round(next);
            }
        })
        .await?;

        Ok(CellOutcome {
            category: at.category,
            row: at.row,
            points,
            awarded_to: award.map(|(id, _)| id),
            correct: award.map(|(_, correct)| correct).unwrap_or(false),
            score,
            finished: cleared,
        })
    })
    .await?;

    info!(
        room = %room.id(),
        category = at.category,
        row = at.row,
        awarded = ?outcome.awarded_to,
        "cell resolved"
    );
    sync_events::broadcast_cell_resolved(room, &outcome);

    if !outcome.finished && room.rules().timer.is_enabled() {
        let generation = room.version().await;
        let duration = room
            .rules()
            .timer
            .duration_for_round(room.read_game(|g| g.round.index).await?);
        timer::arm(room, duration, generation).await;
    }

    Ok(outcome)
}

/// Countdown expiry for the board: an open cell resolves unawarded; a picker
/// who never opened one forfeits the turn.
pub(crate) async fn resolve_expiry(room: &SharedRoom) -> Result<(), EngineError> {
    rounds::ensure_variant(room, GameVariant::Board)?;
    let version = room.version().await;
    rounds::ensure_turn_phase(room, TurnPhase::Act).await?;

    let has_open_cell = room.read_game(|game| game.round.cell.is_some()).await?;
    if has_open_cell {
        return resolve_cell(room, None).await.map(|_| ());
    }

    // skip the picker's turn without touching the board
    let roster = room.read_roster(|r| r.clone()).await;
    run_checked_transition_with_broadcast(room, version, RoomEvent::AdvanceTurn, || async move {
        room.timer().cancel().await;
        room.with_game_mut(|game| {
            let next = game.round.index + 1;
            game.turns.advance(&roster);
            game.begin_round(next);
        })
        .await?;
        Ok(())
    })
    .await?;

    if room.rules().timer.is_enabled() {
        let generation = room.version().await;
        let duration = room
            .rules()
            .timer
            .duration_for_round(room.read_game(|g| g.round.index).await?);
        timer::arm(room, duration, generation).await;
    }
    Ok(())
}
