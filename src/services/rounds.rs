//! Cross-variant round plumbing: the shared action input, countdown expiry
//! dispatch, manual stop, replay, and final results assembly.

use tracing::{debug, info};

use crate::config::GameVariant;
use crate::dto::room::{GameResultsView, ParticipantSummary};
use crate::error::EngineError;
use crate::services::{board, explain, quiz};
use crate::state::game::RoundOutcome;
use crate::state::transitions::run_transition_with_broadcast;
use crate::state::{FinishReason, RoomEvent, RoomPhase, SharedRoom, TurnPhase};

/// How the acting participant's window closed. Timeouts travel through the
/// same resolution functions as explicit actions; the discriminant is the
/// only difference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionInput {
    /// The responder picked an answer choice.
    Answer(String),
    /// The author submitted an explanation.
    Explanation(String),
    /// The countdown ran out before any action.
    TimedOut,
}

impl ActionInput {
    /// Whether this input came from the countdown rather than a participant.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ActionInput::TimedOut)
    }
}

/// Resolve a countdown expiry for whatever variant the room runs.
///
/// A stale generation (the round moved on while the expiry was in flight)
/// is a silent no-op, as is any in-flight state change that beats the
/// expiry to the transition gate.
pub(crate) fn handle_expiry<'a>(
    room: &'a SharedRoom,
    generation: usize,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send + 'a>> {
    // Boxed to anchor auto-trait inference: the expiry path re-arms the timer
    // (resolve -> timer::arm -> spawn -> handle_expiry), a cycle the compiler
    // cannot otherwise prove `Send` across `tokio::spawn`.
    Box::pin(async move {
        if room.version().await != generation {
            debug!(room = %room.id(), generation, "countdown expired after the round moved on; ignoring");
            return;
        }

        let result = match room.rules().variant {
            GameVariant::Survival => quiz::resolve_turn(room, ActionInput::TimedOut)
                .await
                .map(|_| ()),
            GameVariant::ExplainOff => explain::resolve_submission(room, ActionInput::TimedOut)
                .await
                .map(|_| ()),
            GameVariant::Board => board::resolve_expiry(room).await,
        };

        if let Err(err) = result {
            debug!(room = %room.id(), error = %err, "countdown expiry resolved to a no-op");
        }
    })
}

/// Stop the game early and jump to the final results.
pub async fn finish(room: &SharedRoom) -> Result<(), EngineError> {
    run_transition_with_broadcast(room, RoomEvent::Finish(FinishReason::ManualStop), || async move {
        room.timer().cancel().await;
        room.with_game_mut(|game| {
            game.finish_reason = Some(FinishReason::ManualStop);
        })
        .await?;
        Ok(())
    })
    .await?;
    info!(room = %room.id(), "game stopped by host");
    Ok(())
}

/// Return a finished room to the lobby, keeping the roster.
pub async fn replay(room: &SharedRoom) -> Result<(), EngineError> {
    run_transition_with_broadcast(room, RoomEvent::Replay, || async move {
        room.timer().cancel().await;
        room.set_game(None).await;
        room.with_roster_mut(|roster| roster.reset_for_start()).await;
        Ok(())
    })
    .await?;
    info!(room = %room.id(), "room returned to lobby");
    Ok(())
}

/// Final standings once the room has reached the results phase.
pub async fn results(room: &SharedRoom) -> Result<GameResultsView, EngineError> {
    match room.phase().await {
        RoomPhase::Results => {}
        other => {
            return Err(EngineError::InvalidState(format!(
                "results are only available after the game ends, current phase {other:?}"
            )));
        }
    }

    let roster = room.read_roster(|r| r.clone()).await;
    let (reason, rounds_played, explain_winner) = room
        .read_game(|game| {
            let explain_winner = match &game.last_outcome {
                Some(RoundOutcome::Explain { winner, .. }) => *winner,
                _ => None,
            };
            (game.finish_reason, game.rounds_played, explain_winner)
        })
        .await?;

    let reason = reason.unwrap_or(FinishReason::ManualStop);
    let winner = match room.rules().variant {
        // the sole survivor, when one remains
        GameVariant::Survival => roster.survivors().next().map(ParticipantSummary::from),
        // the author who took the last tallied round
        GameVariant::ExplainOff => explain_winner
            .and_then(|id| roster.get(id))
            .map(ParticipantSummary::from),
        // the top score; roster order breaks ties
        GameVariant::Board => {
            let mut top: Option<&crate::state::roster::Participant> = None;
            for participant in roster.iter() {
                if top.is_none_or(|best| participant.score > best.score) {
                    top = Some(participant);
                }
            }
            top.filter(|p| p.score > 0).map(ParticipantSummary::from)
        }
    };

    let mut scoreboard: Vec<ParticipantSummary> =
        roster.iter().map(ParticipantSummary::from).collect();
    scoreboard.sort_by(|a, b| b.score.cmp(&a.score));

    Ok(GameResultsView {
        reason: (&reason).into(),
        winner,
        scoreboard,
        rounds_played,
    })
}

/// Ensure the room is in the given round sub-phase.
pub(crate) async fn ensure_turn_phase(
    room: &SharedRoom,
    expected: TurnPhase,
) -> Result<(), EngineError> {
    match room.phase().await {
        RoomPhase::Round(actual) if actual == expected => Ok(()),
        other => Err(EngineError::InvalidState(format!(
            "operation requires the {expected:?} phase, current phase {other:?}"
        ))),
    }
}

/// Ensure the room plays the given variant.
pub(crate) fn ensure_variant(room: &SharedRoom, expected: GameVariant) -> Result<(), EngineError> {
    if room.rules().variant == expected {
        Ok(())
    } else {
        Err(EngineError::InvalidState(format!(
            "operation requires the {expected:?} variant, room plays {:?}",
            room.rules().variant
        )))
    }
}

/// Snapshot helper: current phase plus roster for listings.
pub async fn snapshot(room: &SharedRoom) -> crate::dto::room::RoomSnapshot {
    let phase = room.phase().await;
    let participants = room
        .read_roster(|roster| roster.iter().map(ParticipantSummary::from).collect())
        .await;
    let round_index = room.read_game(|game| game.round.index).await.ok();

    crate::dto::room::RoomSnapshot {
        room_id: room.id(),
        phase: (&phase).into(),
        round_index,
        participants,
    }
}
