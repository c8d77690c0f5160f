//! Lobby operations: joining, leaving, and starting a game.

use tracing::{info, warn};
use uuid::Uuid;

use crate::config::GameVariant;
use crate::content::{self, RawItem};
use crate::dto::room::ParticipantSummary;
use crate::error::EngineError;
use crate::services::{sync_events, timer};
use crate::state::game::RoomGame;
use crate::state::transitions::run_transition_with_broadcast;
use crate::state::{RoomEvent, RoomPhase, SharedRoom};

/// What a start request did.
///
/// Starting below the configured minimum is deliberately a no-op rather than
/// an error (the lobby stays up and keeps accepting participants), but the
/// outcome is named so callers can tell the difference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    /// The game began; the room left the lobby.
    Started,
    /// Not enough participants; nothing changed.
    NotEnoughPlayers {
        /// Participants currently in the roster.
        have: usize,
        /// Configured minimum roster size.
        need: usize,
    },
}

/// Add a participant to the lobby.
pub async fn join(room: &SharedRoom, name: &str) -> Result<ParticipantSummary, EngineError> {
    let _gate = room.lock_gate().await;
    match room.phase().await {
        RoomPhase::Lobby => {}
        other => {
            return Err(EngineError::InvalidState(format!(
                "participants can only join in the lobby, current phase {other:?}"
            )));
        }
    }

    let participant = room.with_roster_mut(|roster| roster.add(name)).await?;
    let summary = ParticipantSummary::from(&participant);
    info!(room = %room.id(), participant = %participant.id, name = %participant.name, "participant joined");
    sync_events::broadcast_participant_joined(room, &summary);
    Ok(summary)
}

/// Remove a participant from the lobby. Rejected in any other phase: mid-game
/// rosters are immutable.
pub async fn leave(room: &SharedRoom, id: Uuid) -> Result<(), EngineError> {
    let _gate = room.lock_gate().await;
    match room.phase().await {
        RoomPhase::Lobby => {}
        other => {
            return Err(EngineError::InvalidState(format!(
                "participants can only be removed in the lobby, current phase {other:?}"
            )));
        }
    }

    room.with_roster_mut(|roster| roster.remove(id)).await?;
    info!(room = %room.id(), participant = %id, "participant left");
    sync_events::broadcast_participant_left(room, id);
    Ok(())
}

/// Start the game over the given raw content.
///
/// The item sequence is normalized, shuffled, and truncated here; it is
/// fixed for the lifetime of the game. The roster is reset (everyone alive,
/// scores zeroed) and, for the explanation game, shuffled into a fresh turn
/// order. The first act window's countdown is armed when the rules call for
/// one.
pub async fn start(room: &SharedRoom, raw_items: Vec<RawItem>) -> Result<StartOutcome, EngineError> {
    let rules = room.rules().clone();

    let have = room.read_roster(|roster| roster.len()).await;
    if have < rules.min_players {
        warn!(
            room = %room.id(),
            have,
            need = rules.min_players,
            "start requested below the minimum roster size; ignoring"
        );
        return Ok(StartOutcome::NotEnoughPlayers {
            have,
            need: rules.min_players,
        });
    }

    let items = content::prepare(raw_items, &rules)?;
    let game = RoomGame::new(&rules, items);
    let variant = rules.variant;

    run_transition_with_broadcast(room, RoomEvent::Start, || async move {
        room.with_roster_mut(|roster| {
            roster.reset_for_start();
            if matches!(variant, GameVariant::ExplainOff) {
                roster.shuffle_order();
            }
        })
        .await;

        info!(room = %room.id(), game = %game.id, rounds = game.items.len(), "game started");
        room.set_game(Some(game)).await;
        Ok(())
    })
    .await?;

    if rules.timer.is_enabled() {
        let generation = room.version().await;
        timer::arm(room, rules.timer.duration_for_round(0), generation).await;
    }

    Ok(StartOutcome::Started)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameRules;
    use crate::state::{Room, TurnPhase};

    fn quiz_items(count: usize) -> Vec<RawItem> {
        (0..count)
            .map(|i| {
                RawItem::Ready(crate::content::Item {
                    id: format!("c{i}"),
                    prompt: format!("q{i}"),
                    answer: format!("a{i}"),
                    category: "General".into(),
                    choices: Vec::new(),
                })
            })
            .collect()
    }

    #[tokio::test]
    async fn join_then_start_moves_to_the_act_phase() {
        let room = Room::new(GameRules::survival());
        join(&room, "Alice").await.unwrap();
        join(&room, "Bob").await.unwrap();

        let outcome = start(&room, quiz_items(5)).await.unwrap();
        assert_eq!(outcome, StartOutcome::Started);
        assert_eq!(room.phase().await, RoomPhase::Round(TurnPhase::Act));

        let (rounds, all_have_choices) = room
            .read_game(|game| (game.items.len(), game.items.iter().all(|i| !i.choices.is_empty())))
            .await
            .unwrap();
        assert_eq!(rounds, 5);
        assert!(all_have_choices, "quiz items must carry choice sets");
    }

    #[tokio::test]
    async fn start_below_minimum_is_a_named_no_op() {
        let room = Room::new(GameRules::survival());
        join(&room, "Alice").await.unwrap();

        let outcome = start(&room, quiz_items(5)).await.unwrap();
        assert_eq!(outcome, StartOutcome::NotEnoughPlayers { have: 1, need: 2 });
        assert_eq!(room.phase().await, RoomPhase::Lobby);
        assert!(room.read_game(|_| ()).await.is_err());

        // the lobby keeps working afterwards
        join(&room, "Bob").await.unwrap();
        assert_eq!(start(&room, quiz_items(5)).await.unwrap(), StartOutcome::Started);
    }

    #[tokio::test]
    async fn start_without_content_fails() {
        let room = Room::new(GameRules::survival());
        join(&room, "Alice").await.unwrap();
        join(&room, "Bob").await.unwrap();

        let err = start(&room, Vec::new()).await.unwrap_err();
        assert!(matches!(err, EngineError::NoContent));
        assert_eq!(room.phase().await, RoomPhase::Lobby);
    }

    #[tokio::test]
    async fn starting_twice_is_rejected() {
        let room = Room::new(GameRules::survival());
        join(&room, "Alice").await.unwrap();
        join(&room, "Bob").await.unwrap();
        start(&room, quiz_items(3)).await.unwrap();

        let err = start(&room, quiz_items(3)).await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidState(_)));
    }

    #[tokio::test]
    async fn round_cap_bounds_the_sequence() {
        let mut rules = GameRules::survival();
        rules.round_cap = 2;
        let room = Room::new(rules);
        join(&room, "Alice").await.unwrap();
        join(&room, "Bob").await.unwrap();

        start(&room, quiz_items(10)).await.unwrap();
        let rounds = room.read_game(|game| game.items.len()).await.unwrap();
        assert_eq!(rounds, 2);
    }

    #[tokio::test]
    async fn leaving_outside_the_lobby_is_invalid_state() {
        let room = Room::new(GameRules::survival());
        let alice = join(&room, "Alice").await.unwrap();
        join(&room, "Bob").await.unwrap();
        start(&room, quiz_items(3)).await.unwrap();

        let err = leave(&room, alice.id).await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidState(_)));
        assert_eq!(room.read_roster(|r| r.len()).await, 2);
    }

    #[tokio::test]
    async fn joining_mid_game_is_invalid_state() {
        let room = Room::new(GameRules::survival());
        join(&room, "Alice").await.unwrap();
        join(&room, "Bob").await.unwrap();
        start(&room, quiz_items(3)).await.unwrap();

        let err = join(&room, "Cara").await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidState(_)));
    }
}
