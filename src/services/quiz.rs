//! Survival quiz: one responder per round answers under the countdown; a
//! wrong answer or a timeout eliminates them. Rounds resolve inline in the
//! act phase; the game ends when at most one participant survives or the
//! question sequence runs out.

use tracing::info;

use crate::config::GameVariant;
use crate::dto::room::{AnswerOutcome, ItemPrompt, ParticipantSummary};
use crate::error::EngineError;
use crate::scoring;
use crate::services::rounds::{self, ActionInput};
use crate::services::{sync_events, timer};
use crate::state::transitions::run_checked_transition_with_broadcast;
use crate::state::{FinishReason, RoomEvent, SharedRoom, TurnPhase};

/// The question currently on the table, without its answer.
pub async fn current_question(room: &SharedRoom) -> Result<ItemPrompt, EngineError> {
    rounds::ensure_variant(room, GameVariant::Survival)?;
    rounds::ensure_turn_phase(room, TurnPhase::Act).await?;
    room.read_game(|game| game.current_item().map(ItemPrompt::from))
        .await?
        .ok_or_else(|| EngineError::InvalidState("no item for the current round".into()))
}

/// Participant whose turn it is to answer, or `None` when nobody is alive.
pub async fn current_responder(
    room: &SharedRoom,
) -> Result<Option<ParticipantSummary>, EngineError> {
    rounds::ensure_variant(room, GameVariant::Survival)?;
    rounds::ensure_turn_phase(room, TurnPhase::Act).await?;
    let roster = room.read_roster(|r| r.clone()).await;
    room.read_game(|game| {
        game.turns
            .current_responder(&roster)
            .map(ParticipantSummary::from)
    })
    .await
}

/// Submit the responder's answer for the current round.
pub async fn submit_answer(room: &SharedRoom, choice: &str) -> Result<AnswerOutcome, EngineError> {
    resolve_turn(room, ActionInput::Answer(choice.to_string())).await
}

/// Resolve the current turn from an explicit answer or a countdown expiry.
///
/// Both paths share this function on purpose: the outcome of a timeout must
/// never diverge from the outcome of a wrong answer arriving at the last
/// second.
pub(crate) async fn resolve_turn(
    room: &SharedRoom,
    input: ActionInput,
) -> Result<AnswerOutcome, EngineError> {
    rounds::ensure_variant(room, GameVariant::Survival)?;
    let version = room.version().await;
    rounds::ensure_turn_phase(room, TurnPhase::Act).await?;

    let roster = room.read_roster(|r| r.clone()).await;
    let decision = room
        .read_game(|game| {
            if game.round.resolved {
                return Err(EngineError::InvalidState("round already resolved".into()));
            }
            let responder = game.turns.current_responder(&roster).map(|p| p.id);
            let correct = match (&input, game.current_item()) {
                (ActionInput::Answer(choice), Some(item)) => choice == &item.answer,
                _ => false,
            };
            Ok((responder, correct, game.round.index, game.items.len()))
        })
        .await??;
    let (responder, correct, round_index, total_rounds) = decision;

    let Some(responder) = responder else {
        // Nobody left to act: close the game out instead of stalling.
        run_checked_transition_with_broadcast(
            room,
            version,
            RoomEvent::Finish(FinishReason::LastSurvivor),
            || async move {
                room.timer().cancel().await;
                room.with_game_mut(|game| {
                    game.round.resolved = true;
                    game.finish_reason = Some(FinishReason::LastSurvivor);
                })
                .await?;
                Ok(())
            },
        )
        .await?;
        return Ok(AnswerOutcome {
            responder: None,
            correct: false,
            eliminated: false,
            finished: true,
        });
    };

    // Elimination is decided here but applied inside the transition; the
    // version check makes a raced duplicate resolution a no-op. Timeouts
    // always eliminate; wrong answers only under a full elimination rate.
    let rate = room.rules().elimination_rate;
    let will_eliminate = !correct && (input.is_timeout() || rate >= 1.0);
    let alive_now = roster.alive_count();
    let alive_after = if will_eliminate {
        alive_now.saturating_sub(1)
    } else {
        alive_now
    };
    let out_of_rounds = round_index + 1 >= total_rounds;
    let finished = alive_after <= 1 || out_of_rounds;

    let finish_reason = if finished {
        Some(if alive_after <= 1 {
            FinishReason::LastSurvivor
        } else {
            FinishReason::RoundsExhausted
        })
    } else {
        None
    };
    let event = match finish_reason {
        Some(reason) => RoomEvent::Finish(reason),
        None => RoomEvent::AdvanceTurn,
    };

    let timed_out = input.is_timeout();
    let outcome = run_checked_transition_with_broadcast(room, version, event, || async move {
        room.timer().cancel().await;

        let eliminated = if correct {
            false
        } else {
            room.with_roster_mut(|roster| {
                if timed_out {
                    // not answering in time always costs the turn
                    scoring::eliminate(roster, responder)
                } else {
                    scoring::eliminate_for_wrong_answer(roster, responder, rate)
                }
            })
            .await
        };

        let roster_after = room.read_roster(|r| r.clone()).await;
        room.with_game_mut(|game| {
            game.round.resolved = true;
            game.rounds_played += 1;
            game.last_outcome = Some(crate::state::game::RoundOutcome::Quiz {
                responder,
                correct,
                eliminated,
            });
            match finish_reason {
                Some(reason) => game.finish_reason = Some(reason),
                None => {
                    game.turns.advance(&roster_after);
                    game.begin_round(round_index + 1);
                }
            }
        })
        .await?;

        Ok(AnswerOutcome {
            responder: Some(responder),
            correct,
            eliminated,
            finished,
        })
    })
    .await?;

    info!(
        room = %room.id(),
        responder = %responder,
        correct,
        eliminated = outcome.eliminated,
        timeout = input.is_timeout(),
        "quiz turn resolved"
    );
    sync_events::broadcast_answer_resolved(room, &outcome);

    if !finished && room.rules().timer.is_enabled() {
        let generation = room.version().await;
        let duration = room.rules().timer.duration_for_round(round_index + 1);
        timer::arm(room, duration, generation).await;
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameRules;
    use crate::content::{Item, RawItem};
    use crate::services::{lobby, rounds};
    use crate::state::{Room, RoomPhase};

    fn quiz_items(count: usize) -> Vec<RawItem> {
        (0..count)
            .map(|i| {
                RawItem::Ready(Item {
                    id: format!("c{i}"),
                    prompt: format!("q{i}"),
                    answer: format!("a{i}"),
                    category: "General".into(),
                    choices: Vec::new(),
                })
            })
            .collect()
    }

    async fn started_room(rules: GameRules, names: &[&str], items: usize) -> crate::state::SharedRoom {
        let room = Room::new(rules);
        for name in names {
            lobby::join(&room, name).await.unwrap();
        }
        lobby::start(&room, quiz_items(items)).await.unwrap();
        room
    }

    async fn correct_answer(room: &crate::state::SharedRoom) -> String {
        room.read_game(|game| game.current_item().unwrap().answer.clone())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn correct_answer_advances_without_elimination() {
        let room = started_room(GameRules::survival(), &["Alice", "Bob"], 3).await;

        let first = current_responder(&room).await.unwrap().unwrap();
        let answer = correct_answer(&room).await;
        let outcome = submit_answer(&room, &answer).await.unwrap();

        assert_eq!(outcome.responder, Some(first.id));
        assert!(outcome.correct);
        assert!(!outcome.eliminated);
        assert!(!outcome.finished);

        assert_eq!(room.read_roster(|r| r.alive_count()).await, 2);
        let index = room.read_game(|g| g.round.index).await.unwrap();
        assert_eq!(index, 1);

        // the turn rotated to the other participant
        let second = current_responder(&room).await.unwrap().unwrap();
        assert_ne!(second.id, first.id);
    }

    #[tokio::test]
    async fn wrong_answer_eliminates_and_one_survivor_ends_the_game() {
        let room = started_room(GameRules::survival(), &["Alice", "Bob"], 3).await;

        let first = current_responder(&room).await.unwrap().unwrap();
        let answer = correct_answer(&room).await;
        submit_answer(&room, &answer).await.unwrap();

        let second = current_responder(&room).await.unwrap().unwrap();
        let outcome = submit_answer(&room, "definitely wrong").await.unwrap();
        assert_eq!(outcome.responder, Some(second.id));
        assert!(!outcome.correct);
        assert!(outcome.eliminated);
        assert!(outcome.finished);

        assert_eq!(room.phase().await, RoomPhase::Results);
        let results = rounds::results(&room).await.unwrap();
        assert_eq!(results.winner.unwrap().id, first.id);
        assert_eq!(results.rounds_played, 2);
    }

    #[tokio::test]
    async fn exhausting_the_questions_ends_the_game() {
        let room = started_room(GameRules::survival(), &["Alice", "Bob", "Cara"], 2).await;

        let answer = correct_answer(&room).await;
        submit_answer(&room, &answer).await.unwrap();
        let answer = correct_answer(&room).await;
        let outcome = submit_answer(&room, &answer).await.unwrap();

        assert!(outcome.finished);
        assert_eq!(room.phase().await, RoomPhase::Results);
        // all three survived to the end
        assert_eq!(room.read_roster(|r| r.alive_count()).await, 3);
    }

    #[tokio::test]
    async fn timeout_resolves_through_the_same_path_as_an_answer() {
        let room = started_room(GameRules::survival(), &["Alice", "Bob", "Cara"], 5).await;

        let first = current_responder(&room).await.unwrap().unwrap();
        let generation = room.version().await;
        rounds::handle_expiry(&room, generation).await;

        // the responder was eliminated exactly as a wrong answer would have
        let alive = room.read_roster(|r| r.alive_count()).await;
        assert_eq!(alive, 2);
        assert!(!room.read_roster(|r| r.get(first.id).unwrap().alive).await);
        assert_eq!(room.read_game(|g| g.round.index).await.unwrap(), 1);

        let next = current_responder(&room).await.unwrap().unwrap();
        assert_ne!(next.id, first.id);
    }

    #[tokio::test]
    async fn stale_expiry_is_a_silent_no_op() {
        let room = started_room(GameRules::survival(), &["Alice", "Bob", "Cara"], 5).await;

        let stale = room.version().await;
        let answer = correct_answer(&room).await;
        submit_answer(&room, &answer).await.unwrap();

        let alive_before = room.read_roster(|r| r.alive_count()).await;
        let index_before = room.read_game(|g| g.round.index).await.unwrap();

        rounds::handle_expiry(&room, stale).await;

        assert_eq!(room.read_roster(|r| r.alive_count()).await, alive_before);
        assert_eq!(room.read_game(|g| g.round.index).await.unwrap(), index_before);
    }

    #[tokio::test]
    async fn partial_elimination_rate_spares_wrong_answers() {
        let mut rules = GameRules::survival();
        rules.elimination_rate = 0.5;
        let room = started_room(rules, &["Alice", "Bob"], 4).await;

        let outcome = submit_answer(&room, "definitely wrong").await.unwrap();
        assert!(!outcome.correct);
        assert!(!outcome.eliminated);
        assert!(!outcome.finished);
        assert_eq!(room.read_roster(|r| r.alive_count()).await, 2);
    }

    #[tokio::test]
    async fn answering_from_the_lobby_is_invalid_state() {
        let room = Room::new(GameRules::survival());
        lobby::join(&room, "Alice").await.unwrap();

        let err = submit_answer(&room, "4").await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidState(_)));
    }

    #[tokio::test]
    async fn rotation_skips_eliminated_responders() {
        let room = started_room(GameRules::survival(), &["Alice", "Bob", "Cara"], 6).await;

        let first = current_responder(&room).await.unwrap().unwrap();
        submit_answer(&room, "wrong").await.unwrap();

        let second = current_responder(&room).await.unwrap().unwrap();
        assert_ne!(second.id, first.id);
        let answer = correct_answer(&room).await;
        submit_answer(&room, &answer).await.unwrap();

        let third = current_responder(&room).await.unwrap().unwrap();
        assert_ne!(third.id, first.id);
        assert_ne!(third.id, second.id);
        let answer = correct_answer(&room).await;
        submit_answer(&room, &answer).await.unwrap();

        // back around: the eliminated first responder is skipped
        let again = current_responder(&room).await.unwrap().unwrap();
        assert_eq!(again.id, second.id);
    }
}
