//! Explain-off: each participant writes an anonymous explanation of the
//! round's term in turn, then each participant votes for the best one
//! (never their own). The tally crowns the round winner.

use tracing::info;
use uuid::Uuid;

use crate::config::GameVariant;
use crate::dto::room::{
    ItemPrompt, ParticipantSummary, RoundResultsView, SubmissionView, VotingView,
};
use crate::error::EngineError;
use crate::scoring;
use crate::services::rounds::{self, ActionInput};
use crate::services::{sync_events, timer};
use crate::shuffle;
use crate::state::game::RoundOutcome;
use crate::state::transitions::run_checked_transition_with_broadcast;
use crate::state::{FinishReason, RoomEvent, SharedRoom, TurnPhase};

/// Text recorded when an author submits nothing before the countdown runs out.
const PLACEHOLDER_EXPLANATION: &str = "(no explanation submitted)";

/// The term being explained this round.
pub async fn current_term(room: &SharedRoom) -> Result<ItemPrompt, EngineError> {
    rounds::ensure_variant(room, GameVariant::ExplainOff)?;
    room.read_game(|game| game.current_item().map(ItemPrompt::from))
        .await?
        .ok_or_else(|| EngineError::InvalidState("no term for the current round".into()))
}

/// Participant whose turn it is to write, or `None` once everyone has.
pub async fn current_author(room: &SharedRoom) -> Result<Option<ParticipantSummary>, EngineError> {
    rounds::ensure_variant(room, GameVariant::ExplainOff)?;
    rounds::ensure_turn_phase(room, TurnPhase::Act).await?;
    let roster = room.read_roster(|r| r.clone()).await;
    room.read_game(|game| game.pass.current(&roster).map(ParticipantSummary::from))
        .await
}

/// Participant whose turn it is to vote, or `None` once everyone has.
pub async fn current_voter(room: &SharedRoom) -> Result<Option<ParticipantSummary>, EngineError> {
    rounds::ensure_variant(room, GameVariant::ExplainOff)?;
    rounds::ensure_turn_phase(room, TurnPhase::Vote).await?;
    let roster = room.read_roster(|r| r.clone()).await;
    room.read_game(|game| game.pass.current(&roster).map(ParticipantSummary::from))
        .await
}

/// Record the current author's explanation and pass the keyboard on. When
/// the last author submits, the room moves to the voting phase.
pub async fn submit_explanation(room: &SharedRoom, text: &str) -> Result<(), EngineError> {
    resolve_submission(room, ActionInput::Explanation(text.to_string())).await
}

/// Shared resolution path for explicit submissions and countdown expiries.
/// A timed-out author gets the placeholder text; the pass order advances
/// identically either way.
pub(crate) async fn resolve_submission(
    room: &SharedRoom,
    input: ActionInput,
) -> Result<(), EngineError> {
    rounds::ensure_variant(room, GameVariant::ExplainOff)?;
    let version = room.version().await;
    rounds::ensure_turn_phase(room, TurnPhase::Act).await?;

    let roster = room.read_roster(|r| r.clone()).await;
    let (author, position) = room
        .read_game(|game| (game.pass.current(&roster).map(|p| p.id), game.pass.position()))
        .await?;
    let Some(author) = author else {
        return Err(EngineError::InvalidState("no author is pending".into()));
    };

    let text = match &input {
        ActionInput::Explanation(raw) if !raw.trim().is_empty() => raw.trim().to_string(),
        _ => PLACEHOLDER_EXPLANATION.to_string(),
    };

    let authors_exhausted = position + 1 >= roster.len();
    let event = if authors_exhausted {
        RoomEvent::OpenVoting
    } else {
        RoomEvent::AdvanceTurn
    };

    run_checked_transition_with_broadcast(room, version, event, || async move {
        room.timer().cancel().await;
        room.with_game_mut(|game| {
            game.record_submission(author, text);
            game.pass.advance();
            if authors_exhausted {
                // the same single-pass cursor now walks the voters
                game.pass.reset();
            }
        })
        .await?;
        Ok(())
    })
    .await?;

    let (submitted, pending) = (position + 1, roster.len() - position - 1);
    info!(
        room = %room.id(),
        author = %author,
        timeout = input.is_timeout(),
        submitted,
        "explanation recorded"
    );
    sync_events::broadcast_submission_recorded(room, submitted, pending);

    if !authors_exhausted && room.rules().timer.is_enabled() {
        let generation = room.version().await;
        let duration = room
            .rules()
            .timer
            .duration_for_round(room.read_game(|g| g.round.index).await?);
        timer::arm(room, duration, generation).await;
    }

    Ok(())
}

/// Ballot for the current voter: every submission except their own, in
/// randomized order and stripped of authorship.
pub async fn voting_view(room: &SharedRoom) -> Result<VotingView, EngineError> {
    rounds::ensure_variant(room, GameVariant::ExplainOff)?;
    rounds::ensure_turn_phase(room, TurnPhase::Vote).await?;

    let roster = room.read_roster(|r| r.clone()).await;
    let view = room
        .read_game(|game| {
            let voter = game.pass.current(&roster)?;
            let term = game.current_item().map(|item| item.prompt.clone())?;
            let mut candidates: Vec<SubmissionView> = game
                .submissions
                .values()
                .filter(|submission| submission.author != voter.id)
                .map(|submission| SubmissionView {
                    id: submission.id,
                    text: submission.text.clone(),
                })
                .collect();
            shuffle::shuffle_in_place(&mut candidates);
            Some(VotingView {
                voter: voter.id,
                term,
                candidates,
            })
        })
        .await?;

    view.ok_or_else(|| EngineError::InvalidState("no voter is pending".into()))
}

/// Record the current voter's choice. Voting for one's own submission is
/// rejected here, at selection time. When the last voter acts, the round is
/// tallied and the room shows its results.
pub async fn cast_vote(room: &SharedRoom, submission_id: Uuid) -> Result<(), EngineError> {
    resolve_vote(room, Some(submission_id)).await
}

/// Let the current voter decline. No vote is recorded; the pass advances.
pub async fn skip_vote(room: &SharedRoom) -> Result<(), EngineError> {
    resolve_vote(room, None).await
}

async fn resolve_vote(room: &SharedRoom, choice: Option<Uuid>) -> Result<(), EngineError> {
    rounds::ensure_variant(room, GameVariant::ExplainOff)?;
    let version = room.version().await;
    rounds::ensure_turn_phase(room, TurnPhase::Vote).await?;

    let roster = room.read_roster(|r| r.clone()).await;
    let (voter, position) = room
        .read_game(|game| (game.pass.current(&roster).map(|p| p.id), game.pass.position()))
        .await?;
    let Some(voter) = voter else {
        return Err(EngineError::InvalidState("no voter is pending".into()));
    };

    if let Some(submission_id) = choice {
        let author = room
            .read_game(|game| game.submissions.get(&submission_id).map(|s| s.author))
            .await?
            .ok_or_else(|| {
                EngineError::NotFound(format!("submission `{submission_id}` not found"))
            })?;
        if author == voter {
            return Err(EngineError::InvalidInput(
                "participants cannot vote for their own submission".into(),
            ));
        }
    }

    let voters_exhausted = position + 1 >= roster.len();
    let event = if voters_exhausted {
        RoomEvent::ShowRoundResults
    } else {
        RoomEvent::AdvanceTurn
    };

    run_checked_transition_with_broadcast(room, version, event, || async move {
        room.with_game_mut(|game| {
            if let Some(submission_id) = choice {
                game.votes.insert(voter, submission_id);
            }
            game.pass.advance();
            if voters_exhausted {
                let tallied = scoring::tally(&game.votes, &game.submissions)
                    .map(|submission| (submission.id, submission.author));
                game.last_outcome = Some(RoundOutcome::Explain {
                    winner: tallied.map(|(_, author)| author),
                    submission: tallied.map(|(id, _)| id),
                    votes_cast: game.votes.len(),
                });
                game.round.resolved = true;
                game.rounds_played += 1;
            }
        })
        .await?;
        Ok(())
    })
    .await?;

    let (votes, pending) = room
        .read_game(|game| (game.votes.len(), roster.len().saturating_sub(game.pass.position())))
        .await?;
    info!(room = %room.id(), voter = %voter, declined = choice.is_none(), "vote resolved");
    sync_events::broadcast_vote_recorded(room, votes, pending);

    if voters_exhausted {
        let results = round_results(room).await?;
        sync_events::broadcast_round_results(room, &results);
    }

    Ok(())
}

/// The tallied outcome of the round just played, with authorship revealed.
pub async fn round_results(room: &SharedRoom) -> Result<RoundResultsView, EngineError> {
    rounds::ensure_variant(room, GameVariant::ExplainOff)?;
    match room.phase().await {
        crate::state::RoomPhase::RoundResults => {}
        other => {
            return Err(EngineError::InvalidState(format!(
                "round results are only available after voting, current phase {other:?}"
            )));
        }
    }

    let roster = room.read_roster(|r| r.clone()).await;
    room.read_game(|game| {
        let (winner, submission, votes_cast) = match &game.last_outcome {
            Some(RoundOutcome::Explain {
                winner,
                submission,
                votes_cast,
            }) => (*winner, *submission, *votes_cast),
            _ => (None, None, 0),
        };
        RoundResultsView {
            winner: winner.and_then(|id| roster.get(id)).map(ParticipantSummary::from),
            winning_text: submission
                .and_then(|id| game.submissions.get(&id))
                .map(|s| s.text.clone()),
            votes_cast,
        }
    })
    .await
}

/// Move on from the round results: the next round when terms remain, the
/// final results otherwise. Returns `true` when another round began.
pub async fn next_round(room: &SharedRoom) -> Result<bool, EngineError> {
    rounds::ensure_variant(room, GameVariant::ExplainOff)?;
    let version = room.version().await;
    match room.phase().await {
        crate::state::RoomPhase::RoundResults => {}
        other => {
            return Err(EngineError::InvalidState(format!(
                "next round can only start from the round results, current phase {other:?}"
            )));
        }
    }

    let has_more = room.read_game(|game| game.has_rounds_remaining()).await?;

    if has_more {
        run_checked_transition_with_broadcast(room, version, RoomEvent::NextRound, || async move {
            room.with_game_mut(|game| {
                let next = game.round.index + 1;
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
        Ok(true)
    } else {
        run_checked_transition_with_broadcast(
            room,
            version,
            RoomEvent::Finish(FinishReason::RoundsExhausted),
            || async move {
                room.with_game_mut(|game| {
                    game.finish_reason = Some(FinishReason::RoundsExhausted);
                })
                .await?;
                Ok(())
            },
        )
        .await?;
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameRules;
    use crate::services::{lobby, rounds};
    use crate::state::{Room, RoomPhase, SharedRoom};

    fn terms(count: usize) -> Vec<crate::content::RawItem> {
        (0..count)
            .map(|i| crate::content::RawItem::Text(format!("Term {i}")))
            .collect()
    }

    async fn started_room(names: &[&str], term_count: usize) -> SharedRoom {
        let room = Room::new(GameRules::explain_off());
        for name in names {
            lobby::join(&room, name).await.unwrap();
        }
        lobby::start(&room, terms(term_count)).await.unwrap();
        room
    }

    async fn submit_all(room: &SharedRoom) {
        while let Some(author) = current_author(room).await.unwrap() {
            submit_explanation(room, &format!("{} explains it best", author.name))
                .await
                .unwrap();
            if room.phase().await != RoomPhase::Round(TurnPhase::Act) {
                break;
            }
        }
    }

    #[tokio::test]
    async fn every_author_submits_then_voting_opens() {
        let room = started_room(&["Alice", "Bob", "Cara"], 2).await;
        assert_eq!(room.phase().await, RoomPhase::Round(TurnPhase::Act));

        submit_all(&room).await;
        assert_eq!(room.phase().await, RoomPhase::Round(TurnPhase::Vote));

        let submissions = room.read_game(|g| g.submissions.len()).await.unwrap();
        assert_eq!(submissions, 3);
    }

    #[tokio::test]
    async fn each_voter_sees_two_anonymous_candidates() {
        let room = started_room(&["Alice", "Bob", "Cara"], 1).await;
        submit_all(&room).await;

        for _ in 0..3 {
            let view = voting_view(&room).await.unwrap();
            assert_eq!(view.candidates.len(), 2, "own submission must be excluded");

            // nothing in the ballot leaks authorship
            let own_text = format!(
                "{} explains it best",
                room.read_roster(|r| r.get(view.voter).unwrap().name.clone())
                    .await
            );
            assert!(view.candidates.iter().all(|c| c.text != own_text));

            let choice = view.candidates[0].id;
            cast_vote(&room, choice).await.unwrap();
        }
        assert_eq!(room.phase().await, RoomPhase::RoundResults);
    }

    #[tokio::test]
    async fn majority_vote_crowns_the_author() {
        let room = started_room(&["Alice", "Bob", "Cara"], 1).await;
        submit_all(&room).await;

        // everyone votes for the first submission they are shown that was
        // written by the first participant in roster order
        let first = room
            .read_roster(|r| r.iter().next().unwrap().clone())
            .await;
        let target = room
            .read_game(|g| {
                g.submissions
                    .values()
                    .find(|s| s.author == first.id)
                    .map(|s| s.id)
                    .unwrap()
            })
            .await
            .unwrap();

        let mut votes_for_target = 0;
        while room.phase().await == RoomPhase::Round(TurnPhase::Vote) {
            let view = voting_view(&room).await.unwrap();
            if let Some(candidate) = view.candidates.iter().find(|c| c.id == target) {
                cast_vote(&room, candidate.id).await.unwrap();
                votes_for_target += 1;
            } else {
                // the target author votes for someone else
                cast_vote(&room, view.candidates[0].id).await.unwrap();
            }
        }

        assert_eq!(votes_for_target, 2);
        let results = round_results(&room).await.unwrap();
        assert_eq!(results.winner.unwrap().id, first.id);
        assert_eq!(results.winning_text.unwrap(), format!("{} explains it best", first.name));
        assert_eq!(results.votes_cast, 3);
    }

    #[tokio::test]
    async fn voting_for_your_own_submission_is_rejected() {
        let room = started_room(&["Alice", "Bob"], 1).await;
        submit_all(&room).await;

        let voter = current_voter(&room).await.unwrap().unwrap();
        let own = room
            .read_game(|g| {
                g.submissions
                    .values()
                    .find(|s| s.author == voter.id)
                    .map(|s| s.id)
                    .unwrap()
            })
            .await
            .unwrap();

        let err = cast_vote(&room, own).await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));
        // the vote was not recorded and the turn did not advance
        assert_eq!(room.read_game(|g| g.votes.len()).await.unwrap(), 0);
        assert_eq!(current_voter(&room).await.unwrap().unwrap().id, voter.id);
    }

    #[tokio::test]
    async fn declining_every_vote_yields_no_winner() {
        let room = started_room(&["Alice", "Bob"], 1).await;
        submit_all(&room).await;

        skip_vote(&room).await.unwrap();
        skip_vote(&room).await.unwrap();

        assert_eq!(room.phase().await, RoomPhase::RoundResults);
        let results = round_results(&room).await.unwrap();
        assert!(results.winner.is_none());
        assert!(results.winning_text.is_none());
        assert_eq!(results.votes_cast, 0);
    }

    #[tokio::test]
    async fn timed_out_author_gets_the_placeholder() {
        let room = started_room(&["Alice", "Bob"], 1).await;

        let first = current_author(&room).await.unwrap().unwrap();
        let generation = room.version().await;
        rounds::handle_expiry(&room, generation).await;

        let text = room
            .read_game(|g| {
                g.submissions
                    .values()
                    .find(|s| s.author == first.id)
                    .map(|s| s.text.clone())
                    .unwrap()
            })
            .await
            .unwrap();
        assert_eq!(text, PLACEHOLDER_EXPLANATION);

        // the pass moved on to the second author
        let next = current_author(&room).await.unwrap().unwrap();
        assert_ne!(next.id, first.id);
    }

    #[tokio::test]
    async fn blank_submissions_become_the_placeholder() {
        let room = started_room(&["Alice", "Bob"], 1).await;
        submit_explanation(&room, "   ").await.unwrap();

        let text = room
            .read_game(|g| g.submissions.values().next().map(|s| s.text.clone()).unwrap())
            .await
            .unwrap();
        assert_eq!(text, PLACEHOLDER_EXPLANATION);
    }

    #[tokio::test]
    async fn rounds_chain_until_terms_run_out() {
        let room = started_room(&["Alice", "Bob"], 2).await;

        for expected_more in [true, false] {
            submit_all(&room).await;
            while room.phase().await == RoomPhase::Round(TurnPhase::Vote) {
                skip_vote(&room).await.unwrap();
            }
            assert_eq!(room.phase().await, RoomPhase::RoundResults);
            let more = next_round(&room).await.unwrap();
            assert_eq!(more, expected_more);
        }

        assert_eq!(room.phase().await, RoomPhase::Results);
        let results = rounds::results(&room).await.unwrap();
        assert_eq!(results.rounds_played, 2);
    }

    #[tokio::test]
    async fn voting_before_submissions_close_is_invalid() {
        let room = started_room(&["Alice", "Bob"], 1).await;
        let err = voting_view(&room).await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidState(_)));

        let err = cast_vote(&room, uuid::Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidState(_)));
    }

    #[tokio::test]
    async fn roster_order_is_shuffled_at_start() {
        // run several starts; at least one must differ from insertion order
        let names = ["A", "B", "C", "D", "E", "F"];
        let mut any_shuffled = false;
        for _ in 0..12 {
            let room = started_room(&names, 1).await;
            let order: Vec<String> = room
                .read_roster(|r| r.iter().map(|p| p.name.clone()).collect())
                .await;
            if order != names {
                any_shuffled = true;
                break;
            }
        }
        assert!(any_shuffled, "12 starts never shuffled the roster order");
    }
}
