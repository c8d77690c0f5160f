//! Builders for the events published through a room's sync hub after each
//! committed transition. Publication is fire-and-forget: serialization
//! failures are logged and dropped, never surfaced to the caller.

use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::dto::events::{
    AnswerResolvedEvent, CellPickedEvent, CellResolvedEvent, ParticipantJoinedEvent,
    ParticipantLeftEvent, PhaseChangedEvent, RoundResultsEvent, SubmissionRecordedEvent,
    SyncEvent, TimerArmedEvent, VoteRecordedEvent,
};
use crate::dto::room::{
    AnswerOutcome, CellOutcome, CellView, ParticipantSummary, RoundResultsView,
};
use crate::state::{Room, RoomPhase, SharedRoom, TurnPhase};

const EVENT_PARTICIPANT_JOINED: &str = "participant.joined";
const EVENT_PARTICIPANT_LEFT: &str = "participant.left";
const EVENT_PHASE_CHANGED: &str = "phase_changed";
const EVENT_ANSWER_RESOLVED: &str = "answer.resolved";
const EVENT_SUBMISSION_RECORDED: &str = "submission.recorded";
const EVENT_VOTE_RECORDED: &str = "vote.recorded";
const EVENT_ROUND_RESULTS: &str = "round.results";
const EVENT_CELL_PICKED: &str = "cell.picked";
const EVENT_CELL_RESOLVED: &str = "cell.resolved";
const EVENT_TIMER_ARMED: &str = "timer.armed";

/// Broadcast that a participant joined the lobby.
pub(crate) fn broadcast_participant_joined(room: &Room, participant: &ParticipantSummary) {
    let payload = ParticipantJoinedEvent {
        participant: participant.clone(),
    };
    send_event(room, EVENT_PARTICIPANT_JOINED, &payload);
}

/// Broadcast that a participant left the lobby.
pub(crate) fn broadcast_participant_left(room: &Room, participant_id: Uuid) {
    let payload = ParticipantLeftEvent { participant_id };
    send_event(room, EVENT_PARTICIPANT_LEFT, &payload);
}

/// Broadcast a phase change, re-announcing the participant expected to act.
pub(crate) async fn broadcast_phase_changed(room: &SharedRoom, phase: &RoomPhase) {
    let roster = room.read_roster(|r| r.clone()).await;
    let (round_index, actor) = room
        .read_game(|game| {
            let actor = match phase {
                RoomPhase::Round(TurnPhase::Act) => match game.variant {
                    crate::config::GameVariant::ExplainOff => {
                        game.pass.current(&roster).map(|p| p.id)
                    }
                    _ => game.turns.current_responder(&roster).map(|p| p.id),
                },
                RoomPhase::Round(TurnPhase::Vote) => game.pass.current(&roster).map(|p| p.id),
                _ => None,
            };
            (Some(game.round.index), actor)
        })
        .await
        .unwrap_or((None, None));

    let payload = PhaseChangedEvent {
        phase: phase.into(),
        round_index,
        actor,
    };
    send_event(room, EVENT_PHASE_CHANGED, &payload);
}

/// Broadcast a resolved quiz turn.
pub(crate) fn broadcast_answer_resolved(room: &Room, outcome: &AnswerOutcome) {
    let payload = AnswerResolvedEvent {
        responder: outcome.responder,
        correct: outcome.correct,
        eliminated: outcome.eliminated,
    };
    send_event(room, EVENT_ANSWER_RESOLVED, &payload);
}

/// Broadcast submission progress. Counts only: authorship stays hidden.
pub(crate) fn broadcast_submission_recorded(room: &Room, submitted: usize, pending: usize) {
    let payload = SubmissionRecordedEvent { submitted, pending };
    send_event(room, EVENT_SUBMISSION_RECORDED, &payload);
}

/// Broadcast voting progress. Counts only.
pub(crate) fn broadcast_vote_recorded(room: &Room, votes: usize, pending: usize) {
    let payload = VoteRecordedEvent { votes, pending };
    send_event(room, EVENT_VOTE_RECORDED, &payload);
}

/// Broadcast a tallied explanation round, authorship now revealed.
pub(crate) fn broadcast_round_results(room: &Room, results: &RoundResultsView) {
    let payload = RoundResultsEvent {
        results: results.clone(),
    };
    send_event(room, EVENT_ROUND_RESULTS, &payload);
}

/// Broadcast an opened board cell.
pub(crate) fn broadcast_cell_picked(room: &Room, cell: &CellView, picker: Option<Uuid>) {
    let payload = CellPickedEvent {
        cell: cell.clone(),
        picker,
    };
    send_event(room, EVENT_CELL_PICKED, &payload);
}

/// Broadcast a resolved board cell.
pub(crate) fn broadcast_cell_resolved(room: &Room, outcome: &CellOutcome) {
    let payload = CellResolvedEvent {
        category: outcome.category,
        row: outcome.row,
        awarded_to: outcome.awarded_to,
        correct: outcome.correct,
        score: outcome.score,
    };
    send_event(room, EVENT_CELL_RESOLVED, &payload);
}

/// Broadcast that a countdown started.
pub(crate) fn broadcast_timer_armed(room: &Room, seconds: u64) {
    let payload = TimerArmedEvent { seconds };
    send_event(room, EVENT_TIMER_ARMED, &payload);
}

fn send_event(room: &Room, event: &str, payload: &impl Serialize) {
    match SyncEvent::json(room.id(), event, payload) {
        Ok(event) => room.sync().publish(event),
        Err(err) => warn!(event, error = %err, "failed to serialize sync payload"),
    }
}

#[cfg(test)]
mod tests {
    use crate::config::GameRules;
    use crate::content::RawItem;
    use crate::services::lobby;
    use crate::state::Room;

    #[tokio::test]
    async fn lobby_and_start_publish_events_in_order() {
        let room = Room::new(GameRules::explain_off());
        let mut events = room.sync().subscribe();

        lobby::join(&room, "Alice").await.unwrap();
        lobby::join(&room, "Bob").await.unwrap();
        let left = lobby::join(&room, "Cara").await.unwrap();
        lobby::leave(&room, left.id).await.unwrap();
        lobby::start(&room, vec![RawItem::Text("Entropy".into())])
            .await
            .unwrap();

        let names: Vec<String> = std::iter::from_fn(|| events.try_recv().ok())
            .map(|e| e.event)
            .collect();
        assert_eq!(
            names,
            vec![
                "participant.joined",
                "participant.joined",
                "participant.joined",
                "participant.left",
                "phase_changed",
                "timer.armed",
            ]
        );
    }

    #[tokio::test]
    async fn events_carry_the_room_id() {
        let room = Room::new(GameRules::explain_off());
        let mut events = room.sync().subscribe();

        lobby::join(&room, "Alice").await.unwrap();
        let event = events.try_recv().unwrap();
        assert_eq!(event.room_id, room.id());
        assert!(event.data.contains("Alice"));
    }
}
