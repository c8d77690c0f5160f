//! Round resolution outcomes: eliminations, point awards, and vote tallies.

use indexmap::IndexMap;
use tracing::debug;
use uuid::Uuid;

use crate::state::game::Submission;
use crate::state::roster::Roster;

/// Mark a participant eliminated.
///
/// Idempotent: returns `false` when the participant was already out (or is
/// unknown), with no further side effects.
pub fn eliminate(roster: &mut Roster, id: Uuid) -> bool {
    match roster.get_mut(id) {
        Some(participant) if participant.alive => {
            participant.alive = false;
            true
        }
        _ => false,
    }
}

/// Resolve a wrong quiz answer against the configured elimination rate.
/// Returns whether the responder was eliminated.
///
/// Rates below `1.0` are configuration without behavior: nobody is
/// eliminated and the round proceeds normally. Kept as a named no-op rather
/// than silently promoting to full elimination.
pub fn eliminate_for_wrong_answer(roster: &mut Roster, id: Uuid, rate: f32) -> bool {
    if rate >= 1.0 {
        return eliminate(roster, id);
    }
    debug!(
        participant = %id,
        rate,
        "elimination rate below 1.0 has no implemented policy; responder spared"
    );
    false
}

/// Attribute a cell's point value to a participant, clamping the resulting
/// score at zero. Returns the new score, or `None` for an unknown id.
pub fn award(roster: &mut Roster, id: Uuid, points: i64, correct: bool) -> Option<i64> {
    let participant = roster.get_mut(id)?;
    let delta = if correct { points } else { -points };
    participant.score = (participant.score + delta).max(0);
    Some(participant.score)
}

/// Count votes per submission and return the winner.
///
/// Ties on the maximum count resolve to the earliest-submitted entry: the
/// map iterates in submission order and a later submission only wins with a
/// strictly greater count. A round with no votes has no winner.
pub fn tally<'a>(
    votes: &IndexMap<Uuid, Uuid>,
    submissions: &'a IndexMap<Uuid, Submission>,
) -> Option<&'a Submission> {
    if votes.is_empty() {
        return None;
    }

    let mut winner: Option<(&Submission, usize)> = None;
    for submission in submissions.values() {
        let count = votes.values().filter(|chosen| **chosen == submission.id).count();
        if count == 0 {
            continue;
        }
        match winner {
            Some((_, best)) if count <= best => {}
            _ => winner = Some((submission, count)),
        }
    }
    winner.map(|(submission, _)| submission)
}
