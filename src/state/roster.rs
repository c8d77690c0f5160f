//! Mutable participant roster shared by every game variant.
//!
//! Insertion order doubles as turn order, so the map type matters: an
//! [`IndexMap`] keeps both identity lookup and a stable ordering.

use indexmap::IndexMap;
use uuid::Uuid;

use crate::error::EngineError;
use crate::shuffle;

/// One person in the room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    /// Identifier, unique for the lifetime of the room and never reused.
    pub id: Uuid,
    /// Display name, trimmed and non-empty.
    pub name: String,
    /// Whether the participant can still act (elimination games).
    pub alive: bool,
    /// Whether this participant created the lobby.
    pub is_host: bool,
    /// Accumulated points (scoring games).
    pub score: i64,
}

/// Insertion-ordered participant collection.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    members: IndexMap<Uuid, Participant>,
}

impl Roster {
    /// Create an empty roster.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a participant with the given display name.
    ///
    /// Names are trimmed; an empty result is rejected. The first participant
    /// added to an empty roster becomes host.
    pub fn add(&mut self, name: &str) -> Result<Participant, EngineError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(EngineError::InvalidInput(
                "participant name must not be empty".into(),
            ));
        }

        let participant = Participant {
            id: Uuid::new_v4(),
            name: name.to_string(),
            alive: true,
            is_host: self.members.is_empty(),
            score: 0,
        };
        self.members.insert(participant.id, participant.clone());
        Ok(participant)
    }

    /// Remove a participant, preserving the order of the rest.
    ///
    /// When the host leaves, host status passes to the first remaining
    /// participant so at most one host exists at any time.
    pub fn remove(&mut self, id: Uuid) -> Result<Participant, EngineError> {
        let removed = self
            .members
            .shift_remove(&id)
            .ok_or_else(|| EngineError::NotFound(format!("participant `{id}` not found")))?;

        if removed.is_host {
            if let Some((_, next)) = self.members.first_mut() {
                next.is_host = true;
            }
        }
        Ok(removed)
    }

    /// Number of participants.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the roster is empty.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Look up a participant by id.
    pub fn get(&self, id: Uuid) -> Option<&Participant> {
        self.members.get(&id)
    }

    /// Mutable lookup by id.
    pub(crate) fn get_mut(&mut self, id: Uuid) -> Option<&mut Participant> {
        self.members.get_mut(&id)
    }

    /// Participant at the given roster position.
    pub fn get_index(&self, index: usize) -> Option<&Participant> {
        self.members.get_index(index).map(|(_, participant)| participant)
    }

    /// Roster position of the given participant.
    pub fn position_of(&self, id: Uuid) -> Option<usize> {
        self.members.get_index_of(&id)
    }

    /// Iterate participants in turn order.
    pub fn iter(&self) -> impl Iterator<Item = &Participant> {
        self.members.values()
    }

    /// Participants still able to act.
    pub fn survivors(&self) -> impl Iterator<Item = &Participant> {
        self.members.values().filter(|p| p.alive)
    }

    /// Number of participants still able to act.
    pub fn alive_count(&self) -> usize {
        self.survivors().count()
    }

    /// The current host, if any.
    pub fn host(&self) -> Option<&Participant> {
        self.members.values().find(|p| p.is_host)
    }

    /// Reset per-game status ahead of a new game: everyone alive, scores zero.
    pub fn reset_for_start(&mut self) {
        for participant in self.members.values_mut() {
            participant.alive = true;
            participant.score = 0;
        }
    }

    /// Randomize turn order (used by the explanation game at start).
    pub fn shuffle_order(&mut self) {
        let mut entries: Vec<(Uuid, Participant)> =
            std::mem::take(&mut self.members).into_iter().collect();
        shuffle::shuffle_in_place(&mut entries);
        self.members = entries.into_iter().collect();
    }
}
