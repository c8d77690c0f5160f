//! Boundary with external deck/content sources.
//!
//! Deck storage, import, and AI extraction live outside the engine; all the
//! engine consumes is an ordered list of cards. Sources must hand cards over
//! in stored order: the engine owns every shuffle.

use crate::content::{DEFAULT_CATEGORY, Item, RawItem};
use crate::error::EngineError;

/// One flashcard handed over by an external deck source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeckCard {
    /// Stable identifier within the deck.
    pub id: String,
    /// Prompt side of the card.
    pub front: String,
    /// Answer side of the card.
    pub back: String,
}

/// Supplies the ordered cards of a deck.
pub trait DeckSource: Send + Sync {
    /// Return every card of the deck in stored order.
    fn cards(&self) -> Result<Vec<DeckCard>, EngineError>;
}

/// Deck held directly in memory, used by tests and demo rooms.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDeck {
    cards: Vec<DeckCard>,
}

impl InMemoryDeck {
    /// Wrap an already-loaded card list.
    pub fn new(cards: Vec<DeckCard>) -> Self {
        Self { cards }
    }
}

impl DeckSource for InMemoryDeck {
    fn cards(&self) -> Result<Vec<DeckCard>, EngineError> {
        Ok(self.cards.clone())
    }
}

/// Convert a deck into raw items ready for [`crate::content::prepare`].
pub fn items_from_deck(source: &dyn DeckSource) -> Result<Vec<RawItem>, EngineError> {
    let cards = source.cards()?;
    Ok(cards
        .into_iter()
        .map(|card| {
            RawItem::Ready(Item {
                id: card.id,
                prompt: card.front,
                answer: card.back,
                category: DEFAULT_CATEGORY.to_string(),
                choices: Vec::new(),
            })
        })
        .collect())
}
