//! Question/term preparation: normalizes heterogeneous input into the uniform
//! item list a game plays through, builds answer-choice sets for quiz items,
//! and truncates the sequence to the configured round count.

pub mod deck;

use crate::config::{GameRules, GameVariant};
use crate::error::EngineError;
use crate::shuffle;

/// Category assigned to items that arrive without one.
pub const DEFAULT_CATEGORY: &str = "General";

/// A prepared question or term. Immutable once a round starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    /// Stable identifier within the room.
    pub id: String,
    /// Prompt shown to the acting participant (question text or term).
    pub prompt: String,
    /// Correct answer text. Empty for explanation terms, which have none.
    pub answer: String,
    /// Display category.
    pub category: String,
    /// Answer choices including the correct one; empty means free-response.
    pub choices: Vec<String>,
}

/// Heterogeneous input accepted by [`prepare`]: plain strings are wrapped
/// into items with the default category, ready items pass through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawItem {
    /// A bare term or question with no metadata.
    Text(String),
    /// A fully-formed item.
    Ready(Item),
}

/// Normalize, shuffle, and truncate raw input into the round sequence.
///
/// Survival-quiz items missing a choice set get one built from the answers of
/// the other items. Returns [`EngineError::NoContent`] when nothing usable
/// remains, or when a board variant has too few items to fill its grid.
pub fn prepare(raw: Vec<RawItem>, rules: &GameRules) -> Result<Vec<Item>, EngineError> {
    let mut items: Vec<Item> = raw
        .into_iter()
        .enumerate()
        .map(|(index, raw)| normalize(index, raw))
        .filter(|item| !item.prompt.is_empty())
        .collect();

    shuffle::shuffle_in_place(&mut items);

    if matches!(rules.variant, GameVariant::Survival) {
        build_missing_choices(&mut items, rules.choice_count);
    }

    if rules.round_cap > 0 {
        items.truncate(rules.round_cap);
    }

    if items.is_empty() {
        return Err(EngineError::NoContent);
    }
    if matches!(rules.variant, GameVariant::Board) && items.len() < rules.board.cell_count() {
        return Err(EngineError::NoContent);
    }

    Ok(items)
}

/// Built-in quiz questions used when no external deck is supplied.
pub fn fallback_questions() -> Vec<RawItem> {
    fn question(id: &str, prompt: &str, answer: &str, choices: &[&str]) -> RawItem {
        RawItem::Ready(Item {
            id: id.to_string(),
            prompt: prompt.to_string(),
            answer: answer.to_string(),
            category: DEFAULT_CATEGORY.to_string(),
            choices: choices.iter().map(|c| c.to_string()).collect(),
        })
    }

    vec![
        question("f1", "What is 2 + 2?", "4", &["3", "4", "5", "6"]),
        question(
            "f2",
            "What is the capital of France?",
            "Paris",
            &["London", "Paris", "Berlin", "Madrid"],
        ),
        question(
            "f3",
            "What planet is known as the Red Planet?",
            "Mars",
            &["Venus", "Mars", "Jupiter", "Saturn"],
        ),
        question("f4", "How many continents are there?", "7", &["5", "6", "7", "8"]),
        question("f5", "What is H2O?", "Water", &["Salt", "Water", "Sugar", "Oil"]),
    ]
}

/// Built-in explanation terms used when no external deck is supplied.
pub fn default_terms() -> Vec<RawItem> {
    fn term(id: &str, prompt: &str, category: &str) -> RawItem {
        RawItem::Ready(Item {
            id: id.to_string(),
            prompt: prompt.to_string(),
            answer: String::new(),
            category: category.to_string(),
            choices: Vec::new(),
        })
    }

    vec![
        term("t1", "Photosynthesis", "Biology"),
        term("t2", "Machine Learning", "Technology"),
        term("t3", "Inflation", "Economics"),
        term("t4", "Democracy", "Politics"),
        term("t5", "Black Hole", "Astronomy"),
    ]
}

fn normalize(index: usize, raw: RawItem) -> Item {
    match raw {
        RawItem::Text(text) => Item {
            id: format!("term-{index}"),
            prompt: text.trim().to_string(),
            answer: String::new(),
            category: DEFAULT_CATEGORY.to_string(),
            choices: Vec::new(),
        },
        RawItem::Ready(mut item) => {
            if item.category.is_empty() {
                item.category = DEFAULT_CATEGORY.to_string();
            }
            item
        }
    }
}

/// Build a choice set for every item that lacks one: `k - 1` distinct wrong
/// answers drawn from the other items' answers, plus the correct answer,
/// shuffled together. A pool smaller than required yields fewer choices.
fn build_missing_choices(items: &mut [Item], choice_count: usize) {
    if choice_count < 2 {
        return;
    }

    let answers: Vec<String> = items.iter().map(|item| item.answer.clone()).collect();

    for (index, item) in items.iter_mut().enumerate() {
        if !item.choices.is_empty() {
            continue;
        }

        let mut pool: Vec<String> = answers
            .iter()
            .enumerate()
            .filter(|(other, answer)| *other != index && **answer != item.answer)
            .map(|(_, answer)| answer.clone())
            .collect();
        pool.sort_unstable();
        pool.dedup();
        shuffle::shuffle_in_place(&mut pool);
        pool.truncate(choice_count - 1);

        let mut choices = pool;
        choices.push(item.answer.clone());
        shuffle::shuffle_in_place(&mut choices);
        item.choices = choices;
    }
}
