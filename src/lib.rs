//! Pass-and-play party game engine for study rooms.
//!
//! A [`Room`](state::Room) is one isolated game instance: a roster of
//! participants, a phase state machine (lobby → rounds → results), the
//! shuffled item sequence, a per-round countdown, and a sync hub that
//! broadcasts every committed transition to whatever transport the host
//! application plugs in. Rooms are independent; a [`RoomRegistry`]
//! (see [`state::RoomRegistry`]) tracks any number of them concurrently.
//!
//! Three variants run on the same engine, selected by [`GameRules`]:
//!
//! * **Survival**: an elimination quiz. One responder per round answers a
//!   multiple-choice question under a shrinking countdown; a wrong answer or
//!   a timeout eliminates them ([`services::quiz`]).
//! * **ExplainOff**: everyone writes an anonymous explanation of a term,
//!   then votes for the best one, never their own ([`services::explain`]).
//! * **Board**: a category-by-points trivia grid cleared cell by cell, with
//!   host-attributed scoring clamped at zero ([`services::board`]).
//!
//! Content arrives through [`content::prepare`] (plain strings, ready-made
//! items, or a [`content::deck::DeckSource`]); the engine owns all shuffling,
//! choice building, and round-count truncation.

pub mod config;
pub mod content;
pub mod dto;
pub mod error;
pub mod logging;
pub mod scoring;
pub mod services;
pub mod shuffle;
pub mod state;

pub use config::{EngineConfig, GameRules, GameVariant, TimerRules};
pub use error::EngineError;
pub use state::{Room, RoomRegistry, SharedRoom};
