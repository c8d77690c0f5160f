//! Operations on rooms, grouped by concern: lobby management, the three game
//! variants, the round countdown, shared round plumbing, and sync event
//! publication.

pub mod board;
pub mod explain;
pub mod lobby;
pub mod quiz;
pub mod rounds;
pub mod sync_events;
pub mod timer;
