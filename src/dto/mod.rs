//! Serializable views of room state.
//!
//! Everything a host application or transport layer sees goes through these
//! types; in particular the voting view is where submission anonymity is
//! enforced, not just presented.

pub mod common;
pub mod events;
pub mod room;
