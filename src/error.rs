use thiserror::Error;

use crate::state::{AbortError, ApplyError, PlanError};

/// Errors surfaced by engine operations.
///
/// Every variant is a local, recoverable condition: the caller (UI or
/// transport layer) decides whether to retry or surface it. None of them
/// invalidates the room instance.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Operation cannot be performed in the current phase.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// Invalid input provided by the caller.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// A game start was requested with fewer participants than configured.
    #[error("not enough participants: have {have}, need {need}")]
    InsufficientPlayers {
        /// Participants currently in the roster.
        have: usize,
        /// Configured minimum roster size.
        need: usize,
    },
    /// The content source yielded zero usable items after preparation.
    #[error("no usable items in content source")]
    NoContent,
    /// Requested entity was not found.
    #[error("not found: {0}")]
    NotFound(String),
}

impl From<PlanError> for EngineError {
    fn from(err: PlanError) -> Self {
        match err {
            PlanError::AlreadyPending => {
                EngineError::InvalidState("state transition already pending".into())
            }
            PlanError::InvalidTransition(invalid) => EngineError::InvalidState(invalid.to_string()),
        }
    }
}

impl From<ApplyError> for EngineError {
    fn from(err: ApplyError) -> Self {
        match err {
            ApplyError::NoPending => EngineError::InvalidState("no transition is pending".into()),
            ApplyError::IdMismatch { .. } => {
                EngineError::InvalidState("pending transition does not match".into())
            }
            ApplyError::PhaseMismatch { expected, actual } => EngineError::InvalidState(format!(
                "state changed during transition (expected {expected:?}, got {actual:?})"
            )),
            ApplyError::VersionMismatch { expected, actual } => EngineError::InvalidState(format!(
                "state version mismatch during transition (expected {expected}, got {actual})"
            )),
        }
    }
}

impl From<AbortError> for EngineError {
    fn from(err: AbortError) -> Self {
        match err {
            AbortError::NoPending => EngineError::InvalidState("no pending transition".into()),
            AbortError::IdMismatch { .. } => {
                EngineError::InvalidState("transition plan does not match".into())
            }
        }
    }
}
