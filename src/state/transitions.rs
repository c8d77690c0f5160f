use crate::error::EngineError;
use crate::services::sync_events;
use crate::state::{RoomEvent, SharedRoom};

/// Execute a planned state-machine transition, then broadcast the resulting
/// phase change.
pub(crate) async fn run_transition_with_broadcast<F, Fut, T>(
    room: &SharedRoom,
    event: RoomEvent,
    work: F,
) -> Result<T, EngineError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, EngineError>>,
{
    let (res, next) = room.run_transition(event, work).await?;
    sync_events::broadcast_phase_changed(room, &next).await;
    Ok(res)
}

/// Version-checked variant of [`run_transition_with_broadcast`]: the
/// transition only runs if the state machine is still at `expected_version`.
pub(crate) async fn run_checked_transition_with_broadcast<F, Fut, T>(
    room: &SharedRoom,
    expected_version: usize,
    event: RoomEvent,
    work: F,
) -> Result<T, EngineError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, EngineError>>,
{
    let (res, next) = room
        .run_transition_checked(expected_version, event, work)
        .await?;
    sync_events::broadcast_phase_changed(room, &next).await;
    Ok(res)
}
