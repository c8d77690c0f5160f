//! Per-round countdown driving automatic turn resolution.
//!
//! One task per room at most; arming a new window cancels the previous one.
//! Expiry routes a timed-out action through the same resolution functions as
//! an explicit action, guarded by the state-machine version captured at arm
//! time: a countdown whose round has already moved on is a silent no-op.

use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::debug;

use crate::services::{rounds, sync_events};
use crate::state::{Room, SharedRoom};

/// Countdown attached to a room.
pub struct RoundTimer {
    remaining: watch::Sender<u64>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl RoundTimer {
    pub(crate) fn new() -> Self {
        let (remaining, _rx) = watch::channel(0);
        Self {
            remaining,
            task: Mutex::new(None),
        }
    }

    /// Seconds left in the current act window, updated once per second.
    pub fn remaining(&self) -> watch::Receiver<u64> {
        self.remaining.subscribe()
    }

    /// Stop the running countdown, if any, and zero the clock.
    pub(crate) async fn cancel(&self) {
        if let Some(handle) = self.task.lock().await.take() {
            handle.abort();
        }
        let _ = self.remaining.send(0);
    }
}

/// Arm the countdown for the current act window.
///
/// `generation` is the state-machine version the window belongs to; the
/// expiry re-validates it before touching any state.
pub(crate) async fn arm(room: &SharedRoom, duration_secs: u64, generation: usize) {
    let timer = room.timer();
    timer.cancel().await;
    if duration_secs == 0 {
        return;
    }

    let _ = timer.remaining.send(duration_secs);
    sync_events::broadcast_timer_armed(room, duration_secs);

    let weak: Weak<Room> = Arc::downgrade(room);
    let remaining = timer.remaining.clone();
    let handle = tokio::spawn(async move {
        run_countdown(weak, remaining, duration_secs, generation).await;
    });
    *timer.task.lock().await = Some(handle);
}

async fn run_countdown(
    room: Weak<Room>,
    remaining: watch::Sender<u64>,
    duration_secs: u64,
    generation: usize,
) {
    let mut ticks = interval(Duration::from_secs(1));
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // the first tick completes immediately
    ticks.tick().await;

    let mut left = duration_secs;
    while left > 0 {
        ticks.tick().await;
        left -= 1;
        let _ = remaining.send(left);
    }

    let Some(room) = room.upgrade() else {
        return;
    };
    debug!(room = %room.id(), generation, "countdown expired; resolving turn");
    rounds::handle_expiry(&room, generation).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameRules;
    use crate::state::Room;

    #[tokio::test(start_paused = true)]
    async fn countdown_publishes_remaining_seconds() {
        let room = Room::new(GameRules::survival());
        let mut remaining = room.timer().remaining();

        arm(&room, 3, room.version().await).await;
        assert_eq!(*remaining.borrow_and_update(), 3);

        tokio::time::sleep(Duration::from_millis(1100)).await;
        remaining.changed().await.unwrap();
        assert_eq!(*remaining.borrow_and_update(), 2);

        tokio::time::sleep(Duration::from_millis(1000)).await;
        remaining.changed().await.unwrap();
        assert_eq!(*remaining.borrow_and_update(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_stops_the_countdown_and_zeroes_the_clock() {
        let room = Room::new(GameRules::survival());
        arm(&room, 10, room.version().await).await;

        room.timer().cancel().await;
        let remaining = room.timer().remaining();
        assert_eq!(*remaining.borrow(), 0);

        // no further ticks arrive after cancellation
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(*remaining.borrow(), 0);
    }

    #[tokio::test]
    async fn zero_duration_never_spawns_a_task() {
        let room = Room::new(GameRules::board());
        arm(&room, 0, room.version().await).await;
        assert!(room.timer().task.lock().await.is_none());
    }
}
