//! Room state: the aggregate owning a game's roster, phase machine, session
//! data, countdown, and sync hub, plus the registry of independent rooms.

pub mod game;
pub mod roster;
pub mod state_machine;
mod sync;
pub mod transitions;
pub mod turns;

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, MutexGuard, RwLock};
use tracing::warn;
use uuid::Uuid;

use crate::config::GameRules;
use crate::error::EngineError;
use crate::services::timer::RoundTimer;
use crate::state::game::RoomGame;
use crate::state::roster::Roster;

pub use self::state_machine::{
    AbortError, ApplyError, FinishReason, InvalidTransition, Plan, PlanError, PlanId, RoomEvent,
    RoomPhase, RoomStateMachine, Snapshot, TurnPhase,
};
pub use self::sync::SyncHub;

/// Shared handle to a room.
pub type SharedRoom = Arc<Room>;

/// Broadcast channel capacity for a room's sync hub.
const SYNC_HUB_CAPACITY: usize = 32;

/// One isolated game room: its own roster, phase machine, session, countdown,
/// and sync hub. Rooms share nothing with each other.
///
/// All state transitions are serialized through the transition gate, so
/// concurrent actions on the same room resolve as "first valid transition
/// wins, second is a no-op".
pub struct Room {
    id: Uuid,
    rules: GameRules,
    machine: RwLock<RoomStateMachine>,
    roster: RwLock<Roster>,
    game: RwLock<Option<RoomGame>>,
    sync: SyncHub,
    timer: RoundTimer,
    transition_gate: Mutex<()>,
}

impl Room {
    /// Create a room playing under the given rules, wrapped in an [`Arc`] so
    /// timers and transports can hold weak references to it.
    pub fn new(rules: GameRules) -> SharedRoom {
        Arc::new(Self {
            id: Uuid::new_v4(),
            rules,
            machine: RwLock::new(RoomStateMachine::new()),
            roster: RwLock::new(Roster::new()),
            game: RwLock::new(None),
            sync: SyncHub::new(SYNC_HUB_CAPACITY),
            timer: RoundTimer::new(),
            transition_gate: Mutex::new(()),
        })
    }

    /// Room identifier.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Rules the room plays under.
    pub fn rules(&self) -> &GameRules {
        &self.rules
    }

    /// Broadcast hub for committed transitions.
    pub fn sync(&self) -> &SyncHub {
        &self.sync
    }

    /// The room's countdown.
    pub fn timer(&self) -> &RoundTimer {
        &self.timer
    }

    /// Snapshot the current phase.
    pub async fn phase(&self) -> RoomPhase {
        self.machine.read().await.phase()
    }

    /// Current state-machine version.
    pub async fn version(&self) -> usize {
        self.machine.read().await.version()
    }

    /// Snapshot of the state machine (phase, version, pending transition).
    pub async fn snapshot(&self) -> Snapshot {
        self.machine.read().await.snapshot()
    }

    /// Read the roster under its lock.
    pub async fn read_roster<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&Roster) -> T,
    {
        let guard = self.roster.read().await;
        f(&guard)
    }

    /// Mutate the roster under its lock.
    pub(crate) async fn with_roster_mut<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&mut Roster) -> T,
    {
        let mut guard = self.roster.write().await;
        f(&mut guard)
    }

    /// Read the active game, failing when none is running.
    pub async fn read_game<F, T>(&self, f: F) -> Result<T, EngineError>
    where
        F: FnOnce(&RoomGame) -> T,
    {
        let guard = self.game.read().await;
        match guard.as_ref() {
            Some(game) => Ok(f(game)),
            None => Err(EngineError::InvalidState("no active game".into())),
        }
    }

    /// Mutate the active game, failing when none is running.
    pub(crate) async fn with_game_mut<F, T>(&self, f: F) -> Result<T, EngineError>
    where
        F: FnOnce(&mut RoomGame) -> T,
    {
        let mut guard = self.game.write().await;
        match guard.as_mut() {
            Some(game) => Ok(f(game)),
            None => Err(EngineError::InvalidState("no active game".into())),
        }
    }

    /// Install or clear the active game.
    pub(crate) async fn set_game(&self, game: Option<RoomGame>) {
        let mut guard = self.game.write().await;
        *guard = game;
    }

    /// Hold the transition gate for a mutation that does not change phase
    /// (lobby roster edits, board cell picks).
    pub(crate) async fn lock_gate(&self) -> MutexGuard<'_, ()> {
        self.transition_gate.lock().await
    }

    /// Plan a transition on the shared state machine, returning the plan.
    async fn plan_transition(&self, event: RoomEvent) -> Result<Plan, PlanError> {
        let mut machine = self.machine.write().await;
        machine.plan(event)
    }

    /// Apply the planned transition, returning the next phase.
    async fn apply_planned_transition(&self, plan_id: PlanId) -> Result<RoomPhase, ApplyError> {
        let mut machine = self.machine.write().await;
        machine.apply(plan_id)
    }

    /// Abort a planned transition.
    async fn abort_transition(&self, plan_id: PlanId) -> Result<(), AbortError> {
        let mut machine = self.machine.write().await;
        machine.abort(plan_id)
    }

    /// Run `work` inside a planned transition: plan the event, execute the
    /// work, then apply (or abort if the work fails). The gate serializes
    /// transitions per room.
    pub(crate) async fn run_transition<F, Fut, T>(
        &self,
        event: RoomEvent,
        work: F,
    ) -> Result<(T, RoomPhase), EngineError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, EngineError>>,
    {
        let gate = self.lock_gate().await;
        let result = self.transition_locked(event, work).await;
        drop(gate);
        result
    }

    /// Like [`Room::run_transition`], but refuses to run when the state
    /// machine version moved past `expected_version`. This is how a decision
    /// computed outside the gate (a user action, a countdown expiry) becomes
    /// a no-op instead of acting on state that has since changed.
    pub(crate) async fn run_transition_checked<F, Fut, T>(
        &self,
        expected_version: usize,
        event: RoomEvent,
        work: F,
    ) -> Result<(T, RoomPhase), EngineError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, EngineError>>,
    {
        let gate = self.lock_gate().await;
        let current = self.machine.read().await.version();
        if current != expected_version {
            drop(gate);
            return Err(EngineError::InvalidState(format!(
                "room state changed (expected version {expected_version}, now {current})"
            )));
        }
        let result = self.transition_locked(event, work).await;
        drop(gate);
        result
    }

    async fn transition_locked<F, Fut, T>(
        &self,
        event: RoomEvent,
        work: F,
    ) -> Result<(T, RoomPhase), EngineError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, EngineError>>,
    {
        let Plan { id: plan_id, .. } = self.plan_transition(event.clone()).await?;

        match work().await {
            Ok(value) => {
                let next = self.apply_planned_transition(plan_id).await?;
                Ok((value, next))
            }
            Err(err) => {
                if let Err(abort_err) = self.abort_transition(plan_id).await {
                    warn!(
                        event = ?event,
                        plan_id = %plan_id,
                        error = ?abort_err,
                        "failed to abort transition after work error"
                    );
                }
                Err(err)
            }
        }
    }
}

/// Registry of independent rooms keyed by id. Rooms run concurrently without
/// shared state; the registry only hands out handles.
#[derive(Default)]
pub struct RoomRegistry {
    rooms: DashMap<Uuid, SharedRoom>,
}

impl RoomRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a room under the given rules and track it.
    pub fn create(&self, rules: GameRules) -> SharedRoom {
        let room = Room::new(rules);
        self.rooms.insert(room.id(), room.clone());
        room
    }

    /// Look up a room by id.
    pub fn get(&self, id: Uuid) -> Option<SharedRoom> {
        self.rooms.get(&id).map(|entry| entry.value().clone())
    }

    /// Drop a room from the registry. Outstanding handles keep it alive
    /// until they are released.
    pub fn remove(&self, id: Uuid) -> bool {
        self.rooms.remove(&id).is_some()
    }

    /// Number of tracked rooms.
    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    /// Whether no rooms are tracked.
    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameRules;

    #[tokio::test]
    async fn rooms_start_in_the_lobby() {
        let room = Room::new(GameRules::survival());
        assert_eq!(room.phase().await, RoomPhase::Lobby);
        assert_eq!(room.version().await, 0);
        assert!(room.read_game(|_| ()).await.is_err());
    }

    #[tokio::test]
    async fn registry_tracks_independent_rooms() {
        let registry = RoomRegistry::new();
        let a = registry.create(GameRules::survival());
        let b = registry.create(GameRules::explain_off());

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get(a.id()).unwrap().id(), a.id());

        a.with_roster_mut(|roster| roster.add("Alice").map(|_| ()))
            .await
            .unwrap();
        assert_eq!(a.read_roster(|r| r.len()).await, 1);
        assert_eq!(b.read_roster(|r| r.len()).await, 0);

        assert!(registry.remove(a.id()));
        assert!(registry.get(a.id()).is_none());
    }

    #[tokio::test]
    async fn failed_work_aborts_the_transition() {
        let room = Room::new(GameRules::survival());
        let err = room
            .run_transition(RoomEvent::Start, || async {
                Err::<(), _>(EngineError::NoContent)
            })
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NoContent));
        assert_eq!(room.phase().await, RoomPhase::Lobby);

        // the abort left no pending plan behind
        let (_, next) = room
            .run_transition(RoomEvent::Start, || async { Ok(()) })
            .await
            .unwrap();
        assert_eq!(next, RoomPhase::Round(TurnPhase::Act));
    }

    #[tokio::test]
    async fn checked_transition_rejects_stale_versions() {
        let room = Room::new(GameRules::survival());
        let stale = room.version().await;

        room.run_transition(RoomEvent::Start, || async { Ok(()) })
            .await
            .unwrap();

        let err = room
            .run_transition_checked(stale, RoomEvent::AdvanceTurn, || async { Ok(()) })
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidState(_)));
        assert_eq!(room.version().await, 1);
    }
}
