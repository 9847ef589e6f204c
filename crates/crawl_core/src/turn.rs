//! Player/enemy turn alternation.
//!
//! [`TurnScheduler`] is an explicit state machine advanced by
//! [`TurnScheduler::tick`] once per frame. The two suspension points of a
//! turn (the level intro and the wait after each enemy move) are carried
//! between ticks as remaining time, so the scheduler can be inspected and
//! driven from tests without a render loop.
//!
//! # Turn shape
//!
//! ```text
//! SetupOrTransition --(intro elapsed / finish_setup)--> PlayerTurn
//! PlayerTurn --(player move attempted)--> EnemyTurnRunning
//! EnemyTurnRunning --(every enemy attempted, waits elapsed)--> PlayerTurn
//! any --(restart)--> SetupOrTransition
//! ```

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::actors::{ActorId, ActorStore, MobileActor};
use crate::collision::CollisionQuery;
use crate::error::{GameError, Result};
use crate::math::{millis_to_seconds, Fixed};
use crate::motion::{attempt_move, MoveOutcome};

/// Which side may act.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TurnState {
    /// Level intro or transition; nobody acts.
    SetupOrTransition,
    /// Waiting for exactly one player move.
    PlayerTurn,
    /// Enemies are taking their moves one at a time.
    EnemyTurnRunning,
}

/// Timing knobs for the scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnConfig {
    /// Wait before handing control back when no enemies are registered.
    pub turn_delay_ms: u32,
    /// Length of the level intro. `None` waits for [`TurnScheduler::finish_setup`].
    pub level_start_delay_ms: Option<u32>,
}

impl Default for TurnConfig {
    fn default() -> Self {
        Self {
            turn_delay_ms: 100,
            level_start_delay_ms: Some(2000),
        }
    }
}

impl TurnConfig {
    /// Set the empty-registry delay.
    #[must_use]
    pub const fn with_turn_delay_ms(mut self, ms: u32) -> Self {
        self.turn_delay_ms = ms;
        self
    }

    /// Set the level intro length.
    #[must_use]
    pub const fn with_level_start_delay_ms(mut self, ms: Option<u32>) -> Self {
        self.level_start_delay_ms = ms;
        self
    }

    /// Empty-registry delay in seconds.
    #[must_use]
    pub fn turn_delay(&self) -> Fixed {
        millis_to_seconds(self.turn_delay_ms)
    }

    /// Level intro length in seconds.
    #[must_use]
    pub fn level_start_delay(&self) -> Option<Fixed> {
        self.level_start_delay_ms.map(millis_to_seconds)
    }

    /// Check the timings.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidConfig`] for a zero turn delay, which
    /// would let an empty enemy phase end in the same tick it started.
    pub fn validate(&self) -> Result<()> {
        if self.turn_delay_ms == 0 {
            return Err(GameError::InvalidConfig(
                "turn_delay_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Chooses each enemy's step during an enemy phase.
///
/// The returned pair is passed straight to [`attempt_move`]; a pair that is
/// not a unit step counts as the enemy's attempt and is reported in
/// [`TurnEvents::rejected`].
pub trait EnemyPlanner {
    /// Direction for `enemy` given every actor's current state.
    fn plan_move(&mut self, enemy: &MobileActor, actors: &ActorStore) -> (i32, i32);
}

impl<F> EnemyPlanner for F
where
    F: FnMut(&MobileActor, &ActorStore) -> (i32, i32),
{
    fn plan_move(&mut self, enemy: &MobileActor, actors: &ActorStore) -> (i32, i32) {
        self(enemy, actors)
    }
}

/// A change of [`TurnState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateTransition {
    /// State left.
    pub from: TurnState,
    /// State entered.
    pub to: TurnState,
}

/// One enemy move attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnemyMove {
    /// Enemy that acted.
    pub enemy: ActorId,
    /// What happened.
    pub outcome: MoveOutcome,
}

/// Events generated during a scheduler tick.
///
/// Callers use `BlockedBy` outcomes to trigger interactions (attacks,
/// pickups) that live outside the core.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TurnEvents {
    /// State changes, in order.
    pub transitions: Vec<StateTransition>,
    /// Enemy attempts, in registry order.
    pub enemy_moves: Vec<EnemyMove>,
    /// Snapshot entries whose actor no longer exists.
    pub skipped: Vec<ActorId>,
    /// Enemies whose planned direction was not a unit step.
    pub rejected: Vec<ActorId>,
}

impl TurnEvents {
    /// Whether nothing happened.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
            && self.enemy_moves.is_empty()
            && self.skipped.is_empty()
            && self.rejected.is_empty()
    }
}

/// Progress through one enemy phase.
#[derive(Debug, Clone)]
struct EnemyBatch {
    /// Registry snapshot still to act.
    queue: VecDeque<ActorId>,
    /// Time left before the next enemy may act.
    wait: Fixed,
}

/// The turn state machine.
#[derive(Debug, Clone)]
pub struct TurnScheduler {
    config: TurnConfig,
    state: TurnState,
    /// Enemy move order. Holds ids only; actors live in an [`ActorStore`].
    registry: Vec<ActorId>,
    batch: Option<EnemyBatch>,
    setup_remaining: Option<Fixed>,
    session_over: bool,
    turn: u64,
}

impl TurnScheduler {
    /// Create a scheduler in [`TurnState::SetupOrTransition`].
    #[must_use]
    pub fn new(config: TurnConfig) -> Self {
        let setup_remaining = config.level_start_delay();
        Self {
            config,
            state: TurnState::SetupOrTransition,
            registry: Vec::new(),
            batch: None,
            setup_remaining,
            session_over: false,
            turn: 0,
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> TurnState {
        self.state
    }

    /// Number of player moves accepted so far.
    #[must_use]
    pub const fn turn(&self) -> u64 {
        self.turn
    }

    /// Timing configuration.
    #[must_use]
    pub const fn config(&self) -> &TurnConfig {
        &self.config
    }

    /// Registered enemies in move order.
    #[must_use]
    pub fn registry(&self) -> &[ActorId] {
        &self.registry
    }

    /// Enemies still waiting to act in the running phase.
    #[must_use]
    pub fn pending_enemies(&self) -> usize {
        self.batch.as_ref().map_or(0, |b| b.queue.len())
    }

    /// Append an enemy to the move order. Duplicates are ignored.
    pub fn register_enemy(&mut self, id: ActorId) {
        if !self.registry.contains(&id) {
            self.registry.push(id);
        }
    }

    /// Remove an enemy from the move order.
    ///
    /// A running phase keeps its snapshot; if the actor is also despawned
    /// its queued entry is skipped.
    pub fn unregister_enemy(&mut self, id: ActorId) -> bool {
        let before = self.registry.len();
        self.registry.retain(|e| *e != id);
        self.registry.len() != before
    }

    /// Forget every registered enemy.
    pub fn clear_registry(&mut self) {
        self.registry.clear();
    }

    /// End the level intro now.
    ///
    /// Returns the transition, or `None` outside
    /// [`TurnState::SetupOrTransition`].
    pub fn finish_setup(&mut self) -> Option<StateTransition> {
        if self.state != TurnState::SetupOrTransition {
            return None;
        }
        self.setup_remaining = None;
        Some(self.enter(TurnState::PlayerTurn))
    }

    /// Abort whatever is running and go back to
    /// [`TurnState::SetupOrTransition`].
    ///
    /// Queued enemy moves are dropped and every actor is snapped to its
    /// committed position.
    pub fn restart(&mut self, actors: &mut ActorStore) {
        if let Some(batch) = self.batch.take() {
            debug!(dropped = batch.queue.len(), "Enemy phase cancelled");
        }
        actors.settle_all();
        self.setup_remaining = self.config.level_start_delay();
        if self.state != TurnState::SetupOrTransition {
            self.enter(TurnState::SetupOrTransition);
        }
    }

    /// Stop accepting player moves. State is left as is.
    pub fn end_session(&mut self) {
        self.session_over = true;
    }

    /// Accept player moves again after [`end_session`](Self::end_session).
    pub fn clear_session_over(&mut self) {
        self.session_over = false;
    }

    /// Whether the session has ended.
    #[must_use]
    pub const fn is_session_over(&self) -> bool {
        self.session_over
    }

    /// Play the player's move for this turn.
    ///
    /// Any attempt that reaches the collision query ends the player's turn,
    /// whether it moved or was blocked.
    ///
    /// # Errors
    ///
    /// - [`GameError::SessionOver`] after [`end_session`](Self::end_session).
    /// - [`GameError::InputRejected`] outside [`TurnState::PlayerTurn`].
    /// - [`GameError::InvalidDirection`] for a non-unit step; the turn is not
    ///   consumed.
    pub fn submit_player_move<Q>(
        &mut self,
        player: &mut MobileActor,
        dx: i32,
        dy: i32,
        world: &mut Q,
    ) -> Result<MoveOutcome>
    where
        Q: CollisionQuery + ?Sized,
    {
        if self.session_over {
            return Err(GameError::SessionOver);
        }
        if self.state != TurnState::PlayerTurn {
            return Err(GameError::InputRejected { state: self.state });
        }

        let outcome = attempt_move(player, dx, dy, world)?;

        let wait = if self.registry.is_empty() {
            self.config.turn_delay()
        } else {
            Fixed::ZERO
        };
        self.batch = Some(EnemyBatch {
            queue: self.registry.iter().copied().collect(),
            wait,
        });
        self.turn += 1;
        self.enter(TurnState::EnemyTurnRunning);
        Ok(outcome)
    }

    /// Advance the scheduler by `dt` seconds.
    ///
    /// During an enemy phase, enemies act in snapshot order whenever the
    /// pending wait has run out; each attempt adds that enemy's
    /// `move_duration` to the wait. Several enemies may act in one tick if
    /// `dt` is large.
    pub fn tick<Q, P>(
        &mut self,
        dt: Fixed,
        actors: &mut ActorStore,
        world: &mut Q,
        planner: &mut P,
    ) -> TurnEvents
    where
        Q: CollisionQuery + ?Sized,
        P: EnemyPlanner + ?Sized,
    {
        let mut events = TurnEvents::default();
        match self.state {
            TurnState::SetupOrTransition => self.tick_setup(dt, &mut events),
            TurnState::EnemyTurnRunning => {
                self.tick_enemies(dt, actors, world, planner, &mut events);
            }
            TurnState::PlayerTurn => {}
        }
        events
    }

    fn tick_setup(&mut self, dt: Fixed, events: &mut TurnEvents) {
        let Some(remaining) = self.setup_remaining.as_mut() else {
            return;
        };
        *remaining -= dt;
        if *remaining <= Fixed::ZERO {
            self.setup_remaining = None;
            events.transitions.push(self.enter(TurnState::PlayerTurn));
        }
    }

    fn tick_enemies<Q, P>(
        &mut self,
        dt: Fixed,
        actors: &mut ActorStore,
        world: &mut Q,
        planner: &mut P,
        events: &mut TurnEvents,
    ) where
        Q: CollisionQuery + ?Sized,
        P: EnemyPlanner + ?Sized,
    {
        let Some(batch) = self.batch.as_mut() else {
            // Nothing queued; hand control back.
            events.transitions.push(self.enter(TurnState::PlayerTurn));
            return;
        };

        batch.wait -= dt;
        while batch.wait <= Fixed::ZERO {
            let Some(id) = batch.queue.pop_front() else {
                self.batch = None;
                events.transitions.push(self.enter(TurnState::PlayerTurn));
                return;
            };

            let Some(enemy) = actors.get(id).cloned() else {
                warn!(error = %GameError::RegistryInconsistency(id), "Skipping enemy");
                events.skipped.push(id);
                continue;
            };

            let (dx, dy) = planner.plan_move(&enemy, actors);
            let Some(actor) = actors.get_mut(id) else {
                continue;
            };
            match attempt_move(actor, dx, dy, world) {
                Ok(outcome) => events.enemy_moves.push(EnemyMove { enemy: id, outcome }),
                Err(err) => {
                    warn!(enemy = id, error = %err, "Enemy move rejected");
                    events.rejected.push(id);
                }
            }
            batch.wait += enemy.move_duration;
        }
    }

    fn enter(&mut self, to: TurnState) -> StateTransition {
        let from = self.state;
        self.state = to;
        debug!(?from, ?to, turn = self.turn, "Turn state changed");
        StateTransition { from, to }
    }
}
