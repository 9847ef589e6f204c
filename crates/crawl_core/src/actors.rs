//! Mobile actors and their storage.
//!
//! Actors are owned by an [`ActorStore`]. Everything else (the turn
//! scheduler's enemy registry in particular) refers to them by [`ActorId`]
//! and must cope with ids that no longer resolve.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::collision::ColliderId;
use crate::grid::Cell;
use crate::math::{Fixed, Vec2Fixed};

/// Unique identifier for actors.
pub type ActorId = u32;

/// Who controls an actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActorKind {
    /// Driven by player input.
    Player,
    /// Driven by an enemy planner during enemy turns.
    Enemy,
}

/// An actor that moves one cell at a time with smooth interpolation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MobileActor {
    /// Unique identifier.
    pub id: ActorId,
    /// Controller.
    pub kind: ActorKind,
    /// Displayed position. Grid-aligned whenever no motion is in flight.
    pub position: Vec2Fixed,
    /// Seconds taken to cross one cell.
    #[serde(with = "crate::math::fixed_serde")]
    pub move_duration: Fixed,
    /// The actor's own collider in the collision world.
    pub collider: ColliderId,
    /// Destination of the in-flight move, if any.
    target: Option<Vec2Fixed>,
}

impl MobileActor {
    /// Create an actor at rest on `cell`.
    #[must_use]
    pub fn new(kind: ActorKind, cell: Cell, move_duration: Fixed, collider: ColliderId) -> Self {
        Self {
            id: 0,
            kind,
            position: cell.to_world(),
            move_duration,
            collider,
            target: None,
        }
    }

    /// Cell nearest the displayed position.
    #[must_use]
    pub fn cell(&self) -> Cell {
        Cell::from_world(self.position)
    }

    /// Position the actor is committed to: the move target while moving,
    /// otherwise the current position.
    #[must_use]
    pub fn committed_position(&self) -> Vec2Fixed {
        self.target.unwrap_or(self.position)
    }

    /// Cell of [`committed_position`](Self::committed_position).
    #[must_use]
    pub fn committed_cell(&self) -> Cell {
        Cell::from_world(self.committed_position())
    }

    /// Whether a move is still interpolating.
    #[must_use]
    pub const fn is_moving(&self) -> bool {
        self.target.is_some()
    }

    /// Start interpolating toward `target`.
    pub(crate) fn begin_motion(&mut self, target: Vec2Fixed) {
        self.target = Some(target);
    }

    /// Advance in-flight motion by `dt` seconds.
    ///
    /// Speed is `1 / move_duration` cells per second. Returns `true` when
    /// the actor arrived during this call.
    pub fn advance(&mut self, dt: Fixed) -> bool {
        let Some(target) = self.target else {
            return false;
        };

        if self.move_duration <= Fixed::ZERO {
            self.settle();
            return true;
        }

        let step = dt / self.move_duration;
        self.position = self.position.move_towards(target, step);
        if self.position == target {
            self.target = None;
            return true;
        }
        false
    }

    /// Snap to the committed position, ending any in-flight motion.
    pub fn settle(&mut self) {
        if let Some(target) = self.target.take() {
            self.position = target;
        }
    }
}

/// Storage for all actors in a session.
///
/// Uses a `HashMap` for O(1) lookup by id, with deterministic iteration
/// via sorted ids.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActorStore {
    actors: HashMap<ActorId, MobileActor>,
    next_id: ActorId,
}

impl ActorStore {
    /// Create empty actor storage.
    #[must_use]
    pub fn new() -> Self {
        Self {
            actors: HashMap::new(),
            next_id: 1,
        }
    }

    /// Insert an actor and return its assigned id.
    pub fn insert(&mut self, mut actor: MobileActor) -> ActorId {
        let id = self.next_id.max(1);
        self.next_id = id + 1;
        actor.id = id;
        self.actors.insert(id, actor);
        id
    }

    /// Remove an actor by id.
    pub fn remove(&mut self, id: ActorId) -> Option<MobileActor> {
        self.actors.remove(&id)
    }

    /// Get an actor by id.
    #[must_use]
    pub fn get(&self, id: ActorId) -> Option<&MobileActor> {
        self.actors.get(&id)
    }

    /// Get a mutable reference to an actor by id.
    pub fn get_mut(&mut self, id: ActorId) -> Option<&mut MobileActor> {
        self.actors.get_mut(&id)
    }

    /// Check if an actor exists.
    #[must_use]
    pub fn contains(&self, id: ActorId) -> bool {
        self.actors.contains_key(&id)
    }

    /// Number of actors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.actors.len()
    }

    /// Check if storage is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }

    /// Sorted actor ids for deterministic iteration.
    #[must_use]
    pub fn sorted_ids(&self) -> Vec<ActorId> {
        let mut ids: Vec<_> = self.actors.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Sorted ids of actors of one kind.
    #[must_use]
    pub fn ids_of(&self, kind: ActorKind) -> Vec<ActorId> {
        let mut ids: Vec<_> = self
            .actors
            .values()
            .filter(|a| a.kind == kind)
            .map(|a| a.id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Actor whose committed position is `cell`, lowest id first.
    #[must_use]
    pub fn actor_at(&self, cell: Cell) -> Option<&MobileActor> {
        self.sorted_ids()
            .into_iter()
            .filter_map(|id| self.actors.get(&id))
            .find(|a| a.committed_cell() == cell)
    }

    /// Whether any actor is mid-interpolation.
    #[must_use]
    pub fn any_moving(&self) -> bool {
        self.actors.values().any(MobileActor::is_moving)
    }

    /// Snap every actor to its committed position.
    pub fn settle_all(&mut self) {
        for actor in self.actors.values_mut() {
            actor.settle();
        }
    }
}
