//! Grid motion shared by every mobile actor.
//!
//! A move attempt validates the step, asks the collision collaborator
//! whether anything blocks the way (with the mover's own collider switched
//! off), and either starts interpolation or reports the obstruction.
//! Interpolation itself is advanced once per frame by
//! [`interpolation_system`].

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::actors::{ActorId, ActorStore, MobileActor};
use crate::collision::{BlockingEntity, ColliderGuard, CollisionLayer, CollisionQuery};
use crate::error::Result;
use crate::grid::{Cell, Direction};
use crate::math::Fixed;

/// Result of a validated move attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoveOutcome {
    /// Nothing in the way; interpolation has started.
    Moved,
    /// The step is obstructed. The actor did not move.
    BlockedBy(BlockingEntity),
}

impl MoveOutcome {
    /// Whether the actor started moving.
    #[must_use]
    pub const fn is_moved(&self) -> bool {
        matches!(self, Self::Moved)
    }

    /// The obstruction, if any.
    #[must_use]
    pub const fn blocker(&self) -> Option<&BlockingEntity> {
        match self {
            Self::Moved => None,
            Self::BlockedBy(entity) => Some(entity),
        }
    }
}

/// Try to move `actor` one step by `(dx, dy)`.
///
/// Any in-flight motion is settled first so the step starts from a grid
/// cell. On success the collision world is told about the new cell
/// immediately, so later attempts in the same tick see it as occupied.
///
/// # Errors
///
/// Returns [`crate::error::GameError::InvalidDirection`] if `(dx, dy)` is not
/// a unit step. The actor is untouched and no query is issued.
pub fn attempt_move<Q>(
    actor: &mut MobileActor,
    dx: i32,
    dy: i32,
    world: &mut Q,
) -> Result<MoveOutcome>
where
    Q: CollisionQuery + ?Sized,
{
    let direction = Direction::new(dx, dy)?;
    actor.settle();

    let start = actor.position;
    let end = start + direction.to_vec();

    let hit = {
        let guard = ColliderGuard::disable(world, actor.collider);
        guard.linecast(start, end, CollisionLayer::Blocking)
    };

    match hit {
        None => {
            actor.begin_motion(end);
            world.collider_moved(actor.collider, Cell::from_world(end));
            debug!(actor = actor.id, to = %Cell::from_world(end), "Move started");
            Ok(MoveOutcome::Moved)
        }
        Some(blocker) => {
            debug!(
                actor = actor.id,
                blocker = ?blocker.kind,
                at = %blocker.cell,
                "Move blocked"
            );
            Ok(MoveOutcome::BlockedBy(blocker))
        }
    }
}

/// Advance interpolation for every actor by `dt` seconds.
///
/// Returns the ids of actors that reached their destination this frame,
/// in id order.
pub fn interpolation_system(actors: &mut ActorStore, dt: Fixed) -> Vec<ActorId> {
    let mut arrived = Vec::new();
    for id in actors.sorted_ids() {
        if let Some(actor) = actors.get_mut(id) {
            if actor.advance(dt) {
                arrived.push(id);
            }
        }
    }
    arrived
}
