//! Collision queries used by grid motion.
//!
//! The core only needs one question answered: "what is the first blocking
//! thing between these two points?" [`CollisionQuery`] is that contract.
//! [`GridCollisionWorld`] is a cell-based implementation good enough for
//! headless play and tests; an engine integration can supply its own.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::board::{EntityKind, GeneratedBoard};
use crate::grid::Cell;
use crate::math::Vec2Fixed;

/// Collider identifier.
pub type ColliderId = u32;

/// Category a collider belongs to. Move line-casts only look at [`CollisionLayer::Blocking`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CollisionLayer {
    /// Stops movement.
    Blocking,
    /// Overlap-only (pickups, exit).
    Trigger,
}

/// Closed set of things a line-cast can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockingKind {
    /// Boundary wall.
    OuterWall,
    /// Destructible obstacle.
    Wall,
    /// Collectible.
    Food,
    /// Enemy actor.
    Enemy,
    /// The player.
    Player,
    /// Level exit.
    Exit,
}

impl BlockingKind {
    /// Layer a collider of this kind sits on by default.
    #[must_use]
    pub const fn default_layer(self) -> CollisionLayer {
        match self {
            Self::OuterWall | Self::Wall | Self::Enemy | Self::Player => CollisionLayer::Blocking,
            Self::Food | Self::Exit => CollisionLayer::Trigger,
        }
    }

    /// Collider kind for a board placement, if the placement has one.
    #[must_use]
    pub const fn from_entity(kind: EntityKind) -> Option<Self> {
        match kind {
            EntityKind::Floor => None,
            EntityKind::OuterWall => Some(Self::OuterWall),
            EntityKind::InnerWall => Some(Self::Wall),
            EntityKind::Food => Some(Self::Food),
            EntityKind::Enemy => Some(Self::Enemy),
            EntityKind::Exit => Some(Self::Exit),
        }
    }
}

/// The obstruction reported by a line-cast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockingEntity {
    /// Collider that was hit.
    pub collider: ColliderId,
    /// What it is.
    pub kind: BlockingKind,
    /// Where it is.
    pub cell: Cell,
}

/// Collision collaborator consulted by [`crate::motion::attempt_move`].
pub trait CollisionQuery {
    /// Nearest enabled collider on `layer` along the segment `start → end`.
    fn linecast(&self, start: Vec2Fixed, end: Vec2Fixed, layer: CollisionLayer)
        -> Option<BlockingEntity>;

    /// Enable or disable a collider for subsequent queries.
    fn set_collider_enabled(&mut self, collider: ColliderId, enabled: bool);

    /// A collider's owner committed a move to `to`.
    fn collider_moved(&mut self, _collider: ColliderId, _to: Cell) {}
}

/// Disables a collider for the guard's lifetime.
pub(crate) struct ColliderGuard<'a, Q: CollisionQuery + ?Sized> {
    world: &'a mut Q,
    collider: ColliderId,
}

impl<'a, Q: CollisionQuery + ?Sized> ColliderGuard<'a, Q> {
    pub(crate) fn disable(world: &'a mut Q, collider: ColliderId) -> Self {
        world.set_collider_enabled(collider, false);
        Self { world, collider }
    }

    pub(crate) fn linecast(
        &self,
        start: Vec2Fixed,
        end: Vec2Fixed,
        layer: CollisionLayer,
    ) -> Option<BlockingEntity> {
        self.world.linecast(start, end, layer)
    }
}

impl<Q: CollisionQuery + ?Sized> Drop for ColliderGuard<'_, Q> {
    fn drop(&mut self) {
        self.world.set_collider_enabled(self.collider, true);
    }
}

/// A collider in a [`GridCollisionWorld`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collider {
    /// Identifier.
    pub id: ColliderId,
    /// What it represents.
    pub kind: BlockingKind,
    /// Layer it answers on.
    pub layer: CollisionLayer,
    /// Occupied cell.
    pub cell: Cell,
    /// Disabled colliders are ignored by queries.
    pub enabled: bool,
}

/// Cell-based collision world.
///
/// Every collider occupies exactly one cell. Line-casts walk the cells
/// between the endpoints and return the first enabled collider on the
/// requested layer, lowest id first within a cell.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GridCollisionWorld {
    colliders: BTreeMap<ColliderId, Collider>,
    next_id: ColliderId,
}

impl GridCollisionWorld {
    /// Create an empty world.
    #[must_use]
    pub fn new() -> Self {
        Self {
            colliders: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Build colliders for every static placement on a board.
    ///
    /// Enemies are skipped: their colliders belong to the spawned actors.
    #[must_use]
    pub fn from_board(board: &GeneratedBoard) -> Self {
        let mut world = Self::new();
        for placement in &board.placements {
            if placement.kind == EntityKind::Enemy {
                continue;
            }
            if let Some(kind) = BlockingKind::from_entity(placement.kind) {
                world.add_collider(kind, placement.cell);
            }
        }
        world
    }

    /// Add a collider on its kind's default layer.
    pub fn add_collider(&mut self, kind: BlockingKind, cell: Cell) -> ColliderId {
        self.add_collider_on(kind, kind.default_layer(), cell)
    }

    /// Add a collider on an explicit layer.
    pub fn add_collider_on(
        &mut self,
        kind: BlockingKind,
        layer: CollisionLayer,
        cell: Cell,
    ) -> ColliderId {
        let id = self.next_id.max(1);
        self.next_id = id + 1;
        self.colliders.insert(
            id,
            Collider {
                id,
                kind,
                layer,
                cell,
                enabled: true,
            },
        );
        id
    }

    /// Remove a collider (defeated enemy, collected food).
    pub fn remove_collider(&mut self, id: ColliderId) -> Option<Collider> {
        self.colliders.remove(&id)
    }

    /// Look up a collider.
    #[must_use]
    pub fn get(&self, id: ColliderId) -> Option<&Collider> {
        self.colliders.get(&id)
    }

    /// Number of colliders.
    #[must_use]
    pub fn len(&self) -> usize {
        self.colliders.len()
    }

    /// Whether the world has no colliders.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.colliders.is_empty()
    }

    /// Colliders occupying `cell`, in id order.
    pub fn colliders_at(&self, cell: Cell) -> impl Iterator<Item = &Collider> {
        self.colliders.values().filter(move |c| c.cell == cell)
    }

    /// First enabled collider on `layer` at `cell`.
    #[must_use]
    pub fn first_at(&self, cell: Cell, layer: CollisionLayer) -> Option<&Collider> {
        self.colliders_at(cell)
            .find(|c| c.enabled && c.layer == layer)
    }

    /// Cells crossed by the segment between two cells, both ends included.
    #[must_use]
    pub fn segment_cells(from: Cell, to: Cell) -> Vec<Cell> {
        let mut cells = Vec::new();
        let (mut x, mut y) = (from.x, from.y);
        let dx = (to.x - from.x).abs();
        let dy = -(to.y - from.y).abs();
        let sx = if from.x < to.x { 1 } else { -1 };
        let sy = if from.y < to.y { 1 } else { -1 };
        let mut err = dx + dy;

        loop {
            cells.push(Cell::new(x, y));
            if x == to.x && y == to.y {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
        cells
    }
}

impl CollisionQuery for GridCollisionWorld {
    fn linecast(
        &self,
        start: Vec2Fixed,
        end: Vec2Fixed,
        layer: CollisionLayer,
    ) -> Option<BlockingEntity> {
        Self::segment_cells(Cell::from_world(start), Cell::from_world(end))
            .into_iter()
            .find_map(|cell| self.first_at(cell, layer))
            .map(|c| BlockingEntity {
                collider: c.id,
                kind: c.kind,
                cell: c.cell,
            })
    }

    fn set_collider_enabled(&mut self, collider: ColliderId, enabled: bool) {
        if let Some(c) = self.colliders.get_mut(&collider) {
            c.enabled = enabled;
        }
    }

    fn collider_moved(&mut self, collider: ColliderId, to: Cell) {
        if let Some(c) = self.colliders.get_mut(&collider) {
            c.cell = to;
        }
    }
}
