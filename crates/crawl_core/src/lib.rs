//! # Crawl Core
//!
//! Deterministic simulation core for a turn-based grid roguelike.
//!
//! This crate contains **only** simulation logic:
//! - No rendering
//! - No IO
//! - No system randomness (every stream is seeded)
//! - No floating-point math (uses fixed-point)
//!
//! This separation enables:
//! - Headless runs and batch validation
//! - Determinism testing
//! - Driving the turn loop from tests without a render loop
//!
//! ## Crate Structure
//!
//! - [`board`] - Procedural level layout
//! - [`occupancy`] - Cell reservation used during generation
//! - [`motion`] - Move attempts and position interpolation
//! - [`collision`] - Collision query contract and a grid implementation
//! - [`turn`] - Player/enemy turn state machine
//! - [`session`] - Level setup and the per-frame driver
//! - [`math`] - Fixed-point math utilities

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod actors;
pub mod board;
pub mod collision;
pub mod error;
pub mod grid;
pub mod math;
pub mod motion;
pub mod occupancy;
pub mod session;
pub mod turn;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::actors::{ActorId, ActorKind, ActorStore, MobileActor};
    pub use crate::board::{
        enemy_count, generate_board, BoardConfig, BoardGenerator, CountRange, EntityKind,
        EntityPlacement, GeneratedBoard, TileSet,
    };
    pub use crate::collision::{
        BlockingEntity, BlockingKind, CollisionLayer, CollisionQuery, GridCollisionWorld,
    };
    pub use crate::error::{GameError, Result};
    pub use crate::grid::{Cell, Direction};
    pub use crate::math::{Fixed, Vec2Fixed};
    pub use crate::motion::{attempt_move, MoveOutcome};
    pub use crate::session::{GameSession, SessionConfig, SessionEvents};
    pub use crate::turn::{EnemyPlanner, TurnConfig, TurnEvents, TurnScheduler, TurnState};
}
