//! Game session orchestration.
//!
//! A [`GameSession`] owns everything one play-through needs: the seeded
//! board generator, the current board, actors, the collision world and the
//! turn scheduler. Sessions are plain values, so any number can coexist
//! (tests and batch runs create thousands).
//!
//! # Level setup
//!
//! Starting a level generates the board, builds a fresh collision world,
//! spawns the player at `(0, 0)` and one enemy per enemy placement, and
//! registers the enemies with the scheduler in placement order. The new
//! level is assembled off to the side and only swapped in once generation
//! succeeded, so a failed attempt leaves the previous level playable.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::actors::{ActorId, ActorKind, ActorStore, MobileActor};
use crate::board::{BoardConfig, BoardGenerator, EntityKind, GeneratedBoard};
use crate::collision::{BlockingKind, CollisionLayer, GridCollisionWorld};
use crate::error::{GameError, Result};
use crate::grid::Cell;
use crate::math::{millis_to_seconds, Fixed};
use crate::motion::{interpolation_system, MoveOutcome};
use crate::turn::{EnemyPlanner, StateTransition, TurnConfig, TurnEvents, TurnScheduler, TurnState};

/// Where the player appears on every level.
pub const PLAYER_SPAWN: Cell = Cell::new(0, 0);

/// Everything needed to start a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Board generation settings.
    pub board: BoardConfig,
    /// Scheduler timings.
    pub turn: TurnConfig,
    /// Time for the player to cross one cell.
    pub player_move_duration_ms: u32,
    /// Time for an enemy to cross one cell.
    pub enemy_move_duration_ms: u32,
    /// Seed for the session's random stream.
    pub seed: u64,
    /// First level number.
    pub start_level: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            board: BoardConfig::default(),
            turn: TurnConfig::default(),
            player_move_duration_ms: 100,
            enemy_move_duration_ms: 100,
            seed: 0,
            start_level: 1,
        }
    }
}

impl SessionConfig {
    /// Set the seed.
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the board settings.
    #[must_use]
    pub fn with_board(mut self, board: BoardConfig) -> Self {
        self.board = board;
        self
    }

    /// Set the scheduler timings.
    #[must_use]
    pub const fn with_turn(mut self, turn: TurnConfig) -> Self {
        self.turn = turn;
        self
    }

    /// Set the first level.
    #[must_use]
    pub const fn with_start_level(mut self, level: u32) -> Self {
        self.start_level = level;
        self
    }

    /// Set both move durations.
    #[must_use]
    pub const fn with_move_durations_ms(mut self, player: u32, enemy: u32) -> Self {
        self.player_move_duration_ms = player;
        self.enemy_move_duration_ms = enemy;
        self
    }

    /// Player move duration in seconds.
    #[must_use]
    pub fn player_move_duration(&self) -> Fixed {
        millis_to_seconds(self.player_move_duration_ms)
    }

    /// Enemy move duration in seconds.
    #[must_use]
    pub fn enemy_move_duration(&self) -> Fixed {
        millis_to_seconds(self.enemy_move_duration_ms)
    }

    /// Check every nested setting.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidConfig`] or [`GameError::EmptyTileSet`].
    pub fn validate(&self) -> Result<()> {
        self.board.validate()?;
        self.turn.validate()?;
        if self.start_level == 0 {
            return Err(GameError::InvalidConfig(
                "start_level must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Events generated during a session tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionEvents {
    /// Actors that finished interpolating this tick.
    pub arrived: Vec<ActorId>,
    /// Scheduler output.
    pub turn: TurnEvents,
}

/// A level assembled but not yet installed.
struct LevelSetup {
    board: GeneratedBoard,
    actors: ActorStore,
    world: GridCollisionWorld,
    player: ActorId,
    enemies: Vec<ActorId>,
}

/// One play-through.
#[derive(Debug, Clone)]
pub struct GameSession {
    config: SessionConfig,
    generator: BoardGenerator,
    level: u32,
    board: GeneratedBoard,
    actors: ActorStore,
    world: GridCollisionWorld,
    scheduler: TurnScheduler,
    player: ActorId,
    paused: bool,
    frame: u64,
}

impl GameSession {
    /// Validate `config` and start its first level.
    ///
    /// # Errors
    ///
    /// Configuration errors, or [`GameError::InsufficientSpace`] if the
    /// first level cannot be generated.
    pub fn new(config: SessionConfig) -> Result<Self> {
        config.validate()?;

        let mut generator = BoardGenerator::new(config.seed);
        let level = config.start_level;
        let setup = build_level(&mut generator, &config, level)?;

        let mut scheduler = TurnScheduler::new(config.turn.clone());
        for id in &setup.enemies {
            scheduler.register_enemy(*id);
        }

        info!(level, seed = config.seed, enemies = setup.enemies.len(), "Session started");

        Ok(Self {
            config,
            generator,
            level,
            board: setup.board,
            actors: setup.actors,
            world: setup.world,
            scheduler,
            player: setup.player,
            paused: false,
            frame: 0,
        })
    }

    /// Generate `level` and make it current.
    ///
    /// The scheduler returns to [`TurnState::SetupOrTransition`] with a
    /// fresh enemy registry.
    ///
    /// # Errors
    ///
    /// Generation errors. The current level is left untouched.
    pub fn start_level(&mut self, level: u32) -> Result<()> {
        let setup = build_level(&mut self.generator, &self.config, level)?;

        self.scheduler.restart(&mut self.actors);
        self.scheduler.clear_registry();
        for id in &setup.enemies {
            self.scheduler.register_enemy(*id);
        }

        self.level = level;
        self.board = setup.board;
        self.actors = setup.actors;
        self.world = setup.world;
        self.player = setup.player;

        info!(level, enemies = setup.enemies.len(), "Level started");
        Ok(())
    }

    /// Move on to the next level.
    ///
    /// # Errors
    ///
    /// Same as [`start_level`](Self::start_level).
    pub fn advance_level(&mut self) -> Result<()> {
        self.start_level(self.level.saturating_add(1))
    }

    /// Regenerate the current level.
    ///
    /// # Errors
    ///
    /// Same as [`start_level`](Self::start_level).
    pub fn restart(&mut self) -> Result<()> {
        self.start_level(self.level)
    }

    /// Go back to the configured first level and accept input again.
    ///
    /// # Errors
    ///
    /// Same as [`start_level`](Self::start_level).
    pub fn return_to_start(&mut self) -> Result<()> {
        self.start_level(self.config.start_level)?;
        self.scheduler.clear_session_over();
        Ok(())
    }

    /// Freeze interpolation and turn timers.
    pub fn pause(&mut self) {
        self.paused = true;
    }

    /// Unfreeze after [`pause`](Self::pause).
    pub fn resume(&mut self) {
        self.paused = false;
    }

    /// Whether the session is paused.
    #[must_use]
    pub const fn is_paused(&self) -> bool {
        self.paused
    }

    /// Advance the session by `dt` seconds.
    ///
    /// Interpolation runs first, then the scheduler. Nothing happens while
    /// paused.
    pub fn tick<P>(&mut self, dt: Fixed, planner: &mut P) -> SessionEvents
    where
        P: EnemyPlanner + ?Sized,
    {
        if self.paused {
            return SessionEvents::default();
        }
        self.frame += 1;

        let arrived = interpolation_system(&mut self.actors, dt);
        let turn = self
            .scheduler
            .tick(dt, &mut self.actors, &mut self.world, planner);
        SessionEvents { arrived, turn }
    }

    /// Submit the player's move for this turn.
    ///
    /// # Errors
    ///
    /// [`GameError::SessionPaused`] while paused, otherwise whatever
    /// [`TurnScheduler::submit_player_move`] reports.
    pub fn player_move(&mut self, dx: i32, dy: i32) -> Result<MoveOutcome> {
        if self.paused {
            return Err(GameError::SessionPaused);
        }
        let player = self
            .actors
            .get_mut(self.player)
            .ok_or(GameError::ActorNotFound(self.player))?;
        self.scheduler
            .submit_player_move(player, dx, dy, &mut self.world)
    }

    /// Skip the rest of the level intro.
    pub fn finish_setup(&mut self) -> Option<StateTransition> {
        self.scheduler.finish_setup()
    }

    /// Stop accepting player moves.
    pub fn end_session(&mut self) {
        info!(level = self.level, turn = self.scheduler.turn(), "Session over");
        self.scheduler.end_session();
    }

    /// Whether the session has ended.
    #[must_use]
    pub const fn is_session_over(&self) -> bool {
        self.scheduler.is_session_over()
    }

    /// Remove a defeated enemy: its registry entry, collider and actor.
    ///
    /// # Errors
    ///
    /// [`GameError::ActorNotFound`] if `id` is not a live enemy.
    pub fn remove_enemy(&mut self, id: ActorId) -> Result<MobileActor> {
        match self.actors.get(id) {
            Some(actor) if actor.kind == ActorKind::Enemy => {}
            _ => return Err(GameError::ActorNotFound(id)),
        }
        self.scheduler.unregister_enemy(id);
        let actor = self.actors.remove(id).ok_or(GameError::ActorNotFound(id))?;
        self.world.remove_collider(actor.collider);
        Ok(actor)
    }

    /// Remove the food trigger at `cell`. Returns whether one was there.
    pub fn collect_food_at(&mut self, cell: Cell) -> bool {
        let food = self
            .world
            .colliders_at(cell)
            .find(|c| c.kind == BlockingKind::Food && c.layer == CollisionLayer::Trigger)
            .map(|c| c.id);
        match food {
            Some(id) => self.world.remove_collider(id).is_some(),
            None => false,
        }
    }

    /// Current turn state.
    #[must_use]
    pub const fn state(&self) -> TurnState {
        self.scheduler.state()
    }

    /// Current level number.
    #[must_use]
    pub const fn level(&self) -> u32 {
        self.level
    }

    /// Frames ticked while unpaused.
    #[must_use]
    pub const fn frame(&self) -> u64 {
        self.frame
    }

    /// Session configuration.
    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Current board.
    #[must_use]
    pub const fn board(&self) -> &GeneratedBoard {
        &self.board
    }

    /// All actors.
    #[must_use]
    pub const fn actors(&self) -> &ActorStore {
        &self.actors
    }

    /// Collision world.
    #[must_use]
    pub const fn world(&self) -> &GridCollisionWorld {
        &self.world
    }

    /// Mutable collision world, for external interactions.
    pub fn world_mut(&mut self) -> &mut GridCollisionWorld {
        &mut self.world
    }

    /// Turn scheduler.
    #[must_use]
    pub const fn scheduler(&self) -> &TurnScheduler {
        &self.scheduler
    }

    /// Player actor id.
    #[must_use]
    pub const fn player(&self) -> ActorId {
        self.player
    }

    /// Cell the player is committed to.
    #[must_use]
    pub fn player_cell(&self) -> Option<Cell> {
        self.actors.get(self.player).map(MobileActor::committed_cell)
    }

    /// Whether the player is standing, at rest, on the exit.
    #[must_use]
    pub fn is_player_on_exit(&self) -> bool {
        self.actors
            .get(self.player)
            .is_some_and(|p| !p.is_moving() && p.cell() == self.board.exit_cell())
    }

    /// Compute a hash of the session state for determinism checks.
    ///
    /// Covers level, frame, turn state and counter, the board layout and
    /// every actor's position.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();

        self.level.hash(&mut hasher);
        self.frame.hash(&mut hasher);
        self.scheduler.state().hash(&mut hasher);
        self.scheduler.turn().hash(&mut hasher);

        self.board.placements.len().hash(&mut hasher);
        for placement in &self.board.placements {
            placement.hash(&mut hasher);
        }

        let ids = self.actors.sorted_ids();
        ids.len().hash(&mut hasher);
        for id in ids {
            if let Some(actor) = self.actors.get(id) {
                id.hash(&mut hasher);
                actor.position.x.to_bits().hash(&mut hasher);
                actor.position.y.to_bits().hash(&mut hasher);
                actor.committed_position().x.to_bits().hash(&mut hasher);
                actor.committed_position().y.to_bits().hash(&mut hasher);
            }
        }

        hasher.finish()
    }
}

fn build_level(
    generator: &mut BoardGenerator,
    config: &SessionConfig,
    level: u32,
) -> Result<LevelSetup> {
    let board = generator.generate(level, &config.board)?;
    let mut world = GridCollisionWorld::from_board(&board);
    let mut actors = ActorStore::new();

    let collider = world.add_collider(BlockingKind::Player, PLAYER_SPAWN);
    let player = actors.insert(MobileActor::new(
        ActorKind::Player,
        PLAYER_SPAWN,
        config.player_move_duration(),
        collider,
    ));

    let enemies = board
        .of_kind(EntityKind::Enemy)
        .map(|placement| {
            let collider = world.add_collider(BlockingKind::Enemy, placement.cell);
            actors.insert(MobileActor::new(
                ActorKind::Enemy,
                placement.cell,
                config.enemy_move_duration(),
                collider,
            ))
        })
        .collect();

    Ok(LevelSetup {
        board,
        actors,
        world,
        player,
        enemies,
    })
}
