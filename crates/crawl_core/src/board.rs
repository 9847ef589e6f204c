//! Procedural board generation.
//!
//! Produces the full layout for one level:
//! - A floor tile on every interior cell
//! - An outer wall on every cell of the one-cell boundary ring
//! - Inner walls, food and enemies drawn without replacement from a
//!   candidate set
//! - The exit in the top-right interior corner
//!
//! The candidate set keeps a 5-column margin on the left and a 1-cell
//! margin on the other three sides. The exit is placed without consulting
//! or reserving anything in the candidate set; overlap is not checked.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{GameError, Result};
use crate::grid::Cell;
use crate::occupancy::GridOccupancyMap;

/// Columns left of the candidate set (measured from the interior's left edge).
pub const LEFT_INSET: i32 = 5;

/// Cells kept free along the right, top and bottom edges.
pub const EDGE_INSET: i32 = 1;

/// Largest accepted board dimension.
pub const MAX_DIMENSION: u32 = 1024;

/// What a placement represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityKind {
    /// Walkable floor.
    Floor,
    /// Indestructible boundary wall.
    OuterWall,
    /// Obstacle inside the board.
    InnerWall,
    /// Collectible.
    Food,
    /// Enemy spawn.
    Enemy,
    /// Level exit.
    Exit,
}

impl EntityKind {
    /// All kinds, in emission order.
    pub const ALL: [Self; 6] = [
        Self::Floor,
        Self::OuterWall,
        Self::InnerWall,
        Self::Food,
        Self::Enemy,
        Self::Exit,
    ];

    /// Single-character glyph used by text renderers.
    #[must_use]
    pub const fn glyph(self) -> char {
        match self {
            Self::Floor => '.',
            Self::OuterWall => '#',
            Self::InnerWall => 'w',
            Self::Food => 'f',
            Self::Enemy => 'E',
            Self::Exit => 'X',
        }
    }
}

/// One placed tile. Immutable once emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityPlacement {
    /// What was placed.
    pub kind: EntityKind,
    /// Where it was placed.
    pub cell: Cell,
    /// Index into the kind's tile set.
    pub variant: u32,
}

/// Inclusive `[minimum, maximum]` bounds for a randomized count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountRange {
    /// Smallest count drawn.
    pub minimum: u32,
    /// Largest count drawn.
    pub maximum: u32,
}

impl CountRange {
    /// Create a range.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidConfig`] if `minimum > maximum`.
    pub fn new(minimum: u32, maximum: u32) -> Result<Self> {
        let range = Self { minimum, maximum };
        range.validate()?;
        Ok(range)
    }

    /// A range that always yields `count`.
    #[must_use]
    pub const fn exactly(count: u32) -> Self {
        Self {
            minimum: count,
            maximum: count,
        }
    }

    /// Check `minimum <= maximum`.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidConfig`] if the bounds are inverted.
    pub fn validate(&self) -> Result<()> {
        if self.minimum > self.maximum {
            return Err(GameError::InvalidConfig(format!(
                "count range minimum {} exceeds maximum {}",
                self.minimum, self.maximum
            )));
        }
        Ok(())
    }

    /// Whether `count` lies inside the range.
    #[must_use]
    pub const fn contains(&self, count: u32) -> bool {
        count >= self.minimum && count <= self.maximum
    }

    /// Draw a count uniformly from the range.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> u32 {
        rng.gen_range(self.minimum..=self.maximum)
    }
}

/// Number of interchangeable visual variants per entity kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileSet {
    /// Floor variants.
    pub floor: u32,
    /// Outer wall variants.
    pub outer_wall: u32,
    /// Inner wall variants.
    pub inner_wall: u32,
    /// Food variants.
    pub food: u32,
    /// Enemy variants.
    pub enemy: u32,
    /// Exit variants.
    pub exit: u32,
}

impl Default for TileSet {
    fn default() -> Self {
        Self {
            floor: 8,
            outer_wall: 3,
            inner_wall: 8,
            food: 2,
            enemy: 2,
            exit: 1,
        }
    }
}

impl TileSet {
    /// Every kind uses `count` variants.
    #[must_use]
    pub const fn uniform(count: u32) -> Self {
        Self {
            floor: count,
            outer_wall: count,
            inner_wall: count,
            food: count,
            enemy: count,
            exit: count,
        }
    }

    /// Variant count for a kind.
    #[must_use]
    pub const fn variants(&self, kind: EntityKind) -> u32 {
        match kind {
            EntityKind::Floor => self.floor,
            EntityKind::OuterWall => self.outer_wall,
            EntityKind::InnerWall => self.inner_wall,
            EntityKind::Food => self.food,
            EntityKind::Enemy => self.enemy,
            EntityKind::Exit => self.exit,
        }
    }

    /// Reject empty tile sets.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::EmptyTileSet`] for the first kind with zero variants.
    pub fn validate(&self) -> Result<()> {
        match EntityKind::ALL.into_iter().find(|k| self.variants(*k) == 0) {
            Some(kind) => Err(GameError::EmptyTileSet(kind)),
            None => Ok(()),
        }
    }

    fn pick<R: Rng + ?Sized>(&self, kind: EntityKind, rng: &mut R) -> u32 {
        rng.gen_range(0..self.variants(kind))
    }
}

/// Board configuration for procedural generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardConfig {
    /// Interior width in cells.
    pub columns: u32,
    /// Interior height in cells.
    pub rows: u32,
    /// How many inner walls to place.
    pub wall_count: CountRange,
    /// How many food items to place.
    pub food_count: CountRange,
    /// Variant counts per kind.
    #[serde(default)]
    pub tiles: TileSet,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            columns: 8,
            rows: 8,
            wall_count: CountRange {
                minimum: 2,
                maximum: 4,
            },
            food_count: CountRange {
                minimum: 1,
                maximum: 3,
            },
            tiles: TileSet::default(),
        }
    }
}

impl BoardConfig {
    /// Set the interior size.
    #[must_use]
    pub const fn with_size(mut self, columns: u32, rows: u32) -> Self {
        self.columns = columns;
        self.rows = rows;
        self
    }

    /// Set the inner wall count range.
    #[must_use]
    pub const fn with_wall_count(mut self, range: CountRange) -> Self {
        self.wall_count = range;
        self
    }

    /// Set the food count range.
    #[must_use]
    pub const fn with_food_count(mut self, range: CountRange) -> Self {
        self.food_count = range;
        self
    }

    /// Set the tile variant counts.
    #[must_use]
    pub const fn with_tiles(mut self, tiles: TileSet) -> Self {
        self.tiles = tiles;
        self
    }

    /// Check dimensions, ranges and tile sets.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidConfig`] or [`GameError::EmptyTileSet`].
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [("columns", self.columns), ("rows", self.rows)] {
            if value == 0 || value > MAX_DIMENSION {
                return Err(GameError::InvalidConfig(format!(
                    "{name} must be in 1..={MAX_DIMENSION}, got {value}"
                )));
            }
        }
        self.wall_count.validate()?;
        self.food_count.validate()?;
        self.tiles.validate()
    }

    /// Cells eligible for walls, food and enemies.
    pub fn candidate_cells(&self) -> impl Iterator<Item = Cell> {
        let (columns, rows) = (self.columns as i32, self.rows as i32);
        (LEFT_INSET..columns - EDGE_INSET)
            .flat_map(move |x| (EDGE_INSET..rows - EDGE_INSET).map(move |y| Cell::new(x, y)))
    }

    /// Fixed exit cell: the top-right interior corner.
    #[must_use]
    pub const fn exit_cell(&self) -> Cell {
        Cell::new(self.columns as i32 - 1, self.rows as i32 - 1)
    }

    /// Whether `cell` lies on the boundary ring.
    #[must_use]
    pub const fn is_boundary(&self, cell: Cell) -> bool {
        let (columns, rows) = (self.columns as i32, self.rows as i32);
        let in_x = cell.x >= -1 && cell.x <= columns;
        let in_y = cell.y >= -1 && cell.y <= rows;
        in_x && in_y && (cell.x == -1 || cell.x == columns || cell.y == -1 || cell.y == rows)
    }

    /// Whether `cell` lies in the playable interior.
    #[must_use]
    pub const fn is_interior(&self, cell: Cell) -> bool {
        cell.x >= 0 && cell.y >= 0 && cell.x < self.columns as i32 && cell.y < self.rows as i32
    }
}

/// Number of enemies for a level: `floor(log2(level))`, zero for level 0.
#[must_use]
pub const fn enemy_count(level: u32) -> u32 {
    match level.checked_ilog2() {
        Some(n) => n,
        None => 0,
    }
}

/// A fully generated level layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedBoard {
    /// Level this board was generated for.
    pub level: u32,
    /// Configuration used.
    pub config: BoardConfig,
    /// Every placement, in emission order.
    pub placements: Vec<EntityPlacement>,
}

impl GeneratedBoard {
    /// Placements of one kind.
    pub fn of_kind(&self, kind: EntityKind) -> impl Iterator<Item = &EntityPlacement> {
        self.placements.iter().filter(move |p| p.kind == kind)
    }

    /// Number of placements of one kind.
    #[must_use]
    pub fn count(&self, kind: EntityKind) -> usize {
        self.of_kind(kind).count()
    }

    /// Cells holding a placement of one kind.
    #[must_use]
    pub fn cells_of(&self, kind: EntityKind) -> Vec<Cell> {
        self.of_kind(kind).map(|p| p.cell).collect()
    }

    /// All placements at `cell`.
    pub fn placements_at(&self, cell: Cell) -> impl Iterator<Item = &EntityPlacement> {
        self.placements.iter().filter(move |p| p.cell == cell)
    }

    /// The topmost placement at `cell` (the last one emitted).
    #[must_use]
    pub fn top_at(&self, cell: Cell) -> Option<&EntityPlacement> {
        self.placements_at(cell).last()
    }

    /// Where the exit was placed.
    #[must_use]
    pub fn exit_cell(&self) -> Cell {
        self.config.exit_cell()
    }
}

/// Generates boards from a seeded random stream.
///
/// The generator owns its RNG so consecutive levels continue the same
/// stream; two generators built from the same seed produce the same
/// sequence of boards.
#[derive(Debug, Clone)]
pub struct BoardGenerator {
    rng: ChaCha8Rng,
    occupancy: GridOccupancyMap,
}

impl BoardGenerator {
    /// Create a generator with a fixed seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            occupancy: GridOccupancyMap::new(),
        }
    }

    /// Occupancy state left by the most recent pass.
    #[must_use]
    pub fn occupancy(&self) -> &GridOccupancyMap {
        &self.occupancy
    }

    /// Generate the layout for `level`.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InsufficientSpace`] if walls, food or enemies
    /// need more cells than the candidate set has left, or a configuration
    /// error from [`BoardConfig::validate`]. No board is returned on error.
    pub fn generate(&mut self, level: u32, config: &BoardConfig) -> Result<GeneratedBoard> {
        config.validate()?;

        let ring_and_floor = ((config.columns + 2) * (config.rows + 2)) as usize;
        let mut placements = Vec::with_capacity(ring_and_floor + 16);

        self.layout_floor_and_walls(config, &mut placements);
        self.occupancy.reset(config.candidate_cells());

        let walls = config.wall_count.sample(&mut self.rng);
        self.layout_at_random(config, EntityKind::InnerWall, walls, &mut placements)?;

        let food = config.food_count.sample(&mut self.rng);
        self.layout_at_random(config, EntityKind::Food, food, &mut placements)?;

        let enemies = enemy_count(level);
        self.layout_at_random(config, EntityKind::Enemy, enemies, &mut placements)?;

        placements.push(EntityPlacement {
            kind: EntityKind::Exit,
            cell: config.exit_cell(),
            variant: config.tiles.pick(EntityKind::Exit, &mut self.rng),
        });

        debug!(level, walls, food, enemies, "Generated board");

        let board = GeneratedBoard {
            level,
            config: config.clone(),
            placements,
        };

        #[cfg(feature = "debug-validation")]
        validate_board(&board);

        Ok(board)
    }

    fn layout_floor_and_walls(&mut self, config: &BoardConfig, out: &mut Vec<EntityPlacement>) {
        let (columns, rows) = (config.columns as i32, config.rows as i32);
        for x in -1..=columns {
            for y in -1..=rows {
                let cell = Cell::new(x, y);
                let kind = if config.is_boundary(cell) {
                    EntityKind::OuterWall
                } else {
                    EntityKind::Floor
                };
                out.push(EntityPlacement {
                    kind,
                    cell,
                    variant: config.tiles.pick(kind, &mut self.rng),
                });
            }
        }
    }

    fn layout_at_random(
        &mut self,
        config: &BoardConfig,
        kind: EntityKind,
        count: u32,
        out: &mut Vec<EntityPlacement>,
    ) -> Result<()> {
        let requested = count as usize;
        let available = self.occupancy.remaining();
        if requested > available {
            return Err(GameError::InsufficientSpace {
                kind,
                requested,
                available,
            });
        }

        for _ in 0..count {
            let cell = self
                .occupancy
                .take_random(&mut self.rng)
                .ok_or(GameError::InsufficientSpace {
                    kind,
                    requested,
                    available,
                })?;
            out.push(EntityPlacement {
                kind,
                cell,
                variant: config.tiles.pick(kind, &mut self.rng),
            });
        }
        Ok(())
    }
}

/// Generate a single board from a seed.
///
/// # Errors
///
/// Same as [`BoardGenerator::generate`].
pub fn generate_board(level: u32, config: &BoardConfig, seed: u64) -> Result<GeneratedBoard> {
    BoardGenerator::new(seed).generate(level, config)
}

#[cfg(feature = "debug-validation")]
fn validate_board(board: &GeneratedBoard) {
    use std::collections::HashSet;

    let mut seen = HashSet::new();
    for kind in [EntityKind::InnerWall, EntityKind::Food, EntityKind::Enemy] {
        for cell in board.cells_of(kind) {
            assert!(seen.insert(cell), "overlapping placement at {cell}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn config_8x8() -> BoardConfig {
        BoardConfig::default()
            .with_size(8, 8)
            .with_wall_count(CountRange::exactly(2))
            .with_food_count(CountRange::exactly(1))
    }

    #[test]
    fn test_default_config() {
        let config = BoardConfig::default();
        assert_eq!(config.columns, 8);
        assert_eq!(config.rows, 8);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_enemy_count_is_floor_log2() {
        assert_eq!(enemy_count(0), 0);
        assert_eq!(enemy_count(1), 0);
        assert_eq!(enemy_count(2), 1);
        assert_eq!(enemy_count(3), 1);
        assert_eq!(enemy_count(4), 2);
        assert_eq!(enemy_count(7), 2);
        assert_eq!(enemy_count(8), 3);
        assert_eq!(enemy_count(1024), 10);
    }

    #[test]
    fn test_candidate_cells_use_asymmetric_inset() {
        let config = config_8x8();
        let cells: Vec<Cell> = config.candidate_cells().collect();
        // x in 5..=6, y in 1..=6
        assert_eq!(cells.len(), 12);
        assert!(cells.iter().all(|c| (5..=6).contains(&c.x)));
        assert!(cells.iter().all(|c| (1..=6).contains(&c.y)));
    }

    #[test]
    fn test_narrow_board_has_no_candidates() {
        let config = BoardConfig::default().with_size(6, 8);
        assert_eq!(config.candidate_cells().count(), 0);
    }

    #[test]
    fn test_ring_and_floor_counts() {
        let board = generate_board(4, &config_8x8(), 42).unwrap();
        assert_eq!(board.count(EntityKind::Floor), 64);
        assert_eq!(board.count(EntityKind::OuterWall), 2 * 10 + 2 * 8);
        assert_eq!(board.count(EntityKind::InnerWall), 2);
        assert_eq!(board.count(EntityKind::Food), 1);
        assert_eq!(board.count(EntityKind::Enemy), 2);
        assert_eq!(board.count(EntityKind::Exit), 1);
        assert_eq!(board.exit_cell(), Cell::new(7, 7));
    }

    #[test]
    fn test_every_ring_cell_walled_once() {
        let config = BoardConfig::default().with_size(9, 11);
        let board = generate_board(1, &config, 3).unwrap();
        for x in -1..=9 {
            for y in -1..=11 {
                let cell = Cell::new(x, y);
                let base: Vec<_> = board
                    .placements_at(cell)
                    .filter(|p| matches!(p.kind, EntityKind::Floor | EntityKind::OuterWall))
                    .collect();
                assert_eq!(base.len(), 1, "cell {cell} has {} base tiles", base.len());
                let expected = if config.is_boundary(cell) {
                    EntityKind::OuterWall
                } else {
                    EntityKind::Floor
                };
                assert_eq!(base[0].kind, expected);
            }
        }
    }

    #[test]
    fn test_placements_are_disjoint_and_in_candidates() {
        let config = BoardConfig::default()
            .with_size(12, 10)
            .with_wall_count(CountRange::new(5, 9).unwrap());
        let candidates: HashSet<Cell> = config.candidate_cells().collect();
        let board = generate_board(16, &config, 99).unwrap();

        let mut seen = HashSet::new();
        for kind in [EntityKind::InnerWall, EntityKind::Food, EntityKind::Enemy] {
            for cell in board.cells_of(kind) {
                assert!(candidates.contains(&cell));
                assert!(seen.insert(cell), "{kind:?} overlaps at {cell}");
            }
        }
    }

    #[test]
    fn test_variants_within_tile_set() {
        let tiles = TileSet {
            floor: 3,
            outer_wall: 1,
            inner_wall: 2,
            food: 4,
            enemy: 2,
            exit: 1,
        };
        let config = BoardConfig::default().with_tiles(tiles);
        let board = generate_board(8, &config, 5).unwrap();
        for p in &board.placements {
            assert!(p.variant < tiles.variants(p.kind));
        }
    }

    #[test]
    fn test_insufficient_space_for_walls() {
        let config = config_8x8().with_wall_count(CountRange::exactly(13));
        let err = generate_board(1, &config, 1).unwrap_err();
        assert_eq!(
            err,
            GameError::InsufficientSpace {
                kind: EntityKind::InnerWall,
                requested: 13,
                available: 12,
            }
        );
    }

    #[test]
    fn test_insufficient_space_for_enemies() {
        // 12 candidates: 2 walls + 1 food leaves 9, level 1024 needs 10 enemies
        let err = generate_board(1024, &config_8x8(), 1).unwrap_err();
        assert_eq!(
            err,
            GameError::InsufficientSpace {
                kind: EntityKind::Enemy,
                requested: 10,
                available: 9,
            }
        );
    }

    #[test]
    fn test_inverted_range_rejected() {
        assert!(CountRange::new(4, 2).is_err());
        let config = BoardConfig::default().with_food_count(CountRange {
            minimum: 3,
            maximum: 1,
        });
        assert!(matches!(
            generate_board(1, &config, 0),
            Err(GameError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_empty_tile_set_rejected() {
        let mut tiles = TileSet::default();
        tiles.food = 0;
        let config = BoardConfig::default().with_tiles(tiles);
        assert_eq!(
            generate_board(1, &config, 0),
            Err(GameError::EmptyTileSet(EntityKind::Food))
        );
    }

    #[test]
    fn test_zero_dimension_rejected() {
        let config = BoardConfig::default().with_size(0, 8);
        assert!(matches!(config.validate(), Err(GameError::InvalidConfig(_))));
    }

    #[test]
    fn test_determinism() {
        let config = BoardConfig::default();
        let a = generate_board(5, &config, 42).unwrap();
        let b = generate_board(5, &config, 42).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_generator_stream_continues_across_levels() {
        let config = BoardConfig::default().with_size(16, 16);
        let mut gen = BoardGenerator::new(11);
        let first = gen.generate(1, &config).unwrap();
        let second = gen.generate(1, &config).unwrap();
        // Same level, same config, different draw from the continuing stream.
        assert_ne!(first.placements, second.placements);
    }

    #[test]
    fn test_exit_placed_last_without_reservation() {
        let config = config_8x8();
        let mut gen = BoardGenerator::new(8);
        let board = gen.generate(2, &config).unwrap();
        let last = board.placements.last().unwrap();
        assert_eq!(last.kind, EntityKind::Exit);
        assert_eq!(last.cell, Cell::new(7, 7));
        // (7, 7) is outside the candidate set, so the map never reserved it.
        assert!(!gen.occupancy().is_reserved(Cell::new(7, 7)));
        assert_eq!(board.top_at(Cell::new(7, 7)).map(|p| p.kind), Some(EntityKind::Exit));
    }
}
