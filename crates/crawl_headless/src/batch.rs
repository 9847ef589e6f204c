//! Batch board validation.
//!
//! Generates many seeded boards in parallel using rayon and checks each
//! layout against the generation invariants.

use std::collections::BTreeSet;
use std::time::Instant;

use crawl_core::board::{enemy_count, generate_board, BoardConfig, EntityKind, GeneratedBoard};
use crawl_core::grid::Cell;
use crawl_core::session::PLAYER_SPAWN;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Configuration for a batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Number of boards to generate
    pub count: u32,
    /// Level to generate
    pub level: u32,
    /// Seed of the first board; board `i` uses `seed_start + i`
    pub seed_start: u64,
    /// Maximum worker threads (0 = use rayon default)
    pub parallel: u32,
    /// Board parameters
    pub board: BoardConfig,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            count: 100,
            level: 1,
            seed_start: 0,
            parallel: 0,
            board: BoardConfig::default(),
        }
    }
}

impl BatchConfig {
    /// Create config for `count` boards of `level`
    pub fn new(count: u32, level: u32) -> Self {
        Self {
            count,
            level,
            ..Default::default()
        }
    }

    /// Set seed start
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed_start = seed;
        self
    }

    /// Set board parameters
    pub fn with_board(mut self, board: BoardConfig) -> Self {
        self.board = board;
        self
    }
}

/// A board that failed to generate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchError {
    /// Seed used
    pub seed: u64,
    /// Error message
    pub message: String,
}

/// A generated board that broke a layout rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutViolation {
    /// Seed used
    pub seed: u64,
    /// What was wrong
    pub message: String,
}

/// Per-kind placement statistics across the batch
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KindStats {
    /// Fewest placements on one board
    pub min: usize,
    /// Most placements on one board
    pub max: usize,
    /// Sum over all boards
    pub total: usize,
}

/// Results from a batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    /// Configuration used
    pub config: BatchConfig,
    /// Boards generated successfully
    pub generated: u32,
    /// Inner wall counts
    pub walls: KindStats,
    /// Food counts
    pub food: KindStats,
    /// Enemy counts
    pub enemies: KindStats,
    /// Generation failures
    pub failures: Vec<BatchError>,
    /// Invariant violations
    pub violations: Vec<LayoutViolation>,
    /// Total runtime
    pub duration_seconds: f64,
}

impl BatchReport {
    /// Whether every board generated and passed every check.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.violations.is_empty()
    }
}

/// Check a generated board against the layout rules.
///
/// Returns one message per broken rule; an empty list means the board is
/// well formed.
pub fn check_layout(board: &GeneratedBoard) -> Vec<String> {
    let config = &board.config;
    let mut problems = Vec::new();

    let floor: BTreeSet<Cell> = board.cells_of(EntityKind::Floor).into_iter().collect();
    let interior = (config.columns * config.rows) as usize;
    if floor.len() != interior || board.count(EntityKind::Floor) != interior {
        problems.push(format!(
            "expected {interior} distinct floor cells, found {}",
            floor.len()
        ));
    }
    if floor.iter().any(|cell| !config.is_interior(*cell)) {
        problems.push("floor outside the interior".to_string());
    }

    let ring = 2 * (config.columns + config.rows) as usize + 4;
    let outer = board.cells_of(EntityKind::OuterWall);
    if outer.len() != ring || outer.iter().any(|cell| !config.is_boundary(*cell)) {
        problems.push(format!(
            "expected {ring} outer walls on the ring, found {}",
            outer.len()
        ));
    }

    let candidates: BTreeSet<Cell> = config.candidate_cells().collect();
    let mut used = BTreeSet::new();
    for kind in [EntityKind::InnerWall, EntityKind::Food, EntityKind::Enemy] {
        for cell in board.cells_of(kind) {
            if !candidates.contains(&cell) {
                problems.push(format!("{kind:?} at {cell:?} outside the candidate area"));
            }
            if !used.insert(cell) {
                problems.push(format!("{kind:?} at {cell:?} shares a cell"));
            }
        }
    }
    if used.contains(&PLAYER_SPAWN) {
        problems.push("player spawn occupied".to_string());
    }

    let walls = board.count(EntityKind::InnerWall) as u32;
    if !config.wall_count.contains(walls) {
        problems.push(format!("{walls} inner walls outside {:?}", config.wall_count));
    }
    let food = board.count(EntityKind::Food) as u32;
    if !config.food_count.contains(food) {
        problems.push(format!("{food} food outside {:?}", config.food_count));
    }
    let enemies = board.count(EntityKind::Enemy) as u32;
    if enemies != enemy_count(board.level) {
        problems.push(format!(
            "{enemies} enemies, expected {}",
            enemy_count(board.level)
        ));
    }

    let exits = board.cells_of(EntityKind::Exit);
    if exits != [config.exit_cell()] {
        problems.push(format!("exit placements {exits:?}"));
    }

    for placement in &board.placements {
        if placement.variant >= config.tiles.variants(placement.kind) {
            problems.push(format!(
                "{:?} variant {} out of range",
                placement.kind, placement.variant
            ));
        }
    }

    problems
}

fn accumulate(stats: &mut KindStats, count: usize, first: bool) {
    if first {
        stats.min = count;
        stats.max = count;
    } else {
        stats.min = stats.min.min(count);
        stats.max = stats.max.max(count);
    }
    stats.total += count;
}

/// Run a batch of board generations
pub fn run_batch(config: BatchConfig) -> BatchReport {
    let start = Instant::now();

    info!(
        "Starting batch: {} boards of level {} from seed {}",
        config.count, config.level, config.seed_start
    );

    // Configure thread pool if specified
    if config.parallel > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(config.parallel as usize)
            .build_global()
            .ok(); // Ignore if already set
    }

    let results: Vec<(u64, Result<GeneratedBoard, String>)> = (0..config.count)
        .into_par_iter()
        .map(|i| {
            let seed = config.seed_start.wrapping_add(i as u64);
            let result = generate_board(config.level, &config.board, seed).map_err(|e| {
                warn!("Board {} (seed {}) failed: {}", i, seed, e);
                e.to_string()
            });
            (seed, result)
        })
        .collect();

    let mut report = BatchReport {
        config: config.clone(),
        generated: 0,
        walls: KindStats::default(),
        food: KindStats::default(),
        enemies: KindStats::default(),
        failures: Vec::new(),
        violations: Vec::new(),
        duration_seconds: 0.0,
    };

    for (seed, result) in results {
        let board = match result {
            Ok(board) => board,
            Err(message) => {
                report.failures.push(BatchError { seed, message });
                continue;
            }
        };

        let first = report.generated == 0;
        report.generated += 1;
        accumulate(&mut report.walls, board.count(EntityKind::InnerWall), first);
        accumulate(&mut report.food, board.count(EntityKind::Food), first);
        accumulate(&mut report.enemies, board.count(EntityKind::Enemy), first);

        for message in check_layout(&board) {
            debug!(seed, %message, "Layout violation");
            report.violations.push(LayoutViolation { seed, message });
        }
    }

    report.duration_seconds = start.elapsed().as_secs_f64();

    info!(
        "Batch complete: {} generated, {} failed, {} violations in {:.2}s",
        report.generated,
        report.failures.len(),
        report.violations.len(),
        report.duration_seconds
    );

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crawl_core::board::{CountRange, EntityPlacement};
    use crawl_test_utils::fixtures::scenario_board;

    #[test]
    fn test_batch_config_builder() {
        let config = BatchConfig::new(50, 4).with_seed(12345);
        assert_eq!(config.count, 50);
        assert_eq!(config.level, 4);
        assert_eq!(config.seed_start, 12345);
    }

    #[test]
    fn test_small_batch_is_clean() {
        let report = run_batch(BatchConfig::new(40, 6).with_board(scenario_board()));
        assert!(report.is_clean(), "{:?}", report.violations);
        assert_eq!(report.generated, 40);
        assert_eq!(report.enemies.min, 2);
        assert_eq!(report.enemies.max, 2);
        assert_eq!(report.walls.total, 80);
    }

    #[test]
    fn test_default_ranges_respected() {
        let report = run_batch(BatchConfig::new(64, 1));
        assert!(report.is_clean());
        assert!(report.walls.min >= 2 && report.walls.max <= 4);
        assert!(report.food.min >= 1 && report.food.max <= 3);
    }

    #[test]
    fn test_failures_are_reported() {
        // 12 candidate cells cannot hold 2 walls, 1 food and 10 enemies.
        let report = run_batch(BatchConfig::new(5, 1024).with_board(scenario_board()));
        assert_eq!(report.generated, 0);
        assert_eq!(report.failures.len(), 5);
        assert_eq!(report.failures[0].seed, 0);
    }

    #[test]
    fn test_check_layout_flags_tampering() {
        let mut board = generate_board(2, &scenario_board(), 7).unwrap();
        assert!(check_layout(&board).is_empty());

        board.placements.push(EntityPlacement {
            kind: EntityKind::Food,
            cell: PLAYER_SPAWN,
            variant: 0,
        });
        let problems = check_layout(&board);
        assert!(problems.iter().any(|p| p.contains("player spawn")));
        assert!(problems.iter().any(|p| p.contains("food outside")));
    }

    #[test]
    fn test_check_layout_flags_wrong_count_range() {
        let mut board = generate_board(1, &scenario_board(), 3).unwrap();
        board.config.wall_count = CountRange::exactly(0);
        let problems = check_layout(&board);
        assert_eq!(problems.len(), 1);
        assert!(problems[0].contains("inner walls"));
    }

    #[test]
    fn test_report_serializes() {
        let report = run_batch(BatchConfig::new(3, 1));
        let json = serde_json::to_string_pretty(&report).unwrap();
        assert!(json.contains("\"generated\": 3"));
    }
}
