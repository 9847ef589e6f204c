//! Determinism testing utilities.
//!
//! Provides a harness for verifying that a session produces identical
//! results given an identical seed and input schedule.
//!
//! # Testing Strategy
//!
//! Replays and batch validation rely on a session being a pure function of
//! its config and inputs. Sources of non-determinism include:
//!
//! - **Floating-point math**: positions, durations and `dt` are fixed-point
//!   via [`crawl_core::math::Fixed`].
//!
//! - **HashMap iteration order**: Rust's default hasher is randomized.
//!   Actors are always visited in sorted id order.
//!
//! - **System randomness**: every random draw comes from the session's
//!   seeded generator.

use std::thread;

use crawl_core::session::{GameSession, SessionConfig};
use crawl_core::turn::TurnState;

use crate::fixtures::{chase_player, frame_dt};

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of frames simulated.
    pub frames: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for a deterministic session).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that all runs were deterministic.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Session is non-deterministic!\n\
                 Runs: {}\n\
                 Frames: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.frames,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a state machine multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run
/// * `frames` - Number of steps per run
/// * `setup` - Function to create initial state
/// * `step` - Function to advance state by one frame
/// * `hash` - Function to compute state hash
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    frames: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S, u64),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for frame in 0..frames {
            step(&mut state, frame);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        frames,
    }
}

/// Player steps cycled by [`step_session`].
pub const INPUT_PATTERN: [(i32, i32); 6] = [(1, 0), (0, 1), (1, 0), (0, 1), (-1, 0), (0, -1)];

/// Advance a session by one 60 Hz frame with a fixed input schedule.
///
/// Ends the intro on frame 0, submits the next [`INPUT_PATTERN`] step
/// whenever the player may act, and moves enemies with
/// [`chase_player`]. Reaching the exit advances the level; a failed
/// generation ends the session.
pub fn step_session(session: &mut GameSession, frame: u64) {
    if frame == 0 {
        session.finish_setup();
    }

    let idle = session.state() == TurnState::PlayerTurn && !session.actors().any_moving();
    if idle && !session.is_session_over() {
        if session.is_player_on_exit() {
            if session.advance_level().is_err() {
                session.end_session();
            }
            session.finish_setup();
            return;
        }
        let index = (session.scheduler().turn() % INPUT_PATTERN.len() as u64) as usize;
        let (dx, dy) = INPUT_PATTERN[index];
        // Rejections (session over) are part of the schedule.
        let _ = session.player_move(dx, dy);
    }

    session.tick(frame_dt(), &mut chase_player);
}

/// Run a session from `config` twice for `frames` frames and compare hashes.
///
/// Returns `false` if the config is invalid.
pub fn verify_session_determinism(config: &SessionConfig, frames: u64) -> bool {
    if GameSession::new(config.clone()).is_err() {
        return false;
    }
    let result = verify_determinism(
        2,
        frames,
        || GameSession::new(config.clone()).expect("validated above"),
        step_session,
        GameSession::state_hash,
    );
    result.is_deterministic
}

/// Result of parallel session runs.
#[derive(Debug, Clone)]
pub struct ParallelRunResult {
    /// Final state hash from each session.
    pub hashes: Vec<u64>,
    /// Number of frames each session ran.
    pub frames: u64,
    /// Number of sessions run.
    pub num_sessions: usize,
}

impl ParallelRunResult {
    /// Check if all sessions produced identical results.
    #[must_use]
    pub fn is_deterministic(&self) -> bool {
        self.hashes.windows(2).all(|w| w[0] == w[1])
    }

    /// Assert all sessions matched.
    ///
    /// # Panics
    ///
    /// Panics if sessions produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic() {
            let mut unique: Vec<u64> = self.hashes.clone();
            unique.sort_unstable();
            unique.dedup();
            panic!(
                "Parallel sessions diverged!\n\
                 Sessions: {}\n\
                 Frames: {}\n\
                 Unique hashes: {}\n\
                 All hashes: {:?}",
                self.num_sessions,
                self.frames,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run N sessions on scoped threads and collect final hashes.
///
/// # Panics
///
/// Panics if `setup_fn` panics on a worker thread.
pub fn run_parallel_sessions<F>(setup_fn: F, num_sessions: usize, frames: u64) -> ParallelRunResult
where
    F: Fn() -> GameSession + Sync,
{
    let hashes = thread::scope(|s| {
        let handles: Vec<_> = (0..num_sessions)
            .map(|_| {
                s.spawn(|| {
                    let mut session = setup_fn();
                    for frame in 0..frames {
                        step_session(&mut session, frame);
                    }
                    session.state_hash()
                })
            })
            .collect();

        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    ParallelRunResult {
        hashes,
        frames,
        num_sessions,
    }
}

/// Compare two runs frame by frame, finding the first divergence.
///
/// # Returns
///
/// `None` if the runs match throughout, `Some(frame)` for the first frame
/// after which their hashes differ.
pub fn find_first_divergence<F>(setup_fn: F, frames: u64) -> Option<u64>
where
    F: Fn() -> GameSession,
{
    let mut a = setup_fn();
    let mut b = setup_fn();

    if a.state_hash() != b.state_hash() {
        return Some(0);
    }

    for frame in 0..frames {
        step_session(&mut a, frame);
        step_session(&mut b, frame);

        if a.state_hash() != b.state_hash() {
            return Some(frame + 1);
        }
    }

    None
}

/// Proptest strategies for board and session testing.
pub mod strategies {
    use crawl_core::board::{BoardConfig, CountRange};
    use crawl_core::grid::Direction;
    use proptest::prelude::*;

    /// Generate a count range with `maximum <= max`.
    pub fn arb_count_range(max: u32) -> impl Strategy<Value = CountRange> {
        (0..=max, 0..=max).prop_map(|(a, b)| CountRange {
            minimum: a.min(b),
            maximum: a.max(b),
        })
    }

    /// Generate a board config that always has room for levels up to 64.
    ///
    /// Columns and rows are 8..=24, walls and food at most 3 each.
    pub fn arb_board_config() -> impl Strategy<Value = BoardConfig> {
        (8u32..=24, 8u32..=24, arb_count_range(3), arb_count_range(3)).prop_map(
            |(columns, rows, walls, food)| {
                BoardConfig::default()
                    .with_size(columns, rows)
                    .with_wall_count(walls)
                    .with_food_count(food)
            },
        )
    }

    /// Generate a level number (1..=64).
    pub fn arb_level() -> impl Strategy<Value = u32> {
        1u32..=64
    }

    /// Generate a seed.
    pub fn arb_seed() -> impl Strategy<Value = u64> {
        any::<u64>()
    }

    /// Generate an axis-aligned unit step.
    pub fn arb_direction() -> impl Strategy<Value = Direction> {
        prop::sample::select(Direction::CARDINAL.to_vec())
    }

    /// Generate any raw `(dx, dy)` pair, valid or not.
    pub fn arb_raw_step() -> impl Strategy<Value = (i32, i32)> {
        (-2i32..=2, -2i32..=2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{open_board, quick_session_config, scenario_board};
    use proptest::prelude::*;

    #[test]
    fn test_verify_determinism_simple() {
        let result = verify_determinism(3, 100, || 0u64, |n, _| *n += 1, |n| *n);

        assert!(result.is_deterministic);
        assert_eq!(result.hashes, vec![100, 100, 100]);
    }

    #[test]
    fn test_detects_non_determinism() {
        use std::sync::atomic::{AtomicU64, Ordering};
        let counter = AtomicU64::new(0);
        let result = verify_determinism(
            2,
            1,
            || counter.fetch_add(1, Ordering::Relaxed),
            |_, _| {},
            |n| *n,
        );
        assert!(!result.is_deterministic);
        assert_eq!(result.unique_hashes().len(), 2);
    }

    #[test]
    fn test_default_session_determinism() {
        assert!(verify_session_determinism(&quick_session_config(7), 600));
    }

    #[test]
    fn test_enemy_heavy_session_determinism() {
        let config = quick_session_config(11)
            .with_board(scenario_board())
            .with_start_level(8);
        assert!(verify_session_determinism(&config, 900));
    }

    #[test]
    fn test_invalid_config_is_not_deterministic() {
        let config = quick_session_config(1).with_start_level(0);
        assert!(!verify_session_determinism(&config, 10));
    }

    #[test]
    fn test_parallel_sessions_match() {
        let config = quick_session_config(5)
            .with_board(open_board(10, 10))
            .with_start_level(4);
        let result = run_parallel_sessions(
            || GameSession::new(config.clone()).expect("valid config"),
            4,
            600,
        );
        assert_eq!(result.hashes.len(), 4);
        result.assert_deterministic();
    }

    #[test]
    fn test_no_divergence_between_identical_runs() {
        let config = quick_session_config(9).with_start_level(2);
        let divergence =
            find_first_divergence(|| GameSession::new(config.clone()).expect("valid config"), 300);
        assert_eq!(divergence, None);
    }

    #[test]
    fn test_different_seeds_diverge_immediately() {
        let hashes: Vec<u64> = (0..2)
            .map(|seed| {
                GameSession::new(quick_session_config(seed))
                    .expect("valid config")
                    .state_hash()
            })
            .collect();
        assert_ne!(hashes[0], hashes[1]);
    }

    proptest! {
        /// Any seed and start level replays identically.
        #[test]
        fn prop_sessions_are_replayable(
            seed in strategies::arb_seed(),
            level in 1u32..=16,
        ) {
            let config = quick_session_config(seed).with_start_level(level);
            prop_assert!(verify_session_determinism(&config, 120));
        }

        /// Generated board configs never fail for supported levels.
        #[test]
        fn prop_arb_board_config_has_room(
            board in strategies::arb_board_config(),
            level in strategies::arb_level(),
            seed in strategies::arb_seed(),
        ) {
            prop_assert!(board.validate().is_ok());
            prop_assert!(crawl_core::board::generate_board(level, &board, seed).is_ok());
        }
    }
}
