//! Scripted session runner.
//!
//! Plays a [`GameSession`] frame by frame at 60 ticks per second with an
//! [`ExitSeeker`] on the player side and a [`ChasePlanner`] for enemies,
//! advancing a level whenever the player rests on the exit.

use crawl_core::actors::{ActorId, ActorKind};
use crawl_core::collision::{BlockingKind, ColliderId};
use crawl_core::error::GameError;
use crawl_core::math::Fixed;
use crawl_core::motion::MoveOutcome;
use crawl_core::session::{GameSession, SessionConfig};
use crawl_core::turn::TurnState;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config_loader::RunnerError;
use crate::strategies::{ChasePlanner, ExitSeeker};

/// Simulation ticks per second.
pub const TICKS_PER_SECOND: i32 = 60;

/// What to play.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Levels to clear before stopping.
    pub levels: u32,
    /// Player turns to play before giving up.
    pub max_turns: u64,
    /// Session parameters, including the seed.
    pub session: SessionConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            levels: 3,
            max_turns: 500,
            session: SessionConfig::default(),
        }
    }
}

impl RunConfig {
    /// Set the seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.session.seed = seed;
        self
    }

    /// Set the level and turn limits.
    pub fn with_limits(mut self, levels: u32, max_turns: u64) -> Self {
        self.levels = levels;
        self.max_turns = max_turns;
        self
    }
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunOutcome {
    /// Every requested level was cleared.
    Cleared,
    /// The turn limit was reached first.
    TurnLimit,
    /// The next level could not be generated.
    GenerationFailed(String),
}

/// Counters collected over a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Session seed.
    pub seed: u64,
    /// Levels the player walked out of.
    pub levels_cleared: u32,
    /// Level being played when the run stopped.
    pub final_level: u32,
    /// Player turns taken.
    pub turns: u64,
    /// Frames simulated.
    pub frames: u64,
    /// Enemy move attempts.
    pub enemy_moves: u64,
    /// Player moves that ran into something.
    pub player_blocked: u64,
    /// Enemy moves that ran into the player.
    pub player_hits: u64,
    /// Food picked up.
    pub food_collected: u32,
    /// Enemies removed by the player bumping into them.
    pub enemies_defeated: u32,
    /// Session hash at the end of the run.
    pub state_hash: u64,
    /// Why the run stopped.
    pub outcome: RunOutcome,
}

impl RunSummary {
    fn new(seed: u64) -> Self {
        Self {
            seed,
            levels_cleared: 0,
            final_level: 0,
            turns: 0,
            frames: 0,
            enemy_moves: 0,
            player_blocked: 0,
            player_hits: 0,
            food_collected: 0,
            enemies_defeated: 0,
            state_hash: 0,
            outcome: RunOutcome::TurnLimit,
        }
    }
}

fn enemy_with_collider(session: &GameSession, collider: ColliderId) -> Option<ActorId> {
    let actors = session.actors();
    actors
        .ids_of(ActorKind::Enemy)
        .into_iter()
        .find(|id| actors.get(*id).is_some_and(|a| a.collider == collider))
}

/// Apply the consequences of the player's move.
fn resolve_player_move(session: &mut GameSession, outcome: MoveOutcome, summary: &mut RunSummary) {
    let Some(blocker) = outcome.blocker().copied() else {
        return;
    };
    summary.player_blocked += 1;
    if blocker.kind != BlockingKind::Enemy {
        return;
    }
    if let Some(enemy) = enemy_with_collider(session, blocker.collider) {
        match session.remove_enemy(enemy) {
            Ok(_) => {
                summary.enemies_defeated += 1;
                debug!(enemy, "Enemy defeated");
            }
            Err(e) => warn!("Failed to remove enemy {}: {}", enemy, e),
        }
    }
}

/// Play one scripted session.
///
/// # Errors
///
/// A zero level count, an invalid session config or a failure to generate
/// the first level. Failing to generate a later level ends the run with
/// [`RunOutcome::GenerationFailed`] instead.
pub fn run_session(config: &RunConfig) -> Result<RunSummary, RunnerError> {
    if config.levels == 0 {
        return Err(GameError::InvalidConfig("levels must be at least 1".into()).into());
    }
    let seed = config.session.seed;
    let mut session = GameSession::new(config.session.clone())?;
    let mut player = ExitSeeker::new(seed);
    let mut planner = ChasePlanner::new(seed.wrapping_add(1));
    let dt = Fixed::from_num(1) / Fixed::from_num(TICKS_PER_SECOND);
    let skip_intro = config.session.turn.level_start_delay().is_none();
    let mut summary = RunSummary::new(seed);

    info!(
        seed,
        levels = config.levels,
        max_turns = config.max_turns,
        "Starting scripted run"
    );

    let outcome = loop {
        if skip_intro && session.state() == TurnState::SetupOrTransition {
            session.finish_setup();
        }

        if session.state() == TurnState::PlayerTurn && !session.actors().any_moving() {
            if session.is_player_on_exit() {
                summary.levels_cleared += 1;
                if summary.levels_cleared >= config.levels {
                    break RunOutcome::Cleared;
                }
                if let Err(e) = session.advance_level() {
                    warn!(level = session.level() + 1, "Generation failed: {}", e);
                    break RunOutcome::GenerationFailed(e.to_string());
                }
                continue;
            }
            if summary.turns >= config.max_turns {
                break RunOutcome::TurnLimit;
            }

            let step = player.next_move(&session);
            match session.player_move(step.dx(), step.dy()) {
                Ok(outcome) => {
                    summary.turns += 1;
                    resolve_player_move(&mut session, outcome, &mut summary);
                }
                Err(e) => warn!("Player move rejected: {}", e),
            }
        }

        let events = session.tick(dt, &mut planner);
        summary.frames += 1;

        if events.arrived.contains(&session.player()) {
            if let Some(cell) = session.player_cell() {
                if session.collect_food_at(cell) {
                    summary.food_collected += 1;
                    debug!(?cell, "Food collected");
                }
            }
        }
        for enemy_move in &events.turn.enemy_moves {
            summary.enemy_moves += 1;
            if enemy_move
                .outcome
                .blocker()
                .is_some_and(|b| b.kind == BlockingKind::Player)
            {
                summary.player_hits += 1;
            }
        }
    };

    summary.final_level = session.level();
    summary.state_hash = session.state_hash();
    summary.outcome = outcome;

    info!(
        levels_cleared = summary.levels_cleared,
        turns = summary.turns,
        frames = summary.frames,
        outcome = ?summary.outcome,
        "Run complete"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crawl_test_utils::fixtures::{open_board, quick_session_config, scenario_board};

    fn quick_run(seed: u64) -> RunConfig {
        RunConfig {
            session: quick_session_config(seed).with_board(scenario_board()),
            ..RunConfig::default()
        }
    }

    #[test]
    fn test_run_is_reproducible() {
        let config = quick_run(11).with_limits(2, 200);
        let a = run_session(&config).unwrap();
        let b = run_session(&config).unwrap();
        assert_eq!(a, b);
        assert!(a.frames > 0);
    }

    #[test]
    fn test_turn_limit() {
        let config = quick_run(5).with_limits(10, 3);
        let summary = run_session(&config).unwrap();
        assert_eq!(summary.outcome, RunOutcome::TurnLimit);
        assert_eq!(summary.turns, 3);
    }

    #[test]
    fn test_clears_an_open_board() {
        let mut config = quick_run(2).with_limits(1, 500);
        config.session = config.session.with_board(open_board(8, 8));
        let summary = run_session(&config).unwrap();
        assert_eq!(summary.outcome, RunOutcome::Cleared);
        assert_eq!(summary.levels_cleared, 1);
        assert_eq!(summary.final_level, 1);
        assert!(summary.turns >= 14);
    }

    #[test]
    fn test_later_generation_failure_ends_the_run() {
        // A 2×2 board has no candidate cells, so level 2's enemy cannot be placed.
        let mut config = quick_run(8).with_limits(3, 1000);
        config.session = config.session.with_board(open_board(2, 2));
        let summary = run_session(&config).unwrap();
        assert!(matches!(summary.outcome, RunOutcome::GenerationFailed(_)));
        assert_eq!(summary.levels_cleared, 1);
        assert_eq!(summary.final_level, 1);
    }

    #[test]
    fn test_first_level_failure_is_an_error() {
        let mut config = quick_run(1);
        config.session = config.session.with_start_level(1024);
        let err = run_session(&config).unwrap_err();
        assert!(matches!(
            err,
            RunnerError::Game(GameError::InsufficientSpace { .. })
        ));
    }

    #[test]
    fn test_zero_levels_rejected() {
        let config = quick_run(1).with_limits(0, 10);
        assert!(matches!(
            run_session(&config),
            Err(RunnerError::Game(GameError::InvalidConfig(_)))
        ));
    }

    #[test]
    fn test_summary_serializes() {
        let summary = run_session(&quick_run(4).with_limits(1, 5)).unwrap();
        let json = serde_json::to_string(&summary).unwrap();
        assert!(json.contains("\"seed\":4"));
    }
}
