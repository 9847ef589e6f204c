//! Test fixtures and helpers.
//!
//! Pre-built configurations, planners and collision doubles
//! for consistent testing.

use std::cell::RefCell;

use crawl_core::actors::{ActorKind, ActorStore, MobileActor};
use crawl_core::board::{BoardConfig, CountRange};
use crawl_core::collision::{BlockingEntity, ColliderId, CollisionLayer, CollisionQuery};
use crawl_core::error::Result;
use crawl_core::grid::Cell;
use crawl_core::math::{Fixed, Vec2Fixed};
use crawl_core::motion::MoveOutcome;
use crawl_core::session::{GameSession, SessionConfig};
use crawl_core::turn::{TurnConfig, TurnState};
use fixed::types::I32F32;

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// One frame at 60 Hz.
#[must_use]
pub fn frame_dt() -> Fixed {
    fixed(1) / fixed(60)
}

/// The 8×8 board with exactly 2 inner walls and 1 food.
#[must_use]
pub fn scenario_board() -> BoardConfig {
    BoardConfig::default()
        .with_wall_count(CountRange::exactly(2))
        .with_food_count(CountRange::exactly(1))
}

/// A board with no inner walls and no food.
#[must_use]
pub fn open_board(columns: u32, rows: u32) -> BoardConfig {
    BoardConfig::default()
        .with_size(columns, rows)
        .with_wall_count(CountRange::exactly(0))
        .with_food_count(CountRange::exactly(0))
}

/// Session config that skips the level intro timer.
#[must_use]
pub fn quick_session_config(seed: u64) -> SessionConfig {
    SessionConfig::default()
        .with_seed(seed)
        .with_turn(TurnConfig::default().with_level_start_delay_ms(None))
}

/// Start a session and end its intro.
///
/// # Panics
///
/// Panics if the session cannot be created.
#[must_use]
pub fn ready_session(config: SessionConfig) -> GameSession {
    let mut session = GameSession::new(config).expect("session should start");
    session.finish_setup();
    session
}

/// Enemy planner that never picks a valid step.
pub fn idle_planner(_: &MobileActor, _: &ActorStore) -> (i32, i32) {
    (0, 0)
}

/// Enemy planner that steps toward the player, larger axis first.
pub fn chase_player(enemy: &MobileActor, actors: &ActorStore) -> (i32, i32) {
    let Some(player) = actors
        .ids_of(ActorKind::Player)
        .first()
        .and_then(|id| actors.get(*id))
    else {
        return (0, 0);
    };
    let from = enemy.committed_cell();
    let to = player.committed_cell();
    let (dx, dy) = (to.x - from.x, to.y - from.y);
    if dx == 0 && dy == 0 {
        (0, 0)
    } else if dx.abs() >= dy.abs() {
        (dx.signum(), 0)
    } else {
        (0, dy.signum())
    }
}

/// Submit one player move and tick until control and motion settle.
///
/// Returns the move outcome and the number of frames ticked.
///
/// # Errors
///
/// Whatever [`GameSession::player_move`] rejects.
///
/// # Panics
///
/// Panics if the turn does not finish within ten thousand frames.
pub fn play_turn<P>(
    session: &mut GameSession,
    dx: i32,
    dy: i32,
    planner: &mut P,
) -> Result<(MoveOutcome, u32)>
where
    P: FnMut(&MobileActor, &ActorStore) -> (i32, i32),
{
    let outcome = session.player_move(dx, dy)?;
    let mut frames = 0;
    while session.state() != TurnState::PlayerTurn || session.actors().any_moving() {
        session.tick(frame_dt(), planner);
        frames += 1;
        assert!(frames < 10_000, "turn did not finish");
    }
    Ok((outcome, frames))
}

/// A recorded line-cast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinecastCall {
    /// Segment start.
    pub start: Vec2Fixed,
    /// Segment end.
    pub end: Vec2Fixed,
    /// Layer queried.
    pub layer: CollisionLayer,
    /// Whether the caller's own collider was disabled at query time.
    pub own_disabled: bool,
}

/// Collision double that records every call and reports a scripted blocker.
#[derive(Debug, Default)]
pub struct RecordingWorld {
    /// Collider whose enabled flag is tracked.
    pub watched: ColliderId,
    /// Reported for every line-cast when set.
    pub blocker: Option<BlockingEntity>,
    /// Every line-cast, in order.
    pub calls: RefCell<Vec<LinecastCall>>,
    /// Every enable/disable, in order.
    pub toggles: Vec<(ColliderId, bool)>,
    /// Every committed move, in order.
    pub moves: Vec<(ColliderId, Cell)>,
    disabled: bool,
}

impl RecordingWorld {
    /// Watch `collider` and never block.
    #[must_use]
    pub fn new(watched: ColliderId) -> Self {
        Self {
            watched,
            ..Self::default()
        }
    }

    /// Watch `collider` and report `blocker` on every query.
    #[must_use]
    pub fn blocking(watched: ColliderId, blocker: BlockingEntity) -> Self {
        Self {
            watched,
            blocker: Some(blocker),
            ..Self::default()
        }
    }

    /// Number of line-casts issued.
    #[must_use]
    pub fn query_count(&self) -> usize {
        self.calls.borrow().len()
    }
}

impl CollisionQuery for RecordingWorld {
    fn linecast(
        &self,
        start: Vec2Fixed,
        end: Vec2Fixed,
        layer: CollisionLayer,
    ) -> Option<BlockingEntity> {
        self.calls.borrow_mut().push(LinecastCall {
            start,
            end,
            layer,
            own_disabled: self.disabled,
        });
        self.blocker
    }

    fn set_collider_enabled(&mut self, collider: ColliderId, enabled: bool) {
        if collider == self.watched {
            self.disabled = !enabled;
        }
        self.toggles.push((collider, enabled));
    }

    fn collider_moved(&mut self, collider: ColliderId, to: Cell) {
        self.moves.push((collider, to));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chase_player_prefers_larger_axis() {
        let mut actors = ActorStore::new();
        actors.insert(MobileActor::new(ActorKind::Player, Cell::new(0, 0), fixed(0), 1));
        let enemy = MobileActor::new(ActorKind::Enemy, Cell::new(5, 2), fixed(0), 2);
        assert_eq!(chase_player(&enemy, &actors), (-1, 0));

        let enemy = MobileActor::new(ActorKind::Enemy, Cell::new(1, 4), fixed(0), 3);
        assert_eq!(chase_player(&enemy, &actors), (0, -1));
    }

    #[test]
    fn test_play_turn_returns_control() {
        let config = quick_session_config(3).with_board(open_board(8, 8));
        let mut session = ready_session(config);
        let (outcome, frames) = play_turn(&mut session, 1, 0, &mut idle_planner).unwrap();
        assert!(outcome.is_moved());
        assert!(frames >= 6);
        assert_eq!(session.player_cell(), Some(Cell::new(1, 0)));
    }
}
