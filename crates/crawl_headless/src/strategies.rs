//! Scripted decision makers for headless play.
//!
//! Both are seeded so a headless run is reproducible from its seed.

use crawl_core::actors::{ActorKind, ActorStore, MobileActor};
use crawl_core::grid::{Cell, Direction};
use crawl_core::session::GameSession;
use crawl_core::turn::EnemyPlanner;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Steps from `from` that reduce the Manhattan distance to `to`.
fn closing_steps(from: Cell, to: Cell) -> Vec<Direction> {
    let mut steps = Vec::with_capacity(2);
    if to.x != from.x {
        steps.push(if to.x > from.x {
            Direction::RIGHT
        } else {
            Direction::LEFT
        });
    }
    if to.y != from.y {
        steps.push(if to.y > from.y {
            Direction::UP
        } else {
            Direction::DOWN
        });
    }
    steps
}

fn random_cardinal<R: Rng + ?Sized>(rng: &mut R) -> Direction {
    Direction::CARDINAL[rng.gen_range(0..Direction::CARDINAL.len())]
}

/// Player strategy: a random walk biased toward the exit.
#[derive(Debug, Clone)]
pub struct ExitSeeker {
    rng: ChaCha8Rng,
    /// Chance, in percent, of taking a step toward the exit.
    pub bias_percent: u32,
}

impl ExitSeeker {
    /// Create a walker with the default 75% bias.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            bias_percent: 75,
        }
    }

    /// Pick the player's next step.
    pub fn next_move(&mut self, session: &GameSession) -> Direction {
        let Some(from) = session.player_cell() else {
            return random_cardinal(&mut self.rng);
        };
        let steps = closing_steps(from, session.board().exit_cell());
        if !steps.is_empty() && self.rng.gen_range(0..100) < self.bias_percent {
            return steps[self.rng.gen_range(0..steps.len())];
        }
        random_cardinal(&mut self.rng)
    }
}

/// Enemy planner: close in on the player, breaking ties at random.
#[derive(Debug, Clone)]
pub struct ChasePlanner {
    rng: ChaCha8Rng,
}

impl ChasePlanner {
    /// Create a planner with its own stream.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl EnemyPlanner for ChasePlanner {
    fn plan_move(&mut self, enemy: &MobileActor, actors: &ActorStore) -> (i32, i32) {
        let target = actors
            .ids_of(ActorKind::Player)
            .first()
            .and_then(|id| actors.get(*id))
            .map(MobileActor::committed_cell);
        let from = enemy.committed_cell();

        let direction = match target {
            Some(to) => {
                let (dx, dy) = ((to.x - from.x).abs(), (to.y - from.y).abs());
                let steps = closing_steps(from, to);
                match steps.as_slice() {
                    [] => random_cardinal(&mut self.rng),
                    [only] => *only,
                    [horizontal, vertical, ..] => {
                        if dx > dy || (dx == dy && self.rng.gen_bool(0.5)) {
                            *horizontal
                        } else {
                            *vertical
                        }
                    }
                }
            }
            None => random_cardinal(&mut self.rng),
        };
        (direction.dx(), direction.dy())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crawl_core::math::Fixed;

    fn store_with_player(cell: Cell) -> ActorStore {
        let mut store = ActorStore::new();
        store.insert(MobileActor::new(ActorKind::Player, cell, Fixed::ZERO, 1));
        store
    }

    #[test]
    fn test_closing_steps() {
        assert_eq!(
            closing_steps(Cell::new(0, 0), Cell::new(3, -2)),
            vec![Direction::RIGHT, Direction::DOWN]
        );
        assert!(closing_steps(Cell::new(1, 1), Cell::new(1, 1)).is_empty());
    }

    #[test]
    fn test_chase_takes_longer_axis() {
        let store = store_with_player(Cell::new(0, 0));
        let enemy = MobileActor::new(ActorKind::Enemy, Cell::new(6, 2), Fixed::ZERO, 2);
        let mut planner = ChasePlanner::new(1);
        for _ in 0..20 {
            assert_eq!(planner.plan_move(&enemy, &store), (-1, 0));
        }
    }

    #[test]
    fn test_chase_always_closes_distance() {
        let store = store_with_player(Cell::new(2, 2));
        let enemy = MobileActor::new(ActorKind::Enemy, Cell::new(5, 5), Fixed::ZERO, 2);
        let mut planner = ChasePlanner::new(9);
        for _ in 0..20 {
            let step = planner.plan_move(&enemy, &store);
            assert!(step == (-1, 0) || step == (0, -1));
        }
    }

    #[test]
    fn test_exit_seeker_is_reproducible() {
        use crawl_test_utils::fixtures::quick_session_config;
        let session = GameSession::new(quick_session_config(3)).unwrap();
        let mut a = ExitSeeker::new(5);
        let mut b = ExitSeeker::new(5);
        for _ in 0..50 {
            assert_eq!(a.next_move(&session), b.next_move(&session));
        }
    }

    #[test]
    fn test_full_bias_heads_for_exit() {
        use crawl_test_utils::fixtures::quick_session_config;
        let session = GameSession::new(quick_session_config(3)).unwrap();
        let mut seeker = ExitSeeker::new(5);
        seeker.bias_percent = 100;
        for _ in 0..50 {
            let step = seeker.next_move(&session);
            assert!(step == Direction::RIGHT || step == Direction::UP);
        }
    }
}
