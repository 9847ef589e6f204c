//! ASCII rendering of boards and running sessions.
//!
//! Rows are printed top to bottom (highest `y` first) so the exit appears
//! in the top-right corner, matching the in-game orientation.

use std::collections::BTreeMap;
use std::fmt::Write;

use crawl_core::actors::ActorKind;
use crawl_core::board::{EntityKind, GeneratedBoard};
use crawl_core::collision::BlockingKind;
use crawl_core::grid::Cell;
use crawl_core::session::GameSession;

/// Glyph for the player.
pub const PLAYER_GLYPH: char = '@';

/// ASCII rendering options.
#[derive(Debug, Clone)]
pub struct AsciiConfig {
    /// Include the boundary ring.
    pub show_ring: bool,
    /// Append a legend with per-kind counts.
    pub show_legend: bool,
}

impl Default for AsciiConfig {
    fn default() -> Self {
        Self {
            show_ring: true,
            show_legend: true,
        }
    }
}

/// Inclusive `(low, high_x, high_y)` cell bounds to draw.
fn bounds(board: &GeneratedBoard, config: &AsciiConfig) -> (i32, i32, i32) {
    let (columns, rows) = (board.config.columns as i32, board.config.rows as i32);
    if config.show_ring {
        (-1, columns, rows)
    } else {
        (0, columns - 1, rows - 1)
    }
}

fn render_grid(
    board: &GeneratedBoard,
    config: &AsciiConfig,
    overlay: &BTreeMap<Cell, char>,
) -> String {
    let (low, high_x, high_y) = bounds(board, config);
    let mut out = String::new();
    for y in (low..=high_y).rev() {
        for x in low..=high_x {
            let cell = Cell::new(x, y);
            let glyph = overlay
                .get(&cell)
                .copied()
                .or_else(|| board.top_at(cell).map(|p| p.kind.glyph()))
                .unwrap_or(' ');
            out.push(glyph);
        }
        out.push('\n');
    }
    out
}

fn legend(board: &GeneratedBoard) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "level {}", board.level);
    for kind in EntityKind::ALL {
        if matches!(kind, EntityKind::Floor) {
            continue;
        }
        let _ = writeln!(out, "  {} {:?}: {}", kind.glyph(), kind, board.count(kind));
    }
    out
}

/// Render a freshly generated board.
#[must_use]
pub fn render_board(board: &GeneratedBoard, config: &AsciiConfig) -> String {
    let mut out = render_grid(board, config, &BTreeMap::new());
    if config.show_legend {
        out.push_str(&legend(board));
    }
    out
}

/// Render a session: static tiles from the board, actors at their
/// current cells. Enemy spawn tiles are drawn as floor once play starts.
#[must_use]
pub fn render_session(session: &GameSession, config: &AsciiConfig) -> String {
    let board = session.board();
    let mut overlay = BTreeMap::new();
    for cell in board.cells_of(EntityKind::Enemy) {
        overlay.insert(cell, EntityKind::Floor.glyph());
    }
    for food in board.cells_of(EntityKind::Food) {
        let present = session
            .world()
            .colliders_at(food)
            .any(|c| c.kind == BlockingKind::Food);
        if !present {
            overlay.insert(food, EntityKind::Floor.glyph());
        }
    }
    for id in session.actors().sorted_ids() {
        if let Some(actor) = session.actors().get(id) {
            let glyph = match actor.kind {
                ActorKind::Player => PLAYER_GLYPH,
                ActorKind::Enemy => EntityKind::Enemy.glyph(),
            };
            overlay.insert(actor.cell(), glyph);
        }
    }

    let mut out = render_grid(board, config, &overlay);
    if config.show_legend {
        let _ = writeln!(
            out,
            "level {}  turn {}  {:?}",
            session.level(),
            session.scheduler().turn(),
            session.state()
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crawl_core::board::generate_board;
    use crawl_test_utils::fixtures::{open_board, quick_session_config, scenario_board};

    #[test]
    fn test_board_dimensions_include_ring() {
        let board = generate_board(1, &scenario_board(), 3).unwrap();
        let text = render_board(
            &board,
            &AsciiConfig {
                show_legend: false,
                ..AsciiConfig::default()
            },
        );
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 10);
        assert!(lines.iter().all(|l| l.chars().count() == 10));
        assert_eq!(lines[0], "##########");
        assert_eq!(lines[9], "##########");
        // Exit sits just inside the top-right corner.
        assert_eq!(lines[1].chars().nth(8), Some('X'));
    }

    #[test]
    fn test_legend_counts() {
        let board = generate_board(4, &scenario_board(), 3).unwrap();
        let text = render_board(&board, &AsciiConfig::default());
        assert!(text.contains("E Enemy: 2"));
        assert!(text.contains("w InnerWall: 2"));
        assert!(text.contains("# OuterWall: 36"));
    }

    #[test]
    fn test_session_shows_player_at_origin() {
        let config = quick_session_config(1).with_board(open_board(8, 8));
        let session = GameSession::new(config).unwrap();
        let text = render_session(
            &session,
            &AsciiConfig {
                show_ring: false,
                show_legend: false,
            },
        );
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 8);
        assert_eq!(lines[7].chars().next(), Some(PLAYER_GLYPH));
        assert_eq!(lines[0].chars().last(), Some('X'));
    }
}
