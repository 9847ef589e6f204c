//! Headless runner for the grid crawler simulation.
//!
//! This crate drives `crawl_core` without any rendering front end:
//!
//! - **Board inspection**: generate a level and print it as ASCII
//! - **Scripted play**: run a seeded session to a level or turn limit
//! - **Batch validation**: generate many boards in parallel and check
//!   the layout rules
//! - **Config validation**: load a RON session config and report errors
//!
//! Results are written as JSON on stdout; logs go to stderr.
//!
//! # Example
//!
//! ```bash
//! cargo run -p crawl_headless -- generate --level 4 --seed 7
//! cargo run -p crawl_headless -- run --levels 3 --max-turns 500 --seed 1
//! cargo run -p crawl_headless -- batch --count 1000 --level 8
//! cargo run -p crawl_headless -- validate --config session.ron
//! ```

pub mod ascii;
pub mod batch;
pub mod config_loader;
pub mod runner;
pub mod strategies;

pub use ascii::{render_board, render_session, AsciiConfig};
pub use batch::{check_layout, run_batch, BatchConfig, BatchReport};
pub use config_loader::{load_session_config, RunnerError};
pub use runner::{run_session, RunConfig, RunOutcome, RunSummary};
pub use strategies::{ChasePlanner, ExitSeeker};
