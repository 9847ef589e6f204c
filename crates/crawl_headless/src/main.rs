//! Headless grid crawler runner.
//!
//! Runs the simulation without graphics for inspection and CI checks.
//!
//! # Usage
//!
//! ```bash
//! # Print a generated board
//! cargo run -p crawl_headless -- generate --level 4 --seed 7
//!
//! # Play a scripted session and print a JSON summary
//! cargo run -p crawl_headless -- run --levels 3 --max-turns 500 --seed 1
//!
//! # Generate and check many boards in parallel
//! cargo run -p crawl_headless -- batch --count 1000 --level 8 --parallel 4
//!
//! # Check a config file, or print the defaults
//! cargo run -p crawl_headless -- validate --config session.ron
//! cargo run -p crawl_headless -- validate --print-default
//! ```
//!
//! JSON results go to stdout; logs go to stderr. `RUST_LOG` overrides the
//! default log level.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crawl_core::board::generate_board;
use crawl_core::session::SessionConfig;
use crawl_headless::{
    ascii::{render_board, AsciiConfig},
    batch::{run_batch, BatchConfig},
    config_loader::{load_session_config, session_config_to_ron},
    runner::{run_session, RunConfig},
    RunnerError,
};

#[derive(Parser)]
#[command(name = "crawl_headless")]
#[command(about = "Headless grid crawler runner for inspection and CI")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate one board and print it
    Generate {
        /// Level to generate
        #[arg(short, long, default_value = "1")]
        level: u32,

        /// Generator seed
        #[arg(long, default_value = "0")]
        seed: u64,

        /// RON session config supplying the board parameters
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Print the placements as JSON instead of ASCII
        #[arg(long)]
        json: bool,
    },

    /// Play a scripted session
    Run {
        /// Levels to clear
        #[arg(short, long, default_value = "3")]
        levels: u32,

        /// Player turns before giving up
        #[arg(short, long, default_value = "500")]
        max_turns: u64,

        /// Session seed (overrides the config file)
        #[arg(long)]
        seed: Option<u64>,

        /// RON session config
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Generate many boards and check their layout
    Batch {
        /// Number of boards
        #[arg(short = 'n', long, default_value = "100")]
        count: u32,

        /// Level to generate
        #[arg(short, long, default_value = "1")]
        level: u32,

        /// Starting seed
        #[arg(long, default_value = "0")]
        seed: u64,

        /// RON session config supplying the board parameters
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Maximum worker threads (0 = auto)
        #[arg(short, long, default_value = "0")]
        parallel: u32,
    },

    /// Load and validate a session config
    Validate {
        /// RON session config
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Print the default config as RON
        #[arg(long)]
        print_default: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries results
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(filter)
        .init();

    let result = match cli.command {
        Commands::Generate {
            level,
            seed,
            config,
            json,
        } => cmd_generate(level, seed, config, json),
        Commands::Run {
            levels,
            max_turns,
            seed,
            config,
        } => cmd_run(levels, max_turns, seed, config),
        Commands::Batch {
            count,
            level,
            seed,
            config,
            parallel,
        } => cmd_batch(count, level, seed, config, parallel),
        Commands::Validate {
            config,
            print_default,
        } => cmd_validate(config, print_default),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn session_config(path: Option<PathBuf>) -> Result<SessionConfig, RunnerError> {
    match path {
        Some(path) => {
            tracing::info!("Loading config from {}", path.display());
            load_session_config(path)
        }
        None => Ok(SessionConfig::default()),
    }
}

/// Generate one board and print it
fn cmd_generate(
    level: u32,
    seed: u64,
    config: Option<PathBuf>,
    json: bool,
) -> Result<(), RunnerError> {
    let config = session_config(config)?;
    let board = generate_board(level, &config.board, seed)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&board)?);
    } else {
        print!("{}", render_board(&board, &AsciiConfig::default()));
    }
    Ok(())
}

/// Play a scripted session and print its summary
fn cmd_run(
    levels: u32,
    max_turns: u64,
    seed: Option<u64>,
    config: Option<PathBuf>,
) -> Result<(), RunnerError> {
    let mut session = session_config(config)?;
    if let Some(seed) = seed {
        session.seed = seed;
    }
    let run = RunConfig {
        levels,
        max_turns,
        session,
    };

    let summary = run_session(&run)?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

/// Generate a batch of boards and report layout problems
fn cmd_batch(
    count: u32,
    level: u32,
    seed: u64,
    config: Option<PathBuf>,
    parallel: u32,
) -> Result<(), RunnerError> {
    let session = session_config(config)?;
    let batch = BatchConfig {
        count,
        level,
        seed_start: seed,
        parallel,
        board: session.board,
    };

    let report = run_batch(batch);
    println!("{}", serde_json::to_string_pretty(&report)?);

    if !report.violations.is_empty() {
        eprintln!(
            "FAIL: {} layout violations across {} boards",
            report.violations.len(),
            report.generated
        );
        std::process::exit(1);
    }
    if !report.failures.is_empty() {
        eprintln!(
            "WARN: {} of {} boards failed to generate",
            report.failures.len(),
            count
        );
    }
    Ok(())
}

/// Validate a config file
fn cmd_validate(config: Option<PathBuf>, print_default: bool) -> Result<(), RunnerError> {
    if print_default {
        println!("{}", session_config_to_ron(&SessionConfig::default())?);
    }
    if let Some(path) = config {
        let loaded = load_session_config(&path)?;
        eprintln!("PASS: {} is valid", path.display());
        tracing::debug!(?loaded, "Validated config");
    } else if !print_default {
        eprintln!("Nothing to validate: pass --config or --print-default");
        std::process::exit(2);
    }
    Ok(())
}
