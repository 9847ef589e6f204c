//! Session configuration loading.
//!
//! Configs are RON files holding a [`SessionConfig`]. Every field has a
//! default, so a file only needs the values it changes:
//!
//! ```ron
//! (
//!     board: (columns: 10, rows: 10, wall_count: (minimum: 2, maximum: 5), food_count: (minimum: 1, maximum: 2)),
//!     seed: 7,
//! )
//! ```

use std::path::Path;

use crawl_core::error::GameError;
use crawl_core::session::SessionConfig;
use thiserror::Error;

/// Error type for headless runner operations.
#[derive(Error, Debug)]
pub enum RunnerError {
    /// File not found.
    #[error("Config file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// Failed to serialize output.
    #[error("Failed to write JSON: {0}")]
    JsonError(#[from] serde_json::Error),
    /// The simulation rejected the config or failed.
    #[error(transparent)]
    Game(#[from] GameError),
}

/// Load and validate a session config from a RON file.
///
/// # Errors
///
/// [`RunnerError::FileNotFound`], read and parse errors, or the
/// validation error from [`SessionConfig::validate`].
pub fn load_session_config<P: AsRef<Path>>(path: P) -> Result<SessionConfig, RunnerError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(RunnerError::FileNotFound(path.display().to_string()));
    }
    let contents = std::fs::read_to_string(path)?;
    session_config_from_ron_str(&contents)
}

/// Parse and validate a session config from a RON string.
///
/// # Errors
///
/// Parse errors or the validation error from [`SessionConfig::validate`].
pub fn session_config_from_ron_str(ron: &str) -> Result<SessionConfig, RunnerError> {
    let config: SessionConfig = ron::from_str(ron)?;
    config.validate()?;
    Ok(config)
}

/// Render a config as pretty RON (used to print the defaults).
///
/// # Errors
///
/// Serialization errors are reported as [`RunnerError::Game`] with an
/// invalid-config message.
pub fn session_config_to_ron(config: &SessionConfig) -> Result<String, RunnerError> {
    ron::ser::to_string_pretty(config, ron::ser::PrettyConfig::default())
        .map_err(|e| RunnerError::Game(GameError::InvalidConfig(e.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = session_config_from_ron_str("(seed: 9, start_level: 3)").unwrap();
        assert_eq!(config.seed, 9);
        assert_eq!(config.start_level, 3);
        assert_eq!(config.board, SessionConfig::default().board);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = session_config_from_ron_str(
            "(board: (columns: 8, rows: 8, wall_count: (minimum: 5, maximum: 2), food_count: (minimum: 1, maximum: 1)))",
        )
        .unwrap_err();
        assert!(matches!(err, RunnerError::Game(GameError::InvalidConfig(_))));
    }

    #[test]
    fn test_parse_error_reported() {
        let err = session_config_from_ron_str("(seed: \"nope\")").unwrap_err();
        assert!(matches!(err, RunnerError::ParseError(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "(seed: 42, player_move_duration_ms: 50)").unwrap();
        let config = load_session_config(file.path()).unwrap();
        assert_eq!(config.seed, 42);
        assert_eq!(config.player_move_duration_ms, 50);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_session_config(dir.path().join("absent.ron")).unwrap_err();
        assert!(matches!(err, RunnerError::FileNotFound(_)));
    }

    #[test]
    fn test_defaults_round_trip_through_ron() {
        let text = session_config_to_ron(&SessionConfig::default()).unwrap();
        let parsed = session_config_from_ron_str(&text).unwrap();
        assert_eq!(parsed, SessionConfig::default());
    }
}
