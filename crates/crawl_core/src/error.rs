//! Error types for the game simulation.

use thiserror::Error;

use crate::actors::ActorId;
use crate::board::EntityKind;
use crate::turn::TurnState;

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Top-level error type for all game simulation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    /// Generation asked for more non-overlapping placements than there are
    /// candidate cells left.
    #[error("Insufficient space for {kind:?}: requested {requested}, {available} candidate cells left")]
    InsufficientSpace {
        /// Category being placed when the candidate set ran out.
        kind: EntityKind,
        /// Number of placements requested for that category.
        requested: usize,
        /// Candidate cells remaining at that point.
        available: usize,
    },

    /// Move direction is not a single grid step.
    #[error("Invalid direction ({dx}, {dy}): expected a unit step")]
    InvalidDirection {
        /// Horizontal component.
        dx: i32,
        /// Vertical component.
        dy: i32,
    },

    /// Stale enemy reference found in a registry snapshot.
    #[error("Registry references missing actor {0}")]
    RegistryInconsistency(ActorId),

    /// Actor lookup failed.
    #[error("Actor not found: {0}")]
    ActorNotFound(ActorId),

    /// A tile set has no variants to choose from.
    #[error("Tile set for {0:?} has no variants")]
    EmptyTileSet(EntityKind),

    /// Configuration values are out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Player input arrived outside the player's turn.
    #[error("Input rejected during {state:?}")]
    InputRejected {
        /// Turn state at the time of the input.
        state: TurnState,
    },

    /// Input arrived while the session is paused.
    #[error("Session is paused")]
    SessionPaused,

    /// The session has ended; no further turns are played.
    #[error("Session is over")]
    SessionOver,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_space_message() {
        let err = GameError::InsufficientSpace {
            kind: EntityKind::Enemy,
            requested: 3,
            available: 1,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient space for Enemy: requested 3, 1 candidate cells left"
        );
    }

    #[test]
    fn test_input_rejected_names_state() {
        let err = GameError::InputRejected {
            state: TurnState::EnemyTurnRunning,
        };
        assert!(err.to_string().contains("EnemyTurnRunning"));
    }
}
