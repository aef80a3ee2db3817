//! Unified error types for the domain layer
//!
//! Domain operations are pure; the only things that can go wrong are asking
//! the game to move between phases it cannot move between, and parsing
//! labels that do not name a known value.

use thiserror::Error;

use crate::game::GamePhase;

/// Unified error type for domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Parse error (for value objects)
    #[error("Parse error: {0}")]
    Parse(String),

    /// State transition not allowed
    #[error("Invalid state transition: cannot {action} while in {from} phase")]
    InvalidStateTransition {
        from: GamePhase,
        action: &'static str,
    },
}

impl DomainError {
    /// Creates a parse error for string-to-type conversion failures.
    ///
    /// Use this in `FromStr` implementations when the input string
    /// doesn't match any known variant.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Create an invalid state transition error
    pub fn invalid_state_transition(from: GamePhase, action: &'static str) -> Self {
        Self::InvalidStateTransition { from, action }
    }
}
