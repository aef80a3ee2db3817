//! Trailwise domain: scenarios, scoring, turn history and the game state machine.
//!
//! Everything here is pure data and pure transitions. Model calls and
//! session ownership live in `trailwise-engine`.

pub mod chat;
pub mod error;
pub mod game;
pub mod game_mode;
pub mod ids;
pub mod scenario;
pub mod score;
pub mod turn;

pub use chat::{ChatMessage, ChatRole, Conversation, COACH_GREETING};
pub use error::DomainError;
pub use game::{GamePhase, GameState};
pub use game_mode::{GameMode, ScenarioRequest};
pub use ids::{GameId, ScenarioId};
pub use scenario::{
    Choice, Environment, Inventory, Location, Scenario, ScenarioTheme, SignalStrength, Visibility,
    DEFAULT_ESTIMATED_DURATION, RETRY_CHOICE_ID,
};
pub use score::{ScoreBreakdown, ScoreCategory, ScoreDeltas};
pub use turn::{EvaluationResult, HistoryEntry, NextScenarioPart};
