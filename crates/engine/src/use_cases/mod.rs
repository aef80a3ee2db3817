//! Use cases - game operations orchestrated over the LLM port.
//!
//! The four model-backed operations each live in their own module and never
//! fail: errors resolve to a fixed fallback. The coordinator in `game` ties
//! them to per-game state.

pub mod analysis;
pub mod coach;
pub mod evaluation;
pub mod game;
pub mod json_response;
pub mod scenario;

pub use analysis::AnalysisReporter;
pub use coach::ChatCoach;
pub use evaluation::ChoiceEvaluator;
pub use game::{CoachReply, GameCoordinator, GameError, TurnOutcome};
pub use scenario::ScenarioGenerator;
