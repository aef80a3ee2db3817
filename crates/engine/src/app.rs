//! Application state and composition.

use std::sync::Arc;
use std::time::Duration;

use crate::infrastructure::{
    config::ModelConfig,
    ports::{ClockPort, LlmPort},
};
use crate::use_cases;

/// Main application state.
///
/// Passed to HTTP handlers via Axum state.
pub struct App {
    pub use_cases: UseCases,
}

/// Container for all use cases.
pub struct UseCases {
    pub game: use_cases::GameCoordinator,
}

impl App {
    /// Create a new App with all dependencies wired up.
    pub fn new(
        llm: Arc<dyn LlmPort>,
        clock: Arc<dyn ClockPort>,
        models: &ModelConfig,
        session_idle: Duration,
    ) -> Self {
        let game = use_cases::GameCoordinator::new(
            use_cases::ScenarioGenerator::new(llm.clone(), clock.clone(), models.scenario.clone()),
            use_cases::ChoiceEvaluator::new(llm.clone(), models.evaluation.clone()),
            use_cases::AnalysisReporter::new(llm.clone(), models.analysis.clone()),
            use_cases::ChatCoach::new(llm, models.coach.clone()),
            clock,
        )
        .with_idle_timeout(session_idle);

        tracing::debug!(
            scenario = %models.scenario,
            evaluation = %models.evaluation,
            analysis = %models.analysis,
            coach = %models.coach,
            session_idle_secs = session_idle.as_secs(),
            "Use cases wired"
        );

        Self {
            use_cases: UseCases { game },
        }
    }
}
