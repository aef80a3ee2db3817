//! Game state machine.
//!
//! `GameState` is the single state container for one play-through. Phases
//! move `disclaimer -> menu -> loading -> playing -> summary`, and every
//! change goes through one of the transition methods below. Each method
//! checks the current phase first and leaves the state untouched when the
//! transition is not allowed.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::scenario::Scenario;
use crate::score::{ScoreBreakdown, ScoreCategory};
use crate::turn::{EvaluationResult, HistoryEntry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GamePhase {
    #[default]
    Disclaimer,
    Menu,
    Loading,
    Playing,
    Summary,
}

impl GamePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disclaimer => "disclaimer",
            Self::Menu => "menu",
            Self::Loading => "loading",
            Self::Playing => "playing",
            Self::Summary => "summary",
        }
    }
}

impl std::fmt::Display for GamePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    phase: GamePhase,
    current_scenario: Option<Scenario>,
    history: Vec<HistoryEntry>,
    scores: ScoreBreakdown,
    total_turns: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    game_over_reason: Option<String>,
}

impl GameState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn current_scenario(&self) -> Option<&Scenario> {
        self.current_scenario.as_ref()
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn scores(&self) -> &ScoreBreakdown {
        &self.scores
    }

    pub fn total_turns(&self) -> u32 {
        self.total_turns
    }

    pub fn game_over_reason(&self) -> Option<&str> {
        self.game_over_reason.as_deref()
    }

    fn require(&self, allowed: &[GamePhase], action: &'static str) -> Result<(), DomainError> {
        if allowed.contains(&self.phase) {
            Ok(())
        } else {
            Err(DomainError::invalid_state_transition(self.phase, action))
        }
    }

    fn reset_play(&mut self) {
        self.current_scenario = None;
        self.history.clear();
        self.scores = ScoreBreakdown::new();
        self.total_turns = 0;
        self.game_over_reason = None;
    }

    /// `disclaimer -> menu`
    pub fn accept_disclaimer(&mut self) -> Result<(), DomainError> {
        self.require(&[GamePhase::Disclaimer], "accept the disclaimer")?;
        self.phase = GamePhase::Menu;
        Ok(())
    }

    /// `menu | summary -> loading`; starts a fresh game.
    pub fn begin_loading(&mut self) -> Result<(), DomainError> {
        self.require(&[GamePhase::Menu, GamePhase::Summary], "start a scenario")?;
        self.reset_play();
        self.phase = GamePhase::Loading;
        Ok(())
    }

    /// `loading -> playing`
    pub fn scenario_loaded(&mut self, scenario: Scenario) -> Result<(), DomainError> {
        self.require(&[GamePhase::Loading], "load a scenario")?;
        self.current_scenario = Some(scenario);
        self.phase = GamePhase::Playing;
        Ok(())
    }

    /// Replace the scenario while playing. Used when the player retries a
    /// failed generation from the fallback scenario.
    pub fn replace_scenario(&mut self, scenario: Scenario) -> Result<(), DomainError> {
        self.require(&[GamePhase::Playing], "replace the scenario")?;
        self.current_scenario = Some(scenario);
        Ok(())
    }

    /// Apply one evaluated turn.
    ///
    /// The turn is appended to the history and its deltas are added to the
    /// scores. A game-over result moves the game to `summary` with the
    /// reason kept verbatim; otherwise a next scenario part, if present,
    /// advances the current scenario.
    pub fn record_turn(
        &mut self,
        choice_text: impl Into<String>,
        result: &EvaluationResult,
    ) -> Result<(), DomainError> {
        self.require(&[GamePhase::Playing], "record a turn")?;

        let scenario_description = self
            .current_scenario
            .as_ref()
            .map(|s| s.description.clone())
            .unwrap_or_default();

        self.history.push(HistoryEntry {
            scenario_description,
            choice: choice_text.into(),
            outcome: result.outcome_text.clone(),
            score_deltas: result.score_deltas,
        });
        self.scores.apply(&result.score_deltas);
        self.total_turns = self.total_turns.saturating_add(1);

        if result.is_game_over {
            self.game_over_reason = result.game_over_reason.clone();
            self.phase = GamePhase::Summary;
        } else if let (Some(next), Some(scenario)) = (
            result.next_scenario_part.clone(),
            self.current_scenario.as_mut(),
        ) {
            scenario.advance(next);
        }

        Ok(())
    }

    /// `loading | playing | summary -> menu`; abandons the current game.
    pub fn return_to_menu(&mut self) -> Result<(), DomainError> {
        self.require(
            &[GamePhase::Loading, GamePhase::Playing, GamePhase::Summary],
            "return to the menu",
        )?;
        self.reset_play();
        self.phase = GamePhase::Menu;
        Ok(())
    }

    /// Describe the current situation for the coach.
    pub fn coach_context(&self) -> String {
        let mut parts = vec![format!("Game phase: {}", self.phase)];

        if let Some(scenario) = &self.current_scenario {
            parts.push(format!("Scenario: {}", scenario.title));
            parts.push(format!("Location: {} ({})", scenario.location.name, scenario.location.terrain_type));
            parts.push(format!("Situation: {}", scenario.description));
            parts.push(format!(
                "Conditions: {}, {}, {}, visibility {:?}, signal {:?}, {} from safety",
                scenario.environment.weather,
                scenario.environment.time_of_day,
                scenario.environment.temperature,
                scenario.environment.visibility,
                scenario.environment.signal_strength,
                scenario.environment.distance_from_safety,
            ));
            if !scenario.choices.is_empty() {
                let options: Vec<&str> = scenario.choices.iter().map(|c| c.text.as_str()).collect();
                parts.push(format!("Options: {}", options.join("; ")));
            }
        }

        if self.total_turns > 0 {
            parts.push(format!("Turns taken: {}", self.total_turns));
            let scores: Vec<String> = ScoreCategory::ALL
                .iter()
                .map(|c| format!("{} {}", c.display_name(), self.scores.get(*c)))
                .collect();
            parts.push(format!("Scores: {}", scores.join(", ")));
        }

        if let Some(reason) = &self.game_over_reason {
            parts.push(format!("Game over: {}", reason));
        }

        parts.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::Choice;
    use crate::score::ScoreDeltas;
    use crate::turn::NextScenarioPart;

    fn playing_state() -> GameState {
        let mut state = GameState::new();
        state.accept_disclaimer().unwrap();
        state.begin_loading().unwrap();
        let mut scenario = Scenario::fallback();
        scenario.description = "Lost near the wash.".to_string();
        scenario.turn_count = 1;
        state.scenario_loaded(scenario).unwrap();
        state
    }

    fn continuing(outcome: &str, nav: i32, next: &str) -> EvaluationResult {
        EvaluationResult {
            outcome_text: outcome.to_string(),
            score_deltas: ScoreDeltas::default().with(ScoreCategory::Navigation, nav),
            is_game_over: false,
            game_over_reason: None,
            next_scenario_part: Some(NextScenarioPart {
                description: next.to_string(),
                choices: vec![Choice::new("a", "Keep going")],
            }),
        }
    }

    #[test]
    fn full_phase_walk() {
        let mut state = GameState::new();
        assert_eq!(state.phase(), GamePhase::Disclaimer);
        state.accept_disclaimer().unwrap();
        assert_eq!(state.phase(), GamePhase::Menu);
        state.begin_loading().unwrap();
        assert_eq!(state.phase(), GamePhase::Loading);
        state.scenario_loaded(Scenario::fallback()).unwrap();
        assert_eq!(state.phase(), GamePhase::Playing);
        state.return_to_menu().unwrap();
        assert_eq!(state.phase(), GamePhase::Menu);
        assert!(state.current_scenario().is_none());
    }

    #[test]
    fn transitions_from_wrong_phase_are_rejected() {
        let mut state = GameState::new();
        let err = state.record_turn("Run", &EvaluationResult::neutral()).unwrap_err();
        assert_eq!(
            err,
            DomainError::InvalidStateTransition {
                from: GamePhase::Disclaimer,
                action: "record a turn",
            }
        );
        assert!(state.begin_loading().is_err());
        assert!(state.return_to_menu().is_err());
        assert!(state.history().is_empty());
    }

    #[test]
    fn turns_accumulate_and_advance_scenario() {
        let mut state = playing_state();

        state.record_turn("Check map", &continuing("You orient.", 2, "Ridge ahead.")).unwrap();
        state.record_turn("Climb", &continuing("You slip.", -5, "Loose scree.")).unwrap();
        state.record_turn("Back down", &continuing("Safer ground.", 3, "Trailhead visible.")).unwrap();

        assert_eq!(state.scores().navigation, 0);
        assert_eq!(state.total_turns(), 3);
        assert_eq!(state.history().len(), 3);
        assert_eq!(state.history()[0].scenario_description, "Lost near the wash.");
        assert_eq!(state.history()[1].scenario_description, "Ridge ahead.");
        assert_eq!(state.history()[2].choice, "Back down");

        let scenario = state.current_scenario().unwrap();
        assert_eq!(scenario.description, "Trailhead visible.");
        assert_eq!(scenario.turn_count, 4);
        assert_eq!(state.phase(), GamePhase::Playing);
    }

    #[test]
    fn neutral_turn_keeps_scenario() {
        let mut state = playing_state();
        state.record_turn("Wait", &EvaluationResult::neutral()).unwrap();

        assert_eq!(state.total_turns(), 1);
        assert_eq!(state.current_scenario().unwrap().description, "Lost near the wash.");
        assert_eq!(state.scores(), &ScoreBreakdown::new());
    }

    #[test]
    fn game_over_moves_to_summary_with_reason() {
        let mut state = playing_state();
        let result = EvaluationResult {
            outcome_text: "You collapse.".to_string(),
            score_deltas: ScoreDeltas::default().with(ScoreCategory::Timing, -8),
            is_game_over: true,
            game_over_reason: Some("Heatstroke".to_string()),
            next_scenario_part: None,
        };

        state.record_turn("Keep hiking at noon", &result).unwrap();

        assert_eq!(state.phase(), GamePhase::Summary);
        assert_eq!(state.game_over_reason(), Some("Heatstroke"));
        assert_eq!(state.scores().timing, -8);
        assert!(state.record_turn("Again", &EvaluationResult::neutral()).is_err());
    }

    #[test]
    fn new_game_from_summary_resets_play() {
        let mut state = playing_state();
        let mut over = EvaluationResult::neutral();
        over.is_game_over = true;
        over.score_deltas = ScoreDeltas::default().with(ScoreCategory::Weather, 5);
        state.record_turn("Shelter", &over).unwrap();

        state.begin_loading().unwrap();

        assert_eq!(state.phase(), GamePhase::Loading);
        assert!(state.history().is_empty());
        assert_eq!(state.total_turns(), 0);
        assert_eq!(state.scores().weather, 0);
        assert!(state.game_over_reason().is_none());
    }

    #[test]
    fn coach_context_describes_scenario_and_scores() {
        let mut state = playing_state();
        assert!(state.coach_context().contains("Situation: Lost near the wash."));
        assert!(!state.coach_context().contains("Scores:"));

        state.record_turn("Check map", &continuing("ok", 2, "Ridge ahead.")).unwrap();
        let context = state.coach_context();
        assert!(context.contains("Game phase: playing"));
        assert!(context.contains("Navigation 2"));
        assert!(context.contains("Turns taken: 1"));
    }

    #[test]
    fn serializes_with_wire_names() {
        let state = playing_state();
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["phase"], "playing");
        assert_eq!(json["totalTurns"], 0);
        assert!(json["currentScenario"].is_object());
        assert_eq!(json["scores"]["groupSafety"], 0);
    }
}
