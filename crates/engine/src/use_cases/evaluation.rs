//! Choice evaluation via LLM.
//!
//! Scores one player action in five safety categories and decides whether
//! the game continues. Failures degrade to `EvaluationResult::neutral()`,
//! so a bad turn stalls the narrative for one step instead of ending it.

use std::sync::Arc;

use serde_json::Value;
use trailwise_domain::{
    EvaluationResult, HistoryEntry, NextScenarioPart, Scenario, ScoreBreakdown, ScoreCategory,
    ScoreDeltas,
};

use crate::infrastructure::ports::{LlmError, LlmPort, LlmRequest};
use crate::use_cases::json_response::{
    lenient_bool, lenient_i32, non_empty_str, parse_object, JsonObject,
};
use crate::use_cases::scenario::parse_choices;

/// Token cap for evaluation replies.
pub const EVALUATION_MAX_TOKENS: u32 = 2000;

pub struct ChoiceEvaluator {
    llm: Arc<dyn LlmPort>,
    model: String,
}

impl ChoiceEvaluator {
    pub fn new(llm: Arc<dyn LlmPort>, model: impl Into<String>) -> Self {
        Self {
            llm,
            model: model.into(),
        }
    }

    /// Evaluate the chosen action.
    ///
    /// `scores` is context for the model only; the returned deltas are not
    /// applied here.
    pub async fn evaluate(
        &self,
        scenario: &Scenario,
        choice_text: &str,
        scores: &ScoreBreakdown,
        history: &[HistoryEntry],
    ) -> EvaluationResult {
        match self.try_evaluate(scenario, choice_text, scores, history).await {
            Ok(result) => {
                tracing::info!(
                    scenario_id = %scenario.id,
                    choice = %choice_text,
                    game_over = result.is_game_over,
                    continues = result.next_scenario_part.is_some(),
                    "Choice evaluated"
                );
                result
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    scenario_id = %scenario.id,
                    choice = %choice_text,
                    "Choice evaluation failed, using neutral result"
                );
                EvaluationResult::neutral()
            }
        }
    }

    async fn try_evaluate(
        &self,
        scenario: &Scenario,
        choice_text: &str,
        scores: &ScoreBreakdown,
        history: &[HistoryEntry],
    ) -> Result<EvaluationResult, LlmError> {
        let request = LlmRequest::new(
            self.model.clone(),
            build_prompt(scenario, choice_text, scores, history),
        )
        .with_json_response()
        .with_max_tokens(Some(EVALUATION_MAX_TOKENS));

        tracing::debug!(
            model = %self.model,
            history_turns = history.len(),
            "Requesting choice evaluation from LLM"
        );

        let response = self.llm.generate(request).await?;
        let data = parse_object(&response.content)?;
        Ok(result_from_payload(&data))
    }
}

/// `Turn N: Action="...", Result="..."` lines, or "None" before the first turn.
fn history_context(history: &[HistoryEntry]) -> String {
    if history.is_empty() {
        return "None".to_string();
    }
    history
        .iter()
        .enumerate()
        .map(|(i, h)| format!("Turn {}: Action=\"{}\", Result=\"{}\"", i + 1, h.choice, h.outcome))
        .collect::<Vec<_>>()
        .join("\n")
}

fn score_line(scores: &ScoreBreakdown) -> String {
    ScoreCategory::ALL
        .iter()
        .map(|c| format!("{}={}", c.key(), scores.get(*c)))
        .collect::<Vec<_>>()
        .join(", ")
}

fn build_prompt(
    scenario: &Scenario,
    choice_text: &str,
    scores: &ScoreBreakdown,
    history: &[HistoryEntry],
) -> String {
    format!(
        r#"Context: {description}
History: {history}
Env: {weather}, {time_of_day}, {temperature}
Scores so far: {scores}
Action: "{action}"

Evaluate this action. Return JSON.
Calculate score deltas (-10 to +10) for: navigation, weather, groupSafety, riskManagement, timing.
- Risk Management: Did they minimize unnecessary danger?
- Timing: Did they act fast enough or too rashly?

Structure:
{{
  "outcomeText": "What happens next...",
  "scoreDeltas": {{ "navigation": 0, "weather": 0, "groupSafety": 0, "riskManagement": 0, "timing": 0 }},
  "isGameOver": boolean,
  "gameOverReason": "string or null",
  "nextScenarioDescription": "New situation description if continuing...",
  "nextChoices": [{{ "id": "x", "text": "..." }}]
}}"#,
        description = scenario.description,
        history = history_context(history),
        weather = scenario.environment.weather,
        time_of_day = scenario.environment.time_of_day,
        temperature = scenario.environment.temperature,
        scores = score_line(scores),
        action = choice_text,
    )
}

fn parse_deltas(value: Option<&Value>) -> ScoreDeltas {
    let mut deltas = ScoreDeltas::default();
    let Some(object) = value.and_then(Value::as_object) else {
        return deltas;
    };
    for category in ScoreCategory::ALL {
        if let Some(delta) = object.get(category.key()).and_then(lenient_i32) {
            deltas.set(category, delta);
        }
    }
    deltas
}

fn result_from_payload(data: &JsonObject) -> EvaluationResult {
    let is_game_over = data.get("isGameOver").is_some_and(lenient_bool);

    // Game over wins over any continuation the model also supplied.
    let next_scenario_part = if is_game_over {
        None
    } else {
        non_empty_str(data.get("nextScenarioDescription")).map(|description| NextScenarioPart {
            description: description.to_string(),
            choices: parse_choices(data.get("nextChoices")),
        })
    };

    EvaluationResult {
        outcome_text: non_empty_str(data.get("outcomeText"))
            .unwrap_or("Outcome processed.")
            .to_string(),
        score_deltas: parse_deltas(data.get("scoreDeltas")),
        is_game_over,
        game_over_reason: data
            .get("gameOverReason")
            .and_then(Value::as_str)
            .map(str::to_string),
        next_scenario_part,
    }
}
