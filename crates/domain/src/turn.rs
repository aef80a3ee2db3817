//! Turn records: what an evaluation returns and what the history keeps.

use serde::{Deserialize, Serialize};

use crate::scenario::Choice;
use crate::score::ScoreDeltas;

/// Continuation of the current scenario after a turn that did not end the game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NextScenarioPart {
    pub description: String,
    pub choices: Vec<Choice>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationResult {
    pub outcome_text: String,
    pub score_deltas: ScoreDeltas,
    pub is_game_over: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_over_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_scenario_part: Option<NextScenarioPart>,
}

impl EvaluationResult {
    /// Result used when a turn could not be evaluated: no score change, the
    /// game continues, and the narrative simply does not move.
    pub fn neutral() -> Self {
        Self {
            outcome_text: "System interference. Action recorded.".to_string(),
            score_deltas: ScoreDeltas::default(),
            is_game_over: false,
            game_over_reason: None,
            next_scenario_part: None,
        }
    }
}

/// One completed turn. Entries are appended and never changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub scenario_description: String,
    pub choice: String,
    pub outcome: String,
    pub score_deltas: ScoreDeltas,
}
