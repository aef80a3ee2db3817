//! End-of-game "What Could I Have Done Differently?" report.

use std::sync::Arc;

use trailwise_domain::{HistoryEntry, ScoreBreakdown};

use crate::infrastructure::ports::{LlmError, LlmPort, LlmRequest};

/// Reasoning budget for the analysis model.
pub const ANALYSIS_THINKING_BUDGET: u32 = 4096;

/// Returned when the model answers with nothing.
pub const ANALYSIS_UNAVAILABLE: &str = "Analysis unavailable.";

/// Returned when the model call fails.
pub const ANALYSIS_FAILED: &str = "Could not retrieve mission data.";

pub struct AnalysisReporter {
    llm: Arc<dyn LlmPort>,
    model: String,
}

impl AnalysisReporter {
    pub fn new(llm: Arc<dyn LlmPort>, model: impl Into<String>) -> Self {
        Self {
            llm,
            model: model.into(),
        }
    }

    /// Markdown retrospective of a finished game. Never fails; see
    /// `ANALYSIS_UNAVAILABLE` and `ANALYSIS_FAILED`.
    pub async fn report(&self, history: &[HistoryEntry], scores: &ScoreBreakdown) -> String {
        match self.try_report(history, scores).await {
            Ok(text) if text.trim().is_empty() => ANALYSIS_UNAVAILABLE.to_string(),
            Ok(text) => {
                tracing::info!(turns = history.len(), chars = text.len(), "Analysis generated");
                text
            }
            Err(e) => {
                tracing::warn!(error = %e, turns = history.len(), "Analysis failed");
                ANALYSIS_FAILED.to_string()
            }
        }
    }

    async fn try_report(
        &self,
        history: &[HistoryEntry],
        scores: &ScoreBreakdown,
    ) -> Result<String, LlmError> {
        let prompt = build_prompt(history, scores)?;
        let request = LlmRequest::new(self.model.clone(), prompt)
            .with_thinking_budget(ANALYSIS_THINKING_BUDGET);

        tracing::debug!(model = %self.model, turns = history.len(), "Requesting analysis from LLM");

        let response = self.llm.generate(request).await?;
        Ok(response.content)
    }
}

fn transcript(history: &[HistoryEntry]) -> String {
    history
        .iter()
        .enumerate()
        .map(|(i, h)| {
            format!(
                "Turn {}:\nSituation: {}\nAction: {}\nResult: {}",
                i + 1,
                h.scenario_description,
                h.choice,
                h.outcome
            )
        })
        .collect::<Vec<_>>()
        .join("\n---\n")
}

fn build_prompt(history: &[HistoryEntry], scores: &ScoreBreakdown) -> Result<String, LlmError> {
    let scores_json = serde_json::to_string(scores).map_err(LlmError::call_failed)?;
    let weakest = scores.lowest_category();

    Ok(format!(
        r#"Analyze this Backcountry Safety session.
Final Scores: {scores_json}
Lowest Category: {weakest}

History:
{transcript}

Provide a "What Could I Have Done Differently?" Report:
1. **Key Turning Points**: Identify the exact moment things went right or wrong.
2. **Better Alternatives**: Specifically, what option should they have picked and why?
3. **Ideal Sequence**: Briefly describe the "Perfect Run" for this scenario.
4. **Category Breakdown**: Comment on their lowest score category (e.g. if Nav is low, explain why).

Tone: Constructive, educational, safety-focused. Markdown format."#,
        weakest = weakest.display_name(),
        transcript = transcript(history),
    ))
}
