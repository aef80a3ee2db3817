//! LLM doubles shared by the coordinator and HTTP tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::infrastructure::config::ModelConfig;
use crate::infrastructure::ports::{LlmError, LlmPort, LlmRequest, LlmResponse};

pub const SCENARIO_MODEL: &str = "test-scenario";
pub const EVALUATION_MODEL: &str = "test-evaluation";
pub const ANALYSIS_MODEL: &str = "test-analysis";
pub const COACH_MODEL: &str = "test-coach";

/// One model name per operation so scripted replies can be routed by model.
pub fn test_models() -> ModelConfig {
    ModelConfig {
        scenario: SCENARIO_MODEL.to_string(),
        evaluation: EVALUATION_MODEL.to_string(),
        analysis: ANALYSIS_MODEL.to_string(),
        coach: COACH_MODEL.to_string(),
    }
}

pub const DESERT_SCENARIO: &str = r#"{
  "title": "Noon in the Wash",
  "description": "Your group is two hours from the trailhead and the water is running low.",
  "location": {"name": "Anza-Borrego", "lat": 33.25, "lng": -116.4, "terrainType": "Desert wash"},
  "environment": {
    "timeOfDay": "Noon", "weather": "Clear", "temperature": "43°C",
    "visibility": "Good", "signalStrength": "Weak", "distanceFromSafety": "6km"
  },
  "inventory": {"onPerson": ["Hat"], "inPack": ["Map"], "atCampOrVehicle": []},
  "choices": [
    {"id": "a", "text": "Rest in shade until evening"},
    {"id": "b", "text": "Push on to the trailhead"}
  ],
  "estimatedDuration": 4
}"#;

pub const SHADE_OUTCOME: &str = r#"{
  "outcomeText": "You wait out the heat under a ledge.",
  "scoreDeltas": {"weather": 3, "timing": -1},
  "isGameOver": false,
  "nextScenarioDescription": "The sun is setting and the air is cooling.",
  "nextChoices": [{"id": "a", "text": "Hike out by headlamp"}]
}"#;

pub const HEATSTROKE_OUTCOME: &str = r#"{
  "outcomeText": "You collapse on the trail.",
  "scoreDeltas": {"weather": -5, "riskManagement": -3},
  "isGameOver": true,
  "gameOverReason": "Heatstroke"
}"#;

/// Replies by model name; each model serves its queue in order and repeats the
/// last reply once the queue runs dry. Unscripted models fail the call.
#[derive(Default)]
pub struct ScriptedLlm {
    replies: Mutex<HashMap<String, Vec<String>>>,
    requests: Mutex<Vec<LlmRequest>>,
}

impl ScriptedLlm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, model: &str, text: impl Into<String>) -> Self {
        self.replies
            .lock()
            .unwrap()
            .entry(model.to_string())
            .or_default()
            .push(text.into());
        self
    }

    pub fn requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn calls_to(&self, model: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.model == model)
            .count()
    }
}

#[async_trait]
impl LlmPort for ScriptedLlm {
    async fn generate(&self, request: LlmRequest) -> Result<LlmResponse, LlmError> {
        let model = request.model.clone();
        self.requests.lock().unwrap().push(request);

        let mut replies = self.replies.lock().unwrap();
        let queue = replies
            .get_mut(&model)
            .ok_or_else(|| LlmError::call_failed(format!("no script for {model}")))?;
        let text = if queue.len() > 1 {
            queue.remove(0)
        } else {
            queue
                .first()
                .cloned()
                .ok_or_else(|| LlmError::call_failed(format!("no script for {model}")))?
        };
        Ok(LlmResponse::text(text))
    }
}

/// Holds every call open until released, signalling when a call has started.
pub struct GatedLlm {
    pub started: Arc<Notify>,
    pub release: Arc<Notify>,
    reply: String,
}

impl GatedLlm {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            started: Arc::new(Notify::new()),
            release: Arc::new(Notify::new()),
            reply: reply.into(),
        }
    }
}

#[async_trait]
impl LlmPort for GatedLlm {
    async fn generate(&self, _request: LlmRequest) -> Result<LlmResponse, LlmError> {
        self.started.notify_one();
        self.release.notified().await;
        Ok(LlmResponse::text(self.reply.clone()))
    }
}
