//! Scenario generation via LLM.
//!
//! Builds the generation prompt from the player's menu choices, asks the
//! model for a scenario grounded in a real region, and turns the reply into
//! a `Scenario`. Any failure yields `Scenario::fallback()` so the caller
//! always has something playable.

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::Value;
use trailwise_domain::{
    Choice, Environment, Inventory, Location, Scenario, ScenarioId, ScenarioRequest, ScenarioTheme,
    SignalStrength, Visibility, DEFAULT_ESTIMATED_DURATION,
};

use crate::infrastructure::ports::{ClockPort, LlmError, LlmPort, LlmRequest};
use crate::use_cases::json_response::{
    lenient_f64, lenient_id, non_empty_str, parse_object, JsonObject,
};

pub struct ScenarioGenerator {
    llm: Arc<dyn LlmPort>,
    clock: Arc<dyn ClockPort>,
    model: String,
}

impl ScenarioGenerator {
    pub fn new(llm: Arc<dyn LlmPort>, clock: Arc<dyn ClockPort>, model: impl Into<String>) -> Self {
        Self {
            llm,
            clock,
            model: model.into(),
        }
    }

    /// Generate a scenario, falling back to the fixed "Signal Lost" scenario on any failure.
    pub async fn generate(&self, request: &ScenarioRequest) -> Scenario {
        match self.try_generate(request).await {
            Ok(scenario) => {
                tracing::info!(
                    scenario_id = %scenario.id,
                    title = %scenario.title,
                    theme = %scenario.theme,
                    choices = scenario.choices.len(),
                    grounded = scenario.location.map_url.is_some(),
                    "Scenario generated"
                );
                scenario
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    difficulty = %request.difficulty,
                    environment = %request.environment,
                    mode = %request.mode,
                    "Scenario generation failed, using fallback scenario"
                );
                Scenario::fallback()
            }
        }
    }

    async fn try_generate(&self, request: &ScenarioRequest) -> Result<Scenario, LlmError> {
        let llm_request =
            LlmRequest::new(self.model.clone(), build_prompt(request)).with_map_grounding();

        tracing::debug!(
            model = %self.model,
            mode = %request.mode,
            "Requesting scenario from LLM"
        );

        let response = self.llm.generate(llm_request).await?;
        let data = parse_object(&response.content)?;

        let mut scenario = scenario_from_payload(
            &data,
            request,
            ScenarioId::from_timestamp_millis(self.clock.now().timestamp_millis()),
        )
        .ok_or_else(|| LlmError::malformed(response.content.clone()))?;
        scenario.location.map_url = response.map_uri;

        Ok(scenario)
    }
}

fn build_prompt(request: &ScenarioRequest) -> String {
    format!(
        r#"Create a backcountry survival scenario.
Difficulty: {difficulty}
Environment: {environment}
Game Mode: {mode}
{instructions}
User Notes: {notes}

Realistic, educational, no horror.
Use Google Maps to find a real region fitting the description.

Return ONLY JSON:
{{
  "title": "Short title",
  "description": "Situation description (2-3 sentences).",
  "theme": "normal" | "night" | "heat",
  "location": {{
    "name": "Region Name",
    "lat": 0.0,
    "lng": 0.0,
    "terrainType": "Terrain description"
  }},
  "environment": {{
    "timeOfDay": "e.g. Dusk",
    "weather": "e.g. Clear",
    "temperature": "e.g. 35°C / 95°F",
    "visibility": "Good/Fair/Poor",
    "signalStrength": "None/Weak/Strong",
    "distanceFromSafety": "e.g. 5km"
  }},
  "inventory": {{
    "onPerson": ["Item 1"],
    "inPack": ["Item 2"],
    "atCampOrVehicle": ["Item 3"]
  }},
  "choices": [
    {{ "id": "a", "text": "Option A" }},
    {{ "id": "b", "text": "Option B" }},
    {{ "id": "c", "text": "Option C" }}
  ],
  "estimatedDuration": 5
}}"#,
        difficulty = request.difficulty,
        environment = request.environment,
        mode = request.mode,
        instructions = request.mode.instructions(),
        notes = request.notes_or_none(),
    )
}

/// Build a scenario from the model's JSON. Returns `None` when the payload
/// offers no usable choices.
fn scenario_from_payload(
    data: &JsonObject,
    request: &ScenarioRequest,
    id: ScenarioId,
) -> Option<Scenario> {
    let choices = parse_choices(data.get("choices"));
    if choices.is_empty() {
        return None;
    }

    let theme = request.mode.theme();
    if let Some(claimed) = non_empty_str(data.get("theme")).and_then(ScenarioTheme::from_label) {
        if claimed != theme {
            tracing::debug!(claimed = %claimed, forced = %theme, "Overriding model theme with mode theme");
        }
    }

    let text = |key: &str| non_empty_str(data.get(key)).unwrap_or_default().to_string();

    Some(Scenario {
        id,
        title: text("title"),
        description: text("description"),
        theme,
        location: parse_location(data.get("location")),
        environment: parse_environment(data.get("environment")),
        inventory: parse_inventory(data.get("inventory")),
        choices,
        turn_count: positive_u32(data.get("turnCount")).unwrap_or(1),
        estimated_duration: positive_u32(data.get("estimatedDuration"))
            .unwrap_or(DEFAULT_ESTIMATED_DURATION),
    })
}

/// Parse `[{ "id": ..., "text": ... }]`, skipping entries without text.
///
/// Model ids are kept only when every entry has one and they are all
/// distinct; otherwise every choice is numbered positionally so each id
/// stays reachable.
pub(crate) fn parse_choices(value: Option<&Value>) -> Vec<Choice> {
    let Some(items) = value.and_then(Value::as_array) else {
        return Vec::new();
    };

    let entries: Vec<(Option<String>, &str)> = items
        .iter()
        .filter_map(|item| {
            let text = non_empty_str(item.get("text"))?;
            Some((item.get("id").and_then(lenient_id), text))
        })
        .collect();

    let keep_ids = {
        let mut seen = HashSet::new();
        entries
            .iter()
            .all(|(id, _)| id.as_deref().is_some_and(|id| seen.insert(id)))
    };

    entries
        .into_iter()
        .enumerate()
        .map(|(index, (id, text))| match id {
            Some(id) if keep_ids => Choice::new(id, text),
            _ => Choice::new(positional_id(index), text),
        })
        .collect()
}

fn positional_id(index: usize) -> String {
    u8::try_from(index)
        .ok()
        .filter(|i| *i < 26)
        .map(|i| char::from(b'a' + i).to_string())
        .unwrap_or_else(|| (index + 1).to_string())
}

fn positive_u32(value: Option<&Value>) -> Option<u32> {
    value
        .and_then(lenient_f64)
        .filter(|n| n.is_finite() && *n >= 1.0)
        .map(|n| n.round().min(f64::from(u32::MAX)) as u32)
}

fn string_field(object: Option<&Value>, key: &str) -> String {
    non_empty_str(object.and_then(|o| o.get(key)))
        .unwrap_or_default()
        .to_string()
}

fn string_list(object: Option<&Value>, key: &str) -> Vec<String> {
    object
        .and_then(|o| o.get(key))
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| non_empty_str(Some(item)))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn parse_location(value: Option<&Value>) -> Location {
    let coordinate = |key: &str| {
        value
            .and_then(|o| o.get(key))
            .and_then(lenient_f64)
            .unwrap_or(0.0)
    };

    Location {
        name: string_field(value, "name"),
        lat: coordinate("lat"),
        lng: coordinate("lng"),
        terrain_type: string_field(value, "terrainType"),
        map_url: None,
    }
}

fn parse_environment(value: Option<&Value>) -> Environment {
    Environment {
        time_of_day: string_field(value, "timeOfDay"),
        weather: string_field(value, "weather"),
        temperature: string_field(value, "temperature"),
        visibility: Visibility::from_label(&string_field(value, "visibility")),
        signal_strength: SignalStrength::from_label(&string_field(value, "signalStrength")),
        distance_from_safety: string_field(value, "distanceFromSafety"),
    }
}

fn parse_inventory(value: Option<&Value>) -> Inventory {
    Inventory {
        on_person: string_list(value, "onPerson"),
        in_pack: string_list(value, "inPack"),
        at_camp_or_vehicle: string_list(value, "atCampOrVehicle"),
    }
}
