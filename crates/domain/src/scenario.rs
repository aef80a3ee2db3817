//! Scenario - one generated survival situation.

use serde::{Deserialize, Serialize};

use crate::ids::ScenarioId;
use crate::turn::NextScenarioPart;

/// Target number of turns when the model does not suggest one.
pub const DEFAULT_ESTIMATED_DURATION: u32 = 5;

/// Choice id offered by the fallback scenario.
pub const RETRY_CHOICE_ID: &str = "retry";

/// Visual theme the UI applies to a scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScenarioTheme {
    #[default]
    Normal,
    Night,
    Heat,
}

impl ScenarioTheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Night => "night",
            Self::Heat => "heat",
        }
    }

    /// Parse a theme label, returning `None` for anything unrecognized.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "normal" => Some(Self::Normal),
            "night" => Some(Self::Night),
            "heat" => Some(Self::Heat),
            _ => None,
        }
    }
}

impl std::fmt::Display for ScenarioTheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    pub terrain_type: String,
    /// Real-world map reference resolved through grounding, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Visibility {
    #[default]
    Good,
    Fair,
    Poor,
}

impl Visibility {
    /// Lenient parse used for model output. Unknown labels are treated as `Fair`.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "good" => Self::Good,
            "poor" => Self::Poor,
            _ => Self::Fair,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SignalStrength {
    #[default]
    None,
    Weak,
    Strong,
}

impl SignalStrength {
    /// Lenient parse used for model output. Unknown labels are treated as `None`.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "weak" => Self::Weak,
            "strong" => Self::Strong,
            _ => Self::None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Environment {
    pub time_of_day: String,
    pub weather: String,
    pub temperature: String,
    pub visibility: Visibility,
    pub signal_strength: SignalStrength,
    pub distance_from_safety: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Inventory {
    pub on_person: Vec<String>,
    pub in_pack: Vec<String>,
    pub at_camp_or_vehicle: Vec<String>,
}

impl Inventory {
    pub fn is_empty(&self) -> bool {
        self.on_person.is_empty() && self.in_pack.is_empty() && self.at_camp_or_vehicle.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub id: String,
    pub text: String,
}

impl Choice {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    pub id: ScenarioId,
    pub title: String,
    pub description: String,
    pub theme: ScenarioTheme,
    pub location: Location,
    pub environment: Environment,
    pub inventory: Inventory,
    pub choices: Vec<Choice>,
    pub turn_count: u32,
    /// Target number of turns to survive
    pub estimated_duration: u32,
}

impl Scenario {
    /// The scenario shown when generation fails.
    ///
    /// It always has `turn_count == 0` and exactly one choice, `retry`, so
    /// the player is never left without something to act on.
    pub fn fallback() -> Self {
        Self {
            id: ScenarioId::fallback(),
            title: "Signal Lost".to_string(),
            description: "Connection to the ranger station failed. Please retry.".to_string(),
            theme: ScenarioTheme::Normal,
            location: Location {
                name: "Unknown".to_string(),
                lat: 0.0,
                lng: 0.0,
                terrain_type: "N/A".to_string(),
                map_url: None,
            },
            environment: Environment {
                time_of_day: "?".to_string(),
                weather: "?".to_string(),
                temperature: "?".to_string(),
                visibility: Visibility::Good,
                signal_strength: SignalStrength::None,
                distance_from_safety: "?".to_string(),
            },
            inventory: Inventory::default(),
            choices: vec![Choice::new(RETRY_CHOICE_ID, "Retry Connection")],
            turn_count: 0,
            estimated_duration: DEFAULT_ESTIMATED_DURATION,
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.id.is_fallback()
    }

    pub fn find_choice(&self, choice_id: &str) -> Option<&Choice> {
        self.choices.iter().find(|c| c.id == choice_id)
    }

    /// Move the scenario on to its next situation.
    ///
    /// Only the description and the available choices change; location,
    /// environment and inventory carry over. A continuation without choices
    /// keeps the current ones so the scenario stays playable.
    pub fn advance(&mut self, next: NextScenarioPart) {
        self.description = next.description;
        if !next.choices.is_empty() {
            self.choices = next.choices;
        }
        self.turn_count = self.turn_count.saturating_add(1);
    }
}
