//! Game modes and the scenario constraints each one imposes.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::scenario::ScenarioTheme;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum GameMode {
    #[default]
    Standard,
    #[serde(rename = "Night Ops")]
    NightOps,
    #[serde(rename = "Heat Wave")]
    HeatWave,
    #[serde(rename = "Tiny Mistakes")]
    TinyMistakes,
}

impl GameMode {
    pub const ALL: [GameMode; 4] = [
        GameMode::Standard,
        GameMode::NightOps,
        GameMode::HeatWave,
        GameMode::TinyMistakes,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Standard => "Standard",
            Self::NightOps => "Night Ops",
            Self::HeatWave => "Heat Wave",
            Self::TinyMistakes => "Tiny Mistakes",
        }
    }

    /// Theme every scenario generated in this mode must use.
    pub fn theme(&self) -> ScenarioTheme {
        match self {
            Self::NightOps => ScenarioTheme::Night,
            Self::HeatWave => ScenarioTheme::Heat,
            Self::Standard | Self::TinyMistakes => ScenarioTheme::Normal,
        }
    }

    /// Instruction text embedded in the generation prompt.
    pub fn instructions(&self) -> String {
        let body = match self {
            Self::NightOps => {
                "The scenario MUST take place at dusk or night. Visibility is poor. Temperature is dropping."
            }
            Self::HeatWave => {
                "The scenario MUST take place in extreme heat/sun. Dehydration is a major risk."
            }
            Self::TinyMistakes => {
                "The scenario MUST start with the user realizing they made a small, realistic error (forgot water, missed a turn, left gear behind) that complicates things."
            }
            Self::Standard => "Standard scenario.",
        };
        format!("{} Theme: '{}'.", body, self.theme())
    }
}

impl std::fmt::Display for GameMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for GameMode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|mode| mode.label().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| DomainError::parse(format!("Unknown game mode: {}", s)))
    }
}

/// Everything the player picks on the menu before a scenario is generated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioRequest {
    pub difficulty: String,
    pub environment: String,
    pub mode: GameMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl ScenarioRequest {
    pub fn new(difficulty: impl Into<String>, environment: impl Into<String>, mode: GameMode) -> Self {
        Self {
            difficulty: difficulty.into(),
            environment: environment.into(),
            mode,
            notes: None,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Notes as they appear in the prompt; blank notes read as "None".
    pub fn notes_or_none(&self) -> &str {
        match self.notes.as_deref().map(str::trim) {
            Some(notes) if !notes.is_empty() => notes,
            _ => "None",
        }
    }
}
