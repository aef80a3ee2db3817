//! Safety-skill scoring.
//!
//! Scores are unbounded signed counters. Each turn adds a partial set of
//! deltas; categories the model left out count as zero.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScoreCategory {
    Navigation,
    Weather,
    GroupSafety,
    RiskManagement,
    Timing,
}

impl ScoreCategory {
    pub const ALL: [ScoreCategory; 5] = [
        ScoreCategory::Navigation,
        ScoreCategory::Weather,
        ScoreCategory::GroupSafety,
        ScoreCategory::RiskManagement,
        ScoreCategory::Timing,
    ];

    /// Key used for this category in JSON payloads.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Navigation => "navigation",
            Self::Weather => "weather",
            Self::GroupSafety => "groupSafety",
            Self::RiskManagement => "riskManagement",
            Self::Timing => "timing",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Navigation => "Navigation",
            Self::Weather => "Weather",
            Self::GroupSafety => "Group Safety",
            Self::RiskManagement => "Risk Management",
            Self::Timing => "Timing",
        }
    }
}

/// Per-category adjustment produced by one evaluated turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreDeltas {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub navigation: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weather: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_safety: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_management: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timing: Option<i32>,
}

impl ScoreDeltas {
    pub fn get(&self, category: ScoreCategory) -> Option<i32> {
        match category {
            ScoreCategory::Navigation => self.navigation,
            ScoreCategory::Weather => self.weather,
            ScoreCategory::GroupSafety => self.group_safety,
            ScoreCategory::RiskManagement => self.risk_management,
            ScoreCategory::Timing => self.timing,
        }
    }

    pub fn set(&mut self, category: ScoreCategory, value: i32) {
        let slot = match category {
            ScoreCategory::Navigation => &mut self.navigation,
            ScoreCategory::Weather => &mut self.weather,
            ScoreCategory::GroupSafety => &mut self.group_safety,
            ScoreCategory::RiskManagement => &mut self.risk_management,
            ScoreCategory::Timing => &mut self.timing,
        };
        *slot = Some(value);
    }

    pub fn with(mut self, category: ScoreCategory, value: i32) -> Self {
        self.set(category, value);
        self
    }

    /// True when no category carries a value (an empty mapping).
    pub fn is_empty(&self) -> bool {
        ScoreCategory::ALL.iter().all(|c| self.get(*c).is_none())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub navigation: i32,
    pub weather: i32,
    pub group_safety: i32,
    pub risk_management: i32,
    pub timing: i32,
}

impl ScoreBreakdown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, category: ScoreCategory) -> i32 {
        match category {
            ScoreCategory::Navigation => self.navigation,
            ScoreCategory::Weather => self.weather,
            ScoreCategory::GroupSafety => self.group_safety,
            ScoreCategory::RiskManagement => self.risk_management,
            ScoreCategory::Timing => self.timing,
        }
    }

    fn slot_mut(&mut self, category: ScoreCategory) -> &mut i32 {
        match category {
            ScoreCategory::Navigation => &mut self.navigation,
            ScoreCategory::Weather => &mut self.weather,
            ScoreCategory::GroupSafety => &mut self.group_safety,
            ScoreCategory::RiskManagement => &mut self.risk_management,
            ScoreCategory::Timing => &mut self.timing,
        }
    }

    /// Add a turn's deltas. Missing categories are zero; no clamping beyond
    /// saturating at the integer limits.
    pub fn apply(&mut self, deltas: &ScoreDeltas) {
        for category in ScoreCategory::ALL {
            if let Some(delta) = deltas.get(category) {
                let slot = self.slot_mut(category);
                *slot = slot.saturating_add(delta);
            }
        }
    }

    pub fn total(&self) -> i64 {
        ScoreCategory::ALL
            .iter()
            .map(|c| i64::from(self.get(*c)))
            .sum()
    }

    /// Weakest category; ties resolve to the earliest in `ScoreCategory::ALL`.
    pub fn lowest_category(&self) -> ScoreCategory {
        let mut lowest = ScoreCategory::Navigation;
        for category in ScoreCategory::ALL {
            if self.get(category) < self.get(lowest) {
                lowest = category;
            }
        }
        lowest
    }
}
