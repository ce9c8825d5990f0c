use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fallback question used when a slot has no dedicated prompt.
pub const GENERIC_CLARIFICATION: &str = "Could you clarify that?";

/// Classified purpose of a user turn. Variant order is the classifier's tie-break order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    AskFormAdvice,
    GenerateWorkout,
    GenerateNutrition,
    LogFeeling,
    SwapExercise,
    ViewPlan,
    Clarify,
}

impl Intent {
    pub const ALL: [Intent; 7] = [
        Self::AskFormAdvice,
        Self::GenerateWorkout,
        Self::GenerateNutrition,
        Self::LogFeeling,
        Self::SwapExercise,
        Self::ViewPlan,
        Self::Clarify,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AskFormAdvice => "ask_form_advice",
            Self::GenerateWorkout => "generate_workout",
            Self::GenerateNutrition => "generate_nutrition",
            Self::LogFeeling => "log_feeling",
            Self::SwapExercise => "swap_exercise",
            Self::ViewPlan => "view_plan",
            Self::Clarify => "clarify",
        }
    }

    /// Slot requirement table row, in the order the slots are asked for.
    pub fn required_slots(&self) -> &'static [SlotKey] {
        match self {
            Self::GenerateWorkout => &[
                SlotKey::Goal,
                SlotKey::Frequency,
                SlotKey::Equipment,
                SlotKey::DurationPerSession,
                SlotKey::UserLevel,
            ],
            Self::GenerateNutrition => &[
                SlotKey::Requirement,
                SlotKey::TargetCalories,
                SlotKey::Macros,
                SlotKey::DietaryPrefs,
            ],
            Self::AskFormAdvice
            | Self::LogFeeling
            | Self::SwapExercise
            | Self::ViewPlan
            | Self::Clarify => &[],
        }
    }

    pub fn requires_slots(&self) -> bool {
        !self.required_slots().is_empty()
    }

    /// Slot filled verbatim from the utterance that opened the exchange.
    pub fn seed_slot(&self) -> Option<SlotKey> {
        match self {
            Self::GenerateWorkout => Some(SlotKey::Goal),
            Self::GenerateNutrition => Some(SlotKey::Requirement),
            _ => None,
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("unknown slot key `{0}`")]
pub struct UnknownSlotKey(pub String);

/// Named parameter of a plan-generation request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SlotKey {
    Goal,
    Frequency,
    Equipment,
    DurationPerSession,
    UserLevel,
    Requirement,
    TargetCalories,
    Macros,
    DietaryPrefs,
}

impl SlotKey {
    pub const ALL: [SlotKey; 9] = [
        Self::Goal,
        Self::Frequency,
        Self::Equipment,
        Self::DurationPerSession,
        Self::UserLevel,
        Self::Requirement,
        Self::TargetCalories,
        Self::Macros,
        Self::DietaryPrefs,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Goal => "goal",
            Self::Frequency => "frequency",
            Self::Equipment => "equipment",
            Self::DurationPerSession => "durationPerSession",
            Self::UserLevel => "userLevel",
            Self::Requirement => "requirement",
            Self::TargetCalories => "targetCalories",
            Self::Macros => "macros",
            Self::DietaryPrefs => "dietaryPrefs",
        }
    }

    pub fn clarifying_question(&self) -> &'static str {
        clarifying_question(Some(*self))
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SlotKey {
    type Err = UnknownSlotKey;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|key| key.as_str() == value.trim())
            .ok_or_else(|| UnknownSlotKey(value.to_string()))
    }
}

/// Question the assistant asks to fill `slot`.
pub fn clarifying_question(slot: Option<SlotKey>) -> &'static str {
    match slot {
        Some(SlotKey::Frequency) => "How many days per week would you like to train?",
        Some(SlotKey::Equipment) => "What equipment do you have available?",
        Some(SlotKey::DurationPerSession) => "How many minutes per session?",
        Some(SlotKey::UserLevel) => {
            "What is your current level (beginner, intermediate, advanced)?"
        }
        Some(SlotKey::TargetCalories) => "What is your daily calorie target?",
        Some(SlotKey::Macros) => "Any specific macro split (e.g. protein/carbs/fat)?",
        Some(SlotKey::DietaryPrefs) => "Any dietary preferences or restrictions?",
        Some(SlotKey::Goal) | Some(SlotKey::Requirement) | None => GENERIC_CLARIFICATION,
    }
}

/// Recorded slot answer: one free-text value or a list of them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SlotValue {
    Text(String),
    TextList(Vec<String>),
}

impl SlotValue {
    /// Scalar answers become a one-element list; blank text becomes an empty list.
    pub fn into_list(self) -> Vec<String> {
        match self {
            Self::Text(text) if text.trim().is_empty() => Vec::new(),
            Self::Text(text) => vec![text],
            Self::TextList(items) => items,
        }
    }

    pub fn as_text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::TextList(items) => items.join(", "),
        }
    }
}

impl From<String> for SlotValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for SlotValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<Vec<String>> for SlotValue {
    fn from(value: Vec<String>) -> Self {
        Self::TextList(value)
    }
}
