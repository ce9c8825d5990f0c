//! Athlete profile and the energy metrics derived from it.
//!
//! BMR follows Mifflin-St Jeor (1990); TDEE applies the usual activity
//! multipliers on top of it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    #[default]
    Male,
    Female,
    Other,
}

impl Gender {
    fn msj_constant(&self) -> f64 {
        match self {
            Self::Male => 5.0,
            Self::Female => -161.0,
            // midpoint of the two published constants
            Self::Other => -78.0,
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Male => "male",
            Self::Female => "female",
            Self::Other => "other",
        })
    }
}

impl FromStr for Gender {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "male" | "m" => Ok(Self::Male),
            "female" | "f" => Ok(Self::Female),
            "other" => Ok(Self::Other),
            other => Err(DomainError::InvalidProfile(format!(
                "unsupported gender `{other}` (expected male|female|other)"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityLevel {
    Sedentary,
    LightlyActive,
    #[default]
    ModeratelyActive,
    VeryActive,
    ExtraActive,
}

impl ActivityLevel {
    pub fn factor(&self) -> f64 {
        match self {
            Self::Sedentary => 1.2,
            Self::LightlyActive => 1.375,
            Self::ModeratelyActive => 1.55,
            Self::VeryActive => 1.725,
            Self::ExtraActive => 1.9,
        }
    }
}

impl fmt::Display for ActivityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Sedentary => "sedentary",
            Self::LightlyActive => "lightly_active",
            Self::ModeratelyActive => "moderately_active",
            Self::VeryActive => "very_active",
            Self::ExtraActive => "extra_active",
        })
    }
}

impl FromStr for ActivityLevel {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "sedentary" => Ok(Self::Sedentary),
            "lightly_active" | "light" => Ok(Self::LightlyActive),
            "moderately_active" | "moderate" => Ok(Self::ModeratelyActive),
            "very_active" | "very" => Ok(Self::VeryActive),
            "extra_active" | "extra" => Ok(Self::ExtraActive),
            other => Err(DomainError::InvalidProfile(format!(
                "unsupported activity level `{other}`"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub weight_kg: f64,
    pub height_cm: f64,
    pub age: u32,
    pub gender: Gender,
    #[serde(default)]
    pub activity_level: ActivityLevel,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            weight_kg: 70.0,
            height_cm: 170.0,
            age: 25,
            gender: Gender::Male,
            activity_level: ActivityLevel::ModeratelyActive,
        }
    }
}

impl Profile {
    pub fn validate(&self) -> Result<(), DomainError> {
        if !(30.0..=150.0).contains(&self.weight_kg) {
            return Err(DomainError::InvalidProfile(
                "weight_kg must be in range 30..=150".to_string(),
            ));
        }
        if !(100.0..=220.0).contains(&self.height_cm) {
            return Err(DomainError::InvalidProfile(
                "height_cm must be in range 100..=220".to_string(),
            ));
        }
        if !(12..=100).contains(&self.age) {
            return Err(DomainError::InvalidProfile("age must be in range 12..=100".to_string()));
        }
        Ok(())
    }

    pub fn bmr(&self) -> f64 {
        10.0 * self.weight_kg + 6.25 * self.height_cm - 5.0 * f64::from(self.age)
            + self.gender.msj_constant()
    }

    pub fn tdee(&self) -> f64 {
        self.bmr() * self.activity_level.factor()
    }

    pub fn context(&self) -> ProfileContext {
        ProfileContext {
            age: self.age,
            height_cm: self.height_cm,
            weight_kg: self.weight_kg,
            gender: self.gender,
            tdee_kcal: self.tdee().round() as u32,
        }
    }
}

/// Profile facts handed to the plan-generation service.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProfileContext {
    pub age: u32,
    pub height_cm: f64,
    pub weight_kg: f64,
    pub gender: Gender,
    pub tdee_kcal: u32,
}

impl ProfileContext {
    pub fn describe(&self) -> String {
        format!(
            "Athlete profile: {} years old, {} cm, {} kg, gender {}. Estimated TDEE: {} kcal/day.",
            self.age, self.height_cm, self.weight_kg, self.gender, self.tdee_kcal
        )
    }
}
