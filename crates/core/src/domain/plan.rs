use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const WEEK_DAYS: [&str; 7] =
    ["Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday", "Sunday"];

/// Rough burn per repetition used when a plan carries no MET data.
pub const KCAL_PER_REP: f64 = 0.5;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PlanValidationError {
    #[error("expected 7 day records, got {0}")]
    WrongDayCount(usize),
    #[error("plan is missing days: {0:?}")]
    MissingDays(Vec<String>),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Exercise {
    pub name: String,
    pub sets: u32,
    pub reps: u32,
    /// Metabolic equivalent of the movement.
    #[serde(default)]
    pub met: f64,
    #[serde(default, alias = "durationMinutes")]
    pub duration_minutes: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorkoutDay {
    pub day: String,
    #[serde(default)]
    pub exercises: Vec<Exercise>,
}

impl WorkoutDay {
    pub fn estimated_kcal(&self, weight_kg: f64) -> f64 {
        self.exercises
            .iter()
            .map(|exercise| exercise.met * weight_kg * exercise.duration_minutes / 60.0)
            .fold(0.0, |total, kcal| total + kcal)
    }

    pub fn rep_volume_kcal(&self) -> f64 {
        self.exercises
            .iter()
            .map(|exercise| f64::from(exercise.sets) * f64::from(exercise.reps) * KCAL_PER_REP)
            .fold(0.0, |total, kcal| total + kcal)
    }

    pub fn label(&self) -> String {
        self.day.trim().chars().take(3).collect()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkoutPlan {
    pub week: Vec<WorkoutDay>,
}

impl WorkoutPlan {
    pub fn validate(&self) -> Result<(), PlanValidationError> {
        validate_week(self.week.iter().map(|day| day.day.as_str()))
    }

    /// Estimated burn per day, falling back to rep volume for days without MET data.
    pub fn daily_burn(&self, weight_kg: f64) -> Vec<(String, f64)> {
        self.week
            .iter()
            .map(|day| {
                let by_met = day.estimated_kcal(weight_kg);
                let kcal = if by_met > 0.0 { by_met } else { day.rep_volume_kcal() };
                (day.label(), kcal.round())
            })
            .collect()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meals {
    pub breakfast: String,
    pub lunch: String,
    pub dinner: String,
    pub snacks: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MacroBreakdown {
    #[serde(alias = "protein")]
    pub protein_g: f64,
    #[serde(alias = "carbs")]
    pub carbs_g: f64,
    #[serde(alias = "fat")]
    pub fat_g: f64,
}

impl MacroBreakdown {
    /// Energy implied by the macros (4/4/9 kcal per gram).
    pub fn kcal(&self) -> f64 {
        self.protein_g * 4.0 + self.carbs_g * 4.0 + self.fat_g * 9.0
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NutritionDay {
    pub day: String,
    pub meals: Meals,
    #[serde(default, alias = "totalCalories")]
    pub total_calories: f64,
    #[serde(default)]
    pub macros: MacroBreakdown,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NutritionPlan {
    pub week: Vec<NutritionDay>,
}

impl NutritionPlan {
    pub fn validate(&self) -> Result<(), PlanValidationError> {
        validate_week(self.week.iter().map(|day| day.day.as_str()))
    }

    pub fn average_daily_calories(&self) -> f64 {
        if self.week.is_empty() {
            return 0.0;
        }
        self.week.iter().map(|day| day.total_calories).sum::<f64>() / self.week.len() as f64
    }
}

/// Checks that the records name each weekday exactly once.
pub fn validate_week<'a, I>(day_names: I) -> Result<(), PlanValidationError>
where
    I: IntoIterator<Item = &'a str>,
{
    let names = day_names
        .into_iter()
        .map(|name| name.trim().to_ascii_lowercase())
        .collect::<Vec<_>>();
    if names.len() != WEEK_DAYS.len() {
        return Err(PlanValidationError::WrongDayCount(names.len()));
    }

    let present = names.into_iter().collect::<BTreeSet<_>>();
    let missing = WEEK_DAYS
        .iter()
        .filter(|day| !present.contains(&day.to_ascii_lowercase()))
        .map(|day| (*day).to_string())
        .collect::<Vec<_>>();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(PlanValidationError::MissingDays(missing))
    }
}
