//! Plan generation through the completion service.
//!
//! Each attempt asks the model for a forced function call, decodes the
//! arguments into a plan and checks that all seven days are present. Failed
//! attempts are retried with capped exponential backoff before the caller
//! sees a [`GenerationError`].

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use serde::de::DeserializeOwned;
use serde_json::json;
use thiserror::Error;
use tracing::{info, warn};

use irongpt_core::config::LlmConfig;
use irongpt_core::domain::plan::{NutritionPlan, PlanValidationError, WorkoutPlan};
use irongpt_core::domain::profile::ProfileContext;

use crate::dialogue::{NutritionArgs, WorkoutArgs};
use crate::llm::{FunctionSpec, LlmClient, COACH_SYSTEM_PROMPT, NUTRITION_SYSTEM_PROMPT};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum GenerationError {
    #[error("plan generation failed after {attempts} attempt(s): {last_error}")]
    Exhausted { attempts: u32, last_error: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &LlmConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            initial_delay: Duration::from_millis(config.retry_initial_delay_ms),
            ..Self::default()
        }
    }

    /// `min(initial * 2^retry, max)` for the zero-based retry index.
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        let factor = 1_u32.checked_shl(retry).unwrap_or(u32::MAX);
        self.initial_delay.saturating_mul(factor).min(self.max_delay)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct WorkoutRequest {
    pub goal: String,
    pub preferences: Vec<String>,
    pub frequency: String,
    pub minutes_per_session: String,
    pub level: String,
    pub profile: ProfileContext,
}

impl WorkoutRequest {
    pub fn from_args(args: WorkoutArgs, profile: ProfileContext) -> Self {
        Self {
            goal: args.goal,
            preferences: args.equipment,
            frequency: args.frequency,
            minutes_per_session: args.duration_per_session,
            level: args.user_level,
            profile,
        }
    }

    pub fn prompt(&self) -> String {
        format!(
            "Create a 7-day workout plan.\n\
             Goal: {}\n\
             Training days per week: {}\n\
             Available equipment: {}\n\
             Minutes per session: {}\n\
             Level: {}\n\
             {}\n\
             Include every day from Monday to Sunday; rest days have an empty exercise list.",
            self.goal,
            self.frequency,
            list_or_none(&self.preferences),
            self.minutes_per_session,
            self.level,
            self.profile.describe(),
        )
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct NutritionRequest {
    pub requirement: String,
    pub daily_kcal: u32,
    pub preferences: Vec<String>,
    pub macros: String,
    pub profile: ProfileContext,
}

impl NutritionRequest {
    /// Uses the stated calorie target when it holds a positive number, else the profile TDEE.
    pub fn from_args(args: NutritionArgs, profile: ProfileContext) -> Self {
        let daily_kcal = parse_calorie_target(&args.target_calories).unwrap_or(profile.tdee_kcal);
        Self {
            requirement: args.requirement,
            daily_kcal,
            preferences: args.dietary_prefs,
            macros: args.macros,
            profile,
        }
    }

    pub fn prompt(&self) -> String {
        format!(
            "Create a 7-day meal plan.\n\
             Requirement: {}\n\
             Daily energy target: {} kcal\n\
             Macro split: {}\n\
             Dietary preferences: {}\n\
             {}\n\
             Include every day from Monday to Sunday with breakfast, lunch, dinner and snacks.",
            self.requirement,
            self.daily_kcal,
            self.macros,
            list_or_none(&self.preferences),
            self.profile.describe(),
        )
    }
}

/// Plausible daily energy targets; anything else falls back to the profile TDEE.
pub const MIN_DAILY_KCAL: u32 = 800;
pub const MAX_DAILY_KCAL: u32 = 6000;

/// First number in `answer` that reads as a daily target: `2000`, `2,400`, `2k`, `2.5k`.
pub fn parse_calorie_target(answer: &str) -> Option<u32> {
    let lowered = answer.to_lowercase();
    let mut rest = lowered.as_str();

    while let Some(start) = rest.find(|ch: char| ch.is_ascii_digit()) {
        let candidate = &rest[start..];
        let end = candidate
            .find(|ch: char| !(ch.is_ascii_digit() || ch == ',' || ch == '.'))
            .unwrap_or(candidate.len());
        let (number, tail) = candidate.split_at(end);
        rest = tail;

        let Ok(value) = number.trim_end_matches(['.', ',']).replace(',', "").parse::<f64>() else {
            continue;
        };
        let thousands = tail.starts_with('k') && !tail.starts_with("kcal");
        let kcal = (if thousands { value * 1000.0 } else { value }).round();
        if (f64::from(MIN_DAILY_KCAL)..=f64::from(MAX_DAILY_KCAL)).contains(&kcal) {
            return Some(kcal as u32);
        }
    }

    None
}

fn list_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "none".to_string()
    } else {
        items.join(", ")
    }
}

pub fn workout_function() -> FunctionSpec {
    FunctionSpec {
        name: "createWorkoutPlan",
        description: "Return a weekly workout plan as JSON",
        parameters: json!({
            "type": "object",
            "properties": {
                "week": {
                    "type": "array",
                    "minItems": 7,
                    "maxItems": 7,
                    "items": {
                        "type": "object",
                        "properties": {
                            "day": { "type": "string" },
                            "exercises": {
                                "type": "array",
                                "items": {
                                    "type": "object",
                                    "properties": {
                                        "name": { "type": "string" },
                                        "sets": { "type": "integer" },
                                        "reps": { "type": "integer" },
                                        "met": { "type": "number" },
                                        "durationMinutes": { "type": "number" }
                                    },
                                    "required": ["name", "sets", "reps"]
                                }
                            }
                        },
                        "required": ["day", "exercises"]
                    }
                }
            },
            "required": ["week"]
        }),
    }
}

pub fn nutrition_function() -> FunctionSpec {
    FunctionSpec {
        name: "createNutritionPlan",
        description: "Return a 7-day meal plan as JSON",
        parameters: json!({
            "type": "object",
            "properties": {
                "week": {
                    "type": "array",
                    "minItems": 7,
                    "maxItems": 7,
                    "items": {
                        "type": "object",
                        "properties": {
                            "day": { "type": "string" },
                            "meals": {
                                "type": "object",
                                "properties": {
                                    "breakfast": { "type": "string" },
                                    "lunch": { "type": "string" },
                                    "dinner": { "type": "string" },
                                    "snacks": { "type": "string" }
                                },
                                "required": ["breakfast", "lunch", "dinner", "snacks"]
                            },
                            "totalCalories": { "type": "number" },
                            "macros": {
                                "type": "object",
                                "properties": {
                                    "protein": { "type": "number" },
                                    "carbs": { "type": "number" },
                                    "fat": { "type": "number" }
                                }
                            }
                        },
                        "required": ["day", "meals"]
                    }
                }
            },
            "required": ["week"]
        }),
    }
}

trait WeeklyPlan: DeserializeOwned {
    fn check(&self) -> Result<(), PlanValidationError>;
}

impl WeeklyPlan for WorkoutPlan {
    fn check(&self) -> Result<(), PlanValidationError> {
        self.validate()
    }
}

impl WeeklyPlan for NutritionPlan {
    fn check(&self) -> Result<(), PlanValidationError> {
        self.validate()
    }
}

pub struct PlanGenerator<C> {
    client: Arc<C>,
    retry: RetryPolicy,
}

impl<C> PlanGenerator<C>
where
    C: LlmClient,
{
    pub fn new(client: Arc<C>, retry: RetryPolicy) -> Self {
        Self { client, retry }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub async fn generate_workout(
        &self,
        request: &WorkoutRequest,
    ) -> Result<WorkoutPlan, GenerationError> {
        self.generate(COACH_SYSTEM_PROMPT, &request.prompt(), &workout_function()).await
    }

    pub async fn generate_nutrition(
        &self,
        request: &NutritionRequest,
    ) -> Result<NutritionPlan, GenerationError> {
        self.generate(NUTRITION_SYSTEM_PROMPT, &request.prompt(), &nutrition_function()).await
    }

    async fn generate<P>(
        &self,
        system: &str,
        user: &str,
        function: &FunctionSpec,
    ) -> Result<P, GenerationError>
    where
        P: WeeklyPlan,
    {
        let attempts = self.retry.max_retries.saturating_add(1);
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            if attempt > 1 {
                tokio::time::sleep(self.retry.delay_for_retry(attempt - 2)).await;
            }

            match self.attempt::<P>(system, user, function).await {
                Ok(plan) => {
                    info!(
                        event_name = "generation.plan_accepted",
                        function = function.name,
                        attempt,
                        "plan accepted"
                    );
                    return Ok(plan);
                }
                Err(error) => {
                    warn!(
                        event_name = "generation.attempt_failed",
                        function = function.name,
                        attempt,
                        max_attempts = attempts,
                        error = %format!("{error:#}"),
                        "plan attempt failed"
                    );
                    last_error = format!("{error:#}");
                }
            }
        }

        Err(GenerationError::Exhausted { attempts, last_error })
    }

    async fn attempt<P>(
        &self,
        system: &str,
        user: &str,
        function: &FunctionSpec,
    ) -> anyhow::Result<P>
    where
        P: WeeklyPlan,
    {
        let arguments = self.client.call_function(system, user, function).await?;
        let plan: P = serde_json::from_str(&arguments)
            .with_context(|| format!("`{}` arguments were not a valid plan", function.name))?;
        plan.check()?;
        Ok(plan)
    }
}
