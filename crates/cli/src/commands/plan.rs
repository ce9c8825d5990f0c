use irongpt_core::config::LoadOptions;
use irongpt_core::domain::plan::{NutritionPlan, WorkoutPlan};
use irongpt_core::store::{AppState, JsonFileStateStore, PlanState, StateStore};

use crate::commands::{current_thread_runtime, load_config, CommandResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlanKind {
    Workout,
    Nutrition,
}

impl PlanKind {
    fn label(&self) -> &'static str {
        match self {
            Self::Workout => "workout",
            Self::Nutrition => "nutrition",
        }
    }
}

pub fn run(options: LoadOptions, kind: PlanKind) -> CommandResult {
    let config = match load_config("plan", options) {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let runtime = match current_thread_runtime("plan") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let store = JsonFileStateStore::new(config.storage.state_path);
    match runtime.block_on(store.load()) {
        Ok(state) => CommandResult { exit_code: 0, output: render(&state, kind) },
        Err(error) => CommandResult::failure("plan", "persistence", error.to_string(), 1),
    }
}

pub fn render(state: &AppState, kind: PlanKind) -> String {
    let status = match kind {
        PlanKind::Workout => status_line(&state.workout, kind),
        PlanKind::Nutrition => status_line(&state.nutrition, kind),
    };
    if let Some(status) = status {
        return status;
    }

    match (kind, &state.workout.plan, &state.nutrition.plan) {
        (PlanKind::Workout, Some(plan), _) => render_workout(plan, state.profile.weight_kg),
        (PlanKind::Nutrition, _, Some(plan)) => render_nutrition(plan),
        _ => format!("no {} plan yet; ask the coach for one with `irongpt chat`", kind.label()),
    }
}

fn status_line<T>(plan_state: &PlanState<T>, kind: PlanKind) -> Option<String> {
    if plan_state.generating {
        return Some(format!("{} plan is being generated", kind.label()));
    }
    plan_state
        .error
        .as_ref()
        .map(|error| format!("{} plan generation failed: {error}", kind.label()))
}

fn render_workout(plan: &WorkoutPlan, weight_kg: f64) -> String {
    let burn = plan.daily_burn(weight_kg);
    let mut lines = vec!["workout plan:".to_string()];

    for (day, (_, kcal)) in plan.week.iter().zip(&burn) {
        lines.push(format!("{} (~{kcal} kcal)", day.day));
        if day.exercises.is_empty() {
            lines.push("  - rest".to_string());
        }
        for exercise in &day.exercises {
            lines.push(format!("  - {}: {} x {}", exercise.name, exercise.sets, exercise.reps));
        }
    }

    let total = burn.iter().fold(0.0_f64, |sum, (_, kcal)| sum + kcal);
    lines.push(format!("weekly burn: ~{total} kcal"));
    lines.join("\n")
}

fn render_nutrition(plan: &NutritionPlan) -> String {
    let mut lines = vec!["nutrition plan:".to_string()];

    for day in &plan.week {
        lines.push(format!(
            "{} ({} kcal, P {}g / C {}g / F {}g = {} kcal from macros)",
            day.day,
            day.total_calories,
            day.macros.protein_g,
            day.macros.carbs_g,
            day.macros.fat_g,
            day.macros.kcal().round()
        ));
        lines.push(format!("  - breakfast: {}", day.meals.breakfast));
        lines.push(format!("  - lunch: {}", day.meals.lunch));
        lines.push(format!("  - dinner: {}", day.meals.dinner));
        lines.push(format!("  - snacks: {}", day.meals.snacks));
    }

    lines.push(format!("average daily intake: {} kcal", plan.average_daily_calories().round()));
    lines.join("\n")
}
