use std::env;
use std::fs;
use std::io::Cursor;
use std::path::Path;
use std::sync::{Arc, Mutex, OnceLock};

use anyhow::Result;
use async_trait::async_trait;
use irongpt_agent::generation::{PlanGenerator, RetryPolicy};
use irongpt_agent::llm::{FunctionSpec, LlmClient};
use irongpt_agent::runtime::{CoachRuntime, WORKOUT_READY};
use irongpt_cli::commands::chat::{run_session, SessionSummary};
use irongpt_cli::commands::plan::{self, PlanKind};
use irongpt_cli::commands::profile::{self, ProfileUpdate};
use irongpt_cli::commands::{config, doctor};
use irongpt_core::config::LoadOptions;
use irongpt_core::domain::plan::{
    Exercise, MacroBreakdown, Meals, NutritionDay, NutritionPlan, WorkoutDay, WorkoutPlan, WEEK_DAYS,
};
use irongpt_core::store::{AppState, InMemoryStateStore, StateStore};
use serde_json::{json, Value};
use tempfile::TempDir;

#[test]
fn config_reports_sources_and_redacts_api_key() {
    with_env(&[("IRONGPT_LLM_API_KEY", "sk-secret123"), ("IRONGPT_LLM_MODEL", "gpt-4o-mini")], || {
        let output = config::run(LoadOptions::default());

        assert!(output.starts_with("effective config"), "output: {output}");
        assert!(output.contains("- llm.api_key = sk-*** (source: env (IRONGPT_LLM_API_KEY))"));
        assert!(output.contains("- llm.model = gpt-4o-mini (source: env (IRONGPT_LLM_MODEL))"));
        assert!(output.contains("- llm.provider = openai (source: default)"));
        assert!(output.contains("- llm.max_retries = 2 (source: default)"));
        assert!(!output.contains("secret123"));
    });
}

#[test]
fn config_attributes_cli_overrides() {
    with_env(&[("IRONGPT_LLM_PROVIDER", "ollama")], || {
        let mut options = LoadOptions::default();
        options.overrides.log_level = Some("debug".to_string());

        let output = config::run(options);
        assert!(output.contains("- logging.level = debug (source: cli (--log-level))"));
        assert!(output.contains("- llm.api_key = <unset> (source: default)"));
        assert!(output.contains("- llm.base_url = http://localhost:11434/v1 (source: default)"));
    });
}

#[test]
fn config_reports_validation_failure_without_api_key() {
    with_env(&[], || {
        let output = config::run(LoadOptions::default());
        assert!(output.starts_with("config validation failed"), "output: {output}");
        assert!(output.contains("llm.api_key"));
    });
}

#[test]
fn doctor_passes_with_local_provider_and_fresh_state() {
    let dir = TempDir::new().expect("temp dir");
    let state_path = dir.path().join("state.json");
    let state_path = state_path.to_string_lossy().to_string();

    with_env(
        &[("IRONGPT_LLM_PROVIDER", "ollama"), ("IRONGPT_STORAGE_STATE_PATH", state_path.as_str())],
        || {
            let result = doctor::run(LoadOptions::default(), true);
            assert_eq!(result.exit_code, 0, "output: {}", result.output);

            let report = parse_payload(&result.output);
            assert_eq!(report["overall_status"], "pass");
            let checks = report["checks"].as_array().expect("checks array");
            let names = checks.iter().map(|check| check["name"].clone()).collect::<Vec<_>>();
            assert_eq!(names, vec!["config_validation", "llm_endpoint", "state_file"]);
        },
    );
}

#[test]
fn doctor_flags_corrupt_state_file() {
    let dir = TempDir::new().expect("temp dir");
    let state_path = dir.path().join("state.json");
    fs::write(&state_path, "{ not json").expect("write state");
    let state_path = state_path.to_string_lossy().to_string();

    with_env(
        &[("IRONGPT_LLM_PROVIDER", "ollama"), ("IRONGPT_STORAGE_STATE_PATH", state_path.as_str())],
        || {
            let result = doctor::run(LoadOptions::default(), true);
            assert_eq!(result.exit_code, 1);

            let report = parse_payload(&result.output);
            assert_eq!(report["overall_status"], "fail");
            assert_eq!(report["checks"][2]["name"], "state_file");
            assert_eq!(report["checks"][2]["status"], "fail");
        },
    );
}

#[test]
fn doctor_skips_dependent_checks_when_config_is_invalid() {
    with_env(&[], || {
        let result = doctor::run(LoadOptions::default(), false);
        assert_eq!(result.exit_code, 1);
        assert!(result.output.starts_with("doctor: one or more readiness checks failed"));
        assert!(result.output.contains("- [fail] config_validation:"));
        assert!(result.output.contains("- [skip] llm_endpoint:"));
        assert!(result.output.contains("- [skip] state_file:"));
    });
}

#[test]
fn profile_set_persists_valid_updates_and_rejects_invalid_ones() {
    let dir = TempDir::new().expect("temp dir");
    let state_path = dir.path().join("state.json");
    let state_path_str = state_path.to_string_lossy().to_string();

    with_env(
        &[("IRONGPT_LLM_PROVIDER", "ollama"), ("IRONGPT_STORAGE_STATE_PATH", state_path_str.as_str())],
        || {
            let update = ProfileUpdate {
                weight_kg: Some(82.0),
                activity: Some("very_active".to_string()),
                ..ProfileUpdate::default()
            };
            let result = profile::set(LoadOptions::default(), update);
            assert_eq!(result.exit_code, 0, "output: {}", result.output);
            assert!(state_path.exists());

            let shown = parse_payload(&profile::show(LoadOptions::default()).output);
            assert_eq!(shown["status"], "ok");
            let message = shown["message"].as_str().unwrap_or("");
            assert!(message.contains("weight_kg=82"), "message: {message}");
            assert!(message.contains("activity=very_active"));

            let invalid = ProfileUpdate { age: Some(5), ..ProfileUpdate::default() };
            let result = profile::set(LoadOptions::default(), invalid);
            assert_eq!(result.exit_code, 2);
            let payload = parse_payload(&result.output);
            assert_eq!(payload["error_class"], "invalid_profile");

            let shown = parse_payload(&profile::show(LoadOptions::default()).output);
            assert!(shown["message"].as_str().unwrap_or("").contains("age=25"));
        },
    );
}

#[test]
fn plan_reports_missing_then_stored_workout() {
    let dir = TempDir::new().expect("temp dir");
    let state_path = dir.path().join("state.json");
    let state_path_str = state_path.to_string_lossy().to_string();

    with_env(
        &[("IRONGPT_LLM_PROVIDER", "ollama"), ("IRONGPT_STORAGE_STATE_PATH", state_path_str.as_str())],
        || {
            let result = plan::run(LoadOptions::default(), PlanKind::Workout);
            assert_eq!(result.exit_code, 0);
            assert!(result.output.starts_with("no workout plan yet"));

            write_state(&state_path, &state_with_workout());
            let result = plan::run(LoadOptions::default(), PlanKind::Workout);
            assert!(result.output.starts_with("workout plan:"), "output: {}", result.output);
            assert!(result.output.contains("Monday (~20 kcal)"));
            assert!(result.output.contains("  - Goblet squat: 4 x 10"));
            assert!(result.output.contains("Tuesday (~0 kcal)\n  - rest"));
            assert!(result.output.contains("weekly burn: ~20 kcal"));

            let result = plan::run(LoadOptions::default(), PlanKind::Nutrition);
            assert!(result.output.starts_with("no nutrition plan yet"));
        },
    );
}

#[test]
fn plan_surfaces_generation_error() {
    let mut state = AppState::default();
    state.nutrition.fail("plan generation failed after 3 attempt(s): timeout");

    let output = plan::render(&state, PlanKind::Nutrition);
    assert_eq!(
        output,
        "nutrition plan generation failed: plan generation failed after 3 attempt(s): timeout"
    );
}

#[test]
fn plan_renders_nutrition_days_with_macro_energy() {
    let week = WEEK_DAYS
        .iter()
        .map(|day| NutritionDay {
            day: day.to_string(),
            meals: Meals {
                breakfast: "Oats".to_string(),
                lunch: "Rice bowl".to_string(),
                dinner: "Salmon".to_string(),
                snacks: "Yogurt".to_string(),
            },
            total_calories: 2200.0,
            macros: MacroBreakdown { protein_g: 150.0, carbs_g: 230.0, fat_g: 70.0 },
        })
        .collect();
    let mut state = AppState::default();
    state.nutrition.succeed(NutritionPlan { week });

    let output = plan::render(&state, PlanKind::Nutrition);
    assert!(output.starts_with("nutrition plan:"));
    assert!(output
        .contains("Monday (2200 kcal, P 150g / C 230g / F 70g = 2150 kcal from macros)"));
    assert!(output.contains("  - snacks: Yogurt"));
    assert!(output.ends_with("average daily intake: 2200 kcal"));
}

#[tokio::test]
async fn chat_session_runs_fallback_and_workout_exchange() {
    let store = Arc::new(InMemoryStateStore::default());
    let generator = PlanGenerator::new(Arc::new(StubCoach), RetryPolicy::default());
    let mut coach = CoachRuntime::new(generator, store.clone());

    let input = Cursor::new(
        "How is my squat form?\n\nMake me a workout plan\n4\nkettlebell\n30\nadvanced\n/reset\n/quit\nnever read\n",
    );
    let mut output = Vec::new();
    let summary = run_session(&mut coach, input, &mut output).await.expect("session");

    assert_eq!(summary, SessionSummary { turns: 6, resets: 1, errors: 0 });
    let transcript = String::from_utf8(output).expect("utf8 output");
    assert!(transcript.starts_with("coach> Brace your core.\n"), "transcript: {transcript}");
    assert!(transcript.contains(&format!("coach> {WORKOUT_READY}")));
    assert!(transcript.ends_with("coach> Chat cleared.\n"));

    let state = store.load().await.expect("state");
    assert!(state.messages.is_empty());
    assert_eq!(state.workout.plan.map(|plan| plan.week.len()), Some(7));
}

struct StubCoach;

#[async_trait]
impl LlmClient for StubCoach {
    async fn chat(&self, _system: &str, _user: &str) -> Result<String> {
        Ok("Brace your core.".to_string())
    }

    async fn call_function(
        &self,
        _system: &str,
        _user: &str,
        _function: &FunctionSpec,
    ) -> Result<String> {
        let week = WEEK_DAYS.iter().map(|day| json!({ "day": day, "exercises": [] }));
        Ok(json!({ "week": week.collect::<Vec<_>>() }).to_string())
    }
}

fn state_with_workout() -> AppState {
    let week = WEEK_DAYS
        .iter()
        .map(|day| WorkoutDay {
            day: day.to_string(),
            exercises: if *day == "Monday" {
                vec![Exercise {
                    name: "Goblet squat".to_string(),
                    sets: 4,
                    reps: 10,
                    met: 0.0,
                    duration_minutes: 0.0,
                }]
            } else {
                Vec::new()
            },
        })
        .collect();

    let mut state = AppState::default();
    state.workout.succeed(WorkoutPlan { week });
    state
}

fn write_state(path: &Path, state: &AppState) {
    let raw = serde_json::to_string_pretty(state).expect("serialize state");
    fs::write(path, raw).expect("write state");
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "IRONGPT_LLM_PROVIDER",
        "IRONGPT_LLM_API_KEY",
        "OPENAI_API_KEY",
        "IRONGPT_LLM_BASE_URL",
        "IRONGPT_LLM_MODEL",
        "IRONGPT_LLM_TIMEOUT_SECS",
        "IRONGPT_LLM_MAX_RETRIES",
        "IRONGPT_LLM_RETRY_INITIAL_DELAY_MS",
        "IRONGPT_STORAGE_STATE_PATH",
        "IRONGPT_LOGGING_LEVEL",
        "IRONGPT_LOGGING_FORMAT",
        "IRONGPT_LOG_LEVEL",
        "IRONGPT_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
