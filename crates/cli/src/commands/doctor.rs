use irongpt_core::config::{AppConfig, LoadOptions};
use irongpt_core::store::{JsonFileStateStore, StateStore};
use serde::Serialize;

use crate::commands::CommandResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(options: LoadOptions, json_output: bool) -> CommandResult {
    let report = build_report(options);
    let exit_code = if report.overall_status == CheckStatus::Pass { 0 } else { 1 };

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

fn build_report(options: LoadOptions) -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(options) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_llm_endpoint(&config));
            checks.push(check_state_file(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            for name in ["llm_endpoint", "state_file"] {
                checks.push(DoctorCheck {
                    name,
                    status: CheckStatus::Skipped,
                    details: "skipped because configuration did not load".to_string(),
                });
            }
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_llm_endpoint(config: &AppConfig) -> DoctorCheck {
    let credentials =
        if config.llm.api_key.is_some() { "api key present" } else { "no api key (local endpoint)" };

    DoctorCheck {
        name: "llm_endpoint",
        status: CheckStatus::Pass,
        details: format!(
            "{} model `{}` at `{}`, {credentials}",
            config.llm.provider.as_str(),
            config.llm.model,
            config.llm.effective_base_url()
        ),
    }
}

fn check_state_file(config: &AppConfig) -> DoctorCheck {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return DoctorCheck {
                name: "state_file",
                status: CheckStatus::Fail,
                details: format!("failed to initialize async runtime: {error}"),
            };
        }
    };

    let store = JsonFileStateStore::new(config.storage.state_path.clone());
    match runtime.block_on(store.load()) {
        Ok(state) => DoctorCheck {
            name: "state_file",
            status: CheckStatus::Pass,
            details: format!(
                "`{}` readable ({} message(s), workout plan {}, nutrition plan {})",
                store.path().display(),
                state.messages.len(),
                presence(state.workout.plan.is_some()),
                presence(state.nutrition.plan.is_some()),
            ),
        },
        Err(error) => {
            DoctorCheck { name: "state_file", status: CheckStatus::Fail, details: error.to_string() }
        }
    }
}

fn presence(present: bool) -> &'static str {
    if present {
        "stored"
    } else {
        "absent"
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
