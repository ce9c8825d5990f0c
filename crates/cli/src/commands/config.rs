use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use irongpt_core::config::{AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use toml::Value;

struct Field<'a> {
    key_path: &'static str,
    value: String,
    env_keys: &'a [&'a str],
    cli_flag: Option<&'static str>,
}

pub fn run(options: LoadOptions) -> String {
    let config_file_path = detect_config_path(options.config_path.as_deref());
    let log_level_flag = options.overrides.log_level.is_some().then_some("--log-level");
    let state_path_flag = options.overrides.state_path.is_some().then_some("--state-path");

    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let fields = [
        Field {
            key_path: "llm.provider",
            value: config.llm.provider.as_str().to_string(),
            env_keys: &["IRONGPT_LLM_PROVIDER"],
            cli_flag: None,
        },
        Field {
            key_path: "llm.model",
            value: config.llm.model.clone(),
            env_keys: &["IRONGPT_LLM_MODEL"],
            cli_flag: None,
        },
        Field {
            key_path: "llm.base_url",
            value: config.llm.effective_base_url().to_string(),
            env_keys: &["IRONGPT_LLM_BASE_URL"],
            cli_flag: None,
        },
        Field {
            key_path: "llm.api_key",
            value: redact_key(config.llm.api_key.as_ref().map(|key| key.expose_secret())),
            env_keys: &["IRONGPT_LLM_API_KEY", "OPENAI_API_KEY"],
            cli_flag: None,
        },
        Field {
            key_path: "llm.timeout_secs",
            value: config.llm.timeout_secs.to_string(),
            env_keys: &["IRONGPT_LLM_TIMEOUT_SECS"],
            cli_flag: None,
        },
        Field {
            key_path: "llm.max_retries",
            value: config.llm.max_retries.to_string(),
            env_keys: &["IRONGPT_LLM_MAX_RETRIES"],
            cli_flag: None,
        },
        Field {
            key_path: "llm.retry_initial_delay_ms",
            value: config.llm.retry_initial_delay_ms.to_string(),
            env_keys: &["IRONGPT_LLM_RETRY_INITIAL_DELAY_MS"],
            cli_flag: None,
        },
        Field {
            key_path: "storage.state_path",
            value: config.storage.state_path.display().to_string(),
            env_keys: &["IRONGPT_STORAGE_STATE_PATH"],
            cli_flag: state_path_flag,
        },
        Field {
            key_path: "logging.level",
            value: config.logging.level.clone(),
            env_keys: &["IRONGPT_LOGGING_LEVEL", "IRONGPT_LOG_LEVEL"],
            cli_flag: log_level_flag,
        },
        Field {
            key_path: "logging.format",
            value: format!("{:?}", config.logging.format).to_ascii_lowercase(),
            env_keys: &["IRONGPT_LOGGING_FORMAT", "IRONGPT_LOG_FORMAT"],
            cli_flag: None,
        },
    ];

    let mut lines =
        vec!["effective config (source precedence: cli > env > file > default):".to_string()];
    for field in &fields {
        let source = field_source(field, config_file_doc.as_ref(), config_file_path.as_deref());
        lines.push(render_line(field.key_path, &field.value, source));
    }

    lines.join("\n")
}

fn detect_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return path.exists().then(|| path.to_path_buf());
    }

    let root = PathBuf::from("irongpt.toml");
    if root.exists() {
        return Some(root);
    }

    let nested = PathBuf::from("config/irongpt.toml");
    if nested.exists() {
        return Some(nested);
    }

    None
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    field: &Field<'_>,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(flag) = field.cli_flag {
        return format!("cli ({flag})");
    }

    if let Some(env_key) = field.env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, field.key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

fn redact_key(key: Option<&str>) -> String {
    let Some(key) = key.map(str::trim) else {
        return "<unset>".to_string();
    };
    if key.is_empty() {
        return "<empty>".to_string();
    }

    if let Some((prefix, _)) = key.split_once('-') {
        return format!("{prefix}-***");
    }

    "<redacted>".to_string()
}
