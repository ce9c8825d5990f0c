use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use irongpt_agent::generation::{PlanGenerator, RetryPolicy};
use irongpt_agent::llm::LlmClient;
use irongpt_agent::openai::OpenAiCompatibleClient;
use irongpt_agent::runtime::{CoachRuntime, TurnKind};
use irongpt_core::audit::AuditContext;
use irongpt_core::config::LoadOptions;
use irongpt_core::store::{JsonFileStateStore, StateStore};
use uuid::Uuid;

use crate::commands::{current_thread_runtime, load_config, CommandResult};
use crate::logging::{init_logging, TracingAuditSink};

const RESET_COMMAND: &str = "/reset";
const QUIT_COMMANDS: [&str; 2] = ["/quit", "/exit"];

/// Counters reported when the REPL ends.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SessionSummary {
    pub turns: usize,
    pub resets: usize,
    pub errors: usize,
}

pub fn run(options: LoadOptions) -> CommandResult {
    let config = match load_config("chat", options) {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    init_logging(&config.logging);

    let client = match OpenAiCompatibleClient::from_config(&config.llm) {
        Ok(client) => client,
        Err(error) => return CommandResult::failure("chat", "llm_client", format!("{error:#}"), 3),
    };
    let runtime = match current_thread_runtime("chat") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let session_id = Uuid::new_v4().to_string();
    tracing::info!(
        event_name = "cli.chat.started",
        session_id = %session_id,
        correlation_id = "bootstrap",
        provider = config.llm.provider.as_str(),
        model = client.model(),
        state_path = %config.storage.state_path.display(),
        "chat session started"
    );

    let generator = PlanGenerator::new(Arc::new(client), RetryPolicy::from_config(&config.llm));
    let store = Arc::new(JsonFileStateStore::new(config.storage.state_path.clone()));
    let mut coach = CoachRuntime::with_audit(
        generator,
        store,
        AuditContext::new(session_id, "bootstrap", "cli"),
        Arc::new(TracingAuditSink),
    );

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let _ = writeln!(stdout, "IronGPT coach ready. Type /reset to start over or /quit to leave.");

    match runtime.block_on(run_session(&mut coach, stdin.lock(), &mut stdout)) {
        Ok(summary) => CommandResult::success(
            "chat",
            format!(
                "chat session ended after {} turn(s), {} reset(s), {} error(s)",
                summary.turns, summary.resets, summary.errors
            ),
        ),
        Err(error) => CommandResult::failure("chat", "io", format!("{error:#}"), 1),
    }
}

/// Reads user lines until EOF or a quit command, printing coach replies as they arrive.
pub async fn run_session<C, S, R, W>(
    coach: &mut CoachRuntime<C, S>,
    input: R,
    output: &mut W,
) -> Result<SessionSummary>
where
    C: LlmClient,
    S: StateStore,
    R: BufRead,
    W: Write,
{
    let mut summary = SessionSummary::default();

    for line in input.lines() {
        let line = line.context("failed to read chat input")?;
        let text = line.trim();

        if QUIT_COMMANDS.contains(&text) {
            break;
        }
        if text == RESET_COMMAND {
            match coach.reset_chat().await {
                Ok(()) => {
                    summary.resets += 1;
                    writeln!(output, "coach> Chat cleared.")?;
                }
                Err(error) => {
                    summary.errors += 1;
                    writeln!(output, "error> {error}")?;
                }
            }
            continue;
        }

        match coach.handle_message(text).await {
            Ok(report) => {
                if report.kind == TurnKind::Ignored {
                    continue;
                }
                summary.turns += 1;
                for reply in &report.replies {
                    writeln!(output, "coach> {}", reply.text)?;
                }
                if let Some(error) = &report.error {
                    summary.errors += 1;
                    writeln!(output, "error> {error}")?;
                }
            }
            Err(error) => {
                summary.errors += 1;
                tracing::warn!(
                    event_name = "cli.chat.turn_failed",
                    error = %error,
                    "chat turn failed"
                );
                let interface = error.into_interface("cli");
                writeln!(output, "error> {}", interface.user_message())?;
            }
        }
        output.flush()?;
    }

    Ok(summary)
}
