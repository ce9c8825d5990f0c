use std::sync::Arc;

use tracing::{info, warn};

use irongpt_core::audit::{
    AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink, NoopAuditSink,
};
use irongpt_core::domain::intent::{Intent, SlotKey};
use irongpt_core::errors::ApplicationError;
use irongpt_core::store::{AppState, ChatMessage, StateStore};

use crate::dialogue::{DialogueManager, GenerationRequest, TurnOutcome};
use crate::generation::{NutritionRequest, PlanGenerator, WorkoutRequest};
use crate::llm::{LlmClient, COACH_SYSTEM_PROMPT};

pub const WORKOUT_PENDING: &str = "Generating your workout plan…";
pub const WORKOUT_READY: &str = "✅ Workout plan is ready! Check the Workout tab.";
pub const NUTRITION_PENDING: &str = "Generating your nutrition plan…";
pub const NUTRITION_READY: &str = "✅ Nutrition plan is ready! Check the Nutrition tab.";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TurnKind {
    Ignored,
    Prompted(SlotKey),
    PlanGenerated(Intent),
    PlanFailed(Intent),
    Chatted,
    ChatFailed,
}

/// What one user message produced. `replies` are the assistant messages appended this turn.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TurnReport {
    pub kind: TurnKind,
    pub replies: Vec<ChatMessage>,
    pub error: Option<String>,
}

impl TurnReport {
    fn new(kind: TurnKind) -> Self {
        Self { kind, replies: Vec::new(), error: None }
    }
}

/// Ties dialogue turns, plan generation and persisted state together.
pub struct CoachRuntime<C, S> {
    generator: PlanGenerator<C>,
    store: Arc<S>,
    dialogue: DialogueManager,
    audit: AuditContext,
    sink: Arc<dyn AuditSink>,
}

impl<C, S> CoachRuntime<C, S>
where
    C: LlmClient,
    S: StateStore,
{
    pub fn new(generator: PlanGenerator<C>, store: Arc<S>) -> Self {
        Self::with_audit(
            generator,
            store,
            AuditContext::new("local", "init", "coach"),
            Arc::new(NoopAuditSink),
        )
    }

    pub fn with_audit(
        generator: PlanGenerator<C>,
        store: Arc<S>,
        audit: AuditContext,
        sink: Arc<dyn AuditSink>,
    ) -> Self {
        let dialogue = DialogueManager::new(
            AuditContext::new(audit.session_id.clone(), audit.correlation_id.clone(), "dialogue"),
            sink.clone(),
        );
        Self { generator, store, dialogue, audit, sink }
    }

    pub fn dialogue(&self) -> &DialogueManager {
        &self.dialogue
    }

    pub async fn state(&self) -> Result<AppState, ApplicationError> {
        Ok(self.store.load().await?)
    }

    pub async fn handle_message(&mut self, text: &str) -> Result<TurnReport, ApplicationError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(TurnReport::new(TurnKind::Ignored));
        }
        self.audit = self.audit.next_turn();

        let mut state = self.store.load().await?;
        state.push_message(ChatMessage::user(text));

        let outcome = match self.dialogue.handle_turn(text) {
            Ok(outcome) => outcome,
            Err(error) => {
                self.store.save(&state).await?;
                return Err(error.into());
            }
        };

        let report = match outcome {
            TurnOutcome::Ignored => TurnReport::new(TurnKind::Ignored),
            TurnOutcome::Ask { slot, prompt } => {
                let mut report = TurnReport::new(TurnKind::Prompted(slot));
                reply(&mut state, &mut report, prompt);
                report
            }
            TurnOutcome::Dispatch(request) => self.dispatch(&mut state, request).await?,
            TurnOutcome::Fallback { text } => self.fallback_chat(&mut state, &text).await,
        };

        self.store.save(&state).await?;
        info!(
            event_name = "runtime.turn_handled",
            session_id = %self.audit.session_id,
            correlation_id = %self.audit.correlation_id,
            kind = ?report.kind,
            "user message handled"
        );
        Ok(report)
    }

    /// Clears the transcript and abandons any slot collection in progress.
    pub async fn reset_chat(&mut self) -> Result<(), ApplicationError> {
        self.dialogue.reset();
        let mut state = self.store.load().await?;
        state.clear_chat();
        self.store.save(&state).await?;
        Ok(())
    }

    async fn dispatch(
        &self,
        state: &mut AppState,
        request: GenerationRequest,
    ) -> Result<TurnReport, ApplicationError> {
        let intent = request.intent();
        let profile = state.profile.context();
        self.emit("generation.requested", AuditOutcome::Success, intent, None);

        let result = match request {
            GenerationRequest::Workout(args) => {
                let mut report = TurnReport::new(TurnKind::PlanGenerated(intent));
                reply(state, &mut report, WORKOUT_PENDING);
                state.workout.begin();
                self.store.save(state).await?;

                let request = WorkoutRequest::from_args(args, profile);
                match self.generator.generate_workout(&request).await {
                    Ok(plan) => {
                        state.workout.succeed(plan);
                        reply(state, &mut report, WORKOUT_READY);
                        Ok(report)
                    }
                    Err(error) => {
                        state.workout.fail(error.to_string());
                        Err((report, error.to_string()))
                    }
                }
            }
            GenerationRequest::Nutrition(args) => {
                let mut report = TurnReport::new(TurnKind::PlanGenerated(intent));
                reply(state, &mut report, NUTRITION_PENDING);
                state.nutrition.begin();
                self.store.save(state).await?;

                let request = NutritionRequest::from_args(args, profile);
                match self.generator.generate_nutrition(&request).await {
                    Ok(plan) => {
                        state.nutrition.succeed(plan);
                        reply(state, &mut report, NUTRITION_READY);
                        Ok(report)
                    }
                    Err(error) => {
                        state.nutrition.fail(error.to_string());
                        Err((report, error.to_string()))
                    }
                }
            }
        };

        match result {
            Ok(report) => {
                self.emit("generation.plan_stored", AuditOutcome::Success, intent, None);
                Ok(report)
            }
            Err((mut report, message)) => {
                warn!(
                    event_name = "runtime.generation_failed",
                    session_id = %self.audit.session_id,
                    correlation_id = %self.audit.correlation_id,
                    intent = %intent,
                    error = %message,
                    "plan generation failed"
                );
                self.emit("generation.failed", AuditOutcome::Failed, intent, Some(message.as_str()));
                report.kind = TurnKind::PlanFailed(intent);
                report.error = Some(message);
                Ok(report)
            }
        }
    }

    async fn fallback_chat(&self, state: &mut AppState, text: &str) -> TurnReport {
        match self.generator.client().chat(COACH_SYSTEM_PROMPT, text).await {
            Ok(answer) => {
                state.chat_error = None;
                let mut report = TurnReport::new(TurnKind::Chatted);
                reply(state, &mut report, answer);
                report
            }
            Err(error) => {
                let message = format!("{error:#}");
                warn!(
                    event_name = "runtime.chat_failed",
                    session_id = %self.audit.session_id,
                    correlation_id = %self.audit.correlation_id,
                    error = %message,
                    "chat completion failed"
                );
                state.chat_error = Some(message.clone());
                TurnReport { kind: TurnKind::ChatFailed, replies: Vec::new(), error: Some(message) }
            }
        }
    }

    fn emit(&self, event_type: &str, outcome: AuditOutcome, intent: Intent, error: Option<&str>) {
        let mut event = AuditEvent::new(
            self.audit.session_id.clone(),
            self.audit.correlation_id.clone(),
            event_type,
            AuditCategory::Generation,
            self.audit.actor.clone(),
            outcome,
        )
        .with_metadata("intent", intent.as_str());
        if let Some(error) = error {
            event = event.with_metadata("error", error);
        }
        self.sink.emit(event);
    }
}

fn reply(state: &mut AppState, report: &mut TurnReport, text: impl Into<String>) {
    let message = ChatMessage::assistant(text);
    state.push_message(message.clone());
    report.replies.push(message);
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use serde_json::json;

    use irongpt_core::audit::{AuditContext, InMemoryAuditSink};
    use irongpt_core::domain::intent::{Intent, SlotKey};
    use irongpt_core::domain::plan::WEEK_DAYS;
    use irongpt_core::store::{ChatRole, InMemoryStateStore, StateStore};

    use crate::generation::{PlanGenerator, RetryPolicy};
    use crate::llm::testing::ScriptedLlmClient;

    use super::{CoachRuntime, TurnKind, NUTRITION_PENDING, WORKOUT_PENDING, WORKOUT_READY};

    type TestRuntime = CoachRuntime<ScriptedLlmClient, InMemoryStateStore>;

    fn runtime(
        replies: Vec<Result<String, String>>,
    ) -> (TestRuntime, Arc<InMemoryStateStore>, InMemoryAuditSink) {
        let store = Arc::new(InMemoryStateStore::default());
        let sink = InMemoryAuditSink::default();
        let generator = PlanGenerator::new(
            Arc::new(ScriptedLlmClient::new(replies)),
            RetryPolicy { max_retries: 2, initial_delay: Duration::ZERO, max_delay: Duration::ZERO },
        );
        let runtime = CoachRuntime::with_audit(
            generator,
            store.clone(),
            AuditContext::new("session-1", "init", "test"),
            Arc::new(sink.clone()),
        );
        (runtime, store, sink)
    }

    fn workout_week() -> String {
        let week = WEEK_DAYS
            .iter()
            .map(|day| json!({ "day": day, "exercises": [] }))
            .collect::<Vec<_>>();
        json!({ "week": week }).to_string()
    }

    #[tokio::test]
    async fn workout_conversation_stores_generated_plan() {
        let (mut runtime, store, sink) = runtime(vec![Ok(workout_week())]);

        let first = runtime.handle_message("Make me a workout plan").await.expect("turn");
        assert_eq!(first.kind, TurnKind::Prompted(SlotKey::Frequency));
        for answer in ["4", "kettlebell", "30"] {
            runtime.handle_message(answer).await.expect("turn");
        }
        let last = runtime.handle_message("advanced").await.expect("turn");

        assert_eq!(last.kind, TurnKind::PlanGenerated(Intent::GenerateWorkout));
        let texts = last.replies.iter().map(|message| message.text.as_str()).collect::<Vec<_>>();
        assert_eq!(texts, vec![WORKOUT_PENDING, WORKOUT_READY]);

        let state = store.load().await.expect("state");
        assert_eq!(state.workout.plan.as_ref().map(|plan| plan.week.len()), Some(7));
        assert!(!state.workout.generating);
        // 5 user turns, 4 prompts, pending + ready
        assert_eq!(state.messages.len(), 11);
        assert_eq!(state.messages[0].role, ChatRole::User);
        assert_eq!(sink.events_of_type("generation.plan_stored").len(), 1);
    }

    #[tokio::test]
    async fn exhausted_generation_records_plan_error() {
        let failures = (0..3).map(|_| Err("upstream 503".to_string())).collect();
        let (mut runtime, store, sink) = runtime(failures);

        for text in ["I need a diet", "2000", "balanced", "none"] {
            runtime.handle_message(text).await.expect("turn");
        }

        let state = store.load().await.expect("state");
        assert!(state.nutrition.plan.is_none());
        assert!(!state.nutrition.generating);
        let error = state.nutrition.error.expect("error recorded");
        assert!(error.contains("3 attempt(s)"), "error: {error}");
        let last = state.messages.last().map(|message| message.text.as_str());
        assert_eq!(last, Some(NUTRITION_PENDING));
        assert!(runtime.dialogue().active_intent().is_none());
        assert_eq!(sink.events_of_type("generation.failed").len(), 1);
    }

    #[tokio::test]
    async fn slotless_turns_use_chat_completion() {
        let (mut runtime, store, _sink) = runtime(vec![
            Ok("Keep your chest up.".to_string()),
            Err("rate limited".to_string()),
        ]);

        let report = runtime.handle_message("How is my squat form?").await.expect("turn");
        assert_eq!(report.kind, TurnKind::Chatted);
        assert_eq!(report.replies[0].text, "Keep your chest up.");

        let report = runtime.handle_message("I felt tired today").await.expect("turn");
        assert_eq!(report.kind, TurnKind::ChatFailed);
        let state = store.load().await.expect("state");
        assert_eq!(state.chat_error.as_deref(), Some("rate limited"));
        assert_eq!(state.messages.len(), 3);
    }

    #[tokio::test]
    async fn reset_chat_clears_transcript_and_session() {
        let (mut runtime, store, _sink) = runtime(Vec::new());
        runtime.handle_message("build muscle").await.expect("turn");
        assert_eq!(runtime.dialogue().active_intent(), Some(Intent::GenerateWorkout));

        runtime.reset_chat().await.expect("reset");
        assert!(runtime.dialogue().active_intent().is_none());
        assert!(store.load().await.expect("state").messages.is_empty());

        let report = runtime.handle_message("   ").await.expect("turn");
        assert_eq!(report.kind, TurnKind::Ignored);
        assert!(store.load().await.expect("state").messages.is_empty());
    }
}
