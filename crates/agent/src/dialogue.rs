//! Per-turn orchestration of classification, slot filling and dispatch.
//!
//! A [`DialogueManager`] owns at most one [`SlotManager`] at a time. The first
//! utterance of an exchange is classified; every later utterance is recorded
//! verbatim into the first missing slot until the request can be dispatched.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use irongpt_core::audit::{AuditContext, AuditSink, NoopAuditSink};
use irongpt_core::domain::intent::{Intent, SlotKey, SlotValue};
use irongpt_core::errors::DomainError;
use irongpt_core::flows::{
    ConversationFlow, ConversationState, FlowAction, FlowContext, FlowEvent, TransitionOutcome,
};

use crate::conversation::IntentClassifier;
use crate::slots::SlotManager;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutArgs {
    pub goal: String,
    pub frequency: String,
    pub equipment: Vec<String>,
    pub duration_per_session: String,
    pub user_level: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NutritionArgs {
    pub requirement: String,
    pub target_calories: String,
    pub macros: String,
    pub dietary_prefs: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GenerationRequest {
    Workout(WorkoutArgs),
    Nutrition(NutritionArgs),
}

impl GenerationRequest {
    /// Shapes complete function args: list slots are normalized, the rest kept as text.
    pub fn from_args(
        intent: Intent,
        mut args: BTreeMap<String, SlotValue>,
    ) -> Result<Self, DomainError> {
        let mut take = |key: SlotKey| {
            args.remove(key.as_str()).ok_or_else(|| DomainError::PrematureExtraction {
                intent,
                missing: vec![key],
            })
        };

        match intent {
            Intent::GenerateWorkout => Ok(Self::Workout(WorkoutArgs {
                goal: take(SlotKey::Goal)?.as_text(),
                frequency: take(SlotKey::Frequency)?.as_text(),
                equipment: take(SlotKey::Equipment)?.into_list(),
                duration_per_session: take(SlotKey::DurationPerSession)?.as_text(),
                user_level: take(SlotKey::UserLevel)?.as_text(),
            })),
            Intent::GenerateNutrition => Ok(Self::Nutrition(NutritionArgs {
                requirement: take(SlotKey::Requirement)?.as_text(),
                target_calories: take(SlotKey::TargetCalories)?.as_text(),
                macros: take(SlotKey::Macros)?.as_text(),
                dietary_prefs: take(SlotKey::DietaryPrefs)?.into_list(),
            })),
            other => Err(DomainError::InvariantViolation(format!(
                "intent `{other}` has no generation request"
            ))),
        }
    }

    pub fn intent(&self) -> Intent {
        match self {
            Self::Workout(_) => Intent::GenerateWorkout,
            Self::Nutrition(_) => Intent::GenerateNutrition,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Blank input; nothing happened.
    Ignored,
    Ask { slot: SlotKey, prompt: &'static str },
    Dispatch(GenerationRequest),
    /// No slot flow for this intent; answer `text` with a generic chat completion.
    Fallback { text: String },
}

pub struct DialogueManager {
    classifier: IntentClassifier,
    flow: ConversationFlow,
    state: ConversationState,
    session: Option<SlotManager>,
    audit: AuditContext,
    sink: Arc<dyn AuditSink>,
}

impl Default for DialogueManager {
    fn default() -> Self {
        Self::new(AuditContext::new("local", "init", "dialogue"), Arc::new(NoopAuditSink))
    }
}

impl DialogueManager {
    pub fn new(audit: AuditContext, sink: Arc<dyn AuditSink>) -> Self {
        Self {
            classifier: IntentClassifier::new(),
            flow: ConversationFlow::new(),
            state: ConversationState::Idle,
            session: None,
            audit,
            sink,
        }
    }

    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    pub fn active_intent(&self) -> Option<Intent> {
        self.session.as_ref().map(SlotManager::intent)
    }

    pub fn missing_slots(&self) -> Vec<SlotKey> {
        self.session.as_ref().map(SlotManager::missing_slots).unwrap_or_default()
    }

    pub fn handle_turn(&mut self, text: &str) -> Result<TurnOutcome, DomainError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(TurnOutcome::Ignored);
        }
        self.audit = self.audit.next_turn();

        match self.session.clone() {
            None => self.open_exchange(text),
            Some(session) => self.answer_slot(session, text),
        }
    }

    /// Drops any in-flight session.
    pub fn reset(&mut self) {
        if let Err(error) = self.flow.apply_with_audit(
            &self.state,
            &FlowEvent::Reset,
            &FlowContext::default(),
            self.sink.as_ref(),
            &self.audit,
        ) {
            debug!(error = %error, "reset transition rejected");
        }
        self.state = ConversationState::Idle;
        self.session = None;
    }

    fn open_exchange(&mut self, text: &str) -> Result<TurnOutcome, DomainError> {
        let classified = self.classifier.classify_with_match(text);
        let intent = classified.intent;
        debug!(
            event_name = "dialogue.intent_classified",
            session_id = %self.audit.session_id,
            correlation_id = %self.audit.correlation_id,
            intent = %intent,
            keyword = classified.matched_keyword.unwrap_or("none"),
            "classified opening utterance"
        );

        let session = intent.requires_slots().then(|| {
            let mut session = SlotManager::new(intent);
            if let Some(seed) = intent.seed_slot() {
                session.record_slot(seed, text);
            }
            session
        });
        let context =
            FlowContext::new(session.as_ref().map(SlotManager::missing_slots).unwrap_or_default());

        let outcome = self.apply(FlowEvent::IntentClassified { intent }, &context)?;
        self.finish(outcome, session, text)
    }

    fn answer_slot(
        &mut self,
        mut session: SlotManager,
        text: &str,
    ) -> Result<TurnOutcome, DomainError> {
        let slot = session.missing_slots().first().copied().ok_or_else(|| {
            DomainError::InvariantViolation(format!(
                "session for `{}` is collecting with no missing slots",
                session.intent()
            ))
        })?;
        session.record_slot(slot, text);
        debug!(
            event_name = "dialogue.slot_recorded",
            session_id = %self.audit.session_id,
            correlation_id = %self.audit.correlation_id,
            slot = %slot,
            "recorded slot answer"
        );

        let context = FlowContext::new(session.missing_slots());
        let outcome = self.apply(FlowEvent::SlotRecorded { slot }, &context)?;
        self.finish(outcome, Some(session), text)
    }

    fn apply(
        &self,
        event: FlowEvent,
        context: &FlowContext,
    ) -> Result<TransitionOutcome, DomainError> {
        Ok(self.flow.apply_with_audit(
            &self.state,
            &event,
            context,
            self.sink.as_ref(),
            &self.audit,
        )?)
    }

    fn finish(
        &mut self,
        outcome: TransitionOutcome,
        mut session: Option<SlotManager>,
        text: &str,
    ) -> Result<TurnOutcome, DomainError> {
        let mut result = None;
        for action in &outcome.actions {
            match action {
                FlowAction::PromptForSlot(slot) => {
                    result =
                        Some(TurnOutcome::Ask { slot: *slot, prompt: slot.clarifying_question() });
                }
                FlowAction::DispatchGeneration(intent) => {
                    let args = session
                        .as_ref()
                        .ok_or_else(|| {
                            DomainError::InvariantViolation(format!(
                                "dispatch of `{intent}` without a session"
                            ))
                        })?
                        .try_build_function_args()?;
                    result = Some(TurnOutcome::Dispatch(GenerationRequest::from_args(
                        *intent, args,
                    )?));
                }
                FlowAction::FallbackChat => {
                    result = Some(TurnOutcome::Fallback { text: text.to_string() });
                }
                FlowAction::DiscardSession => session = None,
            }
        }

        self.state = outcome.to;
        self.session = session;
        result.ok_or_else(|| {
            DomainError::InvariantViolation("transition produced no turn outcome".to_string())
        })
    }
}
