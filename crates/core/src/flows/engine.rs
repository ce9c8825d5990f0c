use thiserror::Error;

use crate::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
use crate::flows::states::{
    ConversationState, FlowAction, FlowContext, FlowEvent, TransitionOutcome,
};

/// Per-exchange state machine: `Idle -> Collecting -> Idle`.
#[derive(Clone, Debug, Default)]
pub struct ConversationFlow;

impl ConversationFlow {
    pub fn new() -> Self {
        Self
    }

    pub fn initial_state(&self) -> ConversationState {
        ConversationState::Idle
    }

    pub fn apply(
        &self,
        current: &ConversationState,
        event: &FlowEvent,
        context: &FlowContext,
    ) -> Result<TransitionOutcome, FlowTransitionError> {
        transition(current, event, context)
    }

    pub fn apply_with_audit<S>(
        &self,
        current: &ConversationState,
        event: &FlowEvent,
        context: &FlowContext,
        sink: &S,
        audit: &AuditContext,
    ) -> Result<TransitionOutcome, FlowTransitionError>
    where
        S: AuditSink + ?Sized,
    {
        let result = self.apply(current, event, context);
        match &result {
            Ok(outcome) => {
                sink.emit(
                    AuditEvent::new(
                        audit.session_id.clone(),
                        audit.correlation_id.clone(),
                        "flow.transition_applied",
                        AuditCategory::Flow,
                        audit.actor.clone(),
                        AuditOutcome::Success,
                    )
                    .with_metadata("from", format!("{:?}", outcome.from))
                    .with_metadata("to", format!("{:?}", outcome.to))
                    .with_metadata("event", format!("{:?}", outcome.event)),
                );
            }
            Err(error) => {
                sink.emit(
                    AuditEvent::new(
                        audit.session_id.clone(),
                        audit.correlation_id.clone(),
                        "flow.transition_rejected",
                        AuditCategory::Flow,
                        audit.actor.clone(),
                        AuditOutcome::Rejected,
                    )
                    .with_metadata("error", error.to_string()),
                );
            }
        }
        result
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FlowTransitionError {
    #[error("invalid transition from {state:?} using event {event:?}")]
    InvalidTransition { state: ConversationState, event: FlowEvent },
}

fn transition(
    current: &ConversationState,
    event: &FlowEvent,
    context: &FlowContext,
) -> Result<TransitionOutcome, FlowTransitionError> {
    use ConversationState::{Collecting, Idle};
    use FlowAction::{DiscardSession, DispatchGeneration, FallbackChat, PromptForSlot};

    let (to, actions) = match (current, event) {
        (_, FlowEvent::Reset) => (Idle, vec![DiscardSession]),
        (Idle, FlowEvent::IntentClassified { intent }) if !intent.requires_slots() => {
            (Idle, vec![FallbackChat])
        }
        (Idle, FlowEvent::IntentClassified { intent })
        | (Collecting { intent, .. }, FlowEvent::SlotRecorded { .. }) => {
            match context.missing_slots.first() {
                Some(next) => (
                    Collecting { intent: *intent, missing: context.missing_slots.len() },
                    vec![PromptForSlot(*next)],
                ),
                None => (Idle, vec![DispatchGeneration(*intent), DiscardSession]),
            }
        }
        _ => {
            return Err(FlowTransitionError::InvalidTransition {
                state: current.clone(),
                event: event.clone(),
            });
        }
    };

    Ok(TransitionOutcome { from: current.clone(), to, event: event.clone(), actions })
}

#[cfg(test)]
mod tests {
    use crate::audit::{AuditContext, InMemoryAuditSink};
    use crate::domain::intent::{Intent, SlotKey};
    use crate::flows::engine::{ConversationFlow, FlowTransitionError};
    use crate::flows::states::{ConversationState, FlowAction, FlowContext, FlowEvent};

    fn remaining(intent: Intent, filled: usize) -> FlowContext {
        FlowContext::new(intent.required_slots()[filled..].to_vec())
    }

    #[test]
    fn workout_exchange_collects_then_dispatches() {
        let flow = ConversationFlow::new();
        let intent = Intent::GenerateWorkout;

        let started = flow
            .apply(
                &flow.initial_state(),
                &FlowEvent::IntentClassified { intent },
                &remaining(intent, 1),
            )
            .expect("idle -> collecting");
        assert_eq!(started.to, ConversationState::Collecting { intent, missing: 4 });
        assert_eq!(started.actions, vec![FlowAction::PromptForSlot(SlotKey::Frequency)]);

        let mut state = started.to;
        for filled in 2..=4 {
            let outcome = flow
                .apply(
                    &state,
                    &FlowEvent::SlotRecorded { slot: intent.required_slots()[filled - 1] },
                    &remaining(intent, filled),
                )
                .expect("collecting -> collecting");
            assert_eq!(outcome.to, ConversationState::Collecting { intent, missing: 5 - filled });
            state = outcome.to;
        }

        let done = flow
            .apply(
                &state,
                &FlowEvent::SlotRecorded { slot: SlotKey::UserLevel },
                &FlowContext::default(),
            )
            .expect("collecting -> idle");
        assert_eq!(done.to, ConversationState::Idle);
        assert_eq!(
            done.actions,
            vec![FlowAction::DispatchGeneration(intent), FlowAction::DiscardSession]
        );
    }

    #[test]
    fn slotless_intents_fall_back_to_chat() {
        let flow = ConversationFlow::new();
        for intent in [
            Intent::AskFormAdvice,
            Intent::LogFeeling,
            Intent::SwapExercise,
            Intent::ViewPlan,
            Intent::Clarify,
        ] {
            let outcome = flow
                .apply(
                    &ConversationState::Idle,
                    &FlowEvent::IntentClassified { intent },
                    &FlowContext::default(),
                )
                .expect("fallback");
            assert_eq!(outcome.to, ConversationState::Idle);
            assert_eq!(outcome.actions, vec![FlowAction::FallbackChat]);
        }
    }

    #[test]
    fn reclassification_mid_flow_is_rejected() {
        let flow = ConversationFlow::new();
        let collecting =
            ConversationState::Collecting { intent: Intent::GenerateNutrition, missing: 2 };
        let error = flow
            .apply(
                &collecting,
                &FlowEvent::IntentClassified { intent: Intent::GenerateWorkout },
                &FlowContext::default(),
            )
            .expect_err("intent is fixed for the exchange");
        assert!(matches!(error, FlowTransitionError::InvalidTransition { .. }));

        let error = flow
            .apply(
                &ConversationState::Idle,
                &FlowEvent::SlotRecorded { slot: SlotKey::Macros },
                &FlowContext::default(),
            )
            .expect_err("no session to record into");
        assert!(matches!(
            error,
            FlowTransitionError::InvalidTransition { state: ConversationState::Idle, .. }
        ));
    }

    #[test]
    fn reset_discards_from_any_state() {
        let flow = ConversationFlow::new();
        let collecting =
            ConversationState::Collecting { intent: Intent::GenerateWorkout, missing: 3 };
        let outcome =
            flow.apply(&collecting, &FlowEvent::Reset, &FlowContext::default()).expect("reset");
        assert_eq!(outcome.to, ConversationState::Idle);
        assert_eq!(outcome.actions, vec![FlowAction::DiscardSession]);
    }

    #[test]
    fn transitions_emit_audit_events() {
        let flow = ConversationFlow::new();
        let sink = InMemoryAuditSink::default();
        let audit = AuditContext::new("session-7", "turn-1", "dialogue");

        let _ = flow
            .apply_with_audit(
                &ConversationState::Idle,
                &FlowEvent::IntentClassified { intent: Intent::GenerateNutrition },
                &remaining(Intent::GenerateNutrition, 1),
                &sink,
                &audit,
            )
            .expect("transition should succeed");
        let _ = flow.apply_with_audit(
            &ConversationState::Idle,
            &FlowEvent::SlotRecorded { slot: SlotKey::Macros },
            &FlowContext::default(),
            &sink,
            &audit,
        );

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].session_id, "session-7");
        assert_eq!(events[0].event_type, "flow.transition_applied");
        assert_eq!(events[1].event_type, "flow.transition_rejected");
    }
}
