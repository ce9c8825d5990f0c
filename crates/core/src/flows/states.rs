use serde::{Deserialize, Serialize};

use crate::domain::intent::{Intent, SlotKey};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConversationState {
    #[default]
    Idle,
    Collecting {
        intent: Intent,
        missing: usize,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowEvent {
    IntentClassified { intent: Intent },
    SlotRecorded { slot: SlotKey },
    Reset,
}

/// Slot manager view after the event was applied to it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct FlowContext {
    pub missing_slots: Vec<SlotKey>,
}

impl FlowContext {
    pub fn new(missing_slots: Vec<SlotKey>) -> Self {
        Self { missing_slots }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowAction {
    PromptForSlot(SlotKey),
    DispatchGeneration(Intent),
    FallbackChat,
    DiscardSession,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub from: ConversationState,
    pub to: ConversationState,
    pub event: FlowEvent,
    pub actions: Vec<FlowAction>,
}
