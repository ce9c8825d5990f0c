pub mod engine;
pub mod states;

pub use engine::{ConversationFlow, FlowTransitionError};
pub use states::{ConversationState, FlowAction, FlowContext, FlowEvent, TransitionOutcome};
