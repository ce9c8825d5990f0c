pub mod audit;
pub mod config;
pub mod domain;
pub mod errors;
pub mod flows;
pub mod store;

pub use domain::intent::{clarifying_question, Intent, SlotKey, SlotValue};
pub use domain::plan::{NutritionPlan, PlanValidationError, WorkoutPlan};
pub use domain::profile::{Profile, ProfileContext};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use flows::{ConversationFlow, ConversationState, FlowAction, FlowEvent};
pub use store::{AppState, ChatMessage, JsonFileStateStore, PlanState, StateStore};
