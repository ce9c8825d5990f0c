//! Coach agent: turns chat messages into slot-filling dialogue and plan requests.
//!
//! The agent follows a constrained loop:
//! 1. **Classification** (`conversation`) - keyword match the opening utterance to an `Intent`
//! 2. **Slot filling** (`slots`, `dialogue`) - ask one clarifying question per missing slot
//! 3. **Generation** (`generation`) - forced function call with validation and bounded retry
//! 4. **Runtime** (`runtime`) - transcript, plan state and persistence around each turn
//!
//! # Key Types
//!
//! - `DialogueManager` - per-chat orchestration of the conversation state machine
//! - `LlmClient` - pluggable completion service (`OpenAiCompatibleClient` over HTTP)
//! - `CoachRuntime` - async entry point used by the CLI
//!
//! The model never decides which questions are asked or when a request is
//! complete. Those are deterministic decisions made by the slot tables in core.

pub mod conversation;
pub mod dialogue;
pub mod generation;
pub mod llm;
pub mod openai;
pub mod runtime;
pub mod slots;

pub use conversation::{classify, IntentClassifier};
pub use dialogue::{DialogueManager, GenerationRequest, TurnOutcome};
pub use generation::{GenerationError, PlanGenerator, RetryPolicy};
pub use llm::LlmClient;
pub use openai::OpenAiCompatibleClient;
pub use runtime::{CoachRuntime, TurnKind, TurnReport};
pub use slots::SlotManager;
