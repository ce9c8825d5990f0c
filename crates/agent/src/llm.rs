use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

pub const COACH_SYSTEM_PROMPT: &str = "You are IronGPT, an AI fitness coach.";
pub const NUTRITION_SYSTEM_PROMPT: &str = "You are IronGPT, an AI nutrition coach.";

/// Function the model is forced to call; `parameters` is a JSON schema.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FunctionSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Value,
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Free-form reply to a single user message.
    async fn chat(&self, system: &str, user: &str) -> Result<String>;

    /// Raw JSON arguments of the model's call to `function`.
    async fn call_function(&self, system: &str, user: &str, function: &FunctionSpec)
        -> Result<String>;
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use anyhow::{anyhow, Result};
    use async_trait::async_trait;

    use super::{FunctionSpec, LlmClient};

    /// Replays queued replies in order and records every prompt it saw.
    #[derive(Default)]
    pub(crate) struct ScriptedLlmClient {
        replies: Mutex<VecDeque<Result<String, String>>>,
        pub(crate) prompts: Mutex<Vec<(String, String)>>,
    }

    impl ScriptedLlmClient {
        pub(crate) fn new(replies: Vec<Result<String, String>>) -> Self {
            Self { replies: Mutex::new(replies.into()), prompts: Mutex::default() }
        }

        pub(crate) fn calls(&self) -> usize {
            self.prompts.lock().map(|prompts| prompts.len()).unwrap_or_default()
        }

        fn next(&self, system: &str, user: &str) -> Result<String> {
            if let Ok(mut prompts) = self.prompts.lock() {
                prompts.push((system.to_string(), user.to_string()));
            }
            let reply = self.replies.lock().ok().and_then(|mut replies| replies.pop_front());
            match reply {
                Some(Ok(text)) => Ok(text),
                Some(Err(message)) => Err(anyhow!(message)),
                None => Err(anyhow!("no scripted reply left")),
            }
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedLlmClient {
        async fn chat(&self, system: &str, user: &str) -> Result<String> {
            self.next(system, user)
        }

        async fn call_function(
            &self,
            system: &str,
            user: &str,
            _function: &FunctionSpec,
        ) -> Result<String> {
            self.next(system, user)
        }
    }
}
