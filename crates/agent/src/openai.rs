//! OpenAI-compatible chat completions client.
//!
//! Works against api.openai.com and local servers that speak the same
//! protocol (Ollama's `/v1` endpoint). Request building and response parsing
//! are plain functions so they can be tested without a network.

use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, instrument};

use irongpt_core::config::LlmConfig;

use crate::llm::{FunctionSpec, LlmClient};

const CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ToolCall>,
    /// Legacy `function_call` shape still returned by some compatible servers.
    function_call: Option<FunctionCall>,
}

#[derive(Debug, Deserialize)]
struct ToolCall {
    function: FunctionCall,
}

#[derive(Debug, Deserialize)]
struct FunctionCall {
    name: String,
    arguments: String,
}

pub struct OpenAiCompatibleClient {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<SecretString>,
}

impl OpenAiCompatibleClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: config.effective_base_url().to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn api_url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), endpoint)
    }

    async fn post(&self, body: &Value) -> Result<String> {
        let mut request = self.client.post(self.api_url("chat/completions")).json(body);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key.expose_secret());
        }

        let response = request.send().await.map_err(|error| {
            if error.is_connect() {
                anyhow!("cannot connect to completion service at {}: {error}", self.base_url)
            } else if error.is_timeout() {
                anyhow!("completion request timed out: {error}")
            } else {
                anyhow!("completion request failed: {error}")
            }
        })?;

        let status = response.status();
        let text = response.text().await.context("failed to read completion response")?;
        if !status.is_success() {
            bail!("completion service returned {status}: {}", truncate(&text, 300));
        }
        Ok(text)
    }
}

#[async_trait]
impl LlmClient for OpenAiCompatibleClient {
    #[instrument(skip(self, system, user), fields(model = %self.model))]
    async fn chat(&self, system: &str, user: &str) -> Result<String> {
        let body = chat_request_body(&self.model, system, user);
        let response = self.post(&body).await?;
        let content = parse_chat_content(&response)?;
        debug!(reply_chars = content.len(), "chat completion received");
        Ok(content)
    }

    #[instrument(skip(self, system, user, function), fields(model = %self.model, function = function.name))]
    async fn call_function(
        &self,
        system: &str,
        user: &str,
        function: &FunctionSpec,
    ) -> Result<String> {
        let body = function_request_body(&self.model, system, user, function);
        let response = self.post(&body).await?;
        let arguments = parse_function_arguments(&response, function.name)?;
        debug!(argument_chars = arguments.len(), "function call received");
        Ok(arguments)
    }
}

pub fn chat_request_body(model: &str, system: &str, user: &str) -> Value {
    json!({
        "model": model,
        "messages": messages(system, user),
    })
}

/// Request that forces the model to call `function`.
pub fn function_request_body(
    model: &str,
    system: &str,
    user: &str,
    function: &FunctionSpec,
) -> Value {
    json!({
        "model": model,
        "messages": messages(system, user),
        "tools": [{ "type": "function", "function": function }],
        "tool_choice": { "type": "function", "function": { "name": function.name } },
    })
}

fn messages(system: &str, user: &str) -> Value {
    json!([
        { "role": "system", "content": system },
        { "role": "user", "content": user },
    ])
}

pub fn parse_chat_content(body: &str) -> Result<String> {
    let message = first_message(body)?;
    message
        .content
        .map(|content| content.trim().to_string())
        .filter(|content| !content.is_empty())
        .ok_or_else(|| anyhow!("completion contained no message content"))
}

pub fn parse_function_arguments(body: &str, function_name: &str) -> Result<String> {
    let message = first_message(body)?;
    let call = message
        .tool_calls
        .into_iter()
        .map(|call| call.function)
        .chain(message.function_call)
        .find(|call| call.name == function_name)
        .ok_or_else(|| anyhow!("completion did not call `{function_name}`"))?;

    if call.arguments.trim().is_empty() {
        bail!("call to `{function_name}` carried no arguments");
    }
    Ok(call.arguments)
}

fn first_message(body: &str) -> Result<ResponseMessage> {
    let response: ChatCompletionResponse = serde_json::from_str(body)
        .with_context(|| format!("malformed completion response: {}", truncate(body, 200)))?;
    response
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message)
        .ok_or_else(|| anyhow!("completion returned no choices"))
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
