//! Persisted application state: profile, both plans and the chat transcript.
//!
//! Plans follow a pending / fulfilled / rejected lifecycle through
//! [`PlanState`]; the transcript is an append-only list of [`ChatMessage`]s.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::plan::{NutritionPlan, WorkoutPlan};
use crate::domain::profile::Profile;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlanState<T> {
    pub plan: Option<T>,
    pub generating: bool,
    pub error: Option<String>,
}

impl<T> Default for PlanState<T> {
    fn default() -> Self {
        Self { plan: None, generating: false, error: None }
    }
}

impl<T> PlanState<T> {
    /// Request dispatched. A previous plan stays visible until replaced.
    pub fn begin(&mut self) {
        self.generating = true;
        self.error = None;
    }

    pub fn succeed(&mut self, plan: T) {
        self.plan = Some(plan);
        self.generating = false;
        self.error = None;
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        self.generating = false;
        self.error = Some(message.into());
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub role: ChatRole,
    pub text: String,
    pub ts: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(role: ChatRole, text: impl Into<String>) -> Self {
        Self { id: Uuid::new_v4().to_string(), role, text: text.into(), ts: Utc::now() }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(ChatRole::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(ChatRole::Assistant, text)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AppState {
    #[serde(default)]
    pub profile: Profile,
    #[serde(default)]
    pub workout: PlanState<WorkoutPlan>,
    #[serde(default)]
    pub nutrition: PlanState<NutritionPlan>,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    /// Last failed free-form chat reply, shown beside the transcript.
    #[serde(default)]
    pub chat_error: Option<String>,
}

impl AppState {
    pub fn push_message(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn clear_chat(&mut self) {
        self.messages.clear();
        self.chat_error = None;
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("could not access state file `{path}`: {source}")]
    Io { path: PathBuf, source: std::io::Error },
    #[error("could not decode state file `{path}`: {source}")]
    Decode { path: PathBuf, source: serde_json::Error },
    #[error("could not encode state: {0}")]
    Encode(#[source] serde_json::Error),
}

#[async_trait]
pub trait StateStore: Send + Sync {
    async fn load(&self) -> Result<AppState, StoreError>;
    async fn save(&self, state: &AppState) -> Result<(), StoreError>;
}

#[derive(Default)]
pub struct InMemoryStateStore {
    state: RwLock<AppState>,
}

impl InMemoryStateStore {
    pub fn new(state: AppState) -> Self {
        Self { state: RwLock::new(state) }
    }
}

#[async_trait]
impl StateStore for InMemoryStateStore {
    async fn load(&self) -> Result<AppState, StoreError> {
        Ok(self.state.read().await.clone())
    }

    async fn save(&self, state: &AppState) -> Result<(), StoreError> {
        *self.state.write().await = state.clone();
        Ok(())
    }
}

/// JSON file on disk. A missing file loads as the default state.
#[derive(Clone, Debug)]
pub struct JsonFileStateStore {
    path: PathBuf,
}

impl JsonFileStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io { path: self.path.clone(), source }
    }
}

#[async_trait]
impl StateStore for JsonFileStateStore {
    async fn load(&self) -> Result<AppState, StoreError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(AppState::default()),
            Err(error) => return Err(self.io_error(error)),
        };
        serde_json::from_str(&raw)
            .map_err(|source| StoreError::Decode { path: self.path.clone(), source })
    }

    async fn save(&self, state: &AppState) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|error| self.io_error(error))?;
        }
        let json = serde_json::to_string_pretty(state).map_err(StoreError::Encode)?;
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, json).await.map_err(|error| self.io_error(error))?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(|error| self.io_error(error))
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::{
        AppState, ChatMessage, ChatRole, InMemoryStateStore, JsonFileStateStore, PlanState,
        StateStore, StoreError,
    };
    use crate::domain::plan::WorkoutPlan;

    #[test]
    fn plan_state_follows_request_lifecycle() {
        let mut state = PlanState::<WorkoutPlan>::default();
        state.begin();
        assert!(state.generating);

        state.fail("plan missing Sunday");
        assert!(!state.generating);
        assert_eq!(state.error.as_deref(), Some("plan missing Sunday"));

        state.begin();
        assert_eq!(state.error, None);
        state.succeed(WorkoutPlan::default());
        assert!(state.plan.is_some());
        assert!(!state.generating);

        state.clear();
        assert_eq!(state, PlanState::default());
    }

    #[tokio::test]
    async fn in_memory_store_round_trips_state() -> Result<(), StoreError> {
        let store = InMemoryStateStore::default();
        let mut state = store.load().await?;
        state.push_message(ChatMessage::user("make me a workout plan"));
        store.save(&state).await?;

        let loaded = store.load().await?;
        assert_eq!(loaded.messages.len(), 1);
        assert_eq!(loaded.messages[0].role, ChatRole::User);
        Ok(())
    }

    #[tokio::test]
    async fn json_store_defaults_when_file_is_missing() -> Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new()?;
        let store = JsonFileStateStore::new(dir.path().join("nested").join("state.json"));
        assert_eq!(store.load().await?, AppState::default());

        let mut state = AppState::default();
        state.profile.age = 31;
        state.nutrition.fail("timed out");
        state.push_message(ChatMessage::assistant("How many minutes per session?"));
        store.save(&state).await?;

        assert!(store.path().exists());
        assert!(!store.path().with_extension("tmp").exists());
        let loaded = store.load().await?;
        assert_eq!(loaded.profile.age, 31);
        assert_eq!(loaded.nutrition.error.as_deref(), Some("timed out"));
        assert_eq!(loaded.messages, state.messages);
        Ok(())
    }

    #[tokio::test]
    async fn corrupt_state_file_is_a_decode_error() -> Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new()?;
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{not json")?;

        let error = JsonFileStateStore::new(&path).load().await.err();
        assert!(matches!(error, Some(StoreError::Decode { .. })));
        Ok(())
    }
}
