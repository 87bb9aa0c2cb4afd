//! Runtime for hosting conversation sessions
//!
//! Each session runs its controller on its own tokio task. Sessions share
//! nothing mutable; only the goal catalog and the collaborator backends are
//! shared, both read-only.

mod retry;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use retry::{retry, RetryFailure, RetryPolicy};
pub use traits::*;

use crate::controller::{
    Continuation, ControllerConfig, ControllerState, ConversationController, Message,
    QueuedPrompt, SessionOutcome, SessionStatus, SharedState, ToolData,
};
use crate::error::SessionError;
use crate::goals::{Goal, GoalCatalog};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{watch, RwLock};

/// Handle to interact with a running session
#[derive(Clone)]
pub struct SessionHandle {
    shared: Arc<SharedState>,
    outcome_rx: watch::Receiver<Option<SessionOutcome>>,
}

impl SessionHandle {
    pub fn id(&self) -> &str {
        self.shared.session_id()
    }

    pub fn submit_prompt(&self, text: &str) {
        self.shared.submit_prompt(text);
    }

    pub fn confirm(&self) {
        self.shared.confirm();
    }

    pub fn end_chat(&self) {
        self.shared.end_chat();
    }

    pub fn get_history(&self) -> Vec<Message> {
        self.shared.history()
    }

    pub fn get_goal(&self) -> Goal {
        self.shared.goal()
    }

    pub fn get_latest_tool_data(&self) -> Option<ToolData> {
        self.shared.latest_tool_data()
    }

    pub fn get_summary(&self) -> Option<String> {
        self.shared.summary()
    }

    pub fn status(&self) -> SessionStatus {
        self.shared.status()
    }

    /// Wait for the controller to stop and return its outcome
    pub async fn wait(&self) -> SessionOutcome {
        let mut rx = self.outcome_rx.clone();
        loop {
            let current = rx.borrow_and_update().clone();
            if let Some(outcome) = current {
                return outcome;
            }
            if rx.changed().await.is_err() {
                // Task went away without reporting (panic); report what we have
                return self.shared.lock().outcome();
            }
        }
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("id", &self.id())
            .finish_non_exhaustive()
    }
}

/// Manager for all sessions
pub struct SessionManager {
    catalog: Arc<GoalCatalog>,
    collaborators: Collaborators,
    config: ControllerConfig,
    /// Queue the goal's starter prompt when a session starts
    send_starter_prompt: bool,
    sessions: RwLock<HashMap<String, SessionHandle>>,
}

impl SessionManager {
    pub fn new(
        catalog: Arc<GoalCatalog>,
        collaborators: Collaborators,
        config: ControllerConfig,
    ) -> Self {
        Self {
            catalog,
            collaborators,
            config,
            send_starter_prompt: false,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn with_starter_prompt(mut self, enabled: bool) -> Self {
        self.send_starter_prompt = enabled;
        self
    }

    pub fn catalog(&self) -> &Arc<GoalCatalog> {
        &self.catalog
    }

    /// Start a fresh session on `goal_id`
    pub async fn start_session(&self, goal_id: &str) -> Result<SessionHandle, SessionError> {
        let goal = self
            .catalog
            .lookup(goal_id)
            .cloned()
            .ok_or_else(|| SessionError::UnknownGoal(goal_id.to_string()))?;

        let mut state = ControllerState::new(goal);
        if self.send_starter_prompt && !state.goal.starter_prompt.is_empty() {
            let starter = QueuedPrompt::internal(&state.goal.starter_prompt);
            state.queue.push_back(starter);
        }

        let session_id = uuid::Uuid::new_v4().to_string();
        Ok(self.spawn(session_id, state).await)
    }

    /// Start a session seeded from a continuation payload produced elsewhere
    pub async fn resume_session(
        &self,
        continuation: Continuation,
    ) -> Result<SessionHandle, SessionError> {
        let goal = self
            .catalog
            .lookup(&continuation.goal_id)
            .cloned()
            .ok_or_else(|| SessionError::UnknownGoal(continuation.goal_id.clone()))?;

        let state = ControllerState::from_continuation(goal, continuation);
        let session_id = uuid::Uuid::new_v4().to_string();
        Ok(self.spawn(session_id, state).await)
    }

    async fn spawn(&self, session_id: String, state: ControllerState) -> SessionHandle {
        tracing::info!(session_id = %session_id, goal = %state.goal.id, "Starting session");

        let shared = Arc::new(SharedState::new(session_id.clone(), state));
        let (outcome_tx, outcome_rx) = watch::channel(None);

        let controller = ConversationController::new(
            shared.clone(),
            self.catalog.clone(),
            self.collaborators.clone(),
            self.config,
        );

        let task_session_id = session_id.clone();
        tokio::spawn(async move {
            let outcome = controller.run().await;
            tracing::info!(session_id = %task_session_id, status = ?outcome.status, "Session finished");
            let _ = outcome_tx.send(Some(outcome));
        });

        let handle = SessionHandle { shared, outcome_rx };
        self.sessions
            .write()
            .await
            .insert(session_id, handle.clone());
        handle
    }

    pub async fn get(&self, session_id: &str) -> Result<SessionHandle, SessionError> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .cloned()
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))
    }

    /// Forget a session. Its controller keeps running until it terminates.
    pub async fn remove(&self, session_id: &str) -> Option<SessionHandle> {
        self.sessions.write().await.remove(session_id)
    }

    pub async fn session_ids(&self) -> Vec<String> {
        self.sessions.read().await.keys().cloned().collect()
    }

    pub async fn submit_prompt(&self, session_id: &str, text: &str) -> Result<(), SessionError> {
        self.get(session_id).await?.submit_prompt(text);
        Ok(())
    }

    pub async fn confirm(&self, session_id: &str) -> Result<(), SessionError> {
        self.get(session_id).await?.confirm();
        Ok(())
    }

    pub async fn end_chat(&self, session_id: &str) -> Result<(), SessionError> {
        self.get(session_id).await?.end_chat();
        Ok(())
    }

    pub async fn get_history(&self, session_id: &str) -> Result<Vec<Message>, SessionError> {
        Ok(self.get(session_id).await?.get_history())
    }

    pub async fn get_goal(&self, session_id: &str) -> Result<Goal, SessionError> {
        Ok(self.get(session_id).await?.get_goal())
    }

    pub async fn get_latest_tool_data(
        &self,
        session_id: &str,
    ) -> Result<Option<ToolData>, SessionError> {
        Ok(self.get(session_id).await?.get_latest_tool_data())
    }

    pub async fn get_summary(&self, session_id: &str) -> Result<Option<String>, SessionError> {
        Ok(self.get(session_id).await?.get_summary())
    }

    /// End every session and wait for all controllers to stop
    pub async fn shutdown(&self) -> Vec<SessionOutcome> {
        let handles: Vec<SessionHandle> = self.sessions.read().await.values().cloned().collect();
        tracing::info!(sessions = handles.len(), "Shutting down sessions");

        for handle in &handles {
            handle.end_chat();
        }
        futures::future::join_all(handles.iter().map(|handle| handle.wait())).await
    }
}
