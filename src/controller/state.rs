//! Session state types

use crate::goals::Goal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;

/// Prefix marking prompts the controller synthesized for itself
pub const INTERNAL_PROMPT_PREFIX: &str = "###";

// ============================================================================
// Conversation History
// ============================================================================

/// Who produced a history entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Actor {
    #[serde(rename = "user")]
    User,
    #[serde(rename = "agent")]
    Agent,
    #[serde(rename = "user_confirmed_tool_run")]
    ToolConfirmation,
    #[serde(rename = "tool_result")]
    ToolResult,
    #[serde(rename = "conversation_summary")]
    Summary,
}

/// Message payload: plain text or structured data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Data(Value),
}

impl From<String> for MessageContent {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for MessageContent {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<Value> for MessageContent {
    fn from(value: Value) -> Self {
        Self::Data(value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub actor: Actor,
    #[serde(rename = "response")]
    pub content: MessageContent,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn new(actor: Actor, content: impl Into<MessageContent>) -> Self {
        Self {
            actor,
            content: content.into(),
            created_at: Utc::now(),
        }
    }

    pub fn text(&self) -> Option<&str> {
        match &self.content {
            MessageContent::Text(text) => Some(text),
            MessageContent::Data(_) => None,
        }
    }
}

// ============================================================================
// Prompt Queue
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptOrigin {
    User,
    Internal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedPrompt {
    pub text: String,
    pub origin: PromptOrigin,
}

impl QueuedPrompt {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            origin: PromptOrigin::User,
        }
    }

    /// Synthesized follow-up; carries the reserved prefix so the planner can
    /// tell it apart from user text
    pub fn internal(text: impl AsRef<str>) -> Self {
        Self {
            text: format!("{INTERNAL_PROMPT_PREFIX} {}", text.as_ref()),
            origin: PromptOrigin::Internal,
        }
    }

    /// Rebuild a prompt from a continuation payload, where only the text
    /// survives. The reserved prefix is the only tag available there.
    pub fn from_carried(text: String) -> Self {
        let origin = if text.starts_with(INTERNAL_PROMPT_PREFIX) {
            PromptOrigin::Internal
        } else {
            PromptOrigin::User
        };
        Self { text, origin }
    }

    pub fn is_internal(&self) -> bool {
        self.origin == PromptOrigin::Internal
    }
}

// ============================================================================
// Planner Decisions
// ============================================================================

/// Raw planner response, as exposed by `get_latest_tool_data`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolData {
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
    #[serde(default)]
    pub args: Map<String, Value>,
    #[serde(default)]
    pub response: String,
}

impl ToolData {
    pub fn new(next: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            next: Some(next.into()),
            tool: None,
            args: Map::new(),
            response: response.into(),
        }
    }

    pub fn confirm(
        tool: impl Into<String>,
        args: Map<String, Value>,
        response: impl Into<String>,
    ) -> Self {
        Self {
            next: Some(NextStep::Confirm.as_str().to_string()),
            tool: Some(tool.into()),
            args,
            response: response.into(),
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Control decisions a planner may return
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextStep {
    /// Ask the user something; no control-flow change
    Question,
    Confirm,
    PickNewGoal,
    Done,
}

impl NextStep {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "question" => Some(Self::Question),
            "confirm" => Some(Self::Confirm),
            "pick-new-goal" => Some(Self::PickNewGoal),
            "done" => Some(Self::Done),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Question => "question",
            Self::Confirm => "confirm",
            Self::PickNewGoal => "pick-new-goal",
            Self::Done => "done",
        }
    }
}

/// A tool the planner selected with complete arguments, awaiting confirmation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingAction {
    pub tool: String,
    pub args: Map<String, Value>,
    pub decision: ToolData,
}

impl PendingAction {
    /// Payload recorded in history when the action is confirmed
    pub fn confirmation_record(&self) -> Value {
        let mut record = self.decision.to_value();
        if let Some(obj) = record.as_object_mut() {
            obj.insert("next".to_string(), json!("user_confirmed_tool_run"));
        }
        record
    }
}

// ============================================================================
// Tool Results
// ============================================================================

/// Control-flow directive carried by a tool result
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolDirective {
    #[default]
    None,
    ChangeGoal {
        goal_id: String,
    },
    RelistAgents,
}

/// Structured tool output. Expected business failures set `error` rather
/// than failing the dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub tool: String,
    #[serde(default)]
    pub payload: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub directive: ToolDirective,
}

impl ToolResult {
    pub fn success(tool: impl Into<String>, payload: Value) -> Self {
        Self {
            tool: tool.into(),
            payload,
            error: None,
            directive: ToolDirective::None,
        }
    }

    pub fn error(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            payload: Value::Null,
            error: Some(message.into()),
            directive: ToolDirective::None,
        }
    }

    #[must_use]
    pub fn with_directive(mut self, directive: ToolDirective) -> Self {
        self.directive = directive;
        self
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

// ============================================================================
// Continuation Payload
// ============================================================================

/// State carried across a continuation boundary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Continuation {
    pub summary: Option<String>,
    pub pending_prompts: Vec<String>,
    pub goal_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_action: Option<PendingAction>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub confirmation_granted: bool,
}

// ============================================================================
// Controller State
// ============================================================================

/// How a selected tool gets its go-ahead
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfirmationPolicy {
    /// Wait for an explicit `confirm()`
    #[default]
    Manual,
    /// Grant confirmation as soon as the action is created
    Auto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Running,
    /// Ended by `end_chat`
    Ended,
    /// Planner declared the conversation done
    Completed,
    /// A fatal error stopped the session
    Failed,
}

/// Final result of a session
#[derive(Debug, Clone, Serialize)]
pub struct SessionOutcome {
    pub status: SessionStatus,
    pub history: Vec<Message>,
    pub summary: Option<String>,
    pub error: Option<String>,
}

/// Everything a session owns. Only the controller loop touches history,
/// goal, tool data and the pending action; signals only touch the queue and
/// the two flags.
#[derive(Debug, Clone)]
pub struct ControllerState {
    pub goal: Goal,
    pub history: Vec<Message>,
    pub queue: VecDeque<QueuedPrompt>,
    pub tool_data: Option<ToolData>,
    pub tool_results: Vec<ToolResult>,
    pub pending_action: Option<PendingAction>,
    pub confirmation_granted: bool,
    pub chat_ended: bool,
    pub summary: Option<String>,
    pub status: SessionStatus,
    pub error: Option<String>,
}

impl ControllerState {
    pub fn new(goal: Goal) -> Self {
        Self {
            goal,
            history: Vec::new(),
            queue: VecDeque::new(),
            tool_data: None,
            tool_results: Vec::new(),
            pending_action: None,
            confirmation_granted: false,
            chat_ended: false,
            summary: None,
            status: SessionStatus::Running,
            error: None,
        }
    }

    /// Seed a fresh state from a continuation payload
    pub fn from_continuation(goal: Goal, continuation: Continuation) -> Self {
        let queue = continuation
            .pending_prompts
            .into_iter()
            .map(QueuedPrompt::from_carried)
            .collect();
        Self::continued(
            goal,
            continuation.summary,
            queue,
            continuation.pending_action,
            continuation.confirmation_granted,
        )
    }

    pub(crate) fn continued(
        goal: Goal,
        summary: Option<String>,
        queue: VecDeque<QueuedPrompt>,
        pending_action: Option<PendingAction>,
        confirmation_granted: bool,
    ) -> Self {
        let mut state = Self::new(goal);
        if let Some(summary) = summary {
            state.add_message(Actor::Summary, summary.as_str());
            state.summary = Some(summary);
        }
        state.queue = queue;
        state.confirmation_granted = confirmation_granted && pending_action.is_some();
        state.pending_action = pending_action;
        state
    }

    /// Snapshot the parts of this state that survive a continuation
    pub fn to_continuation(&self, summary: Option<String>) -> Continuation {
        Continuation {
            summary,
            pending_prompts: self.queue.iter().map(|p| p.text.clone()).collect(),
            goal_id: self.goal.id.clone(),
            pending_action: self.pending_action.clone(),
            confirmation_granted: self.confirmation_granted,
        }
    }

    pub fn add_message(&mut self, actor: Actor, content: impl Into<MessageContent>) {
        let message = Message::new(actor, content);
        tracing::debug!(actor = ?message.actor, "Adding message");
        self.history.push(message);
    }

    pub fn is_accepting(&self) -> bool {
        !self.chat_ended && self.status == SessionStatus::Running
    }

    /// Append a user prompt. Returns false (and drops it) once the chat is
    /// closed.
    pub fn submit_prompt(&mut self, prompt: QueuedPrompt) -> bool {
        if !self.is_accepting() {
            return false;
        }
        self.queue.push_back(prompt);
        true
    }

    /// Grant confirmation. Returns false when there is nothing to confirm.
    pub fn confirm(&mut self) -> bool {
        if self.pending_action.is_none() {
            return false;
        }
        self.confirmation_granted = true;
        true
    }

    /// Returns true only on the first call
    pub fn end_chat(&mut self) -> bool {
        let first = !self.chat_ended;
        self.chat_ended = true;
        first
    }

    /// Switch goal; any pending action belongs to the old goal and is dropped
    pub fn set_goal(&mut self, goal: Goal) {
        self.pending_action = None;
        self.confirmation_granted = false;
        self.goal = goal;
    }

    pub fn latest_tool_result(&self) -> Option<&ToolResult> {
        self.tool_results.last()
    }

    pub fn outcome(&self) -> SessionOutcome {
        SessionOutcome {
            status: self.status,
            history: self.history.clone(),
            summary: self.summary.clone(),
            error: self.error.clone(),
        }
    }
}

// ============================================================================
// Shared Session Cell
// ============================================================================

/// The state cell shared by a session's controller loop and its signal
/// senders. The lock is never held across an await point.
#[derive(Debug)]
pub struct SharedState {
    session_id: String,
    state: Mutex<ControllerState>,
    wake: Notify,
}

impl SharedState {
    pub fn new(session_id: impl Into<String>, state: ControllerState) -> Self {
        Self {
            session_id: session_id.into(),
            state: Mutex::new(state),
            wake: Notify::new(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, ControllerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) async fn wait_for_signal(&self) {
        self.wake.notified().await;
    }

    pub(crate) fn notify(&self) {
        self.wake.notify_one();
    }

    pub fn submit_prompt(&self, text: &str) {
        tracing::info!(session_id = %self.session_id, prompt = %text, "Signal received: user_prompt");
        let accepted = self.lock().submit_prompt(QueuedPrompt::user(text));
        if accepted {
            self.notify();
        } else {
            tracing::warn!(session_id = %self.session_id, prompt = %text, "Message dropped due to chat closed");
        }
    }

    pub fn confirm(&self) {
        tracing::info!(session_id = %self.session_id, "Signal received: confirm");
        if self.lock().confirm() {
            self.notify();
        } else {
            tracing::debug!(session_id = %self.session_id, "Confirm ignored, no pending action");
        }
    }

    pub fn end_chat(&self) {
        tracing::info!(session_id = %self.session_id, "Signal received: end_chat");
        if self.lock().end_chat() {
            self.notify();
        }
    }

    pub fn history(&self) -> Vec<Message> {
        self.lock().history.clone()
    }

    pub fn goal(&self) -> Goal {
        self.lock().goal.clone()
    }

    pub fn latest_tool_data(&self) -> Option<ToolData> {
        self.lock().tool_data.clone()
    }

    pub fn summary(&self) -> Option<String> {
        self.lock().summary.clone()
    }

    pub fn status(&self) -> SessionStatus {
        self.lock().status
    }

    pub fn pending_action(&self) -> Option<PendingAction> {
        self.lock().pending_action.clone()
    }

    pub fn queued_prompts(&self) -> Vec<QueuedPrompt> {
        self.lock().queue.iter().cloned().collect()
    }
}
