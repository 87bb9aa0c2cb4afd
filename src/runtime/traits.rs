//! Trait abstractions for the controller's external capabilities
//!
//! These traits let the controller run against real backends or the mocks
//! in `testing`.

use super::retry::RetryPolicy;
use crate::controller::{Message, ToolData, ToolResult};
use crate::error::CollaboratorError;
use crate::goals::Goal;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

// ============================================================================
// Request / Response Types
// ============================================================================

/// Input to the prompt validator
#[derive(Debug, Clone, Serialize)]
pub struct ValidationInput {
    pub prompt: String,
    pub history: Vec<Message>,
    pub goal: Goal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    #[serde(rename = "validationResult")]
    pub ok: bool,
    #[serde(rename = "validationFailedReason", default)]
    pub reason: String,
}

impl ValidationResult {
    pub fn accept() -> Self {
        Self {
            ok: true,
            reason: String::new(),
        }
    }

    pub fn reject(reason: impl Into<String>) -> Self {
        Self {
            ok: false,
            reason: reason.into(),
        }
    }
}

/// Everything the planner sees when choosing the next step
#[derive(Debug, Clone, Serialize)]
pub struct PlanningContext {
    pub prompt: String,
    pub goal: Goal,
    pub history: Vec<Message>,
    pub prior_tool_data: Option<ToolData>,
}

// ============================================================================
// Collaborator Traits
// ============================================================================

/// Checks a raw user prompt against the current goal and history.
/// Must be side-effect free; it is retried on transient failure.
#[async_trait]
pub trait PromptValidator: Send + Sync {
    async fn validate(&self, input: &ValidationInput)
        -> Result<ValidationResult, CollaboratorError>;
}

/// Chooses the next control decision
#[async_trait]
pub trait ToolPlanner: Send + Sync {
    async fn plan(&self, context: &PlanningContext) -> Result<ToolData, CollaboratorError>;
}

/// Executes tools by name
#[async_trait]
pub trait ToolDispatcher: Send + Sync {
    /// Run `tool`. Expected business failures come back as a `ToolResult`
    /// with `error` set; `Err` is reserved for failures worth retrying.
    async fn dispatch(
        &self,
        tool: &str,
        args: &Map<String, Value>,
    ) -> Result<ToolResult, CollaboratorError>;

    /// Tool-specific retry policy, if the tool needs one
    fn retry_policy(&self, _tool: &str) -> Option<RetryPolicy> {
        None
    }
}

/// Condenses a history into a short text summary
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, history: &[Message]) -> Result<String, CollaboratorError>;
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: PromptValidator + ?Sized> PromptValidator for Arc<T> {
    async fn validate(
        &self,
        input: &ValidationInput,
    ) -> Result<ValidationResult, CollaboratorError> {
        (**self).validate(input).await
    }
}

#[async_trait]
impl<T: ToolPlanner + ?Sized> ToolPlanner for Arc<T> {
    async fn plan(&self, context: &PlanningContext) -> Result<ToolData, CollaboratorError> {
        (**self).plan(context).await
    }
}

#[async_trait]
impl<T: ToolDispatcher + ?Sized> ToolDispatcher for Arc<T> {
    async fn dispatch(
        &self,
        tool: &str,
        args: &Map<String, Value>,
    ) -> Result<ToolResult, CollaboratorError> {
        (**self).dispatch(tool, args).await
    }

    fn retry_policy(&self, tool: &str) -> Option<RetryPolicy> {
        (**self).retry_policy(tool)
    }
}

#[async_trait]
impl<T: Summarizer + ?Sized> Summarizer for Arc<T> {
    async fn summarize(&self, history: &[Message]) -> Result<String, CollaboratorError> {
        (**self).summarize(history).await
    }
}

/// The capabilities a session talks to. Cheap to clone; every session
/// started by one manager shares the same backends.
#[derive(Clone)]
pub struct Collaborators {
    pub validator: Arc<dyn PromptValidator>,
    pub planner: Arc<dyn ToolPlanner>,
    pub dispatcher: Arc<dyn ToolDispatcher>,
    pub summarizer: Arc<dyn Summarizer>,
}

impl Collaborators {
    pub fn new(
        validator: impl PromptValidator + 'static,
        planner: impl ToolPlanner + 'static,
        dispatcher: impl ToolDispatcher + 'static,
        summarizer: impl Summarizer + 'static,
    ) -> Self {
        Self {
            validator: Arc::new(validator),
            planner: Arc::new(planner),
            dispatcher: Arc::new(dispatcher),
            summarizer: Arc::new(summarizer),
        }
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}
