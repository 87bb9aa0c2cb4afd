//! Goal-driven conversational agent controller
//!
//! Each session runs one [`ConversationController`] loop on its own task. The
//! loop waits for signals (prompt, confirm, end), asks a planner which tool to
//! run next, holds side-effecting tools until the user confirms them, and
//! hands the session off to a fresh summarised state once history grows past
//! the continuation threshold. [`SessionManager`] owns the live sessions.

pub mod config;
pub mod controller;
pub mod error;
pub mod goals;
pub mod runtime;
pub mod telemetry;
pub mod tools;

pub use config::{AgentConfig, ConfigError};
pub use controller::{
    ConfirmationPolicy, Continuation, ControllerConfig, ConversationController, Message,
    SessionOutcome, SessionStatus, ToolData, ToolResult,
};
pub use error::{CollaboratorError, CollaboratorErrorKind, ControllerError, SessionError};
pub use goals::{Goal, GoalCatalog, ToolSpec, GOAL_SELECTION_ID};
pub use runtime::{
    Collaborators, PromptValidator, RetryPolicy, SessionHandle, SessionManager, Summarizer,
    ToolDispatcher, ToolPlanner,
};
pub use tools::{Tool, ToolRegistry};
