//! Goal-driven conversation controller
//!
//! Session state lives in a [`SharedState`] cell. Signals mutate it and wake
//! the loop; the loop evaluates a fixed-priority wake condition (see
//! [`transition::next_wake`]) and talks to collaborators without holding the
//! lock.

pub mod continuation;
mod executor;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use continuation::{ContinuationManager, DEFAULT_CONTINUATION_THRESHOLD};
pub use executor::{ControllerConfig, ConversationController};
pub use state::{
    Actor, ConfirmationPolicy, Continuation, ControllerState, Message, MessageContent,
    NextStep, PendingAction, PromptOrigin, QueuedPrompt, SessionOutcome, SessionStatus,
    SharedState, ToolData, ToolDirective, ToolResult, INTERNAL_PROMPT_PREFIX,
};
pub use transition::{PlanOutcome, Wake};
