//! Conversation controller main loop

use super::continuation::{ContinuationManager, DEFAULT_CONTINUATION_THRESHOLD};
use super::state::{
    Actor, ConfirmationPolicy, PendingAction, QueuedPrompt, SessionOutcome, SessionStatus,
    SharedState,
};
use super::transition::{self, PlanOutcome, Wake};
use crate::error::ControllerError;
use crate::goals::GoalCatalog;
use crate::runtime::{retry, Collaborators, PlanningContext, RetryPolicy, ValidationInput};
use std::sync::Arc;

/// Knobs shared by every session a manager starts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerConfig {
    pub policy: ConfirmationPolicy,
    /// History length that triggers a continuation
    pub continuation_threshold: usize,
    /// Default policy for validator, planner, summarizer and dispatcher calls
    pub retry: RetryPolicy,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            policy: ConfirmationPolicy::Manual,
            continuation_threshold: DEFAULT_CONTINUATION_THRESHOLD,
            retry: RetryPolicy::default(),
        }
    }
}

/// How a prompt-processing iteration ended
enum Iteration {
    Continue,
    /// Arguments were missing; the follow-up is already queued and the
    /// continuation check waits for the next iteration
    AwaitingArgs,
    Finished(SessionStatus),
}

/// Drives one session: the only mutator of history, goal, tool data and the
/// pending action.
pub struct ConversationController {
    shared: Arc<SharedState>,
    catalog: Arc<GoalCatalog>,
    collaborators: Collaborators,
    config: ControllerConfig,
    continuation: ContinuationManager,
}

impl ConversationController {
    pub fn new(
        shared: Arc<SharedState>,
        catalog: Arc<GoalCatalog>,
        collaborators: Collaborators,
        config: ControllerConfig,
    ) -> Self {
        let continuation = ContinuationManager::new(
            config.continuation_threshold,
            collaborators.summarizer.clone(),
            config.retry,
        );
        Self {
            shared,
            catalog,
            collaborators,
            config,
            continuation,
        }
    }

    /// Run until the chat ends, the planner finishes, or a fatal error.
    /// The terminal status is also written into the shared state so queries
    /// observe it.
    pub async fn run(self) -> SessionOutcome {
        let session_id = self.shared.session_id().to_string();
        tracing::info!(
            session_id = %session_id,
            goal = %self.shared.goal().id,
            policy = ?self.config.policy,
            "Starting conversation controller"
        );

        let result = self.run_loop().await;

        let mut state = self.shared.lock();
        match result {
            Ok(status) => state.status = status,
            Err(e) => {
                tracing::error!(session_id = %session_id, error = %e, "Session failed");
                state.status = SessionStatus::Failed;
                state.error = Some(e.to_string());
            }
        }
        let outcome = state.outcome();
        drop(state);

        tracing::info!(
            session_id = %session_id,
            status = ?outcome.status,
            messages = outcome.history.len(),
            "Conversation controller stopped"
        );
        outcome
    }

    async fn run_loop(&self) -> Result<SessionStatus, ControllerError> {
        loop {
            let wake = transition::next_wake(&mut self.shared.lock());
            let Some(wake) = wake else {
                self.shared.wait_for_signal().await;
                continue;
            };

            match wake {
                Wake::EndChat => {
                    self.close_chat().await;
                    return Ok(SessionStatus::Ended);
                }
                Wake::ExecutePending(action) => {
                    self.execute_action(action).await?;
                }
                Wake::ProcessPrompt(prompt) => match self.process_prompt(prompt).await? {
                    Iteration::Continue => {}
                    Iteration::AwaitingArgs => continue,
                    Iteration::Finished(status) => return Ok(status),
                },
            }

            self.continuation.check(&self.shared).await?;
        }
    }

    /// Best-effort capstone summary; the chat ends either way
    async fn close_chat(&self) {
        let session_id = self.shared.session_id();
        tracing::info!(session_id = %session_id, "Chat ended");

        let history = {
            let state = self.shared.lock();
            if state.history.len() <= 1 {
                return;
            }
            state.history.clone()
        };

        let summarizer = &self.collaborators.summarizer;
        match retry(&self.config.retry, "summarizer", || summarizer.summarize(&history)).await {
            Ok(summary) => {
                tracing::info!(session_id = %session_id, summary = %summary, "Conversation summary");
                self.shared.lock().summary = Some(summary);
            }
            Err(failure) => {
                tracing::warn!(
                    session_id = %session_id,
                    error = %failure.last,
                    "Could not summarize ended chat"
                );
            }
        }
    }

    async fn execute_action(&self, action: PendingAction) -> Result<(), ControllerError> {
        let session_id = self.shared.session_id();
        transition::record_confirmation(&mut self.shared.lock(), &action);
        tracing::info!(session_id = %session_id, tool = %action.tool, "Executing confirmed tool");

        let dispatcher = &self.collaborators.dispatcher;
        let policy = dispatcher
            .retry_policy(&action.tool)
            .unwrap_or(self.config.retry);
        let result = retry(&policy, "dispatcher", || {
            dispatcher.dispatch(&action.tool, &action.args)
        })
        .await
        .map_err(|failure| failure.into_controller_error("dispatcher"))?;

        if let Some(error) = &result.error {
            tracing::warn!(session_id = %session_id, tool = %action.tool, error = %error, "Tool reported failure");
        }

        transition::apply_tool_result(&mut self.shared.lock(), &self.catalog, result);
        Ok(())
    }

    async fn process_prompt(&self, prompt: QueuedPrompt) -> Result<Iteration, ControllerError> {
        let session_id = self.shared.session_id();
        tracing::debug!(session_id = %session_id, internal = prompt.is_internal(), "Processing prompt");

        if !prompt.is_internal() {
            let input = {
                let mut state = self.shared.lock();
                state.add_message(Actor::User, prompt.text.as_str());
                ValidationInput {
                    prompt: prompt.text.clone(),
                    history: state.history.clone(),
                    goal: state.goal.clone(),
                }
            };

            let validator = &self.collaborators.validator;
            let validation = retry(&self.config.retry, "validator", || validator.validate(&input))
                .await
                .map_err(|failure| failure.into_controller_error("validator"))?;

            if !validation.ok {
                tracing::info!(session_id = %session_id, reason = %validation.reason, "Prompt failed validation");
                self.shared
                    .lock()
                    .add_message(Actor::Agent, validation.reason.as_str());
                return Ok(Iteration::Continue);
            }
        }

        let context = {
            let state = self.shared.lock();
            PlanningContext {
                prompt: prompt.text,
                goal: state.goal.clone(),
                history: state.history.clone(),
                prior_tool_data: state.tool_data.clone(),
            }
        };

        let planner = &self.collaborators.planner;
        let plan = retry(&self.config.retry, "planner", || planner.plan(&context))
            .await
            .map_err(|failure| failure.into_controller_error("planner"))?;

        let outcome = transition::apply_plan(
            &mut self.shared.lock(),
            &self.catalog,
            self.config.policy,
            plan,
        )?;

        match &outcome {
            PlanOutcome::Replied => {}
            PlanOutcome::AwaitingConfirmation { tool } => {
                tracing::info!(session_id = %session_id, tool = %tool, "Waiting for user confirm signal");
            }
            PlanOutcome::AutoConfirmed { tool } => {
                tracing::info!(session_id = %session_id, tool = %tool, "Tool auto-confirmed");
            }
            PlanOutcome::MissingArgs { tool, missing } => {
                tracing::info!(session_id = %session_id, tool = %tool, missing = ?missing, "Tool arguments incomplete");
                return Ok(Iteration::AwaitingArgs);
            }
            PlanOutcome::GoalReset => {
                tracing::info!(session_id = %session_id, "Goal reset to goal selection");
            }
            PlanOutcome::Done => {
                tracing::info!(session_id = %session_id, "Planner declared conversation done");
                return Ok(Iteration::Finished(SessionStatus::Completed));
            }
        }
        Ok(Iteration::Continue)
    }
}
