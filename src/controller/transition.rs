//! Pure decision logic for the controller loop
//!
//! Nothing in here performs I/O: the executor calls these functions while
//! holding the session lock, then talks to collaborators without it.

use super::state::{
    Actor, ConfirmationPolicy, ControllerState, NextStep, PendingAction, QueuedPrompt,
    ToolData, ToolDirective, ToolResult,
};
use crate::error::ControllerError;
use crate::goals::{GoalCatalog, GOAL_SELECTION_ID};
use serde_json::json;

/// What the loop should do after waking
#[derive(Debug, Clone, PartialEq)]
pub enum Wake {
    /// Chat was ended; beats everything else
    EndChat,
    /// A confirmed action, already removed from state
    ExecutePending(PendingAction),
    /// The head of the prompt queue, already popped
    ProcessPrompt(QueuedPrompt),
}

/// Evaluate the wake condition in fixed priority order.
///
/// Returns `None` when the loop should keep sleeping. Taking the pending
/// action clears the confirmation flag in the same step, so a confirmed
/// action can only be handed out once.
pub fn next_wake(state: &mut ControllerState) -> Option<Wake> {
    if state.chat_ended {
        return Some(Wake::EndChat);
    }

    if state.confirmation_granted {
        state.confirmation_granted = false;
        if let Some(action) = state.pending_action.take() {
            return Some(Wake::ExecutePending(action));
        }
    }

    state.queue.pop_front().map(Wake::ProcessPrompt)
}

/// How a planner decision was applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanOutcome {
    /// Agent replied to the user; wait for the next prompt
    Replied,
    /// Pending action created; waiting for `confirm()`
    AwaitingConfirmation { tool: String },
    /// Pending action created and confirmed by policy
    AutoConfirmed { tool: String },
    /// Arguments incomplete; a follow-up prompt was queued instead
    MissingArgs { tool: String, missing: Vec<String> },
    /// Goal reset to goal selection
    GoalReset,
    /// Conversation complete
    Done,
}

/// A planner response that passed the contract checks
enum Decision {
    Reply,
    Select { tool: String, missing: Vec<String> },
    PickNewGoal,
    Done,
}

fn validate_plan(
    state: &ControllerState,
    catalog: &GoalCatalog,
    plan: &ToolData,
) -> Result<Decision, ControllerError> {
    let raw_next = plan.next.as_deref().ok_or(ControllerError::MissingField {
        field: "next",
        context: "planner response".to_string(),
    })?;
    let next = NextStep::parse(raw_next)
        .ok_or_else(|| ControllerError::UnrecognizedNextStep(raw_next.to_string()))?;

    Ok(match next {
        NextStep::Question => Decision::Reply,
        NextStep::Confirm => {
            let tool = plan.tool.clone().ok_or(ControllerError::MissingField {
                field: "tool",
                context: "planner chose confirm".to_string(),
            })?;
            let missing = catalog
                .args_complete(&state.goal, &tool, &plan.args)
                .ok_or_else(|| ControllerError::UnknownTool(tool.clone()))?;
            Decision::Select { tool, missing }
        }
        NextStep::PickNewGoal => Decision::PickNewGoal,
        NextStep::Done => Decision::Done,
    })
}

/// Apply a planner response to session state.
///
/// Contract violations are returned before anything is touched. A valid
/// response becomes the latest tool data and is appended to history as an
/// agent message, unless the selected tool is missing arguments: then only
/// the follow-up prompt is queued, so history never offers a confirm that
/// has no pending action behind it.
pub fn apply_plan(
    state: &mut ControllerState,
    catalog: &GoalCatalog,
    policy: ConfirmationPolicy,
    plan: ToolData,
) -> Result<PlanOutcome, ControllerError> {
    let decision = validate_plan(state, catalog, &plan)?;
    state.tool_data = Some(plan.clone());

    let outcome = match decision {
        Decision::Reply => PlanOutcome::Replied,
        Decision::Select { tool, missing } if !missing.is_empty() => {
            state.queue.push_back(missing_args_prompt(&tool, &missing));
            return Ok(PlanOutcome::MissingArgs { tool, missing });
        }
        Decision::Select { tool, .. } => {
            state.pending_action = Some(PendingAction {
                tool: tool.clone(),
                args: plan.args.clone(),
                decision: plan.clone(),
            });
            match policy {
                ConfirmationPolicy::Manual => {
                    state.confirmation_granted = false;
                    PlanOutcome::AwaitingConfirmation { tool }
                }
                ConfirmationPolicy::Auto => {
                    state.confirmation_granted = true;
                    PlanOutcome::AutoConfirmed { tool }
                }
            }
        }
        Decision::PickNewGoal => {
            switch_goal(state, catalog, GOAL_SELECTION_ID);
            PlanOutcome::GoalReset
        }
        Decision::Done => PlanOutcome::Done,
    };

    state.add_message(Actor::Agent, plan.to_value());
    Ok(outcome)
}

/// Record a confirmed action in history before it runs
pub fn record_confirmation(state: &mut ControllerState, action: &PendingAction) {
    state.add_message(Actor::ToolConfirmation, action.confirmation_record());
}

/// Record a tool result and act on its directive.
///
/// Only the result just produced is inspected; older results never switch
/// the goal. A follow-up prompt is queued so the planner decides the next
/// step.
pub fn apply_tool_result(state: &mut ControllerState, catalog: &GoalCatalog, result: ToolResult) {
    state.add_message(Actor::ToolResult, result.to_value());
    state.queue.push_back(tool_followup_prompt(&result));
    state.tool_results.push(result);

    let directive = state
        .latest_tool_result()
        .map(|r| r.directive.clone())
        .unwrap_or_default();

    match directive {
        ToolDirective::ChangeGoal { goal_id } => {
            switch_goal(state, catalog, &goal_id);
        }
        ToolDirective::RelistAgents if state.goal.id != GOAL_SELECTION_ID => {
            switch_goal(state, catalog, GOAL_SELECTION_ID);
        }
        ToolDirective::RelistAgents | ToolDirective::None => {}
    }
}

/// Switch to a catalog goal. Unknown ids leave the goal unchanged.
pub fn switch_goal(state: &mut ControllerState, catalog: &GoalCatalog, goal_id: &str) -> bool {
    match catalog.lookup(goal_id) {
        Some(goal) => {
            tracing::info!(from = %state.goal.id, to = %goal_id, "Changed goal");
            state.set_goal(goal.clone());
            true
        }
        None => {
            tracing::warn!(goal = %goal_id, "Ignoring switch to unknown goal");
            false
        }
    }
}

fn missing_args_prompt(tool: &str, missing: &[String]) -> QueuedPrompt {
    QueuedPrompt::internal(format!(
        "Missing arguments for tool {tool}: {}. Ask the user for exactly these values \
         before proposing {tool} again.",
        missing.join(", ")
    ))
}

fn tool_followup_prompt(result: &ToolResult) -> QueuedPrompt {
    let body = match &result.error {
        Some(error) => format!(
            "The '{}' tool failed with error: {error}. Explain the problem to the user and \
             decide how to proceed.",
            result.tool
        ),
        None => format!(
            "The '{}' tool completed successfully with {}. INSTRUCTIONS: Parse this tool \
             result as plain text, and use the system prompt containing the list of tools \
             in sequence and the conversation history (and previous tool_results) to figure \
             out next steps, if any.",
            result.tool,
            json!(result.payload)
        ),
    };
    QueuedPrompt::internal(body)
}
