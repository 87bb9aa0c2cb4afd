//! Property-based tests for the controller
//!
//! Arbitrary interleavings of signals, planner decisions and loop wakes are
//! applied to a `ControllerState`; the invariants below must hold after
//! every step. The session properties at the end drive a real
//! `ConversationController` over generated conversations.

use super::state::*;
use super::transition::*;
use super::{ControllerConfig, ConversationController};
use crate::error::CollaboratorError;
use crate::goals::GoalCatalog;
use crate::runtime::testing::{
    flight_args, wait_for, MockDispatcher, MockSummarizer, MockValidator,
};
use crate::runtime::{
    Collaborators, PlanningContext, ToolPlanner, ValidationInput, ValidationResult,
};
use async_trait::async_trait;
use proptest::prelude::*;
use serde_json::{json, Map};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Test Helpers
// ============================================================================

fn catalog() -> GoalCatalog {
    GoalCatalog::builtin()
}

fn flight_state() -> ControllerState {
    ControllerState::new(
        catalog()
            .lookup("goal_event_flight_invoice")
            .cloned()
            .unwrap(),
    )
}

#[derive(Debug, Clone)]
enum Op {
    Submit(String),
    Confirm,
    EndChat,
    /// Planner picks SearchFlights with complete args
    PlanComplete,
    /// Planner picks SearchFlights with args missing
    PlanIncomplete,
    PlanQuestion,
    PlanPickNewGoal,
    /// One loop iteration
    Step,
}

/// What the simulated loop observed
#[derive(Debug, Default)]
struct Trace {
    actions_created: usize,
    actions_executed: usize,
}

fn apply_op(
    state: &mut ControllerState,
    trace: &mut Trace,
    policy: ConfirmationPolicy,
    op: Op,
) {
    let catalog = catalog();
    match op {
        Op::Submit(text) => {
            state.submit_prompt(QueuedPrompt::user(text));
        }
        Op::Confirm => {
            state.confirm();
        }
        Op::EndChat => {
            state.end_chat();
        }
        Op::PlanComplete => {
            if let Ok(PlanOutcome::AwaitingConfirmation { .. } | PlanOutcome::AutoConfirmed { .. }) =
                apply_plan(
                    state,
                    &catalog,
                    policy,
                    ToolData::confirm("SearchFlights", flight_args(), ""),
                )
            {
                trace.actions_created += 1;
            }
        }
        Op::PlanIncomplete => {
            let args: Map<_, _> = json!({"origin": "SFO"}).as_object().cloned().unwrap();
            let _ = apply_plan(
                state,
                &catalog,
                policy,
                ToolData::confirm("SearchFlights", args, ""),
            );
        }
        Op::PlanQuestion => {
            let _ = apply_plan(state, &catalog, policy, ToolData::new("question", "?"));
        }
        Op::PlanPickNewGoal => {
            let _ = apply_plan(state, &catalog, policy, ToolData::new("pick-new-goal", ""));
        }
        Op::Step => match next_wake(state) {
            Some(Wake::ExecutePending(action)) => {
                trace.actions_executed += 1;
                record_confirmation(state, &action);
                apply_tool_result(
                    state,
                    &catalog,
                    ToolResult::success(action.tool, json!({"ok": true})),
                );
            }
            Some(Wake::ProcessPrompt(_) | Wake::EndChat) | None => {}
        },
    }
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => "[a-z ]{1,12}".prop_map(Op::Submit),
        2 => Just(Op::Confirm),
        1 => Just(Op::EndChat),
        2 => Just(Op::PlanComplete),
        1 => Just(Op::PlanIncomplete),
        1 => Just(Op::PlanQuestion),
        1 => Just(Op::PlanPickNewGoal),
        4 => Just(Op::Step),
    ]
}

fn arb_policy() -> impl Strategy<Value = ConfirmationPolicy> {
    prop_oneof![
        Just(ConfirmationPolicy::Manual),
        Just(ConfirmationPolicy::Auto)
    ]
}

fn arb_queue() -> impl Strategy<Value = Vec<QueuedPrompt>> {
    prop::collection::vec(
        ("[a-z ]{1,12}", any::<bool>()).prop_map(|(text, internal)| {
            if internal {
                QueuedPrompt::internal(text)
            } else {
                QueuedPrompt::user(text)
            }
        }),
        0..10,
    )
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    // A confirmed action runs at most once, and a grant never outlives its action
    #[test]
    fn prop_each_action_executes_at_most_once(
        policy in arb_policy(),
        ops in prop::collection::vec(arb_op(), 1..60)
    ) {
        let mut state = flight_state();
        let mut trace = Trace::default();
        for op in ops {
            apply_op(&mut state, &mut trace, policy, op);
            prop_assert!(trace.actions_executed <= trace.actions_created);
            prop_assert!(!state.confirmation_granted || state.pending_action.is_some());
            prop_assert!(catalog().lookup(&state.goal.id).is_some());
        }
    }

    // Confirm with nothing pending never produces an execution
    #[test]
    fn prop_confirm_without_pending_is_inert(
        confirms in 1usize..10,
        prompts in prop::collection::vec("[a-z]{1,8}", 0..5)
    ) {
        let mut state = flight_state();
        for p in &prompts {
            state.submit_prompt(QueuedPrompt::user(p.clone()));
        }
        for _ in 0..confirms {
            prop_assert!(!state.confirm());
        }
        while let Some(wake) = next_wake(&mut state) {
            prop_assert!(!matches!(wake, Wake::ExecutePending(_)));
        }
    }

    // Once the chat ends, every wake is EndChat and nothing new is queued
    #[test]
    fn prop_end_chat_wins_every_wake(
        policy in arb_policy(),
        before in prop::collection::vec(arb_op(), 0..30),
        after in prop::collection::vec(arb_op(), 0..30)
    ) {
        let mut state = flight_state();
        let mut trace = Trace::default();
        for op in before {
            apply_op(&mut state, &mut trace, policy, op);
        }
        state.end_chat();
        let queued = state.queue.len();

        for op in after {
            let is_plan = matches!(
                op,
                Op::PlanComplete | Op::PlanIncomplete | Op::PlanQuestion | Op::PlanPickNewGoal
            );
            if is_plan {
                // The loop never plans after the chat ends
                continue;
            }
            apply_op(&mut state, &mut trace, policy, op);
            prop_assert!(state.queue.len() <= queued);
            prop_assert_eq!(next_wake(&mut state), Some(Wake::EndChat));
        }
    }

    // The queue crosses a continuation boundary in order, without loss or
    // duplication, and keeps its tags
    #[test]
    fn prop_continuation_preserves_queue(queue in arb_queue()) {
        let mut state = flight_state();
        state.queue = queue.clone().into();

        let payload = state.to_continuation(Some("summary".to_string()));
        let json = serde_json::to_string(&payload).unwrap();
        let restored: Continuation = serde_json::from_str(&json).unwrap();
        let mut fresh = ControllerState::from_continuation(state.goal.clone(), restored);

        let mut drained = Vec::new();
        while let Some(Wake::ProcessPrompt(p)) = next_wake(&mut fresh) {
            drained.push(p);
        }
        prop_assert_eq!(drained, queue);
        prop_assert_eq!(fresh.history.len(), 1);
    }
}

// ============================================================================
// Session Properties
// ============================================================================

/// How the planner answers one user turn
#[derive(Debug, Clone, Copy)]
enum Turn {
    /// Plain question back to the user
    Ask,
    /// SearchFlights with arguments missing, then a question on the follow-up
    Partial,
    /// SearchFlights with complete arguments, run by auto-confirmation
    Run,
    /// Rejected by the validator
    OffTopic,
}

impl Turn {
    fn prompt(self, index: usize) -> String {
        let label = match self {
            Self::Ask => "ask",
            Self::Partial => "partial",
            Self::Run => "run",
            Self::OffTopic => "offtopic",
        };
        format!("{label} {index}")
    }

    fn planner_calls(self) -> usize {
        match self {
            Self::Ask => 1,
            Self::Partial | Self::Run => 2,
            Self::OffTopic => 0,
        }
    }
}

/// Decides from the prompt text alone, so the answers do not depend on
/// the order the loop interleaves follow-ups with queued user prompts
#[derive(Default)]
struct ScriptedPlanner {
    calls: AtomicUsize,
}

#[async_trait]
impl ToolPlanner for ScriptedPlanner {
    async fn plan(&self, context: &PlanningContext) -> Result<ToolData, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let decision = if context.prompt.starts_with("partial") {
            let partial = json!({"origin": "SFO"}).as_object().cloned().unwrap_or_default();
            ToolData::confirm("SearchFlights", partial, "Where to?")
        } else if context.prompt.starts_with("run") {
            ToolData::confirm("SearchFlights", flight_args(), "Searching flights")
        } else {
            ToolData::new("question", "Anything else?")
        };
        Ok(decision)
    }
}

struct SessionRun {
    settled: bool,
    submitted: Vec<String>,
    validated: Vec<ValidationInput>,
    history: Vec<Message>,
}

fn run_session(turns: &[Turn]) -> SessionRun {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();

    runtime.block_on(async {
        let catalog = Arc::new(catalog());
        let shared = Arc::new(SharedState::new("prop-session", flight_state()));
        let validator = Arc::new(MockValidator::new());
        let planner = Arc::new(ScriptedPlanner::default());
        let collaborators = Collaborators::new(
            validator.clone(),
            planner.clone(),
            MockDispatcher::new(),
            MockSummarizer::new(),
        );
        let config = ControllerConfig {
            policy: ConfirmationPolicy::Auto,
            ..ControllerConfig::default()
        };
        let task = tokio::spawn(
            ConversationController::new(shared.clone(), catalog, collaborators, config).run(),
        );

        let mut submitted = Vec::new();
        for (index, turn) in turns.iter().enumerate() {
            if matches!(turn, Turn::OffTopic) {
                validator.queue(ValidationResult::reject("That is not about travel."));
            } else {
                validator.queue(ValidationResult::accept());
            }
            let text = turn.prompt(index);
            shared.submit_prompt(&text);
            submitted.push(text);
        }

        let expected: usize = turns.iter().map(|t| t.planner_calls()).sum();
        let settled = wait_for(Duration::from_secs(5), || {
            planner.calls.load(Ordering::SeqCst) == expected && shared.queued_prompts().is_empty()
        })
        .await;

        shared.end_chat();
        let outcome = task.await.unwrap();
        let validated = validator.inputs.lock().unwrap().clone();
        SessionRun {
            settled,
            submitted,
            validated,
            history: outcome.history,
        }
    })
}

fn arb_turn() -> impl Strategy<Value = Turn> {
    prop_oneof![
        3 => Just(Turn::Ask),
        2 => Just(Turn::Partial),
        2 => Just(Turn::Run),
        1 => Just(Turn::OffTopic),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    // Only user prompts are validated, each exactly once and in submission
    // order; synthesized follow-ups go straight to the planner
    #[test]
    fn prop_session_validates_only_user_prompts(
        turns in prop::collection::vec(arb_turn(), 1..12)
    ) {
        let run = run_session(&turns);
        prop_assert!(run.settled);
        prop_assert!(run
            .validated
            .iter()
            .all(|input| !input.prompt.starts_with(INTERNAL_PROMPT_PREFIX)));
        let validated: Vec<&str> = run.validated.iter().map(|i| i.prompt.as_str()).collect();
        let submitted: Vec<&str> = run.submitted.iter().map(String::as_str).collect();
        prop_assert_eq!(validated, submitted);
    }

    // User messages appear in history in submission order, rejected ones
    // included, with nothing dropped or duplicated
    #[test]
    fn prop_session_history_keeps_submission_order(
        turns in prop::collection::vec(arb_turn(), 1..12)
    ) {
        let run = run_session(&turns);
        prop_assert!(run.settled);
        let users: Vec<&str> = run
            .history
            .iter()
            .filter(|m| m.actor == Actor::User)
            .filter_map(Message::text)
            .collect();
        let submitted: Vec<&str> = run.submitted.iter().map(String::as_str).collect();
        prop_assert_eq!(users, submitted);
    }
}
