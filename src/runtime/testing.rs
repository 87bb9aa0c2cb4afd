//! Mock collaborators for testing
//!
//! These mocks let the controller run end-to-end without real backends.

use super::traits::*;
use crate::controller::{Message, ToolData, ToolResult};
use crate::error::CollaboratorError;
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::Notify;

// ============================================================================
// Mock Validator
// ============================================================================

/// Returns queued results, accepting everything once the queue is empty
#[derive(Default)]
pub struct MockValidator {
    results: Mutex<VecDeque<Result<ValidationResult, CollaboratorError>>>,
    /// Record of every validated prompt
    pub inputs: Mutex<Vec<ValidationInput>>,
}

impl MockValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue(&self, result: ValidationResult) {
        self.results.lock().unwrap().push_back(Ok(result));
    }

    pub fn queue_error(&self, error: CollaboratorError) {
        self.results.lock().unwrap().push_back(Err(error));
    }

    pub fn call_count(&self) -> usize {
        self.inputs.lock().unwrap().len()
    }
}

#[async_trait]
impl PromptValidator for MockValidator {
    async fn validate(
        &self,
        input: &ValidationInput,
    ) -> Result<ValidationResult, CollaboratorError> {
        self.inputs.lock().unwrap().push(input.clone());
        self.results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(ValidationResult::accept()))
    }
}

// ============================================================================
// Mock Planner
// ============================================================================

/// Returns queued decisions in order
#[derive(Default)]
pub struct MockPlanner {
    responses: Mutex<VecDeque<Result<ToolData, CollaboratorError>>>,
    always_fail: Mutex<Option<CollaboratorError>>,
    /// Record of every planning context
    pub requests: Mutex<Vec<PlanningContext>>,
}

impl MockPlanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue(&self, decision: ToolData) {
        self.responses.lock().unwrap().push_back(Ok(decision));
    }

    pub fn queue_error(&self, error: CollaboratorError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    /// Fail every call with `error`, ignoring the queue
    pub fn fail_always(&self, error: CollaboratorError) {
        *self.always_fail.lock().unwrap() = Some(error);
    }

    pub fn contexts(&self) -> Vec<PlanningContext> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ToolPlanner for MockPlanner {
    async fn plan(&self, context: &PlanningContext) -> Result<ToolData, CollaboratorError> {
        self.requests.lock().unwrap().push(context.clone());
        if let Some(error) = self.always_fail.lock().unwrap().clone() {
            return Err(error);
        }
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(CollaboratorError::rejected("No mock decision queued")))
    }
}

// ============================================================================
// Gated Planner (for signal ordering tests)
// ============================================================================

/// Planner that blocks inside `plan` until the test releases it
#[derive(Default)]
pub struct GatedPlanner {
    called: Notify,
    gate: Notify,
    responses: Mutex<VecDeque<ToolData>>,
    calls: AtomicUsize,
}

impl GatedPlanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves once a `plan` call is in flight
    pub async fn wait_until_called(&self) {
        self.called.notified().await;
    }

    /// Let one blocked call return `decision`
    pub fn release(&self, decision: ToolData) {
        self.responses.lock().unwrap().push_back(decision);
        self.gate.notify_one();
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ToolPlanner for GatedPlanner {
    async fn plan(&self, _context: &PlanningContext) -> Result<ToolData, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.called.notify_one();
        self.gate.notified().await;
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| CollaboratorError::rejected("Gate released without a decision"))
    }
}

// ============================================================================
// Mock Dispatcher
// ============================================================================

/// Returns queued results, or a generic success once the queue is empty
#[derive(Default)]
pub struct MockDispatcher {
    results: Mutex<VecDeque<Result<ToolResult, CollaboratorError>>>,
    /// Record of tool executions
    pub executions: Mutex<Vec<(String, Map<String, Value>)>>,
}

impl MockDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_result(&self, result: ToolResult) {
        self.results.lock().unwrap().push_back(Ok(result));
    }

    pub fn queue_error(&self, error: CollaboratorError) {
        self.results.lock().unwrap().push_back(Err(error));
    }

    pub fn calls(&self) -> Vec<(String, Map<String, Value>)> {
        self.executions.lock().unwrap().clone()
    }
}

#[async_trait]
impl ToolDispatcher for MockDispatcher {
    async fn dispatch(
        &self,
        tool: &str,
        args: &Map<String, Value>,
    ) -> Result<ToolResult, CollaboratorError> {
        self.executions
            .lock()
            .unwrap()
            .push((tool.to_string(), args.clone()));
        self.results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(ToolResult::success(tool, json!({"status": "ok"}))))
    }
}

// ============================================================================
// Mock Summarizer
// ============================================================================

#[derive(Default)]
pub struct MockSummarizer {
    summaries: Mutex<VecDeque<Result<String, CollaboratorError>>>,
    calls: AtomicUsize,
}

impl MockSummarizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_summary(&self, summary: impl Into<String>) {
        self.summaries.lock().unwrap().push_back(Ok(summary.into()));
    }

    pub fn queue_error(&self, error: CollaboratorError) {
        self.summaries.lock().unwrap().push_back(Err(error));
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Summarizer for MockSummarizer {
    async fn summarize(&self, history: &[Message]) -> Result<String, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.summaries
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(format!("Summary of {} messages", history.len())))
    }
}

// ============================================================================
// Gated Summarizer (for continuation hand-off tests)
// ============================================================================

/// Summarizer that blocks until `open` is called; every later call answers
/// immediately
#[derive(Default)]
pub struct GatedSummarizer {
    called: Notify,
    gate: Notify,
    open: AtomicBool,
    calls: AtomicUsize,
}

impl GatedSummarizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves once a `summarize` call is blocked on the gate
    pub async fn wait_until_called(&self) {
        self.called.notified().await;
    }

    pub fn open(&self) {
        self.open.store(true, Ordering::SeqCst);
        self.gate.notify_one();
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Summarizer for GatedSummarizer {
    async fn summarize(&self, history: &[Message]) -> Result<String, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.open.load(Ordering::SeqCst) {
            self.called.notify_one();
            self.gate.notified().await;
        }
        Ok(format!("Summary of {} messages", history.len()))
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Complete arguments for `SearchFlights`
pub fn flight_args() -> Map<String, Value> {
    json!({
        "origin": "SFO",
        "destination": "SYD",
        "dateFrom": "2025-05-01",
        "dateTo": "2025-05-31",
    })
    .as_object()
    .cloned()
    .unwrap_or_default()
}

/// Poll `condition` until it holds or `timeout` elapses
pub async fn wait_for(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::goals::GoalCatalog;

    fn context() -> PlanningContext {
        PlanningContext {
            prompt: "hi".to_string(),
            goal: GoalCatalog::builtin().selection_goal().clone(),
            history: Vec::new(),
            prior_tool_data: None,
        }
    }

    #[tokio::test]
    async fn test_mock_planner_records_and_replays() {
        let planner = MockPlanner::new();
        planner.queue(ToolData::new("question", "Which agent?"));

        let first = planner.plan(&context()).await.unwrap();
        assert_eq!(first.response, "Which agent?");
        let err = planner.plan(&context()).await.unwrap_err();
        assert!(!err.is_retryable());
        assert_eq!(planner.contexts().len(), 2);
    }

    #[tokio::test]
    async fn test_gated_planner_blocks_until_released() {
        let planner = std::sync::Arc::new(GatedPlanner::new());
        let task = {
            let planner = planner.clone();
            tokio::spawn(async move { planner.plan(&context()).await })
        };
        planner.wait_until_called().await;
        assert!(!task.is_finished());

        planner.release(ToolData::new("done", "bye"));
        let decision = task.await.unwrap().unwrap();
        assert_eq!(decision.next.as_deref(), Some("done"));
    }
}
