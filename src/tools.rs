//! Reference tool implementations
//!
//! `ToolRegistry` is the production `ToolDispatcher`: it routes a confirmed
//! action to the tool with the matching name.

mod change_goal;
mod check_account;
mod list_agents;

pub use change_goal::ChangeGoalTool;
pub use check_account::{Account, CheckAccountValidTool};
pub use list_agents::ListAgentsTool;

use crate::controller::ToolResult;
use crate::error::CollaboratorError;
use crate::goals::{GoalCatalog, ToolSpec};
use crate::runtime::{RetryPolicy, ToolDispatcher};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;

/// A tool the planner can select
///
/// Expected business failures (account not found, unknown goal) are returned
/// as `ToolResult::error`. `Err` means the call itself failed and may be
/// retried.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;

    /// Schema advertised to the planner
    fn spec(&self) -> ToolSpec;

    async fn run(&self, args: &Map<String, Value>) -> Result<ToolResult, CollaboratorError>;

    /// Override the caller's default retry policy for this tool
    fn retry_policy(&self) -> Option<RetryPolicy> {
        None
    }
}

/// Collection of tools, dispatched by name
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The reference tools, wired to `catalog`
    pub fn standard(catalog: Arc<GoalCatalog>, fin_error_rate: f64) -> Self {
        Self::new()
            .with_tool(ListAgentsTool::new(catalog.clone()))
            .with_tool(ChangeGoalTool::new(catalog))
            .with_tool(CheckAccountValidTool::new(fin_error_rate))
    }

    #[must_use]
    pub fn with_tool(mut self, tool: impl Tool + 'static) -> Self {
        self.tools.push(Arc::new(tool));
        self
    }

    fn find(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name)
    }

    pub fn specs(&self) -> Vec<ToolSpec> {
        self.tools.iter().map(|t| t.spec()).collect()
    }
}

#[async_trait]
impl ToolDispatcher for ToolRegistry {
    async fn dispatch(
        &self,
        tool: &str,
        args: &Map<String, Value>,
    ) -> Result<ToolResult, CollaboratorError> {
        let Some(handler) = self.find(tool) else {
            return Err(CollaboratorError::rejected(format!("Unknown tool: {tool}")));
        };
        tracing::debug!(tool, "Dispatching tool");
        handler.run(args).await
    }

    fn retry_policy(&self, tool: &str) -> Option<RetryPolicy> {
        self.find(tool).and_then(|t| t.retry_policy())
    }
}
