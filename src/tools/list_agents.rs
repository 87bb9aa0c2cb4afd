//! ListAgents - lists the agent goals a user can switch to

use super::Tool;
use crate::controller::{ToolDirective, ToolResult};
use crate::error::CollaboratorError;
use crate::goals::{builtin, GoalCatalog, ToolSpec};
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::sync::Arc;

pub struct ListAgentsTool {
    catalog: Arc<GoalCatalog>,
}

impl ListAgentsTool {
    pub fn new(catalog: Arc<GoalCatalog>) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl Tool for ListAgentsTool {
    fn name(&self) -> &'static str {
        "ListAgents"
    }

    fn spec(&self) -> ToolSpec {
        builtin::list_agents_tool()
    }

    async fn run(&self, _args: &Map<String, Value>) -> Result<ToolResult, CollaboratorError> {
        let agents: Vec<Value> = self
            .catalog
            .list()
            .iter()
            .filter(|goal| !goal.is_system())
            .map(|goal| {
                json!({
                    "agent_name": goal.agent_name,
                    "goal_id": goal.id,
                    "agent_description": goal.agent_friendly_description,
                })
            })
            .collect();

        Ok(ToolResult::success(self.name(), json!({ "agents": agents }))
            .with_directive(ToolDirective::RelistAgents))
    }
}
