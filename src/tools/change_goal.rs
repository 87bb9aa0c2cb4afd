//! ChangeGoal - switches the session to the goal the user picked

use super::Tool;
use crate::controller::{ToolDirective, ToolResult};
use crate::error::CollaboratorError;
use crate::goals::{builtin, GoalCatalog, ToolSpec};
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::sync::Arc;

pub struct ChangeGoalTool {
    catalog: Arc<GoalCatalog>,
}

impl ChangeGoalTool {
    pub fn new(catalog: Arc<GoalCatalog>) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl Tool for ChangeGoalTool {
    fn name(&self) -> &'static str {
        "ChangeGoal"
    }

    fn spec(&self) -> ToolSpec {
        builtin::change_goal_tool()
    }

    async fn run(&self, args: &Map<String, Value>) -> Result<ToolResult, CollaboratorError> {
        let Some(goal_id) = args.get("goalID").and_then(Value::as_str) else {
            return Ok(ToolResult::error(self.name(), "goalID is required"));
        };

        if self.catalog.lookup(goal_id).is_none() {
            return Ok(ToolResult::error(
                self.name(),
                format!("Unknown goal id: {goal_id}"),
            ));
        }

        Ok(ToolResult::success(self.name(), json!({ "new_goal": goal_id }))
            .with_directive(ToolDirective::ChangeGoal {
                goal_id: goal_id.to_string(),
            }))
    }
}
