//! Goal catalog
//!
//! A goal bundles an ordered tool sequence with the framing text the planner
//! uses. The catalog is immutable once built and is shared read-only between
//! sessions.

pub mod builtin;

pub use builtin::builtin_goals;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

/// Id of the goal that lets the user pick which agent to talk to
pub const GOAL_SELECTION_ID: &str = "goal_choose_agent_type";

/// One argument a tool expects
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgumentSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub arg_type: String,
    pub description: String,
}

impl ArgumentSpec {
    pub fn new(
        name: impl Into<String>,
        arg_type: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            arg_type: arg_type.into(),
            description: description.into(),
        }
    }
}

/// Schema-described operation the planner may select
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub arguments: Vec<ArgumentSpec>,
}

impl ToolSpec {
    /// Names of declared arguments that are absent, null, or blank in `args`
    pub fn missing_args(&self, args: &Map<String, Value>) -> Vec<String> {
        self.arguments
            .iter()
            .filter(|spec| match args.get(&spec.name) {
                None | Some(Value::Null) => true,
                Some(Value::String(s)) => s.trim().is_empty(),
                Some(_) => false,
            })
            .map(|spec| spec.name.clone())
            .collect()
    }
}

/// Named task template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goal {
    pub id: String,
    pub category_tag: String,
    pub agent_name: String,
    pub agent_friendly_description: String,
    pub tools: Vec<ToolSpec>,
    pub description: String,
    #[serde(default)]
    pub starter_prompt: String,
    #[serde(default)]
    pub example_conversation_history: String,
}

impl Goal {
    pub fn tool(&self, name: &str) -> Option<&ToolSpec> {
        self.tools.iter().find(|t| t.name == name)
    }

    /// System goals (goal selection) are not offered as agents
    pub fn is_system(&self) -> bool {
        self.category_tag == "system"
    }
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read goal catalog: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse goal catalog: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("duplicate goal id: {0}")]
    DuplicateGoal(String),
    #[error("catalog has no goal-selection goal (goal_choose_agent_type)")]
    MissingSelectionGoal,
}

/// Read-only lookup of goal id -> goal
#[derive(Debug, Clone)]
pub struct GoalCatalog {
    goals: Vec<Goal>,
}

impl GoalCatalog {
    /// Build a catalog, rejecting duplicate ids and catalogs without the
    /// goal-selection goal
    pub fn new(goals: Vec<Goal>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::new();
        for goal in &goals {
            if !seen.insert(goal.id.as_str()) {
                return Err(CatalogError::DuplicateGoal(goal.id.clone()));
            }
        }
        if !seen.contains(GOAL_SELECTION_ID) {
            return Err(CatalogError::MissingSelectionGoal);
        }
        Ok(Self { goals })
    }

    /// The catalog shipped with the crate
    pub fn builtin() -> Self {
        Self {
            goals: builtin_goals(),
        }
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let raw = std::fs::read_to_string(path)?;
        let goals: Vec<Goal> = serde_json::from_str(&raw)?;
        Self::new(goals)
    }

    pub fn lookup(&self, id: &str) -> Option<&Goal> {
        self.goals.iter().find(|g| g.id == id)
    }

    pub fn list(&self) -> &[Goal] {
        &self.goals
    }

    /// The goal-selection goal; its presence is checked at construction
    pub fn selection_goal(&self) -> &Goal {
        self.lookup(GOAL_SELECTION_ID)
            .unwrap_or_else(|| unreachable!("catalog validated at construction"))
    }

    /// Find a tool spec, preferring the given goal's own tool list
    pub fn tool_spec(&self, goal: &Goal, name: &str) -> Option<ToolSpec> {
        goal.tool(name)
            .or_else(|| self.goals.iter().find_map(|g| g.tool(name)))
            .cloned()
    }

    /// Missing argument names for `tool`, or `None` when no goal declares it
    pub fn args_complete(
        &self,
        goal: &Goal,
        tool: &str,
        args: &Map<String, Value>,
    ) -> Option<Vec<String>> {
        self.tool_spec(goal, tool).map(|spec| spec.missing_args(args))
    }
}
