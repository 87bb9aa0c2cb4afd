//! Configuration read from environment variables

use crate::controller::{ConfirmationPolicy, ControllerConfig, DEFAULT_CONTINUATION_THRESHOLD};
use crate::goals::{CatalogError, GoalCatalog, GOAL_SELECTION_ID};
use crate::runtime::RetryPolicy;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

/// Agent configuration
#[derive(Debug, Clone, PartialEq)]
pub struct AgentConfig {
    pub policy: ConfirmationPolicy,
    pub max_turns_before_continue: usize,
    pub initial_goal: String,
    pub goals_path: Option<PathBuf>,
    pub retry: RetryPolicy,
    pub fin_error_rate: f64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            policy: ConfirmationPolicy::Manual,
            max_turns_before_continue: DEFAULT_CONTINUATION_THRESHOLD,
            initial_goal: GOAL_SELECTION_ID.to_string(),
            goals_path: None,
            retry: RetryPolicy::default(),
            fin_error_rate: 0.3,
        }
    }
}

impl AgentConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from any variable source; unset variables keep their defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let policy = match lookup("SHOW_CONFIRM") {
            Some(v) => parse_policy(&v)?,
            None => defaults.policy,
        };

        let max_turns_before_continue =
            parse_var(&lookup, "MAX_TURNS_BEFORE_CONTINUE")?.unwrap_or(defaults.max_turns_before_continue);
        if max_turns_before_continue == 0 {
            return Err(ConfigError::Invalid {
                var: "MAX_TURNS_BEFORE_CONTINUE",
                value: "0".to_string(),
            });
        }

        let retry = RetryPolicy {
            interval: parse_secs(&lookup, "COLLABORATOR_RETRY_INTERVAL_SECS")?
                .unwrap_or(defaults.retry.interval),
            attempt_timeout: parse_secs(&lookup, "COLLABORATOR_ATTEMPT_TIMEOUT_SECS")?
                .unwrap_or(defaults.retry.attempt_timeout),
            deadline: parse_secs(&lookup, "COLLABORATOR_DEADLINE_SECS")?
                .unwrap_or(defaults.retry.deadline),
        };

        let fin_error_rate: f64 =
            parse_var(&lookup, "FIN_ERROR_RATE")?.unwrap_or(defaults.fin_error_rate);
        if !(0.0..=1.0).contains(&fin_error_rate) {
            return Err(ConfigError::Invalid {
                var: "FIN_ERROR_RATE",
                value: fin_error_rate.to_string(),
            });
        }

        Ok(Self {
            policy,
            max_turns_before_continue,
            initial_goal: lookup("AGENT_GOAL")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.initial_goal),
            goals_path: lookup("AGENT_GOALS_PATH")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
            retry,
            fin_error_rate,
        })
    }

    pub fn controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            policy: self.policy,
            continuation_threshold: self.max_turns_before_continue,
            retry: self.retry,
        }
    }

    /// The configured goal catalog: the JSON file if one is set, otherwise
    /// the built-in goals
    pub fn load_catalog(&self) -> Result<GoalCatalog, CatalogError> {
        match &self.goals_path {
            Some(path) => GoalCatalog::from_json_file(path),
            None => Ok(GoalCatalog::builtin()),
        }
    }
}

/// `SHOW_CONFIRM=False` turns confirmation off
fn parse_policy(value: &str) -> Result<ConfirmationPolicy, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(ConfirmationPolicy::Manual),
        "false" | "0" | "no" => Ok(ConfirmationPolicy::Auto),
        _ => Err(ConfigError::Invalid {
            var: "SHOW_CONFIRM",
            value: value.to_string(),
        }),
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<T>, ConfigError> {
    lookup(var)
        .map(|value| {
            value.trim().parse().map_err(|_| ConfigError::Invalid {
                var,
                value: value.clone(),
            })
        })
        .transpose()
}

fn parse_secs(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<Duration>, ConfigError> {
    Ok(parse_var::<u64>(lookup, var)?.map(Duration::from_secs))
}
