//! CheckAccountValid - looks up a customer account
//!
//! Fails at random with a configurable rate to simulate a flaky upstream;
//! those failures are retryable and go through the tool's own retry policy.

use super::Tool;
use crate::controller::ToolResult;
use crate::error::CollaboratorError;
use crate::goals::{builtin, ToolSpec};
use crate::runtime::RetryPolicy;
use async_trait::async_trait;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub name: String,
    pub email: String,
    pub account_id: String,
}

impl Account {
    fn new(name: &str, email: &str, account_id: &str) -> Self {
        Self {
            name: name.to_string(),
            email: email.to_string(),
            account_id: account_id.to_string(),
        }
    }
}

fn sample_accounts() -> Vec<Account> {
    vec![
        Account::new("Matt Murdock", "matt.murdock@nelsonmurdock.com", "11235"),
        Account::new("Foggy Nelson", "foggy.nelson@nelsonmurdock.com", "112358"),
        Account::new("Karen Page", "karen.page@nelsonmurdock.com", "11235813"),
    ]
}

pub struct CheckAccountValidTool {
    accounts: Vec<Account>,
    error_rate: f64,
    retry: RetryPolicy,
}

impl CheckAccountValidTool {
    /// `error_rate` is clamped to `0.0..=1.0`; NaN and infinities disable
    /// failure injection
    pub fn new(error_rate: f64) -> Self {
        let error_rate = if error_rate.is_finite() {
            error_rate.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            accounts: sample_accounts(),
            error_rate,
            retry: RetryPolicy::new(
                Duration::from_secs(1),
                Duration::from_secs(5),
                Duration::from_secs(30),
            ),
        }
    }

    #[must_use]
    pub fn with_accounts(mut self, accounts: Vec<Account>) -> Self {
        self.accounts = accounts;
        self
    }

    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

#[async_trait]
impl Tool for CheckAccountValidTool {
    fn name(&self) -> &'static str {
        "CheckAccountValid"
    }

    fn spec(&self) -> ToolSpec {
        builtin::check_account_valid_tool()
    }

    async fn run(&self, args: &Map<String, Value>) -> Result<ToolResult, CollaboratorError> {
        let email = args.get("email").and_then(Value::as_str);
        let account_id = args.get("account_id").and_then(Value::as_str);

        if rand::thread_rng().gen_bool(self.error_rate) {
            return Err(CollaboratorError::internal(format!(
                "FinAPI simulated failure checking account {}",
                account_id.unwrap_or("<none>")
            )));
        }

        let found = self.accounts.iter().any(|account| {
            email == Some(account.email.as_str()) || account_id == Some(account.account_id.as_str())
        });

        if found {
            Ok(ToolResult::success(
                self.name(),
                json!({ "status": "account valid" }),
            ))
        } else {
            Ok(ToolResult::error(
                self.name(),
                format!(
                    "Account not found with email address {} or account ID: {}",
                    email.unwrap_or(""),
                    account_id.unwrap_or("")
                ),
            ))
        }
    }

    fn retry_policy(&self) -> Option<RetryPolicy> {
        Some(self.retry)
    }
}
