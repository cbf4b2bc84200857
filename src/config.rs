use crate::error::CompileError;
use serde::{Deserialize, Serialize};
use std::env;

pub const DEFAULT_POLL_INTERVAL_SECONDS: u32 = 30;
pub const DEFAULT_MAX_POLL_ITERATIONS: u32 = 120;

/// Immutable deployment settings handed to the compiler, the sanitizer and the
/// deployer. Nothing below this struct reads process state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeploymentContext {
    /// Prepended to every workflow and function name.
    pub resource_prefix: String,
    pub region: String,
    pub account_id: String,
    /// Seconds a polling loop sleeps between two status checks.
    pub poll_interval_seconds: u32,
    /// Number of status checks after which a job is failed with `PollTimeoutError`.
    pub max_poll_iterations: u32,
    pub retry_interval_seconds: u32,
    pub retry_backoff_rate: f64,
    pub retry_max_delay_seconds: u32,
}

impl Default for DeploymentContext {
    fn default() -> Self {
        Self {
            resource_prefix: "mediaflow".to_string(),
            region: "us-east-1".to_string(),
            account_id: "000000000000".to_string(),
            poll_interval_seconds: DEFAULT_POLL_INTERVAL_SECONDS,
            max_poll_iterations: DEFAULT_MAX_POLL_ITERATIONS,
            retry_interval_seconds: 2,
            retry_backoff_rate: 2.0,
            retry_max_delay_seconds: 60,
        }
    }
}

impl DeploymentContext {
    /// Builds a context from `MEDIAFLOW_RESOURCE_PREFIX`, `AWS_REGION` and
    /// `AWS_ACCOUNT_ID`, keeping defaults for anything unset.
    pub fn from_env() -> Self {
        let mut ctx = Self::default();
        if let Ok(prefix) = env::var("MEDIAFLOW_RESOURCE_PREFIX") {
            ctx.resource_prefix = prefix;
        }
        if let Ok(region) = env::var("AWS_REGION") {
            ctx.region = region;
        }
        if let Ok(account) = env::var("AWS_ACCOUNT_ID") {
            ctx.account_id = account;
        }
        ctx
    }

    /// Loads a context from a JSON document. Missing keys fall back to defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn validate(&self) -> Result<(), CompileError> {
        if self.resource_prefix.trim().is_empty() {
            return Err(CompileError::InvalidSettings(
                "resourcePrefix must not be empty".to_string(),
            ));
        }
        if self.poll_interval_seconds == 0 {
            return Err(CompileError::InvalidSettings(
                "pollIntervalSeconds must be greater than zero".to_string(),
            ));
        }
        if self.max_poll_iterations == 0 {
            return Err(CompileError::InvalidSettings(
                "maxPollIterations must be greater than zero".to_string(),
            ));
        }
        if self.retry_backoff_rate < 1.0 {
            return Err(CompileError::InvalidSettings(format!(
                "retryBackoffRate must be at least 1.0, got {}",
                self.retry_backoff_rate
            )));
        }
        Ok(())
    }

    /// ARN of the function that backs an adapter's processing unit.
    pub fn function_arn(&self, function_name: &str) -> String {
        format!(
            "arn:aws:lambda:{}:{}:function:{}",
            self.region, self.account_id, function_name
        )
    }

    /// ARN under which the engine registers a workflow of the given name.
    pub fn workflow_arn(&self, workflow_name: &str) -> String {
        format!(
            "arn:aws:states:{}:{}:stateMachine:{}",
            self.region, self.account_id, workflow_name
        )
    }
}
