use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CogentError, Result};

/// Execution limits for a single run. Validated once at executor
/// construction; invalid combinations fail fast.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Bounds one interactive turn.
    #[serde(default = "default_chat_timeout")]
    pub chat_timeout_secs: u64,
    /// Bounds an entire task run.
    #[serde(default = "default_task_timeout")]
    pub task_timeout_secs: u64,
    /// Bounds one workflow step (one model or tool call).
    #[serde(default = "default_subtask_timeout")]
    pub subtask_timeout_secs: u64,
    /// Nominal ceiling on workflow steps.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    /// Multiplier on `max_iterations` before the hard abort. Overage
    /// inside the margin is a diagnostic, not a failure.
    #[serde(default = "default_safety_margin")]
    pub safety_margin: usize,
    /// Retry a failed tool call in the engine before surfacing it to
    /// the model.
    #[serde(default)]
    pub retry_on_failure: bool,
    #[serde(default = "default_max_retry_attempts")]
    pub max_retry_attempts: usize,
    /// Include traces in failure diagnostics.
    #[serde(default)]
    pub debug: bool,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            chat_timeout_secs: default_chat_timeout(),
            task_timeout_secs: default_task_timeout(),
            subtask_timeout_secs: default_subtask_timeout(),
            max_iterations: default_max_iterations(),
            safety_margin: default_safety_margin(),
            retry_on_failure: false,
            max_retry_attempts: default_max_retry_attempts(),
            debug: false,
        }
    }
}

fn default_chat_timeout() -> u64 {
    300
}

fn default_task_timeout() -> u64 {
    600
}

fn default_subtask_timeout() -> u64 {
    60
}

fn default_max_iterations() -> usize {
    50
}

fn default_safety_margin() -> usize {
    2
}

fn default_max_retry_attempts() -> usize {
    3
}

impl ExecutionConfig {
    pub fn validate(&self) -> Result<()> {
        if self.chat_timeout_secs == 0 {
            return Err(CogentError::Config("chat_timeout must be positive".into()));
        }
        if self.task_timeout_secs == 0 {
            return Err(CogentError::Config("task_timeout must be positive".into()));
        }
        if self.subtask_timeout_secs == 0 {
            return Err(CogentError::Config(
                "subtask_timeout must be positive".into(),
            ));
        }
        if self.subtask_timeout_secs > self.task_timeout_secs {
            return Err(CogentError::Config(format!(
                "subtask_timeout ({}s) exceeds task_timeout ({}s)",
                self.subtask_timeout_secs, self.task_timeout_secs
            )));
        }
        if self.max_iterations == 0 {
            return Err(CogentError::Config("max_iterations must be positive".into()));
        }
        if self.safety_margin == 0 {
            return Err(CogentError::Config("safety_margin must be at least 1".into()));
        }
        if self.retry_on_failure && self.max_retry_attempts == 0 {
            return Err(CogentError::Config(
                "max_retry_attempts must be positive when retry_on_failure is set".into(),
            ));
        }
        Ok(())
    }

    pub fn chat_timeout(&self) -> Duration {
        Duration::from_secs(self.chat_timeout_secs)
    }

    pub fn task_timeout(&self) -> Duration {
        Duration::from_secs(self.task_timeout_secs)
    }

    pub fn subtask_timeout(&self) -> Duration {
        Duration::from_secs(self.subtask_timeout_secs)
    }

    /// Iteration count at which the guard aborts.
    pub fn hard_iteration_limit(&self) -> usize {
        self.max_iterations.saturating_mul(self.safety_margin)
    }

    /// Load config from a TOML file, with env var expansion.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|_| CogentError::ConfigNotFound(path.display().to_string()))?;

        // Expand ${ENV_VAR} references
        let expanded = expand_env_vars(&content);

        let config: Self =
            toml::from_str(&expanded).map_err(|e| CogentError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

/// Expand `${ENV_VAR}` patterns in a string.
fn expand_env_vars(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '$' && chars.peek() == Some(&'{') {
            chars.next(); // consume '{'
            let mut var_name = String::new();
            for c in chars.by_ref() {
                if c == '}' {
                    break;
                }
                var_name.push(c);
            }
            match std::env::var(&var_name) {
                Ok(val) => result.push_str(&val),
                Err(_) => {
                    // Keep original if env var not set
                    result.push_str(&format!("${{{}}}", var_name));
                }
            }
        } else {
            result.push(c);
        }
    }
    result
}
