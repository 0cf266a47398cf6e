use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which deadline expired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeoutScope {
    /// One interactive turn overran `chat_timeout`.
    Chat,
    /// A single workflow step overran `subtask_timeout`.
    Step,
    /// The whole run overran `task_timeout`.
    Task,
}

impl std::fmt::Display for TimeoutScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Chat => write!(f, "chat"),
            Self::Step => write!(f, "step"),
            Self::Task => write!(f, "task"),
        }
    }
}

/// Which OS signal requested shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShutdownSignal {
    Interrupt,
    Terminate,
}

impl std::fmt::Display for ShutdownSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Interrupt => write!(f, "interrupt"),
            Self::Terminate => write!(f, "terminate"),
        }
    }
}

#[derive(Debug, Error)]
pub enum CogentError {
    // LLM collaborator errors
    #[error("LLM provider request failed: {0}")]
    Provider(String),

    // Tool collaborator errors
    #[error("Tool execution failed: {tool}: {message}")]
    Tool { tool: String, message: String },

    // Deadline errors
    #[error("{scope} deadline exceeded after {elapsed_ms}ms (limit {limit_ms}ms)")]
    TimedOut {
        scope: TimeoutScope,
        elapsed_ms: u64,
        limit_ms: u64,
    },

    // Limit errors
    #[error("Exceeded maximum iterations: {completed} completed (hard limit {hard_limit})")]
    MaxIterationsExceeded { completed: usize, hard_limit: usize },

    // Cooperative cancellation — expected, user-initiated
    #[error("Interrupted by {signal} signal after {iterations_completed} iterations")]
    Interrupted {
        signal: ShutdownSignal,
        iterations_completed: usize,
    },

    // Config errors
    #[error("Config error: {0}")]
    Config(String),

    #[error("Config file not found: {0}")]
    ConfigNotFound(String),

    // Catch-all: nothing escapes the executor unclassified
    #[error("Unexpected error: {error_type}: {message}")]
    Unexpected {
        error_type: String,
        message: String,
        trace: Option<String>,
    },

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CogentError>;

/// Closed failure taxonomy tag. Decided once per run by the classifier;
/// presentation layers switch on this, never on message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    #[serde(rename = "ProviderError")]
    Provider,
    #[serde(rename = "ToolError")]
    Tool,
    TimedOut,
    MaxIterationsExceeded,
    InterruptedByShutdown,
    #[serde(rename = "ConfigurationError")]
    Configuration,
    Unexpected,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Provider => "ProviderError",
            Self::Tool => "ToolError",
            Self::TimedOut => "TimedOut",
            Self::MaxIterationsExceeded => "MaxIterationsExceeded",
            Self::InterruptedByShutdown => "InterruptedByShutdown",
            Self::Configuration => "ConfigurationError",
            Self::Unexpected => "Unexpected",
        };
        write!(f, "{s}")
    }
}

impl CogentError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Provider(_) => ErrorKind::Provider,
            Self::Tool { .. } => ErrorKind::Tool,
            Self::TimedOut { .. } => ErrorKind::TimedOut,
            Self::MaxIterationsExceeded { .. } => ErrorKind::MaxIterationsExceeded,
            Self::Interrupted { .. } => ErrorKind::InterruptedByShutdown,
            Self::Config(_) | Self::ConfigNotFound(_) => ErrorKind::Configuration,
            Self::Unexpected { .. } | Self::Io(_) | Self::Json(_) => ErrorKind::Unexpected,
        }
    }

    /// Wrap an arbitrary failure that reached the executor boundary.
    pub fn unexpected(error_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Unexpected {
            error_type: error_type.into(),
            message: message.into(),
            trace: None,
        }
    }
}

/// Terminal diagnostics for a failed run. Attached to the run's result
/// and to its `task_failed` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureReport {
    pub kind: ErrorKind,
    pub message: String,
    pub iterations_completed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<TimeoutScope>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shutdown_signal: Option<ShutdownSignal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<String>,
}

impl FailureReport {
    /// Classify a run failure. `iterations` is the engine's completed
    /// count when the run ended; `debug` controls trace inclusion.
    pub fn classify(err: &CogentError, iterations: usize, debug: bool) -> Self {
        let mut report = Self {
            kind: err.kind(),
            message: err.to_string(),
            iterations_completed: iterations,
            timeout: None,
            shutdown_signal: None,
            trace: None,
        };
        match err {
            CogentError::TimedOut { scope, .. } => report.timeout = Some(*scope),
            CogentError::Interrupted {
                signal,
                iterations_completed,
            } => {
                report.shutdown_signal = Some(*signal);
                report.iterations_completed = *iterations_completed;
            }
            CogentError::MaxIterationsExceeded { completed, .. } => {
                report.iterations_completed = *completed;
            }
            CogentError::Unexpected { trace, .. } if debug => {
                report.trace = trace.clone();
            }
            _ => {}
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_covers_taxonomy() {
        assert_eq!(CogentError::Provider("401".into()).kind(), ErrorKind::Provider);
        assert_eq!(
            CogentError::Tool {
                tool: "shell".into(),
                message: "exit 1".into()
            }
            .kind(),
            ErrorKind::Tool
        );
        assert_eq!(
            CogentError::Config("bad".into()).kind(),
            ErrorKind::Configuration
        );
        assert_eq!(
            CogentError::unexpected("ValueError", "boom").kind(),
            ErrorKind::Unexpected
        );
        assert_eq!(
            CogentError::Json(serde_json::from_str::<u32>("x").unwrap_err()).kind(),
            ErrorKind::Unexpected
        );
    }

    #[test]
    fn classify_timeout_carries_scope() {
        let err = CogentError::TimedOut {
            scope: TimeoutScope::Task,
            elapsed_ms: 1200,
            limit_ms: 1000,
        };
        let report = FailureReport::classify(&err, 4, false);
        assert_eq!(report.kind, ErrorKind::TimedOut);
        assert_eq!(report.timeout, Some(TimeoutScope::Task));
        assert_eq!(report.iterations_completed, 4);
        assert!(report.shutdown_signal.is_none());
    }

    #[test]
    fn classify_interrupt_carries_signal_and_count() {
        let err = CogentError::Interrupted {
            signal: ShutdownSignal::Terminate,
            iterations_completed: 7,
        };
        let report = FailureReport::classify(&err, 0, false);
        assert_eq!(report.kind, ErrorKind::InterruptedByShutdown);
        assert_eq!(report.shutdown_signal, Some(ShutdownSignal::Terminate));
        assert_eq!(report.iterations_completed, 7);
    }

    #[test]
    fn classify_trace_only_in_debug() {
        let err = CogentError::Unexpected {
            error_type: "panic".into(),
            message: "boom".into(),
            trace: Some("at engine.rs:42".into()),
        };
        let without = FailureReport::classify(&err, 1, false);
        assert!(without.trace.is_none());
        let with = FailureReport::classify(&err, 1, true);
        assert_eq!(with.trace.as_deref(), Some("at engine.rs:42"));
    }

    #[test]
    fn error_kind_display_tags() {
        assert_eq!(ErrorKind::TimedOut.to_string(), "TimedOut");
        assert_eq!(ErrorKind::Configuration.to_string(), "ConfigurationError");
        assert_eq!(
            ErrorKind::InterruptedByShutdown.to_string(),
            "InterruptedByShutdown"
        );
    }
}
