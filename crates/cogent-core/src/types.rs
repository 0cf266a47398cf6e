use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::FailureReport;

/// Unique task request identifier.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_str(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Immutable input for one run. Read-only to the executor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRequest {
    pub id: RequestId,
    pub goal: String,
    /// Opaque conversation context from the retrieval layer, threaded
    /// through workflow state without interpretation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,
}

impl TaskRequest {
    pub fn new(goal: impl Into<String>) -> Self {
        Self {
            id: RequestId::new(),
            goal: goal.into(),
            context: None,
        }
    }

    pub fn with_context(mut self, context: serde_json::Value) -> Self {
        self.context = Some(context);
        self
    }
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    pub input: serde_json::Value,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, input: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            input,
        }
    }
}

/// Result of a tool execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub content: String,
    pub is_error: bool,
}

impl ToolResult {
    pub fn success(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: false,
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: true,
        }
    }
}

/// Next action decided by the language-model collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum AgentAction {
    ToolCall(ToolCall),
    FinalAnswer { text: String },
}

/// One completed workflow step: the requested call and the result that
/// was folded back into context for the next model decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolExchange {
    pub call: ToolCall,
    pub result: ToolResult,
}

/// Terminal value of a run. Exactly one per TaskRequest.
#[derive(Debug, Clone)]
pub enum TaskResult {
    Completed {
        output: String,
        iterations_completed: usize,
        duration: Duration,
    },
    Failed(FailureReport),
}

impl TaskResult {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    pub fn failure(&self) -> Option<&FailureReport> {
        match self {
            Self::Failed(report) => Some(report),
            Self::Completed { .. } => None,
        }
    }
}
