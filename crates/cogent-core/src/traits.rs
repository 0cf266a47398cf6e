use futures::future::BoxFuture;

use crate::error::Result;
use crate::types::{AgentAction, ToolCall, ToolExchange, ToolResult};

/// Language-model collaborator — decides the next workflow action.
///
/// Provider failures (auth, quota, connectivity, unavailable model)
/// surface as `CogentError::Provider` and are classified by the
/// executor, not retried here.
pub trait LlmClient: Send + Sync + 'static {
    /// Decide the next action from the goal, the folded tool
    /// transcript, and the opaque conversation context.
    fn next_action<'a>(
        &'a self,
        goal: &'a str,
        transcript: &'a [ToolExchange],
        context: Option<&'a serde_json::Value>,
    ) -> BoxFuture<'a, Result<AgentAction>>;
}

/// Tool collaborator — executes a single tool invocation.
///
/// A returned `Err` and a `ToolResult { is_error: true }` are treated
/// the same by the engine: folded back into workflow context for the
/// model to react to.
pub trait ToolDispatcher: Send + Sync + 'static {
    fn invoke<'a>(&'a self, call: &'a ToolCall) -> BoxFuture<'a, Result<ToolResult>>;
}
