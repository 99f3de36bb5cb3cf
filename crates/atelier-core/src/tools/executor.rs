//! The tool execution boundary.

use async_trait::async_trait;

use crate::ai::types::ToolCall;

/// Result of executing one tool call.
#[derive(Debug, Clone)]
pub struct ToolOutcome {
    pub succeeded: bool,
    pub output: String,
    pub error: Option<String>,
}

impl ToolOutcome {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            succeeded: true,
            output: output.into(),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        let error = error.into();
        Self {
            succeeded: false,
            output: error.clone(),
            error: Some(error),
        }
    }
}

/// Executes tool calls against one project's sandboxed file tree.
///
/// Must be safe to call repeatedly with the same arguments; the loop
/// does not deduplicate. Conflicting concurrent writes are this
/// boundary's problem to serialize or reject - the loop itself already
/// runs calls serially within one operation.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    async fn execute(&self, project_id: &str, call: &ToolCall) -> ToolOutcome;
}
