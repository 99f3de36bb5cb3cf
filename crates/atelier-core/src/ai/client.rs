//! The streaming chat client seam.

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;

use super::streaming::StreamEvent;
use super::types::{ChatMessage, ModelInfo, ToolSpec};

/// A streaming, tool-capable chat backend.
///
/// Implementations open one model turn and push `StreamEvent`s through
/// the returned channel in emission order, terminating with `Completed`
/// or `Error`. Dropping the receiver cancels the turn; implementations
/// must tolerate that.
#[async_trait]
pub trait ChatStreamClient: Send + Sync {
    async fn stream(
        &self,
        model: &ModelInfo,
        messages: &[ChatMessage],
        tools: &[ToolSpec],
    ) -> Result<mpsc::UnboundedReceiver<StreamEvent>>;
}
