//! Stream events emitted by a `ChatStreamClient`.

use serde::{Deserialize, Serialize};

use super::types::ToolCall;

/// Events a streaming chat response is folded from.
///
/// Emission order is preserved by the client; a well-behaved stream
/// terminates with exactly one `Completed` or `Error`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Text content fragment. Fragments are appended in order, never
    /// reordered or deduplicated.
    ContentDelta { delta: String },

    /// A batch of completed tool calls. A single turn may deliver calls
    /// in one or several batches.
    ToolCalls { calls: Vec<ToolCall> },

    /// The model finished its turn.
    Completed,

    /// Transport or provider failure. Aborts the whole operation.
    Error { error: String },
}
