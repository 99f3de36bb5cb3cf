//! Progress protocol for the edit loop.
//!
//! The runner emits `LoopEvent`s for every meaningful state change; the
//! dispatcher (or any other consumer) maps them to its own surface - here,
//! the `Status` channel. Events are best-effort: a closed receiver never
//! stops the loop.

use serde::Serialize;

/// Events emitted while an edit operation runs.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LoopEvent {
    /// Text content delta from the model.
    TextDelta { delta: String },

    /// A batch of tool calls arrived from the stream.
    ToolCallsReceived { count: usize },

    /// A tool call is being executed.
    ToolExecuting { id: String, name: String },

    /// A tool call finished.
    ToolResult {
        id: String,
        name: String,
        is_error: bool,
    },

    /// One turn of the loop completed.
    TurnComplete { turn: usize, has_more: bool },

    /// The operation finished (any terminal classification).
    Finished,

    /// Hard failure.
    Error { error: String },
}
