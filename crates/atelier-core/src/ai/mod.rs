//! Model communication layer.
//!
//! Conversation and streaming types plus the `ChatStreamClient` seam. The
//! actual provider wire formats live behind that seam and are not this
//! crate's concern.

pub mod client;
pub mod streaming;
pub mod types;

pub use client::ChatStreamClient;
pub use streaming::StreamEvent;
pub use types::{ChatMessage, ModelInfo, Role, ToolCall, ToolSpec};
