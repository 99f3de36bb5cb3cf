//! Error taxonomy for the edit orchestrator.
//!
//! Only hard failures live here. Tool failures are data (`ToolOutcome`)
//! folded back into the conversation, and cancellation is not an error at
//! all - a superseded request resolves to `Status::Idle`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    /// The selected model cannot call tools. Rejected before any network
    /// call is made.
    #[error("model '{0}' does not support tool calling; pick a tool-capable model")]
    ToolCallsUnsupported(String),

    /// The chat stream failed or ended without signalling completion.
    #[error("stream error: {0}")]
    Transport(String),

    /// No stream event arrived within the read timeout.
    #[error("stream timed out: no data received for {0} seconds")]
    StreamTimeout(u64),
}
