//! Core library for Atelier's agentic edit orchestrator.
//!
//! Turns a user intent from the visual editor (a slider drag, a retyped
//! text node, a picked image, a freeform instruction) into a durable
//! multi-file change performed by a tool-calling model, while keeping the
//! live preview surface in sync.
//!
//! The crate is organized around four layers:
//! - `ai` - conversation/streaming types and the `ChatStreamClient` seam
//! - `tools` - the tool name space, typed arguments, and the execution boundary
//! - `agent` - prompt builders, the turn engine, and the multi-turn loop
//! - `dispatcher` - public entry points with debounce and superseding cancellation
//!
//! The rendering widgets, file browser, code editor, preview server, and
//! undo ledger are external collaborators; they appear here only as the
//! `LiveRender` and `ToolExecutor` traits.

pub mod agent;
pub mod ai;
pub mod dispatcher;
pub mod error;
pub mod render;
pub mod tools;

pub use agent::prompts::build_prompt;
pub use agent::request::{EditRequest, ElementTarget};
pub use agent::runner::OperationOutcome;
pub use dispatcher::{DispatcherConfig, EditDispatcher, Status};
pub use error::AgentError;
pub use render::LiveRender;
pub use tools::executor::{ToolExecutor, ToolOutcome};
