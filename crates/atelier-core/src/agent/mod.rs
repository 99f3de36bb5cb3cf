//! The agentic edit loop.
//!
//! - `request` - the closed `EditRequest` variant set
//! - `prompts` - pure conversation seeding per request kind
//! - `turn` - one model turn: stream folding into a `TurnResult`
//! - `runner` - the bounded multi-turn loop and outcome classification
//! - `events` - progress protocol consumed by the dispatcher

pub mod events;
pub mod prompts;
pub mod request;
pub mod runner;
pub mod turn;

pub use events::LoopEvent;
pub use request::{EditRequest, ElementTarget};
pub use runner::{run_operation, OperationOutcome};
pub use turn::TurnResult;
