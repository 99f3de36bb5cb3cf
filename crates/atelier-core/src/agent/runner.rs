//! The bounded multi-turn loop controller.
//!
//! Repeatedly drives the turn engine, executes requested tools strictly
//! in emission order, folds the outcomes back into the conversation, and
//! classifies the terminal result. Tool failures never abort the loop -
//! they are reported to the model so it can self-correct on the next
//! turn. Transport failures abort the whole operation.

use std::collections::BTreeSet;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::ai::client::ChatStreamClient;
use crate::ai::types::{ChatMessage, ModelInfo, ToolSpec};
use crate::error::AgentError;
use crate::tools::executor::ToolExecutor;
use crate::tools::mutated_path;

use super::events::LoopEvent;
use super::turn::run_turn;

/// Fallback message for a tool-less stop with no accumulated content.
const COMPLETED_SENTINEL: &str = "Edit completed.";

/// Terminal value of one full edit operation.
#[derive(Debug, Clone)]
pub struct OperationOutcome {
    pub succeeded: bool,
    pub message: String,
    pub tool_calls_executed: usize,
    pub files_modified: BTreeSet<String>,
    pub error: Option<String>,
}

impl OperationOutcome {
    fn failure(error: String) -> Self {
        Self {
            succeeded: false,
            message: error.clone(),
            tool_calls_executed: 0,
            files_modified: BTreeSet::new(),
            error: Some(error),
        }
    }
}

/// Run one edit operation to its terminal outcome.
///
/// `conversation` is the prompt seed; each turn appends exactly one
/// assistant message followed by one tool message per executed call.
/// Never invokes the turn engine more than `max_turns` times.
#[allow(clippy::too_many_arguments)]
pub async fn run_operation(
    client: &dyn ChatStreamClient,
    executor: &dyn ToolExecutor,
    project_id: &str,
    model: &ModelInfo,
    mut conversation: Vec<ChatMessage>,
    tools: &[ToolSpec],
    max_turns: usize,
    event_tx: &mpsc::UnboundedSender<LoopEvent>,
) -> OperationOutcome {
    // Capability mismatch is rejected before any network call.
    if !model.supports_tool_calls {
        let error = AgentError::ToolCallsUnsupported(model.id.clone()).to_string();
        let _ = event_tx.send(LoopEvent::Error {
            error: error.clone(),
        });
        let _ = event_tx.send(LoopEvent::Finished);
        return OperationOutcome::failure(error);
    }

    let mut tool_calls_executed = 0usize;
    let mut files_modified: BTreeSet<String> = BTreeSet::new();

    for turn in 1..=max_turns {
        let result = match run_turn(client, model, &conversation, tools, event_tx).await {
            Ok(result) => result,
            Err(e) => {
                let error = e.to_string();
                warn!(turn, project = project_id, %error, "edit operation aborted");
                let _ = event_tx.send(LoopEvent::Error {
                    error: error.clone(),
                });
                let _ = event_tx.send(LoopEvent::Finished);
                return OperationOutcome {
                    succeeded: false,
                    message: error.clone(),
                    tool_calls_executed,
                    files_modified,
                    error: Some(error),
                };
            }
        };

        // Tool-less stop: the model considers the task done.
        if result.is_tool_less() {
            debug!(turn, project = project_id, "tool-less stop");
            let _ = event_tx.send(LoopEvent::TurnComplete {
                turn,
                has_more: false,
            });
            let _ = event_tx.send(LoopEvent::Finished);
            let message = if result.content.is_empty() {
                COMPLETED_SENTINEL.to_string()
            } else {
                result.content
            };
            return OperationOutcome {
                succeeded: true,
                message,
                tool_calls_executed,
                files_modified,
                error: None,
            };
        }

        conversation.push(ChatMessage::assistant(
            result.content.clone(),
            result.tool_calls.clone(),
        ));

        // Serial, in emission order: later calls may depend on earlier
        // file states.
        for call in &result.tool_calls {
            let _ = event_tx.send(LoopEvent::ToolExecuting {
                id: call.id.clone(),
                name: call.name.clone(),
            });

            let outcome = executor.execute(project_id, call).await;
            tool_calls_executed += 1;

            if outcome.succeeded {
                if let Some(path) = mutated_path(call) {
                    files_modified.insert(path);
                }
            }

            let _ = event_tx.send(LoopEvent::ToolResult {
                id: call.id.clone(),
                name: call.name.clone(),
                is_error: !outcome.succeeded,
            });

            let content = if outcome.succeeded {
                outcome.output
            } else {
                format!(
                    "ERROR: {}",
                    outcome.error.unwrap_or_else(|| outcome.output.clone())
                )
            };
            conversation.push(ChatMessage::tool_result(&call.id, &call.name, content));
        }

        let _ = event_tx.send(LoopEvent::TurnComplete {
            turn,
            has_more: turn < max_turns,
        });
    }

    // Budget exhausted without a tool-less stop. Partial progress is
    // retained and the message says so - this is a qualified success,
    // not a hard failure.
    debug!(
        project = project_id,
        max_turns, tool_calls_executed, "turn budget exhausted"
    );
    let _ = event_tx.send(LoopEvent::Finished);
    OperationOutcome {
        succeeded: true,
        message: format!(
            "Stopped after the {}-turn limit without a completion signal; changes applied so far have been kept.",
            max_turns
        ),
        tool_calls_executed,
        files_modified,
        error: None,
    }
}
