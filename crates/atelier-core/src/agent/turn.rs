//! One model turn: fold the event stream into a `TurnResult`.
//!
//! The fold itself is pure and synchronous so it can be tested without a
//! network; `run_turn` owns the I/O of opening the stream and reading
//! events, with a defensive per-read timeout.

use std::time::Duration;

use tokio::sync::mpsc;

use crate::ai::client::ChatStreamClient;
use crate::ai::streaming::StreamEvent;
use crate::ai::types::{ChatMessage, ModelInfo, ToolCall, ToolSpec};
use crate::error::AgentError;

use super::events::LoopEvent;

const STREAM_READ_TIMEOUT: Duration = Duration::from_secs(120);

/// Accumulated output of one model turn.
#[derive(Debug, Clone, Default)]
pub struct TurnResult {
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
}

impl TurnResult {
    /// The tool-less turn is the sole completion signal the loop
    /// controller acts on.
    pub fn is_tool_less(&self) -> bool {
        self.tool_calls.is_empty()
    }
}

/// What a folded event means for the read loop.
#[derive(Debug)]
pub(crate) enum FoldStep {
    Continue,
    Done,
    Failed(String),
}

/// Pure accumulator over the closed `StreamEvent` set.
///
/// Content fragments append in order; tool-call batches merge in order
/// into one list for the turn.
#[derive(Debug, Default)]
pub(crate) struct TurnAccumulator {
    content: String,
    tool_calls: Vec<ToolCall>,
}

impl TurnAccumulator {
    pub(crate) fn apply(&mut self, event: StreamEvent) -> FoldStep {
        match event {
            StreamEvent::ContentDelta { delta } => {
                self.content.push_str(&delta);
                FoldStep::Continue
            }
            StreamEvent::ToolCalls { calls } => {
                self.tool_calls.extend(calls);
                FoldStep::Continue
            }
            StreamEvent::Completed => FoldStep::Done,
            StreamEvent::Error { error } => FoldStep::Failed(error),
        }
    }

    pub(crate) fn finish(self) -> TurnResult {
        TurnResult {
            content: self.content,
            tool_calls: self.tool_calls,
        }
    }
}

/// Drive one conversational turn.
///
/// Any transport failure - a stream error event, the channel closing
/// without `Completed`, or a read timeout - aborts the whole operation.
pub async fn run_turn(
    client: &dyn ChatStreamClient,
    model: &ModelInfo,
    conversation: &[ChatMessage],
    tools: &[ToolSpec],
    event_tx: &mpsc::UnboundedSender<LoopEvent>,
) -> Result<TurnResult, AgentError> {
    let mut rx = client
        .stream(model, conversation, tools)
        .await
        .map_err(|e| AgentError::Transport(e.to_string()))?;

    let mut accumulator = TurnAccumulator::default();

    loop {
        let event = match tokio::time::timeout(STREAM_READ_TIMEOUT, rx.recv()).await {
            Ok(Some(event)) => event,
            Ok(None) => {
                return Err(AgentError::Transport(
                    "stream ended without completion".to_string(),
                ))
            }
            Err(_) => return Err(AgentError::StreamTimeout(STREAM_READ_TIMEOUT.as_secs())),
        };

        match &event {
            StreamEvent::ContentDelta { delta } => {
                let _ = event_tx.send(LoopEvent::TextDelta {
                    delta: delta.clone(),
                });
            }
            StreamEvent::ToolCalls { calls } => {
                let _ = event_tx.send(LoopEvent::ToolCallsReceived { count: calls.len() });
            }
            _ => {}
        }

        match accumulator.apply(event) {
            FoldStep::Continue => {}
            FoldStep::Done => break,
            FoldStep::Failed(error) => return Err(AgentError::Transport(error)),
        }
    }

    Ok(accumulator.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tool_call(id: &str) -> ToolCall {
        ToolCall {
            id: id.to_string(),
            name: "read_file".to_string(),
            arguments: json!({"path": "index.html"}),
        }
    }

    #[test]
    fn fold_preserves_fragment_order() {
        let mut acc = TurnAccumulator::default();
        for delta in ["The ", "card ", "is red."] {
            assert!(matches!(
                acc.apply(StreamEvent::ContentDelta {
                    delta: delta.to_string()
                }),
                FoldStep::Continue
            ));
        }
        assert!(matches!(acc.apply(StreamEvent::Completed), FoldStep::Done));
        assert_eq!(acc.finish().content, "The card is red.");
    }

    #[test]
    fn fold_merges_tool_call_batches_in_order() {
        let mut acc = TurnAccumulator::default();
        acc.apply(StreamEvent::ToolCalls {
            calls: vec![tool_call("a"), tool_call("b")],
        });
        acc.apply(StreamEvent::ToolCalls {
            calls: vec![tool_call("c")],
        });
        acc.apply(StreamEvent::Completed);
        let result = acc.finish();
        let ids: Vec<_> = result.tool_calls.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn fold_without_tool_calls_is_tool_less() {
        let mut acc = TurnAccumulator::default();
        acc.apply(StreamEvent::ContentDelta {
            delta: "done".to_string(),
        });
        acc.apply(StreamEvent::Completed);
        assert!(acc.finish().is_tool_less());
    }

    #[test]
    fn fold_surfaces_stream_errors() {
        let mut acc = TurnAccumulator::default();
        let step = acc.apply(StreamEvent::Error {
            error: "connection reset".to_string(),
        });
        match step {
            FoldStep::Failed(error) => assert_eq!(error, "connection reset"),
            other => panic!("expected failure, got {:?}", other),
        }
    }
}
