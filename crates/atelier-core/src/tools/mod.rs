//! File tools the orchestrator exposes to the model.
//!
//! Six tools are recognized: `read_file`, `write_file`, `patch_file`,
//! `delete_file`, `rename_file`, `list_files`. Only write/patch/delete/
//! rename mutate the project tree and count toward `files_modified`.

pub mod args;
pub mod catalog;
pub mod executor;
pub mod workspace;

pub use args::ToolArgs;
pub use catalog::default_catalog;
pub use executor::{ToolExecutor, ToolOutcome};
pub use workspace::FileWorkspace;

use crate::ai::types::ToolCall;

pub const READ_FILE: &str = "read_file";
pub const WRITE_FILE: &str = "write_file";
pub const PATCH_FILE: &str = "patch_file";
pub const DELETE_FILE: &str = "delete_file";
pub const RENAME_FILE: &str = "rename_file";
pub const LIST_FILES: &str = "list_files";

/// Whether a tool modifies the project tree.
pub fn is_mutating(name: &str) -> bool {
    matches!(name, WRITE_FILE | PATCH_FILE | DELETE_FILE | RENAME_FILE)
}

/// The path a successful mutating call changed, for `files_modified`
/// bookkeeping. Rename records the destination; the source is gone.
pub fn mutated_path(call: &ToolCall) -> Option<String> {
    if !is_mutating(&call.name) {
        return None;
    }
    let key = if call.name == RENAME_FILE { "to" } else { "path" };
    call.arguments
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::to_string)
}
