//! Typed tool arguments.
//!
//! Tool call payloads arrive as opaque JSON from the model. Each
//! recognized tool name maps to a tagged variant with a typed record,
//! parsed exactly once at the execution boundary. Unparseable arguments
//! are a tool failure reported back to the model, never a crash.

use serde::Deserialize;
use serde_json::Value;

use super::{DELETE_FILE, LIST_FILES, PATCH_FILE, READ_FILE, RENAME_FILE, WRITE_FILE};

#[derive(Debug, Clone, Deserialize)]
pub struct ReadFileArgs {
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WriteFileArgs {
    pub path: String,
    pub content: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PatchFileArgs {
    pub path: String,
    pub old: String,
    pub new: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeleteFileArgs {
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RenameFileArgs {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListFilesArgs {
    #[serde(default)]
    pub path: Option<String>,
}

/// A recognized tool invocation with typed arguments.
#[derive(Debug, Clone)]
pub enum ToolArgs {
    ReadFile(ReadFileArgs),
    WriteFile(WriteFileArgs),
    PatchFile(PatchFileArgs),
    DeleteFile(DeleteFileArgs),
    RenameFile(RenameFileArgs),
    ListFiles(ListFilesArgs),
}

impl ToolArgs {
    /// Parse a tool name + payload pair. Returns a model-readable error
    /// message on unknown names or schema mismatches.
    pub fn parse(name: &str, arguments: &Value) -> Result<Self, String> {
        fn de<T: serde::de::DeserializeOwned>(name: &str, v: &Value) -> Result<T, String> {
            serde_json::from_value(v.clone())
                .map_err(|e| format!("Invalid parameters for '{}': {}", name, e))
        }

        match name {
            READ_FILE => de(name, arguments).map(ToolArgs::ReadFile),
            WRITE_FILE => de(name, arguments).map(ToolArgs::WriteFile),
            PATCH_FILE => de(name, arguments).map(ToolArgs::PatchFile),
            DELETE_FILE => de(name, arguments).map(ToolArgs::DeleteFile),
            RENAME_FILE => de(name, arguments).map(ToolArgs::RenameFile),
            LIST_FILES => de(name, arguments).map(ToolArgs::ListFiles),
            other => Err(format!("Unknown tool: {}", other)),
        }
    }
}
