//! The default tool catalog advertised to the model.

use serde_json::json;

use crate::ai::types::ToolSpec;

use super::{DELETE_FILE, LIST_FILES, PATCH_FILE, READ_FILE, RENAME_FILE, WRITE_FILE};

/// Build the six file-tool specs with their JSON schemas.
pub fn default_catalog() -> Vec<ToolSpec> {
    vec![
        ToolSpec {
            name: READ_FILE.to_string(),
            description: "Read a project file. Always read a file before patching it.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "path": {
                        "type": "string",
                        "description": "Project-relative path of the file to read"
                    }
                },
                "required": ["path"],
                "additionalProperties": false
            }),
        },
        ToolSpec {
            name: WRITE_FILE.to_string(),
            description: "Create or overwrite a project file. Creates parent directories if needed. Prefer patch_file for small changes.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "path": {
                        "type": "string",
                        "description": "Project-relative path of the file to write"
                    },
                    "content": {
                        "type": "string",
                        "description": "The full content to write"
                    }
                },
                "required": ["path", "content"],
                "additionalProperties": false
            }),
        },
        ToolSpec {
            name: PATCH_FILE.to_string(),
            description: "Replace text in a project file. Requires a unique old match; provide more surrounding context if the anchor is ambiguous.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "path": {
                        "type": "string",
                        "description": "Project-relative path of the file to patch"
                    },
                    "old": {
                        "type": "string",
                        "description": "The exact text to replace"
                    },
                    "new": {
                        "type": "string",
                        "description": "The text to replace it with"
                    }
                },
                "required": ["path", "old", "new"],
                "additionalProperties": false
            }),
        },
        ToolSpec {
            name: DELETE_FILE.to_string(),
            description: "Delete a project file.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "path": {
                        "type": "string",
                        "description": "Project-relative path of the file to delete"
                    }
                },
                "required": ["path"],
                "additionalProperties": false
            }),
        },
        ToolSpec {
            name: RENAME_FILE.to_string(),
            description: "Rename or move a project file.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "from": {
                        "type": "string",
                        "description": "Current project-relative path"
                    },
                    "to": {
                        "type": "string",
                        "description": "New project-relative path"
                    }
                },
                "required": ["from", "to"],
                "additionalProperties": false
            }),
        },
        ToolSpec {
            name: LIST_FILES.to_string(),
            description: "List files in the project tree. Pass a directory path to scope the listing.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "path": {
                        "type": "string",
                        "description": "Project-relative directory to list (default: project root)"
                    }
                },
                "additionalProperties": false
            }),
        },
    ]
}
