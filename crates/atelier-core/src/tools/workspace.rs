//! Sandboxed filesystem executor for project file tools.
//!
//! `FileWorkspace` implements `ToolExecutor` against a projects root
//! directory: each project id is a subdirectory, and every path in a
//! tool payload is resolved relative to that subdirectory. Absolute
//! paths and `..` components are rejected before touching the disk.

use std::collections::VecDeque;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use similar::TextDiff;
use tokio::fs;
use tracing::debug;

use crate::ai::types::ToolCall;

use super::args::{
    DeleteFileArgs, ListFilesArgs, PatchFileArgs, ReadFileArgs, RenameFileArgs, ToolArgs,
    WriteFileArgs,
};
use super::executor::{ToolExecutor, ToolOutcome};

const LIST_MAX_DEPTH: usize = 4;
const LIST_MAX_ENTRIES: usize = 200;

/// Filesystem-backed tool execution boundary.
pub struct FileWorkspace {
    projects_root: PathBuf,
}

impl FileWorkspace {
    pub fn new(projects_root: impl Into<PathBuf>) -> Self {
        Self {
            projects_root: projects_root.into(),
        }
    }

    fn project_dir(&self, project_id: &str) -> Result<PathBuf, String> {
        if project_id.is_empty()
            || project_id
                .chars()
                .any(|c| c == '/' || c == '\\' || c == '.')
        {
            return Err(format!("Invalid project id: '{}'", project_id));
        }
        Ok(self.projects_root.join(project_id))
    }

    fn resolve(&self, project_dir: &Path, raw: &str) -> Result<PathBuf, String> {
        let rel = Path::new(raw);
        if rel.is_absolute() {
            return Err(format!(
                "Access denied: absolute path '{}' is outside the project",
                raw
            ));
        }
        for component in rel.components() {
            match component {
                Component::Normal(_) | Component::CurDir => {}
                _ => {
                    return Err(format!(
                        "Access denied: path '{}' escapes the project",
                        raw
                    ))
                }
            }
        }
        Ok(project_dir.join(rel))
    }

    async fn read_file(&self, dir: &Path, args: ReadFileArgs) -> ToolOutcome {
        let path = match self.resolve(dir, &args.path) {
            Ok(p) => p,
            Err(e) => return ToolOutcome::failure(e),
        };
        match fs::read_to_string(&path).await {
            Ok(content) => ToolOutcome::success(content),
            Err(e) => ToolOutcome::failure(format!("Failed to read '{}': {}", args.path, e)),
        }
    }

    async fn write_file(&self, dir: &Path, args: WriteFileArgs) -> ToolOutcome {
        let path = match self.resolve(dir, &args.path) {
            Ok(p) => p,
            Err(e) => return ToolOutcome::failure(e),
        };
        if let Some(parent) = path.parent() {
            if let Err(e) = fs::create_dir_all(parent).await {
                return ToolOutcome::failure(format!(
                    "Failed to create directories for '{}': {}",
                    args.path, e
                ));
            }
        }
        match fs::write(&path, &args.content).await {
            Ok(()) => {
                debug!(path = %args.path, bytes = args.content.len(), "wrote file");
                ToolOutcome::success(format!(
                    "Wrote {} bytes to {}",
                    args.content.len(),
                    args.path
                ))
            }
            Err(e) => ToolOutcome::failure(format!("Failed to write '{}': {}", args.path, e)),
        }
    }

    async fn patch_file(&self, dir: &Path, args: PatchFileArgs) -> ToolOutcome {
        let path = match self.resolve(dir, &args.path) {
            Ok(p) => p,
            Err(e) => return ToolOutcome::failure(e),
        };
        let content = match fs::read_to_string(&path).await {
            Ok(c) => c,
            Err(e) => {
                return ToolOutcome::failure(format!("Failed to read '{}': {}", args.path, e))
            }
        };

        let count = content.matches(&args.old).count();
        if count == 0 {
            return ToolOutcome::failure(format!(
                "String not found in '{}': {:?}",
                args.path, args.old
            ));
        }
        if count > 1 {
            return ToolOutcome::failure(format!(
                "String found {} times in '{}'; provide more context to make the match unique",
                count, args.path
            ));
        }

        let new_content = content.replacen(&args.old, &args.new, 1);
        let diff = compact_diff(&content, &new_content, &args.path);
        match fs::write(&path, &new_content).await {
            Ok(()) => ToolOutcome::success(format!(
                "Replaced 1 occurrence in {}\n{}",
                args.path, diff
            )),
            Err(e) => ToolOutcome::failure(format!("Failed to write '{}': {}", args.path, e)),
        }
    }

    async fn delete_file(&self, dir: &Path, args: DeleteFileArgs) -> ToolOutcome {
        let path = match self.resolve(dir, &args.path) {
            Ok(p) => p,
            Err(e) => return ToolOutcome::failure(e),
        };
        match fs::remove_file(&path).await {
            Ok(()) => ToolOutcome::success(format!("Deleted {}", args.path)),
            Err(e) => ToolOutcome::failure(format!("Failed to delete '{}': {}", args.path, e)),
        }
    }

    async fn rename_file(&self, dir: &Path, args: RenameFileArgs) -> ToolOutcome {
        let from = match self.resolve(dir, &args.from) {
            Ok(p) => p,
            Err(e) => return ToolOutcome::failure(e),
        };
        let to = match self.resolve(dir, &args.to) {
            Ok(p) => p,
            Err(e) => return ToolOutcome::failure(e),
        };
        if let Some(parent) = to.parent() {
            if let Err(e) = fs::create_dir_all(parent).await {
                return ToolOutcome::failure(format!(
                    "Failed to create directories for '{}': {}",
                    args.to, e
                ));
            }
        }
        match fs::rename(&from, &to).await {
            Ok(()) => ToolOutcome::success(format!("Renamed {} -> {}", args.from, args.to)),
            Err(e) => ToolOutcome::failure(format!(
                "Failed to rename '{}' to '{}': {}",
                args.from, args.to, e
            )),
        }
    }

    async fn list_files(&self, dir: &Path, args: ListFilesArgs) -> ToolOutcome {
        let start = match args.path.as_deref() {
            Some(p) => match self.resolve(dir, p) {
                Ok(resolved) => resolved,
                Err(e) => return ToolOutcome::failure(e),
            },
            None => dir.to_path_buf(),
        };

        // Breadth-first so shallow structure is reported before deep leaves.
        let mut queue: VecDeque<(PathBuf, usize)> = VecDeque::new();
        queue.push_back((start, 0));
        let mut lines = Vec::new();
        let mut truncated = false;

        while let Some((current, depth)) = queue.pop_front() {
            let mut entries = match fs::read_dir(&current).await {
                Ok(e) => e,
                Err(e) => {
                    if depth == 0 {
                        return ToolOutcome::failure(format!(
                            "Failed to list '{}': {}",
                            current.display(),
                            e
                        ));
                    }
                    continue;
                }
            };

            while let Ok(Some(entry)) = entries.next_entry().await {
                if lines.len() >= LIST_MAX_ENTRIES {
                    truncated = true;
                    break;
                }
                let path = entry.path();
                let display = path
                    .strip_prefix(dir)
                    .unwrap_or(&path)
                    .to_string_lossy()
                    .to_string();
                let is_dir = entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false);
                if is_dir {
                    lines.push(format!("{}/", display));
                    if depth + 1 < LIST_MAX_DEPTH {
                        queue.push_back((path, depth + 1));
                    }
                } else {
                    lines.push(display);
                }
            }
            if truncated {
                break;
            }
        }

        lines.sort();
        let mut output = lines.join("\n");
        if truncated {
            output.push_str(&format!("\n[... truncated at {} entries ...]", LIST_MAX_ENTRIES));
        }
        ToolOutcome::success(output)
    }
}

#[async_trait]
impl ToolExecutor for FileWorkspace {
    async fn execute(&self, project_id: &str, call: &ToolCall) -> ToolOutcome {
        let dir = match self.project_dir(project_id) {
            Ok(d) => d,
            Err(e) => return ToolOutcome::failure(e),
        };

        let args = match ToolArgs::parse(&call.name, &call.arguments) {
            Ok(a) => a,
            Err(e) => return ToolOutcome::failure(e),
        };

        match args {
            ToolArgs::ReadFile(a) => self.read_file(&dir, a).await,
            ToolArgs::WriteFile(a) => self.write_file(&dir, a).await,
            ToolArgs::PatchFile(a) => self.patch_file(&dir, a).await,
            ToolArgs::DeleteFile(a) => self.delete_file(&dir, a).await,
            ToolArgs::RenameFile(a) => self.rename_file(&dir, a).await,
            ToolArgs::ListFiles(a) => self.list_files(&dir, a).await,
        }
    }
}

fn compact_diff(old: &str, new: &str, label: &str) -> String {
    let diff = TextDiff::from_lines(old, new);
    let mut output = String::new();
    for hunk in diff.unified_diff().context_radius(2).iter_hunks() {
        output.push_str(&format!("{}", hunk));
    }
    if output.is_empty() {
        return String::new();
    }
    format!("--- {}\n+++ {}\n{}", label, label, output)
}
