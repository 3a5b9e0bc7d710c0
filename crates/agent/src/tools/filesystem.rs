//! File system tools

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::path_utils::validate_workspace_path;
use super::{ToolContext, ToolResult, ToolTrait};

/// Read a text file
pub struct ReadFileTool;

#[derive(Deserialize)]
struct ReadFileArgs {
    path: String,
}

#[async_trait]
impl ToolTrait for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }
    fn description(&self) -> &str {
        "Read the contents of a text file."
    }
    fn parameters(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": { "path": { "type": "string", "description": "File to read" } },
            "required": ["path"]
        })
    }
    async fn execute(&self, args: serde_json::Value, ctx: &ToolContext) -> ToolResult {
        let args: ReadFileArgs = serde_json::from_value(args)?;
        let path = validate_workspace_path(&args.path, &ctx.working_dir).await?;

        debug!("Reading {:?}", path);
        if !path.exists() {
            return Ok(format!("File not found: {}", args.path));
        }
        if !path.is_file() {
            return Ok(format!("Not a file: {}", args.path));
        }
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                Ok(format!("Permission denied: {}", args.path))
            }
            Err(e) => Ok(format!("Error reading file: {}", e)),
        }
    }
}

/// Write a file, creating parent directories
pub struct WriteFileTool;

#[derive(Deserialize)]
struct WriteFileArgs {
    path: String,
    content: String,
}

#[async_trait]
impl ToolTrait for WriteFileTool {
    fn name(&self) -> &str {
        "write_file"
    }
    fn description(&self) -> &str {
        "Write content to a file. Creates parent directories if needed."
    }
    fn parameters(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "File to write" },
                "content": { "type": "string", "description": "Full file content" }
            },
            "required": ["path", "content"]
        })
    }
    async fn execute(&self, args: serde_json::Value, ctx: &ToolContext) -> ToolResult {
        let args: WriteFileArgs = serde_json::from_value(args)?;
        let path = validate_workspace_path(&args.path, &ctx.working_dir).await?;

        debug!("Writing {:?}", path);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        match tokio::fs::write(&path, &args.content).await {
            Ok(_) => Ok(format!(
                "Wrote {} bytes to {}",
                args.content.len(),
                args.path
            )),
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                Ok(format!("Permission denied: {}", args.path))
            }
            Err(e) => Ok(format!("Error writing file: {}", e)),
        }
    }
}

/// Replace one exact occurrence of a text segment
pub struct EditFileTool;

#[derive(Deserialize)]
struct EditFileArgs {
    path: String,
    old_text: String,
    new_text: String,
}

#[async_trait]
impl ToolTrait for EditFileTool {
    fn name(&self) -> &str {
        "edit_file"
    }
    fn description(&self) -> &str {
        "Replace old_text with new_text in a file. old_text must match exactly once."
    }
    fn parameters(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "File to edit" },
                "old_text": { "type": "string", "description": "Exact text to replace" },
                "new_text": { "type": "string", "description": "Replacement text" }
            },
            "required": ["path", "old_text", "new_text"]
        })
    }
    async fn execute(&self, args: serde_json::Value, ctx: &ToolContext) -> ToolResult {
        let args: EditFileArgs = serde_json::from_value(args)?;
        let path = validate_workspace_path(&args.path, &ctx.working_dir).await?;

        debug!("Editing {:?}", path);
        if !path.exists() {
            return Ok(format!("File not found: {}", args.path));
        }
        let content = tokio::fs::read_to_string(&path).await?;
        let count = content.matches(&args.old_text).count();
        if count == 0 {
            return Ok("old_text not found in file".to_string());
        }
        if count > 1 {
            return Ok(format!(
                "old_text matches {} times; add surrounding context to make it unique",
                count
            ));
        }
        let new_content = content.replacen(&args.old_text, &args.new_text, 1);
        match tokio::fs::write(&path, new_content).await {
            Ok(_) => Ok(format!("Edited {}", args.path)),
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                Ok(format!("Permission denied: {}", args.path))
            }
            Err(e) => Ok(format!("Error writing file: {}", e)),
        }
    }
}

/// List a directory
pub struct ListDirTool;

#[derive(Deserialize)]
struct ListDirArgs {
    #[serde(default = "current_dir_arg")]
    path: String,
}

fn current_dir_arg() -> String {
    ".".to_string()
}

#[async_trait]
impl ToolTrait for ListDirTool {
    fn name(&self) -> &str {
        "list_dir"
    }
    fn description(&self) -> &str {
        "List the entries of a directory."
    }
    fn parameters(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "Directory to list (default: current)" }
            },
            "required": []
        })
    }
    async fn execute(&self, args: serde_json::Value, ctx: &ToolContext) -> ToolResult {
        let args: ListDirArgs = serde_json::from_value(args)?;
        let path = validate_workspace_path(&args.path, &ctx.working_dir).await?;

        debug!("Listing {:?}", path);
        if !path.exists() {
            return Ok(format!("Directory not found: {}", args.path));
        }
        if !path.is_dir() {
            return Ok(format!("Not a directory: {}", args.path));
        }
        let mut entries = tokio::fs::read_dir(&path).await?;
        let mut items = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            let prefix = if entry.file_type().await?.is_dir() {
                "[DIR] "
            } else {
                "[FILE] "
            };
            items.push(format!("{}{}", prefix, name));
        }
        items.sort();
        if items.is_empty() {
            Ok(format!("Empty directory: {}", args.path))
        } else {
            Ok(items.join("\n"))
        }
    }
}
