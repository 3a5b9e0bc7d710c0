//! Pending-work tools

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::{ToolContext, ToolResult, ToolTrait};
use crate::context::TodoItem;

/// Replace the pending-work list
pub struct TodoWriteTool;

#[derive(Deserialize)]
struct TodoWriteArgs {
    todos: Vec<TodoItem>,
}

#[async_trait]
impl ToolTrait for TodoWriteTool {
    fn name(&self) -> &str {
        "todo_write"
    }
    fn description(&self) -> &str {
        "Replace the task list. Use it to plan multi-step work and mark progress."
    }
    fn parameters(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "todos": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "string" },
                            "content": { "type": "string" },
                            "status": {
                                "type": "string",
                                "enum": ["pending", "in_progress", "completed"]
                            }
                        },
                        "required": ["id", "content"]
                    }
                }
            },
            "required": ["todos"]
        })
    }
    async fn execute(&self, args: serde_json::Value, ctx: &ToolContext) -> ToolResult {
        let args: TodoWriteArgs = serde_json::from_value(args)?;
        let count = args.todos.len();

        debug!("Updating task list: {} items", count);
        ctx.pending_work.replace(args.todos).await;
        Ok(format!(
            "Task list updated ({} items)\n{}",
            count,
            ctx.pending_work.render().await
        ))
    }
}

/// Show the pending-work list
pub struct TodoReadTool;

#[async_trait]
impl ToolTrait for TodoReadTool {
    fn name(&self) -> &str {
        "todo_read"
    }
    fn description(&self) -> &str {
        "Show the current task list."
    }
    fn parameters(&self) -> serde_json::Value {
        json!({ "type": "object", "properties": {}, "required": [] })
    }
    async fn execute(&self, _args: serde_json::Value, ctx: &ToolContext) -> ToolResult {
        if ctx.pending_work.is_empty().await {
            return Ok("No tasks".to_string());
        }
        Ok(ctx.pending_work.render().await)
    }
}
