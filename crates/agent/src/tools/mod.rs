//! Action registry and built-in tools

pub mod filesystem;
pub mod path_utils;
pub mod search;
pub mod shell;
pub mod todo;

pub use filesystem::{EditFileTool, ListDirTool, ReadFileTool, WriteFileTool};
pub use search::{GlobTool, GrepTool};
pub use shell::ExecTool;
pub use todo::{TodoReadTool, TodoWriteTool};

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::debug;

use tatty_config::ToolsConfig;
use tatty_provider::Tool;

use crate::context::{InterruptFlag, TodoList};
use crate::{AgentError, Result};

/// Error type returned by tool handlers
pub type ToolResult = std::result::Result<String, Box<dyn std::error::Error + Send + Sync>>;

type BoxedTool = Box<dyn ToolTrait + Send + Sync>;

/// What a handler sees of the invoking context
#[derive(Debug, Clone)]
pub struct ToolContext {
    pub working_dir: PathBuf,
    pub pending_work: TodoList,
    pub interrupt: InterruptFlag,
    pub depth: u32,
}

impl ToolContext {
    /// Context rooted at `working_dir` with fresh state, for calling tools directly
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
            pending_work: TodoList::new(),
            interrupt: InterruptFlag::new(),
            depth: 0,
        }
    }
}

#[async_trait]
pub trait ToolTrait: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn parameters(&self) -> Value;
    async fn execute(&self, args: Value, ctx: &ToolContext) -> ToolResult;
}

pub fn to_provider_tool(tool: &dyn ToolTrait) -> Tool {
    Tool::new(tool.name(), tool.description(), tool.parameters())
}

/// Maps action kinds to handlers.
///
/// Populated once by the caller before any run; the runtime only dispatches.
pub struct ToolRegistry {
    tools: HashMap<String, BoxedTool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a handler under its name. An existing handler is replaced.
    pub fn register<T: ToolTrait + 'static>(&mut self, tool: T) {
        let name = tool.name().to_string();
        if self.tools.insert(name.clone(), Box::new(tool)).is_some() {
            debug!("Replaced tool handler: {}", name);
        }
    }

    pub fn get(&self, name: &str) -> Option<&(dyn ToolTrait + Send + Sync)> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    pub fn has(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Registered kinds, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// Tool specs for the model, in name order
    pub fn definitions(&self) -> Vec<Tool> {
        self.names()
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|t| to_provider_tool(t.as_ref()))
            .collect()
    }

    /// Look up the handler for `kind` and run it
    pub async fn dispatch(&self, kind: &str, args: Value, ctx: &ToolContext) -> Result<String> {
        let tool = self
            .tools
            .get(kind)
            .ok_or_else(|| AgentError::UnknownAction(kind.to_string()))?;

        debug!("Dispatching {} at depth {}", kind, ctx.depth);
        tool.execute(args, ctx)
            .await
            .map_err(|e| AgentError::ToolError(e.to_string()))
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Register the built-in tools
pub fn register_default_tools(registry: &mut ToolRegistry, config: &ToolsConfig) {
    registry.register(ReadFileTool);
    registry.register(WriteFileTool);
    registry.register(EditFileTool);
    registry.register(ListDirTool);
    registry.register(GlobTool);
    registry.register(GrepTool);

    if config.enable_shell {
        registry.register(ExecTool::new(config.exec_timeout_secs));
    }

    registry.register(TodoWriteTool);
    registry.register(TodoReadTool);
}
