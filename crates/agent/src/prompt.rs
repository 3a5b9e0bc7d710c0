//! System prompt assembly

use chrono::Local;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Builds the system prompt seeded into a fresh history
pub struct PromptBuilder {
    working_dir: PathBuf,
    tool_names: Vec<String>,
    custom: Option<String>,
}

impl PromptBuilder {
    /// Project instructions picked up from the working directory
    const PROJECT_FILE: &'static str = "TATTY.md";

    pub fn new(working_dir: impl AsRef<Path>) -> Self {
        Self {
            working_dir: working_dir.as_ref().to_path_buf(),
            tool_names: Vec::new(),
            custom: None,
        }
    }

    pub fn with_tools(mut self, names: Vec<String>) -> Self {
        self.tool_names = names;
        self
    }

    /// Replace the built-in identity text
    pub fn with_custom_prompt(mut self, prompt: Option<String>) -> Self {
        self.custom = prompt;
        self
    }

    /// Prompt for a run at `depth`; anything deeper than 0 is a sub-agent
    pub async fn build(&self, depth: u32) -> String {
        let mut parts = vec![match &self.custom {
            Some(custom) => custom.clone(),
            None if depth == 0 => self.identity(),
            None => self.sub_agent_identity(depth),
        }];

        parts.push(self.environment());

        if let Some(project) = self.load_project_file().await {
            parts.push(format!("# Project instructions\n\n{}", project));
        }

        parts.join("\n\n---\n\n")
    }

    fn identity(&self) -> String {
        r#"# tatty

You are tatty, a coding agent working inside a project directory. Use the
available tools to inspect and change files and to run commands. Plan
multi-step work with todo_write. Hand self-contained subtasks to a sub-agent
with the delegate tool.

When the task is done, reply with a short summary and no tool calls."#
            .to_string()
    }

    fn sub_agent_identity(&self, depth: u32) -> String {
        format!(
            r#"# tatty sub-agent (level {})

You are a sub-agent started by another agent to complete one specific task.
You do not share its conversation. Work only on the task you were given,
then reply with a concise, self-contained report of the result. Your final
reply is the only thing the calling agent will see."#,
            depth
        )
    }

    fn environment(&self) -> String {
        let now = Local::now().format("%Y-%m-%d %H:%M (%A)");
        let tools = if self.tool_names.is_empty() {
            "(none)".to_string()
        } else {
            self.tool_names.join(", ")
        };

        format!(
            "## Current Time\n{}\n\n## Working Directory\n{}\n\n## Tools\n{}",
            now,
            self.working_dir.display(),
            tools
        )
    }

    async fn load_project_file(&self) -> Option<String> {
        let path = self.working_dir.join(Self::PROJECT_FILE);
        if !path.is_file() {
            return None;
        }
        match tokio::fs::read_to_string(&path).await {
            Ok(content) if !content.trim().is_empty() => Some(content),
            Ok(_) => None,
            Err(e) => {
                debug!("Failed to read {}: {}", Self::PROJECT_FILE, e);
                None
            }
        }
    }
}
