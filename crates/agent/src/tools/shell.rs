//! Shell command tool

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

use super::path_utils::validate_workspace_path;
use super::{ToolContext, ToolResult, ToolTrait};

const MAX_OUTPUT_BYTES: usize = 10_000;
const INTERRUPT_POLL: Duration = Duration::from_millis(100);

/// Runs `sh -c <command>` in the working directory
pub struct ExecTool {
    timeout_secs: u64,
}

impl ExecTool {
    pub fn new(timeout_secs: u64) -> Self {
        Self { timeout_secs }
    }
}

impl Default for ExecTool {
    fn default() -> Self {
        Self::new(120)
    }
}

#[derive(Deserialize)]
struct ExecArgs {
    command: String,
    working_dir: Option<String>,
}

#[async_trait]
impl ToolTrait for ExecTool {
    fn name(&self) -> &str {
        "exec"
    }
    fn description(&self) -> &str {
        "Run a shell command and return its output."
    }
    fn parameters(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "command": { "type": "string", "description": "Shell command" },
                "working_dir": { "type": "string", "description": "Optional subdirectory to run in" }
            },
            "required": ["command"]
        })
    }
    async fn execute(&self, args: serde_json::Value, ctx: &ToolContext) -> ToolResult {
        let args: ExecArgs = serde_json::from_value(args)?;

        let working_dir = match args.working_dir {
            Some(dir) => validate_workspace_path(&dir, &ctx.working_dir).await?,
            None => ctx.working_dir.clone(),
        };

        debug!("Executing: {}", args.command);
        let child = Command::new("sh")
            .arg("-c")
            .arg(&args.command)
            .current_dir(&working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();
        let child = match child {
            Ok(child) => child,
            Err(e) => return Ok(format!("Failed to start command: {}", e)),
        };

        let interrupt = ctx.interrupt.clone();
        let interrupted = async move {
            while !interrupt.is_requested() {
                tokio::time::sleep(INTERRUPT_POLL).await;
            }
        };

        // Dropping the wait future drops the child, which kills it.
        let output = tokio::select! {
            result = tokio::time::timeout(
                Duration::from_secs(self.timeout_secs),
                child.wait_with_output(),
            ) => match result {
                Ok(Ok(output)) => output,
                Ok(Err(e)) => return Ok(format!("Command failed: {}", e)),
                Err(_) => {
                    warn!("Command timed out after {}s: {}", self.timeout_secs, args.command);
                    return Ok(format!("Command timed out after {} seconds", self.timeout_secs));
                }
            },
            _ = interrupted => {
                warn!("Command interrupted: {}", args.command);
                return Ok("Command interrupted".to_string());
            }
        };

        let mut parts = Vec::new();
        if !output.stdout.is_empty() {
            parts.push(String::from_utf8_lossy(&output.stdout).to_string());
        }
        if !output.stderr.is_empty() {
            parts.push(format!(
                "STDERR:\n{}",
                String::from_utf8_lossy(&output.stderr)
            ));
        }
        if output.status.code() != Some(0) {
            parts.push(format!("Exit code: {}", output.status.code().unwrap_or(-1)));
        }
        let result = if parts.is_empty() {
            "(no output)".to_string()
        } else {
            parts.join("\n")
        };
        Ok(truncate(result))
    }
}

fn truncate(output: String) -> String {
    if output.len() <= MAX_OUTPUT_BYTES {
        return output;
    }
    let mut cut = MAX_OUTPUT_BYTES;
    while !output.is_char_boundary(cut) {
        cut -= 1;
    }
    format!(
        "{}\n... (truncated, {} more bytes)",
        &output[..cut],
        output.len() - cut
    )
}
