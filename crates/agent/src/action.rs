//! Proposed actions

use serde::Deserialize;
use serde_json::Value;

use tatty_provider::{object_schema, Tool, ToolCall};

use crate::{AgentError, Result};

/// Reserved kind that spawns a nested sub-agent
pub const DELEGATE: &str = "delegate";

/// Reserved kind that moves the context's working directory
pub const CHANGE_DIRECTORY: &str = "change_directory";

/// A single operation proposed by the model.
///
/// `Tool` actions are opaque to the runtime and go through the registry.
/// The other variants are handled by the runtime itself.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Tool {
        id: String,
        kind: String,
        args: Value,
    },
    Delegate {
        id: String,
        description: String,
        prompt: String,
    },
    ChangeDirectory {
        id: String,
        path: String,
    },
}

#[derive(Deserialize)]
struct DelegateArgs {
    #[serde(default)]
    description: String,
    prompt: String,
}

#[derive(Deserialize)]
struct ChangeDirectoryArgs {
    path: String,
}

pub(crate) fn new_call_id() -> String {
    format!("call_{}", uuid::Uuid::new_v4().simple())
}

impl Action {
    /// Interpret a model tool call. Reserved kinds must carry valid arguments.
    pub fn from_tool_call(call: &ToolCall) -> Result<Self> {
        let id = if call.id.is_empty() {
            new_call_id()
        } else {
            call.id.clone()
        };

        match call.name.as_str() {
            DELEGATE => {
                let args: DelegateArgs = parse_args(DELEGATE, &call.arguments)?;
                let description = if args.description.is_empty() {
                    summarize(&args.prompt)
                } else {
                    args.description
                };
                Ok(Action::Delegate {
                    id,
                    description,
                    prompt: args.prompt,
                })
            }
            CHANGE_DIRECTORY => {
                let args: ChangeDirectoryArgs = parse_args(CHANGE_DIRECTORY, &call.arguments)?;
                Ok(Action::ChangeDirectory {
                    id,
                    path: args.path,
                })
            }
            kind => Ok(Action::Tool {
                id,
                kind: kind.to_string(),
                args: call.arguments.clone(),
            }),
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Action::Tool { id, .. }
            | Action::Delegate { id, .. }
            | Action::ChangeDirectory { id, .. } => id,
        }
    }

    pub fn kind(&self) -> &str {
        match self {
            Action::Tool { kind, .. } => kind,
            Action::Delegate { .. } => DELEGATE,
            Action::ChangeDirectory { .. } => CHANGE_DIRECTORY,
        }
    }

    /// Specs for the kinds the runtime handles itself
    pub fn builtin_definitions() -> Vec<Tool> {
        vec![
            Tool::new(
                DELEGATE,
                "Hand a self-contained task to a sub-agent. The sub-agent works in the same \
                 directory with a fresh conversation and returns a single summary.",
                object_schema(vec![
                    (
                        "description".to_string(),
                        "Short (3-5 word) label for the task".to_string(),
                        true,
                    ),
                    (
                        "prompt".to_string(),
                        "Full instructions for the sub-agent".to_string(),
                        true,
                    ),
                ]),
            ),
            Tool::new(
                CHANGE_DIRECTORY,
                "Change the working directory used by all subsequent tools.",
                object_schema(vec![(
                    "path".to_string(),
                    "Directory to switch to, absolute or relative to the current one".to_string(),
                    true,
                )]),
            ),
        ]
    }
}

fn parse_args<T: serde::de::DeserializeOwned>(kind: &str, args: &Value) -> Result<T> {
    serde_json::from_value(args.clone()).map_err(|e| AgentError::InvalidArguments {
        kind: kind.to_string(),
        detail: e.to_string(),
    })
}

fn summarize(prompt: &str) -> String {
    const MAX_CHARS: usize = 40;
    let first_line = prompt.lines().next().unwrap_or("").trim();
    if first_line.chars().count() > MAX_CHARS {
        let cut: String = first_line.chars().take(MAX_CHARS).collect();
        format!("{}...", cut)
    } else {
        first_line.to_string()
    }
}
