//! Agent execution core
//!
//! [`AgentRuntime`] drives the propose → execute → fold → decide cycle for one
//! [`ExecutionContext`]. Model-proposed [`Action`]s are dispatched through the
//! [`ToolRegistry`], except `delegate`, which the [`SubagentManager`] turns
//! into a nested run with its own iteration budget. Progress is reported to an
//! [`AgentObserver`].
//!
//! Cancellation is cooperative: the runtime polls the context's
//! [`InterruptFlag`] at the start of every cycle and before entering a
//! sub-agent. A tool that is already running is not preempted; long-running
//! handlers should poll [`tools::ToolContext::interrupt`] themselves.

use thiserror::Error;

pub mod action;
pub mod context;
pub mod observer;
pub mod prompt;
pub mod runtime;
pub mod subagent;
pub mod tools;

pub use action::Action;
pub use context::{ExecutionContext, InterruptFlag, TodoItem, TodoList, TodoStatus};
pub use observer::{AgentObserver, NoopObserver, TracingObserver};
pub use prompt::PromptBuilder;
pub use runtime::{AgentRuntime, Proposal, RunOutcome, RuntimeOptions};
pub use subagent::{SubagentManager, NESTING_LIMIT};
pub use tools::{ToolContext, ToolRegistry, ToolTrait};

/// Agent errors
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("Tool failed: {0}")]
    ToolError(String),

    #[error("Invalid arguments for {kind}: {detail}")]
    InvalidArguments { kind: String, detail: String },

    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Sub-agent depth limit ({0}) reached")]
    DepthLimit(u32),

    #[error("Invalid context: {0}")]
    InvalidContext(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AgentError {
    /// Errors the loop folds into history instead of ending the run
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AgentError::UnknownAction(_)
                | AgentError::ToolError(_)
                | AgentError::InvalidArguments { .. }
                | AgentError::DepthLimit(_)
                | AgentError::Io(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, AgentError>;
