//! Agent runtime - the propose/execute/fold loop

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use tracing::{debug, info, warn};

use tatty_config::Config;
use tatty_provider::{ChatParams, Message, Provider, Tool, ToolCall, ToolCallDef, ToolChoice};

use crate::action::{new_call_id, Action};
use crate::context::ExecutionContext;
use crate::observer::AgentObserver;
use crate::prompt::PromptBuilder;
use crate::subagent::SubagentManager;
use crate::tools::ToolRegistry;
use crate::{AgentError, Result};

/// Reply used when the model finishes without any text
const EMPTY_REPLY: &str = "Task completed.";

/// How a run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The model produced a final reply
    Completed(String),
    /// The interrupt flag was observed at a cycle boundary
    Interrupted,
    /// The iteration budget ran out before a final reply
    BudgetExhausted { max_iterations: u32 },
}

impl RunOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, RunOutcome::Completed(_))
    }

    /// Caller-facing text
    pub fn into_message(self) -> String {
        match self {
            RunOutcome::Completed(reply) => reply,
            RunOutcome::Interrupted => "Agent execution interrupted by user".to_string(),
            RunOutcome::BudgetExhausted { max_iterations } => format!(
                "Reached maximum iterations ({}) without completing the task",
                max_iterations
            ),
        }
    }
}

/// One model turn: either tool calls to run, or a final reply
#[derive(Debug, Clone)]
pub struct Proposal {
    pub calls: Vec<ToolCall>,
    pub content: Option<String>,
}

impl Proposal {
    /// No calls means the model is done
    pub fn is_final(&self) -> bool {
        self.calls.is_empty()
    }

    pub fn final_reply(&self) -> String {
        self.content
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .unwrap_or(EMPTY_REPLY)
            .to_string()
    }
}

/// Model request settings
#[derive(Debug, Clone)]
pub struct RuntimeOptions {
    /// Empty means the provider's default model
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Deepest allowed sub-agent level; `None` leaves only [`crate::NESTING_LIMIT`]
    pub max_depth: Option<u32>,
    /// Replaces the built-in identity section of the system prompt
    pub system_prompt: Option<String>,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            model: String::new(),
            max_tokens: 4096,
            temperature: 0.7,
            max_depth: None,
            system_prompt: None,
        }
    }
}

impl RuntimeOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            model: config.agent.model.clone(),
            max_tokens: config.agent.max_tokens,
            temperature: config.agent.temperature,
            max_depth: config.agent.max_depth,
            system_prompt: None,
        }
    }
}

type RunFuture<'a> = Pin<Box<dyn Future<Output = Result<RunOutcome>> + Send + 'a>>;

/// Drives an [`ExecutionContext`] until the model finishes, the budget runs
/// out or the interrupt flag is raised.
///
/// The runtime holds no per-run state, so one instance can serve many
/// concurrent runs, each with its own context.
pub struct AgentRuntime<P: Provider> {
    provider: Arc<P>,
    tools: Arc<ToolRegistry>,
    options: RuntimeOptions,
    subagents: SubagentManager,
}

impl<P: Provider> AgentRuntime<P> {
    pub fn new(provider: P, tools: ToolRegistry) -> Self {
        Self::with_options(provider, tools, RuntimeOptions::default())
    }

    pub fn with_options(provider: P, tools: ToolRegistry, options: RuntimeOptions) -> Self {
        Self {
            provider: Arc::new(provider),
            tools: Arc::new(tools),
            subagents: SubagentManager::new(options.max_depth),
            options,
        }
    }

    pub fn from_config(provider: P, tools: ToolRegistry, config: &Config) -> Self {
        Self::with_options(provider, tools, RuntimeOptions::from_config(config))
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn options(&self) -> &RuntimeOptions {
        &self.options
    }

    pub fn subagents(&self) -> &SubagentManager {
        &self.subagents
    }

    /// Run and return the caller-facing message
    pub async fn run_loop(
        &self,
        initial_message: &str,
        max_iterations: u32,
        ctx: &mut ExecutionContext,
        observer: &dyn AgentObserver,
    ) -> Result<String> {
        self.run(initial_message, max_iterations, ctx, observer)
            .await
            .map(RunOutcome::into_message)
    }

    /// Run one invocation at `ctx.depth()`.
    ///
    /// Boxed because a `delegate` action re-enters this method for the child.
    pub fn run<'a>(
        &'a self,
        initial_message: &'a str,
        max_iterations: u32,
        ctx: &'a mut ExecutionContext,
        observer: &'a dyn AgentObserver,
    ) -> RunFuture<'a> {
        Box::pin(self.run_inner(initial_message, max_iterations, ctx, observer))
    }

    async fn run_inner(
        &self,
        initial_message: &str,
        max_iterations: u32,
        ctx: &mut ExecutionContext,
        observer: &dyn AgentObserver,
    ) -> Result<RunOutcome> {
        ctx.validate().await?;
        ctx.reset_iteration();

        let depth = ctx.depth();
        if ctx.history().is_empty() {
            let system_prompt = self.system_prompt(ctx).await;
            ctx.push_message(Message::system(system_prompt));
        }
        ctx.push_message(Message::user(initial_message));

        info!(
            "Agent run started at depth {} (max {} iterations)",
            depth, max_iterations
        );

        loop {
            if ctx.is_interrupted() {
                info!("Agent interrupted at depth {}", depth);
                return Ok(RunOutcome::Interrupted);
            }
            if ctx.iteration() >= max_iterations {
                warn!(
                    "Agent at depth {} reached {} iterations without finishing",
                    depth, max_iterations
                );
                return Ok(RunOutcome::BudgetExhausted { max_iterations });
            }

            let iteration = ctx.iteration();
            debug!("Agent iteration {} at depth {}", iteration, depth);
            observer.iteration_started(iteration, depth).await;
            observer.status_update("Thinking", iteration).await;

            let proposal = self.propose(ctx.history()).await?;

            if proposal.is_final() {
                let reply = proposal.final_reply();
                ctx.push_message(Message::assistant(reply.as_str()));
                if depth == 0 {
                    observer.agent_reply(&reply).await;
                }
                info!(
                    "Agent at depth {} completed after {} iteration(s)",
                    depth,
                    iteration + 1
                );
                return Ok(RunOutcome::Completed(reply));
            }

            let defs: Vec<ToolCallDef> = proposal
                .calls
                .iter()
                .map(|call| ToolCallDef::new(&call.id, &call.name, call.arguments.clone()))
                .collect();
            ctx.push_assistant_tool_calls(proposal.content.as_deref(), defs);

            observer
                .status_update(
                    &format!("Executing {} tool(s)", proposal.calls.len()),
                    iteration,
                )
                .await;

            self.execute_phase(&proposal.calls, max_iterations, ctx, observer)
                .await?;

            ctx.advance_iteration();
        }
    }

    /// Ask the model for the next step
    pub async fn propose(&self, history: &[Message]) -> Result<Proposal> {
        let model = if self.options.model.is_empty() {
            self.provider.default_model()
        } else {
            self.options.model.clone()
        };

        let params = ChatParams {
            model,
            messages: history.to_vec(),
            tools: self.definitions(),
            max_tokens: self.options.max_tokens,
            temperature: self.options.temperature,
            tool_choice: ToolChoice::Auto,
        };

        let response = self.provider.chat(params).await.map_err(|e| {
            warn!("Model request failed: {}", e);
            AgentError::ModelUnavailable(e.to_string())
        })?;

        let mut calls = response.tool_calls;
        for call in calls.iter_mut().filter(|call| call.id.is_empty()) {
            call.id = new_call_id();
        }

        Ok(Proposal {
            calls,
            content: response.content,
        })
    }

    /// Registry tools followed by the runtime's own actions
    pub fn definitions(&self) -> Vec<Tool> {
        let mut tools = self.tools.definitions();
        tools.extend(Action::builtin_definitions());
        tools
    }

    /// Run a batch of calls in order, folding each result into the history
    async fn execute_phase(
        &self,
        calls: &[ToolCall],
        max_iterations: u32,
        ctx: &mut ExecutionContext,
        observer: &dyn AgentObserver,
    ) -> Result<()> {
        let depth = ctx.depth();
        let total = calls.len();

        for (index, call) in calls.iter().enumerate() {
            debug!("Executing {} ({}/{})", call.name, index + 1, total);
            observer
                .tool_started(&call.name, &call.arguments, index, total, depth)
                .await;

            let outcome = match Action::from_tool_call(call) {
                Ok(action) => self.execute_action(&action, max_iterations, ctx, observer).await,
                Err(e) => Err(e),
            };

            let result = match outcome {
                Ok(text) => text,
                Err(e) if e.is_recoverable() => {
                    warn!("Action {} failed: {}", call.name, e);
                    format!("Error: {}", e)
                }
                Err(e) => return Err(e),
            };

            observer.tool_finished(&result, depth).await;
            ctx.push_tool_result(&call.id, &call.name, &result);
        }

        Ok(())
    }

    async fn execute_action(
        &self,
        action: &Action,
        max_iterations: u32,
        ctx: &mut ExecutionContext,
        observer: &dyn AgentObserver,
    ) -> Result<String> {
        debug!(
            "Action {} ({}) at depth {}",
            action.kind(),
            action.id(),
            ctx.depth()
        );
        match action {
            Action::Tool { kind, args, .. } => {
                self.tools
                    .dispatch(kind, args.clone(), &ctx.tool_context())
                    .await
            }
            Action::Delegate {
                description,
                prompt,
                ..
            } => {
                self.subagents
                    .run(self, description, prompt, ctx, max_iterations, observer)
                    .await
            }
            Action::ChangeDirectory { path, .. } => change_directory(ctx, path).await,
        }
    }

    async fn system_prompt(&self, ctx: &ExecutionContext) -> String {
        let mut names = self.tools.names();
        names.extend(
            Action::builtin_definitions()
                .into_iter()
                .map(|tool| tool.function.name),
        );

        PromptBuilder::new(ctx.working_dir())
            .with_tools(names)
            .with_custom_prompt(self.options.system_prompt.clone())
            .build(ctx.depth())
            .await
    }
}

/// Move the context to `path`, resolved against the current directory
async fn change_directory(ctx: &mut ExecutionContext, path: &str) -> Result<String> {
    let target = if path.starts_with('/') || path.starts_with('~') {
        tatty_config::expand_home(path)
    } else {
        ctx.working_dir().join(path)
    };

    let resolved: PathBuf = tokio::fs::canonicalize(&target)
        .await
        .map_err(|e| AgentError::ToolError(format!("cannot change directory to {}: {}", path, e)))?;
    if !resolved.is_dir() {
        return Err(AgentError::ToolError(format!("not a directory: {}", path)));
    }

    info!("Working directory changed to {:?}", resolved);
    let message = format!("Working directory changed to {}", resolved.display());
    ctx.set_working_dir(resolved);
    Ok(message)
}
