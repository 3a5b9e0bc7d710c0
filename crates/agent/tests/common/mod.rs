//! Shared fixtures for agent integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use tatty_agent::tools::{ToolContext, ToolResult, ToolTrait};
use tatty_agent::AgentObserver;
use tatty_provider::{ChatParams, ChatResponse, Provider, ProviderError, ToolCall};

/// Provider that replays a fixed script and records every request
#[derive(Clone, Default)]
pub struct ScriptedProvider {
    script: Arc<Mutex<VecDeque<Result<ChatResponse, ProviderError>>>>,
    fallback: Option<ChatResponse>,
    requests: Arc<Mutex<Vec<ChatParams>>>,
}

impl ScriptedProvider {
    pub fn new(responses: Vec<ChatResponse>) -> Self {
        Self::with_results(responses.into_iter().map(Ok).collect())
    }

    pub fn with_results(results: Vec<Result<ChatResponse, ProviderError>>) -> Self {
        Self {
            script: Arc::new(Mutex::new(results.into_iter().collect())),
            fallback: None,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Returns `response` forever
    pub fn repeating(response: ChatResponse) -> Self {
        Self {
            fallback: Some(response),
            ..Self::default()
        }
    }

    pub fn requests(&self) -> Vec<ChatParams> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    async fn chat(&self, params: ChatParams) -> Result<ChatResponse, ProviderError> {
        self.requests.lock().unwrap().push(params);
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(result) => result,
            None => self
                .fallback
                .clone()
                .ok_or_else(|| ProviderError::Api("script exhausted".to_string())),
        }
    }

    fn default_model(&self) -> String {
        "scripted-model".to_string()
    }

    fn is_configured(&self) -> bool {
        true
    }
}

pub fn call(id: &str, name: &str, arguments: Value) -> ToolCall {
    ToolCall {
        id: id.to_string(),
        name: name.to_string(),
        arguments,
    }
}

pub fn calls(tool_calls: Vec<ToolCall>) -> ChatResponse {
    ChatResponse::with_tool_calls(tool_calls)
}

pub fn delegate(id: &str, description: &str, prompt: &str) -> ToolCall {
    call(
        id,
        "delegate",
        json!({ "description": description, "prompt": prompt }),
    )
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Iteration { iteration: u32, depth: u32 },
    ToolStarted { name: String, index: usize, total: usize, depth: u32 },
    ToolFinished { result: String, depth: u32 },
    Reply(String),
    Status(String),
    SubAgentStarted { description: String, depth: u32 },
    SubAgentFinished { description: String, result: String, depth: u32 },
}

/// Observer that keeps every event in order
#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<Event>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn iterations(&self) -> Vec<(u32, u32)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Iteration { iteration, depth } => Some((iteration, depth)),
                _ => None,
            })
            .collect()
    }

    pub fn replies(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Reply(reply) => Some(reply),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}

#[async_trait]
impl AgentObserver for RecordingObserver {
    async fn iteration_started(&self, iteration: u32, depth: u32) {
        self.push(Event::Iteration { iteration, depth });
    }

    async fn tool_started(
        &self,
        name: &str,
        _params: &Value,
        index: usize,
        total: usize,
        depth: u32,
    ) {
        self.push(Event::ToolStarted {
            name: name.to_string(),
            index,
            total,
            depth,
        });
    }

    async fn tool_finished(&self, result: &str, depth: u32) {
        self.push(Event::ToolFinished {
            result: result.to_string(),
            depth,
        });
    }

    async fn agent_reply(&self, reply: &str) {
        self.push(Event::Reply(reply.to_string()));
    }

    async fn status_update(&self, status: &str, _iteration: u32) {
        self.push(Event::Status(status.to_string()));
    }

    async fn sub_agent_started(&self, description: &str, depth: u32) {
        self.push(Event::SubAgentStarted {
            description: description.to_string(),
            depth,
        });
    }

    async fn sub_agent_finished(&self, description: &str, result: &str, depth: u32) {
        self.push(Event::SubAgentFinished {
            description: description.to_string(),
            result: result.to_string(),
            depth,
        });
    }
}

/// Returns its argument: a bare string, or the `text` field
pub struct EchoTool;

#[async_trait]
impl ToolTrait for EchoTool {
    fn name(&self) -> &str {
        "Echo"
    }
    fn description(&self) -> &str {
        "Echo the input"
    }
    fn parameters(&self) -> Value {
        json!({ "type": "object", "properties": { "text": { "type": "string" } } })
    }
    async fn execute(&self, args: Value, _ctx: &ToolContext) -> ToolResult {
        match args {
            Value::String(text) => Ok(text),
            other => Ok(other["text"].as_str().unwrap_or_default().to_string()),
        }
    }
}

/// Always fails
pub struct FailingTool;

#[async_trait]
impl ToolTrait for FailingTool {
    fn name(&self) -> &str {
        "Fail"
    }
    fn description(&self) -> &str {
        "Always fails"
    }
    fn parameters(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }
    async fn execute(&self, _args: Value, _ctx: &ToolContext) -> ToolResult {
        Err("boom".into())
    }
}

/// Raises the shared interrupt flag, like a user pressing Ctrl-C mid-run
pub struct InterruptTool;

#[async_trait]
impl ToolTrait for InterruptTool {
    fn name(&self) -> &str {
        "Interrupt"
    }
    fn description(&self) -> &str {
        "Request an interrupt"
    }
    fn parameters(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }
    async fn execute(&self, _args: Value, ctx: &ToolContext) -> ToolResult {
        ctx.interrupt.request();
        Ok("interrupt requested".to_string())
    }
}

/// Reports what the handler sees of its context
pub struct ProbeTool;

#[async_trait]
impl ToolTrait for ProbeTool {
    fn name(&self) -> &str {
        "Probe"
    }
    fn description(&self) -> &str {
        "Report depth and working directory"
    }
    fn parameters(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }
    async fn execute(&self, _args: Value, ctx: &ToolContext) -> ToolResult {
        Ok(format!(
            "depth={} dir={}",
            ctx.depth,
            ctx.working_dir.display()
        ))
    }
}

pub fn test_registry() -> tatty_agent::ToolRegistry {
    let mut registry = tatty_agent::ToolRegistry::new();
    registry.register(EchoTool);
    registry.register(FailingTool);
    registry.register(InterruptTool);
    registry.register(ProbeTool);
    registry
}
