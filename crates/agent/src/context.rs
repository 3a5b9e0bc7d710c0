//! Execution context for one agent invocation

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

use tatty_provider::{Message, ToolCallDef};

use crate::tools::ToolContext;
use crate::{AgentError, Result};

/// Shared cancellation flag.
///
/// Cloning shares the flag. It is the only piece of state that crosses task
/// and thread boundaries: a UI or signal handler calls [`request`](Self::request)
/// while the runtime polls [`is_requested`](Self::is_requested).
#[derive(Clone, Default)]
pub struct InterruptFlag(Arc<AtomicBool>);

impl InterruptFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Whether both handles point at the same flag
    pub fn shares_with(&self, other: &InterruptFlag) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for InterruptFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("InterruptFlag")
            .field(&self.is_requested())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TodoStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

impl TodoStatus {
    fn marker(&self) -> &'static str {
        match self {
            TodoStatus::Pending => "[ ]",
            TodoStatus::InProgress => "[~]",
            TodoStatus::Completed => "[x]",
        }
    }
}

/// One pending-work entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoItem {
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub status: TodoStatus,
}

impl TodoItem {
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            status: TodoStatus::Pending,
        }
    }
}

/// Pending work list, shared between a context and the tool handlers it calls
#[derive(Debug, Clone, Default)]
pub struct TodoList(Arc<Mutex<Vec<TodoItem>>>);

impl TodoList {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshot(&self) -> Vec<TodoItem> {
        self.0.lock().await.clone()
    }

    pub async fn replace(&self, items: Vec<TodoItem>) {
        *self.0.lock().await = items;
    }

    pub async fn push(&self, item: TodoItem) {
        self.0.lock().await.push(item);
    }

    pub async fn len(&self) -> usize {
        self.0.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.0.lock().await.is_empty()
    }

    /// Checklist rendering used in tool results and prompts
    pub async fn render(&self) -> String {
        let items = self.0.lock().await;
        items
            .iter()
            .map(|item| format!("{} {}: {}", item.status.marker(), item.id, item.content))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Mutable state for one agent invocation.
///
/// Created by the caller, borrowed mutably by the runtime for the duration of
/// a run, and dropped by the caller afterwards.
#[derive(Debug)]
pub struct ExecutionContext {
    working_dir: PathBuf,
    history: Vec<Message>,
    pending_work: TodoList,
    interrupt: InterruptFlag,
    iteration: u32,
    depth: u32,
}

impl ExecutionContext {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
            history: Vec::new(),
            pending_work: TodoList::new(),
            interrupt: InterruptFlag::new(),
            iteration: 0,
            depth: 0,
        }
    }

    /// Use an externally owned interrupt flag (e.g. one wired to Ctrl-C)
    pub fn with_interrupt(mut self, interrupt: InterruptFlag) -> Self {
        self.interrupt = interrupt;
        self
    }

    /// Context for a nested sub-agent.
    ///
    /// Shares the working directory and the interrupt flag; starts with an
    /// empty history, its own pending work, one level deeper and at iteration 0.
    pub fn child(&self) -> Self {
        Self {
            working_dir: self.working_dir.clone(),
            history: Vec::new(),
            pending_work: TodoList::new(),
            interrupt: self.interrupt.clone(),
            iteration: 0,
            depth: self.depth + 1,
        }
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    pub(crate) fn set_working_dir(&mut self, dir: PathBuf) {
        self.working_dir = dir;
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    pub fn push_message(&mut self, message: Message) {
        self.history.push(message);
    }

    pub(crate) fn push_assistant_tool_calls(
        &mut self,
        content: Option<&str>,
        tool_calls: Vec<ToolCallDef>,
    ) {
        let mut msg = Message::assistant(content.unwrap_or(""));
        msg.tool_calls = Some(tool_calls);
        self.history.push(msg);
    }

    pub(crate) fn push_tool_result(&mut self, call_id: &str, name: &str, result: &str) {
        self.history.push(Message::tool(call_id, name, result));
    }

    pub fn pending_work(&self) -> &TodoList {
        &self.pending_work
    }

    pub fn interrupt(&self) -> &InterruptFlag {
        &self.interrupt
    }

    pub fn request_interrupt(&self) {
        self.interrupt.request();
    }

    pub fn is_interrupted(&self) -> bool {
        self.interrupt.is_requested()
    }

    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub(crate) fn advance_iteration(&mut self) {
        self.iteration += 1;
    }

    pub(crate) fn reset_iteration(&mut self) {
        self.iteration = 0;
    }

    /// The working directory must exist and be a directory
    pub async fn validate(&self) -> Result<()> {
        match tokio::fs::metadata(&self.working_dir).await {
            Ok(meta) if meta.is_dir() => Ok(()),
            Ok(_) => Err(AgentError::InvalidContext(format!(
                "working directory is not a directory: {}",
                self.working_dir.display()
            ))),
            Err(e) => Err(AgentError::InvalidContext(format!(
                "working directory {}: {}",
                self.working_dir.display(),
                e
            ))),
        }
    }

    /// Per-dispatch view handed to tool handlers
    pub fn tool_context(&self) -> ToolContext {
        ToolContext {
            working_dir: self.working_dir.clone(),
            pending_work: self.pending_work.clone(),
            interrupt: self.interrupt.clone(),
            depth: self.depth,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_context_defaults() {
        let ctx = ExecutionContext::new("/tmp/test");

        assert_eq!(ctx.working_dir(), Path::new("/tmp/test"));
        assert!(ctx.history().is_empty());
        assert!(!ctx.is_interrupted());
        assert_eq!(ctx.iteration(), 0);
        assert_eq!(ctx.depth(), 0);
    }

    #[tokio::test]
    async fn test_new_context_has_empty_pending_work() {
        let ctx = ExecutionContext::new(".");
        assert!(ctx.pending_work().is_empty().await);
    }

    #[test]
    fn test_child_shares_flag_and_directory() {
        let mut parent = ExecutionContext::new("/work");
        parent.push_message(Message::user("hello"));
        parent.advance_iteration();
        parent.advance_iteration();

        let child = parent.child();

        assert_eq!(child.depth(), 1);
        assert_eq!(child.iteration(), 0);
        assert!(child.history().is_empty());
        assert_eq!(child.working_dir(), parent.working_dir());
        assert!(child.interrupt().shares_with(parent.interrupt()));

        parent.request_interrupt();
        assert!(child.is_interrupted());
    }

    #[tokio::test]
    async fn test_child_has_separate_pending_work() {
        let parent = ExecutionContext::new("/work");
        let child = parent.child();

        child.pending_work().push(TodoItem::new("1", "child task")).await;

        assert_eq!(child.pending_work().len().await, 1);
        assert!(parent.pending_work().is_empty().await);
    }

    #[test]
    fn test_grandchild_depth() {
        let root = ExecutionContext::new(".");
        assert_eq!(root.child().child().depth(), 2);
    }

    #[test]
    fn test_with_interrupt_uses_given_flag() {
        let flag = InterruptFlag::new();
        let ctx = ExecutionContext::new(".").with_interrupt(flag.clone());

        flag.request();
        assert!(ctx.is_interrupted());

        flag.clear();
        assert!(!ctx.is_interrupted());
    }

    #[test]
    fn test_interrupt_visible_across_threads() {
        let flag = InterruptFlag::new();
        let remote = flag.clone();

        std::thread::spawn(move || remote.request())
            .join()
            .unwrap();

        assert!(flag.is_requested());
    }

    #[test]
    fn test_folding_helpers_append_in_order() {
        let mut ctx = ExecutionContext::new(".");
        ctx.push_message(Message::user("go"));
        ctx.push_assistant_tool_calls(
            None,
            vec![ToolCallDef::new("c1", "Echo", serde_json::json!("hi"))],
        );
        ctx.push_tool_result("c1", "Echo", "hi");

        let roles: Vec<&str> = ctx.history().iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, vec!["user", "assistant", "tool"]);
        assert_eq!(ctx.history()[2].text(), "hi");
    }

    #[tokio::test]
    async fn test_validate_rejects_missing_directory() {
        let ctx = ExecutionContext::new("/definitely/not/a/real/dir");
        assert!(matches!(
            ctx.validate().await,
            Err(AgentError::InvalidContext(_))
        ));
    }

    #[tokio::test]
    async fn test_validate_rejects_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("plain.txt");
        std::fs::write(&file, "x").unwrap();

        assert!(ExecutionContext::new(dir.path()).validate().await.is_ok());
        assert!(ExecutionContext::new(&file).validate().await.is_err());
    }

    #[tokio::test]
    async fn test_todo_render() {
        let todos = TodoList::new();
        todos
            .replace(vec![
                TodoItem::new("1", "read code"),
                TodoItem {
                    id: "2".to_string(),
                    content: "write tests".to_string(),
                    status: TodoStatus::Completed,
                },
            ])
            .await;

        assert_eq!(todos.render().await, "[ ] 1: read code\n[x] 2: write tests");
    }
}
