//! Progress notifications

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info};

/// Receives progress events from a running agent.
///
/// Every method has a no-op default, so an observer only implements the
/// events it cares about. Hooks are awaited inline by the runtime and never
/// influence control flow.
#[async_trait]
pub trait AgentObserver: Send + Sync {
    /// A new proposing cycle is about to start
    async fn iteration_started(&self, _iteration: u32, _depth: u32) {}

    /// `index` is zero-based within the current batch of `total` actions
    async fn tool_started(
        &self,
        _name: &str,
        _params: &Value,
        _index: usize,
        _total: usize,
        _depth: u32,
    ) {
    }

    async fn tool_finished(&self, _result: &str, _depth: u32) {}

    /// Final reply of a top-level run
    async fn agent_reply(&self, _reply: &str) {}

    async fn status_update(&self, _status: &str, _iteration: u32) {}

    async fn sub_agent_started(&self, _description: &str, _depth: u32) {}

    async fn sub_agent_finished(&self, _description: &str, _result: &str, _depth: u32) {}
}

/// Observer that ignores everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

#[async_trait]
impl AgentObserver for NoopObserver {}

/// Observer that turns events into log lines
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

#[async_trait]
impl AgentObserver for TracingObserver {
    async fn iteration_started(&self, iteration: u32, depth: u32) {
        debug!(iteration, depth, "iteration started");
    }

    async fn tool_started(
        &self,
        name: &str,
        params: &Value,
        index: usize,
        total: usize,
        depth: u32,
    ) {
        debug!(tool = name, %params, index, total, depth, "tool started");
    }

    async fn tool_finished(&self, result: &str, depth: u32) {
        debug!(depth, bytes = result.len(), "tool finished");
    }

    async fn agent_reply(&self, reply: &str) {
        info!(bytes = reply.len(), "agent replied");
    }

    async fn status_update(&self, status: &str, iteration: u32) {
        debug!(iteration, "{}", status);
    }

    async fn sub_agent_started(&self, description: &str, depth: u32) {
        info!(depth, "sub-agent started: {}", description);
    }

    async fn sub_agent_finished(&self, description: &str, result: &str, depth: u32) {
        info!(depth, bytes = result.len(), "sub-agent finished: {}", description);
    }
}
