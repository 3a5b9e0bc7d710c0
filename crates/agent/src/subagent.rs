//! Sub-agent recursion

use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{info, warn};

use tatty_provider::Provider;

use crate::context::ExecutionContext;
use crate::observer::AgentObserver;
use crate::runtime::AgentRuntime;
use crate::{AgentError, Result};

/// Deepest nesting a run can reach, whatever `max_depth` says.
///
/// Nested runs are polled inside their parent's future, so each level costs
/// native stack.
pub const NESTING_LIMIT: u32 = 16;

/// Runs `delegate` actions as nested agents.
///
/// A child shares the parent's working directory and interrupt flag but gets
/// its own history, pending work and iteration budget. Only the child's final
/// message crosses back into the parent. A configured `max_depth` lowers the
/// ceiling below [`NESTING_LIMIT`]; it can never raise it.
#[derive(Debug, Default)]
pub struct SubagentManager {
    max_depth: Option<u32>,
    spawned: AtomicUsize,
}

impl SubagentManager {
    pub fn new(max_depth: Option<u32>) -> Self {
        if let Some(max) = max_depth.filter(|max| *max > NESTING_LIMIT) {
            warn!(
                "max_depth {} exceeds the nesting limit, using {}",
                max, NESTING_LIMIT
            );
        }
        Self {
            max_depth,
            spawned: AtomicUsize::new(0),
        }
    }

    pub fn max_depth(&self) -> Option<u32> {
        self.max_depth
    }

    /// Depth a child may reach
    pub fn ceiling(&self) -> u32 {
        self.max_depth.map_or(NESTING_LIMIT, |max| max.min(NESTING_LIMIT))
    }

    /// Number of sub-agents started so far
    pub fn spawned_count(&self) -> usize {
        self.spawned.load(Ordering::Relaxed)
    }

    /// Fails when a child of `parent_depth` would exceed the ceiling
    pub fn check_depth(&self, parent_depth: u32) -> Result<()> {
        let ceiling = self.ceiling();
        if parent_depth + 1 > ceiling {
            return Err(AgentError::DepthLimit(ceiling));
        }
        Ok(())
    }

    /// Run `prompt` in a child of `parent` and return the child's final message
    pub async fn run<P: Provider>(
        &self,
        runtime: &AgentRuntime<P>,
        description: &str,
        prompt: &str,
        parent: &ExecutionContext,
        max_iterations: u32,
        observer: &dyn AgentObserver,
    ) -> Result<String> {
        if parent.is_interrupted() {
            info!("Sub-agent '{}' skipped: interrupted", description);
            return Ok(format!(
                "Sub-agent '{}' not started: interrupted",
                description
            ));
        }

        if let Err(e) = self.check_depth(parent.depth()) {
            warn!("Sub-agent '{}' refused at depth {}", description, parent.depth());
            return Err(e);
        }

        let mut child = parent.child();
        let depth = child.depth();
        self.spawned.fetch_add(1, Ordering::Relaxed);

        info!("Sub-agent '{}' started at depth {}", description, depth);
        observer.sub_agent_started(description, depth).await;

        let result = match runtime
            .run(prompt, max_iterations, &mut child, observer)
            .await
        {
            Ok(outcome) => Ok(outcome.into_message()),
            Err(e) => {
                warn!("Sub-agent '{}' failed: {}", description, e);
                Err(AgentError::ToolError(format!(
                    "sub-agent '{}' failed: {}",
                    description, e
                )))
            }
        };

        let summary = match &result {
            Ok(message) => message.clone(),
            Err(e) => format!("Error: {}", e),
        };
        observer.sub_agent_finished(description, &summary, depth).await;
        info!("Sub-agent '{}' finished at depth {}", description, depth);

        result
    }
}
