//! Mock agent implementation for testing.

use crate::agents::base::{Agent, AgentError, StepOutcome, StepRequest};
use crate::context::RunContext;
use async_trait::async_trait;
use hk_protocol::Message;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Replays a fixed script, one entry per `run_step` call.
///
/// Retried attempts consume entries too. Once the script is exhausted the
/// last entry repeats.
#[derive(Clone)]
pub struct MockAgent {
    name: String,
    available: bool,
    steps: Vec<Result<StepOutcome, AgentError>>,
    calls: Arc<AtomicUsize>,
}

impl MockAgent {
    pub fn new(name: impl Into<String>, steps: Vec<Result<StepOutcome, AgentError>>) -> Self {
        Self {
            name: name.into(),
            available: true,
            steps,
            calls: Arc::default(),
        }
    }

    pub fn success() -> Self {
        Self::new(
            "mock",
            vec![
                Ok(StepOutcome::Continue(Message::assistant("Mock agent thinking"))),
                Ok(StepOutcome::Finish(Message::assistant("Mock response"))),
            ],
        )
    }

    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new("mock", vec![])
        }
    }

    pub fn failing() -> Self {
        Self::new(
            "mock",
            vec![Err(AgentError::ExecutionError("Mock failure".to_string()))],
        )
    }

    /// Fails `failures` times, then answers.
    pub fn flaky(failures: usize) -> Self {
        let mut steps: Vec<_> = (0..failures)
            .map(|n| Err(AgentError::ExecutionError(format!("Mock failure {}", n + 1))))
            .collect();
        steps.push(Ok(StepOutcome::Finish(Message::assistant("Recovered"))));
        Self::new("mock", steps)
    }

    /// Never finishes.
    pub fn endless() -> Self {
        Self::new(
            "mock",
            vec![Ok(StepOutcome::Continue(Message::assistant("Still thinking")))],
        )
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Number of `run_step` calls so far, across clones.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Agent for MockAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn check_availability(&self) -> bool {
        self.available
    }

    async fn run_step(&self, _request: &StepRequest, _ctx: &RunContext) -> anyhow::Result<StepOutcome> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let step = self
            .steps
            .get(call)
            .or_else(|| self.steps.last())
            .cloned()
            .ok_or_else(|| AgentError::ExecutionError("Mock agent has no steps".to_string()))?;
        Ok(step?)
    }
}
