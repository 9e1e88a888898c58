//! Base Agent trait and supporting types.

use crate::context::RunContext;
use async_trait::async_trait;
use hk_protocol::Message;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Input of one agent run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentInput {
    /// The user instruction (prompt).
    pub prompt: String,

    /// Conversation preceding the prompt.
    #[serde(default)]
    pub history: Vec<Message>,
}

impl AgentInput {
    /// Create a new AgentInput with the given prompt and no history.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            history: Vec::new(),
        }
    }

    /// Prepend prior messages.
    pub fn with_history(mut self, history: Vec<Message>) -> Self {
        self.history = history;
        self
    }
}

/// What the runner hands to [`Agent::run_step`].
#[derive(Debug, Clone)]
pub struct StepRequest {
    /// 1-based iteration of the step loop.
    pub iteration: u32,

    /// 1-based attempt of this iteration; greater than 1 after a failure.
    pub attempt: u32,

    /// Every message so far, starting with the history and the prompt.
    pub messages: Vec<Message>,
}

/// Result of a single step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// An intermediate message; the loop goes on.
    Continue(Message),
    /// The final answer.
    Finish(Message),
}

impl StepOutcome {
    pub fn message(&self) -> &Message {
        match self {
            StepOutcome::Continue(message) | StepOutcome::Finish(message) => message,
        }
    }

    pub fn is_final(&self) -> bool {
        matches!(self, StepOutcome::Finish(_))
    }
}

/// Payload of the `update` event emitted after every step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentUpdateEvent {
    pub iteration: u32,
    pub message: Message,
    pub is_final: bool,
}

/// Output of a successful agent run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentOutput {
    /// The message of the finishing step.
    pub result: Message,

    /// The full conversation, final answer included.
    pub messages: Vec<Message>,

    /// Number of iterations it took.
    pub iterations: u32,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AgentError {
    #[error("Agent not available: {0}")]
    NotAvailable(String),
    #[error("Execution failed: {0}")]
    ExecutionError(String),
}

/// A step-wise agent.
///
/// Implementations only decide what one step produces. Iteration limits,
/// retries, events and cancellation are handled by
/// [`AgentRunner`](crate::agents::AgentRunner).
#[async_trait]
pub trait Agent: Send + Sync {
    /// Used as the emitter namespace segment, so it must be a valid event name.
    fn name(&self) -> &str;

    async fn check_availability(&self) -> bool {
        true
    }

    async fn run_step(&self, request: &StepRequest, ctx: &RunContext) -> anyhow::Result<StepOutcome>;
}
