//! Mock models, tools and agents for deterministic testing.

use async_trait::async_trait;
use hk_core::agents::{Agent, StepOutcome, StepRequest};
use hk_core::backend::{ChatModel, ChatModelInput, ChatModelOutput};
use hk_core::context::{RunContext, RunOptions};
use hk_core::errors::FrameworkError;
use hk_core::tools::{Tool, ToolOutput, ToolRunner};
use hk_protocol::Message;
use serde_json::Value;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// A chat model that answers with the last message it was given.
#[allow(dead_code)]
pub struct EchoChatModel {
    pub failures: u32,
    pub calls: AtomicU32,
}

impl EchoChatModel {
    #[allow(dead_code)]
    pub fn new(failures: u32) -> Self {
        Self {
            failures,
            calls: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl ChatModel for EchoChatModel {
    fn provider_id(&self) -> &str {
        "echo"
    }

    fn model_id(&self) -> &str {
        "echo-small"
    }

    async fn create(&self, input: &ChatModelInput, _ctx: &RunContext) -> anyhow::Result<ChatModelOutput> {
        if self.calls.fetch_add(1, Ordering::SeqCst) < self.failures {
            anyhow::bail!("rate limited");
        }
        let last = input
            .messages
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default();
        Ok(ChatModelOutput {
            messages: vec![Message::assistant(last)],
            usage: None,
        })
    }
}

/// A tool that fails a fixed number of times, then echoes its input.
#[allow(dead_code)]
pub struct ScriptedTool {
    pub name: String,
    pub failures: u32,
    pub calls: AtomicU32,
}

impl ScriptedTool {
    #[allow(dead_code)]
    pub fn new(name: &str, failures: u32) -> Self {
        Self {
            name: name.to_string(),
            failures,
            calls: AtomicU32::new(0),
        }
    }

    #[allow(dead_code)]
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Tool for ScriptedTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Echoes its input"
    }

    async fn execute(&self, input: Value, _ctx: &RunContext) -> anyhow::Result<ToolOutput> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call <= self.failures {
            anyhow::bail!("attempt {call} failed");
        }
        Ok(ToolOutput::new(input))
    }
}

/// A tool that sleeps for `delay` unless its run is aborted first.
#[allow(dead_code)]
pub struct SlowTool {
    pub delay: Duration,
}

#[async_trait]
impl Tool for SlowTool {
    fn name(&self) -> &str {
        "slow"
    }

    fn description(&self) -> &str {
        "Takes its time"
    }

    async fn execute(&self, _input: Value, ctx: &RunContext) -> anyhow::Result<ToolOutput> {
        let signal = ctx.signal();
        tokio::select! {
            _ = signal.cancelled() => {
                Err(FrameworkError::abort(signal.reason()).into())
            }
            _ = tokio::time::sleep(self.delay) => Ok(ToolOutput::new("done")),
        }
    }
}

/// An agent that calls a tool in its first step and answers with the result.
#[allow(dead_code)]
pub struct ToolCallingAgent {
    pub tool: Arc<ToolRunner>,
}

#[async_trait]
impl Agent for ToolCallingAgent {
    fn name(&self) -> &str {
        "tool_caller"
    }

    async fn run_step(&self, request: &StepRequest, _ctx: &RunContext) -> anyhow::Result<StepOutcome> {
        let prompt = request
            .messages
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default();
        let output = self
            .tool
            .run(Value::String(prompt), RunOptions::default())
            .await?;
        Ok(StepOutcome::Finish(Message::assistant(output.text())))
    }
}
