//! Executes a [`Tool`] inside a run context, with retries.

use crate::context::{Run, RunContext, RunInstance, RunOptions};
use crate::emitter::{ChildOptions, Creator, Emitter};
use crate::errors::{ErrorDomain, FrameworkError};
use crate::retry::{p_retry, RetryOptions};
use crate::tools::base::{Tool, ToolOutput};
use futures::future::BoxFuture;
use hk_protocol::ErrorReport;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Payload of the `retry` event, emitted before a failed call is re-attempted.
#[derive(Debug, Clone, Serialize)]
pub struct ToolRetryEvent {
    pub input: Value,
    /// The attempt that just failed, 1-based.
    pub attempt: u32,
    pub remaining: u32,
    pub error: ErrorReport,
}

/// Runs one tool under the emitter `tool.<name>`.
pub struct ToolRunner {
    tool: Arc<dyn Tool>,
    emitter: Emitter,
    retry: RetryOptions,
}

impl RunInstance for ToolRunner {
    fn emitter(&self) -> &Emitter {
        &self.emitter
    }

    fn error_domain(&self) -> ErrorDomain {
        ErrorDomain::Tool
    }
}

impl ToolRunner {
    pub fn new(tool: Arc<dyn Tool>) -> Result<Self, FrameworkError> {
        Self::with_emitter(tool, &Emitter::root())
    }

    pub fn with_emitter(tool: Arc<dyn Tool>, parent: &Emitter) -> Result<Self, FrameworkError> {
        let emitter = parent.child(
            ChildOptions::namespace(["tool", tool.name()]).with_creator(Creator::new("tool")),
        )?;
        Ok(Self {
            tool,
            emitter,
            retry: RetryOptions::default(),
        })
    }

    /// Retry policy for failed calls. Non-retryable errors are never retried.
    pub fn with_retry(mut self, retry: RetryOptions) -> Self {
        self.retry = retry;
        self
    }

    pub fn tool(&self) -> &Arc<dyn Tool> {
        &self.tool
    }

    pub fn run(&self, input: Value, options: RunOptions) -> Run<ToolOutput> {
        let tool = self.tool.clone();
        let retry = self.retry.clone();
        RunContext::enter(self, input.clone(), options, move |ctx| async move {
            let emitter = ctx.emitter().clone();
            let retry_input = input.clone();
            let options = retry
                .with_signal(ctx.signal())
                .should_retry(|error, _| error.is_retryable())
                .on_failed_attempt(move |error, attempt| -> BoxFuture<'static, Result<(), FrameworkError>> {
                    if attempt.remaining == 0 || !error.is_retryable() {
                        return Box::pin(async { Ok(()) });
                    }
                    let emitter = emitter.clone();
                    let event = ToolRetryEvent {
                        input: retry_input.clone(),
                        attempt: attempt.attempt,
                        remaining: attempt.remaining,
                        error: error.report(),
                    };
                    Box::pin(async move { emitter.emit("retry", event).await })
                });

            debug!(tool = tool.name(), "Executing tool");
            let output = p_retry(
                |_| {
                    let tool = tool.clone();
                    let ctx = ctx.clone();
                    let input = input.clone();
                    async move {
                        tool.execute(input, &ctx)
                            .await
                            .map_err(|error| FrameworkError::ensure(ErrorDomain::Tool, error))
                    }
                },
                options,
            )
            .await?;
            Ok(output)
        })
    }
}
