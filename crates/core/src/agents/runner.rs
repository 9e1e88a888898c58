//! Drives an [`Agent`] through its step loop inside a run context.
//!
//! The runner is responsible for:
//! - Rejecting a second run while one is in flight
//! - Bounding the number of iterations
//! - Retrying failed steps, within a per-step and a per-run budget
//! - Emitting an `update` event after every step

use crate::agents::base::{
    Agent, AgentError, AgentInput, AgentOutput, AgentUpdateEvent, StepOutcome, StepRequest,
};
use crate::config::{AgentSettings, HivekitConfig};
use crate::context::{Run, RunContext, RunGuard, RunInstance, RunOptions};
use crate::emitter::{ChildOptions, Creator, Emitter};
use crate::errors::{ErrorDomain, FrameworkError};
use crate::retry::{p_retry, RetryCounter, RetryOptions};
use hk_protocol::Message;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Runs one agent. Each runner owns the emitter `agent.<name>`.
pub struct AgentRunner {
    agent: Arc<dyn Agent>,
    emitter: Emitter,
    guard: RunGuard,
    settings: AgentSettings,
    backoff: RetryOptions,
}

impl RunInstance for AgentRunner {
    fn emitter(&self) -> &Emitter {
        &self.emitter
    }

    fn error_domain(&self) -> ErrorDomain {
        ErrorDomain::Agent
    }
}

impl AgentRunner {
    /// Creates a runner under the process-wide root emitter.
    ///
    /// # Errors
    ///
    /// Fails if the agent name is not a valid namespace segment.
    pub fn new(agent: Arc<dyn Agent>) -> Result<Self, FrameworkError> {
        Self::with_emitter(agent, &Emitter::root())
    }

    /// Creates a runner whose emitter is a child of `parent`.
    pub fn with_emitter(agent: Arc<dyn Agent>, parent: &Emitter) -> Result<Self, FrameworkError> {
        let emitter = parent.child(
            ChildOptions::namespace(["agent", agent.name()]).with_creator(Creator::new("agent")),
        )?;
        Ok(Self {
            agent,
            emitter,
            guard: RunGuard::new(),
            settings: AgentSettings::default(),
            backoff: RetryOptions::default(),
        })
    }

    /// Applies the `[agent]` limits and the `[retry]` backoff of `config`.
    pub fn with_config(mut self, config: &HivekitConfig) -> Self {
        self.settings = config.agent.clone();
        self.backoff = config.retry.to_options();
        self
    }

    pub fn with_settings(mut self, settings: AgentSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Backoff unit between retried steps.
    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.backoff.base_delay = base_delay;
        self
    }

    pub fn agent(&self) -> &Arc<dyn Agent> {
        &self.agent
    }

    pub fn settings(&self) -> &AgentSettings {
        &self.settings
    }

    pub fn is_running(&self) -> bool {
        self.guard.is_running()
    }

    /// Prepares a run. Await the returned [`Run`] to execute it.
    ///
    /// A second call while a run is still in flight yields a run that fails
    /// with an "Agent is already running!" error.
    pub fn run(&self, input: AgentInput, options: RunOptions) -> Run<AgentOutput> {
        let permit = match self.guard.acquire(ErrorDomain::Agent) {
            Ok(permit) => permit,
            Err(error) => return Run::failed(error),
        };

        let step_loop = StepLoop {
            agent: self.agent.clone(),
            settings: self.settings.clone(),
            backoff: self.backoff.clone(),
        };
        let params = input.clone();
        RunContext::enter(self, params, options, move |ctx| step_loop.run(input, ctx))
            .with_permit(permit)
    }
}

struct StepLoop {
    agent: Arc<dyn Agent>,
    settings: AgentSettings,
    backoff: RetryOptions,
}

impl StepLoop {
    async fn run(self, input: AgentInput, ctx: RunContext) -> anyhow::Result<AgentOutput> {
        let name = self.agent.name().to_string();
        if !self.agent.check_availability().await {
            return Err(AgentError::NotAvailable(name).into());
        }

        let counter = Arc::new(Mutex::new(RetryCounter::new(
            self.settings.total_max_retries,
            ErrorDomain::Agent,
        )));
        let mut messages = input.history;
        messages.push(Message::user(input.prompt));

        for iteration in 1..=self.settings.max_iterations {
            ctx.signal().throw_if_aborted()?;

            let outcome = self.step(iteration, &messages, &ctx, &counter).await?;
            let message = outcome.message().clone();
            debug!(agent = %name, iteration, is_final = outcome.is_final(), "Agent step completed");
            ctx.emitter()
                .emit(
                    "update",
                    AgentUpdateEvent {
                        iteration,
                        message: message.clone(),
                        is_final: outcome.is_final(),
                    },
                )
                .await?;

            messages.push(message.clone());
            if let StepOutcome::Finish(_) = outcome {
                return Ok(AgentOutput {
                    result: message,
                    messages,
                    iterations: iteration,
                });
            }
        }

        Err(FrameworkError::operation(
            ErrorDomain::Agent,
            format!(
                "Agent was not able to resolve the task in {} iterations.",
                self.settings.max_iterations
            ),
        )
        .with_fatal(true)
        .with_retryable(false)
        .into())
    }

    async fn step(
        &self,
        iteration: u32,
        messages: &[Message],
        ctx: &RunContext,
        counter: &Arc<Mutex<RetryCounter>>,
    ) -> Result<StepOutcome, FrameworkError> {
        let budget = counter.clone();
        let options = RetryOptions {
            retries: self.settings.max_retries_per_step,
            signal: Some(ctx.signal()),
            ..self.backoff.clone()
        }
        .should_retry(|error, _| error.is_retryable())
        .on_failed_attempt(move |error, attempt| {
            warn!(
                iteration,
                attempt = attempt.attempt,
                error = %error,
                "Agent step failed"
            );
            let consumed = budget.lock().consume(Some(error));
            async move { consumed }
        });

        p_retry(
            |attempt| {
                let agent = self.agent.clone();
                let ctx = ctx.clone();
                let request = StepRequest {
                    iteration,
                    attempt,
                    messages: messages.to_vec(),
                };
                async move {
                    agent
                        .run_step(&request, &ctx)
                        .await
                        .map_err(|error| FrameworkError::ensure(ErrorDomain::Agent, error))
                }
            },
            options,
        )
        .await
    }
}
