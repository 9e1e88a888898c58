//! The run builder returned by [`RunContext::enter`].

use super::guard::RunPermit;
use super::middleware::RunMiddleware;
use super::run_context::RunContext;
use crate::emitter::{Emitter, EmitterOptions, EventMeta, Matcher, Payload};
use crate::errors::{ErrorDomain, FrameworkError};
use futures::future::BoxFuture;
use futures::Stream;
use hk_protocol::RunStatus;
use serde::Serialize;
use serde_json::{Map, Value};
use std::future::{Future, IntoFuture};
use std::pin::Pin;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Payload of the `start` event.
#[derive(Debug, Clone, Serialize)]
pub struct RunStartEvent {
    pub input: Value,
}

/// Payload of the `success` event.
#[derive(Debug, Clone, Serialize)]
pub struct RunSuccessEvent<R> {
    pub input: Value,
    pub output: R,
}

/// Item produced by [`Run::into_stream`].
#[derive(Debug)]
pub enum RunItem<R> {
    /// An event emitted directly on the run's emitter.
    Event { data: Payload, meta: EventMeta },
    /// The final result; always the last item.
    Output(Result<R, FrameworkError>),
}

type Body<R> = Box<dyn FnOnce(RunContext) -> BoxFuture<'static, anyhow::Result<R>> + Send>;
type Setup = Box<dyn FnOnce(&RunContext) -> Result<(), FrameworkError> + Send>;

enum RunState<R> {
    Ready { context: RunContext, body: Body<R> },
    Failed(FrameworkError),
}

/// A prepared operation invocation.
///
/// Listeners registered through [`Run::observe`] or [`Run::on`] and
/// middlewares added with [`Run::middleware`] are bound in order before
/// `start` is emitted, so none of the lifecycle events can be missed. The run executes when awaited.
#[must_use = "a run does nothing unless it is awaited or streamed"]
pub struct Run<R> {
    state: RunState<R>,
    setup: Vec<Setup>,
    permit: Option<RunPermit>,
}

impl<R> Run<R>
where
    R: Serialize + Clone + Send + Sync + 'static,
{
    pub(crate) fn new(context: RunContext, body: Body<R>) -> Self {
        Self {
            state: RunState::Ready { context, body },
            setup: Vec::new(),
            permit: None,
        }
    }

    /// A run that fails with `error` as soon as it is awaited, without
    /// emitting anything.
    pub fn failed(error: FrameworkError) -> Self {
        Self {
            state: RunState::Failed(error),
            setup: Vec::new(),
            permit: None,
        }
    }

    /// Keeps `permit` until the run has emitted `finish`.
    pub fn with_permit(mut self, permit: RunPermit) -> Self {
        self.permit = Some(permit);
        self
    }

    /// The run's context, unless creating it failed.
    pub fn run_context(&self) -> Option<&RunContext> {
        match &self.state {
            RunState::Ready { context, .. } => Some(context),
            RunState::Failed(_) => None,
        }
    }

    /// Registers listeners on the run's emitter before the run starts.
    pub fn observe<F>(mut self, observer: F) -> Self
    where
        F: FnOnce(&Emitter) -> Result<(), FrameworkError> + Send + 'static,
    {
        self.setup
            .push(Box::new(move |ctx: &RunContext| observer(ctx.emitter())));
        self
    }

    /// Binds `middleware` to the run's context before the run starts.
    pub fn middleware<M>(mut self, middleware: M) -> Self
    where
        M: RunMiddleware + 'static,
    {
        self.setup
            .push(Box::new(move |ctx: &RunContext| middleware.bind(ctx)));
        self
    }

    /// Shorthand for an [`observe`](Run::observe) step registering one listener.
    pub fn on<M, F, Fut>(self, matcher: M, callback: F, options: EmitterOptions) -> Self
    where
        M: Into<Matcher> + Send + 'static,
        F: Fn(Payload, EventMeta) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.observe(move |emitter| {
            emitter.on_match(matcher, callback, options)?;
            Ok(())
        })
    }

    /// Adds correlation data to every event of this run and its nested runs.
    pub fn context(self, context: Map<String, Value>) -> Self {
        self.observe(move |emitter| {
            emitter.extend_context(context);
            Ok(())
        })
    }

    /// Streams every event emitted directly on the run's emitter, followed by
    /// the final result.
    pub fn into_stream(self) -> Pin<Box<dyn Stream<Item = RunItem<R>> + Send>> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let run = self.on(
            Matcher::Any,
            move |data: Payload, meta: EventMeta| {
                let sent = tx.send((data, meta)).is_ok();
                async move {
                    if !sent {
                        debug!("Run stream receiver dropped");
                    }
                    Ok(())
                }
            },
            EmitterOptions::default(),
        );

        Box::pin(async_stream::stream! {
            let handle = tokio::spawn(run.execute());
            while let Some((data, meta)) = rx.recv().await {
                yield RunItem::Event { data, meta };
            }
            let output = match handle.await {
                Ok(output) => output,
                Err(error) => Err(FrameworkError::operation(
                    ErrorDomain::Framework,
                    format!("Run task failed: {error}"),
                )),
            };
            yield RunItem::Output(output);
        })
    }

    async fn execute(self) -> Result<R, FrameworkError> {
        let Run {
            state,
            setup,
            permit,
        } = self;
        let _permit = permit;
        let (context, body) = match state {
            RunState::Ready { context, body } => (context, body),
            RunState::Failed(error) => return Err(error),
        };

        for step in setup {
            if let Err(error) = step(&context) {
                context.destroy();
                return Err(error);
            }
        }
        lifecycle(context, body).await
    }
}

impl<R> IntoFuture for Run<R>
where
    R: Serialize + Clone + Send + Sync + 'static,
{
    type Output = Result<R, FrameworkError>;
    type IntoFuture = BoxFuture<'static, Result<R, FrameworkError>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.execute())
    }
}

/// Drives one run through `Created -> Running -> Succeeded | Failed -> Finished`.
async fn lifecycle<R>(context: RunContext, body: Body<R>) -> Result<R, FrameworkError>
where
    R: Serialize + Clone + Send + Sync + 'static,
{
    let emitter = context.emitter().clone();
    let signal = context.signal();
    let input = context.params().clone();

    let outcome: Result<R, FrameworkError> = async {
        context.set_status(RunStatus::Running);
        debug!(run_id = %context.run_id(), emitter = %emitter.path(), "Run started");
        emitter
            .emit(
                "start",
                RunStartEvent {
                    input: input.clone(),
                },
            )
            .await?;

        let output = tokio::select! {
            biased;
            _ = signal.cancelled() => Err(FrameworkError::abort(signal.reason())),
            result = context.scope(body(context.clone())) => {
                result.map_err(|error| FrameworkError::ensure(context.domain(), error))
            }
        }?;

        context.set_status(RunStatus::Succeeded);
        emitter
            .emit(
                "success",
                RunSuccessEvent {
                    input: input.clone(),
                    output: output.clone(),
                },
            )
            .await?;
        Ok(output)
    }
    .await;

    let outcome = match outcome {
        Ok(output) => Ok(output),
        Err(error) => {
            context.set_status(RunStatus::Failed);
            debug!(run_id = %context.run_id(), error = %error, "Run failed");
            let report = serde_json::to_value(error.report()).unwrap_or_default();
            let payload = Payload::new(error.clone()).with_json(report);
            if let Err(emit_error) = emitter.emit_payload("error", payload).await {
                warn!(
                    run_id = %context.run_id(),
                    error = %emit_error,
                    "Failed to deliver the error event"
                );
            }
            Err(error)
        }
    };

    let finished = emitter.emit_payload("finish", Payload::empty()).await;
    context.set_status(RunStatus::Finished);
    context.destroy();
    debug!(run_id = %context.run_id(), "Run finished");

    match finished {
        Err(error) if outcome.is_ok() => Err(error),
        Err(error) => {
            warn!(
                run_id = %context.run_id(),
                error = %error,
                "Failed to deliver the finish event"
            );
            outcome
        }
        Ok(()) => outcome,
    }
}
