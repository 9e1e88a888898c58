//! Run contexts.
//!
//! A [`RunContext`] wraps one invocation of an operation (agent run, model
//! call, tool call). It owns a child emitter of the operation owner, an abort
//! signal composed from the caller's signal, an optional timeout and the
//! enclosing run's signal, and the correlation identifiers linking the run to
//! its parent.

use super::run::Run;
use super::signal::{AbortController, AbortSignal};
use crate::emitter::{ChildOptions, Emitter};
use crate::errors::{ErrorDomain, FrameworkError};
use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use hk_protocol::{EventTrace, RunStatus};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

tokio::task_local! {
    static CURRENT_RUN: RunContext;
}

/// Implemented by every object whose operations run inside a [`RunContext`].
pub trait RunInstance {
    /// The owner's own emitter. Run emitters are forked from it.
    fn emitter(&self) -> &Emitter;

    /// Domain used to wrap unrecognized failures of the owner's operations.
    fn error_domain(&self) -> ErrorDomain {
        ErrorDomain::Framework
    }
}

/// Per-invocation options accepted by every public entry point.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// External cancellation input.
    pub signal: Option<AbortSignal>,
    /// Internal timeout, counted from the moment the run is created.
    pub timeout: Option<Duration>,
    /// Explicit parent run. Defaults to the run of the current task.
    pub parent: Option<RunContext>,
}

impl RunOptions {
    pub fn with_signal(mut self, signal: AbortSignal) -> Self {
        self.signal = Some(signal);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_parent(mut self, parent: RunContext) -> Self {
        self.parent = Some(parent);
        self
    }
}

struct RunContextInner {
    run_id: String,
    parent_id: Option<String>,
    group_id: String,
    created_at: DateTime<Utc>,
    domain: ErrorDomain,
    emitter: Emitter,
    controller: AbortController,
    params: Value,
    status: Mutex<RunStatus>,
}

/// Handle to one running operation. Clones share the same run.
#[derive(Clone)]
pub struct RunContext {
    inner: Arc<RunContextInner>,
}

impl RunContext {
    /// Prepares a run of `body` on behalf of `instance`.
    ///
    /// Nothing happens until the returned [`Run`] is awaited (or streamed).
    /// The enclosing run is captured now, so call this from inside the parent
    /// body when nesting.
    pub fn enter<R, F, Fut>(
        instance: &dyn RunInstance,
        input: impl Serialize,
        options: RunOptions,
        body: F,
    ) -> Run<R>
    where
        R: Serialize + Clone + Send + Sync + 'static,
        F: FnOnce(RunContext) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<R>> + Send + 'static,
    {
        let params = serde_json::to_value(input).unwrap_or_default();
        match Self::create(instance, params, options) {
            Ok(context) => Run::new(
                context,
                Box::new(move |context| -> BoxFuture<'static, anyhow::Result<R>> {
                    Box::pin(body(context))
                }),
            ),
            Err(error) => Run::failed(error),
        }
    }

    fn create(
        instance: &dyn RunInstance,
        params: Value,
        options: RunOptions,
    ) -> Result<Self, FrameworkError> {
        let parent = options.parent.or_else(RunContext::current);
        let run_id = Uuid::new_v4().to_string();
        let parent_id = parent.as_ref().map(|p| p.run_id().to_string());
        let group_id = parent
            .as_ref()
            .map(|p| p.group_id().to_string())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let mut context = parent
            .as_ref()
            .map(|p| p.emitter().context())
            .unwrap_or_default();
        context.remove("id");
        context.remove("parent_id");

        let emitter = instance.emitter().child(ChildOptions {
            group_id: Some(group_id.clone()),
            context: Some(context),
            trace: Some(EventTrace {
                id: group_id.clone(),
                run_id: run_id.clone(),
                parent_run_id: parent_id.clone(),
            }),
            ..ChildOptions::default()
        })?;

        let mut sources = Vec::new();
        if let Some(parent) = &parent {
            if !parent.emitter().is_destroyed() {
                emitter.pipe(parent.emitter())?;
            }
            sources.push(parent.signal());
        }
        if let Some(signal) = options.signal {
            sources.push(signal);
        }
        if let Some(timeout) = options.timeout {
            sources.push(AbortSignal::timeout(timeout));
        }

        debug!(
            run_id = %run_id,
            parent_run_id = ?parent_id,
            emitter = %emitter.path(),
            "Run context created"
        );

        Ok(Self {
            inner: Arc::new(RunContextInner {
                run_id,
                parent_id,
                group_id,
                created_at: Utc::now(),
                domain: instance.error_domain(),
                emitter,
                controller: AbortController::with_sources(sources),
                params,
                status: Mutex::new(RunStatus::Created),
            }),
        })
    }

    /// The run executing in the current task, if any.
    pub fn current() -> Option<RunContext> {
        CURRENT_RUN.try_with(RunContext::clone).ok()
    }

    /// Runs `future` with this context installed as the current run.
    pub async fn scope<F: Future>(&self, future: F) -> F::Output {
        CURRENT_RUN.scope(self.clone(), future).await
    }

    pub fn run_id(&self) -> &str {
        &self.inner.run_id
    }

    pub fn parent_id(&self) -> Option<&str> {
        self.inner.parent_id.as_deref()
    }

    pub fn group_id(&self) -> &str {
        &self.inner.group_id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.inner.created_at
    }

    /// The run's own emitter (same namespace as the owner's emitter).
    pub fn emitter(&self) -> &Emitter {
        &self.inner.emitter
    }

    pub fn signal(&self) -> AbortSignal {
        self.inner.controller.signal()
    }

    /// The original call arguments.
    pub fn params(&self) -> &Value {
        &self.inner.params
    }

    pub fn domain(&self) -> ErrorDomain {
        self.inner.domain
    }

    pub fn status(&self) -> RunStatus {
        *self.inner.status.lock()
    }

    /// Aborts this run and every run nested in it.
    pub fn abort(&self, reason: impl Into<String>) {
        self.inner.controller.abort(reason);
    }

    pub(crate) fn set_status(&self, next: RunStatus) {
        let mut status = self.inner.status.lock();
        if !status.can_transition_to(next) {
            warn!(
                run_id = %self.inner.run_id,
                from = ?*status,
                to = ?next,
                "Unexpected run status transition"
            );
        }
        *status = next;
    }

    /// Releases the run: aborts its signal and destroys its emitter.
    pub(crate) fn destroy(&self) {
        self.inner.controller.abort("Context has been destroyed.");
        self.inner.emitter.destroy();
    }
}

impl fmt::Debug for RunContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunContext")
            .field("run_id", &self.inner.run_id)
            .field("parent_id", &self.inner.parent_id)
            .field("group_id", &self.inner.group_id)
            .field("status", &self.status())
            .finish()
    }
}
