//! Structured framework errors.
//!
//! Every failure that crosses an operation boundary (emitter, run context,
//! retry loop, agent, backend model, tool) arrives as a single
//! [`FrameworkError`]. The error carries a machine-checkable flag pair
//! (`is_fatal` / `is_retryable`), a kind, the domain that produced it, a JSON
//! context map and an ordered list of causes that can be explained as a
//! multi-line chain.

use hk_protocol::ErrorReport;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

/// What went wrong, independent of which subsystem raised it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed namespace, event name or configuration.
    Validation,
    /// The operation was cancelled through its abort signal.
    Abort,
    /// An unexpected failure inside an operation body.
    Operation,
    /// A [`RetryCounter`](crate::retry::RetryCounter) budget is used up.
    RetryExhausted,
    /// An emitter was used after `destroy()`.
    EmitterDestroyed,
    /// A blocking listener failed while an event was being delivered.
    Listener,
    /// The owner of a single logical operation was invoked concurrently.
    AlreadyRunning,
}

/// The subsystem an error belongs to.
///
/// Operation owners declare their domain when they are constructed; the
/// domain decides the error name used in explanations and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorDomain {
    Framework,
    Emitter,
    Agent,
    ChatModel,
    Embedding,
    Tool,
}

impl ErrorDomain {
    /// Name of the error type produced by this domain.
    pub fn error_name(self) -> &'static str {
        match self {
            ErrorDomain::Framework => "FrameworkError",
            ErrorDomain::Emitter => "EmitterError",
            ErrorDomain::Agent => "AgentError",
            ErrorDomain::ChatModel => "ChatModelError",
            ErrorDomain::Embedding => "EmbeddingModelError",
            ErrorDomain::Tool => "ToolError",
        }
    }

    /// Human readable label of the owner kind.
    pub fn label(self) -> &'static str {
        match self {
            ErrorDomain::Framework => "Framework",
            ErrorDomain::Emitter => "Emitter",
            ErrorDomain::Agent => "Agent",
            ErrorDomain::ChatModel => "Chat model",
            ErrorDomain::Embedding => "Embedding model",
            ErrorDomain::Tool => "Tool",
        }
    }

    fn default_message(self) -> &'static str {
        match self {
            ErrorDomain::Framework => "The framework has encountered an error.",
            ErrorDomain::Emitter => "Emitter error",
            ErrorDomain::Agent => "Agent error",
            ErrorDomain::ChatModel => "Chat model error",
            ErrorDomain::Embedding => "Embedding model error",
            ErrorDomain::Tool => "Tool error",
        }
    }
}

/// One link in an error chain.
#[derive(Debug, Clone)]
pub enum Cause {
    /// A nested framework error, which may carry causes of its own.
    Framework(FrameworkError),
    /// Any other error, kept as-is.
    Foreign(Arc<anyhow::Error>),
}

impl Cause {
    fn describe(&self) -> String {
        match self {
            Cause::Framework(error) => format!("{}: {}", error.name(), error.message()),
            Cause::Foreign(error) => format!("Error: {error}"),
        }
    }
}

#[derive(Debug, Clone)]
struct ErrorInner {
    kind: ErrorKind,
    domain: ErrorDomain,
    message: String,
    is_fatal: bool,
    is_retryable: bool,
    context: Map<String, Value>,
    causes: Vec<Cause>,
}

/// The structured error shared by every operation in the crate.
///
/// Cloning is cheap and a clone refers to the same error object, so an error
/// stored by a retry budget can be handed out repeatedly and still be
/// recognized with [`FrameworkError::same_as`].
#[derive(Clone)]
pub struct FrameworkError {
    inner: Arc<ErrorInner>,
}

impl FrameworkError {
    /// Creates an error with explicit kind, domain and message.
    ///
    /// Flags default to non-fatal and retryable; use the kind-specific
    /// constructors to get the conventional flag pair.
    pub fn new(kind: ErrorKind, domain: ErrorDomain, message: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(ErrorInner {
                kind,
                domain,
                message: message.into(),
                is_fatal: false,
                is_retryable: true,
                context: Map::new(),
                causes: Vec::new(),
            }),
        }
    }

    pub fn validation(domain: ErrorDomain, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, domain, message)
            .with_fatal(true)
            .with_retryable(false)
    }

    /// Cancellation error. The message is the abort reason when one is known.
    pub fn abort(reason: Option<String>) -> Self {
        let message = reason.unwrap_or_else(|| "The operation has been aborted!".to_string());
        Self::new(ErrorKind::Abort, ErrorDomain::Framework, message).with_retryable(false)
    }

    pub fn operation(domain: ErrorDomain, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Operation, domain, message)
    }

    /// Terminal error of an exhausted retry budget, wrapping the last failure.
    pub fn retry_exhausted(
        domain: ErrorDomain,
        max_retries: u32,
        last_error: Option<FrameworkError>,
    ) -> Self {
        let error = Self::new(
            ErrorKind::RetryExhausted,
            domain,
            format!("Maximal amount of global retries ({max_retries}) has been reached."),
        )
        .with_fatal(true)
        .with_retryable(false);
        match last_error {
            Some(last) => error.with_cause(last),
            None => error,
        }
    }

    pub fn emitter_destroyed(namespace: &str) -> Self {
        let target = if namespace.is_empty() { "<root>" } else { namespace };
        Self::new(
            ErrorKind::EmitterDestroyed,
            ErrorDomain::Emitter,
            format!("Emitter '{target}' has been destroyed."),
        )
        .with_fatal(true)
        .with_retryable(false)
    }

    /// Translates a failure raised by a blocking listener.
    ///
    /// Framework errors pass through untouched; anything else is wrapped into
    /// an emitter error that records the event path.
    pub fn listener_failed(path: &str, error: anyhow::Error) -> Self {
        match error.downcast::<FrameworkError>() {
            Ok(error) => error,
            Err(error) => Self::new(
                ErrorKind::Listener,
                ErrorDomain::Emitter,
                format!("One of the provided emitter callbacks has failed. Event: {path}"),
            )
            .with_fatal(true)
            .with_retryable(false)
            .with_context("event", Value::String(path.to_string()))
            .with_foreign(error),
        }
    }

    pub fn already_running(domain: ErrorDomain) -> Self {
        Self::new(
            ErrorKind::AlreadyRunning,
            domain,
            format!("{} is already running!", domain.label()),
        )
        .with_fatal(true)
        .with_retryable(false)
    }

    /// Passes framework errors through unchanged and wraps everything else
    /// into an operation error of `domain` with the original as its cause.
    pub fn ensure(domain: ErrorDomain, error: anyhow::Error) -> Self {
        match error.downcast::<FrameworkError>() {
            Ok(error) => error,
            Err(error) => Self::operation(domain, domain.default_message()).with_foreign(error),
        }
    }

    pub fn with_fatal(mut self, is_fatal: bool) -> Self {
        Arc::make_mut(&mut self.inner).is_fatal = is_fatal;
        self
    }

    pub fn with_retryable(mut self, is_retryable: bool) -> Self {
        Arc::make_mut(&mut self.inner).is_retryable = is_retryable;
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: Value) -> Self {
        Arc::make_mut(&mut self.inner)
            .context
            .insert(key.into(), value);
        self
    }

    pub fn with_cause(mut self, cause: FrameworkError) -> Self {
        Arc::make_mut(&mut self.inner)
            .causes
            .push(Cause::Framework(cause));
        self
    }

    pub fn with_foreign(mut self, cause: anyhow::Error) -> Self {
        Arc::make_mut(&mut self.inner)
            .causes
            .push(Cause::Foreign(Arc::new(cause)));
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.inner.kind
    }

    pub fn domain(&self) -> ErrorDomain {
        self.inner.domain
    }

    pub fn name(&self) -> &'static str {
        self.inner.domain.error_name()
    }

    pub fn message(&self) -> &str {
        &self.inner.message
    }

    pub fn is_fatal(&self) -> bool {
        self.inner.is_fatal
    }

    pub fn is_retryable(&self) -> bool {
        self.inner.is_retryable
    }

    pub fn is_abort(&self) -> bool {
        self.inner.kind == ErrorKind::Abort
    }

    pub fn context(&self) -> &Map<String, Value> {
        &self.inner.context
    }

    /// Direct causes in insertion order.
    pub fn causes(&self) -> &[Cause] {
        &self.inner.causes
    }

    /// True when both values refer to the same error object.
    pub fn same_as(&self, other: &FrameworkError) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// All nested causes, depth first.
    pub fn traverse(&self) -> Vec<Cause> {
        let mut out = Vec::new();
        self.collect_causes(&mut out);
        out
    }

    fn collect_causes(&self, out: &mut Vec<Cause>) {
        for cause in &self.inner.causes {
            out.push(cause.clone());
            if let Cause::Framework(nested) = cause {
                nested.collect_causes(out);
            }
        }
    }

    /// True if this error or any nested framework error is fatal.
    pub fn has_fatal_error(&self) -> bool {
        self.is_fatal()
            || self
                .traverse()
                .iter()
                .any(|cause| matches!(cause, Cause::Framework(error) if error.is_fatal()))
    }

    /// The deepest cause in the chain, or this error when there is none.
    pub fn cause(&self) -> Cause {
        self.traverse()
            .pop()
            .unwrap_or_else(|| Cause::Framework(self.clone()))
    }

    /// The abort reason wrapped by an abort error, or the error itself.
    pub fn abort_cause(&self) -> FrameworkError {
        if !self.is_abort() {
            return self.clone();
        }
        self.inner
            .causes
            .iter()
            .find_map(|cause| match cause {
                Cause::Framework(error) => Some(error.clone()),
                Cause::Foreign(_) => None,
            })
            .unwrap_or_else(|| self.clone())
    }

    /// Multi-line explanation of the whole chain.
    ///
    /// Each level of nesting is indented by four spaces. Foreign errors that
    /// carry a source print an extra `Cause:` line.
    pub fn explain(&self) -> String {
        let mut lines = vec![Cause::Framework(self.clone()).describe()];
        for (index, cause) in self.traverse().iter().enumerate() {
            let offset = "    ".repeat(index + 1);
            lines.push(format!("{offset}{}", cause.describe()));
            if let Cause::Foreign(error) = cause {
                if let Some(source) = error.source() {
                    lines.push(format!("{offset}Cause: {source}"));
                }
            }
        }
        lines.join("\n")
    }

    /// Wire form of this error.
    pub fn report(&self) -> ErrorReport {
        ErrorReport {
            name: self.name().to_string(),
            message: self.message().to_string(),
            explanation: self.explain(),
            is_fatal: self.has_fatal_error(),
            is_retryable: self.is_retryable(),
            context: self.inner.context.clone(),
        }
    }
}

impl fmt::Display for FrameworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner.message)
    }
}

impl fmt::Debug for FrameworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameworkError")
            .field("kind", &self.inner.kind)
            .field("domain", &self.inner.domain)
            .field("message", &self.inner.message)
            .field("is_fatal", &self.inner.is_fatal)
            .field("is_retryable", &self.inner.is_retryable)
            .field("causes", &self.inner.causes.len())
            .finish()
    }
}

impl std::error::Error for FrameworkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self.inner.causes.first()? {
            Cause::Framework(error) => Some(error),
            Cause::Foreign(error) => {
                let error: &anyhow::Error = error;
                Some(error.as_ref())
            }
        }
    }
}

/// Result alias used throughout the crate.
pub type FrameworkResult<T> = Result<T, FrameworkError>;
