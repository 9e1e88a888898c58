//! Composable cancellation.
//!
//! An [`AbortSignal`] is aborted when its own controller aborts it, when its
//! deadline passes, or when any of its source signals is aborted. Composition
//! is structural: a signal built from a parent signal reports aborted as soon
//! as the parent does, even if it was created after the parent's abort.

use crate::errors::FrameworkError;
use futures::future::{select_all, BoxFuture};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

const TIMEOUT_REASON: &str = "The operation has timed out.";

struct SignalInner {
    token: CancellationToken,
    reason: Mutex<Option<String>>,
    sources: Vec<AbortSignal>,
    deadline: Option<Instant>,
}

/// Read side of a cancellation source.
#[derive(Clone)]
pub struct AbortSignal {
    inner: Arc<SignalInner>,
}

impl AbortSignal {
    fn build(sources: Vec<AbortSignal>, deadline: Option<Instant>) -> Self {
        Self {
            inner: Arc::new(SignalInner {
                token: CancellationToken::new(),
                reason: Mutex::new(None),
                sources,
                deadline,
            }),
        }
    }

    /// A signal that is never aborted.
    pub fn never() -> Self {
        Self::build(Vec::new(), None)
    }

    /// A signal that aborts once `duration` has elapsed.
    pub fn timeout(duration: Duration) -> Self {
        Self::build(Vec::new(), Some(Instant::now() + duration))
    }

    /// Aborted when any of `signals` is.
    pub fn any(signals: impl IntoIterator<Item = AbortSignal>) -> Self {
        Self::build(signals.into_iter().collect(), None)
    }

    pub fn is_aborted(&self) -> bool {
        self.inner.token.is_cancelled()
            || self.deadline_passed()
            || self.inner.sources.iter().any(AbortSignal::is_aborted)
    }

    /// Why the signal was aborted, if it was.
    pub fn reason(&self) -> Option<String> {
        if self.inner.token.is_cancelled() {
            return self.inner.reason.lock().clone();
        }
        if self.deadline_passed() {
            return Some(TIMEOUT_REASON.to_string());
        }
        self.inner
            .sources
            .iter()
            .find(|source| source.is_aborted())
            .and_then(AbortSignal::reason)
    }

    /// Fails with an abort error when the signal is aborted.
    pub fn throw_if_aborted(&self) -> Result<(), FrameworkError> {
        if self.is_aborted() {
            Err(FrameworkError::abort(self.reason()))
        } else {
            Ok(())
        }
    }

    /// Resolves once the signal is aborted.
    pub fn cancelled(&self) -> BoxFuture<'static, ()> {
        let signal = self.clone();
        Box::pin(async move {
            let token = signal.inner.token.clone();
            let mut waiters: Vec<BoxFuture<'static, ()>> =
                vec![Box::pin(async move { token.cancelled().await })];
            if let Some(deadline) = signal.inner.deadline {
                waiters.push(Box::pin(tokio::time::sleep_until(deadline)));
            }
            for source in &signal.inner.sources {
                waiters.push(source.cancelled());
            }
            select_all(waiters).await;
        })
    }

    fn deadline_passed(&self) -> bool {
        self.inner
            .deadline
            .is_some_and(|deadline| Instant::now() >= deadline)
    }

    fn abort(&self, reason: String) {
        {
            let mut current = self.inner.reason.lock();
            if current.is_none() {
                *current = Some(reason);
            }
        }
        self.inner.token.cancel();
    }
}

impl Default for AbortSignal {
    fn default() -> Self {
        Self::never()
    }
}

impl fmt::Debug for AbortSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AbortSignal")
            .field("aborted", &self.is_aborted())
            .field("reason", &self.reason())
            .finish()
    }
}

/// Write side of a cancellation source.
#[derive(Clone, Debug, Default)]
pub struct AbortController {
    signal: AbortSignal,
}

impl AbortController {
    pub fn new() -> Self {
        Self::default()
    }

    /// A controller whose signal also follows every signal in `sources`.
    pub fn with_sources(sources: impl IntoIterator<Item = AbortSignal>) -> Self {
        Self {
            signal: AbortSignal::any(sources),
        }
    }

    pub fn signal(&self) -> AbortSignal {
        self.signal.clone()
    }

    /// Aborts the signal. Only the first reason is kept.
    pub fn abort(&self, reason: impl Into<String>) {
        self.signal.abort(reason.into());
    }
}
