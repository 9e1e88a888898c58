//! Re-entrancy guard for owners that expose a single logical operation.

use crate::errors::{ErrorDomain, FrameworkError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Rejects a second invocation while the first one is still in flight.
#[derive(Debug, Clone, Default)]
pub struct RunGuard {
    running: Arc<AtomicBool>,
}

impl RunGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes the guard, or fails with a fatal "already running" error.
    pub fn acquire(&self, domain: ErrorDomain) -> Result<RunPermit, FrameworkError> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| FrameworkError::already_running(domain))?;
        Ok(RunPermit {
            running: self.running.clone(),
        })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

/// Held for the whole lifetime of a run; releases the guard when dropped.
#[derive(Debug)]
pub struct RunPermit {
    running: Arc<AtomicBool>,
}

impl Drop for RunPermit {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;

    #[test]
    fn test_second_acquire_fails_until_release() {
        let guard = RunGuard::new();
        let permit = guard.acquire(ErrorDomain::Agent).unwrap();
        assert!(guard.is_running());

        let error = guard.acquire(ErrorDomain::Agent).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::AlreadyRunning);
        assert_eq!(error.message(), "Agent is already running!");
        assert!(error.is_fatal());
        assert!(!error.is_retryable());

        drop(permit);
        assert!(!guard.is_running());
        assert!(guard.acquire(ErrorDomain::Agent).is_ok());
    }

    #[test]
    fn test_clones_share_state() {
        let guard = RunGuard::new();
        let clone = guard.clone();
        let _permit = guard.acquire(ErrorDomain::Tool).unwrap();
        assert!(clone.acquire(ErrorDomain::Tool).is_err());
    }
}
