//! Global retry budget shared by the steps of one higher-level operation.

use crate::errors::{ErrorDomain, FrameworkError};

/// Counts failures against a fixed budget.
///
/// Once the budget is exceeded the terminal error is stored and every later
/// call to [`RetryCounter::consume`] returns that same error object without
/// touching the budget again.
#[derive(Debug, Clone)]
pub struct RetryCounter {
    max_retries: u32,
    remaining: i64,
    domain: ErrorDomain,
    last_error: Option<FrameworkError>,
    final_error: Option<FrameworkError>,
}

impl RetryCounter {
    pub fn new(max_retries: u32, domain: ErrorDomain) -> Self {
        Self {
            max_retries,
            remaining: i64::from(max_retries),
            domain,
            last_error: None,
            final_error: None,
        }
    }

    /// Records one failure.
    ///
    /// # Errors
    ///
    /// Fails with a fatal [`ErrorKind::RetryExhausted`] error wrapping the last
    /// recorded failure once the budget is used up, and with the very same
    /// error on every call after that.
    ///
    /// [`ErrorKind::RetryExhausted`]: crate::errors::ErrorKind::RetryExhausted
    pub fn consume(&mut self, error: Option<FrameworkError>) -> Result<(), FrameworkError> {
        if let Some(final_error) = &self.final_error {
            return Err(final_error.clone());
        }
        if error.is_some() {
            self.last_error = error;
        }

        self.remaining -= 1;
        if self.remaining < 0 {
            let final_error = FrameworkError::retry_exhausted(
                self.domain,
                self.max_retries,
                self.last_error.clone(),
            );
            self.final_error = Some(final_error.clone());
            return Err(final_error);
        }
        Ok(())
    }

    /// Retries left before the budget is exhausted.
    pub fn remaining(&self) -> u32 {
        u32::try_from(self.remaining.max(0)).unwrap_or(0)
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn last_error(&self) -> Option<&FrameworkError> {
        self.last_error.as_ref()
    }

    pub fn final_error(&self) -> Option<&FrameworkError> {
        self.final_error.as_ref()
    }

    pub fn is_exhausted(&self) -> bool {
        self.final_error.is_some()
    }
}
