//! Retry coordination.
//!
//! [`p_retry`] retries a single fallible call with exponential backoff.
//! [`RetryCounter`] is a budget shared across many calls of one operation.

pub mod counter;
pub mod p_retry;

pub use counter::RetryCounter;
pub use p_retry::{p_retry, FailedAttemptFn, RetryAttempt, RetryOptions, ShouldRetryFn};
