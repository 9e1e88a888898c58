//! Common test utilities and helpers for integration tests.
//!
//! This module provides shared functionality across all integration tests
//! including:
//! - Test fixtures (project directories, run owners, event recorders)
//! - Custom assertions
//! - Mock models and tools

pub mod assertions;
pub mod fixtures;
pub mod mock_backends;

pub use assertions::*;
pub use fixtures::*;
#[allow(unused_imports)]
pub use mock_backends::*;
