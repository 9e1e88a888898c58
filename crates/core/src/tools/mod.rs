//! Tools.
//!
//! A [`Tool`] is any external capability an agent can invoke; the
//! [`ToolRunner`] executes it inside a run context.

pub mod base;
pub mod runner;

pub use base::{Tool, ToolOutput};
pub use runner::{ToolRetryEvent, ToolRunner};
