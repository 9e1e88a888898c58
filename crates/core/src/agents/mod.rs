//! Agent abstraction and execution.
//!
//! This module provides the `Agent` trait (Adapter Pattern) and
//! the `AgentRunner` that drives an agent's step loop inside a run context.

pub mod adapters;
pub mod base;
pub mod runner;

pub use adapters::MockAgent;
pub use base::{
    Agent, AgentError, AgentInput, AgentOutput, AgentUpdateEvent, StepOutcome, StepRequest,
};
pub use runner::AgentRunner;
