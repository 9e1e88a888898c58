//! # hk-core
//!
//! Event and run-lifecycle runtime for hivekit agents.
//!
//! This crate provides:
//! - A hierarchical, namespace-addressed event emitter
//! - Run contexts with cancellation, timeouts and parent/child correlation
//! - Bounded retries with exponential backoff and shared retry budgets
//! - Capability boundaries for agents, chat/embedding models and tools
//! - Configuration loading from the `.hivekit/` directory
//!
//! ## Modules
//!
//! - [`emitter`]: Event paths, matchers and the emitter tree
//! - [`context`]: Run contexts, abort signals and the run builder
//! - [`retry`]: `p_retry` and `RetryCounter`
//! - [`errors`]: The structured `FrameworkError`
//! - [`agents`]: Agent trait, runner and mock adapter
//! - [`backend`]: Chat and embedding model runners
//! - [`tools`]: Tool trait and runner
//! - [`transport`]: Adapters that ship events out of the process
//! - [`config`]: Configuration loading and management
//! - [`logging`]: Tracing subscriber setup

pub mod agents;
pub mod backend;
pub mod config;
pub mod context;
pub mod emitter;
pub mod errors;
pub mod logging;
pub mod retry;
pub mod tools;
pub mod transport;

pub use context::{AbortController, AbortSignal, Run, RunContext, RunInstance, RunOptions};
pub use emitter::{Emitter, EmitterOptions, EventMeta, Matcher, Payload};
pub use errors::{ErrorDomain, ErrorKind, FrameworkError, FrameworkResult};
