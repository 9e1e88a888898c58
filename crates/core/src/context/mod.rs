//! Operation lifecycle: run contexts, cancellation and re-entrancy.
//!
//! - [`signal`]: composable abort signals
//! - [`run_context`]: the per-invocation context and its task-local lookup
//! - [`run`]: the awaitable run builder with observation hooks
//! - [`middleware`]: hooks bound to a run's context before it starts
//! - [`guard`]: rejects concurrent invocation of a single-operation owner

pub mod guard;
pub mod middleware;
pub mod run;
pub mod run_context;
pub mod signal;

pub use guard::{RunGuard, RunPermit};
pub use middleware::{RunMiddleware, TrajectoryMiddleware};
pub use run::{Run, RunItem, RunStartEvent, RunSuccessEvent};
pub use run_context::{RunContext, RunInstance, RunOptions};
pub use signal::{AbortController, AbortSignal};
