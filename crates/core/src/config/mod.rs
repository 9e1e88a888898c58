//! Configuration loading and management.
//!
//! Runtime defaults (retry policy, run timeout, agent retry budgets, log
//! filter) are read from `.hivekit/config.toml` under a project root.

pub mod error;
pub mod loader;
pub mod models;

pub use error::{ConfigError, ConfigResult};
pub use loader::{load_config, load_config_file};
pub use models::{AgentSettings, HivekitConfig, LoggingSettings, RetrySettings, RunSettings};
