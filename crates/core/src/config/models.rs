//! Configuration models.
//!
//! Every section and every field is optional in `config.toml`; missing values
//! fall back to the defaults below.
//!
//! ```toml
//! [retry]
//! max_retries = 2
//! factor = 2.0
//! base_delay_ms = 500
//!
//! [run]
//! timeout_ms = 30000
//!
//! [agent]
//! max_iterations = 10
//! max_retries_per_step = 3
//! total_max_retries = 20
//!
//! [logging]
//! filter = "hk_core=debug"
//! ```

use crate::retry::RetryOptions;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Unified configuration loaded from `.hivekit/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HivekitConfig {
    pub retry: RetrySettings,
    pub run: RunSettings,
    pub agent: AgentSettings,
    pub logging: LoggingSettings,
}

/// Backoff policy used by model and tool runners.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_retries: u32,
    pub factor: f64,
    pub base_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: 0,
            factor: 2.0,
            base_delay_ms: 1000,
        }
    }
}

impl RetrySettings {
    pub fn to_options(&self) -> RetryOptions {
        RetryOptions::new(self.max_retries)
            .with_factor(self.factor)
            .with_base_delay(Duration::from_millis(self.base_delay_ms))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunSettings {
    /// Internal timeout applied to every run, if set.
    pub timeout_ms: Option<u64>,
}

impl RunSettings {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

/// Limits of the agent step loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    pub max_iterations: u32,
    pub max_retries_per_step: u32,
    /// Failures tolerated across all steps of one run.
    pub total_max_retries: u32,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            max_retries_per_step: 3,
            total_max_retries: 20,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `tracing_subscriber::EnvFilter` directive.
    pub filter: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}
