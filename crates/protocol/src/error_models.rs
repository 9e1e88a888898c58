//! Structured error reports.
//!
//! The runtime's error type holds live causes that cannot cross a process
//! boundary. [`ErrorReport`] is its flattened, serializable form.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use ts_rs::TS;

/// Serializable summary of a failed operation.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
pub struct ErrorReport {
    /// Error type name, e.g. `"ToolError"` or `"AbortError"`.
    pub name: String,

    /// Top-level message.
    pub message: String,

    /// Multi-line rendering of the full cause chain.
    pub explanation: String,

    /// Whether the error must stop the enclosing operation.
    pub is_fatal: bool,

    /// Whether retrying the operation may succeed.
    pub is_retryable: bool,

    /// Diagnostic context attached where the error was raised.
    #[serde(default)]
    #[ts(type = "Record<string, unknown>")]
    pub context: Map<String, Value>,
}
