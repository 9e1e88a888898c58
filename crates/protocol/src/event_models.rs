//! Event correlation and serialized event records.
//!
//! [`EventTrace`] links an emission to the run that produced it.
//! [`EventRecord`] is the transport-friendly form of a delivered event:
//! it drops the in-process handles (source emitter, typed payload) and
//! keeps everything a remote consumer needs to correlate bursts of events
//! back to one external request.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use ts_rs::TS;

/// Correlates an event with a specific run invocation chain.
///
/// ```json
/// { "id": "group-uuid", "run_id": "run-uuid", "parent_run_id": null }
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
pub struct EventTrace {
    /// Group identifier shared by every run in one call tree.
    pub id: String,

    /// Identifier of the run that emitted the event.
    pub run_id: String,

    /// Identifier of the enclosing run, if the run was nested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_run_id: Option<String>,
}

/// Serialized view of one delivered event.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
pub struct EventRecord {
    /// Unique identifier of this emission.
    pub id: String,

    /// Correlation identifier shared by logically related emissions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,

    /// Local event name (never dotted).
    pub name: String,

    /// Fully qualified dotted path.
    pub path: String,

    /// Emission timestamp.
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,

    /// Attribution of the emitter owner, e.g. `"agent"` or `"tool"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,

    /// Caller-supplied correlation data.
    #[serde(default)]
    #[ts(type = "Record<string, unknown>")]
    pub context: Map<String, Value>,

    /// Run correlation, when the event was produced inside a run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<EventTrace>,

    /// JSON snapshot of the payload, `null` for opaque payloads.
    #[serde(default)]
    #[ts(type = "unknown")]
    pub data: Value,
}

impl EventRecord {
    /// Whether the record was produced inside the given run.
    pub fn belongs_to_run(&self, run_id: &str) -> bool {
        self.trace.as_ref().is_some_and(|t| t.run_id == run_id)
    }
}
