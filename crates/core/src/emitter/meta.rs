//! Metadata attached to every delivered event.

use super::emitter::Emitter;
use super::payload::Payload;
use chrono::{DateTime, Utc};
use hk_protocol::{EventRecord, EventTrace};
use serde_json::{Map, Value};
use std::fmt;
use uuid::Uuid;

/// The object that owns an emitter, kept for attribution only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Creator {
    kind: String,
    id: String,
}

impl Creator {
    /// Creates a creator of the given kind with a fresh identifier.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: Uuid::new_v4().to_string(),
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

/// Immutable description of one emission.
#[derive(Clone)]
pub struct EventMeta {
    pub id: String,
    pub group_id: Option<String>,
    /// Local name, never dotted.
    pub name: String,
    /// Emitter namespace joined with `name`.
    pub path: String,
    pub created_at: DateTime<Utc>,
    /// The emitter that performed the emission.
    pub source: Emitter,
    pub creator: Option<Creator>,
    pub context: Map<String, Value>,
    pub trace: Option<EventTrace>,
}

impl EventMeta {
    /// Wire form of this event together with its payload.
    pub fn to_record(&self, data: &Payload) -> EventRecord {
        EventRecord {
            id: self.id.clone(),
            group_id: self.group_id.clone(),
            name: self.name.clone(),
            path: self.path.clone(),
            created_at: self.created_at,
            creator: self.creator.as_ref().map(|c| c.kind().to_string()),
            context: self.context.clone(),
            trace: self.trace.clone(),
            data: data.to_json(),
        }
    }
}

impl fmt::Debug for EventMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventMeta")
            .field("id", &self.id)
            .field("group_id", &self.group_id)
            .field("name", &self.name)
            .field("path", &self.path)
            .field("created_at", &self.created_at)
            .field("creator", &self.creator)
            .field("trace", &self.trace)
            .finish()
    }
}
