//! Event payloads.

use serde::Serialize;
use serde_json::Value;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Data attached to an emitted event.
///
/// Listeners get the original value back through [`Payload::downcast_ref`].
/// Payloads built from serializable values also keep a JSON snapshot so that
/// transport adapters can forward them without knowing the concrete type.
#[derive(Clone)]
pub struct Payload {
    value: Arc<dyn Any + Send + Sync>,
    json: Option<Value>,
}

impl Payload {
    /// Wraps an opaque value. Transports see it as `null`.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            value: Arc::new(value),
            json: None,
        }
    }

    /// Wraps a serializable value and records its JSON form.
    pub fn serializable<T: Serialize + Any + Send + Sync>(value: T) -> Self {
        let json = serde_json::to_value(&value).ok();
        Self {
            value: Arc::new(value),
            json,
        }
    }

    /// Payload of events that carry nothing, such as `finish`.
    pub fn empty() -> Self {
        Self::serializable(())
    }

    /// Replaces the JSON snapshot.
    pub fn with_json(mut self, json: Value) -> Self {
        self.json = Some(json);
        self
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        (*self.value).downcast_ref::<T>()
    }

    pub fn is<T: Any>(&self) -> bool {
        (*self.value).is::<T>()
    }

    pub fn json(&self) -> Option<&Value> {
        self.json.as_ref()
    }

    /// JSON snapshot, or `null` for opaque payloads.
    pub fn to_json(&self) -> Value {
        self.json.clone().unwrap_or(Value::Null)
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.json {
            Some(json) => write!(f, "Payload({json})"),
            None => write!(f, "Payload(<opaque>)"),
        }
    }
}
