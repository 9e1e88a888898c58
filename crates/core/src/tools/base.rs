//! Base Tool trait.

use crate::context::RunContext;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Result of one tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutput {
    pub result: Value,
}

impl ToolOutput {
    pub fn new(result: impl Into<Value>) -> Self {
        Self {
            result: result.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match &self.result {
            Value::Null => true,
            Value::String(text) => text.is_empty(),
            Value::Array(items) => items.is_empty(),
            Value::Object(fields) => fields.is_empty(),
            Value::Bool(_) | Value::Number(_) => false,
        }
    }

    /// The result rendered for a model prompt: strings as-is, anything else
    /// as JSON.
    pub fn text(&self) -> String {
        match &self.result {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        }
    }
}

/// An external capability an agent can call.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Used as the emitter namespace segment.
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    async fn execute(&self, input: Value, ctx: &RunContext) -> anyhow::Result<ToolOutput>;
}
