//! Model backends.
//!
//! Provider adapters implement [`ChatModel`] or [`EmbeddingModel`]; the
//! runners wrap every call in a run context with retries.

pub mod chat_model;
pub mod embedding;

pub use chat_model::{ChatModel, ChatModelInput, ChatModelOutput, ChatModelRunner, TokenUsage};
pub use embedding::{EmbeddingModel, EmbeddingModelInput, EmbeddingModelOutput, EmbeddingModelRunner};
