//! Chat model boundary.

use crate::context::{Run, RunContext, RunInstance, RunOptions};
use crate::emitter::{ChildOptions, Creator, Emitter};
use crate::errors::{ErrorDomain, FrameworkError};
use crate::retry::{p_retry, RetryOptions};
use async_trait::async_trait;
use hk_protocol::{Message, Role};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatModelInput {
    pub messages: Vec<Message>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl ChatModelInput {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            max_tokens: None,
            temperature: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

impl TokenUsage {
    pub fn total(&self) -> u32 {
        self.prompt_tokens.saturating_add(self.completion_tokens)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatModelOutput {
    pub messages: Vec<Message>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
}

impl ChatModelOutput {
    /// Concatenated content of the assistant messages.
    pub fn text(&self) -> String {
        self.messages
            .iter()
            .filter(|m| m.role == Role::Assistant)
            .map(|m| m.content.as_str())
            .collect()
    }
}

/// A provider-specific chat completion API.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Provider identifier, e.g. `ollama`. Used as a namespace segment.
    fn provider_id(&self) -> &str;

    fn model_id(&self) -> &str;

    async fn create(&self, input: &ChatModelInput, ctx: &RunContext) -> anyhow::Result<ChatModelOutput>;
}

/// Runs chat completions under the emitter `backend.<provider>.chat`.
pub struct ChatModelRunner {
    model: Arc<dyn ChatModel>,
    emitter: Emitter,
    retry: RetryOptions,
}

impl RunInstance for ChatModelRunner {
    fn emitter(&self) -> &Emitter {
        &self.emitter
    }

    fn error_domain(&self) -> ErrorDomain {
        ErrorDomain::ChatModel
    }
}

impl ChatModelRunner {
    pub fn new(model: Arc<dyn ChatModel>) -> Result<Self, FrameworkError> {
        Self::with_emitter(model, &Emitter::root())
    }

    pub fn with_emitter(model: Arc<dyn ChatModel>, parent: &Emitter) -> Result<Self, FrameworkError> {
        let emitter = parent.child(
            ChildOptions::namespace(["backend", model.provider_id(), "chat"])
                .with_creator(Creator::new("chat_model")),
        )?;
        Ok(Self {
            model,
            emitter,
            retry: RetryOptions::default(),
        })
    }

    /// Retry policy for failed calls. The run's signal replaces `retry.signal`.
    pub fn with_retry(mut self, retry: RetryOptions) -> Self {
        self.retry = retry;
        self
    }

    pub fn model(&self) -> &Arc<dyn ChatModel> {
        &self.model
    }

    pub fn create(&self, input: ChatModelInput, options: RunOptions) -> Run<ChatModelOutput> {
        let model = self.model.clone();
        let retry = self.retry.clone();
        RunContext::enter(self, input.clone(), options, move |ctx| async move {
            debug!(
                provider = model.provider_id(),
                model = model.model_id(),
                messages = input.messages.len(),
                "Calling chat model"
            );
            let options = retry.with_signal(ctx.signal());
            let output = p_retry(
                |_| {
                    let model = model.clone();
                    let ctx = ctx.clone();
                    let input = input.clone();
                    async move {
                        model
                            .create(&input, &ctx)
                            .await
                            .map_err(|error| FrameworkError::ensure(ErrorDomain::ChatModel, error))
                    }
                },
                options,
            )
            .await?;
            Ok(output)
        })
    }
}
