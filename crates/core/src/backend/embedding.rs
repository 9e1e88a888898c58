//! Embedding model boundary.

use crate::context::{Run, RunContext, RunInstance, RunOptions};
use crate::emitter::{ChildOptions, Creator, Emitter};
use crate::errors::{ErrorDomain, FrameworkError};
use crate::retry::{p_retry, RetryOptions};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddingModelInput {
    pub values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingModelOutput {
    /// One vector per input value, in input order.
    pub embeddings: Vec<Vec<f32>>,
}

#[async_trait]
pub trait EmbeddingModel: Send + Sync {
    fn provider_id(&self) -> &str;

    fn model_id(&self) -> &str;

    async fn embed(
        &self,
        input: &EmbeddingModelInput,
        ctx: &RunContext,
    ) -> anyhow::Result<EmbeddingModelOutput>;
}

/// Runs embedding calls under the emitter `backend.<provider>.embedding`.
pub struct EmbeddingModelRunner {
    model: Arc<dyn EmbeddingModel>,
    emitter: Emitter,
    retry: RetryOptions,
}

impl RunInstance for EmbeddingModelRunner {
    fn emitter(&self) -> &Emitter {
        &self.emitter
    }

    fn error_domain(&self) -> ErrorDomain {
        ErrorDomain::Embedding
    }
}

impl EmbeddingModelRunner {
    pub fn new(model: Arc<dyn EmbeddingModel>) -> Result<Self, FrameworkError> {
        Self::with_emitter(model, &Emitter::root())
    }

    pub fn with_emitter(
        model: Arc<dyn EmbeddingModel>,
        parent: &Emitter,
    ) -> Result<Self, FrameworkError> {
        let emitter = parent.child(
            ChildOptions::namespace(["backend", model.provider_id(), "embedding"])
                .with_creator(Creator::new("embedding_model")),
        )?;
        Ok(Self {
            model,
            emitter,
            retry: RetryOptions::default(),
        })
    }

    pub fn with_retry(mut self, retry: RetryOptions) -> Self {
        self.retry = retry;
        self
    }

    /// Embeds every value of `input`.
    ///
    /// A response whose length differs from the number of values fails with
    /// a non-retryable embedding error.
    pub fn create(&self, input: EmbeddingModelInput, options: RunOptions) -> Run<EmbeddingModelOutput> {
        let model = self.model.clone();
        let retry = self.retry.clone();
        RunContext::enter(self, input.clone(), options, move |ctx| async move {
            let output = p_retry(
                |_| {
                    let model = model.clone();
                    let ctx = ctx.clone();
                    let input = input.clone();
                    async move {
                        model
                            .embed(&input, &ctx)
                            .await
                            .map_err(|error| FrameworkError::ensure(ErrorDomain::Embedding, error))
                    }
                },
                retry.with_signal(ctx.signal()),
            )
            .await?;

            if output.embeddings.len() != input.values.len() {
                let error = FrameworkError::operation(
                    ErrorDomain::Embedding,
                    format!(
                        "Expected {} embeddings, got {}.",
                        input.values.len(),
                        output.embeddings.len()
                    ),
                )
                .with_retryable(false);
                return Err(anyhow::Error::new(error));
            }
            Ok(output)
        })
    }
}
