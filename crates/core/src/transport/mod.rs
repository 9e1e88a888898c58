//! Transport adapters.
//!
//! A transport carries delivered events out of the process (a protocol
//! server, a log shipper, another task) as [`EventRecord`]s.

pub mod channel;
pub mod writer;

use crate::emitter::{CleanupFn, Emitter, EmitterOptions, EventMeta, Matcher, Payload};
use crate::errors::FrameworkError;
use async_trait::async_trait;
use hk_protocol::EventRecord;
use std::sync::Arc;
use tracing::warn;

pub use channel::ChannelTransport;
pub use writer::JsonLinesTransport;

#[async_trait]
pub trait TransportAdapter: Send + Sync {
    async fn publish(&self, record: EventRecord) -> anyhow::Result<()>;
}

/// Forwards every event matching `matcher` on `emitter` to `adapter`.
///
/// Publish failures are logged and never reach the emitting code. With the
/// default blocking options, records are published in emission order.
pub fn attach_transport(
    emitter: &Emitter,
    matcher: impl Into<Matcher>,
    adapter: Arc<dyn TransportAdapter>,
    options: EmitterOptions,
) -> Result<CleanupFn, FrameworkError> {
    emitter.on_match(
        matcher,
        move |data: Payload, meta: EventMeta| {
            let adapter = adapter.clone();
            let record = meta.to_record(&data);
            async move {
                let path = record.path.clone();
                if let Err(error) = adapter.publish(record).await {
                    warn!(path = %path, error = %error, "Failed to publish event");
                }
                Ok(())
            }
        },
        options,
    )
}
