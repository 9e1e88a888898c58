//! In-process transport backed by a tokio channel.

use super::TransportAdapter;
use async_trait::async_trait;
use hk_protocol::EventRecord;
use tokio::sync::mpsc;

/// Sends records to a bounded [`mpsc`] channel. A full channel applies
/// back-pressure to the emitting run when the listener is blocking.
#[derive(Debug, Clone)]
pub struct ChannelTransport {
    tx: mpsc::Sender<EventRecord>,
}

impl ChannelTransport {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<EventRecord>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }
}

#[async_trait]
impl TransportAdapter for ChannelTransport {
    async fn publish(&self, record: EventRecord) -> anyhow::Result<()> {
        self.tx
            .send(record)
            .await
            .map_err(|_| anyhow::anyhow!("transport channel closed"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::{Map, Value};

    fn record(name: &str) -> EventRecord {
        EventRecord {
            id: "1".to_string(),
            group_id: None,
            name: name.to_string(),
            path: name.to_string(),
            created_at: Utc::now(),
            creator: None,
            context: Map::new(),
            trace: None,
            data: Value::Null,
        }
    }

    #[tokio::test]
    async fn test_publish_after_receiver_dropped() {
        let (transport, rx) = ChannelTransport::new(1);
        drop(rx);
        let error = transport.publish(record("lost")).await.unwrap_err();
        assert_eq!(error.to_string(), "transport channel closed");
    }
}
