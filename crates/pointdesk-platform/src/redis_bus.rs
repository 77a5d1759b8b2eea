use anyhow::Result;
use async_trait::async_trait;
use pointdesk_core::{ChangeNotifier, DataChangedEvent};
use redis::{AsyncCommands, Client};
use serde::Serialize;
use tracing::debug;

pub const DATA_CHANGED_CHANNEL: &str = "pointdesk.data-changed";

/// Fans change events out to other desk processes over Redis pub/sub.
#[derive(Clone)]
pub struct RedisBus {
    client: Client,
}

impl RedisBus {
    pub fn connect(redis_url: &str) -> Result<Self> {
        let client = Client::open(redis_url)?;
        Ok(Self { client })
    }

    pub async fn publish_json<T: Serialize>(&self, channel: &str, payload: &T) -> Result<()> {
        let mut connection = self.client.get_multiplexed_async_connection().await?;
        let serialized = serde_json::to_string(payload)?;
        let receivers: i64 = connection.publish(channel, serialized).await?;
        debug!("published to {channel}, {receivers} receiver(s)");
        Ok(())
    }
}

#[async_trait]
impl ChangeNotifier for RedisBus {
    async fn publish(&self, event: &DataChangedEvent) -> Result<()> {
        self.publish_json(DATA_CHANGED_CHANNEL, event).await
    }
}
