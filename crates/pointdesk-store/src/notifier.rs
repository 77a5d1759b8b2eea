use async_trait::async_trait;
use pointdesk_core::{ChangeNotifier, DataChangedEvent};
use tokio::sync::broadcast;
use tracing::debug;

const DEFAULT_CAPACITY: usize = 256;

/// In-process change feed; every subscriber sees each event once.
pub struct BroadcastNotifier {
    sender: broadcast::Sender<DataChangedEvent>,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DataChangedEvent> {
        self.sender.subscribe()
    }
}

impl Default for BroadcastNotifier {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[async_trait]
impl ChangeNotifier for BroadcastNotifier {
    async fn publish(&self, event: &DataChangedEvent) -> anyhow::Result<()> {
        // No subscribers is not a failure.
        if self.sender.send(event.clone()).is_err() {
            debug!("no listeners for {} {} change", event.entity, event.entity_id);
        }
        Ok(())
    }
}
