use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{EntityId, EntityKind};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeType {
    Created,
    Updated,
    Deleted,
}

/// Published after every successful write so open views can refresh.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DataChangedEvent {
    pub entity: EntityKind,
    pub change: ChangeType,
    pub entity_id: EntityId,
    pub occurred_at: DateTime<Utc>,
}

impl DataChangedEvent {
    pub fn now(entity: EntityKind, change: ChangeType, entity_id: EntityId) -> Self {
        Self {
            entity,
            change,
            entity_id,
            occurred_at: Utc::now(),
        }
    }
}

#[async_trait]
pub trait ChangeNotifier: Send + Sync {
    async fn publish(&self, event: &DataChangedEvent) -> anyhow::Result<()>;
}

#[derive(Debug, Default)]
pub struct NoopNotifier;

#[async_trait]
impl ChangeNotifier for NoopNotifier {
    async fn publish(&self, _event: &DataChangedEvent) -> anyhow::Result<()> {
        Ok(())
    }
}
