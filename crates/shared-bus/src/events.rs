//! # Settlement Events
//!
//! Events emitted by the settlement pipelines. The serialized form is the
//! webhook body: `{eventType, id, model, modelType}`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared_types::TxId;
use std::fmt;

/// Kind of change being announced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// A transaction was accepted by the network.
    Broadcast,
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventType::Broadcast => f.write_str("broadcast"),
        }
    }
}

/// A notification about one model instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncEvent {
    pub event_type: EventType,
    pub id: TxId,
    /// Snapshot of the model at the time of the event.
    pub model: Value,
    pub model_type: String,
}

impl SyncEvent {
    pub fn new(
        event_type: EventType,
        model_type: impl Into<String>,
        id: impl Into<TxId>,
        model: Value,
    ) -> Self {
        Self {
            event_type,
            id: id.into(),
            model,
            model_type: model_type.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_webhook_body_shape() {
        let event = SyncEvent::new(
            EventType::Broadcast,
            "sync_transaction",
            "abc",
            json!({"id": "abc"}),
        );

        let body = serde_json::to_value(&event).unwrap();
        assert_eq!(
            body,
            json!({
                "eventType": "broadcast",
                "id": "abc",
                "model": {"id": "abc"},
                "modelType": "sync_transaction",
            })
        );
    }
}
