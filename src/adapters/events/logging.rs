//! Event publisher that writes envelopes to the log instead of a broker.
//!
//! Used by the binary when no broker is configured. Nothing is retained, so
//! a long-running service does not accumulate published events.

use async_trait::async_trait;
use tracing::{debug, info};

use crate::domain::foundation::{DomainError, EventEnvelope};
use crate::ports::EventPublisher;

#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingEventPublisher;

impl LoggingEventPublisher {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EventPublisher for LoggingEventPublisher {
    async fn publish(&self, event: EventEnvelope) -> Result<(), DomainError> {
        info!(
            event_id = %event.event_id,
            event_type = %event.event_type,
            aggregate_id = %event.aggregate_id,
            "Event published"
        );
        debug!(payload = %event.payload, "Event payload");
        Ok(())
    }

    async fn publish_all(&self, events: Vec<EventEnvelope>) -> Result<(), DomainError> {
        for event in events {
            self.publish(event).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{EventId, EventMetadata, Timestamp};
    use serde_json::json;

    fn envelope(event_type: &str) -> EventEnvelope {
        EventEnvelope {
            event_id: EventId::new(),
            event_type: event_type.to_string(),
            schema_version: 1,
            aggregate_id: "person-1".to_string(),
            aggregate_type: "Person".to_string(),
            occurred_at: Timestamp::now(),
            payload: json!({ "preferred": "person-1" }),
            metadata: EventMetadata::default(),
        }
    }

    #[tokio::test]
    async fn publish_succeeds_without_a_broker() {
        let publisher = LoggingEventPublisher::new();

        assert!(publisher.publish(envelope("identities.merged.v1")).await.is_ok());
    }

    #[tokio::test]
    async fn publish_all_accepts_empty_and_many() {
        let publisher = LoggingEventPublisher::new();

        assert!(publisher.publish_all(Vec::new()).await.is_ok());
        let events = vec![envelope("identities.merged.v1"), envelope("identities.merged.v1")];
        assert!(publisher.publish_all(events).await.is_ok());
    }
}
