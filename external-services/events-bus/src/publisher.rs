use crate::error::EventBusResult;
use crate::event::NotificationEvent;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Seam to the external notification delivery subsystem
#[async_trait]
pub trait NotificationPublisher: Send + Sync {
    async fn publish(&self, event: &NotificationEvent) -> EventBusResult<()>;
}

/// Publish fire-and-forget: delivery failure must never roll back the state
/// transition that produced the event, so errors are logged and dropped.
pub async fn emit(publisher: &dyn NotificationPublisher, event: NotificationEvent) {
    match publisher.publish(&event).await {
        Ok(()) => debug!(
            event_id = %event.id,
            kind = ?event.kind,
            recipient = %event.recipient_id,
            "notification published"
        ),
        Err(err) => warn!(
            event_id = %event.id,
            kind = ?event.kind,
            error = %err,
            "notification publish failed; state change is already committed"
        ),
    }
}

/// Collects published events; used by tests and local development.
#[derive(Default)]
pub struct InMemoryPublisher {
    events: Arc<Mutex<Vec<NotificationEvent>>>,
}

impl InMemoryPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn published(&self) -> Vec<NotificationEvent> {
        self.events.lock().await.clone()
    }
}

#[async_trait]
impl NotificationPublisher for InMemoryPublisher {
    async fn publish(&self, event: &NotificationEvent) -> EventBusResult<()> {
        self.events.lock().await.push(event.clone());
        Ok(())
    }
}

/// Drops every event; for callers that opt out of notifications.
pub struct NoopPublisher;

#[async_trait]
impl NotificationPublisher for NoopPublisher {
    async fn publish(&self, _event: &NotificationEvent) -> EventBusResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::NotificationKind;
    use uuid::Uuid;

    #[tokio::test]
    async fn in_memory_publisher_collects_events() {
        let publisher = InMemoryPublisher::new();
        let event = NotificationEvent::new(
            Uuid::new_v4(),
            NotificationKind::AppointmentBooked,
            "Appointment booked",
            "Your appointment is pending confirmation",
        );

        emit(&publisher, event.clone()).await;

        let published = publisher.published().await;
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].id, event.id);
    }
}
