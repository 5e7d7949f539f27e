// NATS-backed notification publisher
use crate::error::{EventBusError, EventBusResult};
use crate::event::NotificationEvent;
use crate::publisher::NotificationPublisher;
use async_trait::async_trait;
use std::sync::Arc;

pub struct NatsPublisher {
    client: Arc<async_nats::Client>,
}

impl NatsPublisher {
    pub async fn connect(nats_url: &str) -> EventBusResult<Self> {
        let client = async_nats::connect(nats_url)
            .await
            .map_err(|e| EventBusError::ConnectionFailed(e.to_string()))?;

        Ok(Self {
            client: Arc::new(client),
        })
    }
}

#[async_trait]
impl NotificationPublisher for NatsPublisher {
    async fn publish(&self, event: &NotificationEvent) -> EventBusResult<()> {
        let subject = event.kind.subject().to_string();

        let mut headers = async_nats::HeaderMap::new();
        headers.insert("event_id", event.id.to_string().as_str());
        headers.insert("timestamp", event.created_at.to_rfc3339().as_str());
        headers.insert("recipient_id", event.recipient_id.to_string().as_str());
        // Notification bodies can reference clinical context
        headers.insert("phi_flag", "true");

        let payload = serde_json::to_vec(event)
            .map_err(|e| EventBusError::Serialization(e.to_string()))?;

        self.client
            .publish_with_headers(subject, headers, payload.into())
            .await
            .map_err(|e| EventBusError::PublishFailed(e.to_string()))?;

        Ok(())
    }
}
