// Notification event types
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    AppointmentBooked,
    AppointmentStatusChanged,
    RecordRequestApproved,
    RecordRequestDenied,
}

impl NotificationKind {
    /// Subject the delivery subsystem routes on
    pub fn subject(&self) -> &'static str {
        match self {
            NotificationKind::AppointmentBooked => "notify.appointment.booked",
            NotificationKind::AppointmentStatusChanged => "notify.appointment.status",
            NotificationKind::RecordRequestApproved => "notify.record_request.approved",
            NotificationKind::RecordRequestDenied => "notify.record_request.denied",
        }
    }
}

/// Reference to the entity a notification is about
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelatedEntity {
    pub entity_type: String,
    pub entity_id: Uuid,
}

impl RelatedEntity {
    pub fn appointment(id: Uuid) -> Self {
        Self {
            entity_type: "appointment".to_string(),
            entity_id: id,
        }
    }

    pub fn record_request(id: Uuid) -> Self {
        Self {
            entity_type: "record_request".to_string(),
            entity_id: id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub id: Uuid,
    pub recipient_id: Uuid,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub related: Option<RelatedEntity>,
    pub created_at: DateTime<Utc>,
}

impl NotificationEvent {
    pub fn new(
        recipient_id: Uuid,
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            recipient_id,
            kind,
            title: title.into(),
            message: message.into(),
            related: None,
            created_at: Utc::now(),
        }
    }

    pub fn about(mut self, related: RelatedEntity) -> Self {
        self.related = Some(related);
        self
    }
}
