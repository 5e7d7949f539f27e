use thiserror::Error;

#[derive(Error, Debug)]
pub enum EventBusError {
    #[error("broker connection failed: {0}")]
    ConnectionFailed(String),

    #[error("event serialization failed: {0}")]
    Serialization(String),

    #[error("publish failed: {0}")]
    PublishFailed(String),
}

pub type EventBusResult<T> = std::result::Result<T, EventBusError>;
