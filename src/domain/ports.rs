use crate::error::Result;
use async_trait::async_trait;

/// Acknowledgement returned by a publisher once the sink accepted a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishAck {
    pub destination: String,
    pub receipt: String,
}

/// Outbound channel for signed messages (the SPI message queue in production).
///
/// The pipeline only hands messages over; delivery guarantees, retries and
/// credentials are the implementation's concern.
#[async_trait]
pub trait MessagePublisher: Send + Sync {
    async fn publish(&self, message: &str, destination: &str) -> Result<PublishAck>;
}

pub type MessagePublisherBox = Box<dyn MessagePublisher>;
