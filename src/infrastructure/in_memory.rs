use crate::domain::ports::{MessagePublisher, PublishAck};
use crate::error::Result;
use crate::infrastructure::reject_blank;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe publisher that keeps every message in memory.
///
/// Uses `Arc<RwLock<Vec<(String, String)>>>` so clones share the same log of
/// `(destination, message)` pairs. Meant for tests and dry runs.
#[derive(Default, Clone)]
pub struct InMemoryPublisher {
    published: Arc<RwLock<Vec<(String, String)>>>,
}

impl InMemoryPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the published `(destination, message)` pairs, oldest first.
    pub async fn published(&self) -> Vec<(String, String)> {
        self.published.read().await.clone()
    }
}

#[async_trait]
impl MessagePublisher for InMemoryPublisher {
    async fn publish(&self, message: &str, destination: &str) -> Result<PublishAck> {
        reject_blank(message)?;
        let mut published = self.published.write().await;
        published.push((destination.to_string(), message.to_string()));
        Ok(PublishAck {
            destination: destination.to_string(),
            receipt: published.len().to_string(),
        })
    }
}
