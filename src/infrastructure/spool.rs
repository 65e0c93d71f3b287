use crate::domain::ports::{MessagePublisher, PublishAck};
use crate::error::{Pacs008Error, Result};
use crate::infrastructure::reject_blank;
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::debug;
use uuid::Uuid;

/// Publishes messages as files under `<root>/<destination>/<uuid>.xml`.
///
/// A queue bridge (or an operator) picks the files up from there. Each file
/// is written under a temporary name and renamed, so a reader never sees a
/// half-written message.
#[derive(Debug, Clone)]
pub struct SpoolDirectoryPublisher {
    root: PathBuf,
}

impl SpoolDirectoryPublisher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl MessagePublisher for SpoolDirectoryPublisher {
    async fn publish(&self, message: &str, destination: &str) -> Result<PublishAck> {
        reject_blank(message)?;
        let valid_destination = !destination.is_empty()
            && destination
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
            && destination != "."
            && destination != "..";
        if !valid_destination {
            return Err(Pacs008Error::TransportError(format!(
                "invalid destination `{destination}`"
            )));
        }

        let directory = self.root.join(destination);
        let receipt = Uuid::new_v4().to_string();
        let staging = directory.join(format!(".{receipt}.tmp"));
        let target = directory.join(format!("{receipt}.xml"));

        let spool_error =
            |e: std::io::Error| Pacs008Error::TransportError(format!("spool write failed: {e}"));
        tokio::fs::create_dir_all(&directory).await.map_err(spool_error)?;
        tokio::fs::write(&staging, message).await.map_err(spool_error)?;
        tokio::fs::rename(&staging, &target).await.map_err(spool_error)?;

        debug!(path = %target.display(), "message spooled");
        Ok(PublishAck {
            destination: destination.to_string(),
            receipt,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_spool_writes_one_file_per_message() {
        let dir = tempdir().unwrap();
        let publisher = SpoolDirectoryPublisher::new(dir.path());

        let first = publisher.publish("<a/>", "pix-out").await.unwrap();
        let second = publisher.publish("<b/>", "pix-out").await.unwrap();
        assert_ne!(first.receipt, second.receipt);

        let path = dir.path().join("pix-out").join(format!("{}.xml", first.receipt));
        assert_eq!(std::fs::read_to_string(path).unwrap(), "<a/>");
        assert_eq!(std::fs::read_dir(dir.path().join("pix-out")).unwrap().count(), 2);
    }

    #[tokio::test]
    async fn test_spool_rejects_blank_messages_and_bad_destinations() {
        let dir = tempdir().unwrap();
        let publisher = SpoolDirectoryPublisher::new(dir.path());

        for (message, destination) in [("", "pix-out"), ("<a/>", "../escape"), ("<a/>", "")] {
            assert!(matches!(
                publisher.publish(message, destination).await,
                Err(Pacs008Error::TransportError(_))
            ));
        }
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
