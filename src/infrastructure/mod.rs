//! Adapters: XML rendering, key material, signatures and message sinks.

pub mod in_memory;
pub mod keystore;
pub mod serializer;
pub mod signature;
pub mod spool;
pub mod xml;

use crate::error::{Pacs008Error, Result};

fn reject_blank(message: &str) -> Result<()> {
    if message.trim().is_empty() {
        return Err(Pacs008Error::TransportError(
            "refusing to publish an empty message".to_string(),
        ));
    }
    Ok(())
}
