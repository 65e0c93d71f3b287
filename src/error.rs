use thiserror::Error;

#[derive(Error, Debug)]
pub enum Pacs008Error {
    #[error("Validation error on `{field}`: {reason}")]
    ValidationError { field: &'static str, reason: String },
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("Keystore error: {0}")]
    KeystoreError(String),
    #[error("Signature error: {0}")]
    SignatureError(String),
    #[error("Transport error: {0}")]
    TransportError(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl Pacs008Error {
    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::ValidationError {
            field,
            reason: reason.into(),
        }
    }

    pub fn signature(reason: impl Into<String>) -> Self {
        Self::SignatureError(reason.into())
    }

    pub fn keystore(reason: impl Into<String>) -> Self {
        Self::KeystoreError(reason.into())
    }
}

pub type Result<T> = std::result::Result<T, Pacs008Error>;
