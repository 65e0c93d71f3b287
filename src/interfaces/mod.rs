//! Inbound adapters decoding external payloads into domain requests.

pub mod json;
