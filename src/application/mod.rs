//! Application layer orchestrating request validation, rendering and signing.
//!
//! `MessageBuilder` turns a request into the message model; `Pacs008Pipeline`
//! chains it with the XML serializer and the signature engine, and optionally
//! hands the result to a `MessagePublisher`.

pub mod builder;
pub mod pipeline;
