//! Domain layer: value objects, the message model and the outbound port.

pub mod amount;
pub mod codes;
pub mod identifiers;
pub mod message;
pub mod ports;
pub mod request;
