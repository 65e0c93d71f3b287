use crate::error::Pacs008Error;
use chrono::{DateTime, Utc};
use std::fmt;
use uuid::Uuid;

/// Network-mandated maximum length for `MsgId`, `BizMsgIdr` and `EndToEndId`.
pub const MAX_IDENTIFIER_LEN: usize = 35;

pub const MESSAGE_ID_PREFIX: char = 'M';
pub const END_TO_END_ID_PREFIX: char = 'E';

/// Length of every message ID: prefix, ISPB, random suffix.
pub const MESSAGE_ID_LEN: usize = 32;
/// Length of every end-to-end ID: prefix, ISPB, timestamp, random suffix.
pub const END_TO_END_ID_LEN: usize = 32;

const ISPB_LEN: usize = 8;
const TIMESTAMP_LEN: usize = 14;
const MESSAGE_ID_SUFFIX_LEN: usize = MESSAGE_ID_LEN - 1 - ISPB_LEN;
const END_TO_END_ID_SUFFIX_LEN: usize = END_TO_END_ID_LEN - 1 - ISPB_LEN - TIMESTAMP_LEN;

const BASE36: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// ISPB: the 8-digit clearing-system member ID of an institution.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ispb(String);

impl Ispb {
    pub fn parse(field: &'static str, raw: &str) -> Result<Self, Pacs008Error> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(Pacs008Error::validation(field, "is required"));
        }
        if raw.len() != ISPB_LEN || !raw.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Pacs008Error::validation(
                field,
                format!("must be exactly {ISPB_LEN} digits"),
            ));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Ispb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageId(String);

impl MessageId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EndToEndId(String);

impl EndToEndId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The `yyyyMMddHHmmss` segment embedded after the ISPB.
    pub fn timestamp_segment(&self) -> &str {
        &self.0[1 + ISPB_LEN..1 + ISPB_LEN + TIMESTAMP_LEN]
    }
}

impl fmt::Display for EndToEndId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Mints message and end-to-end identifiers.
///
/// Uniqueness is probabilistic: every suffix is cut from a fresh UUID v4,
/// which draws 122 bits from the operating system CSPRNG. The generator
/// holds no state and can be shared freely between threads.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentifierGenerator;

impl IdentifierGenerator {
    pub fn new() -> Self {
        Self
    }

    /// `M` + ISPB + 23 uppercase base-36 characters.
    pub fn message_id(&self, ispb: &Ispb) -> MessageId {
        let mut id = String::with_capacity(MESSAGE_ID_LEN);
        id.push(MESSAGE_ID_PREFIX);
        id.push_str(ispb.as_str());
        id.push_str(&random_suffix(MESSAGE_ID_SUFFIX_LEN));
        id.truncate(MAX_IDENTIFIER_LEN);
        MessageId(id)
    }

    /// `E` + ISPB + `yyyyMMddHHmmss` (UTC) + 9 uppercase base-36 characters.
    pub fn end_to_end_id_at(&self, ispb: &Ispb, at: DateTime<Utc>) -> EndToEndId {
        let mut id = String::with_capacity(END_TO_END_ID_LEN);
        id.push(END_TO_END_ID_PREFIX);
        id.push_str(ispb.as_str());
        id.push_str(&at.format("%Y%m%d%H%M%S").to_string());
        id.push_str(&random_suffix(END_TO_END_ID_SUFFIX_LEN));
        id.truncate(MAX_IDENTIFIER_LEN);
        EndToEndId(id)
    }
}

fn random_suffix(len: usize) -> String {
    encode_base36(Uuid::new_v4().as_u128(), len)
}

/// Takes the `len` least significant base-36 digits of `value`.
fn encode_base36(mut value: u128, len: usize) -> String {
    let mut digits = Vec::with_capacity(len);
    for _ in 0..len {
        digits.push(BASE36[(value % 36) as usize] as char);
        value /= 36;
    }
    digits.iter().rev().collect()
}
