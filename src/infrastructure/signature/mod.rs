//! # Enveloped XML signatures (XMLDSig)
//!
//! Signature profile expected by the SPI:
//!
//! | Step | Algorithm |
//! |---|---|
//! | Canonicalization | inclusive C14N 1.0, no comments |
//! | Reference | `URI=""`, enveloped-signature transform |
//! | Digest | SHA-256 |
//! | Signature | RSASSA-PKCS1-v1_5 with SHA-256 |
//! | Key info | X.509 subject name and DER certificate |
//!
//! The digest covers the whole document minus the `Signature` element, so
//! the signature never signs itself.

pub mod engine;
pub mod verifier;

pub use engine::SignatureEngine;
pub use verifier::{embedded_certificate, verify};

use crate::error::{Pacs008Error, Result};
use crate::infrastructure::xml::{self, CanonicalBytes, Element, canonicalize_document};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use sha2::{Digest, Sha256};

pub const XMLDSIG_NAMESPACE: &str = "http://www.w3.org/2000/09/xmldsig#";
pub const RSA_SHA256_ALGORITHM: &str = "http://www.w3.org/2001/04/xmldsig-more#rsa-sha256";
pub const SHA256_ALGORITHM: &str = "http://www.w3.org/2001/04/xmlenc#sha256";
pub const ENVELOPED_SIGNATURE_TRANSFORM: &str =
    "http://www.w3.org/2000/09/xmldsig#enveloped-signature";

pub(crate) const SIGNATURE_ELEMENT: &str = "Signature";

fn parse_document(xml: &[u8]) -> Result<Element> {
    xml::parse(xml).map_err(|e| Pacs008Error::signature(format!("cannot parse document: {e}")))
}

/// Canonical form of the document after the enveloped-signature transform.
fn enveloped_canonical_form(root: &Element) -> CanonicalBytes {
    canonicalize_document(root, Some((XMLDSIG_NAMESPACE, SIGNATURE_ELEMENT)))
}

fn sha256(data: &CanonicalBytes) -> Vec<u8> {
    Sha256::digest(data.as_bytes()).to_vec()
}

fn encode_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decodes base64 element content, tolerating line wrapping.
fn decode_base64(field: &str, text: &str) -> Result<Vec<u8>> {
    let compact: String = text.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    STANDARD
        .decode(compact)
        .map_err(|e| Pacs008Error::signature(format!("{field} is not valid base64: {e}")))
}
