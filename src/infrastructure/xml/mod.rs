//! Owned XML tree plus canonicalization, shared by the serializer and the
//! signature engine.

pub mod c14n;
pub mod tree;

pub use c14n::{C14N_ALGORITHM, CanonicalBytes, canonicalize_document, canonicalize_subtree};
pub use tree::{Element, ElementPath, Namespaces, Node, XmlError, parse, write};
