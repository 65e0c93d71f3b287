//! # Canonical XML 1.0 (inclusive, without comments)
//!
//! `CanonicalBytes` is the only input accepted by the digest and signature
//! primitives, so every byte that gets hashed or signed has gone through
//! this renderer.
//!
//! Implemented rules:
//!
//! - no XML declaration, UTF-8 output, comments dropped;
//! - empty elements rendered as start/end tag pairs;
//! - namespace declarations rendered only where they differ from what the
//!   nearest rendered ancestor already declared, sorted by prefix with the
//!   default namespace first; `xmlns=""` only when undeclaring a rendered
//!   default;
//! - attributes sorted by namespace URI then local name;
//! - text escapes `&`, `<`, `>` and CR; attribute values escape `&`, `<`,
//!   `"`, TAB, LF and CR.
//!
//! A subtree is canonicalized as a document subset: the apex renders every
//! namespace binding it inherits. Inherited `xml:*` attributes are not
//! propagated; the documents this crate signs do not use them.

use super::tree::{Element, Namespaces, Node, XmlError};

pub const C14N_ALGORITHM: &str = "http://www.w3.org/TR/2001/REC-xml-c14n-20010315";

/// Bytes produced exclusively by [`canonicalize_document`] or
/// [`canonicalize_subtree`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalBytes(Vec<u8>);

impl CanonicalBytes {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Expanded name `(namespace URI, local name)` of elements to leave out,
/// together with their whole subtree.
pub type Exclusion<'a> = Option<(&'a str, &'a str)>;

/// Canonicalizes the document rooted at `root`, omitting elements that
/// match `exclude`.
pub fn canonicalize_document(root: &Element, exclude: Exclusion<'_>) -> CanonicalBytes {
    let mut out = String::new();
    render_element(root, &Namespaces::new(), &Namespaces::new(), exclude, &mut out);
    CanonicalBytes(out.into_bytes())
}

/// Canonicalizes the element at `path` as a document subset.
pub fn canonicalize_subtree(root: &Element, path: &[usize]) -> Result<CanonicalBytes, XmlError> {
    let missing = || XmlError::Structure(format!("no element at path {path:?}"));
    let apex = root.at_path(path).ok_or_else(missing)?;
    let inherited = root.inherited_scope(path).ok_or_else(missing)?;
    let mut out = String::new();
    render_element(apex, &inherited, &Namespaces::new(), None, &mut out);
    Ok(CanonicalBytes(out.into_bytes()))
}

fn render_element(
    element: &Element,
    parent_scope: &Namespaces,
    rendered: &Namespaces,
    exclude: Exclusion<'_>,
    out: &mut String,
) {
    let scope = element.scope(parent_scope);
    if let Some((namespace, local_name)) = exclude {
        if element.local_name() == local_name && element.namespace(&scope) == namespace {
            return;
        }
    }

    let mut now_rendered = rendered.clone();
    out.push('<');
    out.push_str(&element.name);

    for (prefix, uri) in &scope {
        if prefix == "xml" {
            continue;
        }
        let already = rendered.get(prefix).map_or("", String::as_str);
        if uri == already {
            continue;
        }
        if prefix.is_empty() {
            out.push_str(" xmlns=\"");
        } else if uri.is_empty() {
            continue;
        } else {
            out.push_str(" xmlns:");
            out.push_str(prefix);
            out.push_str("=\"");
        }
        escape_attribute(uri, out);
        out.push('"');
        now_rendered.insert(prefix.clone(), uri.clone());
    }

    let mut attributes: Vec<(&str, &str, &str, &str)> = element
        .attributes
        .iter()
        .filter(|(key, _)| key != "xmlns" && !key.starts_with("xmlns:"))
        .map(|(key, value)| {
            let (namespace, local) = match key.split_once(':') {
                Some(("xml", local)) => ("http://www.w3.org/XML/1998/namespace", local),
                Some((prefix, local)) => (scope.get(prefix).map_or("", String::as_str), local),
                None => ("", key.as_str()),
            };
            (namespace, local, key.as_str(), value.as_str())
        })
        .collect();
    attributes.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));
    for (_, _, key, value) in attributes {
        out.push(' ');
        out.push_str(key);
        out.push_str("=\"");
        escape_attribute(value, out);
        out.push('"');
    }
    out.push('>');

    for child in &element.children {
        match child {
            Node::Element(child) => render_element(child, &scope, &now_rendered, exclude, out),
            Node::Text(text) => escape_text(text, out),
            Node::Comment(_) => {}
            Node::ProcessingInstruction(content) => {
                out.push_str("<?");
                out.push_str(content.trim_end());
                out.push_str("?>");
            }
        }
    }

    out.push_str("</");
    out.push_str(&element.name);
    out.push('>');
}

fn escape_text(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\r' => out.push_str("&#xD;"),
            other => out.push(other),
        }
    }
}

fn escape_attribute(value: &str, out: &mut String) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '"' => out.push_str("&quot;"),
            '\t' => out.push_str("&#x9;"),
            '\n' => out.push_str("&#xA;"),
            '\r' => out.push_str("&#xD;"),
            other => out.push(other),
        }
    }
}
