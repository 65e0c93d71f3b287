use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::escape::{partial_escape, unescape};
use quick_xml::events::{BytesDecl, BytesEnd, BytesPI, BytesStart, BytesText, Event};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::io::Write;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum XmlError {
    #[error("malformed XML: {0}")]
    Malformed(#[from] quick_xml::Error),
    #[error("malformed attribute: {0}")]
    Attribute(#[from] quick_xml::events::attributes::AttrError),
    #[error("malformed character reference: {0}")]
    Escape(#[from] quick_xml::escape::EscapeError),
    #[error("document is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Structure(String),
}

/// A node of the owned document tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
    Comment(String),
    ProcessingInstruction(String),
}

/// An element with its qualified name, attributes in document order
/// (namespace declarations included) and children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
}

/// Prefix to namespace URI bindings in scope at some element; the default
/// namespace is bound to the empty prefix.
pub type Namespaces = BTreeMap<String, String>;

/// Child-index path from the root to an element.
pub type ElementPath = Vec<usize>;

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// An element holding a single text node, or nothing when `text` is empty.
    pub fn leaf(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(name).with_text(text)
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(Node::Element(child));
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        let text = text.into();
        if !text.is_empty() {
            self.children.push(Node::Text(text));
        }
        self
    }

    pub fn push(&mut self, child: Element) {
        self.children.push(Node::Element(child));
    }

    pub fn prefix(&self) -> &str {
        self.name.split_once(':').map_or("", |(prefix, _)| prefix)
    }

    pub fn local_name(&self) -> &str {
        self.name.split_once(':').map_or(&self.name, |(_, local)| local)
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }

    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(element) => Some(element),
            _ => None,
        })
    }

    /// First child element with the given local name.
    pub fn child(&self, local_name: &str) -> Option<&Element> {
        self.elements().find(|e| e.local_name() == local_name)
    }

    /// Index in `children` of the first child element with the given local name.
    pub fn child_index(&self, local_name: &str) -> Option<usize> {
        self.children.iter().position(|node| {
            matches!(node, Node::Element(element) if element.local_name() == local_name)
        })
    }

    pub fn has_element_children(&self) -> bool {
        self.elements().next().is_some()
    }

    /// Concatenated text of the direct text children.
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|node| match node {
                Node::Text(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Namespace declarations made on this element, as `(prefix, uri)`.
    pub fn namespace_declarations(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes.iter().filter_map(|(key, value)| {
            if key == "xmlns" {
                Some(("", value.as_str()))
            } else {
                key.strip_prefix("xmlns:")
                    .map(|prefix| (prefix, value.as_str()))
            }
        })
    }

    /// `parent` extended with the declarations made on this element.
    pub fn scope(&self, parent: &Namespaces) -> Namespaces {
        let mut scope = parent.clone();
        for (prefix, uri) in self.namespace_declarations() {
            scope.insert(prefix.to_string(), uri.to_string());
        }
        scope
    }

    /// Namespace URI of this element under `scope` (its own scope).
    pub fn namespace<'a>(&self, scope: &'a Namespaces) -> &'a str {
        scope.get(self.prefix()).map_or("", String::as_str)
    }

    /// Paths of every element (self included) whose expanded name is
    /// `{namespace}local_name`, in document order.
    pub fn find_all(&self, namespace: &str, local_name: &str) -> Vec<ElementPath> {
        let mut found = Vec::new();
        let mut path = Vec::new();
        self.collect_matches(&Namespaces::new(), namespace, local_name, &mut path, &mut found);
        found
    }

    fn collect_matches(
        &self,
        parent: &Namespaces,
        namespace: &str,
        local_name: &str,
        path: &mut ElementPath,
        found: &mut Vec<ElementPath>,
    ) {
        let scope = self.scope(parent);
        if self.local_name() == local_name && self.namespace(&scope) == namespace {
            found.push(path.clone());
        }
        for (index, node) in self.children.iter().enumerate() {
            if let Node::Element(child) = node {
                path.push(index);
                child.collect_matches(&scope, namespace, local_name, path, found);
                path.pop();
            }
        }
    }

    pub fn at_path(&self, path: &[usize]) -> Option<&Element> {
        path.iter()
            .try_fold(self, |element, &index| match element.children.get(index) {
                Some(Node::Element(child)) => Some(child),
                _ => None,
            })
    }

    pub fn at_path_mut(&mut self, path: &[usize]) -> Option<&mut Element> {
        let mut element = self;
        for &index in path {
            element = match element.children.get_mut(index) {
                Some(Node::Element(child)) => child,
                _ => return None,
            };
        }
        Some(element)
    }

    /// Namespaces in scope for the children of the ancestors of `path`,
    /// i.e. what the element at `path` inherits.
    pub fn inherited_scope(&self, path: &[usize]) -> Option<Namespaces> {
        let mut scope = Namespaces::new();
        let mut element = self;
        for &index in path {
            scope = element.scope(&scope);
            element = match element.children.get(index) {
                Some(Node::Element(child)) => child,
                _ => return None,
            };
        }
        Some(scope)
    }
}

/// Parses a UTF-8 document into its root element.
///
/// Whitespace, comments and processing instructions inside the root are
/// kept so the tree can be written back unchanged. Anything outside the
/// root element other than the XML declaration is dropped.
///
/// Line endings are folded to LF before parsing and literal whitespace in
/// attribute values becomes a space, as an XML processor must do. Only CRs
/// written as character references survive into the tree.
pub fn parse(bytes: &[u8]) -> Result<Element, XmlError> {
    let text = std::str::from_utf8(bytes)?;
    let text = if text.contains('\r') {
        Cow::Owned(text.replace("\r\n", "\n").replace('\r', "\n"))
    } else {
        Cow::Borrowed(text)
    };
    let mut reader = Reader::from_str(&text);
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event()? {
            Event::Start(start) => stack.push(open(&start)?),
            Event::Empty(start) => {
                let element = open(&start)?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| XmlError::Structure("unbalanced end tag".to_string()))?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::Text(text) => {
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(Node::Text(text.unescape()?.into_owned()));
                }
            }
            Event::CData(cdata) => {
                if let Some(parent) = stack.last_mut() {
                    parent
                        .children
                        .push(Node::Text(std::str::from_utf8(&cdata)?.to_string()));
                }
            }
            Event::Comment(comment) => {
                if let Some(parent) = stack.last_mut() {
                    parent
                        .children
                        .push(Node::Comment(std::str::from_utf8(&comment)?.to_string()));
                }
            }
            Event::PI(pi) => {
                if let Some(parent) = stack.last_mut() {
                    parent
                        .children
                        .push(Node::ProcessingInstruction(std::str::from_utf8(&pi)?.to_string()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(XmlError::Structure("unclosed element".to_string()));
    }
    root.ok_or_else(|| XmlError::Structure("document has no root element".to_string()))
}

fn open(start: &BytesStart<'_>) -> Result<Element, XmlError> {
    let mut element = Element::new(std::str::from_utf8(start.name().as_ref())?);
    for attribute in start.attributes() {
        let attribute = attribute?;
        let key = std::str::from_utf8(attribute.key.as_ref())?.to_string();
        let raw = std::str::from_utf8(&attribute.value)?.replace(['\t', '\n'], " ");
        let value = unescape(&raw)?.into_owned();
        element.attributes.push((key, value));
    }
    Ok(element)
}

fn attach(
    stack: &mut [Element],
    root: &mut Option<Element>,
    element: Element,
) -> Result<(), XmlError> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(Node::Element(element)),
        None if root.is_none() => *root = Some(element),
        None => return Err(XmlError::Structure("multiple root elements".to_string())),
    }
    Ok(())
}

/// Writes the tree as a UTF-8 document with an XML declaration.
///
/// With `indent` every element starts on its own line, two spaces per
/// level; this is only meant for trees without whitespace text nodes.
/// Without it, the tree's own text nodes are written back verbatim.
pub fn write(root: &Element, indent: bool) -> Result<Vec<u8>, XmlError> {
    let mut writer = if indent {
        Writer::new_with_indent(Vec::new(), b' ', 2)
    } else {
        Writer::new(Vec::new())
    };
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    if !indent {
        writer.get_mut().write_all(b"\n")?;
    }
    write_element(&mut writer, root)?;
    Ok(writer.into_inner())
}

fn write_element<W: Write>(writer: &mut Writer<W>, element: &Element) -> Result<(), XmlError> {
    let mut start = BytesStart::new(element.name.as_str());
    for (key, value) in &element.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }
    if element.children.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }

    writer.write_event(Event::Start(start))?;
    for child in &element.children {
        match child {
            Node::Element(child) => write_element(writer, child)?,
            Node::Text(text) => {
                let escaped = partial_escape(text).replace('\r', "&#xD;");
                writer.write_event(Event::Text(BytesText::from_escaped(escaped)))?
            }
            Node::Comment(comment) => {
                writer.write_event(Event::Comment(BytesText::from_escaped(comment.as_str())))?
            }
            Node::ProcessingInstruction(content) => {
                writer.write_event(Event::PI(BytesPI::new(content.as_str())))?
            }
        }
    }
    writer.write_event(Event::End(BytesEnd::new(element.name.as_str())))?;
    Ok(())
}
