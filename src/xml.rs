//! An owned XML element tree.
//!
//! A DMR++ document is parsed once into an [`XmlDocument`], an arena of elements built from [`quick_xml`] events.
//! Elements are addressed by [`NodeId`], a plain index that DAP variables record as a back-reference to the element they were built from.
//!
//! Element and attribute names are matched by local name (the part after the last `:`), so `chunks` matches `dmrpp:chunks`.

use std::path::Path;

use quick_xml::{events::Event, Reader};
use thiserror::Error;

/// An XML parse error.
#[derive(Debug, Error)]
pub enum XmlError {
    /// The document could not be read.
    #[error("could not read XML document {path}: {source}")]
    Io {
        /// The document path.
        path: String,
        /// The underlying error.
        source: std::io::Error,
    },
    /// The document is malformed.
    #[error("XML parse error at position {position}: {message}")]
    Malformed {
        /// The byte position of the error.
        position: u64,
        /// The error message.
        message: String,
    },
    /// The document has no root element.
    #[error("XML document has no root element")]
    NoRoot,
    /// The document has more than one root element.
    #[error("XML document has more than one root element, found '{0}'")]
    MultipleRoots(String),
    /// An element was not closed before the end of the document.
    #[error("XML element '{0}' is not closed")]
    Unclosed(String),
}

/// The identifier of an element within an [`XmlDocument`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug)]
struct XmlElement {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
    text: String,
}

/// A parsed XML document.
#[derive(Debug)]
pub struct XmlDocument {
    elements: Vec<XmlElement>,
    root: NodeId,
}

/// Return the part of `name` after the last `:`.
#[must_use]
pub fn local_name(name: &str) -> &str {
    name.rsplit_once(':').map_or(name, |(_, local)| local)
}

impl XmlDocument {
    /// Parse an XML document from a string.
    ///
    /// Whitespace in text content is preserved and entities are unescaped.
    ///
    /// # Errors
    /// Returns an [`XmlError`] if the document is malformed or has no root element.
    pub fn parse_str(xml: &str) -> Result<Self, XmlError> {
        let mut reader = Reader::from_str(xml);
        let malformed = |reader: &Reader<&[u8]>, message: String| XmlError::Malformed {
            position: u64::try_from(reader.buffer_position()).unwrap_or(u64::MAX),
            message,
        };

        let mut elements: Vec<XmlElement> = Vec::new();
        let mut stack: Vec<NodeId> = Vec::new();
        let mut root = None;
        loop {
            let event = reader
                .read_event()
                .map_err(|err| malformed(&reader, err.to_string()))?;
            match event {
                Event::Start(ref start) | Event::Empty(ref start) => {
                    let name = std::str::from_utf8(start.name().as_ref())
                        .map_err(|err| malformed(&reader, err.to_string()))?
                        .to_string();
                    let mut attributes = Vec::new();
                    for attribute in start.attributes() {
                        let attribute =
                            attribute.map_err(|err| malformed(&reader, err.to_string()))?;
                        let key = std::str::from_utf8(attribute.key.as_ref())
                            .map_err(|err| malformed(&reader, err.to_string()))?
                            .to_string();
                        let value = attribute
                            .unescape_value()
                            .map_err(|err| malformed(&reader, err.to_string()))?
                            .into_owned();
                        attributes.push((key, value));
                    }

                    let id = NodeId(elements.len());
                    let parent = stack.last().copied();
                    match parent {
                        Some(parent) => elements[parent.0].children.push(id),
                        None if root.is_none() => root = Some(id),
                        None => return Err(XmlError::MultipleRoots(name)),
                    }
                    elements.push(XmlElement {
                        name,
                        attributes,
                        children: Vec::new(),
                        parent,
                        text: String::new(),
                    });
                    if matches!(event, Event::Start(_)) {
                        stack.push(id);
                    }
                }
                Event::End(_) => {
                    stack.pop();
                }
                Event::Text(text) => {
                    if let Some(current) = stack.last() {
                        let text = text
                            .unescape()
                            .map_err(|err| malformed(&reader, err.to_string()))?;
                        elements[current.0].text.push_str(&text);
                    }
                }
                Event::CData(cdata) => {
                    if let Some(current) = stack.last() {
                        let text = std::str::from_utf8(&cdata)
                            .map_err(|err| malformed(&reader, err.to_string()))?;
                        elements[current.0].text.push_str(text);
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if let Some(unclosed) = stack.last() {
            return Err(XmlError::Unclosed(elements[unclosed.0].name.clone()));
        }
        let root = root.ok_or(XmlError::NoRoot)?;
        tracing::trace!(elements = elements.len(), "parsed XML document");
        Ok(Self { elements, root })
    }

    /// Read and parse the XML document at `path`.
    ///
    /// # Errors
    /// Returns an [`XmlError`] if the file cannot be read or the document is malformed or has no root element.
    pub fn parse_file(path: impl AsRef<Path>) -> Result<Self, XmlError> {
        let path = path.as_ref();
        let xml = std::fs::read_to_string(path).map_err(|source| XmlError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse_str(&xml)
    }

    /// Return the root element.
    #[must_use]
    pub fn root(&self) -> XmlNode<'_> {
        XmlNode {
            document: self,
            id: self.root,
        }
    }

    /// Return the element with identifier `id`, if it belongs to this document.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<XmlNode<'_>> {
        (id.0 < self.elements.len()).then_some(XmlNode { document: self, id })
    }

    /// Return the number of elements in the document.
    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Returns true if the document has no elements. A parsed document always has a root.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

/// A borrowed element of an [`XmlDocument`].
#[derive(Copy, Clone, Debug)]
pub struct XmlNode<'a> {
    document: &'a XmlDocument,
    id: NodeId,
}

impl<'a> XmlNode<'a> {
    fn element(&self) -> &'a XmlElement {
        &self.document.elements[self.id.0]
    }

    /// Return the identifier of the element.
    #[must_use]
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Return the qualified name of the element, e.g. `dmrpp:chunks`.
    #[must_use]
    pub fn name(&self) -> &'a str {
        &self.element().name
    }

    /// Return the local name of the element, e.g. `chunks`.
    #[must_use]
    pub fn local_name(&self) -> &'a str {
        local_name(self.name())
    }

    /// Returns true if the local name of the element is `name`.
    #[must_use]
    pub fn is(&self, name: &str) -> bool {
        self.local_name() == name
    }

    /// Return the value of the attribute `name`.
    ///
    /// An attribute whose qualified name is `name` is preferred, otherwise the first attribute with local name `name` is returned.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&'a str> {
        let attributes = &self.element().attributes;
        attributes
            .iter()
            .find(|(key, _)| key == name)
            .or_else(|| attributes.iter().find(|(key, _)| local_name(key) == name))
            .map(|(_, value)| value.as_str())
    }

    /// Return the attributes of the element as `(qualified name, value)` pairs in document order.
    pub fn attributes(&self) -> impl Iterator<Item = (&'a str, &'a str)> {
        self.element()
            .attributes
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// Return the concatenated text and CDATA content directly inside the element.
    #[must_use]
    pub fn text(&self) -> &'a str {
        &self.element().text
    }

    /// Return the parent element, or [`None`] for the root.
    #[must_use]
    pub fn parent(&self) -> Option<XmlNode<'a>> {
        let document = self.document;
        self.element()
            .parent
            .map(|id| XmlNode { document, id })
    }

    /// Return the child elements in document order.
    pub fn children(&self) -> impl Iterator<Item = XmlNode<'a>> + 'a {
        let document = self.document;
        self.element()
            .children
            .iter()
            .map(move |&id| XmlNode { document, id })
    }

    /// Return the child elements with local name `name` in document order.
    pub fn children_named<'n>(&self, name: &'n str) -> impl Iterator<Item = XmlNode<'a>> + 'n
    where
        'a: 'n,
    {
        self.children().filter(move |child| child.is(name))
    }

    /// Return the first child element with local name `name`.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<XmlNode<'a>> {
        self.children().find(|child| child.is(name))
    }

    /// Return the number of child elements.
    #[must_use]
    pub fn num_children(&self) -> usize {
        self.element().children.len()
    }
}
