//! Owned XML element tree for WordprocessingML parts.
//!
//! Start tags are kept as raw `BytesStart` so attributes round-trip untouched.
//! Text nodes stay escaped until a caller asks for their value.

use quick_xml::events::{BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use super::DocxError;

#[derive(Debug, Clone)]
pub enum Node {
    Element(Element),
    Text(BytesText<'static>),
    /// Declarations, comments, CDATA and processing instructions.
    Other(Event<'static>),
}

#[derive(Debug, Clone)]
pub struct Element {
    start: BytesStart<'static>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: &str) -> Self {
        Self {
            start: BytesStart::new(name.to_string()),
            children: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, key: &str, value: &str) -> Self {
        self.start.push_attribute((key, value));
        self
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.children
            .push(Node::Text(BytesText::new(text).into_owned()));
        self
    }

    pub fn name(&self) -> &[u8] {
        self.start.name().into_inner()
    }

    /// Unescaped value of an attribute, if present and well-formed.
    pub fn attribute(&self, key: &str) -> Option<String> {
        self.start
            .try_get_attribute(key)
            .ok()
            .flatten()
            .and_then(|attr| attr.unescape_value().ok().map(|v| v.into_owned()))
    }

    pub fn is(&self, name: &str) -> bool {
        self.name() == name.as_bytes()
    }

    /// Direct child elements with the given qualified name.
    pub fn children_named_mut<'a>(
        &'a mut self,
        name: &'a str,
    ) -> impl Iterator<Item = &'a mut Element> + 'a {
        self.children.iter_mut().filter_map(move |node| match node {
            Node::Element(el) if el.is(name) => Some(el),
            _ => None,
        })
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter_map(move |node| match node {
            Node::Element(el) if el.is(name) => Some(el),
            _ => None,
        })
    }

    pub fn child_named_mut(&mut self, name: &str) -> Option<&mut Element> {
        self.children.iter_mut().find_map(|node| match node {
            Node::Element(el) if el.is(name) => Some(el),
            _ => None,
        })
    }

    pub fn child_named(&self, name: &str) -> Option<&Element> {
        self.children.iter().find_map(|node| match node {
            Node::Element(el) if el.is(name) => Some(el),
            _ => None,
        })
    }

    /// Concatenated, unescaped text of the direct text children.
    pub fn text(&self) -> Result<String, DocxError> {
        let mut out = String::new();
        for node in &self.children {
            if let Node::Text(text) = node {
                out.push_str(&text.unescape().map_err(DocxError::xml)?);
            }
        }
        Ok(out)
    }

    fn write(&self, writer: &mut Writer<Vec<u8>>) -> Result<(), DocxError> {
        if self.children.is_empty() {
            writer
                .write_event(Event::Empty(self.start.borrow()))
                .map_err(DocxError::xml)?;
            return Ok(());
        }
        writer
            .write_event(Event::Start(self.start.borrow()))
            .map_err(DocxError::xml)?;
        for child in &self.children {
            write_node(child, writer)?;
        }
        writer
            .write_event(Event::End(self.start.to_end()))
            .map_err(DocxError::xml)?;
        Ok(())
    }
}

fn write_node(node: &Node, writer: &mut Writer<Vec<u8>>) -> Result<(), DocxError> {
    match node {
        Node::Element(el) => el.write(writer),
        Node::Text(text) => writer
            .write_event(Event::Text(text.clone()))
            .map_err(DocxError::xml),
        Node::Other(event) => writer
            .write_event(event.clone())
            .map_err(DocxError::xml),
    }
}

/// A parsed XML part: prolog nodes followed by the single root element.
#[derive(Debug, Clone)]
pub struct XmlPart {
    prolog: Vec<Node>,
    pub root: Element,
}

impl XmlPart {
    pub fn parse(xml: &str) -> Result<Self, DocxError> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(false);

        let mut prolog = Vec::new();
        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            let event = reader.read_event().map_err(DocxError::xml)?;
            let node = match event {
                Event::Eof => break,
                Event::Start(start) => {
                    stack.push(Element {
                        start: start.into_owned(),
                        children: Vec::new(),
                    });
                    continue;
                }
                Event::End(end) => {
                    let element = stack.pop().ok_or_else(|| {
                        DocxError::xml(format!(
                            "unexpected closing tag </{}>",
                            String::from_utf8_lossy(end.name().into_inner())
                        ))
                    })?;
                    Node::Element(element)
                }
                Event::Empty(start) => Node::Element(Element {
                    start: start.into_owned(),
                    children: Vec::new(),
                }),
                Event::Text(text) => Node::Text(text.into_owned()),
                other => Node::Other(other.into_owned()),
            };

            match (stack.last_mut(), node) {
                (Some(parent), node) => parent.children.push(node),
                (None, Node::Element(element)) => {
                    if root.replace(element).is_some() {
                        return Err(DocxError::xml("multiple root elements"));
                    }
                }
                // Whitespace and declarations outside the root.
                (None, node) => {
                    if root.is_none() {
                        prolog.push(node);
                    }
                }
            }
        }

        if !stack.is_empty() {
            return Err(DocxError::xml("unclosed element at end of document"));
        }
        let root = root.ok_or_else(|| DocxError::xml("document has no root element"))?;
        Ok(Self { prolog, root })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, DocxError> {
        let mut writer = Writer::new(Vec::new());
        for node in &self.prolog {
            write_node(node, &mut writer)?;
        }
        self.root.write(&mut writer)?;
        Ok(writer.into_inner())
    }
}
