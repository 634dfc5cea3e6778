//! Generic ordered element tree backing the instrument XML.
//!
//! The container's `Instrument.xml` carries far more than this crate models.
//! Everything is kept as a plain tree of [`Element`]s so that unknown content
//! survives a load/save cycle untouched, while typed views such as
//! [`Sample`](crate::Sample) read and write the few fields they know about.

use crate::error::{Error, Result};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::collections::BTreeMap;
use std::fmt::Display;
use std::str::FromStr;

/// One XML element: tag, attributes, text content and ordered children.
///
/// Whitespace-only text between elements is not stored, so an element's
/// `text` is either empty or the literal content of a leaf.
#[derive(Clone, Debug, Default)]
pub struct Element {
    /// Element name.
    pub tag: String,
    /// Attributes, compared as a mapping.
    pub attributes: BTreeMap<String, String>,
    /// Unescaped text content (empty when absent).
    pub text: String,
    /// Child elements in document order.
    pub children: Vec<Element>,
}

/// Structural equality: same tag, same attribute mapping, same text and
/// pairwise-equal children in the same order.
pub fn equals(a: &Element, b: &Element) -> bool {
    a.tag == b.tag
        && a.text == b.text
        && a.attributes == b.attributes
        && a.children.len() == b.children.len()
        && a.children
            .iter()
            .zip(b.children.iter())
            .all(|(lhs, rhs)| equals(lhs, rhs))
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        equals(self, other)
    }
}

impl Element {
    /// Create an empty element.
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Default::default()
        }
    }

    /// Create a leaf element holding `text`.
    pub fn with_text(tag: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            text: text.into(),
            ..Default::default()
        }
    }

    /// First child with the given tag.
    pub fn child(&self, tag: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.tag == tag)
    }

    /// First child with the given tag, mutably.
    pub fn child_mut(&mut self, tag: &str) -> Option<&mut Element> {
        self.children.iter_mut().find(|c| c.tag == tag)
    }

    /// First child with the given tag, appending an empty one if missing.
    pub fn child_or_insert(&mut self, tag: &str) -> &mut Element {
        let pos = match self.children.iter().position(|c| c.tag == tag) {
            Some(pos) => pos,
            None => {
                self.children.push(Element::new(tag));
                self.children.len() - 1
            }
        };
        &mut self.children[pos]
    }

    /// All children with the given tag.
    pub fn children_named<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.tag == tag)
    }

    /// Detach and return every child with the given tag, keeping the others.
    pub fn take_children(&mut self, tag: &str) -> Vec<Element> {
        let (taken, kept) = std::mem::take(&mut self.children)
            .into_iter()
            .partition(|c| c.tag == tag);
        self.children = kept;
        taken
    }

    /// Remove every child with the given tag. Returns whether anything was removed.
    pub fn remove_children(&mut self, tag: &str) -> bool {
        let before = self.children.len();
        self.children.retain(|c| c.tag != tag);
        before != self.children.len()
    }

    /// Follow a path of child tags.
    pub fn path(&self, path: &[&str]) -> Option<&Element> {
        path.iter().try_fold(self, |el, tag| el.child(tag))
    }

    /// Follow a path of child tags, mutably.
    pub fn path_mut(&mut self, path: &[&str]) -> Option<&mut Element> {
        let mut current = self;
        for tag in path {
            current = current.child_mut(tag)?;
        }
        Some(current)
    }

    /// Follow a path of child tags, creating missing elements on the way.
    pub fn path_or_insert(&mut self, path: &[&str]) -> &mut Element {
        let mut current = self;
        for tag in path {
            current = current.child_or_insert(tag);
        }
        current
    }

    /// Text at the end of a path, if the path exists.
    pub fn text_at(&self, path: &[&str]) -> Option<&str> {
        self.path(path).map(|el| el.text.as_str())
    }

    /// Parse the text at the end of a path.
    pub fn value_at<T: FromStr>(&self, path: &[&str]) -> Option<T> {
        self.text_at(path)?.trim().parse().ok()
    }

    /// Write `value` as the text at the end of a path (get-or-create).
    pub fn set_value_at<T: Display>(&mut self, path: &[&str], value: T) {
        self.path_or_insert(path).text = value.to_string();
    }

    /// Depth-first search for the first descendant matching `predicate`.
    pub fn find_descendant_mut<F>(&mut self, predicate: &F) -> Option<&mut Element>
    where
        F: Fn(&Element) -> bool,
    {
        for child in self.children.iter_mut() {
            if predicate(child) {
                return Some(child);
            }
            if let Some(found) = child.find_descendant_mut(predicate) {
                return Some(found);
            }
        }
        None
    }

    /// Parse an XML document into its root element.
    pub fn parse(xml: &[u8]) -> Result<Element> {
        let mut reader = Reader::from_reader(xml);
        let mut buf = Vec::new();
        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(ref e) => {
                    drop_indentation(&mut stack);
                    stack.push(element_from_start(e)?);
                }
                Event::Empty(ref e) => {
                    drop_indentation(&mut stack);
                    let element = element_from_start(e)?;
                    attach(&mut stack, &mut root, element);
                }
                Event::End(_) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| Error::Xml("unbalanced closing tag".to_string()))?;
                    attach(&mut stack, &mut root, element);
                }
                Event::Text(ref t) => {
                    let text = t.unescape()?;
                    if let Some(current) = stack.last_mut() {
                        // Whitespace after a child is indentation, within a leaf it is content.
                        if current.children.is_empty() || !text.trim().is_empty() {
                            current.text.push_str(&text);
                        }
                    }
                }
                Event::CData(ref c) => {
                    if let Some(current) = stack.last_mut() {
                        current.text.push_str(&String::from_utf8_lossy(&**c));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if !stack.is_empty() {
            return Err(Error::Xml(format!("unclosed element <{}>", stack[stack.len() - 1].tag)));
        }
        root.ok_or_else(|| Error::Xml("document has no root element".to_string()))
    }

    /// Serialize this element as a pretty-printed XML document.
    pub fn to_xml(&self) -> Result<Vec<u8>> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(xml_error)?;
        write_element(&mut writer, self)?;
        Ok(writer.into_inner())
    }
}

fn xml_error<E: Display>(err: E) -> Error {
    Error::Xml(err.to_string())
}

fn element_from_start(start: &BytesStart) -> Result<Element> {
    let mut element = Element::new(String::from_utf8_lossy(start.name().as_ref()).into_owned());
    for attr in start.attributes() {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        element.attributes.insert(key, value);
    }
    Ok(element)
}

/// A child is starting: whitespace collected so far in its parent was
/// indentation.
fn drop_indentation(stack: &mut [Element]) {
    if let Some(parent) = stack.last_mut() {
        if parent.text.trim().is_empty() {
            parent.text.clear();
        }
    }
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => {
            if root.is_none() {
                *root = Some(element);
            }
        }
    }
}

fn write_element(writer: &mut Writer<Vec<u8>>, element: &Element) -> Result<()> {
    let mut start = BytesStart::new(element.tag.as_str());
    for (key, value) in &element.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    if element.text.is_empty() && element.children.is_empty() {
        writer.write_event(Event::Empty(start)).map_err(xml_error)?;
        return Ok(());
    }

    writer.write_event(Event::Start(start)).map_err(xml_error)?;
    let indentation = !element.children.is_empty() && element.text.trim().is_empty();
    if !element.text.is_empty() && !indentation {
        writer
            .write_event(Event::Text(BytesText::new(&element.text)))
            .map_err(xml_error)?;
    }
    for child in &element.children {
        write_element(writer, child)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new(element.tag.as_str())))
        .map_err(xml_error)?;
    Ok(())
}
