//! Owned XML element tree
//!
//! WordprocessingML parts are parsed into a small owned tree so that the
//! replacer can edit runs in place while every element it does not know about
//! (drawings, OLE objects, section properties, content controls) survives the
//! write back untouched.

use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum XmlError {
    #[error("malformed XML: {0}")]
    Parse(String),
    #[error("failed to write XML: {0}")]
    Write(String),
    #[error("XML part has no root element")]
    MissingRoot,
}

#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
    CData(String),
    Comment(String),
    Instruction(String),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

/// A parsed XML part: the raw declaration (if any) plus the root element.
#[derive(Debug, Clone, PartialEq)]
pub struct XmlDocument {
    pub declaration: Option<String>,
    pub root: XmlElement,
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(key, value);
        self
    }

    pub fn with_child(mut self, child: XmlElement) -> Self {
        self.children.push(XmlNode::Element(child));
        self
    }

    pub fn local_name(&self) -> &str {
        self.name.rsplit(':').next().unwrap_or(&self.name)
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn set_attr(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((key, value)),
        }
    }

    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|node| match node {
            XmlNode::Element(el) => Some(el),
            _ => None,
        })
    }

    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut XmlElement> {
        self.children.iter_mut().filter_map(|node| match node {
            XmlNode::Element(el) => Some(el),
            _ => None,
        })
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.elements().filter(move |el| el.name == name)
    }

    pub fn children_named_mut<'a>(
        &'a mut self,
        name: &'a str,
    ) -> impl Iterator<Item = &'a mut XmlElement> {
        self.elements_mut().filter(move |el| el.name == name)
    }

    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.elements().find(|el| el.name == name)
    }

    pub fn child_mut(&mut self, name: &str) -> Option<&mut XmlElement> {
        self.elements_mut().find(|el| el.name == name)
    }

    /// Follow a path of child element names, e.g. `["w:pPr", "w:jc"]`.
    pub fn find(&self, path: &[&str]) -> Option<&XmlElement> {
        path.iter().try_fold(self, |el, name| el.child(name))
    }

    /// Element at a path of child-node indices (as produced by tree walks).
    pub fn at_path_mut(&mut self, path: &[usize]) -> Option<&mut XmlElement> {
        let mut current = self;
        for &index in path {
            current = match current.children.get_mut(index) {
                Some(XmlNode::Element(el)) => el,
                _ => return None,
            };
        }
        Some(current)
    }

    pub fn at_path(&self, path: &[usize]) -> Option<&XmlElement> {
        let mut current = self;
        for &index in path {
            current = match current.children.get(index) {
                Some(XmlNode::Element(el)) => el,
                _ => return None,
            };
        }
        Some(current)
    }

    /// All descendant elements, depth first, excluding `self`.
    pub fn descendants(&self) -> Vec<&XmlElement> {
        let mut out = Vec::new();
        let mut stack: Vec<&XmlElement> = self.elements().collect();
        stack.reverse();
        while let Some(el) = stack.pop() {
            out.push(el);
            let before = stack.len();
            stack.extend(el.elements());
            stack[before..].reverse();
        }
        out
    }

    /// Concatenated character data of the direct children.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for node in &self.children {
            match node {
                XmlNode::Text(t) | XmlNode::CData(t) => out.push_str(t),
                _ => {}
            }
        }
        out
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.children
            .retain(|node| !matches!(node, XmlNode::Text(_) | XmlNode::CData(_)));
        let text = text.into();
        if !text.is_empty() {
            self.children.push(XmlNode::Text(text));
        }
    }

    pub fn push(&mut self, child: XmlElement) {
        self.children.push(XmlNode::Element(child));
    }
}

/// Parse a complete XML part.
pub fn parse(bytes: &[u8]) -> Result<XmlDocument, XmlError> {
    let mut reader = Reader::from_reader(bytes);
    reader.config_mut().trim_text(false);

    let mut buf = Vec::new();
    let mut declaration = None;
    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| XmlError::Parse(format!("at byte {}: {e}", reader.buffer_position())))?;

        match event {
            Event::Decl(decl) => {
                declaration = Some(String::from_utf8_lossy(&decl).into_owned());
            }
            Event::Start(start) => {
                stack.push(element_from_start(&start)?);
            }
            Event::Empty(start) => {
                let element = element_from_start(&start)?;
                attach(&mut stack, &mut root, XmlNode::Element(element));
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| XmlError::Parse("unbalanced end tag".to_string()))?;
                attach(&mut stack, &mut root, XmlNode::Element(element));
            }
            Event::Text(text) => {
                if let Some(parent) = stack.last_mut() {
                    let value = text
                        .unescape()
                        .map_err(|e| XmlError::Parse(e.to_string()))?;
                    parent.children.push(XmlNode::Text(value.into_owned()));
                }
            }
            Event::CData(data) => {
                if let Some(parent) = stack.last_mut() {
                    let value = String::from_utf8_lossy(&data).into_owned();
                    parent.children.push(XmlNode::CData(value));
                }
            }
            Event::Comment(comment) => {
                if let Some(parent) = stack.last_mut() {
                    let value = String::from_utf8_lossy(&comment).into_owned();
                    parent.children.push(XmlNode::Comment(value));
                }
            }
            Event::PI(pi) => {
                if let Some(parent) = stack.last_mut() {
                    let value = String::from_utf8_lossy(&pi).into_owned();
                    parent.children.push(XmlNode::Instruction(value));
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if !stack.is_empty() {
        return Err(XmlError::Parse(format!(
            "unexpected end of input inside <{}>",
            stack.last().map(|el| el.name.as_str()).unwrap_or_default()
        )));
    }

    let root = root.ok_or(XmlError::MissingRoot)?;
    Ok(XmlDocument { declaration, root })
}

fn element_from_start(start: &BytesStart<'_>) -> Result<XmlElement, XmlError> {
    let mut element = XmlElement::new(String::from_utf8_lossy(start.name().as_ref()));
    for attr in start.attributes().with_checks(false) {
        let attr = attr.map_err(|e| XmlError::Parse(e.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| XmlError::Parse(e.to_string()))?
            .into_owned();
        element.attributes.push((key, value));
    }
    Ok(element)
}

fn attach(stack: &mut [XmlElement], root: &mut Option<XmlElement>, node: XmlNode) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None => {
            if let XmlNode::Element(el) = node {
                *root = Some(el);
            }
        }
    }
}

impl XmlDocument {
    /// Serialize back to bytes, keeping the original declaration.
    pub fn to_bytes(&self) -> Result<Vec<u8>, XmlError> {
        let mut writer = Writer::new(Vec::new());
        if let Some(decl) = &self.declaration {
            let out = writer.get_mut();
            out.extend_from_slice(b"<?");
            out.extend_from_slice(decl.as_bytes());
            out.extend_from_slice(b"?>\r\n");
        }
        write_element(&mut writer, &self.root)?;
        Ok(writer.into_inner())
    }
}

fn write_element(writer: &mut Writer<Vec<u8>>, element: &XmlElement) -> Result<(), XmlError> {
    let mut start = BytesStart::new(element.name.as_str());
    for (key, value) in &element.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    if element.children.is_empty() {
        return writer
            .write_event(Event::Empty(start))
            .map_err(|e| XmlError::Write(e.to_string()));
    }

    writer
        .write_event(Event::Start(start))
        .map_err(|e| XmlError::Write(e.to_string()))?;

    for child in &element.children {
        match child {
            XmlNode::Element(el) => write_element(writer, el)?,
            XmlNode::Text(text) => writer
                .write_event(Event::Text(BytesText::new(text)))
                .map_err(|e| XmlError::Write(e.to_string()))?,
            XmlNode::CData(data) => {
                let out = writer.get_mut();
                out.extend_from_slice(b"<![CDATA[");
                out.extend_from_slice(data.as_bytes());
                out.extend_from_slice(b"]]>");
            }
            XmlNode::Comment(comment) => {
                let out = writer.get_mut();
                out.extend_from_slice(b"<!--");
                out.extend_from_slice(comment.as_bytes());
                out.extend_from_slice(b"-->");
            }
            XmlNode::Instruction(pi) => {
                let out = writer.get_mut();
                out.extend_from_slice(b"<?");
                out.extend_from_slice(pi.as_bytes());
                out.extend_from_slice(b"?>");
            }
        }
    }

    writer
        .write_event(Event::End(BytesEnd::new(element.name.as_str())))
        .map_err(|e| XmlError::Write(e.to_string()))
}

/// Whether every character can appear in an XML 1.0 document.
pub fn is_xml_safe(text: &str) -> bool {
    text.chars().all(|c| {
        matches!(c,
            '\u{9}' | '\u{A}' | '\u{D}'
            | '\u{20}'..='\u{D7FF}'
            | '\u{E000}'..='\u{FFFD}'
            | '\u{10000}'..='\u{10FFFF}')
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="urn:w"><w:body><w:p><w:r><w:t xml:space="preserve"> a &amp; b </w:t></w:r></w:p><w:sectPr/></w:body></w:document>"#;

    #[test]
    fn parse_and_write_keeps_structure() {
        let doc = parse(SAMPLE.as_bytes()).expect("parse");
        assert_eq!(doc.root.name, "w:document");
        let t = doc
            .root
            .find(&["w:body", "w:p", "w:r", "w:t"])
            .expect("w:t");
        assert_eq!(t.text(), " a & b ");
        assert_eq!(t.attr("xml:space"), Some("preserve"));

        let bytes = doc.to_bytes().expect("write");
        let reparsed = parse(&bytes).expect("reparse");
        assert_eq!(reparsed, doc, "round trip should be lossless");
        let text = String::from_utf8(bytes).expect("utf8");
        assert!(text.contains("a &amp; b"));
        assert!(text.contains("<w:sectPr/>"));
    }

    #[test]
    fn unbalanced_input_is_rejected() {
        assert!(parse(b"<a><b></a>").is_err());
        assert!(matches!(parse(b""), Err(XmlError::MissingRoot)));
    }

    #[test]
    fn descendants_are_depth_first() {
        let root = XmlElement::new("a")
            .with_child(XmlElement::new("b").with_child(XmlElement::new("c")))
            .with_child(XmlElement::new("d"));
        let names: Vec<_> = root.descendants().iter().map(|e| e.name.clone()).collect();
        assert_eq!(names, ["b", "c", "d"]);
    }

    #[test]
    fn control_characters_are_not_xml_safe() {
        assert!(is_xml_safe("tab\tand newline\n"));
        assert!(!is_xml_safe("bell\u{7}"));
    }
}
