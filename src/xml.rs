//! Owned element tree over quick-xml, with namespace-resolved element
//! names. Parses a whole document up front, supports in-place mutation and
//! serializes back with a fresh UTF-8 declaration.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesPI, BytesStart, BytesText, Event};
use quick_xml::name::ResolveResult;
use quick_xml::reader::NsReader;
use quick_xml::writer::Writer;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum XmlError {
    #[error(transparent)]
    Syntax(#[from] quick_xml::Error),
    #[error("document has no root element")]
    NoRoot,
    #[error("mismatched element nesting")]
    Unbalanced,
}

#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    Element(Element),
    Text(String),
    CData(String),
    Comment(String),
    ProcessingInstruction(String),
    DocType(String),
}

impl XmlNode {
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            XmlNode::Element(elem) => Some(elem),
            _ => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            XmlNode::Element(elem) => Some(elem),
            _ => None,
        }
    }
}

/// One element: qualified name as written in the source, resolved
/// namespace URI, attributes in document order (values unescaped) and
/// child nodes. `clone` is a deep copy of the whole subtree.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub name: String,
    pub namespace: Option<String>,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

impl Element {
    pub fn local_name(&self) -> &str {
        match self.name.rfind(':') {
            Some(colon) => &self.name[colon + 1..],
            None => &self.name,
        }
    }

    pub fn is_named(&self, namespace: &str, local: &str) -> bool {
        self.namespace.as_deref() == Some(namespace) && self.local_name() == local
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(XmlNode::as_element)
    }

    /// First direct child element with the given namespace and local name.
    pub fn find(&self, namespace: &str, local: &str) -> Option<&Element> {
        self.child_elements().find(|elem| elem.is_named(namespace, local))
    }

    pub fn find_mut(&mut self, namespace: &str, local: &str) -> Option<&mut Element> {
        self.children
            .iter_mut()
            .filter_map(XmlNode::as_element_mut)
            .find(|elem| elem.is_named(namespace, local))
    }

    pub fn push_element(&mut self, elem: Element) {
        self.children.push(XmlNode::Element(elem));
    }

    pub fn clear_children(&mut self) {
        self.children.clear();
    }
}

/// A parsed document: nodes before the root, the root element, nodes after
/// it. The source's XML declaration is not kept; serialization always
/// emits its own.
#[derive(Debug, Clone, PartialEq)]
pub struct XmlDocument {
    pub prolog: Vec<XmlNode>,
    pub root: Element,
    pub trailing: Vec<XmlNode>,
}

impl XmlDocument {
    pub fn parse(text: &str) -> Result<XmlDocument, XmlError> {
        let mut reader = NsReader::from_str(text);
        let mut prolog: Vec<XmlNode> = Vec::new();
        let mut trailing: Vec<XmlNode> = Vec::new();
        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            let (resolution, event) = reader.read_resolved_event()?;
            match event {
                Event::Start(start) => {
                    stack.push(element_from_start(&resolution, &start)?);
                }
                Event::Empty(start) => {
                    let elem = element_from_start(&resolution, &start)?;
                    attach(
                        &mut stack,
                        &mut prolog,
                        &mut trailing,
                        root.is_some(),
                        XmlNode::Element(elem),
                    );
                }
                Event::End(_) => {
                    // The reader has already checked tag balance.
                    let elem = stack.pop().ok_or(XmlError::Unbalanced)?;
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(XmlNode::Element(elem)),
                        None if root.is_none() => root = Some(elem),
                        None => return Err(XmlError::Unbalanced),
                    }
                }
                Event::Text(text) => {
                    let value = text.unescape().map_err(quick_xml::Error::from)?.into_owned();
                    // whitespace between top-level nodes is insignificant
                    if stack.is_empty() && value.trim().is_empty() {
                        continue;
                    }
                    attach(&mut stack, &mut prolog, &mut trailing, root.is_some(), XmlNode::Text(value));
                }
                Event::CData(data) => {
                    let value = String::from_utf8_lossy(&data).into_owned();
                    attach(&mut stack, &mut prolog, &mut trailing, root.is_some(), XmlNode::CData(value));
                }
                Event::Comment(text) => {
                    let value = String::from_utf8_lossy(&text).into_owned();
                    attach(&mut stack, &mut prolog, &mut trailing, root.is_some(), XmlNode::Comment(value));
                }
                Event::PI(pi) => {
                    let value = String::from_utf8_lossy(&pi).into_owned();
                    attach(
                        &mut stack,
                        &mut prolog,
                        &mut trailing,
                        root.is_some(),
                        XmlNode::ProcessingInstruction(value),
                    );
                }
                Event::DocType(text) => {
                    let value = String::from_utf8_lossy(&text).into_owned();
                    attach(&mut stack, &mut prolog, &mut trailing, root.is_some(), XmlNode::DocType(value));
                }
                Event::Decl(_) => {}
                Event::Eof => break,
                _ => {}
            }
        }

        if !stack.is_empty() {
            return Err(XmlError::Unbalanced);
        }
        let root = root.ok_or(XmlError::NoRoot)?;
        Ok(XmlDocument { prolog, root, trailing })
    }

    pub fn write_to<W: Write>(&self, sink: W) -> io::Result<()> {
        self.write_to_inner(sink).map_err(io::Error::other)
    }

    fn write_to_inner<W: Write>(&self, sink: W) -> quick_xml::Result<()> {
        let mut writer = Writer::new(sink);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
        writer.write_event(Event::Text(BytesText::from_escaped("\n")))?;
        for node in &self.prolog {
            write_node(&mut writer, node)?;
        }
        write_element(&mut writer, &self.root)?;
        for node in &self.trailing {
            write_node(&mut writer, node)?;
        }
        Ok(())
    }

    pub fn save(&self, path: &Path) -> io::Result<()> {
        let mut sink = BufWriter::new(File::create(path)?);
        self.write_to(&mut sink)?;
        sink.flush()
    }
}

fn element_from_start(resolution: &ResolveResult, start: &BytesStart) -> Result<Element, XmlError> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let namespace = match resolution {
        ResolveResult::Bound(namespace) => Some(String::from_utf8_lossy(namespace.0).into_owned()),
        _ => None,
    };
    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(quick_xml::Error::from)?
            .into_owned();
        attributes.push((key, value));
    }
    Ok(Element {
        name,
        namespace,
        attributes,
        children: Vec::new(),
    })
}

fn attach(
    stack: &mut [Element],
    prolog: &mut Vec<XmlNode>,
    trailing: &mut Vec<XmlNode>,
    root_seen: bool,
    node: XmlNode,
) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None if root_seen => trailing.push(node),
        None => prolog.push(node),
    }
}

fn write_element<W: Write>(writer: &mut Writer<W>, elem: &Element) -> quick_xml::Result<()> {
    let mut start = BytesStart::new(elem.name.as_str());
    for (key, value) in &elem.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }
    if elem.children.is_empty() {
        writer.write_event(Event::Empty(start))
    } else {
        writer.write_event(Event::Start(start))?;
        for child in &elem.children {
            write_node(writer, child)?;
        }
        writer.write_event(Event::End(BytesEnd::new(elem.name.as_str())))
    }
}

fn write_node<W: Write>(writer: &mut Writer<W>, node: &XmlNode) -> quick_xml::Result<()> {
    match node {
        XmlNode::Element(elem) => write_element(writer, elem),
        XmlNode::Text(text) => writer.write_event(Event::Text(BytesText::new(text.as_str()))),
        XmlNode::CData(text) => writer.write_event(Event::CData(BytesCData::new(text.as_str()))),
        XmlNode::Comment(text) => {
            writer.write_event(Event::Comment(BytesText::from_escaped(text.as_str())))
        }
        XmlNode::ProcessingInstruction(text) => {
            writer.write_event(Event::PI(BytesPI::new(text.as_str())))
        }
        XmlNode::DocType(text) => {
            writer.write_event(Event::DocType(BytesText::from_escaped(text.as_str())))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> XmlDocument {
        XmlDocument::parse(text).expect("should parse")
    }

    fn serialize(doc: &XmlDocument) -> String {
        let mut out = Vec::new();
        doc.write_to(&mut out).expect("should serialize");
        String::from_utf8(out).expect("output should be UTF-8")
    }

    #[test]
    fn resolves_default_namespace() {
        let doc = parse(r#"<root xmlns="urn:example"><child a="1"/></root>"#);
        assert_eq!(doc.root.namespace.as_deref(), Some("urn:example"));
        let child = doc.root.find("urn:example", "child").expect("child present");
        assert_eq!(child.attr("a"), Some("1"));
    }

    #[test]
    fn resolves_prefixed_elements_by_local_name() {
        let doc = parse(r#"<e:root xmlns:e="urn:example"><e:child/><other/></e:root>"#);
        assert_eq!(doc.root.local_name(), "root");
        let child = doc.root.find("urn:example", "child").expect("child present");
        assert_eq!(child.name, "e:child");
        // unprefixed sibling is in no namespace
        assert!(doc.root.find("urn:example", "other").is_none());
    }

    #[test]
    fn serializes_declaration_and_namespace_attribute() {
        let doc = parse(r#"<root xmlns="urn:example"><child/></root>"#);
        let out = serialize(&doc);
        assert!(out.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n"));
        assert!(out.contains(r#"<root xmlns="urn:example">"#));
    }

    #[test]
    fn childless_elements_stay_self_closing() {
        let doc = parse("<root><leaf/></root>");
        assert!(serialize(&doc).contains("<leaf/>"));
    }

    #[test]
    fn escaped_content_round_trips() {
        let doc = parse(r#"<root label="a &amp; b">1 &lt; 2</root>"#);
        assert_eq!(doc.root.attr("label"), Some("a & b"));
        assert_eq!(doc.root.children, vec![XmlNode::Text("1 < 2".to_string())]);
        let out = serialize(&doc);
        assert!(out.contains("a &amp; b"));
        assert!(out.contains("1 &lt; 2"));
    }

    #[test]
    fn reparsed_output_is_structurally_equal() {
        let doc = parse(
            r#"<root xmlns="urn:example">
  <!-- note -->
  <a id="1"><b>text</b></a>
</root>"#,
        );
        let again = parse(&serialize(&doc));
        assert_eq!(doc, again);
    }

    #[test]
    fn document_without_root_is_rejected() {
        assert!(matches!(
            XmlDocument::parse("<!-- only a comment -->"),
            Err(XmlError::NoRoot)
        ));
        assert!(XmlDocument::parse("<root><open></root>").is_err());
    }
}
