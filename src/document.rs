//! Namespace-aware, mutable XML document
//!
//! Templates are parsed with quick-xml into an arena of nodes. Every
//! element carries its resolved namespace URI next to the prefix it was
//! written with, so rules can be matched by namespace while the output
//! keeps the author's prefixes.
//!
//! Text and attribute values are stored in their escaped source form.
//! Facelets templates routinely use DTD entities such as `&nbsp;` that an
//! unescaping parser would reject or lose.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;

/// URI permanently bound to the `xml` prefix
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// Error during parsing
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("XML parse error at line {line}: {message}")]
    Xml { line: usize, message: String },

    #[error("The prefix \"{prefix}\" is not bound (line {line})")]
    UnboundPrefix { prefix: String, line: usize },

    #[error("Element <{name}> is never closed")]
    Unclosed { name: String },

    #[error("Document has no root element")]
    NoRoot,

    #[error("Content is not allowed after the root element (line {line})")]
    TrailingContent { line: usize },
}

/// Handle to a node of a [`Document`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Qualified name with its resolved namespace
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QName {
    pub prefix: Option<String>,
    pub local: String,
    pub namespace: Option<String>,
}

impl QName {
    pub fn new(prefix: Option<&str>, local: &str, namespace: Option<&str>) -> Self {
        Self {
            prefix: prefix.map(str::to_string),
            local: local.to_string(),
            namespace: namespace.map(str::to_string),
        }
    }

    /// Name as written in markup (`prefix:local` or `local`)
    pub fn qualified(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}:{}", prefix, self.local),
            None => self.local.clone(),
        }
    }
}

/// Split `prefix:local` into its parts
pub fn split_qualified(name: &str) -> (Option<&str>, &str) {
    match name.split_once(':') {
        Some((prefix, local)) => (Some(prefix), local),
        None => (None, name),
    }
}

/// An attribute; `value` is kept escaped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: QName,
    pub value: String,
}

/// An `xmlns` / `xmlns:prefix` declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceDecl {
    pub prefix: Option<String>,
    pub uri: String,
}

/// Element payload
#[derive(Debug, Clone)]
pub struct Element {
    pub name: QName,
    pub namespaces: Vec<NamespaceDecl>,
    pub attributes: Vec<Attribute>,
}

impl Element {
    /// Attribute by qualified name
    pub fn attribute(&self, qualified: &str) -> Option<&Attribute> {
        self.attributes
            .iter()
            .find(|a| a.name.qualified() == qualified)
    }

    pub fn attribute_value(&self, qualified: &str) -> Option<&str> {
        self.attribute(qualified).map(|a| a.value.as_str())
    }

    /// Declared URI for a prefix on this element only
    pub fn declared_namespace(&self, prefix: Option<&str>) -> Option<&str> {
        self.namespaces
            .iter()
            .find(|ns| ns.prefix.as_deref() == prefix)
            .map(|ns| ns.uri.as_str())
    }

    /// Add or replace a namespace declaration
    pub fn declare_namespace(&mut self, prefix: Option<&str>, uri: &str) {
        match self
            .namespaces
            .iter_mut()
            .find(|ns| ns.prefix.as_deref() == prefix)
        {
            Some(decl) => decl.uri = uri.to_string(),
            None => self.namespaces.push(NamespaceDecl {
                prefix: prefix.map(str::to_string),
                uri: uri.to_string(),
            }),
        }
    }
}

/// XML declaration found in the prolog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlDeclaration {
    pub version: String,
    pub encoding: Option<String>,
    pub standalone: Option<String>,
}

/// Node payload
#[derive(Debug, Clone)]
pub enum NodeKind {
    Document,
    Element(Element),
    Text(String),
    CData(String),
    Comment(String),
    ProcessingInstruction { target: String, content: String },
    Doctype(String),
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// A parsed template
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<NodeData>,
    declaration: Option<XmlDeclaration>,
}

impl Document {
    /// Parse template source
    pub fn parse(content: &str) -> Result<Self, ParseError> {
        DocumentBuilder::new(content).build()
    }

    fn empty() -> Self {
        Self {
            nodes: vec![NodeData {
                kind: NodeKind::Document,
                parent: None,
                children: Vec::new(),
            }],
            declaration: None,
        }
    }

    /// The document node, parent of the root element and prolog nodes
    pub fn document_node(&self) -> NodeId {
        NodeId(0)
    }

    pub fn declaration(&self) -> Option<&XmlDeclaration> {
        self.declaration.as_ref()
    }

    pub fn root_element(&self) -> Option<NodeId> {
        self.children(self.document_node())
            .iter()
            .copied()
            .find(|&id| self.element(id).is_some())
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match &self.nodes[id.0].kind {
            NodeKind::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match &mut self.nodes[id.0].kind {
            NodeKind::Element(el) => Some(el),
            _ => None,
        }
    }

    /// Child elements of a node, in document order
    pub fn child_elements(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|&c| self.element(c).is_some())
            .collect()
    }

    /// Every element of the document, in document order
    pub fn elements(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = vec![self.document_node()];
        while let Some(id) = stack.pop() {
            if self.element(id).is_some() {
                out.push(id);
            }
            stack.extend(self.children(id).iter().rev().copied());
        }
        out
    }

    /// Whether `ancestor` is a proper ancestor of `id`
    pub fn is_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut current = self.parent(id);
        while let Some(p) = current {
            if p == ancestor {
                return true;
            }
            current = self.parent(p);
        }
        false
    }

    /// URI in scope for a prefix at an element (`None` prefix = default namespace)
    pub fn lookup_namespace(&self, id: NodeId, prefix: Option<&str>) -> Option<&str> {
        if prefix == Some("xml") {
            return Some(XML_NAMESPACE);
        }
        let mut current = Some(id);
        while let Some(node) = current {
            if let Some(uri) = self
                .element(node)
                .and_then(|el| el.declared_namespace(prefix))
            {
                return (!uri.is_empty()).then_some(uri);
            }
            current = self.parent(node);
        }
        None
    }

    /// URI the root element declares for a prefix
    pub fn root_namespace(&self, prefix: &str) -> Option<&str> {
        self.root_element()
            .and_then(|root| self.element(root))
            .and_then(|el| el.declared_namespace(Some(prefix)))
    }

    /// URI the document declares for a prefix: the root declaration, or
    /// else the first one in document order
    pub fn document_namespace(&self, prefix: &str) -> Option<&str> {
        self.elements()
            .into_iter()
            .find_map(|id| self.element(id)?.declared_namespace(Some(prefix)))
    }

    fn push_node(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData {
            kind,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        id
    }
}

/// Escape a plain value for storage as an attribute value
pub fn escape_attr(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            _ => result.push(c),
        }
    }
    result
}

struct RawAttribute {
    key: String,
    value: String,
}

struct DocumentBuilder<'a> {
    content: &'a str,
    doc: Document,
    stack: Vec<NodeId>,
    line_starts: Vec<usize>,
}

impl<'a> DocumentBuilder<'a> {
    fn new(content: &'a str) -> Self {
        let line_starts: Vec<usize> = std::iter::once(0)
            .chain(content.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self {
            content,
            doc: Document::empty(),
            stack: Vec::new(),
            line_starts,
        }
    }

    fn line_at(&self, pos: u64) -> usize {
        let pos = pos as usize;
        self.line_starts.partition_point(|&start| start <= pos)
    }

    fn current_parent(&self) -> NodeId {
        self.stack
            .last()
            .copied()
            .unwrap_or_else(|| self.doc.document_node())
    }

    fn build(mut self) -> Result<Document, ParseError> {
        let mut reader = Reader::from_str(self.content);
        reader.config_mut().trim_text(false);

        loop {
            let event = reader.read_event();
            let line = self.line_at(reader.buffer_position());
            match event {
                Ok(Event::Start(e)) => {
                    let id = self.open_element(&e, line)?;
                    self.stack.push(id);
                }
                Ok(Event::Empty(e)) => {
                    self.open_element(&e, line)?;
                }
                Ok(Event::End(_)) => {
                    if self.stack.pop().is_none() {
                        return Err(ParseError::Xml {
                            line,
                            message: "unexpected closing tag".to_string(),
                        });
                    }
                }
                Ok(Event::Text(e)) => {
                    let text = String::from_utf8_lossy(&e).to_string();
                    if text.trim().is_empty() {
                        continue;
                    }
                    if self.stack.is_empty() {
                        return Err(ParseError::TrailingContent { line });
                    }
                    let parent = self.current_parent();
                    self.doc.push_node(parent, NodeKind::Text(text));
                }
                Ok(Event::CData(e)) => {
                    let text = String::from_utf8_lossy(&e).to_string();
                    let parent = self.current_parent();
                    self.doc.push_node(parent, NodeKind::CData(text));
                }
                Ok(Event::Comment(e)) => {
                    let text = String::from_utf8_lossy(&e).to_string();
                    let parent = self.current_parent();
                    self.doc.push_node(parent, NodeKind::Comment(text));
                }
                Ok(Event::Decl(decl)) => {
                    let version = decl
                        .version()
                        .map(|v| String::from_utf8_lossy(&v).to_string())
                        .unwrap_or_else(|_| "1.0".to_string());
                    let encoding = decl
                        .encoding()
                        .and_then(|e| e.ok())
                        .map(|e| String::from_utf8_lossy(&e).to_string());
                    let standalone = decl
                        .standalone()
                        .and_then(|s| s.ok())
                        .map(|s| String::from_utf8_lossy(&s).to_string());
                    self.doc.declaration = Some(XmlDeclaration {
                        version,
                        encoding,
                        standalone,
                    });
                }
                Ok(Event::PI(e)) => {
                    let target = String::from_utf8_lossy(e.target()).to_string();
                    let content = String::from_utf8_lossy(e.content()).trim().to_string();
                    let parent = self.current_parent();
                    self.doc
                        .push_node(parent, NodeKind::ProcessingInstruction { target, content });
                }
                Ok(Event::DocType(e)) => {
                    let text = String::from_utf8_lossy(&e).trim().to_string();
                    let parent = self.current_parent();
                    self.doc.push_node(parent, NodeKind::Doctype(text));
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(ParseError::Xml {
                        line,
                        message: e.to_string(),
                    });
                }
            }
        }

        if let Some(&open) = self.stack.last() {
            let name = self
                .doc
                .element(open)
                .map(|el| el.name.qualified())
                .unwrap_or_default();
            return Err(ParseError::Unclosed { name });
        }
        if self.doc.root_element().is_none() {
            return Err(ParseError::NoRoot);
        }

        Ok(self.doc)
    }

    fn open_element(&mut self, start: &BytesStart, line: usize) -> Result<NodeId, ParseError> {
        if self.stack.is_empty() && self.doc.root_element().is_some() {
            return Err(ParseError::TrailingContent { line });
        }

        let raw_name = String::from_utf8_lossy(start.name().as_ref()).to_string();
        let mut namespaces = Vec::new();
        let mut raw_attributes = Vec::new();

        for attr in start.attributes() {
            let attr = attr.map_err(|e| ParseError::Xml {
                line,
                message: e.to_string(),
            })?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
            let value = String::from_utf8_lossy(&attr.value).to_string();

            if key == "xmlns" {
                namespaces.push(NamespaceDecl {
                    prefix: None,
                    uri: value,
                });
            } else if let Some(prefix) = key.strip_prefix("xmlns:") {
                namespaces.push(NamespaceDecl {
                    prefix: Some(prefix.to_string()),
                    uri: value,
                });
            } else {
                raw_attributes.push(RawAttribute { key, value });
            }
        }

        let (prefix, local) = split_qualified(&raw_name);
        let element = Element {
            name: QName::new(prefix, local, None),
            namespaces,
            attributes: Vec::new(),
        };
        let parent = self.current_parent();
        let id = self.doc.push_node(parent, NodeKind::Element(element));

        let namespace = match prefix {
            Some(p) => Some(self.resolve_prefix(id, p, line)?),
            None => self.doc.lookup_namespace(id, None).map(str::to_string),
        };

        let mut attributes = Vec::with_capacity(raw_attributes.len());
        for raw in raw_attributes {
            let (attr_prefix, attr_local) = split_qualified(&raw.key);
            let attr_namespace = match attr_prefix {
                Some(p) => Some(self.resolve_prefix(id, p, line)?),
                None => None,
            };
            attributes.push(Attribute {
                name: QName::new(attr_prefix, attr_local, attr_namespace.as_deref()),
                value: raw.value,
            });
        }

        if let Some(el) = self.doc.element_mut(id) {
            el.name.namespace = namespace;
            el.attributes = attributes;
        }

        Ok(id)
    }

    fn resolve_prefix(&self, id: NodeId, prefix: &str, line: usize) -> Result<String, ParseError> {
        self.doc
            .lookup_namespace(id, Some(prefix))
            .map(str::to_string)
            .ok_or_else(|| ParseError::UnboundPrefix {
                prefix: prefix.to_string(),
                line,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEMPLATE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html PUBLIC "-//W3C//DTD XHTML 1.0 Transitional//EN" "http://www.w3.org/TR/xhtml1/DTD/xhtml1-transitional.dtd">
<div xmlns="http://www.w3.org/1999/xhtml"
  xmlns:a4j="https://ajax4jsf.dev.java.net/ajax"
  xmlns:h="http://java.sun.com/jsf/html">
  <!-- toolbar -->
  <a4j:form id="f">
    <h:commandLink value="Go&nbsp;now" reRender="a,b"/>
  </a4j:form>
</div>
"#;

    #[test]
    fn test_parse_template() {
        let doc = Document::parse(TEMPLATE).unwrap();
        let root = doc.root_element().unwrap();
        let el = doc.element(root).unwrap();
        assert_eq!(el.name.local, "div");
        assert_eq!(
            el.name.namespace.as_deref(),
            Some("http://www.w3.org/1999/xhtml")
        );
        assert_eq!(el.namespaces.len(), 3);
        assert_eq!(doc.declaration().unwrap().encoding.as_deref(), Some("UTF-8"));
    }

    #[test]
    fn test_prefixed_elements_resolve_namespace() {
        let doc = Document::parse(TEMPLATE).unwrap();
        let form = doc
            .elements()
            .into_iter()
            .find(|&id| doc.element(id).unwrap().name.local == "form")
            .unwrap();
        let el = doc.element(form).unwrap();
        assert_eq!(el.name.prefix.as_deref(), Some("a4j"));
        assert_eq!(
            el.name.namespace.as_deref(),
            Some("https://ajax4jsf.dev.java.net/ajax")
        );
    }

    #[test]
    fn test_entities_are_kept_escaped() {
        let doc = Document::parse(TEMPLATE).unwrap();
        let link = doc
            .elements()
            .into_iter()
            .find(|&id| doc.element(id).unwrap().name.local == "commandLink")
            .unwrap();
        assert_eq!(
            doc.element(link).unwrap().attribute_value("value"),
            Some("Go&nbsp;now")
        );
    }

    #[test]
    fn test_elements_in_document_order() {
        let doc = Document::parse("<a><b><c/></b><d/></a>").unwrap();
        let names: Vec<_> = doc
            .elements()
            .into_iter()
            .map(|id| doc.element(id).unwrap().name.local.clone())
            .collect();
        assert_eq!(names, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_root_namespace() {
        let doc = Document::parse(TEMPLATE).unwrap();
        assert_eq!(
            doc.root_namespace("a4j"),
            Some("https://ajax4jsf.dev.java.net/ajax")
        );
        assert_eq!(doc.root_namespace("rich"), None);
    }

    #[test]
    fn test_nested_declaration_in_scope() {
        let doc = Document::parse(r#"<a><b xmlns:x="urn:x"><x:c/></b></a>"#).unwrap();
        let c = doc.elements()[2];
        assert_eq!(doc.lookup_namespace(c, Some("x")), Some("urn:x"));
        assert_eq!(doc.root_namespace("x"), None);
    }

    #[test]
    fn test_unbound_prefix_is_an_error() {
        let err = Document::parse("<root><a4j:form/></root>").unwrap_err();
        assert!(matches!(err, ParseError::UnboundPrefix { ref prefix, .. } if prefix == "a4j"));
    }

    #[test]
    fn test_unbound_attribute_prefix_is_an_error() {
        let err = Document::parse(r#"<root x:id="1"/>"#).unwrap_err();
        assert!(matches!(err, ParseError::UnboundPrefix { .. }));
    }

    #[test]
    fn test_malformed_xml() {
        assert!(Document::parse("<root><child></root>").is_err());
        assert!(Document::parse("").is_err());
        assert!(Document::parse("<a/><b/>").is_err());
    }

    #[test]
    fn test_unclosed_root() {
        assert!(Document::parse("<root><child/>").is_err());
    }

    #[test]
    fn test_document_namespace_prefers_root() {
        let doc = Document::parse(
            r#"<a xmlns:p="urn:root"><b xmlns:q="urn:first"/><c xmlns:q="urn:second" xmlns:p="urn:inner"/></a>"#,
        )
        .unwrap();
        assert_eq!(doc.document_namespace("p"), Some("urn:root"));
        assert_eq!(doc.document_namespace("q"), Some("urn:first"));
        assert_eq!(doc.document_namespace("r"), None);
    }

    #[test]
    fn test_declare_namespace_replaces() {
        let mut doc = Document::parse(r#"<a xmlns:p="urn:old"/>"#).unwrap();
        let root = doc.root_element().unwrap();
        doc.element_mut(root)
            .unwrap()
            .declare_namespace(Some("p"), "urn:new");
        assert_eq!(doc.root_namespace("p"), Some("urn:new"));
        assert_eq!(doc.element(root).unwrap().namespaces.len(), 1);
    }

    #[test]
    fn test_split_qualified() {
        assert_eq!(split_qualified("a4j:param"), (Some("a4j"), "param"));
        assert_eq!(split_qualified("render"), (None, "render"));
    }

    #[test]
    fn test_escape_attr() {
        assert_eq!(escape_attr("a&b"), "a&amp;b");
        assert_eq!(escape_attr("\"x\""), "&quot;x&quot;");
        assert_eq!(escape_attr("@this"), "@this");
    }
}
