//! XML output writer for migrated templates

use crate::config::OutputConfig;
use crate::document::{Document, NodeId, NodeKind};

/// XML writer for pretty-printed output
pub struct XmlWriter {
    output: String,
    config: OutputConfig,
    indent_level: usize,
}

impl XmlWriter {
    pub fn new(config: OutputConfig) -> Self {
        Self {
            output: String::new(),
            config,
            indent_level: 0,
        }
    }

    /// Get the formatted output
    pub fn finish(mut self) -> String {
        self.output = self
            .output
            .lines()
            .map(|line| line.trim_end())
            .collect::<Vec<_>>()
            .join("\n");

        if self.config.insert_final_newline && !self.output.ends_with('\n') {
            self.output.push('\n');
        }

        self.output
    }

    pub fn newline(&mut self) {
        self.output.push('\n');
    }

    pub fn write_indent(&mut self) {
        let indent = self.config.indent_str().repeat(self.indent_level);
        self.output.push_str(&indent);
    }

    pub fn indent(&mut self) {
        self.indent_level += 1;
    }

    pub fn dedent(&mut self) {
        if self.indent_level > 0 {
            self.indent_level -= 1;
        }
    }

    pub fn write_declaration(&mut self, version: &str, encoding: Option<&str>, standalone: Option<&str>) {
        self.output.push_str("<?xml version=\"");
        self.output.push_str(version);
        self.output.push('"');
        if let Some(enc) = encoding {
            self.output.push_str(" encoding=\"");
            self.output.push_str(enc);
            self.output.push('"');
        }
        if let Some(sa) = standalone {
            self.output.push_str(" standalone=\"");
            self.output.push_str(sa);
            self.output.push('"');
        }
        self.output.push_str("?>");
    }

    pub fn write_doctype(&mut self, content: &str) {
        self.output.push_str("<!DOCTYPE ");
        self.output.push_str(content);
        self.output.push('>');
    }

    pub fn write_comment(&mut self, text: &str) {
        self.output.push_str("<!--");
        self.output.push_str(text);
        self.output.push_str("-->");
    }

    /// Write opening tag start (just the element name)
    pub fn write_element_start(&mut self, name: &str) {
        self.output.push('<');
        self.output.push_str(name);
    }

    /// Write an attribute whose value is already escaped.
    ///
    /// Values holding a literal `"` were written with single quotes in the
    /// source and keep them.
    pub fn write_attribute(&mut self, name: &str, value: &str) {
        let quote = if value.contains('"') { '\'' } else { '"' };
        self.output.push(' ');
        self.output.push_str(name);
        self.output.push('=');
        self.output.push(quote);
        self.output.push_str(value);
        self.output.push(quote);
    }

    /// Close opening tag (not self-closing)
    pub fn write_element_end(&mut self) {
        self.output.push('>');
    }

    pub fn write_element_end_empty(&mut self) {
        self.output.push_str("/>");
    }

    pub fn write_close_tag(&mut self, name: &str) {
        self.output.push_str("</");
        self.output.push_str(name);
        self.output.push('>');
    }

    /// Write escaped text, with runs of whitespace collapsed
    pub fn write_text(&mut self, text: &str) {
        let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
        self.output.push_str(&normalized);
    }

    /// Write text that sits between inline siblings.
    ///
    /// Whitespace runs are collapsed like [`write_text`](Self::write_text),
    /// but a leading or trailing run is kept as a single space so the text
    /// stays separated from the neighbouring markup.
    pub fn write_flowing_text(&mut self, text: &str) {
        let words = text.split_whitespace().collect::<Vec<_>>().join(" ");
        if text.starts_with(char::is_whitespace) {
            self.output.push(' ');
        }
        self.output.push_str(&words);
        if !words.is_empty() && text.ends_with(char::is_whitespace) {
            self.output.push(' ');
        }
    }

    pub fn write_cdata(&mut self, content: &str) {
        self.output.push_str("<![CDATA[");
        self.output.push_str(content);
        self.output.push_str("]]>");
    }

    pub fn write_pi(&mut self, target: &str, content: Option<&str>) {
        self.output.push_str("<?");
        self.output.push_str(target);
        if let Some(c) = content {
            self.output.push(' ');
            self.output.push_str(c);
        }
        self.output.push_str("?>");
    }
}

/// Serialize a document with the configured indentation
pub fn serialize(doc: &Document, config: &OutputConfig) -> String {
    let mut w = XmlWriter::new(config.clone());

    if let Some(decl) = doc.declaration() {
        w.write_declaration(
            &decl.version,
            decl.encoding.as_deref(),
            decl.standalone.as_deref(),
        );
        w.newline();
    }

    for &child in doc.children(doc.document_node()) {
        write_node(&mut w, doc, child);
    }

    w.finish()
}

fn write_node(w: &mut XmlWriter, doc: &Document, id: NodeId) {
    match doc.kind(id) {
        NodeKind::Document => {}
        NodeKind::Element(el) => {
            let name = el.name.qualified();
            w.write_indent();
            w.write_element_start(&name);
            for ns in &el.namespaces {
                match &ns.prefix {
                    Some(prefix) => w.write_attribute(&format!("xmlns:{}", prefix), &ns.uri),
                    None => w.write_attribute("xmlns", &ns.uri),
                }
            }
            for attr in &el.attributes {
                w.write_attribute(&attr.name.qualified(), &attr.value);
            }

            let children = doc.children(id);
            match children {
                [] => {
                    w.write_element_end_empty();
                    w.newline();
                }
                [only] if is_inline(doc, *only) => {
                    w.write_element_end();
                    write_inline(w, doc, *only);
                    w.write_close_tag(&name);
                    w.newline();
                }
                // mixed content stays on one line, breaking it would add
                // whitespace to the rendered text
                _ if children.iter().any(|&c| matches!(doc.kind(c), NodeKind::Text(_))) => {
                    w.write_element_end();
                    for &child in children {
                        write_flowing(w, doc, child);
                    }
                    w.write_close_tag(&name);
                    w.newline();
                }
                _ => {
                    w.write_element_end();
                    w.newline();
                    w.indent();
                    for &child in children {
                        write_node(w, doc, child);
                    }
                    w.dedent();
                    w.write_indent();
                    w.write_close_tag(&name);
                    w.newline();
                }
            }
        }
        NodeKind::Text(_) | NodeKind::CData(_) => {
            w.write_indent();
            write_inline(w, doc, id);
            w.newline();
        }
        NodeKind::Comment(text) => {
            w.write_indent();
            w.write_comment(text);
            w.newline();
        }
        NodeKind::ProcessingInstruction { target, content } => {
            w.write_indent();
            w.write_pi(target, (!content.is_empty()).then_some(content.as_str()));
            w.newline();
        }
        NodeKind::Doctype(content) => {
            w.write_doctype(content);
            w.newline();
        }
    }
}

fn is_inline(doc: &Document, id: NodeId) -> bool {
    matches!(doc.kind(id), NodeKind::Text(_) | NodeKind::CData(_))
}

fn write_inline(w: &mut XmlWriter, doc: &Document, id: NodeId) {
    match doc.kind(id) {
        NodeKind::Text(text) => w.write_text(text),
        NodeKind::CData(content) => w.write_cdata(content),
        _ => {}
    }
}

/// Write a node and its subtree without line breaks or indentation
fn write_flowing(w: &mut XmlWriter, doc: &Document, id: NodeId) {
    match doc.kind(id) {
        NodeKind::Element(el) => {
            let name = el.name.qualified();
            w.write_element_start(&name);
            for ns in &el.namespaces {
                match &ns.prefix {
                    Some(prefix) => w.write_attribute(&format!("xmlns:{}", prefix), &ns.uri),
                    None => w.write_attribute("xmlns", &ns.uri),
                }
            }
            for attr in &el.attributes {
                w.write_attribute(&attr.name.qualified(), &attr.value);
            }
            let children = doc.children(id);
            if children.is_empty() {
                w.write_element_end_empty();
            } else {
                w.write_element_end();
                for &child in children {
                    write_flowing(w, doc, child);
                }
                w.write_close_tag(&name);
            }
        }
        NodeKind::Text(text) => w.write_flowing_text(text),
        NodeKind::CData(content) => w.write_cdata(content),
        NodeKind::Comment(text) => w.write_comment(text),
        NodeKind::ProcessingInstruction { target, content } => {
            w.write_pi(target, (!content.is_empty()).then_some(content.as_str()))
        }
        NodeKind::Document | NodeKind::Doctype(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IndentStyle;
    use pretty_assertions::assert_eq;

    fn default_config() -> OutputConfig {
        OutputConfig::default()
    }

    #[test]
    fn test_write_declaration() {
        let mut w = XmlWriter::new(default_config());
        w.write_declaration("1.0", Some("UTF-8"), None);
        let output = w.finish();
        assert!(output.contains("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
    }

    #[test]
    fn test_attribute_quotes() {
        let mut w = XmlWriter::new(default_config());
        w.write_element_start("h:outputText");
        w.write_attribute("value", "#{msg['label']}");
        w.write_attribute("title", r#"say "hi""#);
        w.write_element_end_empty();
        let output = w.finish();
        assert!(output.contains(r##"value="#{msg['label']}""##));
        assert!(output.contains(r#"title='say "hi"'"#));
    }

    #[test]
    fn test_write_text_collapses_whitespace() {
        let mut w = XmlWriter::new(default_config());
        w.write_text("  Hello\n     &amp; world  ");
        assert_eq!(w.finish(), "Hello &amp; world\n");
    }

    #[test]
    fn test_dedent_at_zero() {
        let mut w = XmlWriter::new(default_config());
        w.dedent();
        w.write_indent();
        w.write_comment("x");
        assert!(w.finish().starts_with("<!--x-->"));
    }

    #[test]
    fn test_no_final_newline() {
        let config = OutputConfig {
            insert_final_newline: false,
            ..Default::default()
        };
        let mut w = XmlWriter::new(config);
        w.write_comment("x");
        assert!(!w.finish().ends_with('\n'));
    }

    #[test]
    fn test_serialize_pretty_prints() {
        let doc = Document::parse(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<div xmlns:h="http://java.sun.com/jsf/html"><h:form id="f">
      <h:outputText value="a"/>   <span>  some
   text </span></h:form><!-- end --></div>"#,
        )
        .unwrap();

        let expected = r#"<?xml version="1.0" encoding="UTF-8"?>
<div xmlns:h="http://java.sun.com/jsf/html">
  <h:form id="f">
    <h:outputText value="a"/>
    <span>some text</span>
  </h:form>
  <!-- end -->
</div>
"#;
        assert_eq!(serialize(&doc, &default_config()), expected);
    }

    #[test]
    fn test_serialize_keeps_doctype_and_entities() {
        let doc = Document::parse(
            "<!DOCTYPE html PUBLIC \"-//W3C//DTD XHTML 1.0 Transitional//EN\" \"x.dtd\">\n<p title=\"a&amp;b\">x&nbsp;y</p>",
        )
        .unwrap();
        let output = serialize(&doc, &default_config());
        assert_eq!(
            output,
            "<!DOCTYPE html PUBLIC \"-//W3C//DTD XHTML 1.0 Transitional//EN\" \"x.dtd\">\n<p title=\"a&amp;b\">x&nbsp;y</p>\n"
        );
    }

    #[test]
    fn test_mixed_content_stays_on_one_line() {
        let doc = Document::parse(
            "<div><p class=\"x\">Hello   <b>big\n world</b>! <i/></p><span>t</span></div>",
        )
        .unwrap();
        assert_eq!(
            serialize(&doc, &default_config()),
            "<div>\n  <p class=\"x\">Hello <b>big world</b>! <i/></p>\n  <span>t</span>\n</div>\n"
        );
    }

    #[test]
    fn test_flowing_text_keeps_edge_spaces() {
        let mut w = XmlWriter::new(default_config());
        w.write_flowing_text("  a \n b ");
        w.write_flowing_text("c");
        assert_eq!(w.finish(), " a b c\n");
    }

    #[test]
    fn test_serialize_tab_indentation() {
        let config = OutputConfig {
            indent_style: IndentStyle::Tab,
            indent_size: 1,
            ..Default::default()
        };
        let doc = Document::parse("<a><b/></a>").unwrap();
        assert_eq!(serialize(&doc, &config), "<a>\n\t<b/>\n</a>\n");
    }

    #[test]
    fn test_serialize_is_stable() {
        let doc = Document::parse("<a x='1'><b>t</b><![CDATA[ <raw> ]]></a>").unwrap();
        let once = serialize(&doc, &default_config());
        let twice = serialize(&Document::parse(&once).unwrap(), &default_config());
        assert_eq!(once, twice);
    }
}
