//! Serialization of documents and fragments to XML text.
//!
//! The serializer walks the tree carrying a namespace [`Scope`] and derives
//! every `xmlns` declaration it writes from the names of elements and
//! attributes plus the declaration attributes stored on the elements.  A
//! binding that is already in effect is never declared again.
use std::borrow::Cow;
use std::io::Write;
use std::rc::Rc;

use encoding_rs::{Encoding, UTF_16BE, UTF_16LE};
use indextree::NodeId;
use log::trace;
use xml::escape::{escape_str_attribute, escape_str_pcdata};

use crate::error::{Error, Result};
use crate::name::NS_XML_URI;
use crate::namespace::{is_reserved_prefix, prefix_key, scope_mut, Scope};
use crate::tree::{Document, Element, Node};

/// The XML declaration to write in front of a document.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum XmlProlog {
    /// `<?xml version="1.0" ...?>`
    Version10,
    /// `<?xml version="1.1" ...?>`
    Version11,
}

/// Options controlling the serializer.
///
/// ```
/// use xmlbridge::{WriteOptions, XmlProlog};
///
/// let options = WriteOptions::new()
///     .set_xml_prolog(Some(XmlProlog::Version11))
///     .set_perform_indent(true);
/// assert!(options.perform_indent());
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WriteOptions {
    xml_prolog: Option<XmlProlog>,
    perform_indent: bool,
    encoding: Cow<'static, str>,
    prefixes: Vec<(String, String)>,
}

impl Default for WriteOptions {
    fn default() -> WriteOptions {
        WriteOptions::new()
    }
}

impl WriteOptions {
    /// Creates the default options: a version 1.0 declaration, UTF-8 and
    /// no indentation.
    pub fn new() -> WriteOptions {
        WriteOptions {
            xml_prolog: Some(XmlProlog::Version10),
            perform_indent: false,
            encoding: Cow::Borrowed("utf-8"),
            prefixes: vec![],
        }
    }

    /// Sets the declaration to write; `None` writes none.
    pub fn set_xml_prolog(mut self, prolog: Option<XmlProlog>) -> WriteOptions {
        self.xml_prolog = prolog;
        self
    }

    /// Indents element-only content by two spaces per level.  Mixed content
    /// is written as is.
    pub fn set_perform_indent(mut self, value: bool) -> WriteOptions {
        self.perform_indent = value;
        self
    }

    /// Sets the output encoding by label, for instance `"iso-8859-1"`.
    pub fn set_encoding<S: Into<Cow<'static, str>>>(mut self, encoding: S) -> WriteOptions {
        self.encoding = encoding.into();
        self
    }

    /// Suggests a prefix for a namespace.  It is used for namespaced
    /// attributes that do not carry a prefix of their own and only when it
    /// does not conflict with a binding on the same element.
    pub fn set_namespace_prefix(mut self, ns: &str, prefix: &str) -> WriteOptions {
        self.prefixes.retain(|(x, _)| x != ns);
        self.prefixes.push((ns.to_string(), prefix.to_string()));
        self
    }

    /// The declaration that is written.
    pub fn xml_prolog(&self) -> Option<XmlProlog> {
        self.xml_prolog
    }

    /// Whether output is indented.
    pub fn perform_indent(&self) -> bool {
        self.perform_indent
    }

    /// The encoding label.
    pub fn encoding(&self) -> &str {
        &self.encoding
    }

    fn preferred_prefix(&self, ns: &str) -> Option<&str> {
        self.prefixes
            .iter()
            .find(|(x, _)| x == ns)
            .map(|(_, prefix)| prefix.as_str())
    }
}

fn output_encoding(label: &str) -> Result<&'static Encoding> {
    let encoding = Encoding::for_label(label.trim().as_bytes())
        .ok_or_else(|| Error::UnsupportedEncoding(label.to_string()))?;
    if encoding == UTF_16LE || encoding == UTF_16BE || encoding.output_encoding() != encoding {
        return Err(Error::UnsupportedEncoding(label.to_string()));
    }
    Ok(encoding)
}

struct Serializer<'d> {
    doc: &'d Document,
    options: &'d WriteOptions,
    out: String,
}

impl<'d> Serializer<'d> {
    fn newline(&mut self, depth: usize) {
        self.out.push('\n');
        for _ in 0..depth {
            self.out.push_str("  ");
        }
    }

    fn write_prolog(&mut self) {
        let version = match self.options.xml_prolog {
            Some(XmlProlog::Version10) => "1.0",
            Some(XmlProlog::Version11) => "1.1",
            None => return,
        };
        self.out.push_str(&format!(
            "<?xml version=\"{}\" encoding=\"{}\"?>",
            version, self.options.encoding
        ));
        if self.options.perform_indent {
            self.out.push('\n');
        }
    }

    fn write_text(&mut self, text: &str, cdata: bool) {
        if cdata {
            self.out.push_str("<![CDATA[");
            self.out.push_str(&text.replace("]]>", "]]]]><![CDATA[>"));
            self.out.push_str("]]>");
        } else {
            self.out.push_str(&escape_str_pcdata(text));
        }
    }

    fn write_node(&mut self, id: NodeId, scope: &Rc<Scope>, depth: usize, indent: bool) -> Result<()> {
        let doc = self.doc;
        match doc.node(id) {
            Some(Node::Document) => {
                let mut first = true;
                for child in doc.children(id) {
                    if doc.node(child).map_or(false, |x| x.is_text()) {
                        continue;
                    }
                    if indent && !first {
                        self.out.push('\n');
                    }
                    first = false;
                    self.write_node(child, scope, depth, indent)?;
                }
            }
            Some(Node::Element(element)) => self.write_element(id, element, scope, depth, indent)?,
            Some(Node::Text(text)) => self.write_text(text, false),
            Some(Node::CData(text)) => self.write_text(text, true),
            Some(Node::Comment(data)) => {
                self.out.push_str("<!--");
                self.out.push_str(data);
                self.out.push_str("-->");
            }
            Some(Node::ProcessingInstruction(pi)) => {
                self.out.push_str("<?");
                self.out.push_str(&pi.target);
                if !pi.data.is_empty() {
                    self.out.push(' ');
                    self.out.push_str(&pi.data);
                }
                self.out.push_str("?>");
            }
            None => return Err(Error::InvalidNode(id)),
        }
        Ok(())
    }

    fn attribute_prefix(&self, prefix: Option<&str>, ns: &str, scope: &Scope, declared: &[String]) -> (String, bool) {
        let candidates = [prefix, self.options.preferred_prefix(ns)];
        for candidate in candidates.iter().flatten() {
            let candidate: &str = candidate;
            if candidate.is_empty() || is_reserved_prefix(Some(candidate)) {
                continue;
            }
            if scope.binds(Some(candidate), ns) {
                return (candidate.to_string(), false);
            }
            if !declared.iter().any(|x| x == candidate) {
                return (candidate.to_string(), true);
            }
        }
        if let Some(prefix) = scope.prefix_for(ns) {
            return (prefix.to_string(), false);
        }
        let generated = scope.generate_prefix(|x| declared.iter().any(|d| d == x));
        (generated, true)
    }

    /// Writes `<name attrs...` and returns the tag name.  The scope is
    /// extended with the bindings declared on the element.
    fn open_tag(&mut self, element: &Element, scope: &mut Rc<Scope>) -> String {
        let mut declared: Vec<String> = vec![];
        let mut pairs: Vec<(String, String)> = vec![];

        fn declare(
            scope: &mut Rc<Scope>,
            declared: &mut Vec<String>,
            pairs: &mut Vec<(String, String)>,
            prefix: Option<&str>,
            ns: &str,
        ) {
            let name = match prefix {
                Some(prefix) => format!("xmlns:{}", prefix),
                None => "xmlns".to_string(),
            };
            pairs.push((name, ns.to_string()));
            declared.push(prefix_key(prefix).to_string());
            scope_mut(scope).bind(prefix, ns);
        }

        let name = element.name();
        let (prefix, ns) = match name.namespace() {
            Some(ns) => (name.prefix(), ns),
            None => (None, ""),
        };
        if !is_reserved_prefix(prefix) && !scope.binds(prefix, ns) {
            declare(scope, &mut declared, &mut pairs, prefix, ns);
        }
        let tag = match prefix {
            Some(prefix) => format!("{}:{}", prefix, name.local_name()),
            None => name.local_name().to_string(),
        };

        for attr in element.attributes() {
            if let Some(prefix) = attr.declared_prefix() {
                let key = prefix_key(prefix);
                if is_reserved_prefix(prefix)
                    || (prefix.is_some() && attr.value().is_empty())
                    || scope.binds(prefix, attr.value())
                    || declared.iter().any(|x| x == key)
                {
                    continue;
                }
                declare(scope, &mut declared, &mut pairs, prefix, attr.value());
                continue;
            }
            let local = attr.name().local_name();
            let qualified = match attr.name().namespace() {
                None => local.to_string(),
                Some(NS_XML_URI) => format!("xml:{}", local),
                Some(ns) => {
                    let (prefix, needs_declaration) =
                        self.attribute_prefix(attr.name().prefix(), ns, &**scope, &declared);
                    if needs_declaration {
                        declare(scope, &mut declared, &mut pairs, Some(&prefix), ns);
                    }
                    format!("{}:{}", prefix, local)
                }
            };
            pairs.push((qualified, attr.value().to_string()));
        }

        self.out.push('<');
        self.out.push_str(&tag);
        for (name, value) in pairs {
            self.out.push(' ');
            self.out.push_str(&name);
            self.out.push_str("=\"");
            self.out.push_str(&escape_str_attribute(&value));
            self.out.push('"');
        }
        tag
    }

    fn write_element(
        &mut self,
        id: NodeId,
        element: &Element,
        parent_scope: &Rc<Scope>,
        depth: usize,
        indent: bool,
    ) -> Result<()> {
        let doc = self.doc;
        let mut scope = parent_scope.clone();
        let tag = self.open_tag(element, &mut scope);
        let children: Vec<NodeId> = doc.children(id).collect();
        if element.text().is_none() && children.is_empty() {
            self.out.push_str("/>");
            return Ok(());
        }
        self.out.push('>');
        if let Some(text) = element.text() {
            self.write_text(text, element.is_cdata());
        }

        let pretty = indent
            && element.text().is_none()
            && !children.iter().any(|child| match doc.node(*child) {
                Some(Node::Text(text)) => !text.trim().is_empty(),
                Some(Node::CData(_)) => true,
                _ => false,
            });
        let mut wrote_child = false;
        for child in children {
            match doc.node(child) {
                Some(Node::Text(text)) => {
                    if !pretty {
                        self.write_text(text, false);
                    }
                }
                Some(Node::CData(text)) => self.write_text(text, true),
                _ => {
                    if pretty {
                        self.newline(depth + 1);
                    }
                    self.write_node(child, &scope, depth + 1, pretty)?;
                    wrote_child = true;
                }
            }
        }
        if pretty && wrote_child {
            self.newline(depth);
        }
        self.out.push_str("</");
        self.out.push_str(&tag);
        self.out.push('>');
        Ok(())
    }
}

impl Document {
    /// The default namespace an element inherits from its ancestors.
    fn inherited_default(&self, id: NodeId) -> Option<&str> {
        for ancestor in self.ancestors(id) {
            let element = match self.element(ancestor) {
                Some(element) => element,
                None => continue,
            };
            if element.prefix().is_none() {
                return Some(element.namespace().unwrap_or(""));
            }
            let declared = element
                .attributes()
                .iter()
                .find(|attr| attr.declared_prefix() == Some(None));
            if let Some(attr) = declared {
                return Some(attr.value());
            }
        }
        None
    }

    /// Serializes a node into a string.
    ///
    /// Passing the document node writes the whole document.  Any other node
    /// is written as a fragment: an element that inherits a default
    /// namespace it does not itself belong to gets an `xmlns=""` reset.
    pub fn to_string_with_options(&self, id: NodeId, options: &WriteOptions) -> Result<String> {
        output_encoding(options.encoding())?;
        let scope = if id != self.document_node()
            && self.inherited_default(id).map_or(false, |x| !x.is_empty())
        {
            Scope::empty()
        } else {
            Scope::document()
        };
        let mut serializer = Serializer {
            doc: self,
            options,
            out: String::new(),
        };
        serializer.write_prolog();
        serializer.write_node(id, &Rc::new(scope), 0, options.perform_indent())?;
        trace!("serialized {:?} into {} bytes", id, serializer.out.len());
        Ok(serializer.out)
    }

    /// Serializes a node into a string with the default options.
    pub fn to_string(&self, id: NodeId) -> Result<String> {
        self.to_string_with_options(id, &WriteOptions::new())
    }

    /// Serializes a node into a writer in the configured encoding.
    ///
    /// The output is rendered completely before anything is written.
    /// Characters the encoding cannot represent are written as numeric
    /// character references.
    pub fn write_with_options<W: Write>(&self, id: NodeId, mut w: W, options: &WriteOptions) -> Result<()> {
        let encoding = output_encoding(options.encoding())?;
        let text = self.to_string_with_options(id, options)?;
        let (bytes, _, _) = encoding.encode(&text);
        w.write_all(&bytes)?;
        Ok(())
    }

    /// Serializes a node into a writer with the default options.
    pub fn to_writer<W: Write>(&self, id: NodeId, w: W) -> Result<()> {
        self.write_with_options(id, w, &WriteOptions::new())
    }

    /// Copies a subtree into a new document by writing it out and parsing
    /// it back.  The promotion configuration is carried over.
    pub fn clone_subtree(&self, id: NodeId) -> Result<Document> {
        let text = self.to_string_with_options(id, &WriteOptions::new().set_xml_prolog(None))?;
        let options = crate::deserialize::ParseOptions::new().set_promotion(self.promotion().clone());
        Document::from_str_with_options(&text, &options)
    }
}
