//! Building documents from parsed node trees.
//!
//! The deserializer does not tokenize anything itself.  It walks any tree
//! that implements [`ParsedNode`] and materializes it as a [`Document`].
//! The crate ships one implementation backed by xml-rs which is what
//! [`Document::from_reader`] and `str::parse` use.
use std::io::Read;
use std::str::FromStr;

use indextree::NodeId;
use log::debug;

use crate::error::{Error, Result};
use crate::name::Name;
use crate::promote::Promotion;
use crate::tree::{Attribute, Document};
use crate::xmlrs::XmlRsNode;

/// The kind of a parsed node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeType {
    Document,
    Element,
    Text,
    CData,
    Comment,
    ProcessingInstruction,
    /// Anything else (doctype, entity references, ...).  Skipped.
    Other,
}

/// An attribute as reported by a parsed node.
///
/// Namespace declarations are reported as attributes in the
/// `http://www.w3.org/2000/xmlns/` namespace.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParsedAttribute<'a> {
    pub local_name: &'a str,
    pub prefix: Option<&'a str>,
    pub namespace: Option<&'a str>,
    pub value: &'a str,
}

/// A node of a tree produced by some external parser.
pub trait ParsedNode: Sized {
    /// Iterator over the children.
    type Children: Iterator<Item = Self>;

    /// The kind of node.
    fn node_type(&self) -> NodeType;

    /// The local name of an element or the target of a processing
    /// instruction.
    fn local_name(&self) -> &str;

    /// The prefix of an element.
    fn prefix(&self) -> Option<&str>;

    /// The namespace URI of an element.
    fn namespace(&self) -> Option<&str>;

    /// The text of text and CDATA nodes, the data of comments and
    /// processing instructions.
    fn value(&self) -> &str;

    /// The attributes of an element in document order.
    fn attributes(&self) -> Vec<ParsedAttribute<'_>>;

    /// The children in document order.
    fn children(&self) -> Self::Children;
}

/// Options for the deserializer.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParseOptions {
    promotion: Promotion,
    trim_whitespace: bool,
}

impl ParseOptions {
    /// The default options: no promotion and whitespace is kept.
    pub fn new() -> ParseOptions {
        ParseOptions::default()
    }

    /// Sets the promotion tables of the resulting document.
    pub fn set_promotion(mut self, promotion: Promotion) -> ParseOptions {
        self.promotion = promotion;
        self
    }

    /// Trims whitespace around text and drops whitespace-only text.
    pub fn set_trim_whitespace(mut self, value: bool) -> ParseOptions {
        self.trim_whitespace = value;
        self
    }

    /// The promotion tables.
    pub fn promotion(&self) -> &Promotion {
        &self.promotion
    }

    /// Whether whitespace is trimmed.
    pub fn trim_whitespace(&self) -> bool {
        self.trim_whitespace
    }
}

fn build<N: ParsedNode>(doc: &mut Document, parent: NodeId, node: N) -> Result<()> {
    match node.node_type() {
        NodeType::Element => {
            let name = Name::from_parts(node.prefix(), node.namespace(), node.local_name());
            let id = doc.create_element(Some(parent), name)?;
            for attr in node.attributes() {
                let name = Name::from_parts(attr.prefix, attr.namespace, attr.local_name);
                doc.set_attribute(id, Attribute::new(name, attr.value))?;
            }
            let children: Vec<N> = node.children().collect();
            let sole_text = match children.as_slice() {
                [only] => matches!(only.node_type(), NodeType::Text | NodeType::CData),
                _ => false,
            };
            if sole_text {
                let only = &children[0];
                doc.set_text(id, only.value())?;
                if only.node_type() == NodeType::CData {
                    doc.set_cdata(id, true)?;
                }
            } else {
                for child in children {
                    build(doc, id, child)?;
                }
            }
        }
        NodeType::Text | NodeType::CData => {
            if parent == doc.document_node() {
                return Ok(());
            }
            if node.node_type() == NodeType::CData {
                doc.create_cdata(Some(parent), node.value())?;
            } else {
                doc.create_text(Some(parent), node.value())?;
            }
        }
        NodeType::Comment => {
            doc.create_comment(Some(parent), node.value())?;
        }
        NodeType::ProcessingInstruction => {
            doc.create_pi(Some(parent), node.local_name(), node.value())?;
        }
        NodeType::Document | NodeType::Other => {}
    }
    Ok(())
}

impl Document {
    /// Materializes a parsed node tree.
    ///
    /// A document node contributes its children, any other node becomes
    /// the single top level node.  Useless and duplicate namespace
    /// declarations are removed afterwards.
    pub fn from_parsed<N: ParsedNode>(node: N, options: &ParseOptions) -> Result<Document> {
        let mut doc = Document::with_promotion(options.promotion().clone());
        let top = doc.document_node();
        if node.node_type() == NodeType::Document {
            for child in node.children() {
                build(&mut doc, top, child)?;
            }
        } else {
            build(&mut doc, top, node)?;
        }
        let useless = doc.remove_useless_namespace_declarations();
        let duplicates = doc.remove_duplicate_namespace_declarations();
        debug!(
            "loaded document with {} nodes, removed {} useless and {} duplicate declarations",
            doc.descendants(top).count(),
            useless,
            duplicates
        );
        Ok(doc)
    }

    /// Parses a document from a reader.
    pub fn from_reader<R: Read>(r: R) -> Result<Document> {
        Document::from_reader_with_options(r, &ParseOptions::new())
    }

    /// Parses a document from a reader with the given options.
    pub fn from_reader_with_options<R: Read>(r: R, options: &ParseOptions) -> Result<Document> {
        let root = XmlRsNode::parse(r, options.trim_whitespace())?;
        Document::from_parsed(&root, options)
    }

    /// Parses a document from a string with the given options.
    pub fn from_str_with_options(s: &str, options: &ParseOptions) -> Result<Document> {
        Document::from_reader_with_options(s.as_bytes(), options)
    }
}

impl FromStr for Document {
    type Err = Error;

    fn from_str(s: &str) -> Result<Document> {
        Document::from_reader(s.as_bytes())
    }
}
