//! A parsed node tree read with xml-rs.
use std::io::Read;
use std::slice;

use xml::name::OwnedName;
use xml::namespace::Namespace;
use xml::reader::{ParserConfig, XmlEvent};

use crate::deserialize::{NodeType, ParsedAttribute, ParsedNode};
use crate::error::{Error, Result};
use crate::name::{NS_XMLNS_PREFIX, NS_XMLNS_URI, NS_XML_PREFIX};

#[derive(Clone, Debug, PartialEq, Eq)]
struct XmlRsAttribute {
    local: String,
    prefix: Option<String>,
    namespace: Option<String>,
    value: String,
}

/// A node read by xml-rs.
///
/// Namespace declarations are not reported by xml-rs as attributes, they
/// are reconstructed from the difference between an element's namespace
/// map and the one of its parent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct XmlRsNode {
    kind: NodeType,
    local: String,
    prefix: Option<String>,
    namespace: Option<String>,
    value: String,
    attributes: Vec<XmlRsAttribute>,
    children: Vec<XmlRsNode>,
}

impl XmlRsNode {
    fn new(kind: NodeType) -> XmlRsNode {
        XmlRsNode {
            kind,
            local: String::new(),
            prefix: None,
            namespace: None,
            value: String::new(),
            attributes: vec![],
            children: vec![],
        }
    }

    fn leaf(kind: NodeType, value: String) -> XmlRsNode {
        XmlRsNode {
            value,
            ..XmlRsNode::new(kind)
        }
    }

    fn element(name: OwnedName) -> XmlRsNode {
        XmlRsNode {
            local: name.local_name,
            prefix: name.prefix,
            namespace: name.namespace,
            ..XmlRsNode::new(NodeType::Element)
        }
    }

    /// Reads a complete document.
    pub fn parse<R: Read>(r: R, trim_whitespace: bool) -> Result<XmlRsNode> {
        let cfg = ParserConfig::new()
            .whitespace_to_characters(true)
            .cdata_to_characters(false)
            .ignore_comments(false)
            .coalesce_characters(true)
            .trim_whitespace(trim_whitespace);
        let mut reader = cfg.create_reader(r);
        let mut stack = vec![(XmlRsNode::new(NodeType::Document), Namespace::empty())];

        fn push(stack: &mut [(XmlRsNode, Namespace)], node: XmlRsNode) {
            if let Some((parent, _)) = stack.last_mut() {
                parent.children.push(node);
            }
        }

        loop {
            match reader.next()? {
                XmlEvent::StartDocument { .. } => {}
                XmlEvent::EndDocument => break,
                XmlEvent::ProcessingInstruction { name, data } => {
                    let mut node = XmlRsNode::leaf(NodeType::ProcessingInstruction, data.unwrap_or_default());
                    node.local = name;
                    push(&mut stack, node);
                }
                XmlEvent::StartElement {
                    name,
                    attributes,
                    namespace,
                } => {
                    let mut node = XmlRsNode::element(name);
                    if let Some((_, parent)) = stack.last() {
                        for (prefix, uri) in namespace.0.iter() {
                            if prefix == NS_XML_PREFIX || prefix == NS_XMLNS_PREFIX {
                                continue;
                            }
                            let inherited = parent.0.get(prefix).map(|x| x.as_str());
                            if inherited == Some(uri.as_str()) || (inherited.is_none() && prefix.is_empty() && uri.is_empty()) {
                                continue;
                            }
                            node.attributes.push(if prefix.is_empty() {
                                XmlRsAttribute {
                                    local: NS_XMLNS_PREFIX.to_string(),
                                    prefix: None,
                                    namespace: Some(NS_XMLNS_URI.to_string()),
                                    value: uri.clone(),
                                }
                            } else {
                                XmlRsAttribute {
                                    local: prefix.clone(),
                                    prefix: Some(NS_XMLNS_PREFIX.to_string()),
                                    namespace: Some(NS_XMLNS_URI.to_string()),
                                    value: uri.clone(),
                                }
                            });
                        }
                    }
                    node.attributes.extend(attributes.into_iter().map(|attr| XmlRsAttribute {
                        local: attr.name.local_name,
                        prefix: attr.name.prefix,
                        namespace: attr.name.namespace,
                        value: attr.value,
                    }));
                    stack.push((node, namespace));
                }
                XmlEvent::EndElement { .. } => {
                    if stack.len() < 2 {
                        return Err(Error::MalformedStream("unbalanced end element".into()));
                    }
                    if let Some((node, _)) = stack.pop() {
                        push(&mut stack, node);
                    }
                }
                XmlEvent::CData(data) => push(&mut stack, XmlRsNode::leaf(NodeType::CData, data)),
                XmlEvent::Comment(data) => push(&mut stack, XmlRsNode::leaf(NodeType::Comment, data)),
                XmlEvent::Characters(data) | XmlEvent::Whitespace(data) => {
                    let data = if trim_whitespace {
                        data.trim().to_string()
                    } else {
                        data
                    };
                    if !data.is_empty() {
                        push(&mut stack, XmlRsNode::leaf(NodeType::Text, data));
                    }
                }
                #[allow(unreachable_patterns)]
                _ => {}
            }
        }

        match stack.pop() {
            Some((document, _)) if stack.is_empty() => Ok(document),
            _ => Err(Error::MalformedStream("document ended inside an element".into())),
        }
    }
}

impl<'a> ParsedNode for &'a XmlRsNode {
    type Children = slice::Iter<'a, XmlRsNode>;

    fn node_type(&self) -> NodeType {
        self.kind
    }

    fn local_name(&self) -> &str {
        &self.local
    }

    fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    fn value(&self) -> &str {
        &self.value
    }

    fn attributes(&self) -> Vec<ParsedAttribute<'_>> {
        self.attributes
            .iter()
            .map(|attr| ParsedAttribute {
                local_name: &attr.local,
                prefix: attr.prefix.as_deref(),
                namespace: attr.namespace.as_deref(),
                value: &attr.value,
            })
            .collect()
    }

    fn children(&self) -> Self::Children {
        let node: &'a XmlRsNode = *self;
        node.children.iter()
    }
}
