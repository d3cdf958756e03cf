//! A namespace-aware XML document model with an exact serializer and an
//! incremental, dispatching builder.
//!
//! ## Usage
//!
//! ```rust
//! use xmlbridge::{Document, WriteOptions};
//!
//! let doc: Document = r#"<?xml version="1.0"?>
//! <root xmlns="tag:myns" xmlns:foo="tag:otherns">
//!     <list a="1" b="2" c="3">
//!         <item foo:attr="foo1"/>
//!         <item foo:attr="foo2"/>
//!         <item foo:attr="foo3"/>
//!     </list>
//! </root>
//! "#.parse().unwrap();
//! let root = doc.root().unwrap();
//! let list = doc.get_child(root, "{tag:myns}list").unwrap();
//! for child in doc.get_children(list, "{tag:myns}item") {
//!     println!("attribute: {}", doc.get_attr(child, "{tag:otherns}attr").unwrap());
//! }
//! let out = doc.to_string_with_options(list, &WriteOptions::new().set_xml_prolog(None)).unwrap();
//! assert!(out.starts_with(r#"<list xmlns="tag:myns" a="1""#));
//! ```
//!
//! ## Design Notes
//!
//! All nodes of a document live in an arena owned by the [`Document`] and
//! are addressed by [`NodeId`] handles.  Nodes know their parent and their
//! siblings, so elements can be moved around, detached and attached again.
//! A node that is forgotten releases its whole subtree and handles to it
//! stop resolving.
//!
//! If you are coming from ElementTree the following differences are the
//! most striking:
//!
//! *   There is no `tail`.  Text is stored in the element when it is the only
//!     content of the element, otherwise every text segment is a text node
//!     between the element children (mixed content).
//! *   Names keep the prefix they were parsed with.  Lookups go through
//!     [`QName`] which only considers namespace and local name and accepts
//!     ``{namespace}local`` notation.
//! *   Namespace declarations are attributes in the xmlns namespace.  The
//!     serializer only writes the ones a reader needs to resolve the names
//!     correctly and adds the ones that are missing.
//!
//! ## Streaming
//!
//! [`IncrementalParser`] is fed chunks of a document and calls back when
//! elements complete.  Callbacks are registered on levels, names, paths or
//! as defaults, see [`Trigger`].
mod deserialize;
mod dispatch;
mod error;
mod feed;
mod incremental;
mod name;
mod namespace;
mod path;
mod promote;
mod serialize;
mod tree;
mod xmlrs;

pub use indextree::NodeId;

pub use crate::deserialize::{NodeType, ParseOptions, ParsedAttribute, ParsedNode};
pub use crate::dispatch::{Callback, DispatchMode, Trigger, TriggerKind};
pub use crate::error::{Error, Result};
pub use crate::incremental::IncrementalParser;
pub use crate::name::{AsQName, Name, QName, ANY_NAMESPACE, NS_XMLNS_PREFIX, NS_XMLNS_URI, NS_XML_PREFIX, NS_XML_URI};
pub use crate::path::{AttributeFilter, Path, PathStep};
pub use crate::promote::{Field, Promotion};
pub use crate::serialize::{WriteOptions, XmlProlog};
pub use crate::tree::{Attribute, Document, Element, Node, ProcessingInstruction};
pub use crate::xmlrs::XmlRsNode;
