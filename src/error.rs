use std::io;

use indextree::NodeId;

/// Errors produced by the document model, the serializer and the parsers.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The XML is invalid (reported by the xml-rs tokenizer).
    #[error("Malformed XML. {0}")]
    MalformedXml(#[from] xml::reader::Error),
    /// The XML is invalid (reported by the quick-xml tokenizer).
    #[error("Malformed XML. {0}")]
    Tokenizer(#[from] quick_xml::Error),
    /// An IO error.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// The node handle does not point to a live node of this document.
    #[error("node {0:?} does not exist in this document")]
    InvalidNode(NodeId),
    /// The operation needs an element.
    #[error("node {0:?} is not an element")]
    NotAnElement(NodeId),
    /// The node cannot hold children (text, comment and PI nodes).
    #[error("node {0:?} cannot have children")]
    NotAContainer(NodeId),
    /// The pivot of a positional insert or replace is not a child of the parent.
    #[error("node {pivot:?} is not a child of {parent:?}")]
    PivotNotFound { parent: NodeId, pivot: NodeId },
    /// The move would make a node its own descendant, or moves the document node.
    #[error("node {0:?} cannot be inserted at this position")]
    Hierarchy(NodeId),
    /// Scalar text was assigned to an element that holds children.
    #[error("element {0:?} has children, text must be added as a text node")]
    TextWithChildren(NodeId),
    /// The event stream handed to the incremental parser is out of order.
    #[error("malformed event stream: {0}")]
    MalformedStream(String),
    /// A prefix was used without a namespace declaration in scope.
    #[error("unbound namespace prefix {0:?}")]
    UnboundPrefix(String),
    /// The document is not complete yet.
    #[error("document is incomplete, {0} element(s) still open")]
    Incomplete(usize),
    /// The incremental parser was closed.
    #[error("parser is closed")]
    Closed,
    /// An earlier chunk failed to apply; the parser needs a reset.
    #[error("parser stopped after an earlier error, reset it to continue")]
    Failed,
    /// A path expression could not be parsed.
    #[error("invalid path expression {0:?}")]
    InvalidPath(String),
    /// The requested output encoding is unknown or cannot be produced.
    #[error("unsupported output encoding {0:?}")]
    UnsupportedEncoding(String),
    /// A dispatch callback failed.
    #[error(transparent)]
    Dispatch(#[from] anyhow::Error),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
