//! The document model.
//!
//! All nodes of a document live in one arena owned by [`Document`] and are
//! addressed through [`NodeId`] handles.  A parent owns its children through
//! the arena's child links; the link from a child back to its parent is a
//! plain handle and never keeps anything alive.  Handles are generational: a
//! handle to a node that was forgotten is rejected by every accessor instead
//! of aliasing whatever node reuses the slot.
use std::cell::Cell;
use std::iter;

use indextree::{Arena, NodeId};

use crate::error::{Error, Result};
use crate::name::{AsQName, Name, NS_XMLNS_PREFIX, NS_XMLNS_URI};
use crate::promote::{Field, Fields, Promotion};

/// A processing instruction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProcessingInstruction {
    /// The target, the first token after `<?`.
    pub target: String,
    /// Everything after the target, opaque.
    pub data: String,
}

/// The payload of a node.
#[derive(Clone, Debug)]
pub enum Node {
    /// The nameless document node.  Exactly one per document.
    Document,
    /// An element.
    Element(Element),
    /// A raw text segment of mixed content.
    Text(String),
    /// A text segment of mixed content written as CDATA section.
    CData(String),
    /// A comment.
    Comment(String),
    /// A processing instruction.
    ProcessingInstruction(ProcessingInstruction),
}

impl Node {
    /// Returns the element if this node is one.
    pub fn as_element(&self) -> Option<&Element> {
        match *self {
            Node::Element(ref element) => Some(element),
            _ => None,
        }
    }

    /// Returns the text of a text segment, CDATA or not.
    pub fn as_text(&self) -> Option<&str> {
        match *self {
            Node::Text(ref text) | Node::CData(ref text) => Some(text),
            _ => None,
        }
    }

    /// Is this a text segment?
    pub fn is_text(&self) -> bool {
        matches!(*self, Node::Text(_) | Node::CData(_))
    }

    fn is_container(&self) -> bool {
        matches!(*self, Node::Document | Node::Element(_))
    }
}

/// An attribute of an element.
///
/// Namespace declarations are attributes too: they live in the
/// `http://www.w3.org/2000/xmlns/` namespace, `xmlns:p="u"` has the local
/// name `p` and the prefix `xmlns`, `xmlns="u"` has the local name `xmlns`
/// and no prefix.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attribute {
    name: Name,
    value: String,
}

impl Attribute {
    /// Creates a new attribute.
    pub fn new<N: Into<Name>, S: Into<String>>(name: N, value: S) -> Attribute {
        Attribute {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Creates a namespace declaration binding `prefix` (or the default
    /// namespace for `None`) to `uri`.
    pub fn declaration(prefix: Option<&str>, uri: &str) -> Attribute {
        let name = match prefix.filter(|x| !x.is_empty()) {
            Some(prefix) => Name::prefixed(NS_XMLNS_PREFIX, NS_XMLNS_URI, prefix),
            None => Name::ns(NS_XMLNS_URI, NS_XMLNS_PREFIX),
        };
        Attribute::new(name, uri)
    }

    /// The name of the attribute.
    pub fn name(&self) -> &Name {
        &self.name
    }

    /// The value of the attribute.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Sets a new value.
    pub fn set_value<S: Into<String>>(&mut self, value: S) {
        self.value = value.into();
    }

    /// Is this a namespace declaration?
    pub fn is_declaration(&self) -> bool {
        self.name.namespace() == Some(NS_XMLNS_URI)
    }

    /// For a namespace declaration returns the declared prefix, `Some(None)`
    /// standing for the default namespace.  `None` for other attributes.
    pub fn declared_prefix(&self) -> Option<Option<&str>> {
        if !self.is_declaration() {
            return None;
        }
        if self.name.prefix().is_none() && self.name.local_name() == NS_XMLNS_PREFIX {
            Some(None)
        } else {
            Some(Some(self.name.local_name()))
        }
    }

    fn same_key(&self, other: &Name) -> bool {
        self.name.namespace() == other.namespace() && self.name.local_name() == other.local_name()
    }

    pub(crate) fn name_mut(&mut self) -> &mut Name {
        &mut self.name
    }
}

/// Represents an XML element.
///
/// The element itself holds its name, attributes and scalar text.  Children
/// are kept by the document and reached through [`Document::children`].
///
/// Text is stored in one of two ways and never both: when the only content
/// of the element is a single text segment it is the scalar `text`,
/// otherwise every text segment is a [`Node::Text`] or [`Node::CData`] child
/// (mixed content).
#[derive(Clone, Debug)]
pub struct Element {
    pub(crate) name: Name,
    pub(crate) attributes: Vec<Attribute>,
    pub(crate) text: Option<String>,
    pub(crate) cdata: bool,
    pub(crate) fields: Fields,
}

impl Element {
    fn new(name: Name) -> Element {
        Element {
            name,
            attributes: vec![],
            text: None,
            cdata: false,
            fields: Fields::default(),
        }
    }

    /// The name of the element.
    pub fn name(&self) -> &Name {
        &self.name
    }

    /// The local name.
    pub fn local_name(&self) -> &str {
        self.name.local_name()
    }

    /// The prefix the element is written with.
    pub fn prefix(&self) -> Option<&str> {
        self.name.prefix()
    }

    /// The namespace URI.
    pub fn namespace(&self) -> Option<&str> {
        self.name.namespace()
    }

    /// The scalar text.
    ///
    /// Note that this does not trim or modify whitespace.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Whether the scalar text has to be written as CDATA section.
    pub fn is_cdata(&self) -> bool {
        self.cdata
    }

    /// All attributes in insertion order.
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Look up an attribute by qualified name.
    pub fn get_attribute<'a, Q: AsQName<'a>>(&self, name: Q) -> Option<&Attribute> {
        let name = name.as_qname();
        self.attributes
            .iter()
            .find(|attr| name.matches(attr.name.namespace(), attr.name.local_name()))
    }

    /// Look up an attribute value by qualified name.
    pub fn get_attr<'a, Q: AsQName<'a>>(&self, name: Q) -> Option<&str> {
        self.get_attribute(name).map(|x| x.value())
    }

    /// Count the attributes.
    pub fn attr_count(&self) -> usize {
        self.attributes.len()
    }

    /// Looks up a promoted field by the qualified name of the child or
    /// attribute it was promoted from.
    pub fn field<'a, Q: AsQName<'a>>(&self, name: Q) -> Option<&Field> {
        self.fields.get(name)
    }

    /// Returns `true` if promotion registered any field on this element.
    pub fn has_fields(&self) -> bool {
        !self.fields.is_empty()
    }
}

enum Position {
    Append,
    Before(NodeId),
    After(NodeId),
}

/// An XML document.
///
/// The document owns every node created through it.  Nodes are either
/// attached somewhere below the document node or detached (no parent), in
/// which case they can serve as templates or be attached later.
///
/// ```
/// use xmlbridge::{Attribute, Document, Name};
///
/// let mut doc = Document::new();
/// let top = doc.document_node();
/// let root = doc.create_element(Some(top), Name::ns("tag:demo", "list")).unwrap();
/// for x in 0..3 {
///     let item = doc.create_element(Some(root), Name::ns("tag:demo", "item")).unwrap();
///     doc.set_text(item, format!("Item {}", x)).unwrap();
///     doc.set_attribute(item, Attribute::new("n", x.to_string())).unwrap();
/// }
/// assert_eq!(doc.get_children(root, "{tag:demo}item").len(), 3);
/// assert_eq!(doc.collapse(root, ","), "Item 0,Item 1,Item 2");
/// ```
#[derive(Clone, Debug)]
pub struct Document {
    pub(crate) arena: Arena<Node>,
    pub(crate) node: NodeId,
    root: Cell<Option<NodeId>>,
    pub(crate) promotion: Promotion,
}

impl Default for Document {
    fn default() -> Document {
        Document::new()
    }
}

impl Document {
    /// Creates an empty document.
    pub fn new() -> Document {
        Document::with_promotion(Promotion::default())
    }

    /// Creates an empty document that promotes children and attributes
    /// according to the given configuration.
    pub fn with_promotion(promotion: Promotion) -> Document {
        let mut arena = Arena::new();
        let node = arena.new_node(Node::Document);
        Document {
            arena,
            node,
            root: Cell::new(None),
            promotion,
        }
    }

    /// The promotion configuration.
    pub fn promotion(&self) -> &Promotion {
        &self.promotion
    }

    /// The document node.  Top level comments, processing instructions and
    /// the root element are its children.
    pub fn document_node(&self) -> NodeId {
        self.node
    }

    /// The root element: the first element child of the document node.
    pub fn root(&self) -> Option<NodeId> {
        if let Some(cached) = self.root.get() {
            if self.live(cached).is_some() && self.parent(cached) == Some(self.node) {
                return Some(cached);
            }
        }
        let found = self
            .children(self.node)
            .find(|child| self.element(*child).is_some());
        self.root.set(found);
        found
    }

    pub(crate) fn live(&self, id: NodeId) -> Option<&indextree::Node<Node>> {
        let node = self.arena.get(id)?;
        if node.is_removed() || id.is_removed(&self.arena) {
            None
        } else {
            Some(node)
        }
    }

    fn live_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.live(id)?;
        self.arena.get_mut(id).map(|x| x.get_mut())
    }

    /// Returns `true` if the handle points to a live node of this document.
    pub fn contains(&self, id: NodeId) -> bool {
        self.live(id).is_some()
    }

    /// Returns the node behind a handle.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.live(id).map(|x| x.get())
    }

    /// Returns the element behind a handle.
    pub fn element(&self, id: NodeId) -> Option<&Element> {
        self.node(id).and_then(|x| x.as_element())
    }

    pub(crate) fn element_mut(&mut self, id: NodeId) -> Result<&mut Element> {
        let exists = self.live(id).is_some();
        match self.live_mut(id) {
            Some(Node::Element(element)) => Ok(element),
            _ if exists => Err(Error::NotAnElement(id)),
            _ => Err(Error::InvalidNode(id)),
        }
    }

    /// The parent of a node.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.live(id).and_then(|x| x.parent())
    }

    /// Iterates over the children of a node.
    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let first = self.live(id).and_then(|x| x.first_child());
        iter::successors(first, move |x| self.arena[*x].next_sibling())
    }

    /// Iterates over the ancestors of a node, starting with its parent.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        iter::successors(self.parent(id), move |x| self.parent(*x))
    }

    /// Iterates over a node and all its descendants in document order.
    pub fn descendants(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let start = self.live(id).map(|_| id);
        start.into_iter().flat_map(move |x| x.descendants(&self.arena))
    }

    /// Returns the number of children.
    pub fn child_count(&self, id: NodeId) -> usize {
        self.children(id).count()
    }

    /// Walks the ancestor chain up to the top: the document node for
    /// attached nodes, the top of the subtree for detached ones.
    pub fn root_of(&self, id: NodeId) -> Result<NodeId> {
        if self.live(id).is_none() {
            return Err(Error::InvalidNode(id));
        }
        Ok(self.ancestors(id).last().unwrap_or(id))
    }

    fn check_container(&self, id: NodeId) -> Result<()> {
        match self.node(id) {
            Some(node) if node.is_container() => Ok(()),
            Some(_) => Err(Error::NotAContainer(id)),
            None => Err(Error::InvalidNode(id)),
        }
    }

    fn new_node(&mut self, parent: Option<NodeId>, node: Node) -> Result<NodeId> {
        if let Some(parent) = parent {
            self.check_container(parent)?;
            if parent == self.node && node.is_text() {
                return Err(Error::Hierarchy(parent));
            }
        }
        let id = self.arena.new_node(node);
        if let Some(parent) = parent {
            self.attach(parent, id, Position::Append)?;
        }
        Ok(id)
    }

    /// Creates an element, appended to `parent` when one is given.
    pub fn create_element<N: Into<Name>>(&mut self, parent: Option<NodeId>, name: N) -> Result<NodeId> {
        self.new_node(parent, Node::Element(Element::new(name.into())))
    }

    /// Creates a text segment, appended to `parent` when one is given.
    pub fn create_text<S: Into<String>>(&mut self, parent: Option<NodeId>, text: S) -> Result<NodeId> {
        self.new_node(parent, Node::Text(text.into()))
    }

    /// Creates a text segment written as CDATA section, appended to
    /// `parent` when one is given.
    pub fn create_cdata<S: Into<String>>(&mut self, parent: Option<NodeId>, text: S) -> Result<NodeId> {
        self.new_node(parent, Node::CData(text.into()))
    }

    /// Creates a comment, appended to `parent` when one is given.
    pub fn create_comment<S: Into<String>>(&mut self, parent: Option<NodeId>, data: S) -> Result<NodeId> {
        self.new_node(parent, Node::Comment(data.into()))
    }

    /// Creates a processing instruction, appended to `parent` when one is given.
    pub fn create_pi<T: Into<String>, S: Into<String>>(
        &mut self,
        parent: Option<NodeId>,
        target: T,
        data: S,
    ) -> Result<NodeId> {
        let pi = ProcessingInstruction {
            target: target.into(),
            data: data.into(),
        };
        self.new_node(parent, Node::ProcessingInstruction(pi))
    }

    /// Moves scalar text into a leading text child so that a child can be
    /// added next to it.  The CDATA flag moves along with the text.
    fn flush_text(&mut self, parent: NodeId) -> Result<()> {
        let segment = match self.live_mut(parent) {
            Some(Node::Element(element)) => match element.text.take() {
                Some(text) if element.cdata => {
                    element.cdata = false;
                    Some(Node::CData(text))
                }
                Some(text) => Some(Node::Text(text)),
                None => None,
            },
            _ => None,
        };
        if let Some(segment) = segment {
            let id = self.arena.new_node(segment);
            parent
                .checked_prepend(id, &mut self.arena)
                .map_err(|_| Error::Hierarchy(id))?;
        }
        Ok(())
    }

    fn attach(&mut self, parent: NodeId, child: NodeId, at: Position) -> Result<()> {
        self.check_container(parent)?;
        match self.node(child) {
            None => return Err(Error::InvalidNode(child)),
            Some(Node::Document) => return Err(Error::Hierarchy(child)),
            Some(x) if x.is_text() && parent == self.node => return Err(Error::Hierarchy(child)),
            Some(_) => {}
        }
        if let Position::Before(pivot) | Position::After(pivot) = at {
            if self.parent(pivot) != Some(parent) {
                return Err(Error::PivotNotFound { parent, pivot });
            }
            if pivot == child {
                return Err(Error::Hierarchy(child));
            }
        }
        if parent == child || self.ancestors(parent).any(|x| x == child) {
            return Err(Error::Hierarchy(child));
        }

        if self.parent(child).is_some() {
            self.detach(child)?;
        }
        self.flush_text(parent)?;

        let arena = &mut self.arena;
        match at {
            Position::Append => parent.checked_append(child, arena),
            Position::Before(pivot) => pivot.checked_insert_before(child, arena),
            Position::After(pivot) => pivot.checked_insert_after(child, arena),
        }
        .map_err(|_| Error::Hierarchy(child))?;

        self.promote_child(parent, child);
        Ok(())
    }

    fn promote_child(&mut self, parent: NodeId, child: NodeId) {
        let rule = match self.element(child) {
            Some(element) => self
                .promotion
                .element_rule(&element.name)
                .map(|rule| (rule, element.name.clone())),
            None => None,
        };
        if let Some((rule, name)) = rule {
            if let Some(Node::Element(parent)) = self.live_mut(parent) {
                parent.fields.attach_child(rule, &name, child);
            }
        }
    }

    /// Appends a node to the children of `parent`.
    ///
    /// A node that is attached elsewhere is moved.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.attach(parent, child, Position::Append)
    }

    /// Inserts `child` right before `pivot`, which must be a child of `parent`.
    pub fn insert_before(&mut self, parent: NodeId, pivot: NodeId, child: NodeId) -> Result<()> {
        self.attach(parent, child, Position::Before(pivot))
    }

    /// Inserts `child` right after `pivot`, which must be a child of `parent`.
    pub fn insert_after(&mut self, parent: NodeId, pivot: NodeId, child: NodeId) -> Result<()> {
        self.attach(parent, child, Position::After(pivot))
    }

    /// Puts `new` in the place of `old`, which must be a child of `parent`.
    ///
    /// `old` is detached but stays alive; forget it if it is not needed
    /// anymore.
    pub fn replace(&mut self, parent: NodeId, old: NodeId, new: NodeId) -> Result<()> {
        if old == new {
            return match self.parent(old) {
                Some(x) if x == parent => Ok(()),
                _ => Err(Error::PivotNotFound { parent, pivot: old }),
            };
        }
        self.attach(parent, new, Position::Before(old))?;
        self.detach(old)
    }

    /// Unlinks a node from its parent.  The subtree stays alive and can be
    /// attached again.
    pub fn detach(&mut self, id: NodeId) -> Result<()> {
        let parent = match self.live(id) {
            Some(node) => node.parent(),
            None => return Err(Error::InvalidNode(id)),
        };
        if let Some(parent) = parent {
            let name = self.element(id).map(|x| x.name.clone());
            if let (Some(name), Some(Node::Element(parent))) = (name, self.live_mut(parent)) {
                parent.fields.detach_child(&name, id);
            }
            id.detach(&mut self.arena);
            if self.root.get() == Some(id) {
                self.root.set(None);
            }
        }
        Ok(())
    }

    /// Detaches a node and releases it together with its whole subtree and
    /// all attributes.  Handles to the released nodes become invalid.
    ///
    /// Forgetting the document node releases all its children.
    pub fn forget(&mut self, id: NodeId) -> Result<()> {
        if id == self.node {
            let children: Vec<_> = self.children(id).collect();
            for child in children {
                self.forget(child)?;
            }
            return Ok(());
        }
        self.detach(id)?;
        id.remove_subtree(&mut self.arena);
        Ok(())
    }

    /// The scalar text of an element or the content of a text segment.
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.node(id)? {
            Node::Element(element) => element.text(),
            node => node.as_text(),
        }
    }

    /// Sets the scalar text of an element (or the content of a text
    /// segment).  An empty string removes the text.
    ///
    /// Elements with children cannot hold scalar text, add a text segment
    /// with [`Document::create_text`] instead.
    pub fn set_text<S: Into<String>>(&mut self, id: NodeId, value: S) -> Result<()> {
        let value = value.into();
        let has_children = self.child_count(id) > 0;
        match self.live_mut(id) {
            Some(Node::Element(element)) => {
                if has_children && !value.is_empty() {
                    return Err(Error::TextWithChildren(id));
                }
                element.text = if value.is_empty() { None } else { Some(value) };
                Ok(())
            }
            Some(Node::Text(text)) | Some(Node::CData(text)) => {
                *text = value;
                Ok(())
            }
            Some(_) => Err(Error::NotAnElement(id)),
            None => Err(Error::InvalidNode(id)),
        }
    }

    /// Marks the scalar text of an element to be written as CDATA.  Text
    /// segments carry their own kind, see [`Document::create_cdata`].
    pub fn set_cdata(&mut self, id: NodeId, cdata: bool) -> Result<()> {
        self.element_mut(id)?.cdata = cdata;
        Ok(())
    }

    /// Sets an attribute.  An attribute with the same namespace and local
    /// name is replaced in place, otherwise the attribute is appended.
    pub fn set_attribute(&mut self, id: NodeId, attr: Attribute) -> Result<()> {
        let promote = self.promotion.promotes_attribute(&attr.name);
        let element = self.element_mut(id)?;
        if promote {
            element.fields.set_value(&attr.name, &attr.value);
        }
        match element.attributes.iter_mut().find(|x| x.same_key(&attr.name)) {
            Some(existing) => *existing = attr,
            None => element.attributes.push(attr),
        }
        Ok(())
    }

    /// Sets an attribute by name and value.
    pub fn set_attr<N: Into<Name>, S: Into<String>>(&mut self, id: NodeId, name: N, value: S) -> Result<()> {
        self.set_attribute(id, Attribute::new(name, value))
    }

    /// Look up an attribute by qualified name.
    pub fn get_attribute<'a, Q: AsQName<'a>>(&self, id: NodeId, name: Q) -> Option<&Attribute> {
        self.element(id)?.get_attribute(name)
    }

    /// Look up an attribute value by qualified name.
    pub fn get_attr<'a, Q: AsQName<'a>>(&self, id: NodeId, name: Q) -> Option<&str> {
        self.element(id)?.get_attr(name)
    }

    /// The attributes of an element, empty for other nodes.
    pub fn attributes(&self, id: NodeId) -> &[Attribute] {
        self.element(id).map_or(&[], |x| x.attributes())
    }

    /// Removes an attribute and returns it.
    pub fn remove_attribute<'a, Q: AsQName<'a>>(&mut self, id: NodeId, name: Q) -> Result<Option<Attribute>> {
        let name = name.as_qname();
        let element = self.element_mut(id)?;
        let pos = element
            .attributes
            .iter()
            .position(|x| name.matches(x.name.namespace(), x.name.local_name()));
        Ok(pos.map(|pos| {
            let attr = element.attributes.remove(pos);
            element.fields.remove_value(&attr.name);
            attr
        }))
    }

    /// Keeps only the attributes for which the predicate returns `true`.
    /// Returns the number of removed attributes.
    pub(crate) fn retain_attributes<F>(&mut self, id: NodeId, mut keep: F) -> Result<usize>
    where
        F: FnMut(&Element, &Attribute) -> bool,
    {
        let flags: Vec<bool> = match self.element(id) {
            Some(element) => element
                .attributes
                .iter()
                .map(|attr| keep(element, attr))
                .collect(),
            None => return self.element_mut(id).map(|_| 0),
        };
        let element = self.element_mut(id)?;
        let before = element.attributes.len();
        let mut flags = flags.into_iter();
        element.attributes.retain(|_| flags.next().unwrap_or(true));
        Ok(before - element.attributes.len())
    }

    /// Looks up a promoted field of an element.  Names use the
    /// ``{namespace}local`` notation, `"item"` finds fields without
    /// namespace.
    pub fn field<'a, Q: AsQName<'a>>(&self, id: NodeId, name: Q) -> Option<&Field> {
        self.element(id)?.field(name)
    }

    /// Returns `true` if `id` has an element child with the given name.
    pub fn has_child<'a, Q: AsQName<'a>>(&self, id: NodeId, name: Q) -> bool {
        self.get_child(id, name).is_some()
    }

    /// Finds the first element child with the given name.
    ///
    /// Namespaces compare exactly: `"item"` only finds items without
    /// namespace, ``"{*}item"`` finds items in any namespace.
    pub fn get_child<'a, Q: AsQName<'a>>(&self, id: NodeId, name: Q) -> Option<NodeId> {
        let name = name.as_qname();
        self.children(id).find(|child| {
            self.element(*child)
                .map_or(false, |x| name.matches(x.namespace(), x.local_name()))
        })
    }

    /// Returns all element children with the given name.
    pub fn get_children<'a, Q: AsQName<'a>>(&self, id: NodeId, name: Q) -> Vec<NodeId> {
        let name = name.as_qname();
        self.children(id)
            .filter(|child| {
                self.element(*child)
                    .map_or(false, |x| name.matches(x.namespace(), x.local_name()))
            })
            .collect()
    }

    /// Concatenates the text of the node and all its descendants in
    /// document order, joined by `separator`.  Attributes, comments and
    /// processing instructions do not contribute.
    pub fn collapse(&self, id: NodeId, separator: &str) -> String {
        let pieces: Vec<&str> = self
            .descendants(id)
            .filter_map(|x| match self.node(x) {
                Some(Node::Element(element)) => element.text(),
                Some(node) => node.as_text(),
                None => None,
            })
            .collect();
        pieces.join(separator)
    }

    /// Returns `true` if text segments and elements are siblings directly
    /// below this node.
    pub fn is_mixed_content(&self, id: NodeId) -> bool {
        let mut text = false;
        let mut elements = false;
        for child in self.children(id) {
            match self.node(child) {
                Some(Node::Element(_)) => elements = true,
                Some(node) if node.is_text() => text = true,
                _ => {}
            }
        }
        text && elements
    }

    /// Rewrites the `(prefix, namespace)` pair `from` to `to` on every
    /// element of the subtree and on namespaced attributes carrying it.
    /// Namespace declarations binding `from` are rewritten to bind `to`.
    ///
    /// Returns the number of rewritten names.
    pub fn update_prefix(
        &mut self,
        id: NodeId,
        from: (Option<&str>, Option<&str>),
        to: (Option<&str>, Option<&str>),
    ) -> Result<usize> {
        if self.live(id).is_none() {
            return Err(Error::InvalidNode(id));
        }
        let ids: Vec<NodeId> = self.descendants(id).collect();
        let mut count = 0;
        for id in ids {
            let element = match self.live_mut(id) {
                Some(Node::Element(element)) => element,
                _ => continue,
            };
            if element.name.has_pair(from.0, from.1) {
                element.name.set_pair(to.0, to.1);
                count += 1;
            }
            for attr in element.attributes.iter_mut() {
                match attr.declared_prefix() {
                    Some(prefix) => {
                        if prefix == from.0.filter(|x| !x.is_empty())
                            && attr.value() == from.1.unwrap_or("")
                        {
                            *attr = Attribute::declaration(to.0, to.1.unwrap_or(""));
                            count += 1;
                        }
                    }
                    None => {
                        if from.1.is_some() && attr.name.has_pair(from.0, from.1) {
                            attr.name_mut().set_pair(to.0, to.1);
                            count += 1;
                        }
                    }
                }
            }
        }
        Ok(count)
    }

    /// Renames an element keeping its prefix and namespace.
    pub fn set_local_name(&mut self, id: NodeId, local: &str) -> Result<()> {
        self.element_mut(id)?.name.set_local_name(local);
        Ok(())
    }
}
