//! Qualified names.
//!
//! Two name types exist.  [`QName`] is the lookup name: a namespace URI and a
//! local name, written in ``{namespace}local`` notation, and it is what all
//! the accessors accept.  [`Name`] is the stored name of elements and
//! attributes and additionally remembers the prefix the node was written
//! with, which the serializer needs to reproduce the document faithfully.
use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;

use string_cache::DefaultAtom as Atom;

pub use xml::namespace::{NS_XMLNS_PREFIX, NS_XMLNS_URI, NS_XML_PREFIX, NS_XML_URI};

/// Namespace wildcard for lookups.
///
/// ``{*}item`` matches an `item` element in any namespace, including none.
pub const ANY_NAMESPACE: &str = "*";

pub(crate) enum XmlAtom<'a> {
    Shared(Atom),
    Borrowed(&'a str),
}

impl<'a> Deref for XmlAtom<'a> {
    type Target = str;

    #[inline(always)]
    fn deref(&self) -> &str {
        match *self {
            XmlAtom::Shared(ref atom) => atom.deref(),
            XmlAtom::Borrowed(s) => s,
        }
    }
}

impl<'a> XmlAtom<'a> {
    #[inline(always)]
    pub fn borrow(&self) -> &str {
        self
    }
}

impl<'a> fmt::Debug for XmlAtom<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", self.borrow())
    }
}

impl<'a> Clone for XmlAtom<'a> {
    fn clone(&self) -> XmlAtom<'a> {
        match *self {
            XmlAtom::Shared(ref atom) => XmlAtom::Shared(atom.clone()),
            XmlAtom::Borrowed(s) => XmlAtom::Borrowed(s),
        }
    }
}

impl<'a> PartialEq for XmlAtom<'a> {
    fn eq(&self, other: &XmlAtom<'a>) -> bool {
        self.borrow().eq(other.borrow())
    }
}

impl<'a> Eq for XmlAtom<'a> {}

impl<'a> Hash for XmlAtom<'a> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.borrow().hash(state)
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.is_empty())
}

/// Convenience trait to get a `QName` from an object.
///
/// This is used for the accessor interface on documents.
pub trait AsQName<'a> {
    /// Returns a Cow'ed `QName` from the given object.
    fn as_qname(&self) -> Cow<'a, QName<'a>>;
}

impl<'a> AsQName<'a> for &'a QName<'a> {
    #[inline(always)]
    fn as_qname(&self) -> Cow<'a, QName<'a>> {
        Cow::Borrowed(*self)
    }
}

impl<'a> AsQName<'a> for QName<'a> {
    #[inline(always)]
    fn as_qname(&self) -> Cow<'a, QName<'a>> {
        Cow::Owned(self.clone())
    }
}

impl<'a> AsQName<'a> for &'a str {
    #[inline(always)]
    fn as_qname(&self) -> Cow<'a, QName<'a>> {
        Cow::Owned(QName::from(*self))
    }
}

impl<'a> AsQName<'a> for (&'a str, &'a str) {
    #[inline(always)]
    fn as_qname(&self) -> Cow<'a, QName<'a>> {
        Cow::Owned(QName::from_ns_name(Some(self.0), self.1))
    }
}

impl<'a> AsQName<'a> for &'a Name {
    #[inline(always)]
    fn as_qname(&self) -> Cow<'a, QName<'a>> {
        let name: &'a Name = *self;
        Cow::Owned(name.qname())
    }
}

/// A `QName` represents a qualified name.
///
/// A qualified name is a tag or attribute name that has a namespace and a
/// local name.  If the namespace is empty no namespace is assumed.  It
/// can be constructed from a qualified name string with the ``from``
/// method.
///
/// Common usage examples:
///
/// ```
/// # use xmlbridge::QName;
/// let href = QName::from_name("href");
/// let a = QName::from("{http://www.w3.org/1999/xhtml}a");
/// let any = QName::from("{*}a");
/// assert!(any.matches(Some("http://www.w3.org/1999/xhtml"), "a"));
/// ```
#[derive(Clone)]
pub struct QName<'a> {
    ns: Option<XmlAtom<'a>>,
    name: XmlAtom<'a>,
}

impl<'a> QName<'a> {
    /// Creates a qualified name from a given string.
    ///
    /// Two formats are supported ``{namespace}tag`` or just ``tag``.
    #[allow(clippy::should_implement_trait)]
    pub fn from(s: &'a str) -> QName<'a> {
        let mut ns = None;
        let mut name = None;
        if s.starts_with('{') {
            if let Some(index) = s.find('}') {
                if index > 1 {
                    ns = Some(XmlAtom::Borrowed(&s[1..index]));
                }
                name = Some(XmlAtom::Borrowed(&s[index + 1..]));
            }
        }

        QName {
            ns,
            name: name.unwrap_or(XmlAtom::Borrowed(s)),
        }
    }

    /// Creates a qualified name from a given string without namespace.
    pub fn from_name(name: &'a str) -> QName<'a> {
        QName {
            ns: None,
            name: XmlAtom::Borrowed(name),
        }
    }

    /// Creates a qualified name from a namespace and name.
    pub fn from_ns_name(ns: Option<&'a str>, name: &'a str) -> QName<'a> {
        QName {
            ns: non_empty(ns).map(XmlAtom::Borrowed),
            name: XmlAtom::Borrowed(name),
        }
    }

    /// Returns the name portion of the qualified name.  This is the local
    /// tag or attribute name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the optional namespace of this name.  This is the URL of
    /// the namespace and not the prefix.
    pub fn ns(&self) -> Option<&str> {
        self.ns.as_ref().map(|x| x.borrow())
    }

    /// Checks a namespace / local name pair against this name.
    ///
    /// The namespace comparison is exact (a name without namespace only
    /// matches nodes without namespace) unless this name uses the
    /// [`ANY_NAMESPACE`] wildcard.
    pub fn matches(&self, ns: Option<&str>, name: &str) -> bool {
        if self.name() != name {
            return false;
        }
        match self.ns() {
            Some(ANY_NAMESPACE) => true,
            own => own == non_empty(ns),
        }
    }

    /// Creates a shared `QName` with static lifetime from an already
    /// existing `QName`.  The internal strings are interned and might
    /// be shared with other instances.
    pub fn share(&self) -> QName<'static> {
        QName {
            name: XmlAtom::Shared(Atom::from(self.name.borrow())),
            ns: self
                .ns
                .as_ref()
                .map(|x| XmlAtom::Shared(Atom::from(x.borrow()))),
        }
    }
}

impl<'a> PartialEq for QName<'a> {
    fn eq(&self, other: &QName<'a>) -> bool {
        self.name() == other.name() && self.ns() == other.ns()
    }
}

impl<'a> Eq for QName<'a> {}

impl<'a> Hash for QName<'a> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        if let Some(ref ns) = self.ns {
            ns.hash(state);
        }
    }
}

impl<'a> fmt::Debug for QName<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "QName(\"{}\")", self)
    }
}

impl<'a> fmt::Display for QName<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Some(ref ns) = self.ns {
            write!(f, "{{{}}}", ns.borrow())?;
        }
        write!(f, "{}", self.name.borrow())
    }
}

/// The stored name of an element or attribute.
///
/// Unlike [`QName`] this keeps the prefix.  Empty prefixes and namespaces
/// are normalized to `None`.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Name {
    local: Atom,
    prefix: Option<Atom>,
    ns: Option<Atom>,
}

impl Name {
    /// A name without prefix and namespace.
    pub fn new(local: &str) -> Name {
        Name {
            local: Atom::from(local),
            prefix: None,
            ns: None,
        }
    }

    /// A name in a namespace, written without prefix (default namespace).
    pub fn ns(ns: &str, local: &str) -> Name {
        Name::from_parts(None, Some(ns), local)
    }

    /// A name in a namespace written with the given prefix.
    pub fn prefixed(prefix: &str, ns: &str, local: &str) -> Name {
        Name::from_parts(Some(prefix), Some(ns), local)
    }

    /// Creates a name from optional parts as handed out by tokenizers.
    pub fn from_parts(prefix: Option<&str>, ns: Option<&str>, local: &str) -> Name {
        Name {
            local: Atom::from(local),
            prefix: non_empty(prefix).map(Atom::from),
            ns: non_empty(ns).map(Atom::from),
        }
    }

    /// The local name.
    pub fn local_name(&self) -> &str {
        &self.local
    }

    /// The prefix the name is written with, if any.
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// The namespace URI, if any.
    pub fn namespace(&self) -> Option<&str> {
        self.ns.as_deref()
    }

    /// The lookup name (namespace and local name).
    pub fn qname(&self) -> QName<'_> {
        QName::from_ns_name(self.namespace(), self.local_name())
    }

    /// Returns the name as written in a document: `prefix:local` or `local`.
    pub fn prefixed_name(&self) -> Cow<'_, str> {
        match self.prefix() {
            Some(prefix) => Cow::Owned(format!("{}:{}", prefix, self.local_name())),
            None => Cow::Borrowed(self.local_name()),
        }
    }

    /// Checks this name against a lookup name.
    pub fn matches<'a, Q: AsQName<'a>>(&self, name: Q) -> bool {
        name.as_qname().matches(self.namespace(), self.local_name())
    }

    /// Does this name carry the given (prefix, namespace) pair?
    pub fn has_pair(&self, prefix: Option<&str>, ns: Option<&str>) -> bool {
        self.prefix() == non_empty(prefix) && self.namespace() == non_empty(ns)
    }

    pub(crate) fn set_pair(&mut self, prefix: Option<&str>, ns: Option<&str>) {
        self.prefix = non_empty(prefix).map(Atom::from);
        self.ns = non_empty(ns).map(Atom::from);
    }

    pub(crate) fn set_local_name(&mut self, local: &str) {
        self.local = Atom::from(local);
    }
}

impl<'a> From<&'a str> for Name {
    /// Parses ``{namespace}local`` notation; the name gets no prefix.
    fn from(s: &'a str) -> Name {
        let qname = QName::from(s);
        Name::from_parts(None, qname.ns(), qname.name())
    }
}

impl<'a> From<(&'a str, &'a str)> for Name {
    fn from((ns, local): (&'a str, &'a str)) -> Name {
        Name::from_parts(None, Some(ns), local)
    }
}

impl<'a, 'b> From<&'b QName<'a>> for Name {
    fn from(qname: &'b QName<'a>) -> Name {
        Name::from_parts(None, qname.ns(), qname.name())
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Name(\"{}\"", self.prefixed_name())?;
        if let Some(ns) = self.namespace() {
            write!(f, ", ns=\"{}\"", ns)?;
        }
        write!(f, ")")
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.prefixed_name())
    }
}
