//! Namespace scopes and the declaration cleanup passes.
use std::collections::BTreeMap;
use std::rc::Rc;

use log::debug;
use string_cache::DefaultAtom as Atom;

use crate::name::{NS_XMLNS_PREFIX, NS_XML_PREFIX, NS_XML_URI};
use crate::tree::Document;

/// The prefix key of an optional prefix: `""` stands for the default
/// namespace.
pub(crate) fn prefix_key(prefix: Option<&str>) -> &str {
    prefix.unwrap_or("")
}

/// The prefix bindings in effect at some point of a document.
///
/// Scopes are shared between an element and its children through an `Rc`
/// and only copied when an element declares something new.  The default
/// namespace is stored under the empty prefix; an empty URI means "no
/// namespace".
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Scope {
    prefix_to_ns: BTreeMap<Atom, Atom>,
    ns_to_prefix: BTreeMap<Atom, Atom>,
}

impl Scope {
    /// A scope that only knows the `xml` prefix.  Nothing, not even the
    /// default namespace, is bound.
    pub fn empty() -> Scope {
        let mut scope = Scope {
            prefix_to_ns: BTreeMap::new(),
            ns_to_prefix: BTreeMap::new(),
        };
        scope.bind(Some(NS_XML_PREFIX), NS_XML_URI);
        scope
    }

    /// The scope at the top of a document: the default prefix is bound to
    /// no namespace.
    pub fn document() -> Scope {
        let mut scope = Scope::empty();
        scope.bind(None, "");
        scope
    }

    /// Resolves a prefix.  `None` resolves the default namespace.
    pub fn resolve(&self, prefix: Option<&str>) -> Option<&str> {
        self.prefix_to_ns
            .get(&Atom::from(prefix_key(prefix)))
            .map(|x| &**x)
    }

    /// Is `prefix` bound to `ns` (`""` for no namespace)?
    pub fn binds(&self, prefix: Option<&str>, ns: &str) -> bool {
        self.resolve(prefix) == Some(ns)
    }

    /// Binds a prefix, shadowing an existing binding.
    pub fn bind(&mut self, prefix: Option<&str>, ns: &str) {
        let key = Atom::from(prefix_key(prefix));
        let url = Atom::from(ns);
        if let Some(old) = self.prefix_to_ns.insert(key.clone(), url.clone()) {
            if self.ns_to_prefix.get(&old) == Some(&key) {
                self.ns_to_prefix.remove(&old);
            }
        }
        if !key.is_empty() && !url.is_empty() {
            self.ns_to_prefix.insert(url, key);
        }
    }

    /// Returns a non-default prefix currently bound to `ns`.
    pub fn prefix_for(&self, ns: &str) -> Option<&str> {
        let prefix = self.ns_to_prefix.get(&Atom::from(ns))?;
        if self.prefix_to_ns.get(prefix).map(|x| &**x) == Some(ns) {
            Some(prefix)
        } else {
            None
        }
    }

    /// Returns `true` if the prefix has any binding.
    pub fn is_bound(&self, prefix: Option<&str>) -> bool {
        self.resolve(prefix).is_some()
    }

    /// Generates an unused prefix of the form `nsN`.
    pub fn generate_prefix<F: Fn(&str) -> bool>(&self, taken: F) -> String {
        let mut i = 1;
        loop {
            let prefix = format!("ns{}", i);
            if !self.is_bound(Some(&prefix)) && !taken(&prefix) {
                return prefix;
            }
            i += 1;
        }
    }
}

/// Copy-on-write access to a shared scope.
pub(crate) fn scope_mut(scope: &mut Rc<Scope>) -> &mut Scope {
    Rc::make_mut(scope)
}

impl Document {
    /// Removes namespace declarations that restate a binding already in
    /// effect through an ancestor or an earlier declaration on the same
    /// element.  The first declaration of a binding wins.
    ///
    /// Returns the number of removed declarations.  Running the pass twice
    /// removes nothing the second time.
    pub fn remove_duplicate_namespace_declarations(&mut self) -> usize {
        let mut removed = 0;
        let mut stack = vec![(self.document_node(), Rc::new(Scope::empty()))];
        while let Some((id, mut scope)) = stack.pop() {
            if self.element(id).is_some() {
                removed += self
                    .retain_attributes(id, |_, attr| match attr.declared_prefix() {
                        Some(prefix) => {
                            if scope.binds(prefix, attr.value()) {
                                false
                            } else {
                                scope_mut(&mut scope).bind(prefix, attr.value());
                                true
                            }
                        }
                        None => true,
                    })
                    .unwrap_or(0);
            }
            let children: Vec<_> = self.children(id).collect();
            for child in children.into_iter().rev() {
                stack.push((child, scope.clone()));
            }
        }
        debug!("removed {} duplicate namespace declarations", removed);
        removed
    }

    /// Removes namespace declarations that restate the (prefix, namespace)
    /// pair of the element's own name or of one of its namespaced
    /// attributes.  The serializer derives these bindings from the names.
    ///
    /// Returns the number of removed declarations.
    pub fn remove_useless_namespace_declarations(&mut self) -> usize {
        let ids: Vec<_> = self.descendants(self.document_node()).collect();
        let mut removed = 0;
        for id in ids {
            if self.element(id).is_none() {
                continue;
            }
            removed += self
                .retain_attributes(id, |element, attr| {
                    let prefix = match attr.declared_prefix() {
                        Some(prefix) => prefix,
                        None => return true,
                    };
                    let ns = Some(attr.value());
                    if element.name().has_pair(prefix, ns) {
                        return false;
                    }
                    !element.attributes().iter().any(|other| {
                        !other.is_declaration()
                            && other.name().namespace().is_some()
                            && other.name().has_pair(prefix, ns)
                    })
                })
                .unwrap_or(0);
        }
        debug!("removed {} useless namespace declarations", removed);
        removed
    }
}

/// Prefixes that never get declared.
pub(crate) fn is_reserved_prefix(prefix: Option<&str>) -> bool {
    matches!(prefix, Some(NS_XML_PREFIX) | Some(NS_XMLNS_PREFIX))
}
