//! Promotion of children and attributes to named fields.
//!
//! A [`Promotion`] configuration lists, per namespace, the local names of
//! child elements or attributes that should additionally be reachable as a
//! named field on their parent element.  This is pure sugar: the children
//! and attributes stay where they are, the fields live in a side table on the
//! element and are only indexes into the canonical structure.
//!
//! ```
//! use xmlbridge::{Document, Field, ParseOptions, Promotion};
//!
//! let options = ParseOptions::new()
//!     .set_promotion(Promotion::new().as_list(None, &["item"]));
//! let doc = Document::from_str_with_options("<root><item/><item/></root>", &options).unwrap();
//! let root = doc.root().unwrap();
//! match doc.field(root, "item") {
//!     Some(Field::List(items)) => assert_eq!(items.len(), 2),
//!     other => panic!("unexpected field {:?}", other),
//! }
//! ```
use std::collections::{BTreeMap, HashMap};

use indextree::NodeId;

use crate::name::{AsQName, Name};

type NameTable = HashMap<Option<String>, Vec<String>>;

/// Which children and attributes are exposed as fields.
///
/// All three tables are keyed by namespace URI (`None` for names without a
/// namespace) and hold local names.  Empty tables promote nothing.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Promotion {
    as_attribute: NameTable,
    as_list: NameTable,
    as_attribute_of_element: NameTable,
}

fn register<S: AsRef<str>>(table: &mut NameTable, ns: Option<&str>, names: &[S]) {
    let entry = table
        .entry(ns.filter(|x| !x.is_empty()).map(|x| x.to_string()))
        .or_default();
    entry.extend(names.iter().map(|x| x.as_ref().to_string()));
}

fn lookup(table: &NameTable, name: &Name) -> bool {
    table
        .get(&name.namespace().map(|x| x.to_string()))
        .map_or(false, |names| names.iter().any(|x| x == name.local_name()))
}

impl Promotion {
    /// Creates an empty configuration.
    pub fn new() -> Promotion {
        Promotion::default()
    }

    /// Child elements with these names become a single element field.
    pub fn as_attribute<S: AsRef<str>>(mut self, ns: Option<&str>, names: &[S]) -> Promotion {
        register(&mut self.as_attribute, ns, names);
        self
    }

    /// Child elements with these names are collected into a list field.
    pub fn as_list<S: AsRef<str>>(mut self, ns: Option<&str>, names: &[S]) -> Promotion {
        register(&mut self.as_list, ns, names);
        self
    }

    /// Attributes with these names expose their value as a field.
    pub fn as_attribute_of_element<S: AsRef<str>>(
        mut self,
        ns: Option<&str>,
        names: &[S],
    ) -> Promotion {
        register(&mut self.as_attribute_of_element, ns, names);
        self
    }

    /// Returns `true` if no table holds any name.
    pub fn is_empty(&self) -> bool {
        self.as_attribute.is_empty()
            && self.as_list.is_empty()
            && self.as_attribute_of_element.is_empty()
    }

    pub(crate) fn element_rule(&self, name: &Name) -> Option<Rule> {
        if lookup(&self.as_attribute, name) {
            Some(Rule::Single)
        } else if lookup(&self.as_list, name) {
            Some(Rule::List)
        } else {
            None
        }
    }

    pub(crate) fn promotes_attribute(&self, name: &Name) -> bool {
        lookup(&self.as_attribute_of_element, name)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Rule {
    Single,
    List,
}

/// A promoted field on an element.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Field {
    /// A single child element (`as_attribute`).
    Element(NodeId),
    /// Child elements in the order they were attached (`as_list`).
    List(Vec<NodeId>),
    /// The value of an attribute (`as_attribute_of_element`).
    Value(String),
}

type FieldKey = (Option<String>, String);

fn key(name: &Name) -> FieldKey {
    (
        name.namespace().filter(|x| !x.is_empty()).map(|x| x.to_string()),
        name.local_name().to_string(),
    )
}

/// The side table of promoted fields, keyed by namespace and local name.
#[derive(Clone, Debug, Default)]
pub(crate) struct Fields {
    map: BTreeMap<FieldKey, Field>,
}

impl Fields {
    pub fn get<'a, Q: AsQName<'a>>(&self, name: Q) -> Option<&Field> {
        let name = name.as_qname();
        self.map
            .iter()
            .find(|((ns, local), _)| name.matches(ns.as_deref(), local))
            .map(|(_, field)| field)
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn attach_child(&mut self, rule: Rule, name: &Name, child: NodeId) {
        let key = key(name);
        match rule {
            Rule::Single => {
                self.map.insert(key, Field::Element(child));
            }
            Rule::List => match self.map.get_mut(&key) {
                Some(Field::List(items)) => items.push(child),
                _ => {
                    self.map.insert(key, Field::List(vec![child]));
                }
            },
        }
    }

    pub fn detach_child(&mut self, name: &Name, child: NodeId) {
        let key = key(name);
        let drop_field = match self.map.get_mut(&key) {
            Some(Field::Element(id)) => *id == child,
            Some(Field::List(items)) => {
                items.retain(|x| *x != child);
                items.is_empty()
            }
            _ => false,
        };
        if drop_field {
            self.map.remove(&key);
        }
    }

    pub fn set_value(&mut self, name: &Name, value: &str) {
        self.map.insert(key(name), Field::Value(value.to_string()));
    }

    pub fn remove_value(&mut self, name: &Name) {
        let key = key(name);
        if let Some(Field::Value(_)) = self.map.get(&key) {
            self.map.remove(&key);
        }
    }
}
