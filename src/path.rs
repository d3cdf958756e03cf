//! Simple path expressions for dispatch.
//!
//! A path is a list of steps separated by `/`.  The last step matches the
//! element itself, the steps before it match its successive ancestors.  A
//! leading `/` anchors the first step at the root element.
//!
//! A step is a name (`item`, `{ns}item`, `{*}item` or `*` for any element)
//! optionally followed by an attribute filter: `[attr]`, `[!attr]`,
//! `[attr=value]` or `[!attr=value]`.
use std::fmt;
use std::str::FromStr;

use indextree::NodeId;

use crate::error::{Error, Result};
use crate::name::QName;
use crate::tree::{Document, Element};

/// Filters elements by the presence or value of an attribute.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttributeFilter {
    pub name: QName<'static>,
    pub value: Option<String>,
    pub invert: bool,
}

impl AttributeFilter {
    /// Creates a filter.  Without a value the filter checks for presence.
    pub fn new(name: QName<'_>, value: Option<&str>, invert: bool) -> AttributeFilter {
        AttributeFilter {
            name: name.share(),
            value: value.map(|x| x.to_string()),
            invert,
        }
    }

    /// Checks an element against the filter.
    pub fn is_match(&self, element: &Element) -> bool {
        let found = match (element.get_attr(&self.name), &self.value) {
            (Some(actual), Some(expected)) => actual == expected,
            (Some(_), None) => true,
            (None, _) => false,
        };
        found != self.invert
    }

    fn parse(s: &str) -> Option<AttributeFilter> {
        let (invert, s) = match s.strip_prefix('!') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let (name, value) = match split_outside_braces(s, '=') {
            Some((name, value)) => (name, Some(unquote(value))),
            None => (s, None),
        };
        if name.is_empty() {
            return None;
        }
        Some(AttributeFilter::new(QName::from(name), value, invert))
    }
}

fn unquote(s: &str) -> &str {
    for quote in ['"', '\''] {
        if s.len() >= 2 && s.starts_with(quote) && s.ends_with(quote) {
            return &s[1..s.len() - 1];
        }
    }
    s
}

/// Finds the first `needle` that is not inside a ``{namespace}``.
fn split_outside_braces(s: &str, needle: char) -> Option<(&str, &str)> {
    let mut depth = 0;
    for (idx, c) in s.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => depth -= 1,
            c if c == needle && depth == 0 => return Some((&s[..idx], &s[idx + 1..])),
            _ => {}
        }
    }
    None
}

/// One step of a path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathStep {
    /// The element name, `None` for `*`.
    pub name: Option<QName<'static>>,
    pub filter: Option<AttributeFilter>,
}

impl PathStep {
    /// Parses a single step.
    pub fn parse(s: &str) -> Option<PathStep> {
        let s = s.trim();
        let (name, filter) = match split_outside_braces(s, '[') {
            Some((name, rest)) => {
                let inner = rest.strip_suffix(']')?;
                (name, Some(AttributeFilter::parse(inner)?))
            }
            None => (s, None),
        };
        let name = match name {
            "" => return None,
            "*" => None,
            name => Some(QName::from(name).share()),
        };
        Some(PathStep { name, filter })
    }

    /// Checks an element against the step.
    pub fn is_match(&self, element: &Element) -> bool {
        let name_matches = match self.name {
            Some(ref name) => name.matches(element.namespace(), element.local_name()),
            None => true,
        };
        name_matches && self.filter.as_ref().map_or(true, |x| x.is_match(element))
    }
}

/// A path expression.
///
/// ```
/// use xmlbridge::Path;
///
/// let path: Path = "/feed/{http://www.w3.org/2005/Atom}entry[!draft]".parse().unwrap();
/// assert!(path.is_anchored());
/// assert_eq!(path.steps().len(), 2);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Path {
    anchored: bool,
    steps: Vec<PathStep>,
    source: String,
}

impl Path {
    /// Parses a path expression.
    pub fn parse(s: &str) -> Result<Path> {
        let invalid = || Error::InvalidPath(s.to_string());
        let (anchored, rest) = match s.trim().strip_prefix('/') {
            Some(rest) => (true, rest),
            None => (false, s.trim()),
        };
        let mut steps = vec![];
        let mut depth = 0;
        let mut start = 0;
        for (idx, c) in rest.char_indices() {
            match c {
                '{' | '[' => depth += 1,
                '}' | ']' => depth -= 1,
                '/' if depth == 0 => {
                    steps.push(PathStep::parse(&rest[start..idx]).ok_or_else(invalid)?);
                    start = idx + 1;
                }
                _ => {}
            }
        }
        steps.push(PathStep::parse(&rest[start..]).ok_or_else(invalid)?);
        Ok(Path {
            anchored,
            steps,
            source: s.to_string(),
        })
    }

    /// Is the first step anchored at the root element?
    pub fn is_anchored(&self) -> bool {
        self.anchored
    }

    /// The steps, outermost first.
    pub fn steps(&self) -> &[PathStep] {
        &self.steps
    }

    /// Matches an element of a document.
    pub fn matches(&self, doc: &Document, id: NodeId) -> bool {
        let mut current = Some(id);
        for step in self.steps.iter().rev() {
            let element = match current.and_then(|x| doc.element(x)) {
                Some(element) => element,
                None => return false,
            };
            if !step.is_match(element) {
                return false;
            }
            current = current.and_then(|x| doc.parent(x));
        }
        !self.anchored || current.map_or(true, |x| doc.element(x).is_none())
    }
}

impl FromStr for Path {
    type Err = Error;

    fn from_str(s: &str) -> Result<Path> {
        Path::parse(s)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}
