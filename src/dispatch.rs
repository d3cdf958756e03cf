//! Dispatch triggers and the callback registry of the incremental parser.
use std::fmt;

use indextree::NodeId;
use log::trace;

use crate::error::Result;
use crate::name::{AsQName, QName};
use crate::path::Path;
use crate::tree::Document;

/// A dispatch callback.  It receives the document and the element that
/// triggered it and may detach or forget that element.
pub type Callback = Box<dyn FnMut(&mut Document, NodeId) -> anyhow::Result<()>>;

/// When a callback fires.
///
/// All end triggers are evaluated when an element closes.  The dispatch
/// level is the zero-based depth of the closing element: the root element
/// is at level 0, its children at level 1.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Trigger {
    /// Every element closing at this level.
    Level(usize),
    /// Every element with this name.
    Element(QName<'static>),
    /// Elements with this name closing at this level.
    LevelElement(usize, QName<'static>),
    /// Elements matching the path.
    Path(Path),
    /// Elements no other trigger fired for.
    Default,
    /// Every element when it starts.
    StartDefault,
}

impl Trigger {
    /// A trigger on an element name in ``{namespace}local`` notation.
    pub fn element<'a, Q: AsQName<'a>>(name: Q) -> Trigger {
        Trigger::Element(name.as_qname().share())
    }

    /// A trigger on an element name at a level.
    pub fn level_element<'a, Q: AsQName<'a>>(level: usize, name: Q) -> Trigger {
        Trigger::LevelElement(level, name.as_qname().share())
    }

    /// The category the trigger belongs to.
    pub fn kind(&self) -> TriggerKind {
        match *self {
            Trigger::Level(_) => TriggerKind::Level,
            Trigger::Element(_) => TriggerKind::Element,
            Trigger::LevelElement(..) => TriggerKind::LevelElement,
            Trigger::Path(_) => TriggerKind::Path,
            Trigger::Default => TriggerKind::Default,
            Trigger::StartDefault => TriggerKind::StartDefault,
        }
    }

    fn matches(&self, doc: &Document, id: NodeId, level: usize) -> bool {
        let element = match doc.element(id) {
            Some(element) => element,
            None => return false,
        };
        match *self {
            Trigger::Level(x) => x == level,
            Trigger::Element(ref name) => name.matches(element.namespace(), element.local_name()),
            Trigger::LevelElement(x, ref name) => {
                x == level && name.matches(element.namespace(), element.local_name())
            }
            Trigger::Path(ref path) => path.matches(doc, id),
            Trigger::Default | Trigger::StartDefault => true,
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Trigger::Level(level) => write!(f, "level {}", level),
            Trigger::Element(ref name) => write!(f, "element {}", name),
            Trigger::LevelElement(level, ref name) => write!(f, "element {} at level {}", name, level),
            Trigger::Path(ref path) => write!(f, "path {}", path),
            Trigger::Default => write!(f, "default"),
            Trigger::StartDefault => write!(f, "start default"),
        }
    }
}

/// How many registrations of one category fire for an element.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchMode {
    /// Only the first matching registration.
    First,
    /// Every matching registration, in registration order.
    All,
}

impl Default for DispatchMode {
    fn default() -> DispatchMode {
        DispatchMode::First
    }
}

/// The trigger categories.  Each one carries its own [`DispatchMode`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TriggerKind {
    Level,
    Element,
    LevelElement,
    Path,
    Default,
    StartDefault,
}

impl TriggerKind {
    /// Every category, in evaluation order.
    pub const ALL: [TriggerKind; 6] = [
        TriggerKind::Level,
        TriggerKind::Element,
        TriggerKind::LevelElement,
        TriggerKind::Path,
        TriggerKind::Default,
        TriggerKind::StartDefault,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

const END_CATEGORIES: [TriggerKind; 4] = [
    TriggerKind::Level,
    TriggerKind::Element,
    TriggerKind::LevelElement,
    TriggerKind::Path,
];

struct Registration {
    trigger: Trigger,
    callback: Callback,
}

pub(crate) struct Registry {
    registrations: Vec<Registration>,
    modes: [DispatchMode; 6],
    cascade: bool,
    enabled: bool,
}

impl Default for Registry {
    fn default() -> Registry {
        Registry {
            registrations: vec![],
            modes: [DispatchMode::First; 6],
            cascade: false,
            enabled: true,
        }
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Registry")
            .field(
                "triggers",
                &self.registrations.iter().map(|x| &x.trigger).collect::<Vec<_>>(),
            )
            .field(
                "modes",
                &TriggerKind::ALL
                    .iter()
                    .map(|x| (*x, self.modes[x.index()]))
                    .collect::<Vec<_>>(),
            )
            .field("cascade", &self.cascade)
            .field("enabled", &self.enabled)
            .finish()
    }
}

impl Registry {
    pub fn register(&mut self, trigger: Trigger, callback: Callback) {
        self.registrations.push(Registration { trigger, callback });
    }

    pub fn unregister(&mut self, trigger: &Trigger) -> usize {
        let before = self.registrations.len();
        self.registrations.retain(|x| x.trigger != *trigger);
        before - self.registrations.len()
    }

    pub fn set_mode(&mut self, mode: DispatchMode) {
        self.modes = [mode; 6];
    }

    pub fn set_mode_for(&mut self, kind: TriggerKind, mode: DispatchMode) {
        self.modes[kind.index()] = mode;
    }

    pub fn mode(&self, kind: TriggerKind) -> DispatchMode {
        self.modes[kind.index()]
    }

    pub fn set_cascade(&mut self, cascade: bool) {
        self.cascade = cascade;
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Indexes of the registrations of a category that match, limited by
    /// the dispatch mode of that category.
    fn select(&self, category: TriggerKind, doc: &Document, id: NodeId, level: usize) -> Vec<usize> {
        let matching = self
            .registrations
            .iter()
            .enumerate()
            .filter(|(_, x)| x.trigger.kind() == category && x.trigger.matches(doc, id, level))
            .map(|(idx, _)| idx);
        match self.mode(category) {
            DispatchMode::First => matching.take(1).collect(),
            DispatchMode::All => matching.collect(),
        }
    }

    fn fire(&mut self, selected: &[usize], doc: &mut Document, id: NodeId) -> Result<()> {
        for idx in selected {
            let registration = &mut self.registrations[*idx];
            trace!("dispatching {:?} to {}", id, registration.trigger);
            (registration.callback)(doc, id)?;
        }
        Ok(())
    }

    /// Runs the end triggers for a closing element.  Returns `true` if any
    /// callback fired.
    pub fn dispatch_end(&mut self, doc: &mut Document, id: NodeId, level: usize) -> Result<bool> {
        if !self.enabled {
            return Ok(false);
        }
        // callbacks may detach the element, so everything is matched first
        let mut plan = vec![];
        for category in END_CATEGORIES.iter() {
            let selected = self.select(*category, doc, id, level);
            if !selected.is_empty() {
                plan.push(selected);
                if !self.cascade {
                    break;
                }
            }
        }
        if plan.is_empty() {
            let selected = self.select(TriggerKind::Default, doc, id, level);
            self.fire(&selected, doc, id)?;
            return Ok(!selected.is_empty());
        }
        for selected in plan {
            self.fire(&selected, doc, id)?;
        }
        Ok(true)
    }

    /// Runs the start default callbacks for an opening element.
    pub fn dispatch_start(&mut self, doc: &mut Document, id: NodeId, level: usize) -> Result<bool> {
        let selected = self.select(TriggerKind::StartDefault, doc, id, level);
        self.fire(&selected, doc, id)?;
        Ok(!selected.is_empty())
    }
}
