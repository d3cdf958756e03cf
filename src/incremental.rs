//! The incremental dispatch builder.
//!
//! [`IncrementalParser`] builds a document from a stream of parse events and
//! hands completed elements to registered callbacks while the stream is
//! still being read.  Callbacks that detach or forget the elements they
//! receive keep the memory use bounded by the depth of the document rather
//! than its size.
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use xmlbridge::{IncrementalParser, Trigger};
//!
//! let seen = Rc::new(RefCell::new(vec![]));
//! let mut parser = IncrementalParser::new();
//! let sink = seen.clone();
//! parser.register(Trigger::element("item"), move |doc, id| {
//!     sink.borrow_mut().push(doc.text(id).unwrap_or("").to_string());
//!     doc.forget(id)?;
//!     Ok(())
//! });
//! parser.feed(b"<list><item>a</it").unwrap();
//! parser.feed(b"em><item>b</item></list>").unwrap();
//! parser.close().unwrap();
//! assert_eq!(*seen.borrow(), vec!["a", "b"]);
//! ```
use indextree::NodeId;
use log::{debug, trace};

use crate::dispatch::{DispatchMode, Registry, Trigger, TriggerKind};
use crate::error::{Error, Result};
use crate::feed::{FeedEvent, Feeder};
use crate::name::{AsQName, Name};
use crate::promote::Promotion;
use crate::tree::{Attribute, Document, Node};

/// Builds a document from parse events and dispatches completed elements.
#[derive(Debug)]
pub struct IncrementalParser {
    doc: Document,
    current: NodeId,
    level: usize,
    cdata: bool,
    completed: bool,
    failed: bool,
    registry: Registry,
    feeder: Option<Feeder>,
}

impl Default for IncrementalParser {
    fn default() -> IncrementalParser {
        IncrementalParser::new()
    }
}

impl IncrementalParser {
    /// Creates a parser for a new document.
    pub fn new() -> IncrementalParser {
        IncrementalParser::with_promotion(Promotion::default())
    }

    /// Creates a parser whose document promotes children and attributes.
    pub fn with_promotion(promotion: Promotion) -> IncrementalParser {
        let doc = Document::with_promotion(promotion);
        IncrementalParser {
            current: doc.document_node(),
            doc,
            level: 0,
            cdata: false,
            completed: false,
            failed: false,
            registry: Registry::default(),
            feeder: Some(Feeder::new()),
        }
    }

    /// Registers a callback.  Registrations are additive, registering the
    /// same trigger twice keeps both callbacks.
    pub fn register<F>(&mut self, trigger: Trigger, callback: F)
    where
        F: FnMut(&mut Document, NodeId) -> anyhow::Result<()> + 'static,
    {
        self.registry.register(trigger, Box::new(callback));
    }

    /// Removes every callback registered for the trigger and returns how
    /// many were removed.
    pub fn unregister(&mut self, trigger: &Trigger) -> usize {
        self.registry.unregister(trigger)
    }

    /// Enables or disables the end triggers.  The start default callbacks
    /// are not affected.
    pub fn set_dispatching(&mut self, enabled: bool) {
        self.registry.set_enabled(enabled);
    }

    /// When enabled every trigger category gets evaluated, otherwise the
    /// first category that fires ends the evaluation.
    pub fn set_cascade(&mut self, cascade: bool) {
        self.registry.set_cascade(cascade);
    }

    /// Sets how many registrations may fire, for every category.
    pub fn set_dispatch_mode(&mut self, mode: DispatchMode) {
        self.registry.set_mode(mode);
    }

    /// Sets how many registrations of one category may fire.
    pub fn set_dispatch_mode_for(&mut self, kind: TriggerKind, mode: DispatchMode) {
        self.registry.set_mode_for(kind, mode);
    }

    /// The dispatch mode of a category.
    pub fn dispatch_mode(&self, kind: TriggerKind) -> DispatchMode {
        self.registry.mode(kind)
    }

    /// The nesting level of the cursor: 0 at the document node, 1 inside
    /// the root element.
    pub fn level(&self) -> usize {
        self.level
    }

    /// The node new content is added to.
    pub fn current(&self) -> NodeId {
        self.current
    }

    /// Is the parser closed?
    pub fn is_closed(&self) -> bool {
        self.feeder.is_none()
    }

    /// The document built so far, complete or not.
    pub fn partial_document(&self) -> &Document {
        &self.doc
    }

    fn check_open(&self) -> Result<()> {
        if self.is_closed() {
            Err(Error::Closed)
        } else {
            Ok(())
        }
    }

    /// Opens an element below the cursor and moves the cursor into it.
    pub fn start_element<N: Into<Name>>(&mut self, name: N, attributes: Vec<Attribute>) -> Result<NodeId> {
        self.check_open()?;
        if self.completed && self.level == 0 {
            return Err(Error::MalformedStream("element after the root element".into()));
        }
        let id = self.doc.create_element(Some(self.current), name)?;
        for attr in attributes {
            self.doc.set_attribute(id, attr)?;
        }
        self.current = id;
        self.level += 1;
        trace!("start {:?} at level {}", id, self.level);
        self.registry.dispatch_start(&mut self.doc, id, self.level - 1)?;
        Ok(id)
    }

    /// Closes the element at the cursor, which must carry the given name,
    /// and runs the end triggers for it.
    pub fn end_element<'a, Q: AsQName<'a>>(&mut self, name: Q) -> Result<()> {
        self.check_open()?;
        let name = name.as_qname();
        if self.level == 0 {
            return Err(Error::MalformedStream(format!("end of {} without open element", name)));
        }
        let id = self.current;
        match self.doc.element(id) {
            Some(element) if name.matches(element.namespace(), element.local_name()) => {}
            Some(element) => {
                return Err(Error::MalformedStream(format!(
                    "end of {} while {} is open",
                    name,
                    element.name().qname()
                )))
            }
            None => return Err(Error::InvalidNode(id)),
        }
        self.current = self.doc.parent(id).unwrap_or_else(|| self.doc.document_node());
        self.level -= 1;
        self.cdata = false;
        if self.level == 0 {
            self.completed = true;
        }
        trace!("end {:?} at level {}", id, self.level);
        self.registry.dispatch_end(&mut self.doc, id, self.level)?;
        Ok(())
    }

    /// Adds character data to the element at the cursor.  Adjacent
    /// character data of the same kind (CDATA or not) is merged.
    pub fn characters(&mut self, text: &str) -> Result<()> {
        self.check_open()?;
        if self.level == 0 {
            return Err(Error::MalformedStream("character data outside of the root element".into()));
        }
        if text.is_empty() {
            return Ok(());
        }
        let current = self.current;
        let cdata = self.cdata;
        let last = self.doc.children(current).last();
        match last {
            None => match self.doc.element(current) {
                Some(element) if element.text().is_none() => {
                    self.doc.set_text(current, text)?;
                    self.doc.set_cdata(current, cdata)?;
                }
                Some(element) if element.is_cdata() == cdata => {
                    let merged = format!("{}{}", element.text().unwrap_or(""), text);
                    self.doc.set_text(current, merged)?;
                }
                _ => self.append_segment(current, text)?,
            },
            Some(last) => match self.doc.node(last) {
                Some(Node::Text(existing)) if !cdata => {
                    let merged = format!("{}{}", existing, text);
                    self.doc.set_text(last, merged)?;
                }
                Some(Node::CData(existing)) if cdata => {
                    let merged = format!("{}{}", existing, text);
                    self.doc.set_text(last, merged)?;
                }
                _ => self.append_segment(current, text)?,
            },
        }
        Ok(())
    }

    fn append_segment(&mut self, parent: NodeId, text: &str) -> Result<()> {
        if self.cdata {
            self.doc.create_cdata(Some(parent), text)?;
        } else {
            self.doc.create_text(Some(parent), text)?;
        }
        Ok(())
    }

    /// Marks the following character data as CDATA.
    pub fn start_cdata(&mut self) -> Result<()> {
        self.check_open()?;
        self.cdata = true;
        Ok(())
    }

    /// Ends a CDATA section.
    pub fn end_cdata(&mut self) -> Result<()> {
        self.check_open()?;
        self.cdata = false;
        Ok(())
    }

    /// Adds a comment at the cursor.
    pub fn comment(&mut self, data: &str) -> Result<NodeId> {
        self.check_open()?;
        self.doc.create_comment(Some(self.current), data)
    }

    /// Adds a processing instruction at the cursor.
    pub fn processing_instruction(&mut self, target: &str, data: &str) -> Result<NodeId> {
        self.check_open()?;
        self.doc.create_pi(Some(self.current), target, data)
    }

    fn apply(&mut self, events: Vec<FeedEvent>) -> Result<()> {
        for event in events {
            match event {
                FeedEvent::Start { name, attributes } => {
                    self.start_element(name, attributes)?;
                }
                FeedEvent::End { name } => self.end_element(&name)?,
                FeedEvent::Text(text) => self.characters(&text)?,
                FeedEvent::CData(text) => {
                    self.start_cdata()?;
                    self.characters(&text)?;
                    self.end_cdata()?;
                }
                FeedEvent::Comment(data) => {
                    self.comment(&data)?;
                }
                FeedEvent::ProcessingInstruction { target, data } => {
                    self.processing_instruction(&target, &data)?;
                }
            }
        }
        Ok(())
    }

    fn check_usable(&self) -> Result<()> {
        if self.is_closed() {
            Err(Error::Closed)
        } else if self.failed {
            Err(Error::Failed)
        } else {
            Ok(())
        }
    }

    /// Feeds a chunk of UTF-8 encoded XML.  Chunks may split the input
    /// anywhere; incomplete constructs wait for the next chunk.
    ///
    /// Once a chunk fails (a tokenizer or stream error, or a callback
    /// error) the rest of that chunk is lost, so every further `feed` and
    /// `close` fails with [`Error::Failed`] until [`reset`](Self::reset).
    pub fn feed(&mut self, chunk: &[u8]) -> Result<()> {
        self.check_usable()?;
        let result = match self.feeder {
            Some(ref mut feeder) => feeder.feed(chunk, false),
            None => return Err(Error::Closed),
        };
        let result = result.and_then(|events| self.apply(events));
        if result.is_err() {
            self.failed = true;
            debug!("feed failed at level {}", self.level);
        }
        result
    }

    fn finish(&mut self, mut feeder: Feeder) -> Result<()> {
        let events = feeder.feed(&[], true)?;
        let unread = feeder.pending();
        self.feeder = Some(feeder);
        let result = self.apply(events);
        self.feeder = None;
        debug!("parser closed at level {}, {} bytes unread", self.level, unread);
        result?;
        if self.level > 0 {
            Err(Error::Incomplete(self.level))
        } else if !self.completed {
            Err(Error::MalformedStream("no element found".into()))
        } else {
            Ok(())
        }
    }

    /// Signals the end of input.  Buffered input is processed, errors of
    /// the tokenizer are reported now, as is a root element that never
    /// closed.  The parser accepts no further input afterwards and the
    /// partial document stays available through [`doc`](Self::doc).
    ///
    /// Closing a closed parser does nothing, unless it failed.
    pub fn close(&mut self) -> Result<()> {
        if self.failed {
            self.feeder = None;
            return Err(Error::Failed);
        }
        let feeder = match self.feeder.take() {
            Some(feeder) => feeder,
            None => return Ok(()),
        };
        let result = self.finish(feeder);
        if result.is_err() {
            self.failed = true;
        }
        result
    }

    /// Drops the partial document and starts over with an empty one.
    /// Registrations and dispatch settings are kept.  A closed or failed
    /// parser is reopened.
    pub fn reset(&mut self) {
        let promotion = self.doc.promotion().clone();
        self.doc = Document::with_promotion(promotion);
        self.current = self.doc.document_node();
        self.level = 0;
        self.cdata = false;
        self.completed = false;
        self.failed = false;
        self.feeder = Some(Feeder::new());
        debug!("parser reset");
    }

    fn check_complete(&self) -> Result<()> {
        if self.completed || self.is_closed() {
            Ok(())
        } else {
            Err(Error::Incomplete(self.level))
        }
    }

    /// The document, once the root element completed or the parser was
    /// closed.
    pub fn doc(&self) -> Result<&Document> {
        self.check_complete()?;
        Ok(&self.doc)
    }

    /// Consumes the parser and returns the document.
    pub fn into_document(self) -> Result<Document> {
        self.check_complete()?;
        Ok(self.doc)
    }
}
