//! Chunked tokenizing with quick-xml.
//!
//! quick-xml cannot suspend in the middle of a construct, so the feeder
//! keeps every byte it has not turned into an event yet and restarts the
//! reader over that buffer when more input arrives.  Prefixes are resolved
//! with a scope stack kept across chunks.
use std::mem;
use std::rc::Rc;

use log::trace;
use quick_xml::escape::resolve_xml_entity;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::error::{Error, Result};
use crate::name::{Name, NS_XMLNS_PREFIX};
use crate::namespace::{scope_mut, Scope};
use crate::tree::Attribute;

/// A tokenizer event with resolved names.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum FeedEvent {
    Start { name: Name, attributes: Vec<Attribute> },
    End { name: Name },
    Text(String),
    CData(String),
    Comment(String),
    ProcessingInstruction { target: String, data: String },
}

fn utf8(bytes: &[u8]) -> Result<&str> {
    std::str::from_utf8(bytes).map_err(|err| Error::MalformedStream(err.to_string()))
}

fn split_name(raw: &str) -> (Option<&str>, &str) {
    match raw.find(':') {
        Some(idx) => (Some(&raw[..idx]), &raw[idx + 1..]),
        None => (None, raw),
    }
}

fn resolve_reference(raw: &str) -> Result<String> {
    if let Some(resolved) = resolve_xml_entity(raw) {
        return Ok(resolved.to_string());
    }
    let invalid = || Error::MalformedStream(format!("unknown entity reference &{};", raw));
    let rest = raw.strip_prefix('#').ok_or_else(invalid)?;
    let code = match rest.strip_prefix('x').or_else(|| rest.strip_prefix('X')) {
        Some(hex) => u32::from_str_radix(hex, 16).map_err(|_| invalid())?,
        None => rest.parse::<u32>().map_err(|_| invalid())?,
    };
    char::from_u32(code)
        .map(|c| c.to_string())
        .ok_or_else(invalid)
}

#[derive(Debug)]
pub(crate) struct Feeder {
    pending: Vec<u8>,
    scopes: Vec<Rc<Scope>>,
}

impl Default for Feeder {
    fn default() -> Feeder {
        Feeder::new()
    }
}

impl Feeder {
    pub fn new() -> Feeder {
        Feeder {
            pending: vec![],
            scopes: vec![Rc::new(Scope::document())],
        }
    }

    /// Number of bytes waiting for more input.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    fn scope(&self) -> Rc<Scope> {
        self.scopes
            .last()
            .cloned()
            .unwrap_or_else(|| Rc::new(Scope::document()))
    }

    fn depth(&self) -> usize {
        self.scopes.len().saturating_sub(1)
    }

    /// Tokenizes as much of the buffered input as possible.  With `eof` the
    /// input is complete and an incomplete construct is an error.
    pub fn feed(&mut self, chunk: &[u8], eof: bool) -> Result<Vec<FeedEvent>> {
        self.pending.extend_from_slice(chunk);
        let pending = mem::take(&mut self.pending);
        let mut events = vec![];
        let mut consumed = 0;
        let result = self.tokenize(&pending, eof, &mut events, &mut consumed);
        self.pending = pending[consumed..].to_vec();
        trace!(
            "tokenized {} events, {} bytes pending",
            events.len(),
            self.pending.len()
        );
        result.map(|_| events)
    }

    fn tokenize(&mut self, input: &[u8], eof: bool, events: &mut Vec<FeedEvent>, consumed: &mut usize) -> Result<()> {
        let mut reader = Reader::from_reader(input);
        {
            let config = reader.config_mut();
            config.check_end_names = false;
            config.allow_unmatched_ends = true;
            config.trim_text(false);
        }
        loop {
            let event = match reader.read_event() {
                Ok(Event::Eof) => return Ok(()),
                Ok(event) => event,
                Err(err) if eof => return Err(err.into()),
                Err(_) => return Ok(()),
            };
            let end = reader.buffer_position() as usize;
            if !eof && end == input.len() && matches!(event, Event::Text(_)) {
                return Ok(());
            }
            self.translate(event, events)?;
            *consumed = end;
        }
    }

    fn translate(&mut self, event: Event<'_>, events: &mut Vec<FeedEvent>) -> Result<()> {
        match event {
            Event::Start(ref e) => {
                let (name, attributes, scope) = self.start(e)?;
                self.scopes.push(scope);
                events.push(FeedEvent::Start { name, attributes });
            }
            Event::Empty(ref e) => {
                let (name, attributes, _) = self.start(e)?;
                events.push(FeedEvent::Start {
                    name: name.clone(),
                    attributes,
                });
                events.push(FeedEvent::End { name });
            }
            Event::End(ref e) => {
                let qname = e.name();
                let (prefix, local) = split_name(utf8(qname.as_ref())?);
                let scope = self.scope();
                let ns = match prefix {
                    Some(prefix) => Some(
                        scope
                            .resolve(Some(prefix))
                            .ok_or_else(|| Error::UnboundPrefix(prefix.to_string()))?,
                    ),
                    None => scope.resolve(None),
                };
                let name = Name::from_parts(prefix, ns, local);
                if self.scopes.len() > 1 {
                    self.scopes.pop();
                }
                events.push(FeedEvent::End { name });
            }
            Event::Text(ref e) => {
                let text = e.decode().map_err(|err| Error::MalformedStream(err.to_string()))?;
                if self.depth() > 0 || !text.trim().is_empty() {
                    events.push(FeedEvent::Text(text.into_owned()));
                }
            }
            Event::GeneralRef(ref e) => {
                let raw = e.decode().map_err(|err| Error::MalformedStream(err.to_string()))?;
                events.push(FeedEvent::Text(resolve_reference(&raw)?));
            }
            Event::CData(ref e) => {
                events.push(FeedEvent::CData(utf8(e)?.to_string()));
            }
            Event::Comment(ref e) => {
                events.push(FeedEvent::Comment(utf8(e)?.to_string()));
            }
            Event::PI(ref e) => {
                events.push(FeedEvent::ProcessingInstruction {
                    target: utf8(e.target())?.to_string(),
                    data: utf8(e.content())?.trim_start().to_string(),
                });
            }
            Event::Decl(_) | Event::DocType(_) | Event::Eof => {}
        }
        Ok(())
    }

    /// Resolves an opening tag.  Returns the element name, the materialized
    /// attributes and the scope for the element's content.
    fn start(&self, e: &BytesStart<'_>) -> Result<(Name, Vec<Attribute>, Rc<Scope>)> {
        let mut scope = self.scope();
        let mut declarations = vec![];
        let mut raw_attributes = vec![];
        for attr in e.attributes() {
            let attr = attr.map_err(|err| Error::MalformedStream(err.to_string()))?;
            let key = utf8(attr.key.as_ref())?.to_string();
            let value = attr
                .unescape_value()
                .map_err(|err| Error::MalformedStream(err.to_string()))?
                .into_owned();
            let declared = if key == NS_XMLNS_PREFIX {
                Some(None)
            } else {
                key.strip_prefix("xmlns:").map(|x| Some(x.to_string()))
            };
            match declared {
                Some(prefix) => {
                    if !scope.binds(prefix.as_deref(), &value) {
                        scope_mut(&mut scope).bind(prefix.as_deref(), &value);
                        declarations.push(Attribute::declaration(prefix.as_deref(), &value));
                    }
                }
                None => raw_attributes.push((key, value)),
            }
        }

        let qname = e.name();
        let (prefix, local) = split_name(utf8(qname.as_ref())?);
        let ns = match prefix {
            Some(prefix) => Some(
                scope
                    .resolve(Some(prefix))
                    .ok_or_else(|| Error::UnboundPrefix(prefix.to_string()))?,
            ),
            None => scope.resolve(None),
        };
        let name = Name::from_parts(prefix, ns, local);

        let mut attributes: Vec<Attribute> = declarations
            .into_iter()
            .filter(|decl| {
                decl.declared_prefix()
                    .map_or(true, |prefix| !name.has_pair(prefix, Some(decl.value())))
            })
            .collect();
        for (key, value) in raw_attributes {
            let (prefix, local) = split_name(&key);
            let attr_name = match prefix {
                Some(prefix) => {
                    let ns = scope
                        .resolve(Some(prefix))
                        .ok_or_else(|| Error::UnboundPrefix(prefix.to_string()))?;
                    Name::from_parts(Some(prefix), Some(ns), local)
                }
                None => Name::new(local),
            };
            attributes.push(Attribute::new(attr_name, value));
        }
        Ok((name, attributes, scope))
    }
}
