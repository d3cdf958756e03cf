use std::cell::RefCell;
use std::rc::Rc;

use xmlbridge::{
    Attribute, Document, DispatchMode, Error, Field, IncrementalParser, Name, Path, Promotion, Trigger, TriggerKind,
    WriteOptions,
};

type Log = Rc<RefCell<Vec<String>>>;

fn recorder(parser: &mut IncrementalParser, trigger: Trigger, label: &str) -> Log {
    let log = Log::default();
    record_into(parser, trigger, label, &log);
    log
}

fn record_into(parser: &mut IncrementalParser, trigger: Trigger, label: &str, log: &Log) {
    let sink = log.clone();
    let label = label.to_string();
    parser.register(trigger, move |doc, id| {
        let name = doc.element(id).map(|x| x.local_name().to_string()).unwrap_or_default();
        sink.borrow_mut().push(format!("{}:{}", label, name));
        Ok(())
    });
}

fn render(doc: &Document) -> String {
    doc.to_string_with_options(doc.document_node(), &WriteOptions::new().set_xml_prolog(None))
        .unwrap()
}

fn run(parser: &mut IncrementalParser, xml: &str) {
    parser.feed(xml.as_bytes()).unwrap();
    parser.close().unwrap();
}

#[test]
fn test_level_trigger() {
    let mut parser = IncrementalParser::new();
    let log = recorder(&mut parser, Trigger::Level(1), "level");
    parser.feed(b"<r><b/>").unwrap();
    assert_eq!(*log.borrow(), vec!["level:b"]);
    assert!(matches!(parser.doc(), Err(Error::Incomplete(1))));
    parser.feed(b"</r>").unwrap();
    assert!(parser.doc().is_ok());
    parser.close().unwrap();
    assert_eq!(*log.borrow(), vec!["level:b"]);
    assert_eq!(render(parser.doc().unwrap()), "<r><b/></r>");
}

#[test]
fn test_first_category_stops_evaluation() {
    let mut parser = IncrementalParser::new();
    let log = Log::default();
    record_into(&mut parser, Trigger::element("b"), "element", &log);
    record_into(&mut parser, Trigger::Level(1), "level", &log);
    record_into(&mut parser, Trigger::Default, "default", &log);
    run(&mut parser, "<r><b/><c/></r>");
    assert_eq!(
        *log.borrow(),
        vec!["level:b", "level:c", "default:r"]
    );
}

#[test]
fn test_cascade_evaluates_every_category() {
    let mut parser = IncrementalParser::new();
    parser.set_cascade(true);
    let log = Log::default();
    record_into(&mut parser, Trigger::Path(Path::parse("r/b").unwrap()), "path", &log);
    record_into(&mut parser, Trigger::level_element(1, "b"), "level-element", &log);
    record_into(&mut parser, Trigger::element("b"), "element", &log);
    record_into(&mut parser, Trigger::Level(1), "level", &log);
    record_into(&mut parser, Trigger::Default, "default", &log);
    run(&mut parser, "<r><b/></r>");
    assert_eq!(
        *log.borrow(),
        vec!["level:b", "element:b", "level-element:b", "path:b", "default:r"]
    );
}

#[test]
fn test_dispatch_mode() {
    let mut parser = IncrementalParser::new();
    let log = Log::default();
    let path = Path::parse("/r/*").unwrap();
    record_into(&mut parser, Trigger::Path(path.clone()), "first", &log);
    record_into(&mut parser, Trigger::Path(path), "second", &log);
    run(&mut parser, "<r><a/></r>");
    assert_eq!(*log.borrow(), vec!["first:a"]);

    log.borrow_mut().clear();
    parser.reset();
    parser.set_dispatch_mode(DispatchMode::All);
    run(&mut parser, "<r><a/></r>");
    assert_eq!(*log.borrow(), vec!["first:a", "second:a"]);
}

#[test]
fn test_dispatch_mode_per_category() {
    let mut parser = IncrementalParser::new();
    parser.set_cascade(true);
    parser.set_dispatch_mode_for(TriggerKind::Element, DispatchMode::All);
    assert_eq!(parser.dispatch_mode(TriggerKind::Element), DispatchMode::All);
    assert_eq!(parser.dispatch_mode(TriggerKind::Level), DispatchMode::First);
    let log = Log::default();
    record_into(&mut parser, Trigger::Level(1), "level-1", &log);
    record_into(&mut parser, Trigger::Level(1), "level-2", &log);
    record_into(&mut parser, Trigger::element("a"), "element-1", &log);
    record_into(&mut parser, Trigger::element("a"), "element-2", &log);
    run(&mut parser, "<r><a/></r>");
    assert_eq!(*log.borrow(), vec!["level-1:a", "element-1:a", "element-2:a"]);

    log.borrow_mut().clear();
    parser.reset();
    parser.set_dispatch_mode(DispatchMode::First);
    assert_eq!(parser.dispatch_mode(TriggerKind::Element), DispatchMode::First);
    run(&mut parser, "<r><a/></r>");
    assert_eq!(*log.borrow(), vec!["level-1:a", "element-1:a"]);
}

#[test]
fn test_start_default_in_document_order() {
    let mut parser = IncrementalParser::new();
    let starts = recorder(&mut parser, Trigger::StartDefault, "start");
    let ends = recorder(&mut parser, Trigger::Default, "end");
    run(&mut parser, "<r><a><b/></a><c/></r>");
    assert_eq!(*starts.borrow(), vec!["start:r", "start:a", "start:b", "start:c"]);
    assert_eq!(*ends.borrow(), vec!["end:b", "end:a", "end:c", "end:r"]);
}

#[test]
fn test_byte_by_byte_feed() {
    let xml = "<root xmlns=\"tag:r\" xmlns:x=\"tag:x\"><x:item id=\"1\">one &amp; two</x:item><item/><!--c--></root>";
    let mut parser = IncrementalParser::new();
    let items = recorder(&mut parser, Trigger::element("{tag:r}item"), "item");
    for byte in xml.as_bytes() {
        parser.feed(&[*byte]).unwrap();
    }
    parser.close().unwrap();
    assert_eq!(*items.borrow(), vec!["item:item"]);

    let doc = parser.doc().unwrap();
    let root = doc.root().unwrap();
    let first = doc.get_child(root, "{tag:x}item").unwrap();
    assert_eq!(doc.text(first), Some("one & two"));
    assert_eq!(doc.element(first).unwrap().prefix(), Some("x"));
    assert_eq!(render(doc), xml);
}

#[test]
fn test_processing_instructions_and_prolog() {
    let mut parser = IncrementalParser::new();
    run(
        &mut parser,
        "<?xml version=\"1.0\"?>\n<?style href=\"a.css\"?>\n<r>x<?pi data?>y</r>\n<!--end-->\n",
    );
    assert_eq!(
        render(parser.doc().unwrap()),
        "<?style href=\"a.css\"?><r>x<?pi data?>y</r><!--end-->"
    );
}

#[test]
fn test_reset_keeps_registrations() {
    let mut parser = IncrementalParser::new();
    let log = recorder(&mut parser, Trigger::Level(0), "root");
    run(&mut parser, "<a/>");
    assert!(parser.is_closed());
    parser.reset();
    assert!(!parser.is_closed());
    assert_eq!(parser.level(), 0);
    run(&mut parser, "<b/>");
    assert_eq!(*log.borrow(), vec!["root:a", "root:b"]);
    assert_eq!(render(parser.doc().unwrap()), "<b/>");
}

#[test]
fn test_malformed_event_stream() {
    let mut parser = IncrementalParser::new();
    assert!(matches!(parser.end_element("a"), Err(Error::MalformedStream(_))));
    assert!(matches!(parser.characters("x"), Err(Error::MalformedStream(_))));

    parser.start_element("a", vec![]).unwrap();
    assert!(matches!(parser.end_element("b"), Err(Error::MalformedStream(_))));
    parser.end_element("a").unwrap();
    assert!(matches!(
        parser.start_element("c", vec![]),
        Err(Error::MalformedStream(_))
    ));
}

#[test]
fn test_events_build_document() {
    let mut parser = IncrementalParser::new();
    parser
        .start_element(
            Name::prefixed("p", "tag:p", "doc"),
            vec![Attribute::new("version", "2")],
        )
        .unwrap();
    assert_eq!(parser.level(), 1);
    parser.characters("a").unwrap();
    parser.characters("b").unwrap();
    parser.start_element(Name::new("br"), vec![]).unwrap();
    parser.end_element("br").unwrap();
    parser.characters("c").unwrap();
    parser.characters("d").unwrap();
    parser.comment("note").unwrap();
    parser.end_element("{tag:p}doc").unwrap();
    assert_eq!(parser.level(), 0);
    assert_eq!(parser.current(), parser.partial_document().document_node());

    let doc = parser.into_document().unwrap();
    assert_eq!(
        render(&doc),
        "<p:doc xmlns:p=\"tag:p\" version=\"2\">ab<br/>cd<!--note--></p:doc>"
    );
}

#[test]
fn test_incomplete_and_closed() {
    let mut parser = IncrementalParser::new();
    parser.feed(b"<a><b>").unwrap();
    assert!(matches!(parser.doc(), Err(Error::Incomplete(2))));
    parser.feed(b"</b>").unwrap();
    assert!(matches!(parser.doc(), Err(Error::Incomplete(1))));
    assert!(matches!(parser.close(), Err(Error::Incomplete(1))));
    assert!(parser.is_closed());
    let doc = parser.doc().unwrap();
    assert_eq!(render(doc), "<a><b/></a>");
    assert!(matches!(parser.feed(b"</a>"), Err(Error::Closed)));
    assert!(matches!(parser.characters("x"), Err(Error::Closed)));
    assert!(matches!(parser.close(), Err(Error::Failed)));
}

#[test]
fn test_close_after_complete_root() {
    let mut parser = IncrementalParser::new();
    parser.feed(b"<a><b/></a>").unwrap();
    parser.close().unwrap();
    // closing twice is fine
    parser.close().unwrap();
    assert!(matches!(parser.feed(b"<c/>"), Err(Error::Closed)));
}

#[test]
fn test_close_without_root() {
    let mut parser = IncrementalParser::new();
    parser.feed(b"  <!--only a comment-->").unwrap();
    assert!(matches!(parser.close(), Err(Error::MalformedStream(_))));
}

#[test]
fn test_unclosed_root_fails_on_close() {
    let mut parser = IncrementalParser::new();
    parser.feed(b"<a><b>").unwrap();
    assert!(matches!(parser.close(), Err(Error::Incomplete(2))));
    let doc = parser.doc().unwrap();
    assert_eq!(render(doc), "<a><b/></a>");

    parser.reset();
    run(&mut parser, "<a><b/></a>");
}

#[test]
fn test_truncated_input_fails_on_close() {
    let mut parser = IncrementalParser::new();
    parser.feed(b"<a><b attr=\"1").unwrap();
    assert!(matches!(parser.close(), Err(Error::Tokenizer(_))));
    assert!(parser.is_closed());
}

#[test]
fn test_forgetting_callback_bounds_the_tree() {
    let mut parser = IncrementalParser::new();
    let seen = Rc::new(RefCell::new(vec![]));
    let sink = seen.clone();
    parser.register(Trigger::element("item"), move |doc, id| {
        sink.borrow_mut().push(doc.get_attr(id, "n").unwrap_or("").to_string());
        doc.forget(id)?;
        Ok(())
    });
    parser.feed(b"<list><item n=\"1\"/><item n=\"2\">").unwrap();
    {
        let doc = parser.partial_document();
        let root = doc.root().unwrap();
        assert_eq!(doc.child_count(root), 1);
    }
    parser.feed(b"</item><item n=\"3\"/></list>").unwrap();
    parser.close().unwrap();
    assert_eq!(*seen.borrow(), vec!["1", "2", "3"]);
    let doc = parser.doc().unwrap();
    assert_eq!(doc.child_count(doc.root().unwrap()), 0);
    assert_eq!(render(doc), "<list/>");
}

#[test]
fn test_callback_error_is_reported() {
    let mut parser = IncrementalParser::new();
    parser.register(Trigger::element("bad"), |_, _| Err(anyhow::anyhow!("rejected")));
    let err = parser.feed(b"<r><bad/></r>").unwrap_err();
    assert!(matches!(err, Error::Dispatch(_)));
    assert_eq!(err.to_string(), "rejected");
}

#[test]
fn test_parser_stops_after_callback_error() {
    let mut parser = IncrementalParser::new();
    let log = recorder(&mut parser, Trigger::Level(1), "level");
    parser.register(Trigger::element("bad"), |_, _| Err(anyhow::anyhow!("rejected")));
    parser.set_cascade(true);
    assert!(matches!(parser.feed(b"<r><bad/><ok/></r>"), Err(Error::Dispatch(_))));
    assert_eq!(*log.borrow(), vec!["level:bad"]);

    // the rest of the failed chunk is gone, later input must not be grafted on
    assert!(matches!(parser.feed(b"<more/>"), Err(Error::Failed)));
    assert!(matches!(parser.close(), Err(Error::Failed)));
    assert_eq!(*log.borrow(), vec!["level:bad"]);
    assert_eq!(render(parser.partial_document()), "<r><bad/></r>");

    parser.reset();
    run(&mut parser, "<r><ok/></r>");
    assert_eq!(*log.borrow(), vec!["level:bad", "level:ok"]);
}

#[test]
fn test_parser_stops_after_malformed_chunk() {
    let mut parser = IncrementalParser::new();
    assert!(matches!(parser.feed(b"<r></x>"), Err(Error::MalformedStream(_))));
    assert!(matches!(parser.feed(b"</r>"), Err(Error::Failed)));
    parser.reset();
    run(&mut parser, "<r/>");
}

#[test]
fn test_unregister_and_disable() {
    let mut parser = IncrementalParser::new();
    let log = Log::default();
    record_into(&mut parser, Trigger::element("b"), "one", &log);
    record_into(&mut parser, Trigger::element("b"), "two", &log);
    record_into(&mut parser, Trigger::Level(0), "root", &log);
    record_into(&mut parser, Trigger::StartDefault, "start", &log);
    assert_eq!(parser.unregister(&Trigger::element("b")), 2);
    assert_eq!(parser.unregister(&Trigger::element("b")), 0);

    parser.set_dispatching(false);
    run(&mut parser, "<r><b/></r>");
    assert_eq!(*log.borrow(), vec!["start:r", "start:b"]);
}

#[test]
fn test_cdata_sections() {
    let mut parser = IncrementalParser::new();
    run(&mut parser, "<r><![CDATA[a<b]]></r>");
    let doc = parser.doc().unwrap();
    let root = doc.root().unwrap();
    assert_eq!(doc.text(root), Some("a<b"));
    assert!(doc.element(root).unwrap().is_cdata());
    assert_eq!(render(doc), "<r><![CDATA[a<b]]></r>");
}

#[test]
fn test_cdata_next_to_plain_text() {
    let xml = "<r>x<![CDATA[<y>]]>z<![CDATA[1]]><![CDATA[2]]></r>";
    let mut parser = IncrementalParser::new();
    for chunk in xml.as_bytes().chunks(3) {
        parser.feed(chunk).unwrap();
    }
    parser.close().unwrap();
    let doc = parser.doc().unwrap();
    let root = doc.root().unwrap();
    assert_eq!(doc.child_count(root), 4);
    assert!(!doc.element(root).unwrap().is_cdata());
    assert_eq!(render(doc), "<r>x<![CDATA[<y>]]>z<![CDATA[12]]></r>");
}

#[test]
fn test_unbound_prefix() {
    let mut parser = IncrementalParser::new();
    assert!(matches!(
        parser.feed(b"<p:a/>"),
        Err(Error::UnboundPrefix(ref prefix)) if prefix == "p"
    ));
}

#[test]
fn test_promotion_while_building() {
    let promotion = Promotion::new()
        .as_list(None, &["item"])
        .as_attribute_of_element(None, &["id"]);
    let mut parser = IncrementalParser::with_promotion(promotion);
    run(&mut parser, "<r id=\"7\"><item/><item/></r>");
    let doc = parser.doc().unwrap();
    let root = doc.root().unwrap();
    let items = doc.get_children(root, "item");
    assert_eq!(items.len(), 2);
    assert_eq!(doc.field(root, "item"), Some(&Field::List(items)));
    assert_eq!(doc.field(root, "id"), Some(&Field::Value("7".into())));
}

#[test]
fn test_whitespace_around_root_is_ignored() {
    let mut parser = IncrementalParser::new();
    run(&mut parser, "\n  <r> <a/> </r>\n\n");
    let doc = parser.doc().unwrap();
    assert_eq!(doc.child_count(doc.document_node()), 1);
    assert_eq!(render(doc), "<r> <a/> </r>");
}

#[test]
fn test_text_outside_root_is_rejected() {
    let mut parser = IncrementalParser::new();
    assert!(matches!(parser.feed(b"junk<r/>"), Err(Error::MalformedStream(_))));
}
