extern crate warden;

mod bridge_util;

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use bridge_util::{session, session_with};
use serde_json::json;
use warden::channel::{
    AccessKind, AccessorMessage, BlockingChannel, ChannelBuffer, ChannelError, ContentType,
    DecodedValue, EncodedReply,
};
use warden::coordinator::{Coordinator, JsonDocument};
use warden::runner::capability::classifier::ClassifierMode;
use warden::runner::capability::schema::CapabilitySchema;
use warden::runner::ds::error::JErrorType;
use warden::runner::ds::value::{JsNumberType, JsValue};
use warden::runner::plugin::host::ConsoleSink;
use warden::runner::{SandboxError, SandboxRunner};

fn int(i: i64) -> JsValue {
    JsValue::Number(JsNumberType::Integer(i))
}

fn page() -> serde_json::Value {
    json!({
        "window": {
            "name": "main",
            "location": {"href": "https://x.test"},
            "document": {"title": "hi"},
            "screen": {"width": 1280}
        }
    })
}

#[test]
fn test_terminal_read_returns_coordinator_string() {
    let s = session(page());
    assert_eq!(
        s.runner.evaluate("window.location.href").unwrap(),
        JsValue::String("https://x.test".into())
    );
    let recording = s.finish();
    assert_eq!(recording.paths(), vec!["window.location.href"]);
    assert_eq!(recording.requests[0].kind, AccessKind::Get);
}

#[test]
fn test_known_members_are_free_variables() {
    let s = session(page());
    assert_eq!(
        s.runner.evaluate("location.href + ' ' + document.title").unwrap(),
        JsValue::String("https://x.test hi".into())
    );
    assert_eq!(
        s.finish().paths(),
        vec!["window.location.href", "window.document.title"]
    );
}

#[test]
fn test_this_is_the_primary_root() {
    let s = session(page());
    assert_eq!(
        s.runner.evaluate("this.name").unwrap(),
        JsValue::String("main".into())
    );
    assert_eq!(s.finish().paths(), vec!["window.name"]);
}

#[test]
fn test_write_sends_set_and_evaluates_to_echo() {
    let s = session(page());
    assert_eq!(
        s.runner.evaluate("window.document.title = \"hi there\"").unwrap(),
        JsValue::String("hi there".into())
    );
    let recording = s.finish();
    assert_eq!(recording.requests.len(), 1);
    let request = &recording.requests[0];
    assert_eq!(request.kind, AccessKind::Set);
    assert_eq!(request.path.as_str(), "window.document.title");
    assert_eq!(request.value, Some(json!("hi there")));
    assert_eq!(
        recording.document.root()["window"]["document"]["title"],
        "hi there"
    );
}

#[test]
fn test_write_undefined_removes_member() {
    let s = session(page());
    assert_eq!(
        s.runner.evaluate("window.name = undefined").unwrap(),
        JsValue::Undefined
    );
    let recording = s.finish();
    assert_eq!(recording.requests[0].value, None);
    assert!(recording.document.root()["window"].get("name").is_none());
}

#[test]
fn test_compound_assignment_reads_then_writes() {
    let s = session(page());
    s.runner.run("document.title += '!'").unwrap();
    let recording = s.finish();
    let kinds: Vec<_> = recording.requests.iter().map(|r| r.kind).collect();
    assert_eq!(kinds, vec![AccessKind::Get, AccessKind::Set]);
    assert_eq!(
        recording.paths(),
        vec!["window.document.title", "window.document.title"]
    );
    assert_eq!(recording.document.root()["window"]["document"]["title"], "hi!");
}

#[test]
fn test_undeclared_chain_accumulates_one_path() {
    let s = session(json!({"window": {"screen": {"orientation": {"angle": 90}}}}));
    assert_eq!(
        s.runner.evaluate("window.screen.orientation.angle").unwrap(),
        int(90)
    );
    assert_eq!(s.finish().paths(), vec!["window.screen.orientation.angle"]);
}

#[test]
fn test_schema_mode_resolves_undeclared_members_immediately() {
    let s = session_with(page(), |r| r.with_classifier_mode(ClassifierMode::Schema));
    assert_eq!(s.runner.evaluate("window.screen.width").unwrap(), int(1280));
    // The member arrives as a JSON value and `width` is read locally.
    assert_eq!(s.finish().paths(), vec!["window.screen"]);

    let s = session_with(page(), |r| r.with_classifier_mode(ClassifierMode::Lookahead));
    assert_eq!(s.runner.evaluate("window.screen.width").unwrap(), int(1280));
    assert_eq!(s.finish().paths(), vec!["window.screen.width"]);
}

#[test]
fn test_declared_schema_navigates_without_lookahead() {
    let schema = CapabilitySchema::new().navigable(
        "window",
        CapabilitySchema::new()
            .navigable("screen", CapabilitySchema::new())
            .constant("version", JsValue::String("1.2".into())),
    );
    let s = session_with(page(), |r| {
        r.with_schema(schema)
            .with_classifier_mode(ClassifierMode::Schema)
    });
    assert_eq!(
        s.runner.evaluate("var w = screen.width; version + ':' + w").unwrap(),
        JsValue::String("1.2:1280".into())
    );
    assert_eq!(s.finish().paths(), vec!["window.screen.width"]);
}

#[test]
fn test_lookahead_spans_lines() {
    let s = session(page());
    let script = "var a = 1;\nvar w = window\n  .screen.width;\nvar h = location.href;";
    s.runner.run(script).unwrap();
    assert_eq!(
        s.finish().paths(),
        vec!["window.screen.width", "window.location.href"]
    );
}

#[test]
fn test_computed_members() {
    let s = session(page());
    assert_eq!(
        s.runner.evaluate("var key = 'href'; window['location'][key]").unwrap(),
        JsValue::String("https://x.test".into())
    );
    assert_eq!(
        s.runner.evaluate("window['scr' + 'een'].width").unwrap(),
        int(1280)
    );
    assert_eq!(
        s.finish().paths(),
        vec!["window.location.href", "window.screen.width"]
    );
}

#[test]
fn test_calling_a_node_member_is_a_type_error() {
    let s = session(page());
    let err = s.runner.run("window.alert('x')").unwrap_err();
    assert!(matches!(err, SandboxError::Aborted(JErrorType::TypeError(_))));
    assert!(s.finish().requests.is_empty());
}

#[test]
fn test_throw_aborts_after_earlier_accesses() {
    let s = session(page());
    let err = s
        .runner
        .run("var n = window.name; if (n === 'main') throw 'stop'; window.name = 'x';")
        .unwrap_err();
    assert_eq!(
        err,
        SandboxError::Aborted(JErrorType::Thrown(JsValue::String("stop".into())))
    );
    assert_eq!(s.finish().paths(), vec!["window.name"]);
}

#[test]
fn test_syntax_error_sends_nothing() {
    let s = session(page());
    assert!(matches!(
        s.runner.run("window.name = ;"),
        Err(SandboxError::Syntax(_))
    ));
    assert!(s.finish().requests.is_empty());
}

#[test]
fn test_console_output_reaches_sink() {
    let sink = ConsoleSink::default();
    let s = session_with(page(), |r| r.with_console_sink(ConsoleSink::clone(&sink)));
    s.runner
        .run("console.log('at', location.href); console.error(typeof window)")
        .unwrap();
    s.finish();
    let lines = sink.borrow();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0].level, log::Level::Info);
    assert_eq!(lines[0].text, "at https://x.test");
    assert_eq!(lines[1].level, log::Level::Error);
    assert_eq!(lines[1].text, "object");
}

#[test]
fn test_requests_are_strictly_sequential() {
    let buffer = Arc::new(ChannelBuffer::new(64).unwrap());
    let (tx, rx) = crossbeam_channel::unbounded::<AccessorMessage>();
    let writer = Arc::clone(&buffer);
    let coordinator = thread::spawn(move || {
        let mut ids = vec![];
        let mut overlapping = 0;
        while let Ok(message) = rx.recv() {
            // Give a misbehaving sandbox time to post a second request.
            thread::sleep(Duration::from_millis(5));
            if !rx.is_empty() {
                overlapping += 1;
            }
            ids.push(message.id);
            writer
                .publish(&warden::channel::encode_reply(&DecodedValue::Integer(2)))
                .unwrap();
        }
        (ids, overlapping)
    });

    let runner = SandboxRunner::new(BlockingChannel::new(buffer, tx));
    assert_eq!(
        runner
            .evaluate("var a = window.a; var b = window.b; window.c = a + b; window.d")
            .unwrap(),
        int(2)
    );
    drop(runner);
    let (ids, overlapping) = coordinator.join().unwrap();
    assert_eq!(ids, vec![1, 2, 3, 4]);
    assert_eq!(overlapping, 0);
}

#[test]
fn test_timeout_is_raised_instead_of_stale_reply() {
    let buffer = Arc::new(ChannelBuffer::new(64).unwrap());
    buffer
        .publish(&warden::channel::encode_reply(&DecodedValue::String(
            "stale".into(),
        )))
        .unwrap();
    // The queue stays open, but nobody answers.
    let (tx, _rx) = crossbeam_channel::unbounded();
    let channel = BlockingChannel::new(buffer, tx).with_timeout(Duration::from_millis(40));
    let runner = SandboxRunner::new(channel);

    match runner.evaluate("window.name") {
        Err(SandboxError::Aborted(JErrorType::Channel(ChannelError::Timeout { path, .. }))) => {
            assert_eq!(path, "window.name")
        }
        other => panic!("expected a timeout, got {:?}", other),
    }
    assert!(runner.channel().is_poisoned());
    assert!(matches!(
        runner.run("window.name"),
        Err(SandboxError::Aborted(JErrorType::Channel(
            ChannelError::Poisoned { .. }
        )))
    ));
    // Scripts that stay local still run.
    assert_eq!(runner.evaluate("1 + 1").unwrap(), int(2));
}

#[test]
fn test_unknown_content_type_aborts_script() {
    let buffer = Arc::new(ChannelBuffer::new(64).unwrap());
    let (tx, rx) = crossbeam_channel::unbounded::<AccessorMessage>();
    let writer = Arc::clone(&buffer);
    let coordinator = thread::spawn(move || {
        for _message in rx.iter() {
            writer
                .publish(&EncodedReply::empty(ContentType::Unknown))
                .unwrap();
        }
    });
    let runner = SandboxRunner::new(BlockingChannel::new(buffer, tx));
    assert_eq!(
        runner.run("var t = document.title;").unwrap_err(),
        SandboxError::Aborted(JErrorType::Channel(ChannelError::UnknownContentType {
            path: "window.document.title".to_string(),
            tag: 0,
        }))
    );
    drop(runner);
    coordinator.join().unwrap();
}

#[test]
fn test_default_document_coordinator() {
    let buffer = Arc::new(ChannelBuffer::new(128).unwrap());
    let (tx, rx) = crossbeam_channel::unbounded();
    let coordinator = Coordinator::new(Arc::clone(&buffer), JsonDocument::browser_default())
        .spawn(rx)
        .unwrap();
    let runner = SandboxRunner::new(BlockingChannel::new(buffer, tx));
    runner
        .run("if (location.href === 'about:blank') document.title = 'blank';")
        .unwrap();
    drop(runner);
    let document = coordinator.join().unwrap();
    assert_eq!(document.root()["window"]["document"]["title"], "blank");
}

#[test]
fn test_out_of_range_array_write_keeps_coordinator_alive() {
    let s = session(json!({"window": {"items": [1]}}));
    assert_eq!(
        s.runner
            .evaluate("window.items['18446744073709551615'] = 1")
            .unwrap(),
        int(1)
    );
    assert_eq!(s.runner.evaluate("window.items[1] = 2").unwrap(), int(2));
    let recording = s.finish();
    assert_eq!(
        recording.paths(),
        vec!["window.items.18446744073709551615", "window.items.1"]
    );
    assert_eq!(recording.document.root()["window"]["items"], json!([1, 2]));
}
