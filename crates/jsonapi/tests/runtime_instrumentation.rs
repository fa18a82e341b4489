mod common;

use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use common::*;
use jsonapi::{Document, Event, EventKind, Runtime, MEDIA_TYPE};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
struct Recorded {
    kind: EventKind,
    call_id: Uuid,
    label: Option<String>,
    elapsed: Duration,
}

fn recording_runtime(label: Option<&str>) -> (Runtime, Arc<Mutex<Vec<Recorded>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let mut runtime = Runtime::new().with_observer(move |event: &Event<'_>| {
        sink.lock().expect("observer lock").push(Recorded {
            kind: event.kind,
            call_id: event.call_id,
            label: event.label.map(str::to_string),
            elapsed: event.elapsed,
        });
    });
    if let Some(label) = label {
        runtime = runtime.instrument(label);
    }
    (runtime, seen)
}

fn assert_one_pair(events: &[Recorded], start: EventKind, stop: EventKind, label: Option<&str>) {
    assert_eq!(events.len(), 2, "{events:?}");
    assert_eq!(events[0].kind, start);
    assert_eq!(events[1].kind, stop);
    assert_eq!(events[0].call_id, events[1].call_id);
    assert_eq!(events[0].call_id.get_version_num(), 4);
    assert_eq!(events[0].elapsed, Duration::ZERO);
    for event in events {
        assert_eq!(event.label.as_deref(), label);
    }
}

#[test]
fn marshal_emits_one_start_and_one_stop() {
    let (runtime, seen) = recording_runtime(Some("blogs.show"));
    let mut out = Vec::new();
    runtime
        .marshal_one(&mut out, &fixture_blog())
        .expect("marshal must succeed");
    let events = seen.lock().expect("lock").clone();
    assert_one_pair(
        &events,
        EventKind::MarshalStart,
        EventKind::MarshalStop,
        Some("blogs.show"),
    );
}

#[test]
fn unmarshal_emits_one_start_and_one_stop() {
    let (runtime, seen) = recording_runtime(Some("blogs.create"));
    let body = br#"{"data": {"type": "comments", "id": "1", "attributes": {"body": "hi"}}}"#;
    let comment: Comment = runtime
        .unmarshal_one(&body[..])
        .expect("unmarshal must succeed");
    assert_eq!(comment.body, "hi");
    let events = seen.lock().expect("lock").clone();
    assert_one_pair(
        &events,
        EventKind::UnmarshalStart,
        EventKind::UnmarshalStop,
        Some("blogs.create"),
    );
}

#[test]
fn failed_calls_still_emit_stop() {
    let (runtime, seen) = recording_runtime(None);
    let doc: Document = r#"{"data": {"type": "posts", "id": "1"}}"#
        .parse()
        .expect("document must parse");
    assert!(runtime.decode_many::<Comment>(&doc).is_err());
    let events = seen.lock().expect("lock").clone();
    assert_one_pair(&events, EventKind::UnmarshalStart, EventKind::UnmarshalStop, None);
}

#[test]
fn each_call_gets_a_fresh_id() {
    let (runtime, seen) = recording_runtime(Some("blogs.list"));
    let blogs = vec![fixture_blog(), fixture_blog()];
    let doc = runtime.encode_many(&blogs).expect("encode must succeed");
    let decoded: Vec<Blog> = runtime.decode_many(&doc).expect("decode must succeed");
    assert_eq!(decoded.len(), 2);

    let events = seen.lock().expect("lock").clone();
    assert_eq!(events.len(), 4);
    assert_one_pair(&events[..2], EventKind::MarshalStart, EventKind::MarshalStop, Some("blogs.list"));
    assert_one_pair(&events[2..], EventKind::UnmarshalStart, EventKind::UnmarshalStop, Some("blogs.list"));
    assert_ne!(events[0].call_id, events[2].call_id);
}

#[test]
fn runtime_without_observer_still_works() {
    let runtime = Runtime::new().without_observer().instrument("quiet");
    let doc = runtime.encode_one(&comment(1, 1)).expect("encode must succeed");
    let back: Comment = runtime.decode_one(&doc).expect("decode must succeed");
    assert_eq!(back, comment(1, 1));
}

/// In-memory sink for formatted log lines.
#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().expect("log lock").extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn tracing_subscriber_sees_call_events() {
    let captured = Captured::default();
    let sink = captured.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter("jsonapi=debug")
        .with_ansi(false)
        .with_writer(move || sink.clone())
        .finish();
    tracing::subscriber::with_default(subscriber, || {
        let runtime = Runtime::new().without_observer().instrument("traced");
        let doc = runtime.encode_one(&fixture_blog()).expect("encode must succeed");
        let _: Blog = runtime.decode_one(&doc).expect("decode must succeed");
        let _ = runtime.decode_many::<Blog>(&doc);
    });

    let output = String::from_utf8(captured.0.lock().expect("log lock").clone())
        .expect("log output is utf-8");
    let finished: Vec<_> = output.lines().filter(|line| line.contains("call finished")).collect();
    assert_eq!(finished.len(), 2, "{output}");
    assert!(finished.iter().all(|line| line.contains("traced")), "{output}");
    assert!(finished[0].contains("marshal"), "{output}");
    assert!(finished[1].contains("unmarshal"), "{output}");

    let failed: Vec<_> = output.lines().filter(|line| line.contains("call failed")).collect();
    assert_eq!(failed.len(), 1, "{output}");
    assert!(failed[0].contains("WARN"), "{output}");
    assert!(failed[0].contains("expected a collection"), "{output}");
}

#[test]
fn media_type() {
    assert_eq!(MEDIA_TYPE, "application/vnd.api+json");
}
