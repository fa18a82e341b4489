mod common;

use std::sync::atomic::{AtomicUsize, Ordering};

use common::*;
use jsonapi::{set_global_observer, Event, Runtime};

static EVENTS: AtomicUsize = AtomicUsize::new(0);

// Installing the global observer is process-wide, so this binary holds a
// single test.
#[test]
fn global_observer_is_installed_once_and_inherited() {
    assert!(set_global_observer(|_: &Event<'_>| {
        EVENTS.fetch_add(1, Ordering::SeqCst);
    }));
    assert!(!set_global_observer(|_: &Event<'_>| {}));

    jsonapi::encode_one(&comment(1, 1)).expect("encode must succeed");
    assert_eq!(EVENTS.load(Ordering::SeqCst), 2);

    Runtime::new()
        .without_observer()
        .encode_one(&comment(2, 1))
        .expect("encode must succeed");
    assert_eq!(EVENTS.load(Ordering::SeqCst), 2);
}
