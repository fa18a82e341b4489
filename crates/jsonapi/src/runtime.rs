//! Instrumented entry points.
//!
//! A [`Runtime`] wraps every encode and decode call in a pair of events
//! delivered to an [`Observer`]: a start event when the call begins and a
//! stop event, carrying the elapsed time, when it returns. Both events of
//! one call share a fresh correlation id.
//!
//! ```
//! use std::sync::{Arc, Mutex};
//! use jsonapi::{Event, EventKind, Runtime};
//!
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let sink = seen.clone();
//! let runtime = Runtime::new()
//!     .instrument("blogs.show")
//!     .with_observer(move |event: &Event<'_>| sink.lock().unwrap().push(event.kind));
//!
//! let document = r#"{"data": {"type": "blogs", "id": "1"}}"#.parse().unwrap();
//! # #[derive(Default)] struct Blog { id: u64 }
//! # impl jsonapi::Model for Blog {
//! #     fn declare(d: &mut jsonapi::Declaration<Self>) {
//! #         d.field("id", "primary,blogs", |b| &b.id, |b| &mut b.id);
//! #     }
//! # }
//! let blog: Blog = runtime.decode_one(&document).unwrap();
//! assert_eq!(blog.id, 1);
//! assert_eq!(*seen.lock().unwrap(), [EventKind::UnmarshalStart, EventKind::UnmarshalStop]);
//! ```

use std::collections::HashMap;
use std::fmt::Display;
use std::io::{Read, Write};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::decode::Decoder;
use crate::document::Document;
use crate::encode::Encoder;
use crate::error::{DecodeError, EncodeError};
use crate::model::Model;

/// Context key under which [`Runtime::instrument`] stores its label.
pub const INSTRUMENT_KEY: &str = "instrument";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    UnmarshalStart,
    UnmarshalStop,
    MarshalStart,
    MarshalStop,
}

impl EventKind {
    pub fn is_start(self) -> bool {
        matches!(self, EventKind::UnmarshalStart | EventKind::MarshalStart)
    }

    fn operation(self) -> &'static str {
        match self {
            EventKind::UnmarshalStart | EventKind::UnmarshalStop => "unmarshal",
            EventKind::MarshalStart | EventKind::MarshalStop => "marshal",
        }
    }
}

/// One instrumentation event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event<'a> {
    pub kind: EventKind,
    /// Shared by the start and stop events of one call.
    pub call_id: Uuid,
    /// The runtime's instrumentation label, if any.
    pub label: Option<&'a str>,
    /// Time spent in the call. Zero for start events.
    pub elapsed: Duration,
}

/// Receives instrumentation events, synchronously on the calling thread.
pub trait Observer: Send + Sync {
    fn observe(&self, event: &Event<'_>);
}

impl<F> Observer for F
where
    F: Fn(&Event<'_>) + Send + Sync,
{
    fn observe(&self, event: &Event<'_>) {
        self(event)
    }
}

static GLOBAL_OBSERVER: OnceLock<Arc<dyn Observer>> = OnceLock::new();

/// Installs the observer picked up by every later [`Runtime::new`].
///
/// Only the first call has an effect; it returns `false` afterwards.
pub fn set_global_observer<O: Observer + 'static>(observer: O) -> bool {
    GLOBAL_OBSERVER.set(Arc::new(observer)).is_ok()
}

/// Entry point for encoding and decoding with instrumentation, a context
/// value map, and a [`Config`].
#[derive(Clone)]
pub struct Runtime {
    values: HashMap<String, Value>,
    config: Config,
    observer: Option<Arc<dyn Observer>>,
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("values", &self.values)
            .field("config", &self.config)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl Runtime {
    /// A runtime with the default config and the global observer, if one
    /// has been installed.
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
            config: Config::default(),
            observer: GLOBAL_OBSERVER.get().cloned(),
        }
    }

    /// Labels the events of every call made through this runtime.
    pub fn instrument(self, label: impl Into<String>) -> Self {
        self.with_value(INSTRUMENT_KEY, label.into())
    }

    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn value(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn label(&self) -> Option<&str> {
        self.value(INSTRUMENT_KEY).and_then(Value::as_str)
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Replaces the observer, including one inherited from the global default.
    pub fn with_observer<O: Observer + 'static>(self, observer: O) -> Self {
        self.with_shared_observer(Arc::new(observer))
    }

    pub fn with_shared_observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn without_observer(mut self) -> Self {
        self.observer = None;
        self
    }

    pub fn encode_one<M: Model>(&self, model: &M) -> Result<Document, EncodeError> {
        self.instrumented(EventKind::MarshalStart, EventKind::MarshalStop, || {
            Encoder::new(&self.config).encode_one(model)
        })
    }

    pub fn encode_many<'m, M, I>(&self, models: I) -> Result<Document, EncodeError>
    where
        M: Model,
        I: IntoIterator<Item = &'m M>,
    {
        self.instrumented(EventKind::MarshalStart, EventKind::MarshalStop, || {
            Encoder::new(&self.config).encode_many(models)
        })
    }

    pub fn decode_one<M: Model>(&self, document: &Document) -> Result<M, DecodeError> {
        self.instrumented(EventKind::UnmarshalStart, EventKind::UnmarshalStop, || {
            Decoder::new(&self.config, document).decode_one()
        })
    }

    pub fn decode_many<M: Model>(&self, document: &Document) -> Result<Vec<M>, DecodeError> {
        self.instrumented(EventKind::UnmarshalStart, EventKind::UnmarshalStop, || {
            Decoder::new(&self.config, document).decode_many()
        })
    }

    /// Encodes `model` and writes the document to `writer`.
    pub fn marshal_one<M: Model, W: Write>(&self, writer: W, model: &M) -> Result<(), EncodeError> {
        self.instrumented(EventKind::MarshalStart, EventKind::MarshalStop, || {
            Encoder::new(&self.config)
                .encode_one(model)?
                .write_to(writer)
        })
    }

    /// Encodes `models` as a collection and writes the document to `writer`.
    pub fn marshal_many<'m, M, I, W>(&self, writer: W, models: I) -> Result<(), EncodeError>
    where
        M: Model,
        I: IntoIterator<Item = &'m M>,
        W: Write,
    {
        self.instrumented(EventKind::MarshalStart, EventKind::MarshalStop, || {
            Encoder::new(&self.config)
                .encode_many(models)?
                .write_to(writer)
        })
    }

    /// Reads a document from `reader` and decodes its single primary resource.
    pub fn unmarshal_one<M: Model, R: Read>(&self, reader: R) -> Result<M, DecodeError> {
        self.instrumented(EventKind::UnmarshalStart, EventKind::UnmarshalStop, || {
            let document = Document::from_reader(reader)?;
            Decoder::new(&self.config, &document).decode_one()
        })
    }

    /// Reads a document from `reader` and decodes its primary collection.
    pub fn unmarshal_many<M: Model, R: Read>(&self, reader: R) -> Result<Vec<M>, DecodeError> {
        self.instrumented(EventKind::UnmarshalStart, EventKind::UnmarshalStop, || {
            let document = Document::from_reader(reader)?;
            Decoder::new(&self.config, &document).decode_many()
        })
    }

    fn instrumented<T, E, F>(&self, start: EventKind, stop: EventKind, call: F) -> Result<T, E>
    where
        E: Display,
        F: FnOnce() -> Result<T, E>,
    {
        let call_id = Uuid::new_v4();
        let label = self.label();
        let operation = start.operation();
        self.emit(start, call_id, Duration::ZERO);

        let started = Instant::now();
        let result = call();
        let elapsed = started.elapsed();

        match &result {
            Ok(_) => debug!(operation, %call_id, label, ?elapsed, "call finished"),
            Err(err) => warn!(operation, %call_id, label, ?elapsed, error = %err, "call failed"),
        }
        self.emit(stop, call_id, elapsed);
        result
    }

    fn emit(&self, kind: EventKind, call_id: Uuid, elapsed: Duration) {
        if let Some(observer) = &self.observer {
            observer.observe(&Event {
                kind,
                call_id,
                label: self.label(),
                elapsed,
            });
        }
    }
}
