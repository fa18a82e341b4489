//! Encoding and decoding of JSON:API documents.
//!
//! Models opt in by implementing [`Model`] and declaring their fields with a
//! role tag: one `primary` field naming the resource type, `attr` fields for
//! attributes, and `relation` fields for relationships.
//!
//! # Example
//!
//! ```
//! use jsonapi::{Declaration, Model};
//!
//! #[derive(Debug, Default, PartialEq)]
//! struct Comment {
//!     id: u64,
//!     body: String,
//! }
//!
//! #[derive(Debug, Default, PartialEq)]
//! struct Post {
//!     id: u64,
//!     title: String,
//!     comments: Vec<Comment>,
//! }
//!
//! impl Model for Comment {
//!     fn declare(d: &mut Declaration<Self>) {
//!         d.field("id", "primary,comments", |c| &c.id, |c| &mut c.id)
//!             .field("body", "attr,body", |c| &c.body, |c| &mut c.body);
//!     }
//! }
//!
//! impl Model for Post {
//!     fn declare(d: &mut Declaration<Self>) {
//!         d.field("id", "primary,posts", |p| &p.id, |p| &mut p.id)
//!             .field("title", "attr,title", |p| &p.title, |p| &mut p.title)
//!             .relation("comments", "relation,comments", |p| &p.comments, |p| &mut p.comments);
//!     }
//! }
//!
//! let post = Post {
//!     id: 1,
//!     title: "Hello".into(),
//!     comments: vec![Comment { id: 7, body: "First".into() }],
//! };
//!
//! let document = jsonapi::encode_one(&post).unwrap();
//! assert_eq!(document.included.len(), 1);
//!
//! let decoded: Post = jsonapi::decode_one(&document).unwrap();
//! assert_eq!(decoded, post);
//! ```

pub mod config;
pub mod decode;
pub mod descriptor;
pub mod document;
pub mod encode;
pub mod error;
pub mod errors;
pub mod hooks;
pub mod model;
pub mod pointer;
pub mod runtime;
pub mod tag;

pub use config::Config;
pub use decode::Decoder;
pub use descriptor::{resolve, Descriptor};
pub use document::{
    Document, Link, LinkObject, Links, Meta, PrimaryData, RelationshipData, RelationshipObject,
    ResourceIdentifier, ResourceObject,
};
pub use encode::Encoder;
pub use error::{DecodeError, EncodeError, SchemaError};
pub use errors::{write_errors, ErrorObject, ErrorSource, ErrorsPayload};
pub use hooks::{Linkable, Metable, RelationshipLinkable, RelationshipMetable};
pub use model::{Cardinality, Declaration, Model, RelationSlot};
pub use runtime::{set_global_observer, Event, EventKind, Observer, Runtime, INSTRUMENT_KEY};
pub use tag::{EmbedMode, Tag};

use std::io::{Read, Write};

/// Media type of JSON:API documents, for `Content-Type` and `Accept`.
pub const MEDIA_TYPE: &str = "application/vnd.api+json";

/// Encodes one model with a default [`Runtime`].
pub fn encode_one<M: Model>(model: &M) -> Result<Document, EncodeError> {
    Runtime::new().encode_one(model)
}

/// Encodes a collection with a default [`Runtime`].
pub fn encode_many<'m, M, I>(models: I) -> Result<Document, EncodeError>
where
    M: Model,
    I: IntoIterator<Item = &'m M>,
{
    Runtime::new().encode_many(models)
}

/// Decodes a single primary resource with a default [`Runtime`].
pub fn decode_one<M: Model>(document: &Document) -> Result<M, DecodeError> {
    Runtime::new().decode_one(document)
}

/// Decodes a primary collection with a default [`Runtime`].
pub fn decode_many<M: Model>(document: &Document) -> Result<Vec<M>, DecodeError> {
    Runtime::new().decode_many(document)
}

pub fn marshal_one<M: Model, W: Write>(writer: W, model: &M) -> Result<(), EncodeError> {
    Runtime::new().marshal_one(writer, model)
}

pub fn marshal_many<'m, M, I, W>(writer: W, models: I) -> Result<(), EncodeError>
where
    M: Model,
    I: IntoIterator<Item = &'m M>,
    W: Write,
{
    Runtime::new().marshal_many(writer, models)
}

pub fn unmarshal_one<M: Model, R: Read>(reader: R) -> Result<M, DecodeError> {
    Runtime::new().unmarshal_one(reader)
}

pub fn unmarshal_many<M: Model, R: Read>(reader: R) -> Result<Vec<M>, DecodeError> {
    Runtime::new().unmarshal_many(reader)
}
