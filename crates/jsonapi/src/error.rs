//! Error families of the codec.
//!
//! - [`SchemaError`]: a model's declarations are unusable. Fatal, never retried.
//! - [`EncodeError`]: an object graph could not be turned into a document.
//! - [`DecodeError`]: a document could not be turned into an object graph.

use thiserror::Error;

use crate::model::Cardinality;
use crate::pointer::PointerBuf;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("model `{model}` declares no primary field")]
    MissingPrimary { model: &'static str },
    #[error("model `{model}` declares more than one primary field (`{first}` and `{second}`)")]
    DuplicatePrimary {
        model: &'static str,
        first: String,
        second: String,
    },
    #[error("field `{field}`: unknown role token `{role}`")]
    UnknownRole { field: String, role: String },
    #[error("field `{field}`: role `{role}` requires a parameter")]
    MissingParameter { field: String, role: String },
    #[error("field `{field}`: unknown option `{option}`")]
    UnknownOption { field: String, option: String },
    #[error("model `{model}`: field `{field}` is tagged `{role}` but registered as a {slot} slot")]
    RoleMismatch {
        model: &'static str,
        field: String,
        role: &'static str,
        slot: &'static str,
    },
    #[error("model `{model}` uses the key `{key}` more than once")]
    DuplicateKey { model: &'static str, key: String },
    #[error("model `{model}`: relationship `{field}` targets an unusable model: {source}")]
    Relationship {
        model: &'static str,
        field: String,
        source: Box<SchemaError>,
    },
}

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("model `{model}`: attribute `{key}` cannot be serialized: {source}")]
    Attribute {
        model: &'static str,
        key: String,
        source: serde_json::Error,
    },
    #[error("model `{model}`: primary field cannot be serialized: {source}")]
    Id {
        model: &'static str,
        source: serde_json::Error,
    },
    #[error("model `{model}`: primary field must be a string or an integer, found {kind}")]
    UnsupportedId {
        model: &'static str,
        kind: &'static str,
    },
    #[error("model `{model}`: relationship `{key}` references a `{resource_type}` without an id")]
    UnidentifiedTarget {
        model: &'static str,
        key: String,
        resource_type: String,
    },
    #[error("document serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed document: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("document has no primary data")]
    MissingData,
    #[error("expected a single resource as primary data, found a collection")]
    ExpectedSingle,
    #[error("expected a collection as primary data, found a single resource")]
    ExpectedCollection,
    #[error("resource type `{found}` does not match `{expected}`")]
    TypeMismatch { expected: String, found: String },
    #[error("id `{id}` cannot be converted for `{resource_type}`: {reason}")]
    InvalidId {
        resource_type: String,
        id: String,
        reason: String,
    },
    #[error("attribute `{key}` has an unexpected value: {source}")]
    Attribute {
        key: String,
        source: serde_json::Error,
    },
    #[error("relationship `{key}` expects {expected} data")]
    Cardinality { key: String, expected: Cardinality },
    #[error("relationship `{key}`: {source}")]
    Relationship {
        key: String,
        source: Box<DecodeError>,
    },
    #[error("included resource {index}: {source}")]
    Included {
        index: usize,
        source: Box<DecodeError>,
    },
    /// A failure inside a resource nested in relationship data. `index` is
    /// the position in a to-many array.
    #[error("embedded resource: {source}")]
    Embedded {
        index: Option<usize>,
        source: Box<DecodeError>,
    },
    #[error("primary data element {index}: {source}")]
    Element {
        index: usize,
        source: Box<DecodeError>,
    },
    #[error("document needs more than {limit} relationship targets to be materialized")]
    MaterializationLimit { limit: usize },
}

impl DecodeError {
    /// JSON Pointer to the document member that caused the failure.
    ///
    /// `None` when the underlying failure is not tied to a member:
    /// unparseable input, I/O, a schema problem on the receiving side, or
    /// an exhausted materialization budget. Wrapping does not change that.
    pub fn pointer(&self) -> Option<PointerBuf> {
        let (absolute, ptr) = self.locate()?;
        Some(if absolute { ptr } else { ptr.prefix(["data"]) })
    }

    /// The failure underneath every relationship, element and included
    /// wrapper.
    pub fn innermost(&self) -> &DecodeError {
        match self {
            DecodeError::Relationship { source, .. }
            | DecodeError::Included { source, .. }
            | DecodeError::Embedded { source, .. }
            | DecodeError::Element { source, .. } => source.innermost(),
            other => other,
        }
    }

    /// Path relative to the resource being decoded, or absolute when the
    /// failure happened somewhere the resource path does not lead to.
    fn locate(&self) -> Option<(bool, PointerBuf)> {
        let located = match self {
            DecodeError::Json(_)
            | DecodeError::Io(_)
            | DecodeError::Schema(_)
            | DecodeError::MaterializationLimit { .. } => return None,
            DecodeError::MissingData
            | DecodeError::ExpectedSingle
            | DecodeError::ExpectedCollection => (true, PointerBuf::new().prefix(["data"])),
            DecodeError::TypeMismatch { .. } => (false, PointerBuf::new().prefix(["type"])),
            DecodeError::InvalidId { .. } => (false, PointerBuf::new().prefix(["id"])),
            DecodeError::Attribute { key, .. } => {
                (false, PointerBuf::new().prefix(["attributes", key.as_str()]))
            }
            DecodeError::Cardinality { key, .. } => (false, relationship_data(key)),
            DecodeError::Relationship { key, source } => match source.locate()? {
                (true, ptr) => (true, ptr),
                // Nested resources know their own path below `data`.
                (false, ptr) if matches!(**source, DecodeError::Embedded { .. }) => {
                    (false, ptr.prefix(["relationships", key.as_str()]))
                }
                (false, _) => (false, relationship_data(key)),
            },
            DecodeError::Embedded { index, source } => match source.locate()? {
                (true, ptr) => (true, ptr),
                (false, ptr) => {
                    let head = std::iter::once("data".to_string())
                        .chain(index.iter().map(usize::to_string));
                    (false, ptr.prefix(head))
                }
            },
            DecodeError::Included { index, source } => match source.locate()? {
                (true, ptr) => (true, ptr),
                (false, ptr) => (true, ptr.prefix(["included".to_string(), index.to_string()])),
            },
            DecodeError::Element { index, source } => match source.locate()? {
                (true, ptr) => (true, ptr),
                (false, ptr) => (true, ptr.prefix(["data".to_string(), index.to_string()])),
            },
        };
        Some(located)
    }
}

fn relationship_data(key: &str) -> PointerBuf {
    PointerBuf::new().prefix(["relationships", key, "data"])
}
