//! Error objects and the errors document.
//!
//! [`ErrorObject`] is both an error type handlers can pass around and the
//! wire form written by [`write_errors`]:
//!
//! ```
//! use jsonapi::{write_errors, ErrorObject};
//!
//! let err = ErrorObject {
//!     title: "Not found".into(),
//!     status: "404".into(),
//!     ..Default::default()
//! };
//! let mut out = Vec::new();
//! write_errors(&mut out, &[err]).unwrap();
//! assert_eq!(out, b"{\"errors\":[{\"title\":\"Not found\",\"status\":\"404\"}]}\n");
//! ```

use std::io::{self, Write};

use serde::{Deserialize, Serialize};

use crate::document::Meta;
use crate::error::DecodeError;

/// The errors document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorsPayload {
    pub errors: Vec<ErrorObject>,
}

/// A single problem, as reported to clients.
///
/// Empty strings and `None` are left out of the serialized form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorObject {
    /// Unique identifier of this occurrence.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    /// Short summary that stays the same across occurrences.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,
    /// Explanation specific to this occurrence.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub detail: String,
    /// HTTP status code, as a string.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub status: String,
    /// Application-specific error code.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<ErrorSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

/// What in the request caused the error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorSource {
    /// JSON Pointer into the request document.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub pointer: String,
    /// Name of the offending query or path parameter.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub parameter: String,
    /// Name of the offending request header.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub header: String,
}

impl std::fmt::Display for ErrorObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Error: {} {}", self.title, self.detail)
    }
}

impl std::error::Error for ErrorObject {}

impl From<&DecodeError> for ErrorObject {
    fn from(err: &DecodeError) -> Self {
        let (status, title) = match err.innermost() {
            DecodeError::Schema(_) => ("500", "Unusable model declaration"),
            DecodeError::Io(_) => ("400", "Unreadable request body"),
            _ => ("400", "Invalid document"),
        };
        ErrorObject {
            title: title.to_string(),
            detail: err.to_string(),
            status: status.to_string(),
            source: err.pointer().map(|pointer| ErrorSource {
                pointer: pointer.to_string(),
                ..ErrorSource::default()
            }),
            ..ErrorObject::default()
        }
    }
}

impl From<DecodeError> for ErrorObject {
    fn from(err: DecodeError) -> Self {
        ErrorObject::from(&err)
    }
}

/// Writes `errors`, in order, as an errors document followed by a newline.
///
/// The document is built in memory first, so a failed write is the only
/// way this can fail.
pub fn write_errors<W: Write>(mut writer: W, errors: &[ErrorObject]) -> io::Result<()> {
    #[derive(Serialize)]
    struct Payload<'a> {
        errors: &'a [ErrorObject],
    }

    let mut buf = serde_json::to_vec(&Payload { errors })?;
    buf.push(b'\n');
    writer.write_all(&buf)
}
