//! Field role declarations.
//!
//! Every declared field carries a tag string: a role token followed by
//! role-specific parameters, comma separated.
//!
//! ```text
//! primary,<resource type>
//! attr,<key>[,omitempty]
//! relation,<key>[,embed|ref][,omitempty]
//! ```
//!
//! `attribute` and `relationship` are accepted as long forms of `attr` and
//! `relation`.

use crate::error::SchemaError;

/// How a relationship's targets reach the document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum EmbedMode {
    /// Only `{type, id}` identifiers are written.
    Reference,
    /// Identifiers are written and the full targets are queued for `included`.
    #[default]
    Embed,
}

/// A parsed tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tag {
    Primary {
        resource_type: String,
    },
    Attribute {
        key: String,
        omit_empty: bool,
    },
    Relationship {
        key: String,
        mode: EmbedMode,
        omit_empty: bool,
    },
}

impl Tag {
    /// Parses a tag string. `field` is only used for error context.
    pub fn parse(field: &str, raw: &str) -> Result<Tag, SchemaError> {
        let mut parts = raw.split(',').map(str::trim);
        let role = parts.next().unwrap_or_default();
        match role {
            "primary" => {
                let resource_type = required(field, role, parts.next())?;
                if let Some(extra) = parts.next() {
                    return Err(unknown_option(field, extra));
                }
                Ok(Tag::Primary { resource_type })
            }
            "attr" | "attribute" => {
                let key = required(field, role, parts.next())?;
                let mut omit_empty = false;
                for opt in parts {
                    match opt {
                        "omitempty" => omit_empty = true,
                        other => return Err(unknown_option(field, other)),
                    }
                }
                Ok(Tag::Attribute { key, omit_empty })
            }
            "relation" | "relationship" => {
                let key = required(field, role, parts.next())?;
                let mut mode = EmbedMode::default();
                let mut omit_empty = false;
                for opt in parts {
                    match opt {
                        "embed" => mode = EmbedMode::Embed,
                        "ref" => mode = EmbedMode::Reference,
                        "omitempty" => omit_empty = true,
                        other => return Err(unknown_option(field, other)),
                    }
                }
                Ok(Tag::Relationship {
                    key,
                    mode,
                    omit_empty,
                })
            }
            other => Err(SchemaError::UnknownRole {
                field: field.to_string(),
                role: other.to_string(),
            }),
        }
    }

    pub fn role(&self) -> &'static str {
        match self {
            Tag::Primary { .. } => "primary",
            Tag::Attribute { .. } => "attr",
            Tag::Relationship { .. } => "relation",
        }
    }
}

fn required(field: &str, role: &str, param: Option<&str>) -> Result<String, SchemaError> {
    match param {
        Some(p) if !p.is_empty() => Ok(p.to_string()),
        _ => Err(SchemaError::MissingParameter {
            field: field.to_string(),
            role: role.to_string(),
        }),
    }
}

fn unknown_option(field: &str, option: &str) -> SchemaError {
    SchemaError::UnknownOption {
        field: field.to_string(),
        option: option.to_string(),
    }
}
