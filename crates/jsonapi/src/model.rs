//! Declaring models.
//!
//! A type opts into the document format by implementing [`Model`] and
//! registering each of its fields with a tag and an accessor pair:
//!
//! ```
//! use jsonapi::{Declaration, Model};
//!
//! #[derive(Debug, Default)]
//! struct Comment {
//!     id: u64,
//!     body: String,
//! }
//!
//! #[derive(Debug, Default)]
//! struct Post {
//!     id: u64,
//!     title: String,
//!     comments: Vec<Comment>,
//! }
//!
//! impl Model for Comment {
//!     fn declare(d: &mut Declaration<Self>) {
//!         d.field("id", "primary,comments", |c| &c.id, |c| &mut c.id);
//!         d.field("body", "attr,body", |c| &c.body, |c| &mut c.body);
//!     }
//! }
//!
//! impl Model for Post {
//!     fn declare(d: &mut Declaration<Self>) {
//!         d.field("id", "primary,posts", |p| &p.id, |p| &mut p.id);
//!         d.field("title", "attr,title", |p| &p.title, |p| &mut p.title);
//!         d.relation("comments", "relation,comments", |p| &p.comments, |p| &mut p.comments);
//!     }
//! }
//! ```
//!
//! Tags are only parsed when the type is first resolved, so a bad tag
//! surfaces as a [`SchemaError`] from the first encode or decode.

use std::any::type_name;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::decode::Decoder;
use crate::descriptor;
use crate::document::ResourceIdentifier;
use crate::encode::Encoder;
use crate::error::{DecodeError, EncodeError, SchemaError};
use crate::hooks::{
    Hooks, Linkable, Links, Meta, Metable, RelationshipLinkable, RelationshipMetable,
};
use crate::tag::EmbedMode;

/// A type that can be encoded into and decoded from documents.
///
/// `Default` supplies the zero value decoding starts from, and the stub
/// produced for relationships whose target is not in `included`.
pub trait Model: Default + Send + Sync + 'static {
    fn declare(decl: &mut Declaration<Self>);
}

/// Number of resources a relationship holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cardinality {
    ToOne,
    ToMany,
}

impl std::fmt::Display for Cardinality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Cardinality::ToOne => f.write_str("to-one"),
            Cardinality::ToMany => f.write_str("to-many"),
        }
    }
}

/// A field holding references to other models.
///
/// The cardinality of a relationship follows from the holder: an optional
/// pointer is to-one, a vector is to-many.
pub trait RelationSlot: Send + Sync + 'static {
    type Target: Model;
    const CARDINALITY: Cardinality;

    fn targets(&self) -> Vec<&Self::Target>;
    fn assign(&mut self, targets: Vec<Self::Target>);
}

impl<R: Model> RelationSlot for Option<Box<R>> {
    type Target = R;
    const CARDINALITY: Cardinality = Cardinality::ToOne;

    fn targets(&self) -> Vec<&R> {
        self.as_deref().into_iter().collect()
    }

    fn assign(&mut self, targets: Vec<R>) {
        *self = targets.into_iter().next().map(Box::new);
    }
}

impl<R: Model> RelationSlot for Option<Arc<R>> {
    type Target = R;
    const CARDINALITY: Cardinality = Cardinality::ToOne;

    fn targets(&self) -> Vec<&R> {
        self.as_deref().into_iter().collect()
    }

    fn assign(&mut self, targets: Vec<R>) {
        *self = targets.into_iter().next().map(Arc::new);
    }
}

impl<R: Model> RelationSlot for Vec<R> {
    type Target = R;
    const CARDINALITY: Cardinality = Cardinality::ToMany;

    fn targets(&self) -> Vec<&R> {
        self.iter().collect()
    }

    fn assign(&mut self, targets: Vec<R>) {
        *self = targets;
    }
}

/// Type-erased access to a primary or attribute field.
pub(crate) trait ValueOps<M>: Send + Sync {
    fn read(&self, model: &M) -> Result<Value, serde_json::Error>;
    fn write(&self, model: &mut M, value: Value) -> Result<(), serde_json::Error>;
}

struct FieldOps<M, V> {
    get: fn(&M) -> &V,
    get_mut: fn(&mut M) -> &mut V,
}

impl<M, V> ValueOps<M> for FieldOps<M, V>
where
    M: Model,
    V: Serialize + DeserializeOwned + 'static,
{
    fn read(&self, model: &M) -> Result<Value, serde_json::Error> {
        serde_json::to_value((self.get)(model))
    }

    fn write(&self, model: &mut M, value: Value) -> Result<(), serde_json::Error> {
        *(self.get_mut)(model) = serde_json::from_value(value)?;
        Ok(())
    }
}

/// Type-erased access to a relationship field. The target type is only
/// known inside the implementation.
pub(crate) trait RelationOps<M>: Send + Sync {
    fn cardinality(&self) -> Cardinality;

    fn check_target(&self) -> Result<(), SchemaError>;

    fn identify(
        &self,
        model: &M,
        encoder: &mut Encoder<'_>,
        key: &str,
        mode: EmbedMode,
    ) -> Result<Vec<ResourceIdentifier>, EncodeError>;

    fn materialize(
        &self,
        model: &mut M,
        identifiers: &[&ResourceIdentifier],
        decoder: &mut Decoder<'_>,
    ) -> Result<(), DecodeError>;
}

struct SlotOps<M, S> {
    get: fn(&M) -> &S,
    get_mut: fn(&mut M) -> &mut S,
}

impl<M, S> RelationOps<M> for SlotOps<M, S>
where
    M: Model,
    S: RelationSlot,
{
    fn cardinality(&self) -> Cardinality {
        S::CARDINALITY
    }

    fn check_target(&self) -> Result<(), SchemaError> {
        descriptor::check::<S::Target>()
    }

    fn identify(
        &self,
        model: &M,
        encoder: &mut Encoder<'_>,
        key: &str,
        mode: EmbedMode,
    ) -> Result<Vec<ResourceIdentifier>, EncodeError> {
        let targets = (self.get)(model).targets();
        encoder.identify::<S::Target>(type_name::<M>(), key, targets, mode)
    }

    fn materialize(
        &self,
        model: &mut M,
        identifiers: &[&ResourceIdentifier],
        decoder: &mut Decoder<'_>,
    ) -> Result<(), DecodeError> {
        let targets = decoder.materialize::<S::Target>(identifiers, S::CARDINALITY)?;
        (self.get_mut)(model).assign(targets);
        Ok(())
    }
}

pub(crate) enum Slot<M> {
    Value(Box<dyn ValueOps<M>>),
    Relation(Box<dyn RelationOps<M>>),
}

pub(crate) struct FieldDecl<M> {
    pub(crate) name: &'static str,
    pub(crate) tag: &'static str,
    pub(crate) slot: Slot<M>,
}

/// Collects the field registrations and hooks of one model type.
pub struct Declaration<M> {
    pub(crate) fields: Vec<FieldDecl<M>>,
    pub(crate) hooks: Hooks<M>,
}

impl<M: Model> Declaration<M> {
    pub(crate) fn new() -> Self {
        Self {
            fields: Vec::new(),
            hooks: Hooks::default(),
        }
    }

    /// Registers a primary or attribute field.
    ///
    /// `tag` is `primary,<type>` or `attr,<key>[,omitempty]`.
    pub fn field<V>(
        &mut self,
        name: &'static str,
        tag: &'static str,
        get: fn(&M) -> &V,
        get_mut: fn(&mut M) -> &mut V,
    ) -> &mut Self
    where
        V: Serialize + DeserializeOwned + 'static,
    {
        self.fields.push(FieldDecl {
            name,
            tag,
            slot: Slot::Value(Box::new(FieldOps { get, get_mut })),
        });
        self
    }

    /// Registers a relationship field.
    ///
    /// `tag` is `relation,<key>[,embed|ref][,omitempty]`.
    pub fn relation<S>(
        &mut self,
        name: &'static str,
        tag: &'static str,
        get: fn(&M) -> &S,
        get_mut: fn(&mut M) -> &mut S,
    ) -> &mut Self
    where
        S: RelationSlot,
    {
        self.fields.push(FieldDecl {
            name,
            tag,
            slot: Slot::Relation(Box::new(SlotOps { get, get_mut })),
        });
        self
    }

    /// Attaches [`Linkable::links`] to every resource of this type.
    pub fn linkable(&mut self) -> &mut Self
    where
        M: Linkable,
    {
        let hook: fn(&M) -> Links = <M as Linkable>::links;
        self.hooks.links = Some(hook);
        self
    }

    /// Attaches [`Metable::meta`] to every resource of this type.
    pub fn metable(&mut self) -> &mut Self
    where
        M: Metable,
    {
        let hook: fn(&M) -> Meta = <M as Metable>::meta;
        self.hooks.meta = Some(hook);
        self
    }

    /// Attaches [`RelationshipLinkable::relationship_links`] to relationships.
    pub fn relationship_linkable(&mut self) -> &mut Self
    where
        M: RelationshipLinkable,
    {
        let hook: fn(&M, &str) -> Option<Links> =
            <M as RelationshipLinkable>::relationship_links;
        self.hooks.relationship_links = Some(hook);
        self
    }

    /// Attaches [`RelationshipMetable::relationship_meta`] to relationships.
    pub fn relationship_metable(&mut self) -> &mut Self
    where
        M: RelationshipMetable,
    {
        let hook: fn(&M, &str) -> Option<Meta> = <M as RelationshipMetable>::relationship_meta;
        self.hooks.relationship_meta = Some(hook);
        self
    }
}
