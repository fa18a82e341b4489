//! Per-type descriptors and the process-wide cache they live in.
//!
//! A descriptor is built from a model's [`Declaration`] the first time the
//! type is encoded or decoded, then shared for the rest of the process.

use std::any::{type_name, Any, TypeId};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use serde_json::Value;
use tracing::{debug, trace};

use crate::error::{DecodeError, EncodeError, SchemaError};
use crate::hooks::Hooks;
use crate::model::{Cardinality, Declaration, FieldDecl, Model, RelationOps, Slot, ValueOps};
use crate::tag::{EmbedMode, Tag};

pub(crate) struct PrimaryField<M> {
    pub(crate) name: &'static str,
    pub(crate) resource_type: String,
    pub(crate) ops: Box<dyn ValueOps<M>>,
}

pub(crate) struct AttributeField<M> {
    pub(crate) name: &'static str,
    pub(crate) key: String,
    pub(crate) omit_empty: bool,
    pub(crate) ops: Box<dyn ValueOps<M>>,
}

pub(crate) struct RelationshipField<M> {
    pub(crate) name: &'static str,
    pub(crate) key: String,
    pub(crate) mode: EmbedMode,
    pub(crate) omit_empty: bool,
    pub(crate) ops: Box<dyn RelationOps<M>>,
}

/// Everything the codec knows about one model type. Immutable once built.
pub struct Descriptor<M> {
    pub(crate) model: &'static str,
    pub(crate) primary: PrimaryField<M>,
    pub(crate) attributes: Vec<AttributeField<M>>,
    pub(crate) relationships: Vec<RelationshipField<M>>,
    pub(crate) hooks: Hooks<M>,
}

impl<M: Model> std::fmt::Debug for Descriptor<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Descriptor")
            .field("model", &self.model)
            .field("resource_type", &self.primary.resource_type)
            .field("attributes", &self.attribute_keys().collect::<Vec<_>>())
            .field("relationships", &self.relationship_keys().collect::<Vec<_>>())
            .field("hooks", &!self.hooks.is_empty())
            .finish()
    }
}

impl<M: Model> Descriptor<M> {
    /// The resource type label written to `type`.
    pub fn resource_type(&self) -> &str {
        &self.primary.resource_type
    }

    /// Name of the field holding the id.
    pub fn primary_field(&self) -> &'static str {
        self.primary.name
    }

    /// Attribute keys in declaration order.
    pub fn attribute_keys(&self) -> impl Iterator<Item = &str> {
        self.attributes.iter().map(|a| a.key.as_str())
    }

    /// Relationship keys in declaration order.
    pub fn relationship_keys(&self) -> impl Iterator<Item = &str> {
        self.relationships.iter().map(|r| r.key.as_str())
    }

    pub fn cardinality(&self, key: &str) -> Option<Cardinality> {
        self.relationships
            .iter()
            .find(|r| r.key == key)
            .map(|r| r.ops.cardinality())
    }

    /// Reads the id of `model`. An empty string or a `null` value means the
    /// model has no id yet.
    pub(crate) fn id_of(&self, model: &M) -> Result<Option<String>, EncodeError> {
        let value = self
            .primary
            .ops
            .read(model)
            .map_err(|source| EncodeError::Id {
                model: self.model,
                source,
            })?;
        match value {
            Value::Null => Ok(None),
            Value::String(s) if s.is_empty() => Ok(None),
            Value::String(s) => Ok(Some(s)),
            Value::Number(n) if n.is_i64() || n.is_u64() => Ok(Some(n.to_string())),
            other => Err(EncodeError::UnsupportedId {
                model: self.model,
                kind: kind_of(&other),
            }),
        }
    }

    /// Stores `id` in the primary field, as a string when the field takes
    /// one, otherwise as an integer.
    pub(crate) fn assign_id(&self, model: &mut M, id: &str) -> Result<(), DecodeError> {
        let ops = &self.primary.ops;
        let err = match ops.write(model, Value::String(id.to_string())) {
            Ok(()) => return Ok(()),
            Err(err) => err,
        };
        let number = id
            .parse::<i64>()
            .map(Value::from)
            .or_else(|_| id.parse::<u64>().map(Value::from));
        let reason = match number {
            Ok(value) => match ops.write(model, value) {
                Ok(()) => return Ok(()),
                Err(err) => err.to_string(),
            },
            Err(_) => err.to_string(),
        };
        Err(DecodeError::InvalidId {
            resource_type: self.primary.resource_type.clone(),
            id: id.to_string(),
            reason,
        })
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a float",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn build<M: Model>() -> Result<Descriptor<M>, SchemaError> {
    let model = type_name::<M>();
    let mut decl = Declaration::<M>::new();
    M::declare(&mut decl);
    let Declaration { fields, hooks } = decl;

    let mut primary: Option<PrimaryField<M>> = None;
    let mut attributes = Vec::new();
    let mut relationships = Vec::new();
    let mut keys = HashSet::new();

    for FieldDecl { name, tag, slot } in fields {
        let parsed = Tag::parse(name, tag)?;
        match (parsed, slot) {
            (Tag::Primary { resource_type }, Slot::Value(ops)) => {
                if let Some(first) = &primary {
                    return Err(SchemaError::DuplicatePrimary {
                        model,
                        first: first.name.to_string(),
                        second: name.to_string(),
                    });
                }
                primary = Some(PrimaryField {
                    name,
                    resource_type,
                    ops,
                });
            }
            (Tag::Attribute { key, omit_empty }, Slot::Value(ops)) => {
                claim(&mut keys, model, &key)?;
                attributes.push(AttributeField {
                    name,
                    key,
                    omit_empty,
                    ops,
                });
            }
            (
                Tag::Relationship {
                    key,
                    mode,
                    omit_empty,
                },
                Slot::Relation(ops),
            ) => {
                claim(&mut keys, model, &key)?;
                relationships.push(RelationshipField {
                    name,
                    key,
                    mode,
                    omit_empty,
                    ops,
                });
            }
            (parsed, slot) => {
                return Err(SchemaError::RoleMismatch {
                    model,
                    field: name.to_string(),
                    role: parsed.role(),
                    slot: match slot {
                        Slot::Value(_) => "value",
                        Slot::Relation(_) => "relation",
                    },
                })
            }
        }
    }

    let primary = primary.ok_or(SchemaError::MissingPrimary { model })?;

    for rel in &relationships {
        rel.ops
            .check_target()
            .map_err(|source| SchemaError::Relationship {
                model,
                field: rel.name.to_string(),
                source: Box::new(source),
            })?;
    }

    Ok(Descriptor {
        model,
        primary,
        attributes,
        relationships,
        hooks,
    })
}

fn claim(keys: &mut HashSet<String>, model: &'static str, key: &str) -> Result<(), SchemaError> {
    if keys.insert(key.to_string()) {
        Ok(())
    } else {
        Err(SchemaError::DuplicateKey {
            model,
            key: key.to_string(),
        })
    }
}

type Cache = RwLock<HashMap<TypeId, Entry>>;

static CACHE: OnceLock<Cache> = OnceLock::new();

type Entry = Arc<dyn Any + Send + Sync>;

thread_local! {
    static RESOLVING: RefCell<HashSet<TypeId>> = RefCell::new(HashSet::new());
    // Built during the current outermost resolution, not yet published.
    static PENDING: RefCell<HashMap<TypeId, Entry>> = RefCell::new(HashMap::new());
}

fn cache() -> &'static Cache {
    CACHE.get_or_init(Default::default)
}

/// Marks a type as in resolution on this thread until dropped.
struct Resolving(TypeId);

impl Resolving {
    fn enter(id: TypeId) -> Self {
        RESOLVING.with(|set| set.borrow_mut().insert(id));
        Resolving(id)
    }
}

impl Drop for Resolving {
    fn drop(&mut self) {
        RESOLVING.with(|set| set.borrow_mut().remove(&self.0));
    }
}

fn cached<M: Model>() -> Option<Arc<Descriptor<M>>> {
    let id = TypeId::of::<M>();
    let entry = PENDING.with(|pending| pending.borrow().get(&id).cloned()).or_else(|| {
        let cache = cache().read().unwrap_or_else(PoisonError::into_inner);
        cache.get(&id).cloned()
    })?;
    entry.downcast::<Descriptor<M>>().ok()
}

/// Returns the descriptor of `M`, building and caching it on first use.
///
/// Resolution is deterministic: a type that fails once fails the same way
/// every time, and is never cached. Types resolved along the way are only
/// published once the outermost resolution succeeds, so the result does
/// not depend on which type of a recursive group is resolved first.
pub fn resolve<M: Model>() -> Result<Arc<Descriptor<M>>, SchemaError> {
    let id = TypeId::of::<M>();
    let outermost = RESOLVING.with(|set| set.borrow().is_empty());
    if outermost {
        PENDING.with(|pending| pending.borrow_mut().clear());
    }
    if let Some(found) = cached::<M>() {
        return Ok(found);
    }

    let built = {
        let _resolving = Resolving::enter(id);
        build::<M>()
    };
    let built = match built {
        Ok(built) => Arc::new(built),
        Err(err) => {
            if outermost {
                PENDING.with(|pending| pending.borrow_mut().clear());
            }
            return Err(err);
        }
    };
    debug!(
        model = built.model,
        resource_type = %built.primary.resource_type,
        attributes = built.attributes.len(),
        relationships = built.relationships.len(),
        hooks = !built.hooks.is_empty(),
        "resolved descriptor"
    );

    if !outermost {
        PENDING.with(|pending| pending.borrow_mut().insert(id, built.clone() as Entry));
        return Ok(built);
    }

    let pending = PENDING.with(|pending| std::mem::take(&mut *pending.borrow_mut()));
    let mut cache = cache().write().unwrap_or_else(PoisonError::into_inner);
    for (nested, entry) in pending {
        cache.entry(nested).or_insert(entry);
    }
    let entry = cache
        .entry(id)
        .or_insert_with(|| built.clone() as Entry)
        .clone();
    Ok(entry.downcast::<Descriptor<M>>().unwrap_or(built))
}

/// Validates that `R` resolves. A type already in resolution further up
/// this thread's stack counts as valid, so recursive models terminate.
pub(crate) fn check<R: Model>() -> Result<(), SchemaError> {
    let id = TypeId::of::<R>();
    if RESOLVING.with(|set| set.borrow().contains(&id)) {
        trace!(model = type_name::<R>(), "recursive reference, already resolving");
        return Ok(());
    }
    resolve::<R>().map(|_| ())
}
