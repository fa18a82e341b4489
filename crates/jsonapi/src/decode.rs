//! Document to object graph.

use std::collections::{HashMap, HashSet};

use serde_json::Value;
use tracing::trace;

use crate::config::Config;
use crate::descriptor::{resolve, Descriptor};
use crate::document::{Document, PrimaryData, RelationshipData, ResourceIdentifier, ResourceObject};
use crate::error::DecodeError;
use crate::model::{Cardinality, Model};

type ResourceKey = (String, String);

/// Rebuilds models from one [`Document`].
///
/// A relationship target is decoded from the resource nested in its
/// linkage, if any, and otherwise looked up in `included` by
/// `(type, id)`. A target found in neither place, already being decoded
/// further up the walk, or lying beyond [`Config::max_include_depth`] is
/// decoded as a stub carrying only its id.
///
/// Every materialized target counts against
/// [`Config::max_materializations`], so densely cross-linked documents
/// cannot make the walk explode.
pub struct Decoder<'d> {
    config: &'d Config,
    document: &'d Document,
    index: HashMap<ResourceKey, usize>,
    in_flight: HashSet<ResourceKey>,
    depth: usize,
    materialized: usize,
}

impl<'d> Decoder<'d> {
    pub fn new(config: &'d Config, document: &'d Document) -> Self {
        let mut index = HashMap::new();
        for (i, resource) in document.included.iter().enumerate() {
            if let Some(id) = &resource.id {
                index
                    .entry((resource.resource_type.clone(), id.clone()))
                    .or_insert(i);
            }
        }
        Self {
            config,
            document,
            index,
            in_flight: HashSet::new(),
            depth: 0,
            materialized: 0,
        }
    }

    pub fn decode_one<M: Model>(mut self) -> Result<M, DecodeError> {
        let desc = resolve::<M>()?;
        let document = self.document;
        match &document.data {
            Some(PrimaryData::Single(resource)) => self.resource(&desc, resource),
            Some(PrimaryData::Many(_)) => Err(DecodeError::ExpectedSingle),
            None => Err(DecodeError::MissingData),
        }
    }

    pub fn decode_many<M: Model>(mut self) -> Result<Vec<M>, DecodeError> {
        let desc = resolve::<M>()?;
        let document = self.document;
        match &document.data {
            Some(PrimaryData::Many(resources)) => resources
                .iter()
                .enumerate()
                .map(|(index, resource)| {
                    self.resource(&desc, resource)
                        .map_err(|source| DecodeError::Element {
                            index,
                            source: Box::new(source),
                        })
                })
                .collect(),
            Some(PrimaryData::Single(_)) => Err(DecodeError::ExpectedCollection),
            None => Err(DecodeError::MissingData),
        }
    }

    fn resource<M: Model>(
        &mut self,
        desc: &Descriptor<M>,
        resource: &ResourceObject,
    ) -> Result<M, DecodeError> {
        if resource.resource_type != desc.primary.resource_type {
            return Err(DecodeError::TypeMismatch {
                expected: desc.primary.resource_type.clone(),
                found: resource.resource_type.clone(),
            });
        }

        let mut model = M::default();
        if let Some(id) = &resource.id {
            desc.assign_id(&mut model, id)?;
        }

        for attr in &desc.attributes {
            match resource.attributes.get(&attr.key) {
                None | Some(Value::Null) => {}
                Some(value) => {
                    attr.ops
                        .write(&mut model, value.clone())
                        .map_err(|source| DecodeError::Attribute {
                            key: attr.key.clone(),
                            source,
                        })?;
                }
            }
        }

        let key = resource
            .id
            .as_ref()
            .map(|id| (resource.resource_type.clone(), id.clone()));
        let entered = match &key {
            Some(key) => self.in_flight.insert(key.clone()),
            None => false,
        };
        let result = self.relationships(desc, resource, &mut model);
        if let (true, Some(key)) = (entered, &key) {
            self.in_flight.remove(key);
        }
        result.map(|()| model)
    }

    fn relationships<M: Model>(
        &mut self,
        desc: &Descriptor<M>,
        resource: &ResourceObject,
        model: &mut M,
    ) -> Result<(), DecodeError> {
        for rel in &desc.relationships {
            let Some(data) = resource
                .relationships
                .get(&rel.key)
                .and_then(|obj| obj.data.as_ref())
            else {
                continue;
            };
            let identifiers: Vec<&ResourceIdentifier> = match (rel.ops.cardinality(), data) {
                (Cardinality::ToOne, RelationshipData::ToOne(one)) => one.iter().collect(),
                (Cardinality::ToMany, RelationshipData::ToMany(many)) => many.iter().collect(),
                (expected, _) => {
                    return Err(DecodeError::Cardinality {
                        key: rel.key.clone(),
                        expected,
                    })
                }
            };
            rel.ops
                .materialize(model, &identifiers, self)
                .map_err(|source| match source {
                    DecodeError::Schema(_) => source,
                    source => DecodeError::Relationship {
                        key: rel.key.clone(),
                        source: Box::new(source),
                    },
                })?;
        }
        Ok(())
    }

    /// Builds the targets of one relationship, in identifier order.
    pub(crate) fn materialize<R: Model>(
        &mut self,
        identifiers: &[&ResourceIdentifier],
        cardinality: Cardinality,
    ) -> Result<Vec<R>, DecodeError> {
        let desc = resolve::<R>()?;
        identifiers
            .iter()
            .enumerate()
            .map(|(position, identifier)| {
                let position = match cardinality {
                    Cardinality::ToOne => None,
                    Cardinality::ToMany => Some(position),
                };
                self.target(&desc, identifier, position)
            })
            .collect()
    }

    fn target<R: Model>(
        &mut self,
        desc: &Descriptor<R>,
        identifier: &ResourceIdentifier,
        position: Option<usize>,
    ) -> Result<R, DecodeError> {
        if identifier.resource_type != desc.primary.resource_type {
            return Err(DecodeError::TypeMismatch {
                expected: desc.primary.resource_type.clone(),
                found: identifier.resource_type.clone(),
            });
        }

        let key = (identifier.resource_type.clone(), identifier.id.clone());
        if self.in_flight.contains(&key) || self.depth >= self.config.max_include_depth {
            return self.stub(desc, identifier);
        }

        if let Some(resource) = &identifier.embedded {
            return self
                .nested(desc, resource)
                .map_err(|source| DecodeError::Embedded {
                    index: position,
                    source: Box::new(source),
                });
        }

        let Some(index) = self.index.get(&key).copied() else {
            return self.stub(desc, identifier);
        };
        let document = self.document;
        self.nested(desc, &document.included[index])
            .map_err(|source| DecodeError::Included {
                index,
                source: Box::new(source),
            })
    }

    fn nested<R: Model>(
        &mut self,
        desc: &Descriptor<R>,
        resource: &ResourceObject,
    ) -> Result<R, DecodeError> {
        if self.materialized >= self.config.max_materializations {
            return Err(DecodeError::MaterializationLimit {
                limit: self.config.max_materializations,
            });
        }
        self.materialized += 1;
        self.depth += 1;
        let result = self.resource(desc, resource);
        self.depth -= 1;
        result
    }

    fn stub<R: Model>(
        &self,
        desc: &Descriptor<R>,
        identifier: &ResourceIdentifier,
    ) -> Result<R, DecodeError> {
        trace!(
            resource_type = %identifier.resource_type,
            id = %identifier.id,
            "decoding stub"
        );
        let mut stub = R::default();
        desc.assign_id(&mut stub, &identifier.id)?;
        Ok(stub)
    }
}
