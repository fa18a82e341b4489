//! Object graph to document.

use std::collections::HashSet;

use indexmap::IndexMap;
use serde_json::{Map, Value};
use tracing::trace;

use crate::config::Config;
use crate::descriptor::{resolve, Descriptor};
use crate::document::{
    Document, PrimaryData, RelationshipData, RelationshipObject, ResourceIdentifier,
    ResourceObject,
};
use crate::error::EncodeError;
use crate::model::{Cardinality, Model};
use crate::tag::EmbedMode;

type ResourceKey = (String, String);

/// Walks one object graph into a [`Document`].
///
/// Every embedded target is recorded under its `(type, id)` before its own
/// relationships are walked, so a resource reachable along several paths,
/// or along a cycle, is encoded once.
///
/// With [`Config::nest_embedded`] targets are written inside relationship
/// data instead. A target already being encoded higher up the walk is then
/// written as a bare identifier.
pub struct Encoder<'c> {
    config: &'c Config,
    primary: HashSet<ResourceKey>,
    // `None` marks a resource whose encoding is still in progress.
    included: IndexMap<ResourceKey, Option<ResourceObject>>,
    path: HashSet<ResourceKey>,
}

impl<'c> Encoder<'c> {
    pub fn new(config: &'c Config) -> Self {
        Self {
            config,
            primary: HashSet::new(),
            included: IndexMap::new(),
            path: HashSet::new(),
        }
    }

    pub fn encode_one<M: Model>(mut self, model: &M) -> Result<Document, EncodeError> {
        let desc = resolve::<M>()?;
        self.claim_primary(&desc, model)?;
        let resource = self.resource(&desc, model)?;
        Ok(Document {
            data: Some(PrimaryData::Single(Box::new(resource))),
            included: self.finish(),
            ..Document::default()
        })
    }

    pub fn encode_many<'m, M, I>(mut self, models: I) -> Result<Document, EncodeError>
    where
        M: Model,
        I: IntoIterator<Item = &'m M>,
    {
        let desc = resolve::<M>()?;
        let models: Vec<&M> = models.into_iter().collect();
        for model in &models {
            self.claim_primary(&desc, model)?;
        }
        let data = models
            .iter()
            .map(|model| self.resource(&desc, model))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Document {
            data: Some(PrimaryData::Many(data)),
            included: self.finish(),
            ..Document::default()
        })
    }

    fn claim_primary<M: Model>(&mut self, desc: &Descriptor<M>, model: &M) -> Result<(), EncodeError> {
        if let Some(id) = desc.id_of(model)? {
            self.primary.insert((desc.primary.resource_type.clone(), id));
        }
        Ok(())
    }

    fn resource<M: Model>(
        &mut self,
        desc: &Descriptor<M>,
        model: &M,
    ) -> Result<ResourceObject, EncodeError> {
        let id = desc.id_of(model)?;

        let mut attributes = Map::new();
        for attr in &desc.attributes {
            let value = attr
                .ops
                .read(model)
                .map_err(|source| EncodeError::Attribute {
                    model: desc.model,
                    key: attr.key.clone(),
                    source,
                })?;
            if attr.omit_empty && is_empty(&value) {
                trace!(model = desc.model, field = attr.name, "omitting empty attribute");
                continue;
            }
            attributes.insert(attr.key.clone(), value);
        }

        let key = id
            .as_ref()
            .map(|id| (desc.primary.resource_type.clone(), id.clone()));
        let entered = match &key {
            Some(key) => self.path.insert(key.clone()),
            None => false,
        };
        let relationships = self.relationships(desc, model);
        if let (true, Some(key)) = (entered, &key) {
            self.path.remove(key);
        }
        let relationships = relationships?;

        Ok(ResourceObject {
            resource_type: desc.primary.resource_type.clone(),
            id,
            attributes,
            relationships,
            links: desc.hooks.links(model),
            meta: desc.hooks.meta(model),
        })
    }

    fn relationships<M: Model>(
        &mut self,
        desc: &Descriptor<M>,
        model: &M,
    ) -> Result<IndexMap<String, RelationshipObject>, EncodeError> {
        let mut relationships = IndexMap::new();
        for rel in &desc.relationships {
            let identifiers = rel.ops.identify(model, self, &rel.key, rel.mode)?;
            if rel.omit_empty && identifiers.is_empty() {
                continue;
            }
            let data = match rel.ops.cardinality() {
                Cardinality::ToOne => RelationshipData::ToOne(identifiers.into_iter().next()),
                Cardinality::ToMany => RelationshipData::ToMany(identifiers),
            };
            relationships.insert(
                rel.key.clone(),
                RelationshipObject {
                    data: Some(data),
                    links: desc.hooks.relationship_links(model, &rel.key),
                    meta: desc.hooks.relationship_meta(model, &rel.key),
                },
            );
        }
        Ok(relationships)
    }

    /// Identifies the targets of one relationship of an `owner` model and,
    /// when embedding, nests them or queues them for `included`.
    pub(crate) fn identify<R: Model>(
        &mut self,
        owner: &'static str,
        key: &str,
        targets: Vec<&R>,
        mode: EmbedMode,
    ) -> Result<Vec<ResourceIdentifier>, EncodeError> {
        let desc = resolve::<R>()?;
        let mut identifiers = Vec::with_capacity(targets.len());
        for target in targets {
            let id = desc
                .id_of(target)?
                .ok_or_else(|| EncodeError::UnidentifiedTarget {
                    model: owner,
                    key: key.to_string(),
                    resource_type: desc.primary.resource_type.clone(),
                })?;
            let identifier = match mode {
                EmbedMode::Embed if self.config.nest_embedded => self.nest(&desc, target, id)?,
                EmbedMode::Embed if self.config.sideload => {
                    self.include(&desc, target, &id)?;
                    ResourceIdentifier::new(desc.resource_type(), id)
                }
                _ => ResourceIdentifier::new(desc.resource_type(), id),
            };
            identifiers.push(identifier);
        }
        Ok(identifiers)
    }

    fn nest<R: Model>(
        &mut self,
        desc: &Descriptor<R>,
        target: &R,
        id: String,
    ) -> Result<ResourceIdentifier, EncodeError> {
        let key = (desc.primary.resource_type.clone(), id);
        if self.path.contains(&key) {
            trace!(resource_type = %key.0, id = %key.1, "back reference, nesting identifier only");
            return Ok(ResourceIdentifier::new(key.0, key.1));
        }
        let resource = self.resource(desc, target)?;
        Ok(ResourceIdentifier {
            resource_type: key.0,
            id: key.1,
            embedded: Some(Box::new(resource)),
        })
    }

    fn include<R: Model>(
        &mut self,
        desc: &Descriptor<R>,
        target: &R,
        id: &str,
    ) -> Result<(), EncodeError> {
        let key = (desc.primary.resource_type.clone(), id.to_string());
        if self.primary.contains(&key) || self.included.contains_key(&key) {
            return Ok(());
        }
        trace!(resource_type = %key.0, id, "including resource");
        let (index, _) = self.included.insert_full(key, None);
        let resource = self.resource(desc, target)?;
        if let Some((_, slot)) = self.included.get_index_mut(index) {
            *slot = Some(resource);
        }
        Ok(())
    }

    fn finish(self) -> Vec<ResourceObject> {
        self.included.into_values().flatten().collect()
    }
}

/// Whether an `omitempty` attribute is left out.
fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Declaration;
    use serde_json::json;

    #[derive(Default)]
    struct Node {
        id: Option<u32>,
        label: String,
        weight: u32,
        next: Option<Box<Node>>,
        peers: Vec<Node>,
    }

    impl Model for Node {
        fn declare(d: &mut Declaration<Self>) {
            d.field("id", "primary,nodes", |n| &n.id, |n| &mut n.id)
                .field("label", "attr,label", |n| &n.label, |n| &mut n.label)
                .field("weight", "attr,weight,omitempty", |n| &n.weight, |n| &mut n.weight)
                .relation("next", "relation,next", |n| &n.next, |n| &mut n.next)
                .relation("peers", "relation,peers,ref,omitempty", |n| &n.peers, |n| &mut n.peers);
        }
    }

    fn node(id: u32) -> Node {
        Node {
            id: Some(id),
            label: format!("n{id}"),
            ..Default::default()
        }
    }

    #[test]
    fn test_is_empty() {
        for value in [json!(null), json!(""), json!(0), json!(0.0), json!(false), json!([]), json!({})] {
            assert!(is_empty(&value), "{value}");
        }
        for value in [json!(" "), json!(1), json!(true), json!([0]), json!({"a": null})] {
            assert!(!is_empty(&value), "{value}");
        }
    }

    #[test]
    fn test_encode_single() {
        let config = Config::default();
        let doc = Encoder::new(&config).encode_one(&node(1)).unwrap();
        assert_eq!(
            serde_json::to_value(&doc).unwrap(),
            json!({
                "data": {
                    "type": "nodes",
                    "id": "1",
                    "attributes": {"label": "n1"},
                    "relationships": {"next": {"data": null}}
                }
            })
        );
    }

    #[test]
    fn test_embedded_chain_is_included_in_discovery_order() {
        let mut root = node(1);
        let mut second = node(2);
        second.next = Some(Box::new(node(3)));
        root.next = Some(Box::new(second));
        root.peers = vec![node(9)];

        let config = Config::default();
        let doc = Encoder::new(&config).encode_one(&root).unwrap();
        let included: Vec<_> = doc.included.iter().map(|r| r.id.as_deref().unwrap()).collect();
        assert_eq!(included, ["2", "3"]);
        let peers = &doc.primary()[0].relationships["peers"];
        assert_eq!(
            peers.data,
            Some(RelationshipData::ToMany(vec![ResourceIdentifier::new("nodes", "9")]))
        );
    }

    #[test]
    fn test_primary_is_never_included() {
        let mut first = node(1);
        first.next = Some(Box::new(node(2)));
        let second = node(2);

        let config = Config::default();
        let doc = Encoder::new(&config).encode_many([&first, &second]).unwrap();
        assert!(doc.is_collection());
        assert!(doc.included.is_empty());
    }

    #[test]
    fn test_sideload_off_keeps_identifiers() {
        let mut root = node(1);
        root.next = Some(Box::new(node(2)));

        let config = Config::new().sideload(false);
        let doc = Encoder::new(&config).encode_one(&root).unwrap();
        assert!(doc.included.is_empty());
        assert_eq!(
            doc.primary()[0].relationships["next"].data,
            Some(RelationshipData::ToOne(Some(ResourceIdentifier::new("nodes", "2"))))
        );
    }

    #[test]
    fn test_unidentified_target() {
        let mut root = node(1);
        root.next = Some(Box::new(Node::default()));

        let config = Config::default();
        let err = Encoder::new(&config).encode_one(&root).unwrap_err();
        assert!(matches!(
            err,
            EncodeError::UnidentifiedTarget { ref key, ref resource_type, .. }
                if key == "next" && resource_type == "nodes"
        ));
    }

    #[test]
    fn test_nest_embedded_writes_targets_in_place() {
        let mut root = node(1);
        let mut second = node(2);
        second.next = Some(Box::new(node(3)));
        root.next = Some(Box::new(second));
        root.peers = vec![node(9)];

        let config = Config::new().nest_embedded(true);
        let doc = Encoder::new(&config).encode_one(&root).unwrap();
        assert!(doc.included.is_empty());
        assert_eq!(
            serde_json::to_value(&doc).unwrap()["data"]["relationships"],
            json!({
                "next": {"data": {
                    "type": "nodes",
                    "id": "2",
                    "attributes": {"label": "n2"},
                    "relationships": {"next": {"data": {
                        "type": "nodes",
                        "id": "3",
                        "attributes": {"label": "n3"},
                        "relationships": {"next": {"data": null}}
                    }}}
                }},
                "peers": {"data": [{"type": "nodes", "id": "9"}]}
            })
        );
    }

    #[test]
    fn test_nested_back_reference_is_an_identifier() {
        let mut second = node(2);
        second.next = Some(Box::new(node(1)));
        let mut root = node(1);
        root.next = Some(Box::new(second));

        let config = Config::new().nest_embedded(true);
        let doc = Encoder::new(&config).encode_one(&root).unwrap();
        let next = doc.primary()[0].relationships["next"].data.clone().unwrap();
        let RelationshipData::ToOne(Some(second)) = next else {
            panic!("expected a to-one target");
        };
        let nested = second.embedded.expect("second node is nested");
        assert_eq!(
            nested.relationships["next"].data,
            Some(RelationshipData::ToOne(Some(ResourceIdentifier::new("nodes", "1"))))
        );
    }
}
