//! Wire types of the document format.
//!
//! ```text
//! { "data": <resource> | [<resource>...],
//!   "included": [<resource>...],
//!   "links": {...}, "meta": {...} }
//! ```

use std::fmt;
use std::io::{Read, Write};
use std::marker::PhantomData;

use indexmap::IndexMap;
use serde::de::value::MapAccessDeserializer;
use serde::de::{self, MapAccess, SeqAccess, Visitor};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::{DecodeError, EncodeError};

/// Non-standard meta-information.
pub type Meta = Map<String, Value>;

/// Named links, in insertion order.
pub type Links = IndexMap<String, Link>;

/// A link: either a bare URL or an object with `href` and `meta`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Link {
    Href(String),
    Object(LinkObject),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkObject {
    pub href: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

impl Link {
    pub fn href(&self) -> &str {
        match self {
            Link::Href(href) => href,
            Link::Object(obj) => &obj.href,
        }
    }
}

impl From<String> for Link {
    fn from(href: String) -> Self {
        Link::Href(href)
    }
}

impl From<&str> for Link {
    fn from(href: &str) -> Self {
        Link::Href(href.to_string())
    }
}

impl From<LinkObject> for Link {
    fn from(obj: LinkObject) -> Self {
        Link::Object(obj)
    }
}

/// The top-level envelope.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<PrimaryData>,
    #[serde(
        default,
        skip_serializing_if = "Vec::is_empty",
        deserialize_with = "resource_objects"
    )]
    pub included: Vec<ResourceObject>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Links>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

/// Primary data: one resource or a collection, never both.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PrimaryData {
    Single(Box<ResourceObject>),
    Many(Vec<ResourceObject>),
}

impl<'de> Deserialize<'de> for PrimaryData {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct PrimaryVisitor;

        impl<'de> Visitor<'de> for PrimaryVisitor {
            type Value = PrimaryData;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a resource object or an array of resource objects")
            }

            fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<PrimaryData, A::Error> {
                let resource = ResourceObject::deserialize(MapAccessDeserializer::new(map))?;
                Ok(PrimaryData::Single(Box::new(resource)))
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<PrimaryData, A::Error> {
                let mut resources: Vec<ResourceObject> = Vec::new();
                while let Some(Object(resource)) = seq.next_element::<Object<ResourceObject>>()? {
                    resources.push(resource);
                }
                Ok(PrimaryData::Many(resources))
            }
        }

        deserializer.deserialize_any(PrimaryVisitor)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceObject {
    #[serde(rename = "type")]
    pub resource_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub attributes: Map<String, Value>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub relationships: IndexMap<String, RelationshipObject>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Links>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelationshipObject {
    /// `None` when the member is absent, which is distinct from `null`.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present"
    )]
    pub data: Option<RelationshipData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Links>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

/// Relationship linkage. An empty to-one is `null`, an empty to-many `[]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RelationshipData {
    ToMany(Vec<ResourceIdentifier>),
    ToOne(Option<ResourceIdentifier>),
}

impl RelationshipData {
    pub fn identifiers(&self) -> Vec<&ResourceIdentifier> {
        match self {
            RelationshipData::ToOne(one) => one.iter().collect(),
            RelationshipData::ToMany(many) => many.iter().collect(),
        }
    }
}

impl<'de> Deserialize<'de> for RelationshipData {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct LinkageVisitor;

        impl<'de> Visitor<'de> for LinkageVisitor {
            type Value = RelationshipData;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("null, a resource identifier or an array of resource identifiers")
            }

            fn visit_unit<E: de::Error>(self) -> Result<RelationshipData, E> {
                Ok(RelationshipData::ToOne(None))
            }

            fn visit_none<E: de::Error>(self) -> Result<RelationshipData, E> {
                Ok(RelationshipData::ToOne(None))
            }

            fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<RelationshipData, A::Error> {
                let identifier = ResourceIdentifier::deserialize(MapAccessDeserializer::new(map))?;
                Ok(RelationshipData::ToOne(Some(identifier)))
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<RelationshipData, A::Error> {
                let mut identifiers = Vec::new();
                while let Some(identifier) = seq.next_element::<ResourceIdentifier>()? {
                    identifiers.push(identifier);
                }
                Ok(RelationshipData::ToMany(identifiers))
            }
        }

        deserializer.deserialize_any(LinkageVisitor)
    }
}

fn present<'de, D>(deserializer: D) -> Result<Option<RelationshipData>, D::Error>
where
    D: Deserializer<'de>,
{
    RelationshipData::deserialize(deserializer).map(Some)
}

/// One element of relationship linkage.
///
/// Usually just `{type, id}`. When targets are nested in relationship data
/// the whole target travels along in `embedded`, and is written in place
/// of the bare identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceIdentifier {
    pub resource_type: String,
    pub id: String,
    pub embedded: Option<Box<ResourceObject>>,
}

impl ResourceIdentifier {
    pub fn new(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            id: id.into(),
            embedded: None,
        }
    }
}

impl Serialize for ResourceIdentifier {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if let Some(resource) = &self.embedded {
            return resource.serialize(serializer);
        }
        let mut state = serializer.serialize_struct("ResourceIdentifier", 2)?;
        state.serialize_field("type", &self.resource_type)?;
        state.serialize_field("id", &self.id)?;
        state.end()
    }
}

impl<'de> Deserialize<'de> for ResourceIdentifier {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let Object(resource) = Object::<ResourceObject>::deserialize(deserializer)?;
        let id = resource
            .id
            .clone()
            .ok_or_else(|| <D::Error as de::Error>::missing_field("id"))?;
        if resource.attributes.is_empty()
            && resource.relationships.is_empty()
            && resource.links.is_none()
        {
            return Ok(ResourceIdentifier::new(resource.resource_type, id));
        }
        Ok(ResourceIdentifier {
            resource_type: resource.resource_type.clone(),
            id,
            embedded: Some(Box::new(resource)),
        })
    }
}

/// Deserializes `T` from a JSON object only. Derived struct impls also
/// take the positional array form, which is never valid in a document.
struct Object<T>(T);

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Object<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer
            .deserialize_map(ObjectVisitor(PhantomData))
            .map(Object)
    }
}

struct ObjectVisitor<T>(PhantomData<T>);

impl<'de, T: Deserialize<'de>> Visitor<'de> for ObjectVisitor<T> {
    type Value = T;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON object")
    }

    fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<T, A::Error> {
        T::deserialize(MapAccessDeserializer::new(map))
    }
}

fn resource_objects<'de, D>(deserializer: D) -> Result<Vec<ResourceObject>, D::Error>
where
    D: Deserializer<'de>,
{
    let objects = Vec::<Object<ResourceObject>>::deserialize(deserializer)?;
    Ok(objects.into_iter().map(|Object(resource)| resource).collect())
}

impl ResourceObject {
    /// The `{type, id}` pair naming this resource, if it has an id.
    pub fn identifier(&self) -> Option<ResourceIdentifier> {
        self.id
            .as_ref()
            .map(|id| ResourceIdentifier::new(self.resource_type.clone(), id.clone()))
    }
}

impl Document {
    pub fn single(resource: ResourceObject) -> Self {
        Self {
            data: Some(PrimaryData::Single(Box::new(resource))),
            ..Self::default()
        }
    }

    pub fn collection(resources: Vec<ResourceObject>) -> Self {
        Self {
            data: Some(PrimaryData::Many(resources)),
            ..Self::default()
        }
    }

    pub fn with_links(mut self, links: Links) -> Self {
        self.links = Some(links);
        self
    }

    pub fn with_meta(mut self, meta: Meta) -> Self {
        self.meta = Some(meta);
        self
    }

    pub fn is_collection(&self) -> bool {
        matches!(self.data, Some(PrimaryData::Many(_)))
    }

    /// Primary resources in document order.
    pub fn primary(&self) -> Vec<&ResourceObject> {
        match &self.data {
            Some(PrimaryData::Single(resource)) => vec![resource.as_ref()],
            Some(PrimaryData::Many(resources)) => resources.iter().collect(),
            None => Vec::new(),
        }
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut deserializer = serde_json::Deserializer::from_slice(bytes);
        let Object(document) = Object::<Document>::deserialize(&mut deserializer)?;
        deserializer.end()?;
        Ok(document)
    }

    /// Reads a whole document. The reader is drained before parsing.
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self, DecodeError> {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        Self::from_slice(&buf)
    }

    pub fn to_vec(&self) -> Result<Vec<u8>, EncodeError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Serializes in memory, then writes the document in one piece.
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<(), EncodeError> {
        let bytes = self.to_vec()?;
        writer.write_all(&bytes)?;
        Ok(())
    }
}

impl std::str::FromStr for Document {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_slice(s.as_bytes())
    }
}
