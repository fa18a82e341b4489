//! Optional capability hooks.
//!
//! A model contributes `links` and `meta` to its resources by implementing
//! any of the four traits below and opting in from [`Model::declare`]:
//!
//! ```
//! use jsonapi::{Declaration, Linkable, Links, Model};
//!
//! #[derive(Default)]
//! struct Blog {
//!     id: u64,
//! }
//!
//! impl Linkable for Blog {
//!     fn links(&self) -> Links {
//!         Links::from([("self".to_string(), format!("https://example.com/blogs/{}", self.id).into())])
//!     }
//! }
//!
//! impl Model for Blog {
//!     fn declare(d: &mut Declaration<Self>) {
//!         d.field("id", "primary,blogs", |b| &b.id, |b| &mut b.id);
//!         d.linkable();
//!     }
//! }
//! ```
//!
//! [`Model::declare`]: crate::Model::declare

pub use crate::document::{Links, Meta};

/// Resource-level `links`.
pub trait Linkable {
    fn links(&self) -> Links;
}

/// Resource-level `meta`.
pub trait Metable {
    fn meta(&self) -> Meta;
}

/// `links` of a named relationship. `None` attaches nothing.
pub trait RelationshipLinkable {
    fn relationship_links(&self, relation: &str) -> Option<Links>;
}

/// `meta` of a named relationship. `None` attaches nothing.
pub trait RelationshipMetable {
    fn relationship_meta(&self, relation: &str) -> Option<Meta>;
}

/// The hooks one model type opted into.
///
/// Results are never cached: each call runs the hook again.
pub struct Hooks<M> {
    pub(crate) links: Option<fn(&M) -> Links>,
    pub(crate) meta: Option<fn(&M) -> Meta>,
    pub(crate) relationship_links: Option<fn(&M, &str) -> Option<Links>>,
    pub(crate) relationship_meta: Option<fn(&M, &str) -> Option<Meta>>,
}

impl<M> Default for Hooks<M> {
    fn default() -> Self {
        Self {
            links: None,
            meta: None,
            relationship_links: None,
            relationship_meta: None,
        }
    }
}

impl<M> Hooks<M> {
    pub fn links(&self, model: &M) -> Option<Links> {
        self.links.map(|hook| hook(model))
    }

    pub fn meta(&self, model: &M) -> Option<Meta> {
        self.meta.map(|hook| hook(model))
    }

    pub fn relationship_links(&self, model: &M, relation: &str) -> Option<Links> {
        self.relationship_links.and_then(|hook| hook(model, relation))
    }

    pub fn relationship_meta(&self, model: &M, relation: &str) -> Option<Meta> {
        self.relationship_meta.and_then(|hook| hook(model, relation))
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.links.is_none()
            && self.meta.is_none()
            && self.relationship_links.is_none()
            && self.relationship_meta.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Link;
    use serde_json::json;

    struct Widget {
        id: u32,
    }

    impl Linkable for Widget {
        fn links(&self) -> Links {
            Links::from([("self".to_string(), Link::from(format!("/widgets/{}", self.id)))])
        }
    }

    impl RelationshipMetable for Widget {
        fn relationship_meta(&self, relation: &str) -> Option<Meta> {
            match relation {
                "owner" => json!({"count": self.id}).as_object().cloned(),
                _ => None,
            }
        }
    }

    #[test]
    fn test_absent_hooks_yield_nothing() {
        let hooks: Hooks<Widget> = Hooks::default();
        let widget = Widget { id: 1 };
        assert!(hooks.is_empty());
        assert!(hooks.links(&widget).is_none());
        assert!(hooks.meta(&widget).is_none());
        assert!(hooks.relationship_links(&widget, "owner").is_none());
        assert!(hooks.relationship_meta(&widget, "owner").is_none());
    }

    #[test]
    fn test_registered_hooks_run_per_call() {
        let hooks = Hooks::<Widget> {
            links: Some(<Widget as Linkable>::links),
            relationship_meta: Some(<Widget as RelationshipMetable>::relationship_meta),
            ..Hooks::default()
        };
        let widget = Widget { id: 7 };
        let links = hooks.links(&widget).unwrap();
        assert_eq!(links["self"], Link::from("/widgets/7"));
        assert_eq!(
            hooks.relationship_meta(&widget, "owner").unwrap()["count"],
            json!(7)
        );
        assert!(hooks.relationship_meta(&widget, "tags").is_none());
        assert!(hooks.meta(&widget).is_none());
    }
}
