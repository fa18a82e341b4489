#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use jsonapi::{
    Declaration, Link, Linkable, Links, Meta, Metable, Model, RelationshipLinkable,
    RelationshipMetable,
};
use serde_json::json;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Blog {
    pub id: u64,
    pub title: String,
    pub posts: Vec<Post>,
    pub current_post: Option<Box<Post>>,
    pub current_post_id: u64,
    pub created_at: DateTime<Utc>,
    pub view_count: u32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Post {
    pub id: u64,
    pub blog_id: u64,
    pub title: String,
    pub body: String,
    pub comments: Vec<Comment>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Comment {
    pub id: u64,
    pub post_id: u64,
    pub body: String,
}

impl Model for Blog {
    fn declare(d: &mut Declaration<Self>) {
        d.field("id", "primary,blogs", |b| &b.id, |b| &mut b.id)
            .field("title", "attr,title", |b| &b.title, |b| &mut b.title)
            .relation("posts", "relation,posts", |b| &b.posts, |b| &mut b.posts)
            .relation(
                "current_post",
                "relation,current_post",
                |b| &b.current_post,
                |b| &mut b.current_post,
            )
            .field(
                "current_post_id",
                "attr,current_post_id",
                |b| &b.current_post_id,
                |b| &mut b.current_post_id,
            )
            .field("created_at", "attr,created_at", |b| &b.created_at, |b| &mut b.created_at)
            .field("view_count", "attr,view_count", |b| &b.view_count, |b| &mut b.view_count)
            .linkable()
            .metable()
            .relationship_linkable()
            .relationship_metable();
    }
}

impl Model for Post {
    fn declare(d: &mut Declaration<Self>) {
        d.field("id", "primary,posts", |p| &p.id, |p| &mut p.id)
            .field("blog_id", "attr,blog_id", |p| &p.blog_id, |p| &mut p.blog_id)
            .field("title", "attr,title", |p| &p.title, |p| &mut p.title)
            .field("body", "attr,body", |p| &p.body, |p| &mut p.body)
            .relation("comments", "relation,comments", |p| &p.comments, |p| &mut p.comments);
    }
}

impl Model for Comment {
    fn declare(d: &mut Declaration<Self>) {
        d.field("id", "primary,comments", |c| &c.id, |c| &mut c.id)
            .field("post_id", "attr,post_id", |c| &c.post_id, |c| &mut c.post_id)
            .field("body", "attr,body", |c| &c.body, |c| &mut c.body);
    }
}

impl Linkable for Blog {
    fn links(&self) -> Links {
        Links::from([(
            "self".to_string(),
            Link::from(format!("https://example.com/blogs/{}", self.id)),
        )])
    }
}

impl Metable for Blog {
    fn meta(&self) -> Meta {
        object(json!({"detail": "extra details regarding the blog"}))
    }
}

impl RelationshipLinkable for Blog {
    fn relationship_links(&self, relation: &str) -> Option<Links> {
        let related = match relation {
            "posts" => format!("https://example.com/blogs/{}/posts", self.id),
            "current_post" => format!("https://example.com/blogs/{}/current_post", self.id),
            _ => return None,
        };
        Some(Links::from([("related".to_string(), Link::from(related))]))
    }
}

impl RelationshipMetable for Blog {
    fn relationship_meta(&self, relation: &str) -> Option<Meta> {
        match relation {
            "posts" => Some(object(json!({"detail": "posts meta information"}))),
            "current_post" => Some(object(json!({"detail": "current post meta information"}))),
            _ => None,
        }
    }
}

pub fn object(value: serde_json::Value) -> Meta {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("expected an object, got {other}"),
    }
}

pub fn comment(id: u64, post_id: u64) -> Comment {
    Comment {
        id,
        post_id,
        body: format!("comment {id}"),
    }
}

pub fn post(id: u64, blog_id: u64, comments: Vec<Comment>) -> Post {
    Post {
        id,
        blog_id,
        title: format!("post {id}"),
        body: format!("body of post {id}"),
        comments,
    }
}

/// A blog whose current post is also one of its posts, with comments on
/// both posts.
pub fn fixture_blog() -> Blog {
    let first = post(1, 5, vec![comment(1, 1), comment(2, 1)]);
    let second = post(2, 5, vec![comment(3, 2)]);
    Blog {
        id: 5,
        title: "Title 1".into(),
        posts: vec![first.clone(), second],
        current_post: Some(Box::new(first)),
        current_post_id: 1,
        created_at: Utc
            .with_ymd_and_hms(2016, 3, 14, 9, 26, 53)
            .single()
            .expect("valid timestamp"),
        view_count: 1000,
    }
}

/// Two resources that reference each other through `partner`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dancer {
    pub id: String,
    pub name: String,
    pub partner: Option<Box<Dancer>>,
}

impl Model for Dancer {
    fn declare(d: &mut Declaration<Self>) {
        d.field("id", "primary,dancers", |x| &x.id, |x| &mut x.id)
            .field("name", "attr,name", |x| &x.name, |x| &mut x.name)
            .relation("partner", "relation,partner", |x| &x.partner, |x| &mut x.partner);
    }
}

pub fn dancer(id: &str, partner: Option<Dancer>) -> Dancer {
    Dancer {
        id: id.to_string(),
        name: format!("dancer {id}"),
        partner: partner.map(Box::new),
    }
}
