use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use super::award::AwardView;
use super::hex_ids;

/// Represents a graduation project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    /// MongoDB document ID.
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    /// URL of the primary image.
    pub image: String,
    #[serde(default)]
    pub internship: Option<ObjectId>,
    pub description: String,
    #[serde(default)]
    pub short_description: String,
    /// Ordered list of auxiliary image URLs.
    #[serde(default)]
    pub gallery: Vec<String>,
    #[serde(default)]
    pub youtube: Option<String>,
    #[serde(default)]
    pub instructor: Option<ObjectId>,
    /// Mirrors the `memberships` collection, which is authoritative.
    #[serde(default)]
    pub members: Vec<ObjectId>,
    #[serde(default)]
    pub awards: Vec<ObjectId>,
    pub year: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    pub fn has_member(&self, user: ObjectId) -> bool {
        self.members.contains(&user)
    }
}

/// Join document mapping a user to the one project they belong to.
/// `user` carries a unique index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Membership {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user: ObjectId,
    pub project: ObjectId,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectView {
    pub id: String,
    pub name: String,
    pub image: String,
    pub internship: Option<String>,
    pub description: String,
    pub short_description: String,
    pub gallery: Vec<String>,
    pub youtube: Option<String>,
    pub instructor: Option<String>,
    pub members: Vec<String>,
    /// Awards are embedded rather than referenced.
    pub awards: Vec<AwardView>,
    pub year: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProjectView {
    pub fn new(p: Project, awards: Vec<AwardView>) -> Self {
        Self {
            id: p.id.map(|id| id.to_hex()).unwrap_or_default(),
            name: p.name,
            image: p.image,
            internship: p.internship.map(|id| id.to_hex()),
            description: p.description,
            short_description: p.short_description,
            gallery: p.gallery,
            youtube: p.youtube,
            instructor: p.instructor.map(|id| id.to_hex()),
            members: hex_ids(&p.members),
            awards,
            year: p.year,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}
