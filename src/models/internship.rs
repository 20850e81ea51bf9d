use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// An internship track. Projects and users point at it by id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Internship {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    /// Graduation years the track ran in.
    #[serde(default)]
    pub years: Vec<i32>,
    #[serde(default)]
    pub instructor: Option<ObjectId>,
    pub description: String,
    /// Display colors used by the frontend, e.g. `["#112233", "#ffffff"]`.
    #[serde(default)]
    pub colors: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InternshipView {
    pub id: String,
    pub name: String,
    pub years: Vec<i32>,
    pub instructor: Option<String>,
    pub description: String,
    pub colors: Vec<String>,
}

impl From<Internship> for InternshipView {
    fn from(i: Internship) -> Self {
        Self {
            id: i.id.map(|id| id.to_hex()).unwrap_or_default(),
            name: i.name,
            years: i.years,
            instructor: i.instructor.map(|id| id.to_hex()),
            description: i.description,
            colors: i.colors,
        }
    }
}
