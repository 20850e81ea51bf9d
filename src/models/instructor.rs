use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use super::hex_ids;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instructor {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    #[serde(default)]
    pub image: String,
    pub description: String,
    /// Years this instructor taught.
    #[serde(default)]
    pub years: Vec<i32>,
    #[serde(default)]
    pub internships: Vec<ObjectId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstructorView {
    pub id: String,
    pub name: String,
    pub image: String,
    pub description: String,
    pub years: Vec<i32>,
    pub internships: Vec<String>,
}

impl From<Instructor> for InstructorView {
    fn from(i: Instructor) -> Self {
        Self {
            id: i.id.map(|id| id.to_hex()).unwrap_or_default(),
            name: i.name,
            image: i.image,
            description: i.description,
            years: i.years,
            internships: hex_ids(&i.internships),
        }
    }
}
