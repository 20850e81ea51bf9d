use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Award {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub image: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AwardView {
    pub id: String,
    pub name: String,
    pub image: String,
    pub description: String,
}

impl From<Award> for AwardView {
    fn from(a: Award) -> Self {
        Self {
            id: a.id.map(|id| id.to_hex()).unwrap_or_default(),
            name: a.name,
            image: a.image,
            description: a.description,
        }
    }
}
