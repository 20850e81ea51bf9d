use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use super::hex_ids;

/// One graduation cycle. At most one yearbook is `active` at a time; the
/// active one decides which students may sign in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Yearbook {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub year: i32,
    pub active: bool,
    /// Closes non-admin login while set.
    #[serde(default)]
    pub user_block: bool,
    #[serde(default)]
    pub excluded_users: Vec<ObjectId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YearbookView {
    pub id: String,
    pub year: i32,
    pub active: bool,
    pub user_block: bool,
    pub excluded_users: Vec<String>,
}

impl From<Yearbook> for YearbookView {
    fn from(y: Yearbook) -> Self {
        Self {
            id: y.id.map(|id| id.to_hex()).unwrap_or_default(),
            year: y.year,
            active: y.active,
            user_block: y.user_block,
            excluded_users: hex_ids(&y.excluded_users),
        }
    }
}
