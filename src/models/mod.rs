pub mod award;
pub mod homepage;
pub mod instructor;
pub mod internship;
pub mod project;
pub mod user;
pub mod yearbook;

use mongodb::bson::oid::ObjectId;
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};

pub use award::{Award, AwardView};
pub use homepage::{HomepageKind, HomepageSection};
pub use instructor::{Instructor, InstructorView};
pub use internship::{Internship, InternshipView};
pub use project::{Membership, Project, ProjectView};
pub use user::{Role, User, UserView};
pub use yearbook::{Yearbook, YearbookView};

/// `?year=` on catalog and user listings.
#[derive(Debug, Deserialize)]
pub struct YearQuery {
    pub year: Option<i32>,
}

/// Parses a required document id coming from a path or a body.
pub fn parse_id(raw: &str) -> ApiResult<ObjectId> {
    ObjectId::parse_str(raw.trim())
        .map_err(|_| ApiError::validation(format!("Invalid id: {}", raw)))
}

/// Parses an optional reference. Empty text and `null` mean "no reference";
/// anything else must be a well-formed id.
pub fn parse_ref(raw: Option<&str>) -> ApiResult<Option<ObjectId>> {
    match raw.map(str::trim) {
        None | Some("") | Some("null") | Some("undefined") => Ok(None),
        Some(s) => parse_id(s).map(Some),
    }
}

pub fn parse_ids(raw: &[String]) -> ApiResult<Vec<ObjectId>> {
    raw.iter().map(|s| parse_id(s)).collect()
}

pub fn hex_ids(ids: &[ObjectId]) -> Vec<String> {
    ids.iter().map(|id| id.to_hex()).collect()
}

/// A list field that may arrive either as a JSON array or as the JSON text
/// of one (multipart forms can only carry text).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Encoded<T> {
    Value(Vec<T>),
    Text(String),
}

impl<T: serde::de::DeserializeOwned> Encoded<T> {
    pub fn decode(self, field: &str) -> ApiResult<Vec<T>> {
        match self {
            Encoded::Value(v) => Ok(v),
            Encoded::Text(text) => decode_list(&text, field),
        }
    }
}

/// Decodes a list sent as text. A blank value is an empty list.
pub fn decode_list<T: serde::de::DeserializeOwned>(text: &str, field: &str) -> ApiResult<Vec<T>> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(text)
        .map_err(|e| ApiError::validation(format!("Field '{}' is not a valid list: {}", field, e)))
}
