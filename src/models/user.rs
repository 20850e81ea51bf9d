use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

pub const ABOUT_MAX_LEN: usize = 500;

/// What a signed-in caller is allowed to do is decided by this role alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Student,
    Instructor,
    Admin,
}

impl Role {
    pub fn is_admin(self) -> bool {
        self == Role::Admin
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Instructor => "instructor",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "student" => Ok(Role::Student),
            "instructor" => Ok(Role::Instructor),
            "admin" => Ok(Role::Admin),
            other => Err(ApiError::validation(format!("Unknown role: {}", other))),
        }
    }
}

/// Represents a user in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// MongoDB document ID.
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub email: String,
    /// bcrypt hash, never the plain password.
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub internship: Option<ObjectId>,
    /// Enrollment year, compared against the active yearbook at login.
    pub year: i32,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub linkedin: String,
    #[serde(default)]
    pub github: String,
    #[serde(default)]
    pub website: String,
    #[serde(default)]
    pub about: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(email: String, password_hash: String, role: Role) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            email,
            password: password_hash,
            first_name: String::new(),
            last_name: String::new(),
            role,
            internship: None,
            year: now.year(),
            image: String::new(),
            linkedin: String::new(),
            github: String::new(),
            website: String::new(),
            about: String::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// What we expose to the frontend: everything but the password hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserView {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub internship: Option<String>,
    pub year: i32,
    pub image: String,
    pub linkedin: String,
    pub github: String,
    pub website: String,
    pub about: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserView {
    fn from(u: User) -> Self {
        Self {
            id: u.id.map(|id| id.to_hex()).unwrap_or_default(),
            email: u.email,
            first_name: u.first_name,
            last_name: u.last_name,
            role: u.role,
            internship: u.internship.map(|id| id.to_hex()),
            year: u.year,
            image: u.image,
            linkedin: u.linkedin,
            github: u.github,
            website: u.website,
            about: u.about,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

/// Normalizes an email for storage and lookup.
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}
