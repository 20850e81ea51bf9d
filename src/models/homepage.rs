use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// The homepage holds one section per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HomepageKind {
    /// Video reel.
    Youtube,
    /// Hero banner text.
    Herotext,
}

impl HomepageKind {
    pub fn as_str(self) -> &'static str {
        match self {
            HomepageKind::Youtube => "youtube",
            HomepageKind::Herotext => "herotext",
        }
    }
}

impl FromStr for HomepageKind {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "youtube" => Ok(HomepageKind::Youtube),
            "herotext" => Ok(HomepageKind::Herotext),
            other => Err(ApiError::validation(format!("Unknown homepage type: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HomepageSection {
    #[serde(rename = "type")]
    pub kind: HomepageKind,
    #[serde(default)]
    pub videos: Vec<String>,
    #[serde(default)]
    pub text: String,
}
