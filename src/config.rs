// src/config.rs

use std::env;

const DEFAULT_DATABASE: &str = "projects_day";
const DEFAULT_ORIGIN: &str = "http://localhost:3000";
const DEFAULT_PORT: u16 = 5000;
const DEFAULT_UPLOAD_LIMIT: usize = 10 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

/// Image-service credentials and the folder every upload lands under.
#[derive(Clone, Debug)]
pub struct MediaConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    pub root_folder: String,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub mongo_uri: String,
    pub database_name: String,
    pub jwt_secret: String,
    pub media: MediaConfig,
    /// Empty means any origin.
    pub allowed_origins: Vec<String>,
    pub port: u16,
    pub bcrypt_cost: u32,
    pub max_upload_bytes: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        Ok(Self {
            mongo_uri: required("MONGO_URI")?,
            database_name: database_name(),
            jwt_secret: required("JWT_SECRET")?,
            media: MediaConfig {
                cloud_name: required("CLOUDINARY_CLOUD_NAME")?,
                api_key: required("CLOUDINARY_API_KEY")?,
                api_secret: required("CLOUDINARY_API_SECRET")?,
                root_folder: env::var("UPLOAD_FOLDER").unwrap_or_else(|_| DEFAULT_DATABASE.to_string()),
            },
            allowed_origins: parse_origins(
                &env::var("ALLOWED_ORIGINS").unwrap_or_else(|_| DEFAULT_ORIGIN.to_string()),
            ),
            port: parsed("PORT", DEFAULT_PORT)?,
            bcrypt_cost: parsed("BCRYPT_COST", bcrypt::DEFAULT_COST)?,
            max_upload_bytes: parsed("MAX_UPLOAD_BYTES", DEFAULT_UPLOAD_LIMIT)?,
        })
    }

    pub fn any_origin(&self) -> bool {
        self.allowed_origins.is_empty()
    }
}

fn database_name() -> String {
    env::var("DATABASE_NAME").unwrap_or_else(|_| DEFAULT_DATABASE.to_string())
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    match env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ConfigError::Missing(name)),
    }
}

fn parsed<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value: raw }),
        _ => Ok(default),
    }
}

/// Comma-separated origins; `*` anywhere in the list allows every origin.
/// A list with no origins in it falls back to the default one.
fn parse_origins(raw: &str) -> Vec<String> {
    let origins: Vec<String> = raw
        .split(',')
        .map(|o| o.trim().trim_end_matches('/').to_string())
        .filter(|o| !o.is_empty())
        .collect();
    if origins.iter().any(|o| o == "*") {
        Vec::new()
    } else if origins.is_empty() {
        vec![DEFAULT_ORIGIN.to_string()]
    } else {
        origins
    }
}

#[cfg(test)]
impl Config {
    pub fn for_tests() -> Self {
        Self {
            mongo_uri: "mongodb://localhost:27017".into(),
            database_name: "projects_day_test".into(),
            jwt_secret: "test-secret".into(),
            media: MediaConfig {
                cloud_name: "test".into(),
                api_key: "key".into(),
                api_secret: "secret".into(),
                root_folder: String::new(),
            },
            allowed_origins: Vec::new(),
            port: DEFAULT_PORT,
            bcrypt_cost: 4,
            max_upload_bytes: 1024 * 1024,
        }
    }
}
