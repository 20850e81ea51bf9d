// src/media.rs
//
// Image hosting. Uploads go to the image service and come back as public URLs;
// deletes are best effort and never fail the request that triggered them.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use log::{info, warn};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use sha1::{Digest, Sha1};

use crate::config::MediaConfig;
use crate::error::{ApiError, ApiResult};

/// Path segment that precedes the asset key in delivery URLs.
const KEY_MARKER: &str = "upload";

/// Storage folders, one per kind of owner.
pub mod folders {
    pub const PROJECTS: &str = "projects";
    pub const USERS: &str = "users";
    pub const INSTRUCTORS: &str = "instructors";
    pub const AWARDS: &str = "awards";
}

#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Stores the buffer and returns its public (https) URL.
    async fn upload(&self, bytes: Vec<u8>, folder: &str) -> ApiResult<String>;

    /// Removes the asset stored under `key`.
    async fn destroy(&self, key: &str) -> ApiResult<()>;
}

/// Derives the storage key from a delivery URL: the path after the
/// `upload` segment, minus a leading version segment and the file extension.
/// Returns `None` for URLs that were not produced by the image service.
pub fn storage_key(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next()?;
    let parts: Vec<&str> = path.split('/').collect();
    let marker = parts.iter().position(|p| *p == KEY_MARKER)?;
    let mut rest: Vec<&str> = parts[marker + 1..]
        .iter()
        .copied()
        .filter(|p| !p.is_empty())
        .collect();
    if rest.first().is_some_and(|p| is_version(p)) && rest.len() > 1 {
        rest.remove(0);
    }
    let last = rest.pop()?;
    let stem = match last.rsplit_once('.') {
        Some((stem, _ext)) if !stem.is_empty() => stem,
        _ => last,
    };
    rest.push(stem);
    Some(rest.join("/"))
}

fn is_version(segment: &str) -> bool {
    segment.len() > 1
        && segment.starts_with('v')
        && segment[1..].bytes().all(|b| b.is_ascii_digit())
}

/// Best-effort delete of a previously uploaded URL. Failures are logged and
/// swallowed; an orphaned asset is acceptable.
pub async fn discard(media: &dyn MediaStore, url: &str) {
    if url.is_empty() {
        return;
    }
    let Some(key) = storage_key(url) else {
        warn!("No storage key in {}, leaving asset in place", url);
        return;
    };
    match media.destroy(&key).await {
        Ok(()) => info!("Deleted media asset {}", key),
        Err(e) => warn!("Failed to delete media asset {}: {}", key, e),
    }
}

/// Discards each URL of `previous` that is missing from `current`.
pub async fn discard_removed(media: &dyn MediaStore, previous: &[String], current: &[String]) {
    for url in removed_urls(previous, current) {
        discard(media, url).await;
    }
}

pub fn removed_urls<'a>(previous: &'a [String], current: &[String]) -> Vec<&'a str> {
    previous
        .iter()
        .filter(|url| !current.contains(url))
        .map(String::as_str)
        .collect()
}

/// Signs image-service parameters: `k=v` pairs sorted by key, joined with
/// `&`, followed by the API secret, hashed with SHA-1.
pub fn sign(params: &[(&str, &str)], secret: &str) -> String {
    let mut sorted = params.to_vec();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    let joined = sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");
    let mut hasher = Sha1::new();
    hasher.update(joined.as_bytes());
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

/// Cloudinary-backed image store.
pub struct Cloudinary {
    http: reqwest::Client,
    config: MediaConfig,
}

impl Cloudinary {
    pub fn new(config: MediaConfig) -> ApiResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| ApiError::Media(e.to_string()))?;
        Ok(Self { http, config })
    }

    fn endpoint(&self, action: &str) -> String {
        format!(
            "https://api.cloudinary.com/v1_1/{}/image/{}",
            self.config.cloud_name, action
        )
    }

    fn folder(&self, folder: &str) -> String {
        if self.config.root_folder.is_empty() {
            folder.to_string()
        } else {
            format!("{}/{}", self.config.root_folder, folder)
        }
    }
}

#[async_trait]
impl MediaStore for Cloudinary {
    async fn upload(&self, bytes: Vec<u8>, folder: &str) -> ApiResult<String> {
        let timestamp = Utc::now().timestamp().to_string();
        let folder = self.folder(folder);
        let signature = sign(
            &[("folder", folder.as_str()), ("timestamp", timestamp.as_str())],
            &self.config.api_secret,
        );
        let file = Part::bytes(bytes).file_name(uuid::Uuid::new_v4().to_string());
        let form = Form::new()
            .part("file", file)
            .text("api_key", self.config.api_key.clone())
            .text("timestamp", timestamp)
            .text("folder", folder)
            .text("signature", signature);

        let resp = self
            .http
            .post(self.endpoint("upload"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| ApiError::Media(format!("upload unreachable: {}", e)))?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(ApiError::Media(format!("upload failed ({}): {}", status, body)));
        }
        let body: UploadResponse = resp
            .json()
            .await
            .map_err(|e| ApiError::Media(format!("upload response parse error: {}", e)))?;
        Ok(body.secure_url)
    }

    async fn destroy(&self, key: &str) -> ApiResult<()> {
        let timestamp = Utc::now().timestamp().to_string();
        let signature = sign(
            &[("public_id", key), ("timestamp", timestamp.as_str())],
            &self.config.api_secret,
        );
        let params = [
            ("public_id", key.to_string()),
            ("timestamp", timestamp),
            ("api_key", self.config.api_key.clone()),
            ("signature", signature),
        ];
        let resp = self
            .http
            .post(self.endpoint("destroy"))
            .form(&params)
            .send()
            .await
            .map_err(|e| ApiError::Media(format!("destroy unreachable: {}", e)))?;
        if !resp.status().is_success() {
            return Err(ApiError::Media(format!("destroy failed: {}", resp.status())));
        }
        let body: DestroyResponse = resp
            .json()
            .await
            .map_err(|e| ApiError::Media(format!("destroy response parse error: {}", e)))?;
        match body.result.as_str() {
            "ok" => Ok(()),
            other => Err(ApiError::Media(format!("destroy returned {}", other))),
        }
    }
}

#[cfg(test)]
pub mod testing {
    use std::sync::Mutex;

    use super::*;

    /// Records every call instead of talking to the image service.
    #[derive(Default)]
    pub struct RecordingMedia {
        pub uploads: Mutex<Vec<String>>,
        pub destroyed: Mutex<Vec<String>>,
        pub fail_destroy: bool,
    }

    impl RecordingMedia {
        pub fn failing_destroy() -> Self {
            Self {
                fail_destroy: true,
                ..Default::default()
            }
        }

        pub fn destroyed(&self) -> Vec<String> {
            self.destroyed.lock().unwrap().clone()
        }

        pub fn uploads(&self) -> Vec<String> {
            self.uploads.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MediaStore for RecordingMedia {
        async fn upload(&self, bytes: Vec<u8>, folder: &str) -> ApiResult<String> {
            let mut uploads = self.uploads.lock().unwrap();
            let url = format!(
                "https://res.cloudinary.com/test/image/upload/v1/{}/file{}-{}.png",
                folder,
                uploads.len(),
                bytes.len()
            );
            uploads.push(url.clone());
            Ok(url)
        }

        async fn destroy(&self, key: &str) -> ApiResult<()> {
            self.destroyed.lock().unwrap().push(key.to_string());
            if self.fail_destroy {
                return Err(ApiError::Media("service unavailable".into()));
            }
            Ok(())
        }
    }
}
