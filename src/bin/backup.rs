// src/bin/backup.rs
//
// One-shot dump of every collection to local JSON files:
// BACKUP_DIR/backup-<timestamp>/<collection>.json

use std::env;
use std::path::{Path, PathBuf};

use chrono::Utc;
use env_logger::Env;
use futures::TryStreamExt;
use log::{error, info};
use mongodb::bson::{doc, Bson, Document};
use mongodb::{Client, Database};

const COLLECTIONS: [&str; 8] = [
    "users",
    "projects",
    "memberships",
    "internships",
    "instructors",
    "awards",
    "yearbooks",
    "homepages",
];

#[derive(Debug, thiserror::Error)]
enum BackupError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),

    #[error("database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("write failed for {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

async fn dump_collection(db: &Database, name: &str, dir: &Path) -> Result<usize, BackupError> {
    let documents: Vec<Document> = db
        .collection::<Document>(name)
        .find(doc! {})
        .await?
        .try_collect()
        .await?;
    let json: Vec<serde_json::Value> = documents
        .into_iter()
        .map(|d| Bson::Document(d).into_relaxed_extjson())
        .collect();

    let path = dir.join(format!("{}.json", name));
    let bytes = serde_json::to_vec_pretty(&json)?;
    tokio::fs::write(&path, bytes)
        .await
        .map_err(|source| BackupError::Io { path, source })?;
    Ok(json.len())
}

async fn run() -> Result<PathBuf, BackupError> {
    dotenv::dotenv().ok();
    let uri = env::var("MONGO_URI").map_err(|_| BackupError::Missing("MONGO_URI"))?;
    let database = env::var("DATABASE_NAME").unwrap_or_else(|_| "projects_day".to_string());
    let root = env::var("BACKUP_DIR").unwrap_or_else(|_| "backups".to_string());

    let db = Client::with_uri_str(&uri).await?.database(&database);
    let dir = PathBuf::from(root).join(format!("backup-{}", Utc::now().format("%Y%m%dT%H%M%SZ")));
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|source| BackupError::Io {
            path: dir.clone(),
            source,
        })?;

    info!("Backing up database {} into {}", database, dir.display());
    for name in COLLECTIONS {
        let count = dump_collection(&db, name, &dir).await?;
        info!("Saved {} documents from {}", count, name);
    }
    Ok(dir)
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    match run().await {
        Ok(dir) => info!("Backup complete: {}", dir.display()),
        Err(e) => {
            error!("Backup failed: {}", e);
            std::process::exit(1);
        }
    }
}
