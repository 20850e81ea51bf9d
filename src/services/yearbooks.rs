// src/services/yearbooks.rs
//
// At most one yearbook is active. Every transition that can turn one on
// first turns the others off.

use chrono::Utc;
use log::{info, warn};
use mongodb::bson::oid::ObjectId;

use crate::error::{ApiError, ApiResult};
use crate::models::{User, Yearbook};
use crate::store::{Store, YearbookStore};

#[derive(Debug, Clone, Default)]
pub struct YearbookChanges {
    pub year: Option<i32>,
    pub active: Option<bool>,
    pub user_block: Option<bool>,
    pub excluded_users: Option<Vec<ObjectId>>,
}

pub async fn create(store: &dyn Store, year: i32, active: bool) -> ApiResult<Yearbook> {
    if store.find_yearbook_by_year(year).await?.is_some() {
        return Err(ApiError::conflict(format!("Yearbook {} already exists", year)));
    }
    if active {
        store.deactivate_yearbooks(None).await?;
    }
    let now = Utc::now();
    let created = store
        .insert_yearbook(Yearbook {
            id: None,
            year,
            active,
            user_block: false,
            excluded_users: Vec::new(),
            created_at: now,
            updated_at: now,
        })
        .await?;
    info!("Yearbook {} created (active: {})", year, active);
    Ok(created)
}

pub async fn update(store: &dyn Store, id: ObjectId, changes: YearbookChanges) -> ApiResult<Yearbook> {
    let mut yearbook = store
        .find_yearbook(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Yearbook not found"))?;

    if let Some(year) = changes.year.filter(|y| *y != yearbook.year) {
        if store.find_yearbook_by_year(year).await?.is_some() {
            return Err(ApiError::conflict(format!("Yearbook {} already exists", year)));
        }
        yearbook.year = year;
    }
    if changes.active == Some(true) {
        let cleared = store.deactivate_yearbooks(Some(id)).await?;
        info!("Activating yearbook {} ({} deactivated)", yearbook.year, cleared);
    }
    if let Some(active) = changes.active {
        yearbook.active = active;
    }
    if let Some(block) = changes.user_block {
        yearbook.user_block = block;
    }
    if let Some(excluded) = changes.excluded_users {
        yearbook.excluded_users = excluded;
    }
    yearbook.updated_at = Utc::now();

    if !store.save_yearbook(&yearbook).await? {
        return Err(ApiError::not_found("Yearbook not found"));
    }
    Ok(yearbook)
}

/// Deletes a yearbook. When it was the active one, the newest remaining
/// yearbook takes over, which is returned.
pub async fn delete(store: &dyn Store, id: ObjectId) -> ApiResult<Option<Yearbook>> {
    let removed = store
        .delete_yearbook(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Yearbook not found"))?;
    info!("Yearbook {} deleted", removed.year);

    if !removed.active {
        return Ok(None);
    }
    let Some(mut next) = store.latest_yearbook().await? else {
        info!("No yearbook left to activate");
        return Ok(None);
    };
    store.deactivate_yearbooks(next.id).await?;
    next.active = true;
    next.updated_at = Utc::now();
    store.save_yearbook(&next).await?;
    info!("Yearbook {} promoted to active", next.year);
    Ok(Some(next))
}

pub async fn active(store: &dyn Store) -> ApiResult<Option<Yearbook>> {
    store.active_yearbook().await
}

/// Non-admin sign-in is only open to the active yearbook's class.
pub async fn check_login(store: &dyn Store, user: &User) -> ApiResult<()> {
    if user.role.is_admin() {
        return Ok(());
    }
    let Some(active) = store.active_yearbook().await? else {
        warn!("Login refused for {}: no active yearbook", user.email);
        return Err(ApiError::forbidden("Login is closed: no active yearbook"));
    };
    if active.user_block {
        return Err(ApiError::forbidden("Login is currently blocked"));
    }
    if user.year != active.year {
        return Err(ApiError::forbidden(format!(
            "Login is open to the {} class only",
            active.year
        )));
    }
    if user.id.is_some_and(|id| active.excluded_users.contains(&id)) {
        return Err(ApiError::forbidden("Your account is not allowed to log in"));
    }
    Ok(())
}
