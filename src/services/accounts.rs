// src/services/accounts.rs

use chrono::Utc;
use log::{info, warn};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::access;
use crate::auth::{create_token, hash_password, verify_password, AuthUser};
use crate::error::{ApiError, ApiResult};
use crate::media::{self, folders, MediaStore};
use crate::models::user::{normalize_email, ABOUT_MAX_LEN};
use crate::models::{parse_ref, Role, User};
use crate::services::{membership, yearbooks};
use crate::store::{Store, UserStore};

/// Registration input. Required fields are optional here so a bulk import
/// can report a missing field per entry instead of rejecting the batch.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewUser {
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub year: Option<i32>,
    pub internship: Option<String>,
}

#[derive(Debug, Default, Serialize)]
pub struct BulkReport {
    pub created: Vec<String>,
    pub skipped: Vec<String>,
    pub errors: Vec<BulkFailure>,
}

#[derive(Debug, Serialize)]
pub struct BulkFailure {
    pub index: usize,
    pub email: Option<String>,
    pub error: String,
}

pub async fn register(store: &dyn Store, input: NewUser, cost: u32) -> ApiResult<User> {
    let email = input.email.as_deref().map(normalize_email).unwrap_or_default();
    let password = input.password.unwrap_or_default();
    if email.is_empty() || password.is_empty() {
        return Err(ApiError::validation("Email and password are required"));
    }
    let role = match input.role.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
        Some(raw) => raw.parse::<Role>()?,
        None => Role::default(),
    };
    let internship = parse_ref(input.internship.as_deref())?;

    if store.find_user_by_email(&email).await?.is_some() {
        return Err(ApiError::conflict("Email already in use"));
    }

    let mut user = User::new(email, hash_password(&password, cost)?, role);
    user.first_name = input.first_name.unwrap_or_default().trim().to_string();
    user.last_name = input.last_name.unwrap_or_default().trim().to_string();
    user.internship = internship;
    if let Some(year) = input.year {
        user.year = year;
    }

    let user = store.insert_user(user).await?;
    info!("User created {} ({})", user.email, user.role);
    Ok(user)
}

/// Registers every entry it can. Existing emails are skipped, invalid
/// entries are reported, and nothing already created is rolled back.
pub async fn bulk_register(store: &dyn Store, entries: Vec<NewUser>, cost: u32) -> BulkReport {
    let mut report = BulkReport::default();
    for (index, entry) in entries.into_iter().enumerate() {
        let email = entry.email.as_deref().map(normalize_email);
        match register(store, entry, cost).await {
            Ok(user) => report.created.push(user.email),
            Err(ApiError::Conflict(_)) => report.skipped.push(email.unwrap_or_default()),
            Err(e) => {
                warn!("Bulk registration entry {} failed: {}", index, e);
                report.errors.push(BulkFailure {
                    index,
                    email,
                    error: e.to_string(),
                });
            }
        }
    }
    info!(
        "Bulk registration: {} created, {} skipped, {} failed",
        report.created.len(),
        report.skipped.len(),
        report.errors.len()
    );
    report
}

pub async fn login(store: &dyn Store, email: &str, password: &str, secret: &str) -> ApiResult<String> {
    let invalid = || ApiError::Unauthorized("Invalid email or password".into());
    let user = store
        .find_user_by_email(&normalize_email(email))
        .await?
        .ok_or_else(invalid)?;
    if !verify_password(password, &user.password) {
        return Err(invalid());
    }
    yearbooks::check_login(store, &user).await?;
    create_token(&user, secret)
}

/// Profile edits. `None` leaves a field untouched.
#[derive(Debug, Default)]
pub struct ProfileChanges {
    pub email: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub linkedin: Option<String>,
    pub github: Option<String>,
    pub website: Option<String>,
    pub about: Option<String>,
    pub role: Option<Role>,
    pub year: Option<i32>,
    pub internship: Option<Option<ObjectId>>,
    pub image: Option<Vec<u8>>,
}

impl ProfileChanges {
    fn touches_enrollment(&self) -> bool {
        self.role.is_some() || self.year.is_some() || self.internship.is_some()
    }
}

pub async fn update_user(
    store: &dyn Store,
    media: &dyn MediaStore,
    caller: &AuthUser,
    id: ObjectId,
    changes: ProfileChanges,
    cost: u32,
) -> ApiResult<User> {
    access::can_edit_user(caller, id)?;
    if changes.touches_enrollment() {
        access::can_set_enrollment(caller)?;
    }
    let mut user = store
        .find_user(id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    if let Some(email) = changes.email.as_deref().map(normalize_email) {
        if email.is_empty() {
            return Err(ApiError::validation("Email cannot be empty"));
        }
        if email != user.email && store.find_user_by_email(&email).await?.is_some() {
            return Err(ApiError::conflict("Email already in use"));
        }
        user.email = email;
    }
    if let Some(about) = changes.about {
        if about.chars().count() > ABOUT_MAX_LEN {
            return Err(ApiError::validation(format!(
                "About must be at most {} characters",
                ABOUT_MAX_LEN
            )));
        }
        user.about = about;
    }
    if let Some(password) = changes.password.filter(|p| !p.is_empty()) {
        user.password = hash_password(&password, cost)?;
    }
    for (slot, value) in [
        (&mut user.first_name, changes.first_name),
        (&mut user.last_name, changes.last_name),
        (&mut user.linkedin, changes.linkedin),
        (&mut user.github, changes.github),
        (&mut user.website, changes.website),
    ] {
        if let Some(value) = value {
            *slot = value;
        }
    }
    if let Some(role) = changes.role {
        user.role = role;
    }
    if let Some(year) = changes.year {
        user.year = year;
    }
    if let Some(internship) = changes.internship {
        user.internship = internship;
    }

    let replaced = match changes.image {
        Some(bytes) => {
            let url = media.upload(bytes, folders::USERS).await?;
            Some(std::mem::replace(&mut user.image, url))
        }
        None => None,
    };
    user.updated_at = Utc::now();

    if !store.save_user(&user).await? {
        return Err(ApiError::not_found("User not found"));
    }
    if let Some(old) = replaced {
        media::discard(media, &old).await;
    }
    info!("User {} updated by {}", user.email, caller.email);
    Ok(user)
}

/// Removes the user, their membership and their image.
pub async fn delete_user(store: &dyn Store, media: &dyn MediaStore, id: ObjectId) -> ApiResult<User> {
    let user = store
        .delete_user(id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    match membership::unassign(store, id).await {
        Ok(_) | Err(ApiError::NotFound(_)) => {}
        Err(e) => return Err(e),
    }
    media::discard(media, &user.image).await;
    info!("User deleted {}", user.email);
    Ok(user)
}
