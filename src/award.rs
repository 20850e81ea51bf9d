// src/award.rs

use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use chrono::Utc;
use log::info;

use crate::app_state::AppState;
use crate::auth::AdminUser;
use crate::error::{ApiError, ApiResult};
use crate::forms::Form;
use crate::media::{self, folders};
use crate::models::{parse_id, Award, AwardView};
use crate::store::CatalogStore;

/// GET /awards
pub async fn list_awards(data: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let awards = CatalogStore::<Award>::list_entries(data.store(), None).await?;
    let views: Vec<AwardView> = awards.into_iter().map(AwardView::from).collect();
    Ok(HttpResponse::Ok().json(views))
}

/// POST /awards  (multipart, optional `image`)
pub async fn create_award(
    data: web::Data<AppState>,
    _admin: AdminUser,
    payload: Multipart,
) -> ApiResult<HttpResponse> {
    let mut form = Form::read(payload, data.config.max_upload_bytes).await?;
    let name = form.required("name")?;
    let description = form.value("description").unwrap_or_default();
    let image = match form.take_file("image") {
        Some(bytes) => data.media().upload(bytes, folders::AWARDS).await?,
        None => String::new(),
    };

    let now = Utc::now();
    let created = CatalogStore::<Award>::insert_entry(
        data.store(),
        Award {
            id: None,
            name,
            image,
            description,
            created_at: now,
            updated_at: now,
        },
    )
    .await?;
    info!("Award created {}", created.name);
    Ok(HttpResponse::Created().json(AwardView::from(created)))
}

/// PUT /awards/{id}  (multipart)
pub async fn update_award(
    data: web::Data<AppState>,
    _admin: AdminUser,
    path: web::Path<String>,
    payload: Multipart,
) -> ApiResult<HttpResponse> {
    let id = parse_id(&path)?;
    let mut form = Form::read(payload, data.config.max_upload_bytes).await?;
    let mut award = CatalogStore::<Award>::get_entry(data.store(), id)
        .await?
        .ok_or_else(|| ApiError::not_found("Award not found"))?;

    if let Some(name) = form.value("name") {
        award.name = name;
    }
    if let Some(description) = form.text("description") {
        award.description = description.to_string();
    }
    let replaced = match form.take_file("image") {
        Some(bytes) => {
            let url = data.media().upload(bytes, folders::AWARDS).await?;
            Some(std::mem::replace(&mut award.image, url))
        }
        None => None,
    };
    award.updated_at = Utc::now();

    if !CatalogStore::<Award>::save_entry(data.store(), &award).await? {
        return Err(ApiError::not_found("Award not found"));
    }
    if let Some(old) = replaced {
        media::discard(data.media(), &old).await;
    }
    Ok(HttpResponse::Ok().json(AwardView::from(award)))
}

/// DELETE /awards/{id}
/// Projects keep the id; it is dropped when projects are rendered.
pub async fn delete_award(
    data: web::Data<AppState>,
    _admin: AdminUser,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let id = parse_id(&path)?;
    let removed = CatalogStore::<Award>::delete_entry(data.store(), id)
        .await?
        .ok_or_else(|| ApiError::not_found("Award not found"))?;
    media::discard(data.media(), &removed.image).await;
    info!("Award deleted {}", removed.name);
    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "Award deleted successfully" })))
}
