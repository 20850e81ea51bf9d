// src/homepage.rs

use actix_web::{web, HttpResponse};
use log::{debug, info};
use serde::Deserialize;

use crate::app_state::AppState;
use crate::auth::AdminUser;
use crate::error::{ApiError, ApiResult};
use crate::models::{HomepageKind, HomepageSection};
use crate::store::HomepageStore;

#[derive(Debug, Deserialize)]
pub struct SectionUpdate {
    pub videos: Option<Vec<String>>,
    pub text: Option<String>,
}

/// GET /homepage
pub async fn list_sections(data: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let sections = data.store().list_sections().await?;
    Ok(HttpResponse::Ok().json(sections))
}

/// POST /homepage
pub async fn create_section(
    data: web::Data<AppState>,
    _admin: AdminUser,
    body: web::Json<HomepageSection>,
) -> ApiResult<HttpResponse> {
    debug!("Creating homepage section: {:?}", body);
    let created = data.store().insert_section(body.into_inner()).await?;
    info!("Homepage section {} created", created.kind.as_str());
    Ok(HttpResponse::Created().json(created))
}

/// PUT /homepage/{type}
pub async fn update_section(
    data: web::Data<AppState>,
    _admin: AdminUser,
    path: web::Path<String>,
    body: web::Json<SectionUpdate>,
) -> ApiResult<HttpResponse> {
    let kind: HomepageKind = path.parse()?;
    let body = body.into_inner();
    let updated = data
        .store()
        .update_section(kind, body.videos, body.text)
        .await?
        .ok_or_else(|| ApiError::not_found("Record not found"))?;
    Ok(HttpResponse::Ok().json(updated))
}
