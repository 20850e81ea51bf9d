// src/yearbook.rs

use actix_web::{web, HttpResponse};
use log::debug;
use serde::Deserialize;

use crate::app_state::AppState;
use crate::auth::AdminUser;
use crate::error::ApiResult;
use crate::models::{parse_id, parse_ids, YearbookView};
use crate::services::yearbooks::{self, YearbookChanges};
use crate::store::YearbookStore;

#[derive(Debug, Deserialize)]
pub struct NewYearbook {
    pub year: i32,
    #[serde(default)]
    pub active: bool,
}

#[derive(Debug, Deserialize)]
pub struct YearbookUpdate {
    pub year: Option<i32>,
    pub active: Option<bool>,
    pub user_block: Option<bool>,
    pub excluded_users: Option<Vec<String>>,
}

/// GET /yearbooks
pub async fn list_yearbooks(data: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let yearbooks = data.store().list_yearbooks().await?;
    let views: Vec<YearbookView> = yearbooks.into_iter().map(YearbookView::from).collect();
    Ok(HttpResponse::Ok().json(views))
}

/// GET /yearbooks/active
/// `null` when no yearbook is active.
pub async fn active_yearbook(data: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let active = yearbooks::active(data.store()).await?;
    Ok(HttpResponse::Ok().json(active.map(YearbookView::from)))
}

/// POST /yearbooks
pub async fn create_yearbook(
    data: web::Data<AppState>,
    _admin: AdminUser,
    body: web::Json<NewYearbook>,
) -> ApiResult<HttpResponse> {
    debug!("Creating yearbook: {:?}", body);
    let created = yearbooks::create(data.store(), body.year, body.active).await?;
    Ok(HttpResponse::Created().json(YearbookView::from(created)))
}

/// PUT /yearbooks/{id}
pub async fn update_yearbook(
    data: web::Data<AppState>,
    _admin: AdminUser,
    path: web::Path<String>,
    body: web::Json<YearbookUpdate>,
) -> ApiResult<HttpResponse> {
    let id = parse_id(&path)?;
    let body = body.into_inner();
    let changes = YearbookChanges {
        year: body.year,
        active: body.active,
        user_block: body.user_block,
        excluded_users: body.excluded_users.as_deref().map(parse_ids).transpose()?,
    };
    let updated = yearbooks::update(data.store(), id, changes).await?;
    Ok(HttpResponse::Ok().json(YearbookView::from(updated)))
}

/// DELETE /yearbooks/{id}
pub async fn delete_yearbook(
    data: web::Data<AppState>,
    _admin: AdminUser,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let id = parse_id(&path)?;
    let promoted = yearbooks::delete(data.store(), id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Yearbook deleted successfully",
        "active": promoted.map(YearbookView::from),
    })))
}
