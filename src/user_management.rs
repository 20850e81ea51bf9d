// src/user_management.rs

use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use log::debug;
use serde::Deserialize;

use crate::app_state::AppState;
use crate::auth::{create_token, AdminUser, AuthUser};
use crate::error::{ApiError, ApiResult};
use crate::forms::Form;
use crate::models::{parse_id, UserView, YearQuery};
use crate::services::accounts::{self, NewUser, ProfileChanges};
use crate::store::UserStore;

#[derive(Debug, Deserialize)]
pub struct LoginInfo {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct EmailsQuery {
    pub emails: Option<String>,
}

/// POST /auth/register
/// Admin only, except for the very first account.
pub async fn register(
    data: web::Data<AppState>,
    caller: Option<AuthUser>,
    info: web::Json<NewUser>,
) -> ApiResult<HttpResponse> {
    debug!("Register request for {:?}", info.email);
    let bootstrap = data.store().count_users().await? == 0;
    match caller {
        _ if bootstrap => {}
        Some(c) if c.is_admin() => {}
        Some(_) => return Err(ApiError::forbidden("Admin access required")),
        None => return Err(ApiError::Unauthorized("Authentication required".into())),
    }

    let user = accounts::register(data.store(), info.into_inner(), data.config.bcrypt_cost).await?;
    let token = create_token(&user, &data.config.jwt_secret)?;
    Ok(HttpResponse::Created().json(serde_json::json!({ "token": token })))
}

/// POST /auth/login
pub async fn login(
    data: web::Data<AppState>,
    info: web::Json<LoginInfo>,
) -> ApiResult<HttpResponse> {
    let token = accounts::login(
        data.store(),
        &info.email,
        &info.password,
        &data.config.jwt_secret,
    )
    .await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "token": token })))
}

/// POST /auth/bulk-register
pub async fn bulk_register(
    data: web::Data<AppState>,
    _admin: AdminUser,
    entries: web::Json<Vec<NewUser>>,
) -> ApiResult<HttpResponse> {
    debug!("Bulk register with {} entries", entries.len());
    let report =
        accounts::bulk_register(data.store(), entries.into_inner(), data.config.bcrypt_cost).await;
    Ok(HttpResponse::Created().json(report))
}

/// GET /auth/users?year=
pub async fn list_users(
    data: web::Data<AppState>,
    _admin: AdminUser,
    query: web::Query<YearQuery>,
) -> ApiResult<HttpResponse> {
    let users = data.store().list_users(query.year).await?;
    let views: Vec<UserView> = users.into_iter().map(UserView::from).collect();
    Ok(HttpResponse::Ok().json(views))
}

/// GET /auth/users/by-emails?emails=a@x.com,b@x.com
pub async fn users_by_emails(
    data: web::Data<AppState>,
    _admin: AdminUser,
    query: web::Query<EmailsQuery>,
) -> ApiResult<HttpResponse> {
    let emails: Vec<String> = query
        .emails
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .map(crate::models::user::normalize_email)
        .filter(|e| !e.is_empty())
        .collect();
    if emails.is_empty() {
        return Err(ApiError::validation("Query parameter 'emails' is required"));
    }
    let users = data.store().users_by_emails(&emails).await?;
    let views: Vec<UserView> = users.into_iter().map(UserView::from).collect();
    Ok(HttpResponse::Ok().json(views))
}

/// GET /auth/emails
pub async fn all_emails(data: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let emails: Vec<String> = data
        .store()
        .list_users(None)
        .await?
        .into_iter()
        .map(|u| u.email)
        .collect();
    Ok(HttpResponse::Ok().json(emails))
}

/// GET /auth/users/{id}
pub async fn get_user(
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let id = parse_id(&path)?;
    let user = data
        .store()
        .find_user(id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(HttpResponse::Ok().json(UserView::from(user)))
}

/// PUT /auth/users/{id}  (multipart, optional `image` file)
pub async fn update_user(
    data: web::Data<AppState>,
    caller: AuthUser,
    path: web::Path<String>,
    payload: Multipart,
) -> ApiResult<HttpResponse> {
    let id = parse_id(&path)?;
    let mut form = Form::read(payload, data.config.max_upload_bytes).await?;
    let changes = ProfileChanges {
        email: form.text("email").map(str::to_string),
        password: form.text("password").map(str::to_string),
        first_name: form.text("first_name").map(|v| v.trim().to_string()),
        last_name: form.text("last_name").map(|v| v.trim().to_string()),
        linkedin: form.text("linkedin").map(|v| v.trim().to_string()),
        github: form.text("github").map(|v| v.trim().to_string()),
        website: form.text("website").map(|v| v.trim().to_string()),
        about: form.text("about").map(str::to_string),
        role: form.parse("role")?,
        year: form.parse("year")?,
        internship: form.reference("internship")?,
        image: form.take_file("image"),
    };

    let user = accounts::update_user(
        data.store(),
        data.media(),
        &caller,
        id,
        changes,
        data.config.bcrypt_cost,
    )
    .await?;
    Ok(HttpResponse::Ok().json(UserView::from(user)))
}

/// DELETE /auth/users/{id}
pub async fn delete_user(
    data: web::Data<AppState>,
    _admin: AdminUser,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let id = parse_id(&path)?;
    accounts::delete_user(data.store(), data.media(), id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "User deleted successfully" })))
}
