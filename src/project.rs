// src/project.rs

use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use log::debug;
use serde::Deserialize;

use crate::access;
use crate::app_state::AppState;
use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::forms::Form;
use crate::models::{parse_id, parse_ids, parse_ref};
use crate::services::membership;
use crate::services::projects::{self, ListParams, ProjectInput};

/// Optional body of assign/unassign; admins may act for another user.
#[derive(Debug, Default, Deserialize)]
pub struct MembershipRequest {
    pub user_id: Option<String>,
}

fn project_input(form: &mut Form) -> ApiResult<ProjectInput> {
    let awards = form
        .list::<String>("awards")?
        .map(|ids| parse_ids(&ids))
        .transpose()?;
    Ok(ProjectInput {
        name: form.text("name").map(str::to_string),
        description: form.text("description").map(str::to_string),
        short_description: form.text("short_description").map(str::to_string),
        internship: form.reference("internship")?,
        instructor: form.reference("instructor")?,
        youtube: form.text("youtube").map(|v| v.trim().to_string()),
        awards,
        year: form.parse("year")?,
        gallery: form.list("gallery")?,
        image: form.take_file("image"),
        new_gallery: form.take_files("newGalleryFiles"),
    })
}

/// GET /projects?page=&year=&search=&filter=
pub async fn list_projects(
    data: web::Data<AppState>,
    query: web::Query<ListParams>,
) -> ApiResult<HttpResponse> {
    debug!("Listing projects with {:?}", query);
    let page = projects::list_page(data.store(), &query).await?;
    Ok(HttpResponse::Ok().json(page))
}

/// GET /projects/all
pub async fn all_projects(data: web::Data<AppState>) -> ApiResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(projects::list_all(data.store()).await?))
}

/// GET /projects/by-internship/{id}
pub async fn projects_by_internship(
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let internship = parse_id(&path)?;
    Ok(HttpResponse::Ok().json(projects::by_internship(data.store(), internship).await?))
}

/// GET /projects/mine/check
pub async fn my_project(data: web::Data<AppState>, caller: AuthUser) -> ApiResult<HttpResponse> {
    let project = match membership::project_of_user(data.store(), caller.id).await? {
        Some(p) => projects::with_awards(data.store(), vec![p]).await?.pop(),
        None => None,
    };
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "exists": project.is_some(),
        "project": project,
    })))
}

/// GET /projects/{id}
pub async fn get_project(
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let id = parse_id(&path)?;
    Ok(HttpResponse::Ok().json(projects::get(data.store(), id).await?))
}

/// POST /projects/create  (multipart: `image`, `newGalleryFiles`)
pub async fn create_project(
    data: web::Data<AppState>,
    caller: AuthUser,
    payload: Multipart,
) -> ApiResult<HttpResponse> {
    let mut form = Form::read(payload, data.config.max_upload_bytes).await?;
    let input = project_input(&mut form)?;
    let project = projects::create(data.store(), data.media(), &caller, input).await?;
    let view = projects::with_awards(data.store(), vec![project]).await?.pop();
    Ok(HttpResponse::Created().json(view))
}

/// PUT /projects/{id}  (multipart)
pub async fn update_project(
    data: web::Data<AppState>,
    caller: AuthUser,
    path: web::Path<String>,
    payload: Multipart,
) -> ApiResult<HttpResponse> {
    let id = parse_id(&path)?;
    let mut form = Form::read(payload, data.config.max_upload_bytes).await?;
    let input = project_input(&mut form)?;
    let project = projects::update(data.store(), data.media(), &caller, id, input).await?;
    let view = projects::with_awards(data.store(), vec![project]).await?.pop();
    Ok(HttpResponse::Ok().json(view))
}

/// DELETE /projects/{id}
pub async fn delete_project(
    data: web::Data<AppState>,
    caller: AuthUser,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let id = parse_id(&path)?;
    projects::delete(data.store(), data.media(), &caller, id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "Project deleted successfully" })))
}

/// PUT /projects/{id}/assign
pub async fn assign_project(
    data: web::Data<AppState>,
    caller: AuthUser,
    path: web::Path<String>,
    body: Option<web::Json<MembershipRequest>>,
) -> ApiResult<HttpResponse> {
    let project = parse_id(&path)?;
    let requested = body.and_then(|b| b.into_inner().user_id);
    let user = access::membership_target(&caller, parse_ref(requested.as_deref())?)?;

    let joined = membership::assign(data.store(), user, project).await?;
    let view = projects::with_awards(data.store(), vec![joined]).await?.pop();
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Assigned to project",
        "project": view,
    })))
}

/// PUT /projects/unassign
pub async fn unassign_project(
    data: web::Data<AppState>,
    caller: AuthUser,
    body: Option<web::Json<MembershipRequest>>,
) -> ApiResult<HttpResponse> {
    let requested = body.and_then(|b| b.into_inner().user_id);
    let user = access::membership_target(&caller, parse_ref(requested.as_deref())?)?;

    let project = membership::unassign(data.store(), user).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Unassigned from project",
        "project_id": project.to_hex(),
    })))
}
