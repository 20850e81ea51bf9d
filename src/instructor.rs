// src/instructor.rs

use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use chrono::Utc;
use log::info;
use mongodb::bson::oid::ObjectId;

use crate::app_state::AppState;
use crate::auth::AdminUser;
use crate::error::{ApiError, ApiResult};
use crate::forms::Form;
use crate::media::{self, folders};
use crate::models::{parse_id, parse_ids, Instructor, InstructorView, YearQuery};
use crate::store::CatalogStore;

fn internships(form: &Form) -> ApiResult<Option<Vec<ObjectId>>> {
    form.list::<String>("internships")?
        .map(|ids| parse_ids(&ids))
        .transpose()
}

/// GET /instructors?year=
pub async fn list_instructors(
    data: web::Data<AppState>,
    query: web::Query<YearQuery>,
) -> ApiResult<HttpResponse> {
    let instructors = CatalogStore::<Instructor>::list_entries(data.store(), query.year).await?;
    let views: Vec<InstructorView> = instructors.into_iter().map(InstructorView::from).collect();
    Ok(HttpResponse::Ok().json(views))
}

/// GET /instructors/{id}
pub async fn get_instructor(
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let id = parse_id(&path)?;
    let instructor = CatalogStore::<Instructor>::get_entry(data.store(), id)
        .await?
        .ok_or_else(|| ApiError::not_found("Instructor not found"))?;
    Ok(HttpResponse::Ok().json(InstructorView::from(instructor)))
}

/// POST /instructors  (multipart, optional `image`)
pub async fn create_instructor(
    data: web::Data<AppState>,
    _admin: AdminUser,
    payload: Multipart,
) -> ApiResult<HttpResponse> {
    let mut form = Form::read(payload, data.config.max_upload_bytes).await?;
    let name = form.required("name")?;
    let description = form.value("description").unwrap_or_default();
    let years = form.list("years")?.unwrap_or_default();
    let internships = internships(&form)?.unwrap_or_default();

    let image = match form.take_file("image") {
        Some(bytes) => data.media().upload(bytes, folders::INSTRUCTORS).await?,
        None => String::new(),
    };

    let now = Utc::now();
    let created = CatalogStore::<Instructor>::insert_entry(
        data.store(),
        Instructor {
            id: None,
            name,
            image,
            description,
            years,
            internships,
            created_at: now,
            updated_at: now,
        },
    )
    .await?;
    info!("Instructor created {}", created.name);
    Ok(HttpResponse::Created().json(InstructorView::from(created)))
}

/// PUT /instructors/{id}  (multipart)
pub async fn update_instructor(
    data: web::Data<AppState>,
    _admin: AdminUser,
    path: web::Path<String>,
    payload: Multipart,
) -> ApiResult<HttpResponse> {
    let id = parse_id(&path)?;
    let mut form = Form::read(payload, data.config.max_upload_bytes).await?;
    let mut instructor = CatalogStore::<Instructor>::get_entry(data.store(), id)
        .await?
        .ok_or_else(|| ApiError::not_found("Instructor not found"))?;

    if let Some(name) = form.value("name") {
        instructor.name = name;
    }
    if let Some(description) = form.text("description") {
        instructor.description = description.to_string();
    }
    if let Some(years) = form.list("years")? {
        instructor.years = years;
    }
    if let Some(internships) = internships(&form)? {
        instructor.internships = internships;
    }
    let replaced = match form.take_file("image") {
        Some(bytes) => {
            let url = data.media().upload(bytes, folders::INSTRUCTORS).await?;
            Some(std::mem::replace(&mut instructor.image, url))
        }
        None => None,
    };
    instructor.updated_at = Utc::now();

    if !CatalogStore::<Instructor>::save_entry(data.store(), &instructor).await? {
        return Err(ApiError::not_found("Instructor not found"));
    }
    if let Some(old) = replaced {
        media::discard(data.media(), &old).await;
    }
    Ok(HttpResponse::Ok().json(InstructorView::from(instructor)))
}

/// DELETE /instructors/{id}
pub async fn delete_instructor(
    data: web::Data<AppState>,
    _admin: AdminUser,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let id = parse_id(&path)?;
    let removed = CatalogStore::<Instructor>::delete_entry(data.store(), id)
        .await?
        .ok_or_else(|| ApiError::not_found("Instructor not found"))?;
    media::discard(data.media(), &removed.image).await;
    info!("Instructor deleted {}", removed.name);
    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "Instructor deleted successfully" })))
}
