// src/internship.rs

use actix_web::{web, HttpResponse};
use chrono::Utc;
use log::{debug, info};
use serde::Deserialize;

use crate::app_state::AppState;
use crate::auth::AdminUser;
use crate::error::{ApiError, ApiResult};
use crate::models::{parse_id, parse_ref, Encoded, Internship, InternshipView, YearQuery};
use crate::store::CatalogStore;

/// Body of create and update. Lists may come as arrays or as their JSON text.
#[derive(Debug, Deserialize)]
pub struct InternshipInfo {
    pub name: Option<String>,
    pub years: Option<Encoded<i32>>,
    /// Blank or `null` clears the instructor.
    #[serde(default, deserialize_with = "present")]
    pub instructor: Option<Option<String>>,
    pub description: Option<String>,
    pub colors: Option<Encoded<String>>,
}

/// Distinguishes an explicit `null` from a missing field.
fn present<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

/// GET /internships?year=
pub async fn list_internships(
    data: web::Data<AppState>,
    query: web::Query<YearQuery>,
) -> ApiResult<HttpResponse> {
    let internships = CatalogStore::<Internship>::list_entries(data.store(), query.year).await?;
    let views: Vec<InternshipView> = internships.into_iter().map(InternshipView::from).collect();
    Ok(HttpResponse::Ok().json(views))
}

/// POST /internships
pub async fn create_internship(
    data: web::Data<AppState>,
    _admin: AdminUser,
    body: web::Json<InternshipInfo>,
) -> ApiResult<HttpResponse> {
    debug!("Creating internship: {:?}", body);
    let info = body.into_inner();
    let name = info
        .name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .ok_or_else(|| ApiError::validation("Field 'name' is required"))?;
    let instructor = match info.instructor {
        Some(raw) => parse_ref(raw.as_deref())?,
        None => None,
    };

    let now = Utc::now();
    let created = CatalogStore::<Internship>::insert_entry(
        data.store(),
        Internship {
            id: None,
            name,
            years: info.years.map(|y| y.decode("years")).transpose()?.unwrap_or_default(),
            instructor,
            description: info.description.unwrap_or_default(),
            colors: info.colors.map(|c| c.decode("colors")).transpose()?.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        },
    )
    .await?;
    info!("Internship created {}", created.name);
    Ok(HttpResponse::Created().json(InternshipView::from(created)))
}

/// PUT /internships/{id}
pub async fn update_internship(
    data: web::Data<AppState>,
    _admin: AdminUser,
    path: web::Path<String>,
    body: web::Json<InternshipInfo>,
) -> ApiResult<HttpResponse> {
    let id = parse_id(&path)?;
    let info = body.into_inner();
    let mut internship = CatalogStore::<Internship>::get_entry(data.store(), id)
        .await?
        .ok_or_else(|| ApiError::not_found("Internship not found"))?;

    if let Some(name) = info.name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()) {
        internship.name = name;
    }
    if let Some(years) = info.years {
        internship.years = years.decode("years")?;
    }
    if let Some(raw) = info.instructor {
        internship.instructor = parse_ref(raw.as_deref())?;
    }
    if let Some(description) = info.description {
        internship.description = description;
    }
    if let Some(colors) = info.colors {
        internship.colors = colors.decode("colors")?;
    }
    internship.updated_at = Utc::now();

    if !CatalogStore::<Internship>::save_entry(data.store(), &internship).await? {
        return Err(ApiError::not_found("Internship not found"));
    }
    Ok(HttpResponse::Ok().json(InternshipView::from(internship)))
}

/// DELETE /internships/{id}
/// Projects and users keep their (now dangling) references.
pub async fn delete_internship(
    data: web::Data<AppState>,
    _admin: AdminUser,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let id = parse_id(&path)?;
    let removed = CatalogStore::<Internship>::delete_entry(data.store(), id)
        .await?
        .ok_or_else(|| ApiError::not_found("Internship not found"))?;
    info!("Internship deleted {}", removed.name);
    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "Internship deleted successfully" })))
}

#[cfg(test)]
mod tests {
    use actix_web::http::StatusCode;
    use actix_web::test::{self, TestRequest};
    use mongodb::bson::oid::ObjectId;
    use serde_json::json;

    use crate::models::Role;
    use crate::testing::{json_body, TestContext};

    #[actix_web::test]
    async fn create_accepts_encoded_lists() {
        let ctx = TestContext::new();
        let admin = ctx.user("a@x.com", Role::Admin, 2024).await;
        let app = test_app!(ctx);
        let instructor = ObjectId::new().to_hex();

        let req = TestRequest::post()
            .uri("/internships")
            .insert_header(ctx.bearer(&admin))
            .set_json(json!({
                "name": "Web",
                "years": "[2023,2024]",
                "colors": ["#112233"],
                "instructor": instructor,
                "description": "Full stack"
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let created = json_body(resp).await;
        assert_eq!(created["years"], json!([2023, 2024]));
        assert_eq!(created["colors"], json!(["#112233"]));
        assert_eq!(created["instructor"], json!(instructor));

        let req = TestRequest::get().uri("/internships?year=2024").to_request();
        let listed = json_body(test::call_service(&app, req).await).await;
        assert_eq!(listed.as_array().unwrap().len(), 1);
        let req = TestRequest::get().uri("/internships?year=2019").to_request();
        let listed = json_body(test::call_service(&app, req).await).await;
        assert!(listed.as_array().unwrap().is_empty());
    }

    #[actix_web::test]
    async fn update_clears_instructor_and_rejects_bad_ids() {
        let ctx = TestContext::new();
        let admin = ctx.user("a@x.com", Role::Admin, 2024).await;
        let app = test_app!(ctx);

        let req = TestRequest::post()
            .uri("/internships")
            .insert_header(ctx.bearer(&admin))
            .set_json(json!({ "name": "AI", "instructor": ObjectId::new().to_hex() }))
            .to_request();
        let created = json_body(test::call_service(&app, req).await).await;
        let uri = format!("/internships/{}", created["id"].as_str().unwrap());

        let req = TestRequest::put()
            .uri(&uri)
            .insert_header(ctx.bearer(&admin))
            .set_json(json!({ "instructor": "not-an-id" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

        let req = TestRequest::put()
            .uri(&uri)
            .insert_header(ctx.bearer(&admin))
            .set_json(json!({ "instructor": "", "description": "Machine learning" }))
            .to_request();
        let updated = json_body(test::call_service(&app, req).await).await;
        assert!(updated["instructor"].is_null());
        assert_eq!(updated["name"], "AI");
        assert_eq!(updated["description"], "Machine learning");

        let req = TestRequest::delete()
            .uri(&uri)
            .insert_header(ctx.bearer(&admin))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
        let req = TestRequest::delete()
            .uri(&uri)
            .insert_header(ctx.bearer(&admin))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn anonymous_writes_are_rejected() {
        let ctx = TestContext::new();
        let app = test_app!(ctx);
        let req = TestRequest::post()
            .uri("/internships")
            .set_json(json!({ "name": "Web" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);
    }
}
