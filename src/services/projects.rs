// src/services/projects.rs

use std::collections::HashMap;

use chrono::{Datelike, Utc};
use log::{info, warn};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::access;
use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::media::{self, folders, MediaStore};
use crate::models::{Award, AwardView, Internship, Project, ProjectView};
use crate::services::membership;
use crate::store::{CatalogStore, ProjectQuery, ProjectStore, Store, Window};

pub const PAGE_SIZE: u64 = 6;

/// Query string of the paginated listing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    pub page: Option<u64>,
    pub year: Option<i32>,
    pub search: Option<String>,
    /// `awarded`, `all` or an internship name.
    pub filter: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProjectPage {
    pub projects: Vec<ProjectView>,
    #[serde(rename = "nextPage")]
    pub next_page: Option<u64>,
}

impl ProjectPage {
    fn empty() -> Self {
        Self {
            projects: Vec::new(),
            next_page: None,
        }
    }
}

/// Turns listing parameters into a store query. `None` means nothing can
/// match (the internship named by `filter` does not exist).
pub async fn build_query(store: &dyn Store, params: &ListParams) -> ApiResult<Option<ProjectQuery>> {
    let mut query = ProjectQuery {
        year: params.year,
        search: params
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        ..Default::default()
    };
    match params.filter.as_deref().map(str::trim) {
        None | Some("") | Some("all") => {}
        Some("awarded") => query.awarded = true,
        Some(name) => match CatalogStore::<Internship>::find_entry_by_name(store, name).await? {
            Some(internship) => query.internship = internship.id,
            None => return Ok(None),
        },
    }
    Ok(Some(query))
}

pub async fn list_page(store: &dyn Store, params: &ListParams) -> ApiResult<ProjectPage> {
    let page = params.page.unwrap_or(0);
    let Some(query) = build_query(store, params).await? else {
        return Ok(ProjectPage::empty());
    };

    let total = store.count_projects(&query).await?;
    let skip = match page.checked_mul(PAGE_SIZE) {
        Some(skip) if skip < total => skip,
        _ => return Ok(ProjectPage::empty()),
    };
    let window = Window {
        skip,
        limit: PAGE_SIZE as i64,
    };
    let projects = store.query_projects(&query, Some(window)).await?;
    let next_page = (skip.saturating_add(PAGE_SIZE) < total).then_some(page + 1);

    Ok(ProjectPage {
        projects: with_awards(store, projects).await?,
        next_page,
    })
}

pub async fn list_all(store: &dyn Store) -> ApiResult<Vec<ProjectView>> {
    let projects = store.query_projects(&ProjectQuery::default(), None).await?;
    if projects.is_empty() {
        return Err(ApiError::not_found("No projects found."));
    }
    with_awards(store, projects).await
}

pub async fn by_internship(store: &dyn Store, internship: ObjectId) -> ApiResult<Vec<ProjectView>> {
    let query = ProjectQuery {
        internship: Some(internship),
        ..Default::default()
    };
    let projects = store.query_projects(&query, None).await?;
    with_awards(store, projects).await
}

pub async fn get(store: &dyn Store, id: ObjectId) -> ApiResult<ProjectView> {
    let project = store
        .find_project(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Project not found"))?;
    let mut views = with_awards(store, vec![project]).await?;
    views
        .pop()
        .ok_or_else(|| ApiError::Internal("project view went missing".into()))
}

/// Renders projects with their awards embedded, in each project's own
/// award order. Awards that no longer exist are left out.
pub async fn with_awards(store: &dyn Store, projects: Vec<Project>) -> ApiResult<Vec<ProjectView>> {
    let mut ids: Vec<ObjectId> = projects.iter().flat_map(|p| p.awards.iter().copied()).collect();
    ids.sort();
    ids.dedup();

    let awards: HashMap<ObjectId, AwardView> = if ids.is_empty() {
        HashMap::new()
    } else {
        CatalogStore::<Award>::entries_by_ids(store, &ids)
            .await?
            .into_iter()
            .filter_map(|a| a.id.map(|id| (id, AwardView::from(a))))
            .collect()
    };

    Ok(projects
        .into_iter()
        .map(|p| {
            let embedded = p.awards.iter().filter_map(|id| awards.get(id).cloned()).collect();
            ProjectView::new(p, embedded)
        })
        .collect())
}

/// Create/update input. `None` leaves a field as it is.
#[derive(Debug, Default)]
pub struct ProjectInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub short_description: Option<String>,
    pub internship: Option<Option<ObjectId>>,
    pub instructor: Option<Option<ObjectId>>,
    /// Blank clears the link.
    pub youtube: Option<String>,
    pub awards: Option<Vec<ObjectId>>,
    pub year: Option<i32>,
    /// Gallery URLs to keep; the rest of the current gallery is dropped.
    pub gallery: Option<Vec<String>>,
    pub image: Option<Vec<u8>>,
    pub new_gallery: Vec<Vec<u8>>,
}

pub async fn create(
    store: &dyn Store,
    media: &dyn MediaStore,
    caller: &AuthUser,
    input: ProjectInput,
) -> ApiResult<Project> {
    let name = input
        .name
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| ApiError::validation("Name is required"))?;
    let description = input
        .description
        .filter(|d| !d.trim().is_empty())
        .ok_or_else(|| ApiError::validation("Description is required"))?;
    let image = input
        .image
        .ok_or_else(|| ApiError::validation("Image is required."))?;

    let joins = !caller.is_admin();
    if joins && store.project_of(caller.id).await?.is_some() {
        return Err(ApiError::conflict("User is already assigned to a project"));
    }

    let image = media.upload(image, folders::PROJECTS).await?;
    let mut gallery = input.gallery.unwrap_or_default();
    for file in input.new_gallery {
        gallery.push(media.upload(file, folders::PROJECTS).await?);
    }

    let now = Utc::now();
    let project = store
        .insert_project(Project {
            id: None,
            name: name.trim().to_string(),
            image,
            internship: input.internship.flatten(),
            description,
            short_description: input.short_description.unwrap_or_default(),
            gallery,
            youtube: input.youtube.filter(|y| !y.trim().is_empty()),
            instructor: input.instructor.flatten(),
            members: Vec::new(),
            awards: input.awards.unwrap_or_default(),
            year: input.year.unwrap_or_else(|| now.year()),
            created_at: now,
            updated_at: now,
        })
        .await?;
    let id = project
        .id
        .ok_or_else(|| ApiError::Internal("stored project has no id".into()))?;
    info!("Project created {} by {}", id, caller.email);

    if !joins {
        return Ok(project);
    }
    match membership::assign(store, caller.id, id).await {
        Ok(joined) => Ok(joined),
        Err(e) => {
            warn!("Rolling back project {}: {}", id, e);
            store.delete_project(id).await?;
            discard_all(media, &project).await;
            Err(e)
        }
    }
}

pub async fn update(
    store: &dyn Store,
    media: &dyn MediaStore,
    caller: &AuthUser,
    id: ObjectId,
    input: ProjectInput,
) -> ApiResult<Project> {
    let mut project = store
        .find_project(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Project not found"))?;
    access::can_edit_project(caller, &project)?;

    if let Some(name) = input.name {
        if name.trim().is_empty() {
            return Err(ApiError::validation("Name cannot be empty"));
        }
        project.name = name.trim().to_string();
    }
    if let Some(description) = input.description {
        project.description = description;
    }
    if let Some(short) = input.short_description {
        project.short_description = short;
    }
    if let Some(internship) = input.internship {
        project.internship = internship;
    }
    if let Some(instructor) = input.instructor {
        project.instructor = instructor;
    }
    if let Some(youtube) = input.youtube {
        project.youtube = Some(youtube).filter(|y| !y.trim().is_empty());
    }
    if let Some(awards) = input.awards {
        project.awards = awards;
    }
    if let Some(year) = input.year {
        project.year = year;
    }

    if let Some(kept) = input.gallery {
        media::discard_removed(media, &project.gallery, &kept).await;
        project.gallery = kept;
    }
    for file in input.new_gallery {
        project.gallery.push(media.upload(file, folders::PROJECTS).await?);
    }

    let replaced = match input.image {
        Some(bytes) => {
            let url = media.upload(bytes, folders::PROJECTS).await?;
            Some(std::mem::replace(&mut project.image, url))
        }
        None => None,
    };
    project.updated_at = Utc::now();

    if !store.save_project(&project).await? {
        return Err(ApiError::not_found("Project not found"));
    }
    if let Some(old) = replaced {
        media::discard(media, &old).await;
    }
    info!("Project {} updated by {}", id, caller.email);
    Ok(project)
}

pub async fn delete(
    store: &dyn Store,
    media: &dyn MediaStore,
    caller: &AuthUser,
    id: ObjectId,
) -> ApiResult<Project> {
    if store.find_project(id).await?.is_none() {
        return Err(ApiError::not_found("Project not found"));
    }
    access::can_delete_project(caller)?;

    let project = store
        .delete_project(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Project not found"))?;
    membership::release_project(store, id).await?;
    discard_all(media, &project).await;
    info!("Project {} deleted by {}", id, caller.email);
    Ok(project)
}

async fn discard_all(media: &dyn MediaStore, project: &Project) {
    media::discard(media, &project.image).await;
    for url in &project.gallery {
        media::discard(media, url).await;
    }
}
