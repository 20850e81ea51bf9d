// src/store/mod.rs
//
// Data access. Every collection is reached through one of these traits so the
// services above them run unchanged against MongoDB or the test store.

pub mod mongo;

#[cfg(test)]
pub mod memory;

use async_trait::async_trait;
use mongodb::bson::{doc, oid::ObjectId, Document, Regex};
use serde::{de::DeserializeOwned, Serialize};

use crate::error::ApiResult;
use crate::models::{
    Award, HomepageKind, HomepageSection, Instructor, Internship, Membership, Project, User,
    Yearbook,
};

pub use mongo::MongoStore;

/// A document type with its own collection.
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + Unpin + 'static {
    const COLLECTION: &'static str;

    fn id(&self) -> Option<ObjectId>;
    fn set_id(&mut self, id: ObjectId);
}

/// Admin-managed reference data: internships, instructors, awards.
pub trait CatalogEntry: Entity {
    /// Field holding the list of years, when the entry has one.
    const YEARS_FIELD: Option<&'static str> = None;
    const NEWEST_FIRST: bool = false;
    const LABEL: &'static str;

    fn name(&self) -> &str;

    fn years(&self) -> &[i32] {
        &[]
    }

    /// URL of the uploaded image owned by this entry, if any.
    fn image(&self) -> Option<&str> {
        None
    }
}

macro_rules! entity {
    ($ty:ty, $coll:literal) => {
        impl Entity for $ty {
            const COLLECTION: &'static str = $coll;

            fn id(&self) -> Option<ObjectId> {
                self.id
            }

            fn set_id(&mut self, id: ObjectId) {
                self.id = Some(id);
            }
        }
    };
}

entity!(User, "users");
entity!(Project, "projects");
entity!(Membership, "memberships");
entity!(Yearbook, "yearbooks");
entity!(Internship, "internships");
entity!(Instructor, "instructors");
entity!(Award, "awards");

pub const HOMEPAGE_COLLECTION: &str = "homepages";

impl CatalogEntry for Internship {
    const YEARS_FIELD: Option<&'static str> = Some("years");
    const LABEL: &'static str = "Internship";

    fn name(&self) -> &str {
        &self.name
    }

    fn years(&self) -> &[i32] {
        &self.years
    }
}

impl CatalogEntry for Instructor {
    const YEARS_FIELD: Option<&'static str> = Some("years");
    const LABEL: &'static str = "Instructor";

    fn name(&self) -> &str {
        &self.name
    }

    fn years(&self) -> &[i32] {
        &self.years
    }

    fn image(&self) -> Option<&str> {
        (!self.image.is_empty()).then_some(self.image.as_str())
    }
}

impl CatalogEntry for Award {
    const NEWEST_FIRST: bool = true;
    const LABEL: &'static str = "Award";

    fn name(&self) -> &str {
        &self.name
    }

    fn image(&self) -> Option<&str> {
        (!self.image.is_empty()).then_some(self.image.as_str())
    }
}

/// Additive (AND-combined) project filters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectQuery {
    pub year: Option<i32>,
    pub internship: Option<ObjectId>,
    /// Only projects holding at least one award.
    pub awarded: bool,
    /// Case-insensitive substring over name and description.
    pub search: Option<String>,
}

impl ProjectQuery {
    pub fn to_filter(&self) -> Document {
        let mut filter = doc! {};
        if let Some(year) = self.year {
            filter.insert("year", year);
        }
        if let Some(internship) = self.internship {
            filter.insert("internship", internship);
        }
        if self.awarded {
            filter.insert("awards.0", doc! { "$exists": true });
        }
        if let Some(term) = self.search.as_deref().filter(|t| !t.is_empty()) {
            let pattern = Regex {
                pattern: regex::escape(term),
                options: "i".to_string(),
            };
            filter.insert(
                "$or",
                vec![
                    doc! { "name": pattern.clone() },
                    doc! { "description": pattern },
                ],
            );
        }
        filter
    }

    /// In-process twin of [`to_filter`](Self::to_filter).
    pub fn matches(&self, p: &Project) -> bool {
        if self.year.is_some_and(|y| y != p.year) {
            return false;
        }
        if self.internship.is_some() && self.internship != p.internship {
            return false;
        }
        if self.awarded && p.awards.is_empty() {
            return false;
        }
        match self.search.as_deref().filter(|t| !t.is_empty()) {
            Some(term) => {
                let term = term.to_lowercase();
                [&p.name, &p.description]
                    .iter()
                    .any(|field| field.to_lowercase().contains(&term))
            }
            None => true,
        }
    }
}

/// A slice of a listing: `skip` documents, then at most `limit`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Window {
    pub skip: u64,
    pub limit: i64,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn count_users(&self) -> ApiResult<u64>;
    async fn find_user(&self, id: ObjectId) -> ApiResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> ApiResult<Option<User>>;
    async fn list_users(&self, year: Option<i32>) -> ApiResult<Vec<User>>;
    async fn users_by_emails(&self, emails: &[String]) -> ApiResult<Vec<User>>;
    /// Fails with `Conflict` when the email is taken.
    async fn insert_user(&self, user: User) -> ApiResult<User>;
    /// Replaces the stored user; `false` when it no longer exists.
    async fn save_user(&self, user: &User) -> ApiResult<bool>;
    async fn delete_user(&self, id: ObjectId) -> ApiResult<Option<User>>;
}

#[async_trait]
pub trait ProjectStore: Send + Sync {
    async fn find_project(&self, id: ObjectId) -> ApiResult<Option<Project>>;
    async fn query_projects(
        &self,
        query: &ProjectQuery,
        window: Option<Window>,
    ) -> ApiResult<Vec<Project>>;
    async fn count_projects(&self, query: &ProjectQuery) -> ApiResult<u64>;
    async fn insert_project(&self, project: Project) -> ApiResult<Project>;
    async fn save_project(&self, project: &Project) -> ApiResult<bool>;
    async fn delete_project(&self, id: ObjectId) -> ApiResult<Option<Project>>;

    /// The project a user belongs to, read from the membership relation.
    async fn project_of(&self, user: ObjectId) -> ApiResult<Option<ObjectId>>;
    /// Fails with `Conflict` when the user already has a membership.
    async fn add_membership(&self, user: ObjectId, project: ObjectId) -> ApiResult<()>;
    /// Returns the project the user was removed from.
    async fn remove_membership(&self, user: ObjectId) -> ApiResult<Option<ObjectId>>;
    async fn remove_project_memberships(&self, project: ObjectId) -> ApiResult<u64>;
    async fn push_member(&self, project: ObjectId, user: ObjectId) -> ApiResult<bool>;
    async fn pull_member(&self, project: ObjectId, user: ObjectId) -> ApiResult<bool>;
}

#[async_trait]
pub trait YearbookStore: Send + Sync {
    /// Newest year first.
    async fn list_yearbooks(&self) -> ApiResult<Vec<Yearbook>>;
    async fn active_yearbook(&self) -> ApiResult<Option<Yearbook>>;
    async fn latest_yearbook(&self) -> ApiResult<Option<Yearbook>>;
    async fn find_yearbook(&self, id: ObjectId) -> ApiResult<Option<Yearbook>>;
    async fn find_yearbook_by_year(&self, year: i32) -> ApiResult<Option<Yearbook>>;
    async fn insert_yearbook(&self, yearbook: Yearbook) -> ApiResult<Yearbook>;
    async fn save_yearbook(&self, yearbook: &Yearbook) -> ApiResult<bool>;
    /// Clears the active flag everywhere except on `keep`.
    async fn deactivate_yearbooks(&self, keep: Option<ObjectId>) -> ApiResult<u64>;
    async fn delete_yearbook(&self, id: ObjectId) -> ApiResult<Option<Yearbook>>;
}

#[async_trait]
pub trait CatalogStore<T: CatalogEntry>: Send + Sync {
    async fn list_entries(&self, year: Option<i32>) -> ApiResult<Vec<T>>;
    async fn get_entry(&self, id: ObjectId) -> ApiResult<Option<T>>;
    async fn entries_by_ids(&self, ids: &[ObjectId]) -> ApiResult<Vec<T>>;
    async fn find_entry_by_name(&self, name: &str) -> ApiResult<Option<T>>;
    async fn insert_entry(&self, entry: T) -> ApiResult<T>;
    async fn save_entry(&self, entry: &T) -> ApiResult<bool>;
    async fn delete_entry(&self, id: ObjectId) -> ApiResult<Option<T>>;
}

#[async_trait]
pub trait HomepageStore: Send + Sync {
    async fn list_sections(&self) -> ApiResult<Vec<HomepageSection>>;
    /// Fails with `Conflict` when a section of that kind exists.
    async fn insert_section(&self, section: HomepageSection) -> ApiResult<HomepageSection>;
    async fn update_section(
        &self,
        kind: HomepageKind,
        videos: Option<Vec<String>>,
        text: Option<String>,
    ) -> ApiResult<Option<HomepageSection>>;
}

/// Everything the handlers need from persistence.
pub trait Store:
    UserStore
    + ProjectStore
    + YearbookStore
    + CatalogStore<Internship>
    + CatalogStore<Instructor>
    + CatalogStore<Award>
    + HomepageStore
{
}

impl<S> Store for S where
    S: UserStore
        + ProjectStore
        + YearbookStore
        + CatalogStore<Internship>
        + CatalogStore<Instructor>
        + CatalogStore<Award>
        + HomepageStore
{
}
