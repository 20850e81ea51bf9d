// src/store/memory.rs
//
// In-process store used by unit tests. Mirrors the unique indexes of the
// Mongo deployment so invariant violations fail the same way.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use mongodb::bson::{from_document, oid::ObjectId, to_document, Document};

use crate::error::{ApiError, ApiResult};
use crate::models::{HomepageKind, HomepageSection, Project, User, Yearbook};

use super::{
    CatalogEntry, CatalogStore, HomepageStore, ProjectQuery, ProjectStore, UserStore, Window,
    YearbookStore,
};

#[derive(Default)]
pub struct MemoryStore {
    users: Mutex<Vec<User>>,
    projects: Mutex<Vec<Project>>,
    /// user -> project
    memberships: Mutex<HashMap<ObjectId, ObjectId>>,
    yearbooks: Mutex<Vec<Yearbook>>,
    catalog: Mutex<HashMap<&'static str, Vec<Document>>>,
    homepage: Mutex<Vec<HomepageSection>>,
    /// Makes `push_member` fail, as a dropped connection would.
    broken_member_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn break_member_writes(&self) {
        self.broken_member_writes.store(true, Ordering::SeqCst);
    }
}

fn window<T>(items: Vec<T>, window: Option<Window>) -> Vec<T> {
    match window {
        Some(w) => items
            .into_iter()
            .skip(w.skip as usize)
            .take(w.limit.max(0) as usize)
            .collect(),
        None => items,
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn count_users(&self) -> ApiResult<u64> {
        Ok(self.users.lock().unwrap().len() as u64)
    }

    async fn find_user(&self, id: ObjectId) -> ApiResult<Option<User>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.id == Some(id))
            .cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> ApiResult<Option<User>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn list_users(&self, year: Option<i32>) -> ApiResult<Vec<User>> {
        let mut users: Vec<User> = self
            .users
            .lock()
            .unwrap()
            .iter()
            .filter(|u| year.map_or(true, |y| u.year == y))
            .cloned()
            .collect();
        users.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(users)
    }

    async fn users_by_emails(&self, emails: &[String]) -> ApiResult<Vec<User>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .filter(|u| emails.contains(&u.email))
            .cloned()
            .collect())
    }

    async fn insert_user(&self, mut user: User) -> ApiResult<User> {
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.email == user.email) {
            return Err(ApiError::conflict("Email already in use"));
        }
        user.id = Some(ObjectId::new());
        users.push(user.clone());
        Ok(user)
    }

    async fn save_user(&self, user: &User) -> ApiResult<bool> {
        let mut users = self.users.lock().unwrap();
        if users
            .iter()
            .any(|u| u.email == user.email && u.id != user.id)
        {
            return Err(ApiError::conflict("Email already in use"));
        }
        match users.iter_mut().find(|u| u.id == user.id) {
            Some(slot) => {
                *slot = user.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_user(&self, id: ObjectId) -> ApiResult<Option<User>> {
        let mut users = self.users.lock().unwrap();
        let pos = users.iter().position(|u| u.id == Some(id));
        Ok(pos.map(|i| users.remove(i)))
    }
}

#[async_trait]
impl ProjectStore for MemoryStore {
    async fn find_project(&self, id: ObjectId) -> ApiResult<Option<Project>> {
        Ok(self
            .projects
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id == Some(id))
            .cloned())
    }

    async fn query_projects(
        &self,
        query: &ProjectQuery,
        win: Option<Window>,
    ) -> ApiResult<Vec<Project>> {
        let matching: Vec<Project> = self
            .projects
            .lock()
            .unwrap()
            .iter()
            .filter(|p| query.matches(p))
            .cloned()
            .collect();
        Ok(window(matching, win))
    }

    async fn count_projects(&self, query: &ProjectQuery) -> ApiResult<u64> {
        Ok(self
            .projects
            .lock()
            .unwrap()
            .iter()
            .filter(|p| query.matches(p))
            .count() as u64)
    }

    async fn insert_project(&self, mut project: Project) -> ApiResult<Project> {
        project.id = Some(ObjectId::new());
        self.projects.lock().unwrap().push(project.clone());
        Ok(project)
    }

    async fn save_project(&self, project: &Project) -> ApiResult<bool> {
        let mut projects = self.projects.lock().unwrap();
        match projects.iter_mut().find(|p| p.id == project.id) {
            Some(slot) => {
                *slot = project.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_project(&self, id: ObjectId) -> ApiResult<Option<Project>> {
        let mut projects = self.projects.lock().unwrap();
        let pos = projects.iter().position(|p| p.id == Some(id));
        Ok(pos.map(|i| projects.remove(i)))
    }

    async fn project_of(&self, user: ObjectId) -> ApiResult<Option<ObjectId>> {
        Ok(self.memberships.lock().unwrap().get(&user).copied())
    }

    async fn add_membership(&self, user: ObjectId, project: ObjectId) -> ApiResult<()> {
        let mut memberships = self.memberships.lock().unwrap();
        if memberships.contains_key(&user) {
            return Err(ApiError::conflict("User already assigned to a project"));
        }
        memberships.insert(user, project);
        Ok(())
    }

    async fn remove_membership(&self, user: ObjectId) -> ApiResult<Option<ObjectId>> {
        Ok(self.memberships.lock().unwrap().remove(&user))
    }

    async fn remove_project_memberships(&self, project: ObjectId) -> ApiResult<u64> {
        let mut memberships = self.memberships.lock().unwrap();
        let before = memberships.len();
        memberships.retain(|_, p| *p != project);
        Ok((before - memberships.len()) as u64)
    }

    async fn push_member(&self, project: ObjectId, user: ObjectId) -> ApiResult<bool> {
        if self.broken_member_writes.load(Ordering::SeqCst) {
            return Err(ApiError::Internal("member write failed".into()));
        }
        let mut projects = self.projects.lock().unwrap();
        match projects.iter_mut().find(|p| p.id == Some(project)) {
            Some(p) => {
                if !p.members.contains(&user) {
                    p.members.push(user);
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn pull_member(&self, project: ObjectId, user: ObjectId) -> ApiResult<bool> {
        let mut projects = self.projects.lock().unwrap();
        match projects.iter_mut().find(|p| p.id == Some(project)) {
            Some(p) => {
                p.members.retain(|m| *m != user);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl YearbookStore for MemoryStore {
    async fn list_yearbooks(&self) -> ApiResult<Vec<Yearbook>> {
        let mut all = self.yearbooks.lock().unwrap().clone();
        all.sort_by(|a, b| b.year.cmp(&a.year));
        Ok(all)
    }

    async fn active_yearbook(&self) -> ApiResult<Option<Yearbook>> {
        Ok(self
            .yearbooks
            .lock()
            .unwrap()
            .iter()
            .find(|y| y.active)
            .cloned())
    }

    async fn latest_yearbook(&self) -> ApiResult<Option<Yearbook>> {
        Ok(self
            .yearbooks
            .lock()
            .unwrap()
            .iter()
            .max_by_key(|y| y.year)
            .cloned())
    }

    async fn find_yearbook(&self, id: ObjectId) -> ApiResult<Option<Yearbook>> {
        Ok(self
            .yearbooks
            .lock()
            .unwrap()
            .iter()
            .find(|y| y.id == Some(id))
            .cloned())
    }

    async fn find_yearbook_by_year(&self, year: i32) -> ApiResult<Option<Yearbook>> {
        Ok(self
            .yearbooks
            .lock()
            .unwrap()
            .iter()
            .find(|y| y.year == year)
            .cloned())
    }

    async fn insert_yearbook(&self, mut yearbook: Yearbook) -> ApiResult<Yearbook> {
        let mut all = self.yearbooks.lock().unwrap();
        if all.iter().any(|y| y.year == yearbook.year) {
            return Err(ApiError::conflict("Yearbook already exists"));
        }
        yearbook.id = Some(ObjectId::new());
        all.push(yearbook.clone());
        Ok(yearbook)
    }

    async fn save_yearbook(&self, yearbook: &Yearbook) -> ApiResult<bool> {
        let mut all = self.yearbooks.lock().unwrap();
        if all
            .iter()
            .any(|y| y.year == yearbook.year && y.id != yearbook.id)
        {
            return Err(ApiError::conflict("Yearbook already exists"));
        }
        match all.iter_mut().find(|y| y.id == yearbook.id) {
            Some(slot) => {
                *slot = yearbook.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn deactivate_yearbooks(&self, keep: Option<ObjectId>) -> ApiResult<u64> {
        let mut changed = 0;
        for y in self.yearbooks.lock().unwrap().iter_mut() {
            if y.active && (keep.is_none() || y.id != keep) {
                y.active = false;
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn delete_yearbook(&self, id: ObjectId) -> ApiResult<Option<Yearbook>> {
        let mut all = self.yearbooks.lock().unwrap();
        let pos = all.iter().position(|y| y.id == Some(id));
        Ok(pos.map(|i| all.remove(i)))
    }
}

impl MemoryStore {
    fn entries<T: CatalogEntry>(&self) -> ApiResult<Vec<T>> {
        let catalog = self.catalog.lock().unwrap();
        catalog
            .get(T::COLLECTION)
            .map(|docs| docs.as_slice())
            .unwrap_or_default()
            .iter()
            .map(|d| {
                from_document(d.clone()).map_err(|e| ApiError::Internal(e.to_string()))
            })
            .collect()
    }

    fn write_entries<T: CatalogEntry>(&self, entries: &[T]) -> ApiResult<()> {
        let docs = entries
            .iter()
            .map(to_document)
            .collect::<Result<Vec<_>, _>>()?;
        self.catalog.lock().unwrap().insert(T::COLLECTION, docs);
        Ok(())
    }
}

#[async_trait]
impl<T: CatalogEntry> CatalogStore<T> for MemoryStore {
    async fn list_entries(&self, year: Option<i32>) -> ApiResult<Vec<T>> {
        let mut entries: Vec<T> = self
            .entries::<T>()?
            .into_iter()
            .filter(|e| match (T::YEARS_FIELD, year) {
                (Some(_), Some(y)) => e.years().contains(&y),
                _ => true,
            })
            .collect();
        if T::NEWEST_FIRST {
            entries.reverse();
        }
        Ok(entries)
    }

    async fn get_entry(&self, id: ObjectId) -> ApiResult<Option<T>> {
        Ok(self
            .entries::<T>()?
            .into_iter()
            .find(|e| e.id() == Some(id)))
    }

    async fn entries_by_ids(&self, ids: &[ObjectId]) -> ApiResult<Vec<T>> {
        Ok(self
            .entries::<T>()?
            .into_iter()
            .filter(|e| e.id().is_some_and(|id| ids.contains(&id)))
            .collect())
    }

    async fn find_entry_by_name(&self, name: &str) -> ApiResult<Option<T>> {
        Ok(self.entries::<T>()?.into_iter().find(|e| e.name() == name))
    }

    async fn insert_entry(&self, mut entry: T) -> ApiResult<T> {
        let mut entries = self.entries::<T>()?;
        entry.set_id(ObjectId::new());
        entries.push(entry.clone());
        self.write_entries(&entries)?;
        Ok(entry)
    }

    async fn save_entry(&self, entry: &T) -> ApiResult<bool> {
        let mut entries = self.entries::<T>()?;
        let Some(slot) = entries.iter_mut().find(|e| e.id() == entry.id()) else {
            return Ok(false);
        };
        *slot = entry.clone();
        self.write_entries(&entries)?;
        Ok(true)
    }

    async fn delete_entry(&self, id: ObjectId) -> ApiResult<Option<T>> {
        let mut entries = self.entries::<T>()?;
        let Some(pos) = entries.iter().position(|e| e.id() == Some(id)) else {
            return Ok(None);
        };
        let removed = entries.remove(pos);
        self.write_entries(&entries)?;
        Ok(Some(removed))
    }
}

#[async_trait]
impl HomepageStore for MemoryStore {
    async fn list_sections(&self) -> ApiResult<Vec<HomepageSection>> {
        Ok(self.homepage.lock().unwrap().clone())
    }

    async fn insert_section(&self, section: HomepageSection) -> ApiResult<HomepageSection> {
        let mut sections = self.homepage.lock().unwrap();
        if sections.iter().any(|s| s.kind == section.kind) {
            return Err(ApiError::conflict("Record of this type already exists"));
        }
        sections.push(section.clone());
        Ok(section)
    }

    async fn update_section(
        &self,
        kind: HomepageKind,
        videos: Option<Vec<String>>,
        text: Option<String>,
    ) -> ApiResult<Option<HomepageSection>> {
        let mut sections = self.homepage.lock().unwrap();
        let Some(section) = sections.iter_mut().find(|s| s.kind == kind) else {
            return Ok(None);
        };
        if let Some(videos) = videos {
            section.videos = videos;
        }
        if let Some(text) = text {
            section.text = text;
        }
        Ok(Some(section.clone()))
    }
}
