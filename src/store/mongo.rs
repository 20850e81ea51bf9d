// src/store/mongo.rs

use async_trait::async_trait;
use futures::stream::TryStreamExt;
use log::info;
use mongodb::bson::{doc, oid::ObjectId, Document};
use mongodb::options::{ClientOptions, IndexOptions, ReturnDocument};
use mongodb::{Client, Collection, Database, IndexModel};

use crate::error::{ApiError, ApiResult};
use crate::models::{HomepageKind, HomepageSection, Membership, Project, User, Yearbook};

use super::{
    CatalogEntry, CatalogStore, Entity, HomepageStore, ProjectQuery, ProjectStore, UserStore,
    Window, YearbookStore, HOMEPAGE_COLLECTION,
};

#[derive(Clone)]
pub struct MongoStore {
    pub client: Client,
    pub db: Database,
}

impl MongoStore {
    pub async fn connect(uri: &str, db_name: &str) -> ApiResult<Self> {
        let client_options = ClientOptions::parse(uri).await?;
        let client = Client::with_options(client_options)?;
        let db = client.database(db_name);
        Ok(MongoStore { client, db })
    }

    /// Creates the unique indexes the invariants lean on. Safe to repeat.
    pub async fn ensure_indexes(&self) -> ApiResult<()> {
        let unique = [
            (User::COLLECTION, "email"),
            (Yearbook::COLLECTION, "year"),
            (HOMEPAGE_COLLECTION, "type"),
            (Membership::COLLECTION, "user"),
        ];
        for (collection, field) in unique {
            let model = IndexModel::builder()
                .keys(doc! { field: 1 })
                .options(IndexOptions::builder().unique(true).build())
                .build();
            self.db
                .collection::<Document>(collection)
                .create_index(model)
                .await?;
            info!("Unique index ensured on {}.{}", collection, field);
        }
        Ok(())
    }

    fn coll<T: Entity>(&self) -> Collection<T> {
        self.db.collection::<T>(T::COLLECTION)
    }

    async fn find_many<T: Entity>(
        &self,
        filter: Document,
        sort: Option<Document>,
        window: Option<Window>,
    ) -> ApiResult<Vec<T>> {
        let coll = self.coll::<T>();
        let mut find = coll.find(filter);
        if let Some(sort) = sort {
            find = find.sort(sort);
        }
        if let Some(w) = window {
            find = find.skip(w.skip).limit(w.limit);
        }
        Ok(find.await?.try_collect().await?)
    }

    async fn find_by_id<T: Entity>(&self, id: ObjectId) -> ApiResult<Option<T>> {
        Ok(self.coll::<T>().find_one(doc! { "_id": id }).await?)
    }

    /// Inserts and hands back the entity with its new id. Duplicate keys
    /// surface as `Conflict(conflict)`.
    async fn insert<T: Entity>(&self, mut entity: T, conflict: &str) -> ApiResult<T> {
        let res = self
            .coll::<T>()
            .insert_one(&entity)
            .await
            .map_err(|e| ApiError::from_write(e, conflict))?;
        let id = res
            .inserted_id
            .as_object_id()
            .ok_or_else(|| ApiError::Internal("inserted id is not an ObjectId".into()))?;
        entity.set_id(id);
        Ok(entity)
    }

    async fn replace<T: Entity>(&self, entity: &T, conflict: &str) -> ApiResult<bool> {
        let id = entity
            .id()
            .ok_or_else(|| ApiError::Internal(format!("{} without id", T::COLLECTION)))?;
        let res = self
            .coll::<T>()
            .replace_one(doc! { "_id": id }, entity)
            .await
            .map_err(|e| ApiError::from_write(e, conflict))?;
        Ok(res.matched_count == 1)
    }

    async fn remove<T: Entity>(&self, id: ObjectId) -> ApiResult<Option<T>> {
        Ok(self
            .coll::<T>()
            .find_one_and_delete(doc! { "_id": id })
            .await?)
    }
}

#[async_trait]
impl UserStore for MongoStore {
    async fn count_users(&self) -> ApiResult<u64> {
        Ok(self.coll::<User>().count_documents(doc! {}).await?)
    }

    async fn find_user(&self, id: ObjectId) -> ApiResult<Option<User>> {
        self.find_by_id(id).await
    }

    async fn find_user_by_email(&self, email: &str) -> ApiResult<Option<User>> {
        Ok(self.coll::<User>().find_one(doc! { "email": email }).await?)
    }

    async fn list_users(&self, year: Option<i32>) -> ApiResult<Vec<User>> {
        let filter = match year {
            Some(y) => doc! { "year": y },
            None => doc! {},
        };
        self.find_many(filter, Some(doc! { "email": 1 }), None).await
    }

    async fn users_by_emails(&self, emails: &[String]) -> ApiResult<Vec<User>> {
        self.find_many(doc! { "email": { "$in": emails.to_vec() } }, None, None)
            .await
    }

    async fn insert_user(&self, user: User) -> ApiResult<User> {
        self.insert(user, "Email already in use").await
    }

    async fn save_user(&self, user: &User) -> ApiResult<bool> {
        self.replace(user, "Email already in use").await
    }

    async fn delete_user(&self, id: ObjectId) -> ApiResult<Option<User>> {
        self.remove(id).await
    }
}

#[async_trait]
impl ProjectStore for MongoStore {
    async fn find_project(&self, id: ObjectId) -> ApiResult<Option<Project>> {
        self.find_by_id(id).await
    }

    async fn query_projects(
        &self,
        query: &ProjectQuery,
        window: Option<Window>,
    ) -> ApiResult<Vec<Project>> {
        // Stable order so pages do not overlap.
        self.find_many(query.to_filter(), Some(doc! { "_id": 1 }), window)
            .await
    }

    async fn count_projects(&self, query: &ProjectQuery) -> ApiResult<u64> {
        Ok(self
            .coll::<Project>()
            .count_documents(query.to_filter())
            .await?)
    }

    async fn insert_project(&self, project: Project) -> ApiResult<Project> {
        self.insert(project, "Project already exists").await
    }

    async fn save_project(&self, project: &Project) -> ApiResult<bool> {
        self.replace(project, "Project already exists").await
    }

    async fn delete_project(&self, id: ObjectId) -> ApiResult<Option<Project>> {
        self.remove(id).await
    }

    async fn project_of(&self, user: ObjectId) -> ApiResult<Option<ObjectId>> {
        Ok(self
            .coll::<Membership>()
            .find_one(doc! { "user": user })
            .await?
            .map(|m| m.project))
    }

    async fn add_membership(&self, user: ObjectId, project: ObjectId) -> ApiResult<()> {
        let membership = Membership {
            id: None,
            user,
            project,
            joined_at: chrono::Utc::now(),
        };
        self.insert(membership, "User already assigned to a project")
            .await
            .map(|_| ())
    }

    async fn remove_membership(&self, user: ObjectId) -> ApiResult<Option<ObjectId>> {
        Ok(self
            .coll::<Membership>()
            .find_one_and_delete(doc! { "user": user })
            .await?
            .map(|m| m.project))
    }

    async fn remove_project_memberships(&self, project: ObjectId) -> ApiResult<u64> {
        let res = self
            .coll::<Membership>()
            .delete_many(doc! { "project": project })
            .await?;
        Ok(res.deleted_count)
    }

    async fn push_member(&self, project: ObjectId, user: ObjectId) -> ApiResult<bool> {
        let res = self
            .coll::<Project>()
            .update_one(
                doc! { "_id": project },
                doc! { "$addToSet": { "members": user } },
            )
            .await?;
        Ok(res.matched_count == 1)
    }

    async fn pull_member(&self, project: ObjectId, user: ObjectId) -> ApiResult<bool> {
        let res = self
            .coll::<Project>()
            .update_one(doc! { "_id": project }, doc! { "$pull": { "members": user } })
            .await?;
        Ok(res.matched_count == 1)
    }
}

#[async_trait]
impl YearbookStore for MongoStore {
    async fn list_yearbooks(&self) -> ApiResult<Vec<Yearbook>> {
        self.find_many(doc! {}, Some(doc! { "year": -1 }), None).await
    }

    async fn active_yearbook(&self) -> ApiResult<Option<Yearbook>> {
        Ok(self
            .coll::<Yearbook>()
            .find_one(doc! { "active": true })
            .await?)
    }

    async fn latest_yearbook(&self) -> ApiResult<Option<Yearbook>> {
        Ok(self
            .coll::<Yearbook>()
            .find_one(doc! {})
            .sort(doc! { "year": -1 })
            .await?)
    }

    async fn find_yearbook(&self, id: ObjectId) -> ApiResult<Option<Yearbook>> {
        self.find_by_id(id).await
    }

    async fn find_yearbook_by_year(&self, year: i32) -> ApiResult<Option<Yearbook>> {
        Ok(self
            .coll::<Yearbook>()
            .find_one(doc! { "year": year })
            .await?)
    }

    async fn insert_yearbook(&self, yearbook: Yearbook) -> ApiResult<Yearbook> {
        self.insert(yearbook, "Yearbook already exists").await
    }

    async fn save_yearbook(&self, yearbook: &Yearbook) -> ApiResult<bool> {
        self.replace(yearbook, "Yearbook already exists").await
    }

    async fn deactivate_yearbooks(&self, keep: Option<ObjectId>) -> ApiResult<u64> {
        let mut filter = doc! { "active": true };
        if let Some(id) = keep {
            filter.insert("_id", doc! { "$ne": id });
        }
        let res = self
            .coll::<Yearbook>()
            .update_many(filter, doc! { "$set": { "active": false } })
            .await?;
        Ok(res.modified_count)
    }

    async fn delete_yearbook(&self, id: ObjectId) -> ApiResult<Option<Yearbook>> {
        self.remove(id).await
    }
}

#[async_trait]
impl<T: CatalogEntry> CatalogStore<T> for MongoStore {
    async fn list_entries(&self, year: Option<i32>) -> ApiResult<Vec<T>> {
        let filter = match (T::YEARS_FIELD, year) {
            (Some(field), Some(y)) => doc! { field: y },
            _ => doc! {},
        };
        let sort = if T::NEWEST_FIRST {
            doc! { "_id": -1 }
        } else {
            doc! { "_id": 1 }
        };
        self.find_many(filter, Some(sort), None).await
    }

    async fn get_entry(&self, id: ObjectId) -> ApiResult<Option<T>> {
        self.find_by_id(id).await
    }

    async fn entries_by_ids(&self, ids: &[ObjectId]) -> ApiResult<Vec<T>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.find_many(doc! { "_id": { "$in": ids.to_vec() } }, None, None)
            .await
    }

    async fn find_entry_by_name(&self, name: &str) -> ApiResult<Option<T>> {
        Ok(self.coll::<T>().find_one(doc! { "name": name }).await?)
    }

    async fn insert_entry(&self, entry: T) -> ApiResult<T> {
        let conflict = format!("{} already exists", T::LABEL);
        self.insert(entry, &conflict).await
    }

    async fn save_entry(&self, entry: &T) -> ApiResult<bool> {
        let conflict = format!("{} already exists", T::LABEL);
        self.replace(entry, &conflict).await
    }

    async fn delete_entry(&self, id: ObjectId) -> ApiResult<Option<T>> {
        self.remove(id).await
    }
}

#[async_trait]
impl HomepageStore for MongoStore {
    async fn list_sections(&self) -> ApiResult<Vec<HomepageSection>> {
        Ok(self
            .db
            .collection::<HomepageSection>(HOMEPAGE_COLLECTION)
            .find(doc! {})
            .await?
            .try_collect()
            .await?)
    }

    async fn insert_section(&self, section: HomepageSection) -> ApiResult<HomepageSection> {
        self.db
            .collection::<HomepageSection>(HOMEPAGE_COLLECTION)
            .insert_one(&section)
            .await
            .map_err(|e| ApiError::from_write(e, "Record of this type already exists"))?;
        Ok(section)
    }

    async fn update_section(
        &self,
        kind: HomepageKind,
        videos: Option<Vec<String>>,
        text: Option<String>,
    ) -> ApiResult<Option<HomepageSection>> {
        let mut set = Document::new();
        if let Some(videos) = videos {
            set.insert("videos", videos);
        }
        if let Some(text) = text {
            set.insert("text", text);
        }
        let coll = self.db.collection::<HomepageSection>(HOMEPAGE_COLLECTION);
        let filter = doc! { "type": kind.as_str() };
        if set.is_empty() {
            return Ok(coll.find_one(filter).await?);
        }
        Ok(coll
            .find_one_and_update(filter, doc! { "$set": set })
            .return_document(ReturnDocument::After)
            .await?)
    }
}
