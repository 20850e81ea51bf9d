// src/services/membership.rs
//
// A user belongs to at most one project. The `memberships` relation is the
// source of truth; `Project.members` follows it.

use log::{info, warn};
use mongodb::bson::oid::ObjectId;

use crate::error::{ApiError, ApiResult};
use crate::models::Project;
use crate::store::{ProjectStore, Store, UserStore};

/// Joins `user` to `project`.
pub async fn assign(store: &dyn Store, user: ObjectId, project: ObjectId) -> ApiResult<Project> {
    if store.find_user(user).await?.is_none() {
        return Err(ApiError::not_found("User not found"));
    }
    if store.project_of(user).await?.is_some() {
        return Err(ApiError::conflict("User is already assigned to a project"));
    }
    let mut target = store
        .find_project(project)
        .await?
        .ok_or_else(|| ApiError::not_found("Project not found"))?;

    // The unique index on memberships.user settles concurrent assigns.
    store.add_membership(user, project).await?;
    match store.push_member(project, user).await {
        Ok(true) => {}
        Ok(false) => {
            store.remove_membership(user).await?;
            return Err(ApiError::not_found("Project not found"));
        }
        Err(e) => {
            warn!("Undoing membership of {} in {}: {}", user, project, e);
            store.remove_membership(user).await?;
            return Err(e);
        }
    }
    if !target.has_member(user) {
        target.members.push(user);
    }

    info!("User {} assigned to project {}", user, project);
    Ok(target)
}

/// Removes `user` from their project and returns that project's id.
pub async fn unassign(store: &dyn Store, user: ObjectId) -> ApiResult<ObjectId> {
    let project = store
        .remove_membership(user)
        .await?
        .ok_or_else(|| ApiError::not_found("User is not assigned to any project"))?;
    store.pull_member(project, user).await?;

    info!("User {} unassigned from project {}", user, project);
    Ok(project)
}

pub async fn project_of_user(store: &dyn Store, user: ObjectId) -> ApiResult<Option<Project>> {
    match store.project_of(user).await? {
        Some(id) => store.find_project(id).await,
        None => Ok(None),
    }
}

/// Drops every membership of a project that is going away.
pub async fn release_project(store: &dyn Store, project: ObjectId) -> ApiResult<u64> {
    let released = store.remove_project_memberships(project).await?;
    if released > 0 {
        info!("Released {} member(s) of project {}", released, project);
    }
    Ok(released)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use crate::services::fixtures::{self, id_of};
    use crate::store::memory::MemoryStore;

    #[actix_web::test]
    async fn second_assignment_conflicts_until_unassigned() {
        let store = MemoryStore::new();
        let u = fixtures::user(&store, "u@x.com", Role::Student, 2024).await;
        let p = fixtures::project(&store, "P", 2024).await;
        let q = fixtures::project(&store, "Q", 2024).await;
        let (u, p, q) = (id_of(&u), id_of(&p), id_of(&q));

        let joined = assign(&store, u, p).await.unwrap();
        assert_eq!(joined.members, vec![u]);

        assert!(matches!(assign(&store, u, q).await, Err(ApiError::Conflict(_))));

        assert_eq!(unassign(&store, u).await.unwrap(), p);
        assert!(store.find_project(p).await.unwrap().unwrap().members.is_empty());

        assign(&store, u, q).await.unwrap();
        assert_eq!(store.project_of(u).await.unwrap(), Some(q));
        assert_eq!(store.find_project(q).await.unwrap().unwrap().members, vec![u]);
    }

    #[actix_web::test]
    async fn assigning_to_missing_project_is_not_found() {
        let store = MemoryStore::new();
        let u = fixtures::user(&store, "u@x.com", Role::Student, 2024).await;
        let err = assign(&store, id_of(&u), ObjectId::new()).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
        assert_eq!(store.project_of(id_of(&u)).await.unwrap(), None);
    }

    #[actix_web::test]
    async fn assigning_an_unknown_user_is_not_found() {
        let store = MemoryStore::new();
        let p = id_of(&fixtures::project(&store, "P", 2024).await);
        let ghost = ObjectId::new();

        let err = assign(&store, ghost, p).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
        assert_eq!(store.project_of(ghost).await.unwrap(), None);
        assert!(store.find_project(p).await.unwrap().unwrap().members.is_empty());
    }

    #[actix_web::test]
    async fn failed_member_write_leaves_no_membership() {
        let store = MemoryStore::new();
        let u = id_of(&fixtures::user(&store, "u@x.com", Role::Student, 2024).await);
        let p = id_of(&fixtures::project(&store, "P", 2024).await);
        store.break_member_writes();

        assert!(matches!(assign(&store, u, p).await, Err(ApiError::Internal(_))));
        assert_eq!(store.project_of(u).await.unwrap(), None);
    }

    #[actix_web::test]
    async fn unassigning_without_project_is_not_found() {
        let store = MemoryStore::new();
        let err = unassign(&store, ObjectId::new()).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[actix_web::test]
    async fn releasing_a_project_frees_its_members() {
        let store = MemoryStore::new();
        let a = id_of(&fixtures::user(&store, "a@x.com", Role::Student, 2024).await);
        let b = id_of(&fixtures::user(&store, "b@x.com", Role::Student, 2024).await);
        let p = id_of(&fixtures::project(&store, "P", 2024).await);
        assign(&store, a, p).await.unwrap();
        assign(&store, b, p).await.unwrap();

        assert_eq!(release_project(&store, p).await.unwrap(), 2);
        assert!(project_of_user(&store, a).await.unwrap().is_none());
    }
}
