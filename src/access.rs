// src/access.rs
//
// Capability checks. Each protected operation asks one of these instead of
// comparing roles inline.

use mongodb::bson::oid::ObjectId;

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::models::Project;

pub fn require_admin(caller: &AuthUser) -> ApiResult<()> {
    if caller.is_admin() {
        Ok(())
    } else {
        Err(ApiError::forbidden("Admin access required"))
    }
}

/// Admins edit anyone; everyone else only themselves.
pub fn can_edit_user(caller: &AuthUser, target: ObjectId) -> ApiResult<()> {
    if caller.is_admin() || caller.id == target {
        Ok(())
    } else {
        Err(ApiError::forbidden("You can only edit your own profile"))
    }
}

/// Role, year and internship are set by admins only.
pub fn can_set_enrollment(caller: &AuthUser) -> ApiResult<()> {
    if caller.is_admin() {
        Ok(())
    } else {
        Err(ApiError::forbidden(
            "Only an admin can change role, year or internship",
        ))
    }
}

pub fn can_edit_project(caller: &AuthUser, project: &Project) -> ApiResult<()> {
    if caller.is_admin() || project.has_member(caller.id) {
        Ok(())
    } else {
        Err(ApiError::forbidden("Only project members can edit this project"))
    }
}

pub fn can_delete_project(caller: &AuthUser) -> ApiResult<()> {
    require_admin(caller).map_err(|_| ApiError::forbidden("Only an admin can delete projects"))
}

/// Resolves whose membership an assign/unassign request acts on.
pub fn membership_target(caller: &AuthUser, requested: Option<ObjectId>) -> ApiResult<ObjectId> {
    match requested {
        Some(user) if user != caller.id => {
            require_admin(caller)?;
            Ok(user)
        }
        _ => Ok(caller.id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use chrono::Utc;

    fn caller(role: Role) -> AuthUser {
        AuthUser {
            id: ObjectId::new(),
            email: "c@x.com".into(),
            role,
            year: 2024,
        }
    }

    fn project_with(members: Vec<ObjectId>) -> Project {
        Project {
            id: Some(ObjectId::new()),
            name: "p".into(),
            image: String::new(),
            internship: None,
            description: String::new(),
            short_description: String::new(),
            gallery: vec![],
            youtube: None,
            instructor: None,
            members,
            awards: vec![],
            year: 2024,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn members_and_admins_edit_projects() {
        let student = caller(Role::Student);
        let admin = caller(Role::Admin);
        let outsider = caller(Role::Instructor);
        let project = project_with(vec![student.id]);
        assert!(can_edit_project(&student, &project).is_ok());
        assert!(can_edit_project(&admin, &project).is_ok());
        assert!(matches!(
            can_edit_project(&outsider, &project),
            Err(ApiError::Forbidden(_))
        ));
    }

    #[test]
    fn only_admins_delete_projects() {
        assert!(can_delete_project(&caller(Role::Admin)).is_ok());
        assert!(can_delete_project(&caller(Role::Student)).is_err());
    }

    #[test]
    fn users_edit_themselves() {
        let me = caller(Role::Student);
        assert!(can_edit_user(&me, me.id).is_ok());
        assert!(can_edit_user(&me, ObjectId::new()).is_err());
        assert!(can_edit_user(&caller(Role::Admin), me.id).is_ok());
    }

    #[test]
    fn acting_for_someone_else_needs_admin() {
        let me = caller(Role::Student);
        let other = ObjectId::new();
        assert_eq!(membership_target(&me, None).unwrap(), me.id);
        assert_eq!(membership_target(&me, Some(me.id)).unwrap(), me.id);
        assert!(membership_target(&me, Some(other)).is_err());
        assert_eq!(membership_target(&caller(Role::Admin), Some(other)).unwrap(), other);
    }
}
