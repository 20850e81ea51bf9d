// src/auth.rs

use actix_web::{dev::Payload, FromRequest, HttpMessage, HttpRequest};
use bcrypt::{hash, verify};
use chrono::{Duration, Utc};
use futures::future::{ready, Ready};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use log::warn;
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::models::{Role, User};

const TOKEN_TTL_DAYS: i64 = 7;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub role: Role,
    pub internship: Option<String>,
    pub year: i32,
    pub iat: usize,
    pub exp: usize,
}

// JWT Creation
pub fn create_token(user: &User, secret: &str) -> ApiResult<String> {
    let id = user
        .id
        .ok_or_else(|| ApiError::Internal("cannot issue a token for an unsaved user".into()))?;
    let now = Utc::now();
    let claims = Claims {
        sub: id.to_hex(),
        email: user.email.clone(),
        role: user.role,
        internship: user.internship.map(|i| i.to_hex()),
        year: user.year,
        iat: now.timestamp() as usize,
        exp: (now + Duration::days(TOKEN_TTL_DAYS)).timestamp() as usize,
    };
    Ok(encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )?)
}

// JWT Validation
pub fn validate_token(token: &str, secret: &str) -> ApiResult<Claims> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::default(),
    )?;
    Ok(data.claims)
}

pub fn hash_password(plain: &str, cost: u32) -> ApiResult<String> {
    Ok(hash(plain, cost)?)
}

/// A malformed stored hash counts as a mismatch.
pub fn verify_password(plain: &str, hashed: &str) -> bool {
    verify(plain, hashed).unwrap_or_else(|e| {
        warn!("Stored password hash could not be checked: {}", e);
        false
    })
}

/// The signed-in caller, placed in the request extensions by the
/// authentication middleware.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub id: ObjectId,
    pub email: String,
    pub role: Role,
    pub year: i32,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

impl TryFrom<Claims> for AuthUser {
    type Error = ApiError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        let id = ObjectId::parse_str(&claims.sub)
            .map_err(|_| ApiError::Unauthorized("Invalid token subject".into()))?;
        Ok(Self {
            id,
            email: claims.email,
            role: claims.role,
            year: claims.year,
        })
    }
}

#[cfg(test)]
impl AuthUser {
    pub fn of(user: &User) -> Self {
        Self {
            id: user.id.expect("saved user"),
            email: user.email.clone(),
            role: user.role,
            year: user.year,
        }
    }
}

impl FromRequest for AuthUser {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<AuthUser>()
                .cloned()
                .ok_or_else(|| ApiError::Unauthorized("Authentication required".into())),
        )
    }
}

/// A caller whose role is admin.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthUser);

impl FromRequest for AdminUser {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let caller = req.extensions().get::<AuthUser>().cloned();
        ready(match caller {
            Some(user) if user.is_admin() => Ok(AdminUser(user)),
            Some(_) => Err(ApiError::forbidden("Admin access required")),
            None => Err(ApiError::Unauthorized("Authentication required".into())),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    fn saved_user(role: Role) -> User {
        let mut user = User::new("ada@school.edu".into(), String::new(), role);
        user.id = Some(ObjectId::new());
        user.internship = Some(ObjectId::new());
        user
    }

    #[test]
    fn token_carries_identity_and_expires_in_a_week() {
        let user = saved_user(Role::Instructor);
        let token = create_token(&user, "s3cret").unwrap();
        let claims = validate_token(&token, "s3cret").unwrap();
        assert_eq!(claims.sub, user.id.unwrap().to_hex());
        assert_eq!(claims.role, Role::Instructor);
        assert_eq!(claims.internship, user.internship.map(|i| i.to_hex()));
        assert_eq!(claims.exp - claims.iat, 7 * 24 * 3600);
    }

    #[test]
    fn wrong_secret_is_unauthorized() {
        let token = create_token(&saved_user(Role::Student), "a").unwrap();
        assert!(matches!(
            validate_token(&token, "b"),
            Err(ApiError::Unauthorized(_))
        ));
    }

    #[test]
    fn unsaved_user_gets_no_token() {
        let user = User::new("x@y.z".into(), String::new(), Role::Student);
        assert!(create_token(&user, "k").is_err());
    }

    #[test]
    fn passwords_verify_against_their_hash() {
        let hashed = hash_password("hunter2", 4).unwrap();
        assert_ne!(hashed, "hunter2");
        assert!(verify_password("hunter2", &hashed));
        assert!(!verify_password("hunter3", &hashed));
        assert!(!verify_password("hunter2", "not-a-hash"));
    }

    #[actix_web::test]
    async fn admin_extractor_checks_role() {
        let req = TestRequest::default().to_http_request();
        let student = AuthUser::of(&saved_user(Role::Student));
        req.extensions_mut().insert(student);
        let result = AdminUser::from_request(&req, &mut Payload::None).await;
        assert!(matches!(result, Err(ApiError::Forbidden(_))));

        let req = TestRequest::default().to_http_request();
        let result = AuthUser::from_request(&req, &mut Payload::None).await;
        assert!(matches!(result, Err(ApiError::Unauthorized(_))));
    }
}
