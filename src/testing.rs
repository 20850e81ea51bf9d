// src/testing.rs
//
// Shared harness for handler tests: the real route table over the
// in-memory store and the recording media adapter.

use std::sync::Arc;

use actix_web::body::MessageBody;
use actix_web::dev::ServiceResponse;

use crate::app_state::AppState;
use crate::auth::{create_token, hash_password};
use crate::config::Config;
use crate::media::testing::RecordingMedia;
use crate::models::{Role, User};
use crate::store::memory::MemoryStore;
use crate::store::UserStore;

/// Builds the app and yields the initialized service.
macro_rules! test_app {
    ($ctx:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .wrap(crate::Authentication::new(&$ctx.config.jwt_secret))
                .app_data(actix_web::web::Data::new($ctx.state()))
                .configure(crate::configure),
        )
        .await
    };
}

pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub media: Arc<RecordingMedia>,
    pub config: Config,
}

impl TestContext {
    pub fn new() -> Self {
        Self {
            store: Arc::new(MemoryStore::new()),
            media: Arc::new(RecordingMedia::default()),
            config: Config::for_tests(),
        }
    }

    pub fn state(&self) -> AppState {
        AppState {
            store: self.store.clone(),
            media: self.media.clone(),
            config: self.config.clone(),
        }
    }

    /// Stores a user whose password is `pw`.
    pub async fn user(&self, email: &str, role: Role, year: i32) -> User {
        let mut user = User::new(email.into(), hash_password("pw", 4).unwrap(), role);
        user.year = year;
        self.store.insert_user(user).await.unwrap()
    }

    pub fn bearer(&self, user: &User) -> (&'static str, String) {
        let token = create_token(user, &self.config.jwt_secret).unwrap();
        ("Authorization", format!("Bearer {}", token))
    }
}

pub async fn json_body<B: MessageBody>(resp: ServiceResponse<B>) -> serde_json::Value {
    let bytes = actix_web::test::read_body(resp).await;
    serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
}
