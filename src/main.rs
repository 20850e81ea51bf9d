// src/main.rs

#[cfg(test)]
#[macro_use]
mod testing;

mod access;
mod app_state;
mod auth;
mod award;
mod config;
mod error;
mod forms;
mod homepage;
mod instructor;
mod internship;
mod media;
mod models;
mod project;
mod services;
mod store;
mod user_management;
mod yearbook;

use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::sync::Arc;
use std::task::{Context, Poll};

use actix_cors::Cors;
use actix_web::{
    body::{BoxBody, MessageBody},
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    http,
    middleware::Logger,
    web, App, Error, HttpMessage, HttpServer, ResponseError,
};
use env_logger::Env;
use futures::future::{ok, Ready};
use log::{error, info};

use crate::app_state::AppState;
use crate::auth::{validate_token, AuthUser};
use crate::error::{ApiError, ApiResult};
use crate::media::Cloudinary;
use crate::store::MongoStore;

/// Decodes `Authorization: Bearer <jwt>` into an [`AuthUser`] extension.
/// Requests without the header pass through untouched; a bad token is
/// answered with 401 here.
#[derive(Debug, Clone)]
pub struct Authentication {
    secret: Rc<String>,
}

impl Authentication {
    pub fn new(secret: &str) -> Self {
        Self {
            secret: Rc::new(secret.to_string()),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for Authentication
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Transform = AuthMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AuthMiddleware {
            service,
            secret: self.secret.clone(),
        })
    }
}

pub struct AuthMiddleware<S> {
    service: S,
    secret: Rc<String>,
}

impl<S> AuthMiddleware<S> {
    fn caller(&self, req: &ServiceRequest) -> ApiResult<Option<AuthUser>> {
        let Some(header) = req.headers().get(http::header::AUTHORIZATION) else {
            return Ok(None);
        };
        let value = header
            .to_str()
            .map_err(|_| ApiError::Unauthorized("Malformed authorization header".into()))?;
        let Some(token) = value.strip_prefix("Bearer ") else {
            return Ok(None);
        };
        let claims = validate_token(token.trim(), &self.secret)?;
        AuthUser::try_from(claims).map(Some)
    }
}

impl<S, B> Service<ServiceRequest> for AuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        match self.caller(&req) {
            Ok(Some(user)) => {
                req.extensions_mut().insert(user);
            }
            Ok(None) => {}
            Err(e) => {
                let (req_parts, _payload) = req.into_parts();
                let resp = e.error_response().map_into_boxed_body();
                let srv_resp = ServiceResponse::new(req_parts, resp);
                return Box::pin(async move { Ok(srv_resp) });
            }
        }

        let fut = self.service.call(req);
        Box::pin(async move {
            let res = fut.await?;
            Ok(res.map_into_boxed_body())
        })
    }
}

/// The whole route table. Static segments are registered before `{id}`
/// patterns that would otherwise shadow them.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _| ApiError::validation(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _| ApiError::validation(err.to_string()).into()),
    );

    cfg
        // AUTH / USERS
        .service(
            web::scope("/auth")
                .route("/register", web::post().to(user_management::register))
                .route("/login", web::post().to(user_management::login))
                .route("/bulk-register", web::post().to(user_management::bulk_register))
                .route("/emails", web::get().to(user_management::all_emails))
                .route("/users", web::get().to(user_management::list_users))
                .route("/users/by-emails", web::get().to(user_management::users_by_emails))
                .route("/users/{id}", web::get().to(user_management::get_user))
                .route("/users/{id}", web::put().to(user_management::update_user))
                .route("/users/{id}", web::delete().to(user_management::delete_user)),
        )
        // PROJECTS
        .service(
            web::scope("/projects")
                .route("", web::get().to(project::list_projects))
                .route("/all", web::get().to(project::all_projects))
                .route("/by-internship/{id}", web::get().to(project::projects_by_internship))
                .route("/mine/check", web::get().to(project::my_project))
                .route("/create", web::post().to(project::create_project))
                .route("/unassign", web::put().to(project::unassign_project))
                .route("/{id}", web::get().to(project::get_project))
                .route("/{id}", web::put().to(project::update_project))
                .route("/{id}", web::delete().to(project::delete_project))
                .route("/{id}/assign", web::put().to(project::assign_project)),
        )
        // CATALOG
        .service(
            web::scope("/instructors")
                .route("", web::get().to(instructor::list_instructors))
                .route("", web::post().to(instructor::create_instructor))
                .route("/{id}", web::get().to(instructor::get_instructor))
                .route("/{id}", web::put().to(instructor::update_instructor))
                .route("/{id}", web::delete().to(instructor::delete_instructor)),
        )
        .service(
            web::scope("/internships")
                .route("", web::get().to(internship::list_internships))
                .route("", web::post().to(internship::create_internship))
                .route("/{id}", web::put().to(internship::update_internship))
                .route("/{id}", web::delete().to(internship::delete_internship)),
        )
        .service(
            web::scope("/awards")
                .route("", web::get().to(award::list_awards))
                .route("", web::post().to(award::create_award))
                .route("/{id}", web::put().to(award::update_award))
                .route("/{id}", web::delete().to(award::delete_award)),
        )
        // YEARBOOKS
        .service(
            web::scope("/yearbooks")
                .route("", web::get().to(yearbook::list_yearbooks))
                .route("", web::post().to(yearbook::create_yearbook))
                .route("/active", web::get().to(yearbook::active_yearbook))
                .route("/{id}", web::put().to(yearbook::update_yearbook))
                .route("/{id}", web::delete().to(yearbook::delete_yearbook)),
        )
        // HOMEPAGE
        .service(
            web::scope("/homepage")
                .route("", web::get().to(homepage::list_sections))
                .route("", web::post().to(homepage::create_section))
                .route("/{type}", web::put().to(homepage::update_section)),
        );
}

fn cors(config: &config::Config) -> Cors {
    let cors = Cors::default()
        .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
        .allowed_headers(vec![
            http::header::CONTENT_TYPE,
            http::header::ACCEPT,
            http::header::AUTHORIZATION,
        ])
        .max_age(3600);
    if config.any_origin() {
        return cors.allow_any_origin();
    }
    config
        .allowed_origins
        .iter()
        .fold(cors.supports_credentials(), |cors, origin| cors.allowed_origin(origin))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = config::Config::from_env().map_err(|e| {
        error!("Configuration error: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
    })?;

    let startup_failed = |e: ApiError| {
        error!("Startup failed: {}", e);
        std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
    };
    let mongo = MongoStore::connect(&config.mongo_uri, &config.database_name)
        .await
        .map_err(startup_failed)?;
    mongo.ensure_indexes().await.map_err(startup_failed)?;
    let media = Cloudinary::new(config.media.clone()).map_err(startup_failed)?;

    let state = AppState {
        store: Arc::new(mongo),
        media: Arc::new(media),
        config: config.clone(),
    };
    let bind = ("0.0.0.0", config.port);

    info!("Server running at http://{}:{}", bind.0, bind.1);
    if config.any_origin() {
        info!("Allowed CORS origins: any");
    } else {
        info!("Allowed CORS origins: {}", config.allowed_origins.join(", "));
    }

    HttpServer::new(move || {
        App::new()
            .wrap(Authentication::new(&state.config.jwt_secret))
            .wrap(cors(&state.config))
            .wrap(Logger::default())
            .app_data(web::Data::new(state.clone()))
            .configure(configure)
    })
    .bind(bind)?
    .run()
    .await
}
