use blog_common::db::{BlogStore, RevocationStore, UserStore};
use blog_common::token::issuer::TokenIssuer;

use actix_web::error::{JsonPayloadError, PathError};
use actix_web::web::{Data, JsonConfig, PathConfig, ServiceConfig};
use std::sync::Arc;

use crate::handlers::error::HttpErrorResponse;
use crate::utils::password::PasswordHasher;

pub mod api;
pub mod web;

const MAX_JSON_BODY_BYTES: usize = 16 * 1024;

/// Shared state handed to every worker. The stores are trait objects so the same routes run
/// over PostgreSQL or the in-memory store.
#[derive(Clone)]
pub struct AppState {
    pub users: Data<dyn UserStore>,
    pub blogs: Data<dyn BlogStore>,
    pub revocations: Data<dyn RevocationStore>,
    pub token_issuer: Data<TokenIssuer>,
    pub password_hasher: Data<PasswordHasher>,
}

impl AppState {
    pub fn new(
        users: Arc<dyn UserStore>,
        blogs: Arc<dyn BlogStore>,
        revocations: Arc<dyn RevocationStore>,
        token_issuer: TokenIssuer,
        password_hasher: PasswordHasher,
    ) -> Self {
        Self {
            users: Data::from(users),
            blogs: Data::from(blogs),
            revocations: Data::from(revocations),
            token_issuer: Data::new(token_issuer),
            password_hasher: Data::new(password_hasher),
        }
    }
}

pub fn configure(cfg: &mut ServiceConfig, state: &AppState) {
    cfg.app_data(state.users.clone())
        .app_data(state.blogs.clone())
        .app_data(state.revocations.clone())
        .app_data(state.token_issuer.clone())
        .app_data(state.password_hasher.clone())
        .app_data(json_config())
        .app_data(path_config())
        .configure(api::configure)
        .configure(web::configure);
}

fn json_config() -> JsonConfig {
    JsonConfig::default()
        .limit(MAX_JSON_BODY_BYTES)
        .error_handler(|err, _req| {
            let resp = match err {
                JsonPayloadError::Overflow { .. } | JsonPayloadError::OverflowKnownLength { .. } => {
                    HttpErrorResponse::InputTooLarge(String::from("Request body is too large"))
                }
                JsonPayloadError::ContentType => HttpErrorResponse::IncorrectlyFormed(
                    String::from("Expected a JSON body"),
                ),
                e => HttpErrorResponse::IncorrectlyFormed(e.to_string()),
            };

            resp.into()
        })
}

fn path_config() -> PathConfig {
    PathConfig::default().error_handler(|err: PathError, _req| {
        log::debug!("Unmatched path parameter: {err}");
        HttpErrorResponse::DoesNotExist(String::from("No resource at this path")).into()
    })
}
