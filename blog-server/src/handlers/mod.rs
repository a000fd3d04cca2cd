pub mod auth;
pub mod blog;
pub mod health;
pub mod user;

pub mod error {
    use blog_common::request_io::outputs::{ErrorType, ServerErrorResponse};

    use actix_web::http::{header, StatusCode};
    use actix_web::{HttpResponse, HttpResponseBuilder};
    use std::fmt;

    use crate::utils::password::HashingError;

    /// Every token rejection carries this message, whatever the underlying reason.
    pub const INVALID_TOKEN_MSG: &str = "Token is invalid or missing";

    #[derive(Debug)]
    pub enum HttpErrorResponse {
        // 400
        IncorrectlyFormed(String),

        // 401
        IncorrectCredential(String),
        BadToken(String),

        // 403
        UserDisallowed(String),

        // 404
        DoesNotExist(String),

        // 409
        ConflictWithExisting(String),

        // 413
        InputTooLarge(String),

        // 500
        InternalError(String),
    }

    impl HttpErrorResponse {
        pub fn invalid_token() -> Self {
            HttpErrorResponse::BadToken(String::from(INVALID_TOKEN_MSG))
        }
    }

    impl std::error::Error for HttpErrorResponse {}

    impl fmt::Display for HttpErrorResponse {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            let server_error: ServerErrorResponse = self.into();
            write!(f, "{:?}", server_error)
        }
    }

    impl From<&HttpErrorResponse> for ServerErrorResponse {
        fn from(resp: &HttpErrorResponse) -> Self {
            let (error_type, message) = match resp {
                HttpErrorResponse::IncorrectlyFormed(msg) => (
                    ErrorType::IncorrectlyFormed,
                    format!("Incorrectly formed request: {msg}"),
                ),
                HttpErrorResponse::IncorrectCredential(msg) => (
                    ErrorType::IncorrectCredential,
                    format!("Incorrect credential: {msg}"),
                ),
                HttpErrorResponse::BadToken(msg) => (ErrorType::BadToken, msg.clone()),
                HttpErrorResponse::UserDisallowed(msg) => (
                    ErrorType::UserDisallowed,
                    format!("User disallowed: {msg}"),
                ),
                HttpErrorResponse::DoesNotExist(msg) => {
                    (ErrorType::DoesNotExist, format!("Does not exist: {msg}"))
                }
                HttpErrorResponse::ConflictWithExisting(msg) => (
                    ErrorType::ConflictWithExisting,
                    format!("Conflict with existing data: {msg}"),
                ),
                HttpErrorResponse::InputTooLarge(msg) => {
                    (ErrorType::InputTooLarge, format!("Input is too large: {msg}"))
                }
                HttpErrorResponse::InternalError(msg) => {
                    (ErrorType::InternalError, format!("Internal error: {msg}"))
                }
            };

            ServerErrorResponse {
                error_type,
                message,
            }
        }
    }

    impl actix_web::error::ResponseError for HttpErrorResponse {
        fn error_response(&self) -> HttpResponse {
            HttpResponseBuilder::new(self.status_code())
                .insert_header((header::CONTENT_TYPE, "application/json"))
                .json(ServerErrorResponse::from(self))
        }

        fn status_code(&self) -> StatusCode {
            match *self {
                HttpErrorResponse::IncorrectlyFormed(_) => StatusCode::BAD_REQUEST,
                HttpErrorResponse::IncorrectCredential(_) | HttpErrorResponse::BadToken(_) => {
                    StatusCode::UNAUTHORIZED
                }
                HttpErrorResponse::UserDisallowed(_) => StatusCode::FORBIDDEN,
                HttpErrorResponse::DoesNotExist(_) => StatusCode::NOT_FOUND,
                HttpErrorResponse::ConflictWithExisting(_) => StatusCode::CONFLICT,
                HttpErrorResponse::InputTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
                HttpErrorResponse::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            }
        }
    }

    impl From<actix_web::error::BlockingError> for HttpErrorResponse {
        fn from(_err: actix_web::error::BlockingError) -> Self {
            HttpErrorResponse::InternalError(String::from("Actix thread pool failure"))
        }
    }

    impl From<HashingError> for HttpErrorResponse {
        fn from(err: HashingError) -> Self {
            log::error!("{err}");
            HttpErrorResponse::InternalError(String::from("Failed to process password"))
        }
    }
}

#[cfg(test)]
pub mod test_utils {
    use blog_common::db::memory::MemoryStore;
    use blog_common::token::auth_token::AuthTokenType;
    use blog_common::token::issuer::TokenIssuer;

    use actix_web::body::to_bytes;
    use actix_web::dev::ServiceResponse;
    use actix_web::http::StatusCode;
    use actix_web::test::{self, TestRequest};
    use serde::de::DeserializeOwned;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    use crate::services::AppState;
    use crate::utils::password::test_utils::cheap_hasher;

    pub const TEST_SIGNING_KEY: [u8; 64] = [42; 64];

    pub struct TestContext {
        pub store: Arc<MemoryStore>,
        pub state: AppState,
    }

    impl TestContext {
        pub fn new() -> Self {
            let store = Arc::new(MemoryStore::new());

            let state = AppState::new(
                store.clone(),
                store.clone(),
                store.clone(),
                TokenIssuer::new(
                    &TEST_SIGNING_KEY,
                    Duration::from_secs(15 * 60),
                    Duration::from_secs(30 * 86400),
                ),
                cheap_hasher(),
            );

            Self { store, state }
        }

        pub fn issuer(&self) -> &TokenIssuer {
            &self.state.token_issuer
        }
    }

    /// Builds an app with the full route table over the context's store.
    macro_rules! init_app {
        ($ctx:expr) => {
            actix_web::test::init_service(
                actix_web::App::new()
                    .configure(|cfg| crate::services::configure(cfg, &$ctx.state)),
            )
            .await
        };
    }

    pub(crate) use init_app;

    pub async fn read_json<T: DeserializeOwned>(resp: ServiceResponse) -> T {
        let body = to_bytes(resp.into_body()).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    /// Registers a user through the API and returns `(user_id, access_token, refresh_token)`.
    pub async fn register_user(
        ctx: &TestContext,
        username: &str,
        password: &str,
    ) -> (i32, String, String) {
        let app = init_app!(ctx);

        let req = TestRequest::post()
            .uri("/registration")
            .set_json(json!({ "username": username, "password": password }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let body: serde_json::Value = read_json(resp).await;
        let access_token = body["access_token"].as_str().unwrap().to_owned();
        let refresh_token = body["refresh_token"].as_str().unwrap().to_owned();

        let user_id = ctx
            .issuer()
            .verify(&access_token, AuthTokenType::Access)
            .unwrap()
            .user_id;

        (user_id, access_token, refresh_token)
    }

    pub fn bearer(token: &str) -> (&'static str, String) {
        ("Authorization", format!("Bearer {token}"))
    }
}
