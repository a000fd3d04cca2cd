pub mod auth;

use actix_web::http::header;
use actix_web::HttpRequest;

/// The token from an `Authorization: Bearer <token>` header, if there is one.
pub fn bearer_token(req: &HttpRequest) -> Option<&str> {
    let value = req.headers().get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;

    if !scheme.eq_ignore_ascii_case("Bearer") {
        return None;
    }

    let token = token.trim();

    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}
