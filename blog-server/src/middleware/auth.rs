use blog_common::db::{RevocationStore, UserStore};
use blog_common::models::user::User;
use blog_common::token::auth_token::{AuthTokenClaims, AuthTokenType};
use blog_common::token::issuer::{TokenIssuer, ValidationError};
use blog_common::token::TokenError;

use actix_web::dev::Payload;
use actix_web::web::{self, Data};
use actix_web::{FromRequest, HttpRequest};
use futures::future::LocalBoxFuture;
use std::marker::PhantomData;

use crate::handlers::error::HttpErrorResponse;
use crate::middleware::bearer_token;

pub trait RequestAuthTokenType {
    fn token_name() -> &'static str;
    fn token_type() -> AuthTokenType;
}

#[derive(Debug)]
pub struct Access {}
#[derive(Debug)]
pub struct Refresh {}

impl RequestAuthTokenType for Access {
    fn token_name() -> &'static str {
        "AccessToken"
    }
    fn token_type() -> AuthTokenType {
        AuthTokenType::Access
    }
}

impl RequestAuthTokenType for Refresh {
    fn token_name() -> &'static str {
        "RefreshToken"
    }
    fn token_type() -> AuthTokenType {
        AuthTokenType::Refresh
    }
}

/// A bearer token of type `T` that has a valid signature, hasn't expired, and hasn't been
/// revoked.
#[derive(Debug)]
pub struct VerifiedToken<T: RequestAuthTokenType> {
    pub claims: AuthTokenClaims,
    _marker: PhantomData<T>,
}

impl<T> FromRequest for VerifiedToken<T>
where
    T: RequestAuthTokenType + 'static,
{
    type Error = HttpErrorResponse;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let token = bearer_token(req).map(String::from);
        let issuer = req.app_data::<Data<TokenIssuer>>().cloned();
        let revocations = req.app_data::<Data<dyn RevocationStore>>().cloned();

        Box::pin(async move {
            let Some(token) = token else {
                log::info!("Rejected {}: {}", T::token_name(), TokenError::TokenMissing);
                return Err(HttpErrorResponse::invalid_token());
            };

            let (Some(issuer), Some(revocations)) = (issuer, revocations) else {
                log::error!("Token issuer or revocation store was not registered as app data");
                return Err(HttpErrorResponse::InternalError(String::from(
                    "Failed to validate token",
                )));
            };

            let validation = web::block(move || {
                issuer.validate(&token, T::token_type(), &**revocations)
            })
            .await?;

            match validation {
                Ok(claims) => Ok(VerifiedToken {
                    claims,
                    _marker: PhantomData,
                }),
                Err(ValidationError::Rejected(e)) => {
                    log::info!("Rejected {}: {e}", T::token_name());
                    Err(HttpErrorResponse::invalid_token())
                }
                Err(e @ ValidationError::RevocationLookupFailed(_)) => {
                    log::error!("{e}");
                    Err(HttpErrorResponse::InternalError(String::from(
                        "Failed to validate token",
                    )))
                }
            }
        })
    }
}

/// A `VerifiedToken<T>` whose user still exists. Tokens outlive deleted users, so anything
/// acting as the token's user goes through this rather than `VerifiedToken`.
#[derive(Debug)]
pub struct VerifiedUser<T: RequestAuthTokenType> {
    pub claims: AuthTokenClaims,
    pub user: User,
    _marker: PhantomData<T>,
}

impl<T> FromRequest for VerifiedUser<T>
where
    T: RequestAuthTokenType + 'static,
{
    type Error = HttpErrorResponse;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let token = VerifiedToken::<T>::from_request(req, payload);
        let users = req.app_data::<Data<dyn UserStore>>().cloned();

        Box::pin(async move {
            let claims = token.await?.claims;

            let Some(users) = users else {
                log::error!("User store was not registered as app data");
                return Err(HttpErrorResponse::InternalError(String::from(
                    "Failed to get user",
                )));
            };

            let user_id = claims.user_id;
            let user = match web::block(move || users.get_user(user_id)).await? {
                Ok(u) => u,
                Err(e) if e.is_not_found() => {
                    log::info!(
                        "Rejected {}: user {user_id} no longer exists",
                        T::token_name()
                    );
                    return Err(HttpErrorResponse::invalid_token());
                }
                Err(e) => {
                    log::error!("{e}");
                    return Err(HttpErrorResponse::InternalError(String::from(
                        "Failed to get user",
                    )));
                }
            };

            Ok(VerifiedUser {
                claims,
                user,
                _marker: PhantomData,
            })
        })
    }
}

/// A verified access token whose user is currently an administrator.
#[derive(Debug)]
pub struct AdminAccess {
    pub claims: AuthTokenClaims,
}

impl FromRequest for AdminAccess {
    type Error = HttpErrorResponse;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let verified = VerifiedUser::<Access>::from_request(req, payload);

        Box::pin(async move {
            let verified = verified.await?;

            if !verified.user.is_admin {
                return Err(HttpErrorResponse::UserDisallowed(String::from(
                    "Administrator access is required",
                )));
            }

            Ok(AdminAccess {
                claims: verified.claims,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use actix_web::test::TestRequest;
    use std::time::Duration;

    use crate::handlers::test_utils::{bearer, TestContext};

    fn request_with(ctx: &TestContext, token: Option<&str>) -> HttpRequest {
        let mut req = TestRequest::default()
            .app_data(ctx.state.token_issuer.clone())
            .app_data(ctx.state.revocations.clone())
            .app_data(ctx.state.users.clone());

        if let Some(token) = token {
            req = req.insert_header(bearer(token));
        }

        req.to_http_request()
    }

    #[actix_web::test]
    async fn test_verified_token_types() {
        let ctx = TestContext::new();
        let pair = ctx.issuer().issue_token_pair(5).unwrap();

        let req = request_with(&ctx, Some(&pair.access_token));
        let token = VerifiedToken::<Access>::from_request(&req, &mut Payload::None)
            .await
            .unwrap();
        assert_eq!(token.claims.user_id, 5);
        assert!(VerifiedToken::<Refresh>::from_request(&req, &mut Payload::None)
            .await
            .is_err());

        let req = request_with(&ctx, Some(&pair.refresh_token));
        assert!(VerifiedToken::<Refresh>::from_request(&req, &mut Payload::None)
            .await
            .is_ok());
        assert!(VerifiedToken::<Access>::from_request(&req, &mut Payload::None)
            .await
            .is_err());
    }

    #[actix_web::test]
    async fn test_rejections_are_uniform() {
        let ctx = TestContext::new();

        let expired = TokenIssuer::new(
            &crate::handlers::test_utils::TEST_SIGNING_KEY,
            Duration::ZERO,
            Duration::ZERO,
        )
        .issue_access_token(1)
        .unwrap();

        let revoked = ctx.issuer().issue_access_token(1).unwrap();
        let claims = ctx.issuer().verify(&revoked, AuthTokenType::Access).unwrap();
        ctx.issuer().revoke(&claims, ctx.store.as_ref()).unwrap();

        let wrong_type = ctx.issuer().issue_refresh_token(1).unwrap();

        let mut messages = Vec::new();

        for token in [
            None,
            Some("garbage"),
            Some(expired.as_str()),
            Some(revoked.as_str()),
            Some(wrong_type.as_str()),
        ] {
            let req = request_with(&ctx, token);
            let err = VerifiedToken::<Access>::from_request(&req, &mut Payload::None)
                .await
                .unwrap_err();

            assert!(matches!(err, HttpErrorResponse::BadToken(_)));
            messages.push(err.to_string());
        }

        messages.dedup();
        assert_eq!(messages.len(), 1);
    }

    #[actix_web::test]
    async fn test_verified_user_requires_existing_user() {
        let ctx = TestContext::new();

        let user_id = ctx.store.create_user("kept", "hash", false).unwrap();
        let access = ctx.issuer().issue_access_token(user_id).unwrap();
        let refresh = ctx.issuer().issue_refresh_token(user_id).unwrap();

        let req = request_with(&ctx, Some(&access));
        let verified = VerifiedUser::<Access>::from_request(&req, &mut Payload::None)
            .await
            .unwrap();
        assert_eq!(verified.user.id, user_id);
        assert_eq!(verified.user.username, "kept");

        assert_eq!(ctx.store.delete_all_non_admin_users().unwrap(), 1);

        // Both tokens still verify on their own, but their user is gone
        let req = request_with(&ctx, Some(&access));
        assert!(VerifiedToken::<Access>::from_request(&req, &mut Payload::None)
            .await
            .is_ok());
        assert!(matches!(
            VerifiedUser::<Access>::from_request(&req, &mut Payload::None).await,
            Err(HttpErrorResponse::BadToken(_))
        ));

        let req = request_with(&ctx, Some(&refresh));
        assert!(matches!(
            VerifiedUser::<Refresh>::from_request(&req, &mut Payload::None).await,
            Err(HttpErrorResponse::BadToken(_))
        ));
    }

    #[actix_web::test]
    async fn test_admin_access() {
        let ctx = TestContext::new();

        let admin_id = ctx.store.create_user("admin", "hash", true).unwrap();
        let user_id = ctx.store.create_user("user", "hash", false).unwrap();

        let admin_token = ctx.issuer().issue_access_token(admin_id).unwrap();
        let user_token = ctx.issuer().issue_access_token(user_id).unwrap();
        let ghost_token = ctx.issuer().issue_access_token(9999).unwrap();
        let admin_refresh = ctx.issuer().issue_refresh_token(admin_id).unwrap();

        let req = request_with(&ctx, Some(&admin_token));
        let access = AdminAccess::from_request(&req, &mut Payload::None)
            .await
            .unwrap();
        assert_eq!(access.claims.user_id, admin_id);

        let req = request_with(&ctx, Some(&user_token));
        assert!(matches!(
            AdminAccess::from_request(&req, &mut Payload::None).await,
            Err(HttpErrorResponse::UserDisallowed(_))
        ));

        let req = request_with(&ctx, Some(&ghost_token));
        assert!(matches!(
            AdminAccess::from_request(&req, &mut Payload::None).await,
            Err(HttpErrorResponse::BadToken(_))
        ));

        let req = request_with(&ctx, Some(&admin_refresh));
        assert!(matches!(
            AdminAccess::from_request(&req, &mut Payload::None).await,
            Err(HttpErrorResponse::BadToken(_))
        ));
    }
}
