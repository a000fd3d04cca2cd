use blog_common::db::{RevocationStore, UserStore};
use blog_common::request_io::inputs::CredentialPair;
use blog_common::request_io::outputs::{OutputAccessToken, OutputMessage, OutputTokenPair};
use blog_common::token::issuer::{TokenIssuer, TokenPair};
use blog_common::validators::{self, Validity};

use actix_web::{web, HttpResponse};

use crate::handlers::error::HttpErrorResponse;
use crate::middleware::auth::{Access, Refresh, VerifiedToken, VerifiedUser};
use crate::utils::password::PasswordHasher;

const INCORRECT_CREDENTIALS_MSG: &str = "Incorrect username or password";

pub async fn register(
    users: web::Data<dyn UserStore>,
    token_issuer: web::Data<TokenIssuer>,
    password_hasher: web::Data<PasswordHasher>,
    credentials: web::Json<CredentialPair>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let credentials = credentials.into_inner();

    if credentials.password.len() > validators::MAX_PASSWORD_LENGTH {
        return Err(HttpErrorResponse::InputTooLarge(String::from(
            "Provided password is too long. Max: 512 bytes",
        )));
    }

    if let Validity::Invalid(msg) = credentials.validate() {
        return Err(HttpErrorResponse::IncorrectlyFormed(String::from(msg)));
    }

    let username = credentials.username.clone();
    let users_ref = users.clone();

    let existing_user = match web::block(move || users_ref.get_user_by_username(&username)).await?
    {
        Ok(u) => Some(u),
        Err(e) if e.is_not_found() => None,
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to check for existing user",
            )));
        }
    };

    if existing_user.is_some() {
        return Err(HttpErrorResponse::ConflictWithExisting(format!(
            "User {} already exists",
            credentials.username
        )));
    }

    let password_hash = password_hasher
        .into_inner()
        .hash(credentials.password)
        .await?;

    let username = credentials.username.clone();

    let user_id =
        match web::block(move || users.create_user(&username, &password_hash, false)).await? {
            Ok(id) => id,
            Err(e) if e.is_unique_violation() => {
                return Err(HttpErrorResponse::ConflictWithExisting(format!(
                    "User {} already exists",
                    credentials.username
                )));
            }
            Err(e) => {
                log::error!("{e}");
                return Err(HttpErrorResponse::InternalError(String::from(
                    "Failed to create user",
                )));
            }
        };

    log::info!("Registered user {user_id}");

    let tokens = issue_token_pair(&token_issuer, user_id)?;

    Ok(HttpResponse::Created().json(OutputTokenPair {
        message: format!("User {} was created", credentials.username),
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
    }))
}

pub async fn login(
    users: web::Data<dyn UserStore>,
    token_issuer: web::Data<TokenIssuer>,
    password_hasher: web::Data<PasswordHasher>,
    credentials: web::Json<CredentialPair>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let credentials = credentials.into_inner();

    if !credentials.validate().is_valid() {
        return Err(HttpErrorResponse::IncorrectCredential(String::from(
            INCORRECT_CREDENTIALS_MSG,
        )));
    }

    let username = credentials.username.clone();
    let password_hasher = password_hasher.into_inner();

    let user = match web::block(move || users.get_user_by_username(&username)).await? {
        Ok(u) => u,
        Err(e) if e.is_not_found() => {
            // Pay for a verification anyway so response time doesn't reveal the username
            password_hasher
                .verify_nonexistent(credentials.password)
                .await?;

            return Err(HttpErrorResponse::IncorrectCredential(String::from(
                INCORRECT_CREDENTIALS_MSG,
            )));
        }
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to get user",
            )));
        }
    };

    let password_matches = password_hasher
        .verify(credentials.password, user.password_hash)
        .await?;

    if !password_matches {
        return Err(HttpErrorResponse::IncorrectCredential(String::from(
            INCORRECT_CREDENTIALS_MSG,
        )));
    }

    let tokens = issue_token_pair(&token_issuer, user.id)?;

    Ok(HttpResponse::Ok().json(OutputTokenPair {
        message: format!("Logged in as {}", user.username),
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
    }))
}

pub async fn logout_access(
    revocations: web::Data<dyn RevocationStore>,
    token_issuer: web::Data<TokenIssuer>,
    token: VerifiedToken<Access>,
) -> Result<HttpResponse, HttpErrorResponse> {
    revoke(revocations, token_issuer, token.claims).await?;

    Ok(HttpResponse::Ok().json(OutputMessage {
        message: String::from("Access token has been revoked"),
    }))
}

pub async fn logout_refresh(
    revocations: web::Data<dyn RevocationStore>,
    token_issuer: web::Data<TokenIssuer>,
    token: VerifiedToken<Refresh>,
) -> Result<HttpResponse, HttpErrorResponse> {
    revoke(revocations, token_issuer, token.claims).await?;

    Ok(HttpResponse::Ok().json(OutputMessage {
        message: String::from("Refresh token has been revoked"),
    }))
}

pub async fn refresh(
    token_issuer: web::Data<TokenIssuer>,
    user: VerifiedUser<Refresh>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let access_token = match token_issuer.issue_access_token(user.user.id) {
        Ok(t) => t,
        Err(e) => {
            log::error!("Failed to sign access token: {e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to issue token",
            )));
        }
    };

    Ok(HttpResponse::Ok().json(OutputAccessToken { access_token }))
}

async fn revoke(
    revocations: web::Data<dyn RevocationStore>,
    token_issuer: web::Data<TokenIssuer>,
    claims: blog_common::token::auth_token::AuthTokenClaims,
) -> Result<(), HttpErrorResponse> {
    match web::block(move || token_issuer.revoke(&claims, &**revocations)).await? {
        Ok(_) => Ok(()),
        Err(e) => {
            log::error!("{e}");
            Err(HttpErrorResponse::InternalError(String::from(
                "Failed to revoke token",
            )))
        }
    }
}

fn issue_token_pair(
    token_issuer: &TokenIssuer,
    user_id: i32,
) -> Result<TokenPair, HttpErrorResponse> {
    token_issuer.issue_token_pair(user_id).map_err(|e| {
        log::error!("Failed to sign token pair: {e}");
        HttpErrorResponse::InternalError(String::from("Failed to issue tokens"))
    })
}
