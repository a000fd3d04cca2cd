use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::db::{DaoError, RevocationStore};
use crate::token::auth_token::{AuthToken, AuthTokenClaims, AuthTokenType};
use crate::token::{Token, TokenError};

#[derive(Debug)]
pub enum ValidationError {
    Rejected(TokenError),
    RevocationLookupFailed(DaoError),
}

impl std::error::Error for ValidationError {}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::Rejected(e) => write!(f, "ValidationError: Token rejected: {e}"),
            ValidationError::RevocationLookupFailed(e) => {
                write!(f, "ValidationError: Failed to check revocation list: {e}")
            }
        }
    }
}

impl From<TokenError> for ValidationError {
    fn from(error: TokenError) -> Self {
        ValidationError::Rejected(error)
    }
}

impl From<DaoError> for ValidationError {
    fn from(error: DaoError) -> Self {
        ValidationError::RevocationLookupFailed(error)
    }
}

#[derive(Clone, Debug)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Mints and validates the bearer tokens that carry a user's identity.
pub struct TokenIssuer {
    signing_key: Zeroizing<Vec<u8>>,
    access_token_lifetime: Duration,
    refresh_token_lifetime: Duration,
}

impl TokenIssuer {
    pub fn new(
        signing_key: &[u8],
        access_token_lifetime: Duration,
        refresh_token_lifetime: Duration,
    ) -> Self {
        Self {
            signing_key: Zeroizing::new(signing_key.to_vec()),
            access_token_lifetime,
            refresh_token_lifetime,
        }
    }

    pub fn issue_access_token(&self, user_id: i32) -> Result<String, TokenError> {
        self.issue(user_id, AuthTokenType::Access, self.access_token_lifetime)
    }

    pub fn issue_refresh_token(&self, user_id: i32) -> Result<String, TokenError> {
        self.issue(user_id, AuthTokenType::Refresh, self.refresh_token_lifetime)
    }

    pub fn issue_token_pair(&self, user_id: i32) -> Result<TokenPair, TokenError> {
        Ok(TokenPair {
            access_token: self.issue_access_token(user_id)?,
            refresh_token: self.issue_refresh_token(user_id)?,
        })
    }

    fn issue(
        &self,
        user_id: i32,
        token_type: AuthTokenType,
        lifetime: Duration,
    ) -> Result<String, TokenError> {
        let expiration = (SystemTime::now() + lifetime)
            .duration_since(UNIX_EPOCH)
            .map_err(|_| TokenError::TokenInvalid)?
            .as_secs();

        let claims = AuthTokenClaims {
            user_id,
            token_id: Uuid::now_v7(),
            expiration,
            token_type,
        };

        AuthToken::sign_new(&claims, &self.signing_key)
    }

    /// Checks format, signature, expiration, and type. Does not consult the revocation list.
    pub fn verify(
        &self,
        token: &str,
        expected_type: AuthTokenType,
    ) -> Result<AuthTokenClaims, TokenError> {
        let claims = AuthToken::decode(token)?.verify(&self.signing_key)?;

        if claims.token_type != expected_type {
            return Err(TokenError::WrongTokenType);
        }

        Ok(claims)
    }

    pub fn validate(
        &self,
        token: &str,
        expected_type: AuthTokenType,
        revocations: &dyn RevocationStore,
    ) -> Result<AuthTokenClaims, ValidationError> {
        let claims = self.verify(token, expected_type)?;

        if revocations.is_token_revoked(claims.token_id)? {
            return Err(ValidationError::Rejected(TokenError::TokenRevoked));
        }

        Ok(claims)
    }

    /// Revoking the same token more than once is not an error.
    pub fn revoke(
        &self,
        claims: &AuthTokenClaims,
        revocations: &dyn RevocationStore,
    ) -> Result<(), DaoError> {
        revocations.revoke_token(claims.token_id, claims.expiration)
    }
}
