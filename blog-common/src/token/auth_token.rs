use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::token::{sign_hmac_sha256, Expiring, HmacSha256Verifier, Token, TokenError};

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum AuthTokenType {
    Access,
    Refresh,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuthTokenClaims {
    #[serde(rename = "uid")]
    pub user_id: i32,
    #[serde(rename = "jti")]
    pub token_id: Uuid,
    #[serde(rename = "exp")]
    pub expiration: u64,
    #[serde(rename = "typ")]
    pub token_type: AuthTokenType,
}

impl Expiring for AuthTokenClaims {
    fn expiration(&self) -> u64 {
        self.expiration
    }
}

pub struct AuthToken {}

impl AuthToken {
    pub fn sign_new(claims: &AuthTokenClaims, signing_key: &[u8]) -> Result<String, TokenError> {
        sign_hmac_sha256(claims, signing_key)
    }
}

impl Token for AuthToken {
    type Claims = AuthTokenClaims;
    type Verifier = HmacSha256Verifier;
}
