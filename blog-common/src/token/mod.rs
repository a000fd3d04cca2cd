pub mod auth_token;
pub mod issuer;

use base64::engine::general_purpose::URL_SAFE as b64_urlsafe;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::Sha256;
use std::fmt::Debug;
use std::marker::PhantomData;
use std::time::{SystemTime, UNIX_EPOCH};

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug)]
pub enum TokenError {
    TokenInvalid,
    TokenExpired,
    TokenMissing,
    TokenRevoked,
    WrongTokenType,
}

impl std::error::Error for TokenError {}

impl std::fmt::Display for TokenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenError::TokenInvalid => write!(f, "TokenInvalid"),
            TokenError::TokenExpired => write!(f, "TokenExpired"),
            TokenError::TokenMissing => write!(f, "TokenMissing"),
            TokenError::TokenRevoked => write!(f, "TokenRevoked"),
            TokenError::WrongTokenType => write!(f, "WrongTokenType"),
        }
    }
}

pub trait Expiring {
    fn expiration(&self) -> u64;
}

pub trait TokenSignatureVerifier {
    fn signature_length() -> usize;
    fn verify(json: &[u8], signature: &[u8], key: &[u8]) -> bool;
}

#[derive(Debug)]
pub struct DecodedToken<C, V>
where
    C: Expiring + DeserializeOwned,
    V: TokenSignatureVerifier,
{
    pub json: Vec<u8>,
    pub signature: Vec<u8>,
    pub claims: C,
    phantom: PhantomData<V>,
}

impl<C, V> DecodedToken<C, V>
where
    C: Expiring + DeserializeOwned,
    V: TokenSignatureVerifier,
{
    /// Checks the signature and expiration. Revocation is checked by the issuer.
    pub fn verify(self, key: &[u8]) -> Result<C, TokenError> {
        if !V::verify(&self.json, &self.signature, key) {
            return Err(TokenError::TokenInvalid);
        }

        let Ok(now) = SystemTime::now().duration_since(UNIX_EPOCH) else {
            return Err(TokenError::TokenInvalid);
        };

        if self.claims.expiration() <= now.as_secs() {
            return Err(TokenError::TokenExpired);
        }

        Ok(self.claims)
    }
}

pub trait Token {
    type Claims: Expiring + DeserializeOwned;
    type Verifier: TokenSignatureVerifier;

    fn decode(token: &str) -> Result<DecodedToken<Self::Claims, Self::Verifier>, TokenError> {
        const MAX_TOKEN_LENGTH: usize = 8192;

        if token.len() > MAX_TOKEN_LENGTH {
            return Err(TokenError::TokenInvalid);
        }

        let decoded_token = b64_urlsafe
            .decode(token)
            .map_err(|_| TokenError::TokenInvalid)?;

        if decoded_token.len() <= Self::Verifier::signature_length() {
            return Err(TokenError::TokenInvalid);
        }

        let json_len = decoded_token.len() - Self::Verifier::signature_length();
        let json = &decoded_token[..json_len];

        let signature = Vec::from(&decoded_token[json_len..]);
        let claims: Self::Claims =
            serde_json::from_slice(json).map_err(|_| TokenError::TokenInvalid)?;

        Ok(DecodedToken {
            json: Vec::from(json),
            signature,
            claims,
            phantom: PhantomData,
        })
    }
}

/// Serializes the claims, appends the HMAC-SHA256 of the JSON, and base64-encodes the result.
pub(crate) fn sign_hmac_sha256<C: Serialize>(
    claims: &C,
    signing_key: &[u8],
) -> Result<String, TokenError> {
    let mut token_unencoded = serde_json::to_vec(claims).map_err(|_| TokenError::TokenInvalid)?;

    let mut mac = HmacSha256::new_from_slice(signing_key).map_err(|_| TokenError::TokenInvalid)?;
    mac.update(&token_unencoded);
    let signature = mac.finalize();
    token_unencoded.extend_from_slice(&signature.into_bytes());

    Ok(b64_urlsafe.encode(&token_unencoded))
}

#[derive(Debug)]
pub struct HmacSha256Verifier {}

impl TokenSignatureVerifier for HmacSha256Verifier {
    fn signature_length() -> usize {
        32
    }

    fn verify(json: &[u8], signature: &[u8], key: &[u8]) -> bool {
        let Ok(mut mac) = HmacSha256::new_from_slice(key) else {
            return false;
        };
        mac.update(json);
        let correct_signature = mac.finalize().into_bytes();

        if correct_signature.len() != signature.len() || signature.is_empty() {
            return false;
        }

        // Bitwise comparison so the time taken doesn't depend on where the first mismatch is
        let signatures_dont_match = correct_signature
            .iter()
            .zip(signature.iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b));

        signatures_dont_match == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde::Deserialize;
    use std::time::Duration;
    use uuid::Uuid;

    #[derive(Clone, Copy, Serialize, Deserialize)]
    struct TestClaims {
        id: Uuid,
        exp: u64,
    }

    impl Expiring for TestClaims {
        fn expiration(&self) -> u64 {
            self.exp
        }
    }

    struct TestTokenHmac {}

    impl Token for TestTokenHmac {
        type Claims = TestClaims;
        type Verifier = HmacSha256Verifier;
    }

    fn make_signature_invalid(token: &mut String) {
        let mut decoded = b64_urlsafe.decode(&token).unwrap();

        if decoded.last().unwrap() == &b'a' {
            decoded.pop();
            decoded.push(b'b');
        } else {
            decoded.pop();
            decoded.push(b'a');
        }

        *token = b64_urlsafe.encode(decoded);
    }

    fn exp_in(offset_secs: i64) -> u64 {
        let now = SystemTime::now();
        let exp = if offset_secs >= 0 {
            now + Duration::from_secs(offset_secs as u64)
        } else {
            now - Duration::from_secs(offset_secs.unsigned_abs())
        };

        exp.duration_since(UNIX_EPOCH).unwrap().as_secs()
    }

    #[test]
    fn test_decode() {
        let id = Uuid::now_v7();
        let exp = exp_in(10);
        let token = sign_hmac_sha256(&TestClaims { id, exp }, &[10; 64]).unwrap();
        let t = TestTokenHmac::decode(&token).unwrap();

        assert_eq!(t.claims.id, id);
        assert_eq!(t.claims.exp, exp);

        let claims = t.verify(&[10; 64]).unwrap();

        assert_eq!(claims.id, id);
        assert_eq!(claims.exp, exp);
    }

    #[test]
    fn test_decode_garbage() {
        assert!(matches!(
            TestTokenHmac::decode("not a token"),
            Err(TokenError::TokenInvalid)
        ));
        assert!(matches!(
            TestTokenHmac::decode(&b64_urlsafe.encode([1u8; 16])),
            Err(TokenError::TokenInvalid)
        ));
        assert!(matches!(
            TestTokenHmac::decode(&"A".repeat(8196)),
            Err(TokenError::TokenInvalid)
        ));
    }

    #[test]
    fn test_verify_hmac() {
        let id = Uuid::now_v7();
        let exp = exp_in(10);
        let key = [2; 64];

        let mut token = sign_hmac_sha256(&TestClaims { id, exp }, &key).unwrap();
        let t = TestTokenHmac::decode(&token).unwrap();
        let claims = t.verify(&key).unwrap();

        assert_eq!(claims.id, id);
        assert_eq!(claims.exp, exp);

        assert!(matches!(
            TestTokenHmac::decode(&token).unwrap().verify(&[3; 64]),
            Err(TokenError::TokenInvalid)
        ));

        make_signature_invalid(&mut token);
        assert!(matches!(
            TestTokenHmac::decode(&token).unwrap().verify(&key),
            Err(TokenError::TokenInvalid)
        ));

        let token = sign_hmac_sha256(&TestClaims { id, exp: exp_in(-10) }, &key).unwrap();
        assert!(matches!(
            TestTokenHmac::decode(&token).unwrap().verify(&key),
            Err(TokenError::TokenExpired)
        ));
    }
}
