use blog_common::threadrand::SecureRng;

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::oneshot;
use zeroize::Zeroizing;

#[derive(Clone, Copy, Debug)]
pub struct HashParams {
    pub salt_length: u32,
    pub hash_length: u32,
    pub iterations: u32,
    pub mem_cost_kib: u32,
    pub threads: u32,
}

/// Argon2id hashing keyed with a server-side secret. The work runs on the rayon pool so
/// it doesn't stall actix workers.
pub struct PasswordHasher {
    secret: Zeroizing<Vec<u8>>,
    params: HashParams,
    // Verified against when a login names no existing user, so that path costs the same
    dummy_hash: String,
    verifications: AtomicUsize,
}

#[derive(Debug)]
pub enum HashingError {
    HashFailure(String),
    MalformedHash(String),
    ThreadPoolFailure,
}

impl std::error::Error for HashingError {}

impl fmt::Display for HashingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HashingError::HashFailure(e) => write!(f, "HashingError: Failed to hash: {e}"),
            HashingError::MalformedHash(e) => {
                write!(f, "HashingError: Stored hash is malformed: {e}")
            }
            HashingError::ThreadPoolFailure => {
                write!(f, "HashingError: Rayon thread pool failure")
            }
        }
    }
}

impl From<oneshot::error::RecvError> for HashingError {
    fn from(_err: oneshot::error::RecvError) -> Self {
        HashingError::ThreadPoolFailure
    }
}

impl PasswordHasher {
    /// Hashes a random password up front to produce the dummy hash, so this blocks for one
    /// full hash with the given parameters.
    pub fn new(secret: &[u8], params: HashParams) -> Result<Self, HashingError> {
        let dummy_password = Zeroizing::new(SecureRng::next_u128().to_le_bytes());
        let dummy_hash = hash_with(secret, &params, dummy_password.as_slice())?;

        Ok(Self {
            secret: Zeroizing::new(secret.to_vec()),
            params,
            dummy_hash,
            verifications: AtomicUsize::new(0),
        })
    }

    /// Returns the PHC string for the password.
    pub async fn hash(self: Arc<Self>, password: String) -> Result<String, HashingError> {
        let password = Zeroizing::new(password);
        let (sender, receiver) = oneshot::channel();

        rayon::spawn(move || {
            let result = hash_with(&self.secret, &self.params, password.as_bytes());

            // The receiver is only gone if the request was dropped
            let _ = sender.send(result);
        });

        receiver.await?
    }

    pub async fn verify(
        self: Arc<Self>,
        password: String,
        stored_hash: String,
    ) -> Result<bool, HashingError> {
        let password = Zeroizing::new(password);
        let (sender, receiver) = oneshot::channel();

        self.verifications.fetch_add(1, Ordering::Relaxed);

        rayon::spawn(move || {
            let result = match argon2_kdf::Hash::from_str(&stored_hash) {
                Ok(hash) => Ok(hash.verify_with_secret(
                    password.as_bytes(),
                    argon2_kdf::Secret::using_bytes(&self.secret),
                )),
                Err(e) => Err(HashingError::MalformedHash(e.to_string())),
            };

            let _ = sender.send(result);
        });

        receiver.await?
    }

    /// Does the same work as a failed `verify` for a user that doesn't exist.
    pub async fn verify_nonexistent(
        self: Arc<Self>,
        password: String,
    ) -> Result<(), HashingError> {
        let dummy_hash = self.dummy_hash.clone();
        self.verify(password, dummy_hash).await?;
        Ok(())
    }

    #[cfg(test)]
    pub fn verification_count(&self) -> usize {
        self.verifications.load(Ordering::Relaxed)
    }
}

fn hash_with(secret: &[u8], params: &HashParams, password: &[u8]) -> Result<String, HashingError> {
    argon2_kdf::Hasher::default()
        .algorithm(argon2_kdf::Algorithm::Argon2id)
        .salt_length(params.salt_length)
        .hash_length(params.hash_length)
        .iterations(params.iterations)
        .memory_cost_kib(params.mem_cost_kib)
        .threads(params.threads)
        .secret(argon2_kdf::Secret::using_bytes(secret))
        .hash(password)
        .map(|h| h.to_string())
        .map_err(|e| HashingError::HashFailure(e.to_string()))
}


#[cfg(test)]
mod tests {
    use super::*;

    #[actix_web::test]
    async fn test_hash_and_verify() {
        let hasher = Arc::new(test_utils::cheap_hasher());

        let hash = Arc::clone(&hasher)
            .hash(String::from("correct horse"))
            .await
            .unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(!hash.contains("correct horse"));

        assert!(Arc::clone(&hasher)
            .verify(String::from("correct horse"), hash.clone())
            .await
            .unwrap());
        assert!(!Arc::clone(&hasher)
            .verify(String::from("correct horsf"), hash.clone())
            .await
            .unwrap());

        let other_secret =
            Arc::new(PasswordHasher::new(&[8; 32], test_utils::CHEAP_PARAMS).unwrap());
        assert!(!other_secret
            .verify(String::from("correct horse"), hash)
            .await
            .unwrap());
    }

    #[actix_web::test]
    async fn test_same_password_salted_differently() {
        let hasher = Arc::new(test_utils::cheap_hasher());

        let a = Arc::clone(&hasher).hash(String::from("pw")).await.unwrap();
        let b = Arc::clone(&hasher).hash(String::from("pw")).await.unwrap();

        assert_ne!(a, b);
    }

    #[actix_web::test]
    async fn test_malformed_stored_hash() {
        let hasher = Arc::new(test_utils::cheap_hasher());

        assert!(matches!(
            hasher
                .verify(String::from("pw"), String::from("not a hash"))
                .await,
            Err(HashingError::MalformedHash(_))
        ));
    }

    #[actix_web::test]
    async fn test_verify_nonexistent() {
        let hasher = Arc::new(test_utils::cheap_hasher());
        assert!(hasher.dummy_hash.starts_with("$argon2id$"));
        assert_eq!(hasher.verification_count(), 0);

        Arc::clone(&hasher)
            .verify_nonexistent(String::from("anything"))
            .await
            .unwrap();

        assert_eq!(hasher.verification_count(), 1);
    }
}
