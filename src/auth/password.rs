use anyhow::anyhow;
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tracing::error;

/// One-way salted hashing for passwords and refresh tokens.
pub trait Hasher: Send + Sync {
    fn hash(&self, plain: &str) -> anyhow::Result<String>;

    /// Constant-time check of `plain` against a stored hash.
    fn verify(&self, plain: &str, hash: &str) -> anyhow::Result<bool>;
}

/// Argon2id with default parameters, PHC-encoded output.
#[derive(Debug, Clone, Copy, Default)]
pub struct Argon2Hasher;

impl Hasher for Argon2Hasher {
    fn hash(&self, plain: &str) -> anyhow::Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(plain.as_bytes(), &salt)
            .map(|phc| phc.to_string())
            .map_err(|e| {
                error!(error = %e, "argon2 hashing failed");
                anyhow!("hash secret: {e}")
            })
    }

    fn verify(&self, plain: &str, hash: &str) -> anyhow::Result<bool> {
        let stored = PasswordHash::new(hash).map_err(|e| {
            error!(error = %e, "stored hash is not a valid PHC string");
            anyhow!("parse stored hash: {e}")
        })?;
        match Argon2::default().verify_password(plain.as_bytes(), &stored) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(anyhow!("verify secret: {e}")),
        }
    }
}
