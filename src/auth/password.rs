//! Password hashing with Argon2id.

use crate::error::{AppError, AppResult};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use std::sync::Arc;

/// Salted one-way password hashing. Output is a PHC string that embeds the salt and
/// parameters, so verification works even after the cost factor changes.
#[derive(Clone)]
pub struct PasswordHasher {
    params: Params,
    // Verified against when the user does not exist, so both login failures cost the same.
    dummy_hash: Arc<str>,
}

impl PasswordHasher {
    /// `cost_factor` is the Argon2 time cost; memory and parallelism stay at the crate defaults.
    pub fn new(cost_factor: u32) -> AppResult<Self> {
        let params = Params::new(
            Params::DEFAULT_M_COST,
            cost_factor,
            Params::DEFAULT_P_COST,
            None,
        )
        .map_err(|e| AppError::Config(format!("argon2 params: {}", e)))?;
        let dummy_hash = hash_with(&params, "passgate-dummy-password")?;
        Ok(Self {
            params,
            dummy_hash: dummy_hash.into(),
        })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    pub fn hash(&self, password: &str) -> AppResult<String> {
        hash_with(&self.params, password)
    }

    /// `false` on mismatch and on a hash string that does not parse.
    pub fn verify(&self, password: &str, hash: &str) -> bool {
        let parsed = match PasswordHash::new(hash) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!(error = %e, "stored password hash is malformed");
                return false;
            }
        };
        self.argon2()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }

    /// Burns one verification's worth of work. Always `false`.
    pub fn verify_dummy(&self, password: &str) -> bool {
        let _ = self.verify(password, &self.dummy_hash);
        false
    }
}

fn hash_with(params: &Params, password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::new(Algorithm::Argon2id, Version::V0x13, params.clone())
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("hash: {}", e)))?
        .to_string();
    Ok(hash)
}
