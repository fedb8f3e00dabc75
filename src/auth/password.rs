use std::sync::Arc;

use anyhow::Context;
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rand::rngs::OsRng;
use tokio::sync::Semaphore;
use tracing::error;

use crate::config::HashingConfig;

pub fn hash_password(params: &Params, plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params.clone());
    let hash = argon2
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            anyhow::anyhow!(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

/// Cost parameters are read back from the PHC string, so any hash this
/// service ever produced still verifies after the config changes.
pub fn verify_password(plain: &str, hash: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| {
        error!(error = %e, "argon2 parse hash error");
        anyhow::anyhow!(e.to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

/// Runs Argon2 on the blocking pool, at most `max_concurrency` jobs at once.
#[derive(Clone)]
pub struct HashingPool {
    params: Params,
    permits: Arc<Semaphore>,
    // Same cost as real hashes; verified against when there is no user to check.
    dummy_hash: Arc<str>,
}

impl HashingPool {
    pub fn new(cfg: &HashingConfig) -> anyhow::Result<Self> {
        let params = Params::new(cfg.memory_kib, cfg.iterations, cfg.parallelism, None)
            .map_err(|e| anyhow::anyhow!("invalid argon2 params: {e}"))?;
        let dummy_hash = hash_password(&params, "quizora-no-such-user").context("dummy hash")?;
        Ok(Self {
            params,
            permits: Arc::new(Semaphore::new(cfg.max_concurrency.max(1))),
            dummy_hash: dummy_hash.into(),
        })
    }

    pub async fn hash(&self, plain: String) -> anyhow::Result<String> {
        let _permit = self
            .permits
            .acquire()
            .await
            .context("hashing pool closed")?;
        let params = self.params.clone();
        tokio::task::spawn_blocking(move || hash_password(&params, &plain))
            .await
            .context("hashing task panicked")?
    }

    pub async fn verify(&self, plain: String, hash: String) -> anyhow::Result<bool> {
        let _permit = self
            .permits
            .acquire()
            .await
            .context("hashing pool closed")?;
        tokio::task::spawn_blocking(move || verify_password(&plain, &hash))
            .await
            .context("verify task panicked")?
    }

    /// Burns one verification's worth of time when there is no stored hash,
    /// so a missing account costs the same as a wrong password.
    pub async fn verify_dummy(&self, plain: String) -> anyhow::Result<()> {
        self.verify(plain, self.dummy_hash.to_string()).await?;
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn permits(&self) -> Arc<Semaphore> {
        self.permits.clone()
    }
}
