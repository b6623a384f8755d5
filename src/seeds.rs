//! Seed retrieval through the custody key
//!
//! Seed blobs are sealed under a key compressed from the 64-byte vault
//! encryption key, so fetching a seed always goes through custody first.

use crate::custody::{KeyCustody, SecureStore};
use crate::security::{PasswordHash, SealingKey};
use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::Arc;
use zeroize::Zeroizing;

/// Decrypted master seed (zeroed on drop)
#[derive(Clone)]
pub struct Seed(Zeroizing<Vec<u8>>);

impl Seed {
    /// Wrap raw seed bytes
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(Zeroizing::new(bytes))
    }

    /// Get seed bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Whether the seed is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Source of decrypted seeds for the reveal flow
#[async_trait]
pub trait SeedSource: Send + Sync {
    /// Fetch and decrypt the seed for `account_id`.
    async fn seed_for_account(
        &self,
        password_hash: &PasswordHash,
        account_id: &str,
    ) -> Result<Seed>;
}

fn seed_alias(account_id: &str) -> String {
    format!("seed:{account_id}")
}

/// Seed store sealed under the custody encryption key
pub struct VaultSeedStore<S> {
    custody: Arc<dyn KeyCustody>,
    store: S,
}

impl<S: SecureStore> VaultSeedStore<S> {
    /// Create a seed store over the given custody and storage
    pub fn new(custody: Arc<dyn KeyCustody>, store: S) -> Self {
        Self { custody, store }
    }

    /// Provision the seed for an account (account creation or import).
    pub async fn store_seed(
        &self,
        password_hash: &PasswordHash,
        account_id: &str,
        seed: &Seed,
    ) -> Result<()> {
        let key = self.custody.fetch_key(password_hash).await?;
        let sealed = SealingKey::from_encryption_key(&key).seal(seed.as_bytes())?;
        self.store.write(&seed_alias(account_id), &sealed).await
    }

    /// Remove the seed entry for an account.
    pub async fn remove_seed(&self, account_id: &str) -> Result<()> {
        self.store.delete(&seed_alias(account_id)).await
    }
}

#[async_trait]
impl<S: SecureStore> SeedSource for VaultSeedStore<S> {
    async fn seed_for_account(
        &self,
        password_hash: &PasswordHash,
        account_id: &str,
    ) -> Result<Seed> {
        let key = self.custody.fetch_key(password_hash).await?;
        let sealed = self
            .store
            .read(&seed_alias(account_id))
            .await?
            .ok_or_else(|| Error::NotFound(seed_alias(account_id)))?;
        let plaintext = SealingKey::from_encryption_key(&key).open(&sealed)?;
        Ok(Seed::new(plaintext.to_vec()))
    }
}
