//! Key custody over platform secure storage
//!
//! Two variants share one contract: `VaultCustody` keeps a single sealed
//! record holding both the vault key and the two-factor secret (the
//! desktop shape), `KeychainCustody` keeps one sealed entry per alias
//! (the mobile keychain shape). Both are generic over a `SecureStore`,
//! which stands in for the platform keychain / secure enclave the same
//! way a keystore shim would for FFI.

use crate::keys::EncryptionKey;
use crate::second_factor::TotpSecret;
use crate::security::{PasswordHash, SealingKey};
use crate::{Error, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Alias for the vault encryption key entry
pub const ALIAS_STORAGE: &str = "storage";

/// Alias for the two-factor secret entry
pub const ALIAS_TWO_FACTOR: &str = "twoFactorAuth";

/// Platform secure storage: opaque blobs addressed by alias.
///
/// All operations are persistent writes; none count retries, all are
/// safe to retry (last-write-wins).
#[async_trait]
pub trait SecureStore: Send + Sync {
    /// Read the blob stored under `alias`, if any.
    async fn read(&self, alias: &str) -> Result<Option<Vec<u8>>>;

    /// Write (or overwrite) the blob under `alias`.
    async fn write(&self, alias: &str, data: &[u8]) -> Result<()>;

    /// Delete the blob under `alias`. Deleting a missing entry is not an
    /// error.
    async fn delete(&self, alias: &str) -> Result<()>;
}

/// In-memory store for tests and platforms without native integration
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SecureStore for MemoryStore {
    async fn read(&self, alias: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.read().get(alias).cloned())
    }

    async fn write(&self, alias: &str, data: &[u8]) -> Result<()> {
        self.entries.write().insert(alias.to_string(), data.to_vec());
        Ok(())
    }

    async fn delete(&self, alias: &str) -> Result<()> {
        self.entries.write().remove(alias);
        Ok(())
    }
}

/// File-backed store: one file per alias under a vault directory
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Create a store rooted at `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    // Aliases are hex-encoded so arbitrary alias strings map to valid
    // filenames without collisions.
    fn path_for(&self, alias: &str) -> PathBuf {
        self.dir.join(format!("{}.vault", hex::encode(alias.as_bytes())))
    }
}

#[async_trait]
impl SecureStore for FileStore {
    async fn read(&self, alias: &str) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(self.path_for(alias)).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::Storage(e.to_string())),
        }
    }

    async fn write(&self, alias: &str, data: &[u8]) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| Error::StorageWrite(e.to_string()))?;
        tokio::fs::write(self.path_for(alias), data)
            .await
            .map_err(|e| Error::StorageWrite(e.to_string()))
    }

    async fn delete(&self, alias: &str) -> Result<()> {
        match tokio::fs::remove_file(self.path_for(alias)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::StorageWrite(e.to_string())),
        }
    }
}

/// Custody of the vault encryption key and the two-factor secret,
/// sealed under the session password hash.
#[async_trait]
pub trait KeyCustody: Send + Sync {
    /// Seal and persist the vault encryption key.
    async fn store_key(&self, password_hash: &PasswordHash, key: &EncryptionKey) -> Result<()>;

    /// Fetch and unseal the vault encryption key.
    ///
    /// Fails with `DecryptionFailed` under a wrong hash and `NotFound`
    /// when no entry exists.
    async fn fetch_key(&self, password_hash: &PasswordHash) -> Result<EncryptionKey>;

    /// Remove the vault encryption key entry.
    async fn remove_key(&self) -> Result<()>;

    /// Seal and persist the two-factor secret.
    async fn store_two_factor_secret(
        &self,
        password_hash: &PasswordHash,
        secret: &TotpSecret,
    ) -> Result<()>;

    /// Fetch and unseal the two-factor secret.
    async fn fetch_two_factor_secret(&self, password_hash: &PasswordHash) -> Result<TotpSecret>;

    /// Remove the two-factor secret, leaving the key entry untouched.
    async fn remove_two_factor_secret(&self, password_hash: &PasswordHash) -> Result<()>;

    /// Store-or-delete surface kept for compatibility with the original
    /// storage layer: `Some` stores the two-factor secret, `None`
    /// removes it. New callers should use the split operations above.
    async fn add_key(
        &self,
        password_hash: &PasswordHash,
        secret: Option<&TotpSecret>,
    ) -> Result<()> {
        match secret {
            Some(secret) => self.store_two_factor_secret(password_hash, secret).await,
            None => self.remove_two_factor_secret(password_hash).await,
        }
    }
}

/// Contents of the desktop vault record
#[derive(Serialize, Deserialize, Default, Zeroize, ZeroizeOnDrop)]
struct VaultRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    encryption_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    two_factor_secret: Option<String>,
}

/// Desktop custody variant: one sealed JSON record holding both fields.
///
/// Every mutation is read-modify-write so disabling 2FA never rotates
/// the vault key and vice versa.
pub struct VaultCustody<S> {
    store: S,
}

impl<S: SecureStore> VaultCustody<S> {
    /// Create a custody over the given store
    pub fn new(store: S) -> Self {
        Self { store }
    }

    async fn load_record(&self, password_hash: &PasswordHash) -> Result<VaultRecord> {
        match self.store.read(ALIAS_STORAGE).await? {
            None => Ok(VaultRecord::default()),
            Some(sealed) => {
                let plaintext = SealingKey::from_password_hash(password_hash).open(&sealed)?;
                Ok(serde_json::from_slice(&plaintext)?)
            }
        }
    }

    async fn save_record(&self, password_hash: &PasswordHash, record: &VaultRecord) -> Result<()> {
        let plaintext = Zeroizing::new(serde_json::to_vec(record)?);
        let sealed = SealingKey::from_password_hash(password_hash).seal(&plaintext)?;
        self.store.write(ALIAS_STORAGE, &sealed).await
    }
}

#[async_trait]
impl<S: SecureStore> KeyCustody for VaultCustody<S> {
    async fn store_key(&self, password_hash: &PasswordHash, key: &EncryptionKey) -> Result<()> {
        let mut record = self.load_record(password_hash).await?;
        record.encryption_key = Some(hex::encode(key.as_bytes()));
        self.save_record(password_hash, &record).await
    }

    async fn fetch_key(&self, password_hash: &PasswordHash) -> Result<EncryptionKey> {
        let record = self.load_record(password_hash).await?;
        let encoded = record
            .encryption_key
            .as_deref()
            .ok_or_else(|| Error::NotFound(ALIAS_STORAGE.to_string()))?;
        let bytes = Zeroizing::new(
            hex::decode(encoded).map_err(|e| Error::Encryption(e.to_string()))?,
        );
        EncryptionKey::from_bytes(&bytes)
    }

    async fn remove_key(&self) -> Result<()> {
        self.store.delete(ALIAS_STORAGE).await
    }

    async fn store_two_factor_secret(
        &self,
        password_hash: &PasswordHash,
        secret: &TotpSecret,
    ) -> Result<()> {
        let mut record = self.load_record(password_hash).await?;
        record.two_factor_secret = Some(secret.as_str().to_string());
        self.save_record(password_hash, &record).await
    }

    async fn fetch_two_factor_secret(&self, password_hash: &PasswordHash) -> Result<TotpSecret> {
        let record = self.load_record(password_hash).await?;
        record
            .two_factor_secret
            .as_deref()
            .map(TotpSecret::new)
            .ok_or_else(|| Error::NotFound(ALIAS_TWO_FACTOR.to_string()))
    }

    async fn remove_two_factor_secret(&self, password_hash: &PasswordHash) -> Result<()> {
        let mut record = self.load_record(password_hash).await?;
        record.two_factor_secret = None;
        self.save_record(password_hash, &record).await
    }
}

/// Mobile custody variant: one sealed entry per keychain alias
pub struct KeychainCustody<S> {
    store: S,
}

impl<S: SecureStore> KeychainCustody<S> {
    /// Create a custody over the given store
    pub fn new(store: S) -> Self {
        Self { store }
    }

    async fn read_sealed(
        &self,
        password_hash: &PasswordHash,
        alias: &str,
    ) -> Result<Zeroizing<Vec<u8>>> {
        let sealed = self
            .store
            .read(alias)
            .await?
            .ok_or_else(|| Error::NotFound(alias.to_string()))?;
        SealingKey::from_password_hash(password_hash).open(&sealed)
    }

    async fn write_sealed(
        &self,
        password_hash: &PasswordHash,
        alias: &str,
        plaintext: &[u8],
    ) -> Result<()> {
        let sealed = SealingKey::from_password_hash(password_hash).seal(plaintext)?;
        self.store.write(alias, &sealed).await
    }
}

#[async_trait]
impl<S: SecureStore> KeyCustody for KeychainCustody<S> {
    async fn store_key(&self, password_hash: &PasswordHash, key: &EncryptionKey) -> Result<()> {
        self.write_sealed(password_hash, ALIAS_STORAGE, key.as_bytes())
            .await
    }

    async fn fetch_key(&self, password_hash: &PasswordHash) -> Result<EncryptionKey> {
        let plaintext = self.read_sealed(password_hash, ALIAS_STORAGE).await?;
        EncryptionKey::from_bytes(&plaintext)
    }

    async fn remove_key(&self) -> Result<()> {
        self.store.delete(ALIAS_STORAGE).await
    }

    async fn store_two_factor_secret(
        &self,
        password_hash: &PasswordHash,
        secret: &TotpSecret,
    ) -> Result<()> {
        self.write_sealed(password_hash, ALIAS_TWO_FACTOR, secret.as_str().as_bytes())
            .await
    }

    async fn fetch_two_factor_secret(&self, password_hash: &PasswordHash) -> Result<TotpSecret> {
        let plaintext = self.read_sealed(password_hash, ALIAS_TWO_FACTOR).await?;
        TotpSecret::from_utf8(&plaintext)
    }

    async fn remove_two_factor_secret(&self, _password_hash: &PasswordHash) -> Result<()> {
        self.store.delete(ALIAS_TWO_FACTOR).await
    }
}
