//! Vault encryption key generation

use crate::{Error, Result};
use async_trait::async_trait;
use rand::RngCore;
use zeroize::Zeroizing;

/// Length of the vault encryption key in bytes
pub const ENCRYPTION_KEY_LENGTH: usize = 64;

/// Source of cryptographically secure random bytes.
///
/// Implementations may suspend while the platform gathers entropy.
#[async_trait]
pub trait RandomSource: Send + Sync {
    /// Return `n` random bytes.
    async fn random_bytes(&self, n: usize) -> Result<Vec<u8>>;
}

/// Random source backed by the operating system CSPRNG
pub struct OsRandomSource;

#[async_trait]
impl RandomSource for OsRandomSource {
    async fn random_bytes(&self, n: usize) -> Result<Vec<u8>> {
        let mut bytes = vec![0u8; n];
        rand::rngs::OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| Error::EntropyUnavailable(e.to_string()))?;
        Ok(bytes)
    }
}

/// Vault encryption key (64 bytes, zeroed on drop)
pub struct EncryptionKey(Zeroizing<[u8; ENCRYPTION_KEY_LENGTH]>);

impl EncryptionKey {
    /// Create from raw key bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != ENCRYPTION_KEY_LENGTH {
            return Err(Error::Encryption("invalid key length".to_string()));
        }
        let mut key = [0u8; ENCRYPTION_KEY_LENGTH];
        key.copy_from_slice(bytes);
        Ok(Self(Zeroizing::new(key)))
    }

    /// Get key bytes
    pub fn as_bytes(&self) -> &[u8; ENCRYPTION_KEY_LENGTH] {
        &self.0
    }
}

/// Generate a fresh vault encryption key from the supplied entropy source.
///
/// The raw bytes are used as-is, with no further transformation.
pub async fn generate_encryption_key(source: &dyn RandomSource) -> Result<EncryptionKey> {
    let bytes = Zeroizing::new(source.random_bytes(ENCRYPTION_KEY_LENGTH).await?);
    if bytes.len() != ENCRYPTION_KEY_LENGTH {
        return Err(Error::EntropyUnavailable(format!(
            "short read: got {} bytes",
            bytes.len()
        )));
    }
    EncryptionKey::from_bytes(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedSource(Vec<u8>);

    #[async_trait]
    impl RandomSource for FixedSource {
        async fn random_bytes(&self, n: usize) -> Result<Vec<u8>> {
            Ok(self.0.iter().copied().take(n).collect())
        }
    }

    struct FailingSource;

    #[async_trait]
    impl RandomSource for FailingSource {
        async fn random_bytes(&self, _n: usize) -> Result<Vec<u8>> {
            Err(Error::EntropyUnavailable("no entropy".to_string()))
        }
    }

    #[tokio::test]
    async fn generates_64_byte_key() {
        let key = generate_encryption_key(&OsRandomSource).await.unwrap();
        assert_eq!(key.as_bytes().len(), ENCRYPTION_KEY_LENGTH);
        assert!(key.as_bytes().iter().any(|&b| b != 0));
    }

    #[tokio::test]
    async fn uses_source_bytes_verbatim() {
        let bytes: Vec<u8> = (0..64).collect();
        let key = generate_encryption_key(&FixedSource(bytes.clone()))
            .await
            .unwrap();
        assert_eq!(&key.as_bytes()[..], &bytes[..]);
    }

    #[tokio::test]
    async fn short_read_is_entropy_unavailable() {
        let result = generate_encryption_key(&FixedSource(vec![7u8; 16])).await;
        assert!(matches!(result, Err(Error::EntropyUnavailable(_))));
    }

    #[tokio::test]
    async fn failing_source_propagates() {
        let result = generate_encryption_key(&FailingSource).await;
        assert!(matches!(result, Err(Error::EntropyUnavailable(_))));
    }

    #[test]
    fn rejects_wrong_length_bytes() {
        assert!(EncryptionKey::from_bytes(&[0u8; 32]).is_err());
        assert!(EncryptionKey::from_bytes(&[0u8; 64]).is_ok());
    }
}
