//! Password digest and sealing primitives
//!
//! Implements Argon2id digesting of the login password and the
//! ChaCha20-Poly1305 sealing used for custody entries and seed blobs.

use crate::keys::EncryptionKey;
use crate::{Error, Result};
use argon2::{Argon2, ParamsBuilder, Version};
use chacha20poly1305::{
    aead::{Aead, KeyInit, OsRng},
    ChaCha20Poly1305, Nonce,
};
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use zeroize::Zeroizing;

/// Length of the password digest in bytes
pub const PASSWORD_HASH_LENGTH: usize = 32;

/// Argon2id parameters: m_cost (KiB), t_cost, p_cost
const ARGON2_PARAMS: (u32, u32, u32) = (65536, 3, 4);

/// One-way digest of the login password (zeroed on drop).
///
/// Set at login, dropped at logout. Doubles as the sealing key for
/// custody entries.
#[derive(Clone)]
pub struct PasswordHash(Zeroizing<[u8; PASSWORD_HASH_LENGTH]>);

impl PasswordHash {
    /// Create from raw digest bytes
    pub fn from_bytes(bytes: [u8; PASSWORD_HASH_LENGTH]) -> Self {
        Self(Zeroizing::new(bytes))
    }

    /// Get digest bytes
    pub fn as_bytes(&self) -> &[u8; PASSWORD_HASH_LENGTH] {
        &self.0
    }
}

impl std::fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PasswordHash([redacted])")
    }
}

impl PartialEq for PasswordHash {
    fn eq(&self, other: &Self) -> bool {
        self.0[..] == other.0[..]
    }
}

impl Eq for PasswordHash {}

/// Digest primitive used to hash login passwords.
///
/// Kept behind a trait so tests can count invocations and swap in a
/// cheap digest.
pub trait PasswordDigest: Send + Sync {
    /// Digest a password under the vault salt.
    fn digest(&self, password: &str, salt: &[u8]) -> Result<PasswordHash>;
}

/// Argon2id digest with 64 MiB memory, 3 iterations, 4 lanes
pub struct Argon2Digest;

impl PasswordDigest for Argon2Digest {
    fn digest(&self, password: &str, salt: &[u8]) -> Result<PasswordHash> {
        if salt.len() < 16 {
            return Err(Error::Encryption("salt too short".to_string()));
        }

        let params = ParamsBuilder::new()
            .m_cost(ARGON2_PARAMS.0)
            .t_cost(ARGON2_PARAMS.1)
            .p_cost(ARGON2_PARAMS.2)
            .output_len(PASSWORD_HASH_LENGTH)
            .build()
            .map_err(|e| Error::Encryption(e.to_string()))?;

        let argon2 = Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, params);

        let mut out = Zeroizing::new([0u8; PASSWORD_HASH_LENGTH]);
        argon2
            .hash_password_into(password.as_bytes(), salt, &mut *out)
            .map_err(|e| Error::Encryption(e.to_string()))?;

        Ok(PasswordHash(out))
    }
}

/// Verifies a candidate password against the session password hash
pub struct PasswordGate {
    digest: Arc<dyn PasswordDigest>,
}

impl PasswordGate {
    /// Create a gate around the given digest primitive
    pub fn new(digest: Arc<dyn PasswordDigest>) -> Self {
        Self { digest }
    }

    /// Digest `candidate` and compare byte-for-byte against `stored`.
    ///
    /// Empty candidates fail fast with `EmptyPassword` and never reach
    /// the digest.
    pub fn verify(&self, candidate: &str, stored: &PasswordHash, salt: &[u8]) -> Result<bool> {
        if candidate.is_empty() {
            return Err(Error::EmptyPassword);
        }
        Ok(self.digest.digest(candidate, salt)? == *stored)
    }
}

/// Symmetric sealing key for custody entries and seed blobs
pub struct SealingKey(Zeroizing<[u8; 32]>);

impl SealingKey {
    /// Key custody entries directly under the password digest
    pub fn from_password_hash(hash: &PasswordHash) -> Self {
        Self(Zeroizing::new(*hash.as_bytes()))
    }

    /// Compress the 64-byte vault key into a sealing key for seed blobs
    pub fn from_encryption_key(key: &EncryptionKey) -> Self {
        let digest = Sha256::digest(key.as_bytes());
        Self(Zeroizing::new(digest.into()))
    }

    /// Seal plaintext.
    ///
    /// Output layout: `[version(1)][nonce(12)][ciphertext]`.
    pub fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let cipher = ChaCha20Poly1305::new((&*self.0).into());

        let mut nonce_bytes = [0u8; 12];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, plaintext)
            .map_err(|e| Error::Encryption(e.to_string()))?;

        let mut out = Vec::with_capacity(1 + 12 + ciphertext.len());
        out.push(1);
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    /// Open a sealed blob.
    ///
    /// Fails with `DecryptionFailed` when the blob does not authenticate
    /// under this key; never returns plausible-looking plaintext.
    pub fn open(&self, data: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        if data.len() < 13 {
            return Err(Error::DecryptionFailed);
        }
        if data[0] != 1 {
            return Err(Error::Encryption(format!(
                "unsupported sealing version: {}",
                data[0]
            )));
        }

        let cipher = ChaCha20Poly1305::new((&*self.0).into());
        let nonce = Nonce::from_slice(&data[1..13]);

        cipher
            .decrypt(nonce, &data[13..])
            .map(Zeroizing::new)
            .map_err(|_| Error::DecryptionFailed)
    }
}

/// Generate a random vault salt
pub fn generate_salt() -> [u8; 32] {
    let mut salt = [0u8; 32];
    OsRng.fill_bytes(&mut salt);
    salt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_deterministic() {
        let salt = generate_salt();
        let h1 = Argon2Digest.digest("correct horse", &salt).unwrap();
        let h2 = Argon2Digest.digest("correct horse", &salt).unwrap();
        assert_eq!(h1, h2);
    }

    #[test]
    fn digest_varies_with_salt_and_password() {
        let salt1 = generate_salt();
        let salt2 = generate_salt();
        let base = Argon2Digest.digest("correct horse", &salt1).unwrap();
        assert_ne!(base, Argon2Digest.digest("correct horse", &salt2).unwrap());
        assert_ne!(base, Argon2Digest.digest("battery staple", &salt1).unwrap());
    }

    #[test]
    fn digest_rejects_short_salt() {
        assert!(Argon2Digest.digest("pw", &[0u8; 15]).is_err());
    }

    #[test]
    fn gate_rejects_empty_password_without_digesting() {
        let gate = PasswordGate::new(Arc::new(Argon2Digest));
        let stored = PasswordHash::from_bytes([7u8; 32]);
        let result = gate.verify("", &stored, &generate_salt());
        assert!(matches!(result, Err(Error::EmptyPassword)));
    }

    #[test]
    fn gate_matches_correct_password() {
        let salt = generate_salt();
        let stored = Argon2Digest.digest("open sesame", &salt).unwrap();
        let gate = PasswordGate::new(Arc::new(Argon2Digest));
        assert!(gate.verify("open sesame", &stored, &salt).unwrap());
        assert!(!gate.verify("open says me", &stored, &salt).unwrap());
    }

    #[test]
    fn seal_open_roundtrip() {
        let key = SealingKey::from_password_hash(&PasswordHash::from_bytes([3u8; 32]));
        let sealed = key.seal(b"vault contents").unwrap();
        assert_ne!(&sealed[13..], b"vault contents");
        assert_eq!(&*key.open(&sealed).unwrap(), b"vault contents");
    }

    #[test]
    fn wrong_key_fails_to_open() {
        let key = SealingKey::from_password_hash(&PasswordHash::from_bytes([3u8; 32]));
        let other = SealingKey::from_password_hash(&PasswordHash::from_bytes([4u8; 32]));
        let sealed = key.seal(b"vault contents").unwrap();
        assert!(matches!(other.open(&sealed), Err(Error::DecryptionFailed)));
    }

    #[test]
    fn tampered_blob_fails_to_open() {
        let key = SealingKey::from_password_hash(&PasswordHash::from_bytes([3u8; 32]));
        let mut sealed = key.seal(b"vault contents").unwrap();
        let last = sealed.len() - 1;
        sealed[last] ^= 0x01;
        assert!(matches!(key.open(&sealed), Err(Error::DecryptionFailed)));
    }

    #[test]
    fn unknown_version_is_rejected() {
        let key = SealingKey::from_password_hash(&PasswordHash::from_bytes([3u8; 32]));
        let mut sealed = key.seal(b"data").unwrap();
        sealed[0] = 9;
        assert!(matches!(key.open(&sealed), Err(Error::Encryption(_))));
    }

    #[test]
    fn truncated_blob_is_rejected() {
        let key = SealingKey::from_password_hash(&PasswordHash::from_bytes([3u8; 32]));
        assert!(matches!(key.open(&[1, 2, 3]), Err(Error::DecryptionFailed)));
    }
}
