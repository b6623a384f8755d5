//! Error types

/// Errors produced by the seed-protection subsystem
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Platform entropy source failed to supply random bytes
    #[error("entropy unavailable: {0}")]
    EntropyUnavailable(String),

    /// Ciphertext failed to authenticate under the supplied key
    #[error("decryption failed")]
    DecryptionFailed,

    /// No custody entry exists for the alias
    #[error("not found: {0}")]
    NotFound(String),

    /// Two-factor flag is set but no secret is stored
    #[error("two-factor secret unavailable")]
    SecretUnavailable,

    /// Empty password submitted
    #[error("empty password")]
    EmptyPassword,

    /// Empty token submitted
    #[error("empty token")]
    EmptyToken,

    /// Secure storage write failed
    #[error("storage write failed: {0}")]
    StorageWrite(String),

    /// Storage error (generic)
    #[error("storage error: {0}")]
    Storage(String),

    /// Encryption error
    #[error("encryption error: {0}")]
    Encryption(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type
pub type Result<T> = std::result::Result<T, Error>;
