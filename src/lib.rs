//! Encrypted seed custody with a password/2FA-gated reveal flow
//!
//! Protects a wallet's master seed at rest and gates its on-screen
//! reveal behind password verification, optional TOTP verification, and
//! a lifecycle-aware display window.
//!
//! ## Security Features
//!
//! - **Key Custody**: 64-byte vault key sealed under the Argon2id
//!   password digest, stored through a platform secure-storage seam
//! - **Sealing**: ChaCha20-Poly1305 with a versioned blob layout
//! - **Gated Reveal**: info → password → optional 2FA → seed, with
//!   automatic re-lock on backgrounding or account switch
//! - **Screenshot Blocking**: capture protection engaged for the entire
//!   seed-on-screen window
//! - **Secret Hygiene**: keys, hashes, entered credentials, and seeds
//!   are zeroed on drop

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod context;
pub mod custody;
pub mod error;
pub mod keys;
pub mod reveal;
pub mod screenshot_guard;
pub mod second_factor;
pub mod security;
pub mod seeds;

pub use context::SessionContext;
pub use custody::{
    FileStore, KeyCustody, KeychainCustody, MemoryStore, SecureStore, VaultCustody,
    ALIAS_STORAGE, ALIAS_TWO_FACTOR,
};
pub use error::{Error, Result};
pub use keys::{
    generate_encryption_key, EncryptionKey, OsRandomSource, RandomSource, ENCRYPTION_KEY_LENGTH,
};
pub use reveal::{Alert, AppLifecycle, BackOutcome, RevealStateMachine, RevealStep};
pub use screenshot_guard::{
    CaptureProtection, ProtectionReason, ProtectionState, ScreenshotGuard,
};
pub use second_factor::{
    should_auto_submit, RfcTotpVerifier, SecondFactorGate, TotpSecret, TotpVerifier, TOKEN_LENGTH,
};
pub use security::{
    generate_salt, Argon2Digest, PasswordDigest, PasswordGate, PasswordHash, SealingKey,
    PASSWORD_HASH_LENGTH,
};
pub use seeds::{Seed, SeedSource, VaultSeedStore};
