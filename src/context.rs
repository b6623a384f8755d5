//! Authenticated-session context

use crate::security::PasswordHash;

/// State of the authenticated session consumed by the reveal flow.
///
/// Constructed at login, dropped at logout, and passed explicitly to
/// whoever needs it — there is no process-global password hash. The
/// reveal subsystem only ever reads it; login and password-change flows
/// own the writes.
#[derive(Clone)]
pub struct SessionContext {
    password_hash: PasswordHash,
    kdf_salt: Vec<u8>,
    two_factor_enabled: bool,
}

impl SessionContext {
    /// Create a context for an authenticated session
    pub fn new(password_hash: PasswordHash, kdf_salt: Vec<u8>, two_factor_enabled: bool) -> Self {
        Self {
            password_hash,
            kdf_salt,
            two_factor_enabled,
        }
    }

    /// The session password hash
    pub fn password_hash(&self) -> &PasswordHash {
        &self.password_hash
    }

    /// The vault KDF salt
    pub fn kdf_salt(&self) -> &[u8] {
        &self.kdf_salt
    }

    /// Whether two-factor verification is enabled for this session
    pub fn two_factor_enabled(&self) -> bool {
        self.two_factor_enabled
    }
}
