//! Second-factor (TOTP) verification
//!
//! The verifier itself sits behind a trait so the gate treats it as a
//! black box; the bundled implementation is RFC 6238 SHA-1 with a
//! 30-second period.

use crate::custody::KeyCustody;
use crate::security::PasswordHash;
use crate::{Error, Result};
use data_encoding::BASE32_NOPAD;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use totp_lite::{totp_custom, Sha1};
use zeroize::Zeroizing;

/// Expected token length; reaching it auto-triggers verification
pub const TOKEN_LENGTH: usize = 6;

/// TOTP time step in seconds
const PERIOD_SECS: u64 = 30;

/// Base32-encoded TOTP secret (zeroed on drop)
#[derive(Clone)]
pub struct TotpSecret(Zeroizing<String>);

impl TotpSecret {
    /// Wrap a base32 secret string
    pub fn new(secret: impl Into<String>) -> Self {
        Self(Zeroizing::new(secret.into()))
    }

    /// Decode a secret stored as raw UTF-8 bytes
    pub fn from_utf8(bytes: &[u8]) -> Result<Self> {
        let secret = std::str::from_utf8(bytes)
            .map_err(|_| Error::Encryption("two-factor secret is not valid UTF-8".to_string()))?;
        Ok(Self::new(secret))
    }

    /// Get the secret string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Length guard for input-driven submission: a token submits itself the
/// moment it reaches the expected length, never before.
pub fn should_auto_submit(token: &str) -> bool {
    token.chars().count() == TOKEN_LENGTH
}

/// Black-box token verifier
pub trait TotpVerifier: Send + Sync {
    /// Check `token` against `secret` for the current time window.
    fn verify_token(&self, secret: &TotpSecret, token: &str) -> bool;
}

/// RFC 6238 verifier: SHA-1, 30-second period, six digits, one step of
/// clock skew accepted either side.
pub struct RfcTotpVerifier;

impl RfcTotpVerifier {
    /// Check a token at an explicit Unix time (seconds)
    pub fn verify_at(&self, secret: &TotpSecret, token: &str, now_secs: u64) -> bool {
        let Some(key) = normalize_secret(secret.as_str()) else {
            return false;
        };
        [now_secs.saturating_sub(PERIOD_SECS), now_secs, now_secs + PERIOD_SECS]
            .iter()
            .any(|&t| totp_custom::<Sha1>(PERIOD_SECS, TOKEN_LENGTH as u32, &key, t) == token)
    }
}

impl TotpVerifier for RfcTotpVerifier {
    fn verify_token(&self, secret: &TotpSecret, token: &str) -> bool {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        self.verify_at(secret, token, now)
    }
}

fn normalize_secret(secret: &str) -> Option<Zeroizing<Vec<u8>>> {
    let normalized: Zeroizing<String> = Zeroizing::new(
        secret
            .chars()
            .filter(|ch| !ch.is_ascii_whitespace())
            .map(|ch| ch.to_ascii_uppercase())
            .collect(),
    );
    BASE32_NOPAD
        .decode(normalized.as_bytes())
        .ok()
        .map(Zeroizing::new)
}

/// Verifies a TOTP token against the secret held in custody
pub struct SecondFactorGate {
    custody: Arc<dyn KeyCustody>,
    verifier: Arc<dyn TotpVerifier>,
}

impl SecondFactorGate {
    /// Create a gate over the given custody and verifier
    pub fn new(custody: Arc<dyn KeyCustody>, verifier: Arc<dyn TotpVerifier>) -> Self {
        Self { custody, verifier }
    }

    /// Fetch the secret via custody and check `token` against it.
    ///
    /// Empty tokens fail fast with `EmptyToken` and never reach the
    /// verifier. A missing secret surfaces as `SecretUnavailable`: the
    /// two-factor flag is set but custody holds nothing for it.
    pub async fn verify(&self, password_hash: &PasswordHash, token: &str) -> Result<bool> {
        if token.is_empty() {
            return Err(Error::EmptyToken);
        }

        let secret = match self.custody.fetch_two_factor_secret(password_hash).await {
            Ok(secret) => secret,
            Err(Error::NotFound(_)) => return Err(Error::SecretUnavailable),
            Err(e) => return Err(e),
        };

        Ok(self.verifier.verify_token(&secret, token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // RFC 6238 test secret: "12345678901234567890" in base32
    const RFC_SECRET: &str = "GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ";

    #[test]
    fn rfc_vector_sha1() {
        let secret = TotpSecret::new(RFC_SECRET);
        assert!(RfcTotpVerifier.verify_at(&secret, "287082", 59));
        assert!(!RfcTotpVerifier.verify_at(&secret, "287083", 59));
    }

    #[test]
    fn accepts_adjacent_window() {
        let secret = TotpSecret::new(RFC_SECRET);
        // Code for t=59 remains valid one step later
        assert!(RfcTotpVerifier.verify_at(&secret, "287082", 59 + PERIOD_SECS));
        // But not two steps later
        assert!(!RfcTotpVerifier.verify_at(&secret, "287082", 59 + 2 * PERIOD_SECS));
    }

    #[test]
    fn secret_normalization_ignores_case_and_whitespace() {
        let secret = TotpSecret::new("gezd gnbv gy3t qojq gezd gnbv gy3t qojq");
        assert!(RfcTotpVerifier.verify_at(&secret, "287082", 59));
    }

    #[test]
    fn invalid_secret_never_matches() {
        let secret = TotpSecret::new("***not-base32***");
        assert!(!RfcTotpVerifier.verify_at(&secret, "287082", 59));
    }

    #[test]
    fn auto_submit_guard_is_exact_length() {
        assert!(!should_auto_submit(""));
        assert!(!should_auto_submit("12345"));
        assert!(should_auto_submit("123456"));
        assert!(!should_auto_submit("1234567"));
    }
}
