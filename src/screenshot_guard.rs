//! Screen-capture protection for sensitive screens
//!
//! Tracks protection state across the app; the platform hook (FLAG_SECURE
//! on Android, secure text field on iOS, window sharing type on macOS)
//! attaches via FFI and mirrors this state.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

/// Capture-protection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtectionState {
    /// Normal screen
    Disabled,
    /// Sensitive content visible
    Enabled,
}

/// Why protection is engaged
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtectionReason {
    /// The decrypted seed is on screen
    SeedPhrase,
    /// The login password is being entered
    PasswordEntry,
    /// Other sensitive content
    Sensitive,
}

struct GuardState {
    reasons: RwLock<Vec<ProtectionReason>>,
    ref_count: AtomicU32,
    platform_supported: AtomicBool,
}

/// Ref-counted capture-protection tracker.
///
/// Cloning shares the underlying state, so one guard instance can be
/// handed to every flow that shows sensitive content.
#[derive(Clone)]
pub struct ScreenshotGuard {
    state: Arc<GuardState>,
}

impl ScreenshotGuard {
    /// Create a guard with no protections active
    pub fn new() -> Self {
        Self {
            state: Arc::new(GuardState {
                reasons: RwLock::new(Vec::new()),
                ref_count: AtomicU32::new(0),
                platform_supported: AtomicBool::new(false),
            }),
        }
    }

    /// Record whether the platform supports capture blocking (set during
    /// platform init)
    pub fn set_platform_supported(&self, supported: bool) {
        self.state.platform_supported.store(supported, Ordering::SeqCst);
    }

    /// Whether the platform supports capture blocking
    pub fn is_platform_supported(&self) -> bool {
        self.state.platform_supported.load(Ordering::SeqCst)
    }

    /// Current protection state
    pub fn state(&self) -> ProtectionState {
        if self.state.ref_count.load(Ordering::SeqCst) > 0 {
            ProtectionState::Enabled
        } else {
            ProtectionState::Disabled
        }
    }

    /// Whether any protection is active
    pub fn is_active(&self) -> bool {
        self.state() == ProtectionState::Enabled
    }

    /// Currently active protection reasons
    pub fn active_reasons(&self) -> Vec<ProtectionReason> {
        self.state.reasons.read().clone()
    }

    /// Engage protection; it disengages when the returned handle drops.
    pub fn engage(&self, reason: ProtectionReason) -> CaptureProtection {
        self.state.ref_count.fetch_add(1, Ordering::SeqCst);
        self.state.reasons.write().push(reason);
        tracing::debug!(?reason, "capture protection engaged");
        CaptureProtection {
            state: Arc::clone(&self.state),
            reason,
        }
    }
}

impl Default for ScreenshotGuard {
    fn default() -> Self {
        Self::new()
    }
}

/// RAII handle for one engaged protection
pub struct CaptureProtection {
    state: Arc<GuardState>,
    reason: ProtectionReason,
}

impl CaptureProtection {
    /// The reason this protection was engaged
    pub fn reason(&self) -> ProtectionReason {
        self.reason
    }
}

impl Drop for CaptureProtection {
    fn drop(&mut self) {
        let mut reasons = self.state.reasons.write();
        if let Some(pos) = reasons.iter().rposition(|r| *r == self.reason) {
            reasons.remove(pos);
        }
        drop(reasons);
        let prev = self.state.ref_count.fetch_sub(1, Ordering::SeqCst);
        if prev == 1 {
            tracing::debug!("capture protection disengaged");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engage_and_release() {
        let guard = ScreenshotGuard::new();
        assert_eq!(guard.state(), ProtectionState::Disabled);

        let protection = guard.engage(ProtectionReason::SeedPhrase);
        assert!(guard.is_active());
        assert_eq!(protection.reason(), ProtectionReason::SeedPhrase);

        drop(protection);
        assert_eq!(guard.state(), ProtectionState::Disabled);
        assert!(guard.active_reasons().is_empty());
    }

    #[test]
    fn nested_protections_disengage_last() {
        let guard = ScreenshotGuard::new();

        let outer = guard.engage(ProtectionReason::Sensitive);
        let inner = guard.engage(ProtectionReason::SeedPhrase);
        assert_eq!(guard.active_reasons().len(), 2);

        drop(inner);
        assert!(guard.is_active());
        assert_eq!(guard.active_reasons(), vec![ProtectionReason::Sensitive]);

        drop(outer);
        assert!(!guard.is_active());
    }

    #[test]
    fn clones_share_state() {
        let guard = ScreenshotGuard::new();
        let other = guard.clone();

        let _protection = guard.engage(ProtectionReason::PasswordEntry);
        assert!(other.is_active());
    }
}
