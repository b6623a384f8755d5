//! Password/2FA-gated seed reveal flow
//!
//! One machine instance is one reveal session. The host UI drives it
//! with `advance`/`go_back`/input calls and forwards app-lifecycle
//! events; errors surface as non-blocking alerts, never as return
//! values, and the session re-prompts instead of crashing.

use crate::context::SessionContext;
use crate::custody::KeyCustody;
use crate::screenshot_guard::{CaptureProtection, ProtectionReason, ScreenshotGuard};
use crate::second_factor::{should_auto_submit, SecondFactorGate, TotpVerifier};
use crate::security::{PasswordDigest, PasswordGate};
use crate::seeds::{Seed, SeedSource};
use crate::Error;
use parking_lot::RwLock;
use std::collections::VecDeque;
use std::sync::Arc;
use zeroize::Zeroizing;

/// Steps of the reveal flow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealStep {
    /// Warning screen shown before any credential entry
    ViewingGeneralInfo,
    /// Awaiting the login password
    EnteringPassword,
    /// Awaiting the six-digit token (two-factor sessions only)
    EnteringSecondFactor,
    /// Seed on screen, capture protection engaged
    ViewingSeed,
}

/// Application lifecycle signals delivered by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppLifecycle {
    /// App is active and visible
    Foreground,
    /// App moved to the background
    Background,
    /// App is transitioning or obscured
    Inactive,
}

/// Non-blocking notifications surfaced to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alert {
    /// No password was entered
    EmptyPassword,
    /// The entered password does not match the session password
    UnrecognisedPassword,
    /// No token was entered
    EmptyCode,
    /// The entered token does not match
    WrongCode,
    /// Custody state is missing or corrupted; recovery happens elsewhere
    SomethingWentWrong,
}

/// Outcome of back-navigation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackOutcome {
    /// Session reset to the info screen
    ResetToStart,
    /// Host should leave the reveal flow entirely
    LeftFlow,
}

/// Compute the step sequence for a session. Fixed at session start;
/// never re-evaluated mid-flow.
fn step_sequence(two_factor_enabled: bool) -> Vec<RevealStep> {
    if two_factor_enabled {
        vec![
            RevealStep::ViewingGeneralInfo,
            RevealStep::EnteringPassword,
            RevealStep::EnteringSecondFactor,
            RevealStep::ViewingSeed,
        ]
    } else {
        vec![
            RevealStep::ViewingGeneralInfo,
            RevealStep::EnteringPassword,
            RevealStep::ViewingSeed,
        ]
    }
}

struct RevealSession {
    account_id: String,
    steps: Vec<RevealStep>,
    step: RevealStep,
    password: Zeroizing<String>,
    token: Zeroizing<String>,
    seed: Option<Seed>,
    protection: Option<CaptureProtection>,
    busy: bool,
    epoch: u64,
    alerts: VecDeque<Alert>,
}

enum Outcome {
    Alert(Alert),
    SeedFetched(Seed),
    SecondFactorPassed,
}

/// Gated seed reveal state machine.
///
/// Methods take `&self`; session state lives behind a lock so the host
/// can hold one handle for input, lifecycle events, and rendering. At
/// most one verification is in flight at a time — input arriving while
/// busy is dropped, and a verification that resolves after the session
/// was reset discards its result.
pub struct RevealStateMachine {
    gate: PasswordGate,
    second_factor: SecondFactorGate,
    seeds: Arc<dyn SeedSource>,
    guard: ScreenshotGuard,
    context: SessionContext,
    session: RwLock<RevealSession>,
}

impl RevealStateMachine {
    /// Start a reveal session for `account_id`.
    #[allow(clippy::too_many_arguments)]
    pub fn start(
        digest: Arc<dyn PasswordDigest>,
        custody: Arc<dyn KeyCustody>,
        verifier: Arc<dyn TotpVerifier>,
        seeds: Arc<dyn SeedSource>,
        guard: ScreenshotGuard,
        context: SessionContext,
        account_id: impl Into<String>,
    ) -> Self {
        let steps = step_sequence(context.two_factor_enabled());
        let account_id = account_id.into();
        tracing::info!(account = %account_id, "reveal flow started");
        Self {
            gate: PasswordGate::new(digest),
            second_factor: SecondFactorGate::new(custody, verifier),
            seeds,
            guard,
            context,
            session: RwLock::new(RevealSession {
                account_id,
                steps,
                step: RevealStep::ViewingGeneralInfo,
                password: Zeroizing::new(String::new()),
                token: Zeroizing::new(String::new()),
                seed: None,
                protection: None,
                busy: false,
                epoch: 0,
                alerts: VecDeque::new(),
            }),
        }
    }

    /// The step the session is currently on
    pub fn current_step(&self) -> RevealStep {
        self.session.read().step
    }

    /// The full step sequence for this session
    pub fn steps(&self) -> Vec<RevealStep> {
        self.session.read().steps.clone()
    }

    /// The decrypted seed, exposed only while the seed step is active.
    pub fn revealed_seed(&self) -> Option<Seed> {
        let session = self.session.read();
        if session.step == RevealStep::ViewingSeed {
            session.seed.clone()
        } else {
            None
        }
    }

    /// Take all pending alerts, oldest first
    pub fn drain_alerts(&self) -> Vec<Alert> {
        self.session.write().alerts.drain(..).collect()
    }

    /// Record password input. Dropped while a verification is in flight.
    pub fn enter_password(&self, password: &str) {
        let mut session = self.session.write();
        if session.busy {
            return;
        }
        session.password = Zeroizing::new(password.to_string());
    }

    /// Record token input; verification auto-triggers the moment the
    /// token reaches the expected length, with no explicit submit.
    pub async fn enter_token(&self, token: &str) {
        let trigger = {
            let mut session = self.session.write();
            if session.step != RevealStep::EnteringSecondFactor || session.busy {
                return;
            }
            let was_complete = should_auto_submit(&session.token);
            session.token = Zeroizing::new(token.to_string());
            !was_complete && should_auto_submit(token)
        };
        if trigger {
            self.complete_second_factor(token).await;
        }
    }

    /// Convenience for hosts that submit the password in one call.
    pub async fn submit_password(&self, password: &str) {
        self.enter_password(password);
        self.advance().await;
    }

    /// Move the session forward from its current step.
    pub async fn advance(&self) {
        let (step, busy, token) = {
            let session = self.session.read();
            (session.step, session.busy, session.token.clone())
        };
        if busy {
            return;
        }
        match step {
            RevealStep::ViewingGeneralInfo => {
                let mut session = self.session.write();
                Self::set_step(&mut session, RevealStep::EnteringPassword, &self.guard);
            }
            RevealStep::EnteringPassword => self.verify_password().await,
            RevealStep::EnteringSecondFactor => self.complete_second_factor(&token).await,
            RevealStep::ViewingSeed => {}
        }
    }

    /// Navigate backwards. From the info screen this asks the host to
    /// leave the flow; anywhere else it resets, clearing all secrets.
    pub fn go_back(&self) -> BackOutcome {
        let mut session = self.session.write();
        if session.step == RevealStep::ViewingGeneralInfo {
            tracing::debug!("leaving reveal flow");
            return BackOutcome::LeftFlow;
        }
        Self::reset_session(&mut session);
        BackOutcome::ResetToStart
    }

    /// React to an app-lifecycle signal. Backgrounding hides the seed
    /// and resets the session; any engaged capture protection is
    /// revoked with it.
    pub fn handle_app_state(&self, state: AppLifecycle) {
        match state {
            AppLifecycle::Background | AppLifecycle::Inactive => {
                let mut session = self.session.write();
                Self::reset_session(&mut session);
            }
            AppLifecycle::Foreground => {}
        }
    }

    /// Unconditional reset when the selected account changes.
    pub fn switch_account(&self, account_id: impl Into<String>) {
        let mut session = self.session.write();
        session.account_id = account_id.into();
        Self::reset_session(&mut session);
    }

    async fn verify_password(&self) {
        let (epoch, password, account_id) = {
            let mut session = self.session.write();
            if session.busy {
                return;
            }
            session.busy = true;
            (
                session.epoch,
                session.password.clone(),
                session.account_id.clone(),
            )
        };

        let outcome = match self.gate.verify(
            &password,
            self.context.password_hash(),
            self.context.kdf_salt(),
        ) {
            Err(Error::EmptyPassword) => Outcome::Alert(Alert::EmptyPassword),
            Err(e) => {
                tracing::warn!(error = %e, "password verification failed");
                Outcome::Alert(Alert::SomethingWentWrong)
            }
            Ok(false) => Outcome::Alert(Alert::UnrecognisedPassword),
            Ok(true) => {
                // The seed is fetched the moment the password checks out
                // and held for the remainder of the session; the second
                // factor only gates its exposure.
                match self
                    .seeds
                    .seed_for_account(self.context.password_hash(), &account_id)
                    .await
                {
                    Ok(seed) => Outcome::SeedFetched(seed),
                    Err(e) => {
                        tracing::warn!(error = %e, "seed fetch failed");
                        Outcome::Alert(Alert::SomethingWentWrong)
                    }
                }
            }
        };

        let mut session = self.session.write();
        if session.epoch != epoch {
            // Session was reset while the operation was in flight; the
            // result must not touch the new session.
            return;
        }
        session.busy = false;
        match outcome {
            Outcome::Alert(alert) => session.alerts.push_back(alert),
            Outcome::SeedFetched(seed) => {
                session.seed = Some(seed);
                let next = if self.context.two_factor_enabled() {
                    RevealStep::EnteringSecondFactor
                } else {
                    RevealStep::ViewingSeed
                };
                Self::set_step(&mut session, next, &self.guard);
            }
            Outcome::SecondFactorPassed => {}
        }
    }

    async fn complete_second_factor(&self, token: &str) {
        let epoch = {
            let mut session = self.session.write();
            if session.busy {
                return;
            }
            session.busy = true;
            session.epoch
        };

        let outcome = match self
            .second_factor
            .verify(self.context.password_hash(), token)
            .await
        {
            Ok(true) => Outcome::SecondFactorPassed,
            Ok(false) => Outcome::Alert(Alert::WrongCode),
            Err(Error::EmptyToken) => Outcome::Alert(Alert::EmptyCode),
            Err(e) => {
                tracing::warn!(error = %e, "second-factor verification failed");
                Outcome::Alert(Alert::SomethingWentWrong)
            }
        };

        let mut session = self.session.write();
        if session.epoch != epoch {
            return;
        }
        session.busy = false;
        match outcome {
            Outcome::SecondFactorPassed => {
                Self::set_step(&mut session, RevealStep::ViewingSeed, &self.guard);
            }
            Outcome::Alert(alert) => session.alerts.push_back(alert),
            Outcome::SeedFetched(_) => {}
        }
    }

    fn set_step(session: &mut RevealSession, next: RevealStep, guard: &ScreenshotGuard) {
        if next == RevealStep::ViewingSeed {
            if session.protection.is_none() {
                session.protection = Some(guard.engage(ProtectionReason::SeedPhrase));
            }
        } else {
            session.protection = None;
        }
        tracing::debug!(from = ?session.step, to = ?next, "reveal step transition");
        session.step = next;
    }

    fn reset_session(session: &mut RevealSession) {
        session.password = Zeroizing::new(String::new());
        session.token = Zeroizing::new(String::new());
        session.seed = None;
        session.protection = None;
        session.busy = false;
        session.epoch += 1;
        session.step = RevealStep::ViewingGeneralInfo;
        tracing::debug!("reveal session reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_without_second_factor() {
        assert_eq!(
            step_sequence(false),
            vec![
                RevealStep::ViewingGeneralInfo,
                RevealStep::EnteringPassword,
                RevealStep::ViewingSeed,
            ]
        );
    }

    #[test]
    fn sequence_with_second_factor() {
        assert_eq!(
            step_sequence(true),
            vec![
                RevealStep::ViewingGeneralInfo,
                RevealStep::EnteringPassword,
                RevealStep::EnteringSecondFactor,
                RevealStep::ViewingSeed,
            ]
        );
    }
}
