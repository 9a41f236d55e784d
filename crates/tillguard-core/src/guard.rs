//! The access guard state machine
//!
//! ```text
//!              wrong PIN x3                 lockout tick -> 0
//!   AwaitingInput ---------> Locked ----------------------------> AwaitingInput
//!        |  \
//!        |   \ correct PIN (temporal request pending)
//!        |    `---------> TemporarilyUnlocked --(tick -> 0 | logout)--> AwaitingInput
//!        |
//!        `-- correct PIN --> Authorized(route) --(route change | logout)--> AwaitingInput
//! ```
//!
//! The guard never blocks on time. Countdowns advance through
//! [`AccessGuard::tick_lockout`] and [`AccessGuard::tick_temporary_unlock`],
//! which [`crate::driver::GuardDriver`] calls once per second.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::auth::{LockoutPolicy, PinVerifier, UnlockRecord};
use crate::clock::{Clock, SystemClock};
use crate::config::GuardConfig;
use crate::error::VerifierError;
use crate::notification::Notification;
use crate::route::RouteProvider;
use crate::store::KeyValueStore;

/// Hook run once per successful grant of either kind
pub type AccessGrantedHook = Arc<dyn Fn() + Send + Sync>;

/// Where the guard currently stands
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum GuardPhase {
    /// PIN form open
    AwaitingInput,
    /// Too many wrong PINs, form closed until the countdown ends
    Locked { remaining_secs: u64 },
    /// Single-route session
    Authorized { route: String },
    /// All-routes window
    TemporarilyUnlocked { remaining_secs: u64 },
}

/// Flat snapshot of the guard, one field per observable flag
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardState {
    pub failed_attempts: u32,
    pub is_locked: bool,
    pub lockout_remaining_seconds: u64,
    pub session_authorized: bool,
    pub session_route: Option<String>,
    pub temporary_unlock_active: bool,
    pub temporary_unlock_remaining_seconds: u64,
    pub pending_temporal_request: bool,
}

/// What a PIN submission did
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Not evaluated: the form is locked or already unlocked
    Ignored,
    /// Single-route session opened
    Granted { route: String },
    /// Temporary window opened
    TemporaryUnlockGranted { remaining_secs: u64 },
    /// Wrong PIN (or verifier outage), form still open
    Rejected { attempts_remaining: u32 },
    /// Wrong PIN that reached the threshold
    LockedOut { remaining_secs: u64 },
}

/// Builder wiring the guard to its collaborators
pub struct GuardBuilder {
    config: GuardConfig,
    verifier: Arc<dyn PinVerifier>,
    store: Arc<dyn KeyValueStore>,
    route: Arc<dyn RouteProvider>,
    clock: Arc<dyn Clock>,
    on_access_granted: Option<AccessGrantedHook>,
}

impl GuardBuilder {
    pub fn config(mut self, config: GuardConfig) -> Self {
        self.config = config;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn on_access_granted<F>(mut self, hook: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_access_granted = Some(Arc::new(hook));
        self
    }

    /// Create the guard and restore any unexpired temporary unlock
    pub fn mount(self) -> AccessGuard {
        let mut guard = AccessGuard {
            policy: self.config.lockout_policy(),
            config: self.config,
            verifier: self.verifier,
            store: self.store,
            route: self.route,
            clock: self.clock,
            on_access_granted: self.on_access_granted,
            phase: GuardPhase::AwaitingInput,
            failed_attempts: 0,
            pending_temporal_request: false,
            notifications: Vec::new(),
        };
        guard.resume_temporary_unlock();
        guard
    }
}

/// Timed PIN gate in front of protected content
pub struct AccessGuard {
    config: GuardConfig,
    policy: LockoutPolicy,
    verifier: Arc<dyn PinVerifier>,
    store: Arc<dyn KeyValueStore>,
    route: Arc<dyn RouteProvider>,
    clock: Arc<dyn Clock>,
    on_access_granted: Option<AccessGrantedHook>,
    phase: GuardPhase,
    failed_attempts: u32,
    pending_temporal_request: bool,
    notifications: Vec<Notification>,
}

impl AccessGuard {
    /// Start building a guard with default config and the system clock
    pub fn builder(
        verifier: Arc<dyn PinVerifier>,
        store: Arc<dyn KeyValueStore>,
        route: Arc<dyn RouteProvider>,
    ) -> GuardBuilder {
        GuardBuilder {
            config: GuardConfig::default(),
            verifier,
            store,
            route,
            clock: Arc::new(SystemClock),
            on_access_granted: None,
        }
    }

    fn resume_temporary_unlock(&mut self) {
        let raw = match self.store.get(&self.config.unlock_record_key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return,
            Err(e) => {
                warn!("Unlock record unreadable, starting locked: {}", e);
                return;
            }
        };

        let Some(record) = UnlockRecord::parse(&raw) else {
            warn!("Discarding malformed unlock record {:?}", raw);
            self.clear_unlock_record();
            return;
        };

        let now_ms = self.clock.now_ms();
        let window_secs = self.config.temporary_unlock_secs;
        let remaining_secs = match record.remaining_secs(now_ms) {
            Some(remaining_secs) if remaining_secs > window_secs => {
                // Not written by us; shrink it to one window from now
                warn!(
                    "Unlock record runs {} seconds, capping to {}",
                    remaining_secs, window_secs
                );
                let capped = UnlockRecord::starting_at(now_ms, self.config.temporary_unlock_window());
                if let Err(e) = capped.save(self.store.as_ref(), &self.config.unlock_record_key) {
                    warn!("Could not rewrite unlock record: {}", e);
                }
                window_secs
            }
            Some(remaining_secs) => remaining_secs,
            None => {
                debug!("Discarding expired unlock record");
                self.clear_unlock_record();
                return;
            }
        };

        info!(
            "Resuming temporary unlock ({} seconds remaining)",
            remaining_secs
        );
        self.phase = GuardPhase::TemporarilyUnlocked { remaining_secs };
        self.notify(Notification::TemporaryUnlockResumed { remaining_secs });
    }

    /// Verify a PIN and apply the result
    ///
    /// Only evaluated while the form is open; in any other phase the
    /// verifier is not called and nothing changes.
    pub async fn submit_pin(&mut self, candidate: &str) -> SubmitOutcome {
        if self.phase != GuardPhase::AwaitingInput {
            debug!("PIN submission ignored in phase {:?}", self.phase);
            return SubmitOutcome::Ignored;
        }

        let verdict = self.verifier.verify(candidate).await;
        self.apply_verdict(verdict)
    }

    fn apply_verdict(&mut self, verdict: Result<bool, VerifierError>) -> SubmitOutcome {
        match verdict {
            Ok(true) => self.grant(),
            Ok(false) => self.reject(false),
            Err(e) => {
                warn!("PIN verifier failed, counting as a wrong PIN: {}", e);
                self.reject(true)
            }
        }
    }

    fn grant(&mut self) -> SubmitOutcome {
        self.failed_attempts = 0;

        let outcome = if self.pending_temporal_request {
            self.pending_temporal_request = false;

            let window = self.config.temporary_unlock_window();
            let record = UnlockRecord::starting_at(self.clock.now_ms(), window);
            if let Err(e) = record.save(self.store.as_ref(), &self.config.unlock_record_key) {
                warn!("Could not persist temporary unlock, it will not survive a reload: {}", e);
            }

            let remaining_secs = window.as_secs();
            info!("Temporary unlock granted for {} seconds", remaining_secs);
            self.phase = GuardPhase::TemporarilyUnlocked { remaining_secs };
            self.notify(Notification::TemporaryUnlockGranted { remaining_secs });
            SubmitOutcome::TemporaryUnlockGranted { remaining_secs }
        } else {
            let route = self.route.current_path();
            info!("Access granted to {}", route);
            self.phase = GuardPhase::Authorized {
                route: route.clone(),
            };
            self.notify(Notification::AccessGranted {
                route: route.clone(),
            });
            SubmitOutcome::Granted { route }
        };

        if let Some(hook) = &self.on_access_granted {
            hook();
        }
        outcome
    }

    fn reject(&mut self, verifier_unavailable: bool) -> SubmitOutcome {
        self.failed_attempts = self.failed_attempts.saturating_add(1);
        let attempts_remaining = self.policy.attempts_remaining(self.failed_attempts);

        if verifier_unavailable {
            self.notify(Notification::VerifierUnavailable { attempts_remaining });
        }

        if let Some(duration) = self.policy.lockout_duration(self.failed_attempts) {
            let remaining_secs = duration.as_secs();
            warn!(
                "{} consecutive wrong PINs, locking for {} seconds",
                self.failed_attempts, remaining_secs
            );
            self.phase = GuardPhase::Locked { remaining_secs };
            self.notify(Notification::LockedOut { remaining_secs });
            return SubmitOutcome::LockedOut { remaining_secs };
        }

        warn!(
            "Wrong PIN ({} attempts remaining)",
            attempts_remaining
        );
        if !verifier_unavailable {
            self.notify(Notification::PinRejected { attempts_remaining });
        }
        SubmitOutcome::Rejected { attempts_remaining }
    }

    /// Advance the lockout countdown by one second.
    /// Returns true while the lockout is still running.
    pub fn tick_lockout(&mut self) -> bool {
        let GuardPhase::Locked { remaining_secs } = &mut self.phase else {
            return false;
        };

        *remaining_secs = remaining_secs.saturating_sub(1);
        if *remaining_secs > 0 {
            return true;
        }

        info!("Lockout over");
        self.phase = GuardPhase::AwaitingInput;
        self.failed_attempts = 0;
        self.notify(Notification::LockoutEnded);
        false
    }

    /// Advance the temporary unlock countdown by one second.
    /// Returns true while the window is still open.
    pub fn tick_temporary_unlock(&mut self) -> bool {
        let GuardPhase::TemporarilyUnlocked { remaining_secs } = &mut self.phase else {
            return false;
        };

        *remaining_secs = remaining_secs.saturating_sub(1);
        if *remaining_secs > 0 {
            return true;
        }

        info!("Temporary unlock expired");
        self.phase = GuardPhase::AwaitingInput;
        self.clear_unlock_record();
        self.notify(Notification::TemporaryUnlockExpired);
        false
    }

    /// Compare the live route with the session route and revoke a
    /// single-route session that no longer matches.
    /// Returns true if a session was revoked.
    pub fn sync_route(&mut self) -> bool {
        let GuardPhase::Authorized { route } = &self.phase else {
            return false;
        };

        let current = self.route.current_path();
        if *route == current {
            return false;
        }

        let route = route.clone();
        info!("Left {} for {}, ending session", route, current);
        self.phase = GuardPhase::AwaitingInput;
        self.notify(Notification::SessionEnded { route });
        true
    }

    /// Whether protected content may be shown right now.
    ///
    /// Checks the live route first so content is never reported visible for
    /// a route the session was not granted on.
    pub fn is_content_visible(&mut self) -> bool {
        self.sync_route();
        matches!(
            self.phase,
            GuardPhase::Authorized { .. } | GuardPhase::TemporarilyUnlocked { .. }
        )
    }

    /// Ask for the next correct PIN to open a temporary window instead of a
    /// single-route session. Only honoured while the form is open.
    pub fn request_temporary_unlock(&mut self) -> bool {
        if self.phase != GuardPhase::AwaitingInput {
            debug!("Temporal request ignored in phase {:?}", self.phase);
            return false;
        }

        if !self.pending_temporal_request {
            debug!("Temporal unlock requested");
            self.pending_temporal_request = true;
            self.notify(Notification::TemporaryUnlockRequested);
        }
        true
    }

    /// End the current session or temporary window
    pub fn logout(&mut self) -> bool {
        if !matches!(
            self.phase,
            GuardPhase::Authorized { .. } | GuardPhase::TemporarilyUnlocked { .. }
        ) {
            debug!("Logout ignored in phase {:?}", self.phase);
            return false;
        }

        info!("Logged out");
        self.phase = GuardPhase::AwaitingInput;
        self.pending_temporal_request = false;
        self.failed_attempts = 0;
        self.clear_unlock_record();
        self.notify(Notification::LoggedOut);
        true
    }

    fn clear_unlock_record(&self) {
        if let Err(e) = UnlockRecord::clear(self.store.as_ref(), &self.config.unlock_record_key) {
            warn!("Could not delete unlock record: {}", e);
        }
    }

    fn notify(&mut self, notification: Notification) {
        debug!("Notification: {}", notification);
        self.notifications.push(notification);
    }

    /// Drain notices queued since the last call
    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    pub fn phase(&self) -> &GuardPhase {
        &self.phase
    }

    pub fn failed_attempts(&self) -> u32 {
        self.failed_attempts
    }

    pub fn pending_temporal_request(&self) -> bool {
        self.pending_temporal_request
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    pub fn title(&self) -> &str {
        &self.config.title
    }

    pub fn description(&self) -> &str {
        &self.config.description
    }

    /// Flat snapshot of the current state
    pub fn state(&self) -> GuardState {
        let mut state = GuardState {
            failed_attempts: self.failed_attempts,
            pending_temporal_request: self.pending_temporal_request,
            ..GuardState::default()
        };

        match &self.phase {
            GuardPhase::AwaitingInput => {}
            GuardPhase::Locked { remaining_secs } => {
                state.is_locked = true;
                state.lockout_remaining_seconds = *remaining_secs;
            }
            GuardPhase::Authorized { route } => {
                state.session_authorized = true;
                state.session_route = Some(route.clone());
            }
            GuardPhase::TemporarilyUnlocked { remaining_secs } => {
                state.temporary_unlock_active = true;
                state.temporary_unlock_remaining_seconds = *remaining_secs;
            }
        }
        state
    }
}
