//! Lockout policy for brute-force protection
//!
//! A fixed number of consecutive wrong PINs locks the form for a fixed
//! period. Unlike a progressive policy the counter starts over once the
//! lockout runs out.

use std::time::Duration;

/// Consecutive failures allowed before the form locks
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Lockout length once the threshold is reached (5 minutes)
pub const DEFAULT_LOCKOUT_SECS: u64 = 300;

/// Lockout policy
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LockoutPolicy {
    /// Failed attempts that trigger a lockout
    pub max_attempts: u32,
    /// Lockout length in seconds
    pub lockout_secs: u64,
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            lockout_secs: DEFAULT_LOCKOUT_SECS,
        }
    }
}

impl LockoutPolicy {
    /// Create a policy with a custom threshold and duration
    pub fn new(max_attempts: u32, lockout_secs: u64) -> Self {
        Self {
            max_attempts,
            lockout_secs,
        }
    }

    /// Get the lockout duration for the given number of failed attempts.
    /// Returns None if the threshold has not been reached.
    pub fn lockout_duration(&self, failed_attempts: u32) -> Option<Duration> {
        self.is_locked(failed_attempts)
            .then(|| Duration::from_secs(self.lockout_secs))
    }

    /// Check if the failure count triggers a lockout
    pub fn is_locked(&self, failed_attempts: u32) -> bool {
        failed_attempts >= self.max_attempts
    }

    /// Attempts left before the lockout kicks in
    pub fn attempts_remaining(&self, failed_attempts: u32) -> u32 {
        self.max_attempts.saturating_sub(failed_attempts)
    }
}
