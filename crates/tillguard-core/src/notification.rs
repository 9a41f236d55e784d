//! User-facing notices emitted on guard transitions

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::auth::format_countdown;

/// One notice per transition the operator should hear about
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notification {
    /// Correct PIN, single-route session opened
    AccessGranted { route: String },

    /// Correct PIN after a temporal request, window opened
    TemporaryUnlockGranted { remaining_secs: u64 },

    /// Window restored from the persisted record on mount
    TemporaryUnlockResumed { remaining_secs: u64 },

    /// Next correct PIN will open a temporary window
    TemporaryUnlockRequested,

    /// Wrong PIN, form still open
    PinRejected { attempts_remaining: u32 },

    /// Verifier could not be reached; counted as a wrong PIN
    VerifierUnavailable { attempts_remaining: u32 },

    /// Threshold reached
    LockedOut { remaining_secs: u64 },

    /// Lockout countdown finished
    LockoutEnded,

    /// Temporary window ran out
    TemporaryUnlockExpired,

    /// Single-route session revoked by navigation
    SessionEnded { route: String },

    /// Explicit logout
    LoggedOut,
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notification::AccessGranted { route } => {
                write!(f, "Access granted to {}", route)
            }
            Notification::TemporaryUnlockGranted { remaining_secs } => write!(
                f,
                "Temporary access granted to all sections for {}",
                format_countdown(*remaining_secs)
            ),
            Notification::TemporaryUnlockResumed { remaining_secs } => write!(
                f,
                "Temporary access still active ({} remaining)",
                format_countdown(*remaining_secs)
            ),
            Notification::TemporaryUnlockRequested => {
                write!(f, "Enter the PIN to unlock all sections for one hour")
            }
            Notification::PinRejected { attempts_remaining } => match *attempts_remaining {
                1 => write!(f, "Incorrect PIN (1 attempt remaining)"),
                n => write!(f, "Incorrect PIN ({} attempts remaining)", n),
            },
            Notification::VerifierUnavailable { attempts_remaining } => write!(
                f,
                "Could not verify the PIN, try again ({} attempts remaining)",
                attempts_remaining
            ),
            Notification::LockedOut { remaining_secs } => write!(
                f,
                "Too many incorrect attempts. Locked for {} seconds",
                remaining_secs
            ),
            Notification::LockoutEnded => write!(f, "Lockout over, you may try again"),
            Notification::TemporaryUnlockExpired => {
                write!(f, "Temporary access expired, enter the PIN again")
            }
            Notification::SessionEnded { route } => {
                write!(f, "Session for {} ended after leaving the page", route)
            }
            Notification::LoggedOut => write!(f, "Logged out"),
        }
    }
}
