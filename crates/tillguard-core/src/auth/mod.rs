//! PIN authentication building blocks
//!
//! - PIN verification (Argon2id hash or in-memory secret)
//! - Lockout policy for repeated wrong PINs
//! - Persisted temporary unlock record
//!
//! The state machine that ties these together lives in [`crate::guard`].

mod lockout;
mod pin;
mod session;

pub use lockout::{LockoutPolicy, DEFAULT_LOCKOUT_SECS, DEFAULT_MAX_ATTEMPTS};
pub use pin::{
    hash_pin, validate_pin_input, Argon2Verifier, PinFormatError, PinVerifier, StaticVerifier,
};
pub use session::{
    format_countdown, UnlockRecord, DEFAULT_TEMPORARY_UNLOCK_SECS, UNLOCK_RECORD_KEY,
};
