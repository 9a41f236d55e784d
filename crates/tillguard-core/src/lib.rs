//! Tillguard - time-gated PIN access guard
//!
//! Protects sensitive back-office pages (accounts, finances, employees)
//! behind a numeric PIN with brute-force throttling and two unlock modes:
//!
//! - a single-route session, revoked as soon as the operator navigates away
//! - a one-hour temporary unlock covering every route, persisted as an
//!   absolute expiry so it survives a reload
//!
//! The [`AccessGuard`] state machine is synchronous and deterministic; its
//! collaborators ([`PinVerifier`], [`KeyValueStore`], [`RouteProvider`],
//! [`Clock`]) are injected. [`GuardDriver`] runs a guard on a tokio task with
//! real one-second countdowns.

pub mod auth;
pub mod clock;
pub mod config;
pub mod driver;
pub mod error;
pub mod guard;
pub mod notification;
pub mod route;
pub mod store;
pub mod timer;

pub use auth::{
    hash_pin, validate_pin_input, Argon2Verifier, LockoutPolicy, PinFormatError, PinVerifier,
    StaticVerifier, UnlockRecord,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, GuardConfig};
pub use driver::{GuardCommand, GuardDriver, GuardHandle};
pub use error::{GuardError, Result, StoreError, VerifierError};
pub use guard::{AccessGuard, GuardPhase, GuardState, SubmitOutcome};
pub use notification::Notification;
pub use route::{FixedRoute, RouteProvider, SharedRoute};
pub use store::{JsonFileStore, KeyValueStore, MemoryStore};
pub use timer::{CountdownKind, CountdownTimer, TimerTick};
