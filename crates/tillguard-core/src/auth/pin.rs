//! PIN verification
//!
//! The guard treats verification as an opaque oracle. The stock verifier
//! checks candidates against an Argon2id hash so the manager PIN never sits
//! in the config file in clear text.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use zeroize::Zeroizing;

use crate::error::VerifierError;

/// Checks a submitted PIN against the configured secret
///
/// Implementations may be remote. Infrastructure failures are reported as
/// [`VerifierError::Unavailable`]; the guard counts those as failed attempts
/// so the lockout cannot be sidestepped by forcing errors.
#[async_trait]
pub trait PinVerifier: Send + Sync {
    /// Returns true iff `candidate` matches the secret
    async fn verify(&self, candidate: &str) -> Result<bool, VerifierError>;
}

/// Argon2id-backed verifier
#[derive(Clone, Debug)]
pub struct Argon2Verifier {
    /// PHC-format hash string
    hash: String,
}

impl Argon2Verifier {
    /// Create a verifier from a PHC hash string (as produced by [`hash_pin`])
    pub fn new(hash: impl Into<String>) -> Result<Self, VerifierError> {
        let hash = hash.into();
        PasswordHash::new(&hash).map_err(|e| VerifierError::InvalidHash(e.to_string()))?;
        Ok(Self { hash })
    }

    fn verify_blocking(hash: &str, candidate: &[u8]) -> Result<bool, VerifierError> {
        let parsed =
            PasswordHash::new(hash).map_err(|e| VerifierError::InvalidHash(e.to_string()))?;
        Ok(Argon2::default()
            .verify_password(candidate, &parsed)
            .is_ok())
    }
}

#[async_trait]
impl PinVerifier for Argon2Verifier {
    async fn verify(&self, candidate: &str) -> Result<bool, VerifierError> {
        let hash = self.hash.clone();
        let candidate = Zeroizing::new(candidate.as_bytes().to_vec());

        // Argon2 is deliberately slow; keep it off the async workers
        tokio::task::spawn_blocking(move || Self::verify_blocking(&hash, &candidate))
            .await
            .map_err(|e| VerifierError::Unavailable(format!("verification task failed: {}", e)))?
    }
}

/// Verifier holding the secret in memory, for demos and tests
pub struct StaticVerifier {
    secret: Zeroizing<String>,
}

impl StaticVerifier {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: Zeroizing::new(secret.into()),
        }
    }
}

#[async_trait]
impl PinVerifier for StaticVerifier {
    async fn verify(&self, candidate: &str) -> Result<bool, VerifierError> {
        Ok(candidate.as_bytes() == self.secret.as_bytes())
    }
}

/// Hash a PIN with Argon2id, returning the PHC string to put in the config
pub fn hash_pin(pin: &str) -> Result<String, VerifierError> {
    let salt = SaltString::generate(&mut OsRng);
    let pin_bytes = Zeroizing::new(pin.as_bytes().to_vec());

    Argon2::default()
        .hash_password(&pin_bytes, &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| VerifierError::InvalidHash(format!("Failed to hash PIN: {}", e)))
}

/// PIN input errors, raised by the input layer before the guard sees a value
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PinFormatError {
    #[error("PIN must be exactly {0} digits")]
    InvalidLength(usize),

    #[error("PIN must contain only digits")]
    InvalidFormat,
}

/// Validate a PIN typed into the form
pub fn validate_pin_input(pin: &str, expected_len: usize) -> Result<(), PinFormatError> {
    if pin.chars().count() != expected_len {
        return Err(PinFormatError::InvalidLength(expected_len));
    }

    if !pin.chars().all(|c| c.is_ascii_digit()) {
        return Err(PinFormatError::InvalidFormat);
    }

    Ok(())
}
