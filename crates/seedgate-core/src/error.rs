//! Error types for seedgate
//!
//! No variant carries key material or seed phrase words. Messages are safe
//! to show to the user and to write to logs.

use thiserror::Error;

use crate::provision::Stage;

/// Main error type for provisioning operations
#[derive(Error, Debug)]
pub enum ProvisionError {
    /// The host could not supply randomness for key generation
    #[error("Key generation unavailable: {0}")]
    KeyGenUnavailable(String),

    /// The host could not supply randomness for the seed phrase
    #[error("Entropy source unavailable: {0}")]
    EntropyUnavailable(String),

    /// The proof-of-work search hit its iteration ceiling
    #[error("Proof-of-work not found within {max_iterations} iterations")]
    PowExceededIterations {
        /// Ceiling that was reached
        max_iterations: u64,
    },

    /// The proof-of-work search was cancelled by the caller
    #[error("Proof-of-work cancelled after {nonce} iterations")]
    PowCancelled {
        /// Nonce reached when the cancellation was observed
        nonce: u64,
    },

    /// The proof-of-work worker stopped without producing a result
    #[error("Proof-of-work worker failed: {0}")]
    PowWorker(String),

    /// Event is not accepted in the current stage
    #[error("Cannot {event} while in stage {stage}")]
    InvalidTransition {
        /// Stage the orchestrator was in
        stage: Stage,
        /// Short name of the rejected event
        event: &'static str,
    },

    /// A prerequisite artifact has not been produced yet
    #[error("Missing artifact: {0}")]
    MissingArtifact(&'static str),

    /// Word list could not be loaded or failed validation
    #[error("Word list error: {0}")]
    Wordlist(String),

    /// Seed phrase typed back by the user does not match
    #[error("Seed phrase mismatch: {0}")]
    PhraseMismatch(String),

    /// Configuration value is out of range or unreadable
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Registration endpoint could not be reached or answered garbage
    #[error("Registration network error: {0}")]
    Network(String),

    /// Registration endpoint answered and refused the account
    #[error("Registration rejected: {0}")]
    RegistrationRejected(String),

    /// Error during serialization/deserialization
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Encryption or decryption with the account key failed
    #[error("Cryptographic operation failed: {0}")]
    Crypto(String),

    /// Signature over the account draft failed to verify
    #[error("Signature invalid: {0}")]
    SignatureInvalid(String),

    /// General I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProvisionError {
    /// Whether the caller can retry the same operation with the same inputs
    /// (or a fresh challenge) and reasonably expect a different outcome.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ProvisionError::PowExceededIterations { .. }
                | ProvisionError::PowCancelled { .. }
                | ProvisionError::Network(_)
                | ProvisionError::RegistrationRejected(_)
                | ProvisionError::PhraseMismatch(_)
        )
    }
}

impl From<serde_json::Error> for ProvisionError {
    fn from(err: serde_json::Error) -> Self {
        ProvisionError::Serialization(err.to_string())
    }
}

impl From<reqwest::Error> for ProvisionError {
    fn from(err: reqwest::Error) -> Self {
        // reqwest errors may echo the URL but never the request body
        ProvisionError::Network(err.to_string())
    }
}

/// Result type alias using ProvisionError
pub type ProvisionResult<T> = Result<T, ProvisionError>;
