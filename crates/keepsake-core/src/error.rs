//! Error types for Keepsake core operations.
//!
//! This module defines the error hierarchy for all core operations.
//! Errors are descriptive at the core level; the host layer (CLI, HTTP,
//! extension) maps these to user-friendly messages.
//!
//! Decryption failures are a single generic variant: the
//! external contract never distinguishes a wrong password from a tampered
//! record. The gate and session variants carry the actionable detail
//! (remaining attempts, unlock time) the caller is allowed to show.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Result type alias for Keepsake operations.
pub type Result<T> = std::result::Result<T, KeepsakeError>;

/// Core error type for Keepsake operations.
#[derive(Debug, Error)]
pub enum KeepsakeError {
    /// Password fails strength validation; raised before any cryptographic work
    #[error("Password does not meet strength requirements")]
    WeakPassword {
        /// Every missing character class and triggered penalty, in rubric order
        feedback: Vec<String>,
    },

    /// Generic decryption failure (wrong password, tampered ciphertext, or
    /// corrupted record; never distinguished in the external contract)
    #[error("Decryption failed")]
    DecryptionFailed,

    /// No passphrase has been configured for this identity
    #[error("No passphrase configured")]
    NotConfigured,

    /// Passphrase comparison failed
    #[error("Incorrect passphrase")]
    IncorrectPassphrase {
        /// Attempts left before the hard lockout engages
        remaining_attempts: u32,
        /// Set when this failure tripped the lockout threshold
        locked_until: Option<DateTime<Utc>>,
    },

    /// Authentication refused outright due to an active lockout
    #[error("Account locked until {until}")]
    Locked { until: DateTime<Utc> },

    /// Session id does not exist
    #[error("Session not found")]
    SessionNotFound,

    /// Session passed its absolute TTL
    #[error("Session expired")]
    SessionExpired,

    /// Session exceeded the idle timeout
    #[error("Session idle timeout")]
    SessionIdleTimeout,

    /// Cryptographic provider error (never a tag-mismatch; those normalize
    /// to `DecryptionFailed`)
    #[error("Encryption error: {0}")]
    Crypto(String),

    /// Storage backend error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Invalid user input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// I/O error
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization error
    #[error("JSON error: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },
}

impl KeepsakeError {
    /// Whether this error means the caller must re-authenticate.
    pub fn requires_reauth(&self) -> bool {
        matches!(
            self,
            KeepsakeError::SessionNotFound
                | KeepsakeError::SessionExpired
                | KeepsakeError::SessionIdleTimeout
        )
    }
}
