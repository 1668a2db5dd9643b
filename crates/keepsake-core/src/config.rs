//! Runtime configuration for the envelope and the authentication gate.
//!
//! The upstream constants (lockout threshold, delay table, session
//! lifetimes) ship as defaults here rather than as hardcoded values, so a
//! deployment can tune them without forking the core. Tests lower the
//! hashing cost through the same structs.

use std::time::Duration;

/// Parameters for content-key derivation inside the envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvelopeConfig {
    /// PBKDF2-HMAC-SHA256 iteration count recorded in every note.
    ///
    /// Derivation enforces a floor of [`crate::crypto::MIN_PBKDF2_ITERATIONS`];
    /// values below it are rejected, not silently raised.
    pub pbkdf2_iterations: u32,
}

impl Default for EnvelopeConfig {
    fn default() -> Self {
        Self {
            pbkdf2_iterations: 310_000,
        }
    }
}

/// Cost parameters for the master-passphrase hash (Argon2id).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassphraseHashParams {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for PassphraseHashParams {
    fn default() -> Self {
        // Crate-recommended parameters; comparable work factor to bcrypt
        // at cost 12+.
        Self {
            memory_kib: 19 * 1024,
            iterations: 2,
            parallelism: 1,
        }
    }
}

impl PassphraseHashParams {
    /// Minimal-cost parameters for test suites. Not for production records.
    pub fn insecure_for_tests() -> Self {
        Self {
            memory_kib: 8,
            iterations: 1,
            parallelism: 1,
        }
    }
}

/// Policy knobs for the authentication gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateConfig {
    /// Failed attempts before the hard lockout engages.
    pub max_failed_attempts: u32,

    /// How long the lockout holds once engaged.
    pub lockout_duration: Duration,

    /// Escalating pre-comparison delay, indexed by the current failure
    /// count; attempts past the end hold at the last entry.
    pub delay_schedule: Vec<Duration>,

    /// Absolute session lifetime, fixed at creation.
    pub session_ttl: Duration,

    /// Sliding idle timeout; must be shorter than `session_ttl`.
    pub idle_timeout: Duration,

    /// Minimum accepted passphrase length.
    pub min_passphrase_length: usize,

    /// Master-passphrase hashing cost.
    pub hash_params: PassphraseHashParams,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            max_failed_attempts: 5,
            lockout_duration: Duration::from_secs(30 * 60),
            delay_schedule: vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(5),
                Duration::from_secs(10),
                Duration::from_secs(30),
            ],
            session_ttl: Duration::from_secs(24 * 60 * 60),
            idle_timeout: Duration::from_secs(2 * 60 * 60),
            min_passphrase_length: 8,
            hash_params: PassphraseHashParams::default(),
        }
    }
}

impl GateConfig {
    /// Delay to apply before comparing, given the persisted failure count.
    /// No delay on a clean record.
    pub fn delay_for_failed_attempts(&self, failed_attempts: u32) -> Option<Duration> {
        if failed_attempts == 0 || self.delay_schedule.is_empty() {
            return None;
        }
        let index = (failed_attempts as usize - 1).min(self.delay_schedule.len() - 1);
        Some(self.delay_schedule[index])
    }
}
