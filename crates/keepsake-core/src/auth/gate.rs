//! Password authentication gate.
//!
//! Guards one identity's master passphrase: slow salted hashing,
//! constant-time verification, progressive pre-comparison delays, a hard
//! lockout after repeated failures, and time-bounded sessions with a
//! sliding idle timeout.
//!
//! The gate is an explicit service object: construct one per identity at
//! process start and pass it by reference. All persistence goes through the
//! injected [`KeyValueStore`]; all time through the injected [`Clock`].
//! Authentication and passphrase changes are serialized by an internal
//! per-identity lock so concurrent attempts cannot drop a counter
//! increment; session touches use the store's atomic `update`.

use std::sync::Mutex;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::types::{ClientInfo, PassphraseRecord, Session};
use crate::config::GateConfig;
use crate::error::{KeepsakeError, Result};
use crate::storage::KeyValueStore;
use crate::time::{Clock, SystemClock};

/// Identity used when the deployment has a single user.
pub const DEFAULT_USER_ID: &str = "default";

const SESSION_PREFIX: &str = "sessions/";

/// Authentication gate over one identity's passphrase record.
pub struct AuthGate<S: KeyValueStore, C: Clock = SystemClock> {
    store: S,
    clock: C,
    config: GateConfig,
    user_id: String,
    auth_lock: Mutex<()>,
}

impl<S: KeyValueStore> AuthGate<S> {
    /// Gate for the default identity on the system clock.
    pub fn new(store: S, config: GateConfig) -> Self {
        Self::with_clock(store, config, SystemClock)
    }
}

impl<S: KeyValueStore, C: Clock> AuthGate<S, C> {
    /// Gate with an injected time source (tests, simulations).
    pub fn with_clock(store: S, config: GateConfig, clock: C) -> Self {
        Self {
            store,
            clock,
            config,
            user_id: DEFAULT_USER_ID.to_string(),
            auth_lock: Mutex::new(()),
        }
    }

    /// Rebind the gate to a different identity.
    pub fn for_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = user_id.into();
        self
    }

    /// The identity this gate guards.
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// The gate's time source. Lets test hosts drive an injected
    /// [`crate::time::ManualClock`].
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Whether a passphrase record exists for this identity.
    pub fn is_configured(&self) -> Result<bool> {
        Ok(self.load_record()?.is_some())
    }

    /// The recovery hint, if one was set. Stored as plaintext; never the
    /// passphrase itself.
    ///
    /// # Errors
    ///
    /// Returns [`KeepsakeError::NotConfigured`] when no record exists.
    pub fn recovery_hint(&self) -> Result<Option<String>> {
        let record = self.load_record()?.ok_or(KeepsakeError::NotConfigured)?;
        Ok(record.recovery_hint)
    }

    /// Set (or replace) the master passphrase.
    ///
    /// The new record starts with a clean failure counter and no lock.
    ///
    /// # Errors
    ///
    /// Returns [`KeepsakeError::InvalidInput`] for empty or too-short
    /// passphrases.
    pub fn set_passphrase(&self, passphrase: &str, recovery_hint: Option<&str>) -> Result<()> {
        let _guard = self.guard()?;
        self.write_new_record(passphrase, recovery_hint)
    }

    /// Verify a passphrase and, on success, issue a session.
    ///
    /// 1. `NotConfigured` when no record exists.
    /// 2. `Locked` while a lockout is active; no comparison is performed.
    /// 3. With prior failures on record, an escalating delay is applied
    ///    before comparing. Only this caller is delayed.
    /// 4. Constant-time hash comparison.
    /// 5. Success resets the counter, stamps `last_used`, and persists a
    ///    fresh session.
    /// 6. Failure increments the counter (persisted before this function
    ///    returns) and engages the lockout at the threshold.
    pub fn authenticate(&self, passphrase: &str, client: Option<ClientInfo>) -> Result<Session> {
        let _guard = self.guard()?;

        let mut record = self.load_record()?.ok_or(KeepsakeError::NotConfigured)?;

        let now = self.clock.now();
        if let Some(until) = record.locked_until {
            if until > now {
                warn!(user_id = %self.user_id, %until, "authentication refused: lockout active");
                return Err(KeepsakeError::Locked { until });
            }
        }

        if let Some(delay) = self.config.delay_for_failed_attempts(record.failed_attempts) {
            debug!(
                user_id = %self.user_id,
                failed_attempts = record.failed_attempts,
                ?delay,
                "applying progressive authentication delay"
            );
            self.clock.sleep(delay);
        }

        let verified = self.verify_passphrase(passphrase, &record.hashed_passphrase)?;
        let now = self.clock.now();

        if verified {
            record.failed_attempts = 0;
            record.locked_until = None;
            record.last_used = Some(now);
            self.save_record(&record)?;

            let session = self.create_session(now, client)?;
            info!(user_id = %self.user_id, "authentication succeeded");
            return Ok(session);
        }

        record.failed_attempts += 1;
        let locked_until = if record.failed_attempts >= self.config.max_failed_attempts {
            let until = now + to_chrono(self.config.lockout_duration);
            record.locked_until = Some(until);
            warn!(
                user_id = %self.user_id,
                failed_attempts = record.failed_attempts,
                %until,
                "lockout engaged"
            );
            Some(until)
        } else {
            None
        };

        // The counter update lands even though the attempt is reported as
        // failed; a crash after this point cannot lose it.
        self.save_record(&record)?;

        let remaining_attempts = self
            .config
            .max_failed_attempts
            .saturating_sub(record.failed_attempts);
        Err(KeepsakeError::IncorrectPassphrase {
            remaining_attempts,
            locked_until,
        })
    }

    /// Validate a session id and refresh its activity stamp.
    ///
    /// Every successful validation is also a touch: the idle window slides,
    /// the absolute expiry never does. Expired and idle sessions are
    /// destroyed as a side effect of being looked at.
    pub fn validate_session(&self, session_id: &str) -> Result<Session> {
        let key = session_key(session_id)?;
        let now = self.clock.now();
        let idle_timeout = to_chrono(self.config.idle_timeout);

        let mut outcome: Result<Session> = Err(KeepsakeError::SessionNotFound);
        self.store.update(&key, &mut |current| {
            let Some(bytes) = current else {
                outcome = Err(KeepsakeError::SessionNotFound);
                return Ok(None);
            };

            let mut session: Session = serde_json::from_slice(bytes)?;

            if session.is_expired(now) {
                debug!(session_id, "session destroyed: absolute TTL elapsed");
                outcome = Err(KeepsakeError::SessionExpired);
                return Ok(None);
            }

            if session.is_idle_expired(now, idle_timeout) {
                debug!(session_id, "session destroyed: idle timeout");
                outcome = Err(KeepsakeError::SessionIdleTimeout);
                return Ok(None);
            }

            session.last_activity = now;
            let bytes = serde_json::to_vec(&session)?;
            outcome = Ok(session);
            Ok(Some(bytes))
        })?;

        outcome
    }

    /// Destroy a session explicitly.
    ///
    /// # Returns
    ///
    /// `true` if the session existed.
    pub fn logout(&self, session_id: &str) -> Result<bool> {
        let key = session_key(session_id)?;
        let removed = self.store.remove(&key)?;
        if removed {
            info!(session_id, "session destroyed: logout");
        }
        Ok(removed)
    }

    /// Sweep all persisted sessions, destroying the absolute-expired and
    /// idle-expired ones.
    ///
    /// Intended to run periodically (service start, cron trigger), not
    /// inline with request handling.
    ///
    /// # Returns
    ///
    /// The number of sessions removed.
    pub fn cleanup_expired_sessions(&self) -> Result<usize> {
        let now = self.clock.now();
        let idle_timeout = to_chrono(self.config.idle_timeout);
        let mut removed = 0usize;

        for key in self.store.keys(SESSION_PREFIX)? {
            self.store.update(&key, &mut |current| {
                let Some(bytes) = current else {
                    return Ok(None);
                };
                let session: Session = match serde_json::from_slice(bytes) {
                    Ok(session) => session,
                    Err(err) => {
                        warn!(%key, %err, "dropping unreadable session record");
                        removed += 1;
                        return Ok(None);
                    }
                };
                if session.is_expired(now) || session.is_idle_expired(now, idle_timeout) {
                    removed += 1;
                    return Ok(None);
                }
                Ok(Some(bytes.to_vec()))
            })?;
        }

        if removed > 0 {
            info!(removed, "expired sessions swept");
        }
        Ok(removed)
    }

    /// Replace the passphrase after verifying the current one.
    ///
    /// The recovery hint carries over unless explicitly replaced. A
    /// lockout applies here exactly as it does to `authenticate`.
    pub fn change_passphrase(
        &self,
        current_passphrase: &str,
        new_passphrase: &str,
        new_hint: Option<&str>,
    ) -> Result<()> {
        let _guard = self.guard()?;

        let record = self.load_record()?.ok_or(KeepsakeError::NotConfigured)?;

        let now = self.clock.now();
        if let Some(until) = record.locked_until {
            if until > now {
                return Err(KeepsakeError::Locked { until });
            }
        }

        if !self.verify_passphrase(current_passphrase, &record.hashed_passphrase)? {
            return Err(KeepsakeError::IncorrectPassphrase {
                remaining_attempts: self
                    .config
                    .max_failed_attempts
                    .saturating_sub(record.failed_attempts),
                locked_until: None,
            });
        }

        let hint = new_hint.or(record.recovery_hint.as_deref());
        self.write_new_record(new_passphrase, hint)?;
        info!(user_id = %self.user_id, "passphrase changed");
        Ok(())
    }

    // --- internals ---

    fn write_new_record(&self, passphrase: &str, recovery_hint: Option<&str>) -> Result<()> {
        if passphrase.trim().is_empty() {
            return Err(KeepsakeError::InvalidInput(
                "Passphrase cannot be empty".to_string(),
            ));
        }
        let length = passphrase.chars().count();
        if length < self.config.min_passphrase_length {
            return Err(KeepsakeError::InvalidInput(format!(
                "Passphrase must be at least {} characters (got {})",
                self.config.min_passphrase_length, length
            )));
        }

        let record = PassphraseRecord {
            hashed_passphrase: self.hash_passphrase(passphrase)?,
            created_at: self.clock.now(),
            last_used: None,
            recovery_hint: recovery_hint.map(str::to_string),
            failed_attempts: 0,
            locked_until: None,
        };
        self.save_record(&record)?;
        info!(user_id = %self.user_id, "passphrase configured");
        Ok(())
    }

    fn hash_passphrase(&self, passphrase: &str) -> Result<String> {
        let params = argon2::Params::new(
            self.config.hash_params.memory_kib,
            self.config.hash_params.iterations,
            self.config.hash_params.parallelism,
            None,
        )
        .map_err(|e| KeepsakeError::Crypto(format!("Failed to create hash params: {}", e)))?;
        let argon2 = Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params);

        let salt = SaltString::generate(&mut OsRng);
        let hash = argon2
            .hash_password(passphrase.as_bytes(), &salt)
            .map_err(|e| KeepsakeError::Crypto(format!("Passphrase hashing failed: {}", e)))?;
        Ok(hash.to_string())
    }

    /// Constant-time comparison via the hash library; cost parameters come
    /// from the stored PHC string.
    fn verify_passphrase(&self, passphrase: &str, stored: &str) -> Result<bool> {
        let parsed = PasswordHash::new(stored)
            .map_err(|e| KeepsakeError::Crypto(format!("Stored hash is malformed: {}", e)))?;
        match Argon2::default().verify_password(passphrase.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(KeepsakeError::Crypto(format!(
                "Passphrase verification failed: {}",
                e
            ))),
        }
    }

    fn create_session(&self, now: DateTime<Utc>, client: Option<ClientInfo>) -> Result<Session> {
        let id = generate_session_id()?;
        let client = client.unwrap_or_default();
        let session = Session {
            id: id.clone(),
            user_id: self.user_id.clone(),
            created_at: now,
            last_activity: now,
            expires_at: now + to_chrono(self.config.session_ttl),
            ip_address: client.ip_address,
            user_agent: client.user_agent,
        };
        self.store
            .put(&session_key(&id)?, &serde_json::to_vec(&session)?)?;
        Ok(session)
    }

    fn load_record(&self) -> Result<Option<PassphraseRecord>> {
        match self.store.get(&self.passphrase_key())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn save_record(&self, record: &PassphraseRecord) -> Result<()> {
        self.store
            .put(&self.passphrase_key(), &serde_json::to_vec(record)?)
    }

    fn passphrase_key(&self) -> String {
        format!("passphrase/{}", self.user_id)
    }

    fn guard(&self) -> Result<std::sync::MutexGuard<'_, ()>> {
        self.auth_lock
            .lock()
            .map_err(|_| KeepsakeError::Storage("Failed to lock gate".to_string()))
    }
}

fn session_key(session_id: &str) -> Result<String> {
    if session_id.is_empty() || !session_id.bytes().all(|b| b.is_ascii_hexdigit()) {
        // Malformed ids cannot name a stored session; report the same
        // signal a missing one would.
        return Err(KeepsakeError::SessionNotFound);
    }
    Ok(format!("{}{}", SESSION_PREFIX, session_id))
}

/// Fresh unguessable session token: 32 bytes of OS entropy, hex-encoded.
fn generate_session_id() -> Result<String> {
    let mut bytes = [0u8; 32];
    getrandom::getrandom(&mut bytes)
        .map_err(|e| KeepsakeError::Crypto(format!("Failed to generate session id: {}", e)))?;
    Ok(hex::encode(bytes))
}

fn to_chrono(duration: std::time::Duration) -> chrono::Duration {
    chrono::Duration::from_std(duration).expect("configured duration out of range")
}
