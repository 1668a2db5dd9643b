//! Content-key derivation using PBKDF2-HMAC-SHA256.
//!
//! Every encrypted note derives its own 256-bit key from the user's
//! password and the note's salt. The iteration count is recorded in the
//! note, so decryption always replays the exact parameters the record was
//! created with, never a process-wide default.

use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use zeroize::ZeroizeOnDrop;

use crate::error::{KeepsakeError, Result};

/// Floor for the PBKDF2 iteration count. Records below this are never
/// produced; decryption of a record claiming fewer is refused.
pub const MIN_PBKDF2_ITERATIONS: u32 = 100_000;

/// Minimum salt length in bytes.
pub const MIN_SALT_LEN: usize = 32;

/// Length of derived key in bytes (32 bytes = 256 bits for AES-256-GCM).
const KEY_LENGTH: usize = 32;

/// A cryptographic key derived from a password.
///
/// Key material is zeroized from memory when dropped, reducing the window
/// of exposure.
#[derive(Clone, ZeroizeOnDrop)]
pub struct DerivedKey {
    key: [u8; KEY_LENGTH],
}

impl DerivedKey {
    /// Get a reference to the raw key bytes.
    ///
    /// # Security
    ///
    /// Avoid storing or logging this value. Use only for immediate
    /// encryption operations.
    pub fn as_bytes(&self) -> &[u8; KEY_LENGTH] {
        &self.key
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedKey")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// Derive an encryption key from a password using PBKDF2-HMAC-SHA256.
///
/// # Arguments
///
/// * `password` - The password to derive from
/// * `salt` - Random salt (must be unique per note, at least 32 bytes)
/// * `iterations` - Iteration count (at least 100,000)
///
/// # Security
///
/// - Same password + salt + iterations always produces the same key
/// - Different salt produces a different key (salt travels with the note)
pub fn derive_key(password: &str, salt: &[u8], iterations: u32) -> Result<DerivedKey> {
    if password.is_empty() {
        return Err(KeepsakeError::InvalidInput(
            "Password cannot be empty".to_string(),
        ));
    }

    if salt.len() < MIN_SALT_LEN {
        return Err(KeepsakeError::InvalidInput(format!(
            "Salt must be at least {} bytes (got {})",
            MIN_SALT_LEN,
            salt.len()
        )));
    }

    if iterations < MIN_PBKDF2_ITERATIONS {
        return Err(KeepsakeError::InvalidInput(format!(
            "Iteration count must be at least {} (got {})",
            MIN_PBKDF2_ITERATIONS, iterations
        )));
    }

    let mut key = [0u8; KEY_LENGTH];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut key);

    Ok(DerivedKey { key })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_ITERATIONS: u32 = MIN_PBKDF2_ITERATIONS;

    fn salt(tag: u8) -> [u8; MIN_SALT_LEN] {
        [tag; MIN_SALT_LEN]
    }

    #[test]
    fn test_key_derivation_deterministic() {
        let key1 = derive_key("test-password", &salt(1), TEST_ITERATIONS).unwrap();
        let key2 = derive_key("test-password", &salt(1), TEST_ITERATIONS).unwrap();
        assert_eq!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn test_different_salt_different_key() {
        let key1 = derive_key("test-password", &salt(1), TEST_ITERATIONS).unwrap();
        let key2 = derive_key("test-password", &salt(2), TEST_ITERATIONS).unwrap();
        assert_ne!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn test_different_password_different_key() {
        let key1 = derive_key("password-one", &salt(1), TEST_ITERATIONS).unwrap();
        let key2 = derive_key("password-two", &salt(1), TEST_ITERATIONS).unwrap();
        assert_ne!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn test_different_iterations_different_key() {
        let key1 = derive_key("test-password", &salt(1), TEST_ITERATIONS).unwrap();
        let key2 = derive_key("test-password", &salt(1), TEST_ITERATIONS + 1).unwrap();
        assert_ne!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn test_empty_password_rejected() {
        let result = derive_key("", &salt(1), TEST_ITERATIONS);
        assert!(matches!(result, Err(KeepsakeError::InvalidInput(_))));
    }

    #[test]
    fn test_short_salt_rejected() {
        let result = derive_key("test-password", b"short-salt", TEST_ITERATIONS);
        assert!(matches!(result, Err(KeepsakeError::InvalidInput(_))));
    }

    #[test]
    fn test_low_iteration_count_rejected() {
        let result = derive_key("test-password", &salt(1), MIN_PBKDF2_ITERATIONS - 1);
        assert!(matches!(result, Err(KeepsakeError::InvalidInput(_))));
    }

    #[test]
    fn test_derived_key_debug_redacts() {
        let key = derive_key("test-password", &salt(1), TEST_ITERATIONS).unwrap();
        let debug_output = format!("{:?}", key);
        assert!(debug_output.contains("REDACTED"));

        let key_hex = hex::encode(&key.as_bytes()[..4]);
        assert!(!debug_output.contains(&key_hex));
    }
}
