//! Content encryption envelope.
//!
//! Turns a plaintext note plus a password into a self-describing ciphertext
//! record, and back. Every record carries its own salt, nonce, and key
//! derivation parameters, so decryption never depends on process-wide
//! defaults: a record written today stays readable after the defaults
//! move.
//!
//! All decryption failures collapse to the single generic
//! [`KeepsakeError::DecryptionFailed`]: the caller-facing signal must not
//! reveal whether the password or the data was at fault. The real cause is
//! logged at debug level only.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::debug;
use zeroize::{Zeroize, Zeroizing};

use crate::config::EnvelopeConfig;
use crate::crypto::{derive_key, validate_password};
use crate::error::{KeepsakeError, Result};

/// AEAD algorithm identifier recorded in every note.
pub const AEAD_ALGORITHM: &str = "AES-256-GCM";

/// Key derivation identifier recorded in every note.
pub const KEY_DERIVATION: &str = "PBKDF2-SHA256";

const SALT_LEN: usize = 32;
const NONCE_LEN: usize = 12;

/// One piece of content locked under a password.
///
/// Serializes to the wire shape consumed by the surrounding system:
/// camelCase keys, binary fields as standard base64. The authentication
/// tag is part of `ciphertext`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedNote {
    /// Encrypted content, AEAD tag included.
    #[serde(with = "base64_bytes")]
    pub ciphertext: Vec<u8>,

    /// Key derivation salt, fresh per encryption.
    #[serde(with = "base64_bytes")]
    pub salt: Vec<u8>,

    /// AEAD nonce, fresh per encryption.
    #[serde(with = "base64_bytes")]
    pub nonce: Vec<u8>,

    /// AEAD algorithm identifier (see [`AEAD_ALGORITHM`]).
    pub algorithm: String,

    /// Key derivation identifier (see [`KEY_DERIVATION`]).
    pub key_derivation: String,

    /// PBKDF2 iteration count the record was written with.
    pub iterations: u32,

    /// Optional plaintext reminder. Never the password itself.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

/// Content encryption service.
///
/// Stateless apart from its configuration; construct one at process start
/// and share it by reference.
#[derive(Debug, Clone, Default)]
pub struct NoteEnvelope {
    config: EnvelopeConfig,
}

impl NoteEnvelope {
    pub fn new(config: EnvelopeConfig) -> Self {
        Self { config }
    }

    /// Encrypt a plaintext note under a password.
    ///
    /// Rejects weak passwords before any cryptographic work, then derives a
    /// 256-bit key from a fresh 32-byte salt and seals the UTF-8 plaintext
    /// under AES-256-GCM with a fresh 12-byte nonce.
    ///
    /// # Errors
    ///
    /// Returns [`KeepsakeError::WeakPassword`] with the full feedback list
    /// when the password fails validation; [`KeepsakeError::Crypto`] if the
    /// provider itself fails.
    pub fn encrypt(
        &self,
        plaintext: &str,
        password: &str,
        hint: Option<&str>,
    ) -> Result<EncryptedNote> {
        let strength = validate_password(password);
        if !strength.is_valid {
            return Err(KeepsakeError::WeakPassword {
                feedback: strength.feedback,
            });
        }

        let mut salt = vec![0u8; SALT_LEN];
        OsRng.fill_bytes(&mut salt);
        let mut nonce = vec![0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);

        let key = derive_key(password, &salt, self.config.pbkdf2_iterations)?;
        let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
            .map_err(|e| KeepsakeError::Crypto(format!("Failed to create cipher: {}", e)))?;

        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext.as_bytes())
            .map_err(|e| KeepsakeError::Crypto(format!("Encryption failed: {}", e)))?;

        Ok(EncryptedNote {
            ciphertext,
            salt,
            nonce,
            algorithm: AEAD_ALGORITHM.to_string(),
            key_derivation: KEY_DERIVATION.to_string(),
            iterations: self.config.pbkdf2_iterations,
            hint: hint.map(str::to_string),
        })
    }

    /// Decrypt a note with its password.
    ///
    /// The key is re-derived from the record's own salt and iteration
    /// count, never from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`KeepsakeError::DecryptionFailed`] for every failure mode:
    /// wrong password, tampered ciphertext, malformed record. The internal
    /// cause is logged at debug level.
    pub fn decrypt(&self, note: &EncryptedNote, password: &str) -> Result<String> {
        if note.algorithm != AEAD_ALGORITHM || note.key_derivation != KEY_DERIVATION {
            debug!(
                algorithm = %note.algorithm,
                key_derivation = %note.key_derivation,
                "record carries unknown algorithm identifiers"
            );
            return Err(KeepsakeError::DecryptionFailed);
        }

        if note.nonce.len() != NONCE_LEN {
            debug!(nonce_len = note.nonce.len(), "record nonce has wrong length");
            return Err(KeepsakeError::DecryptionFailed);
        }

        let key = derive_key(password, &note.salt, note.iterations).map_err(|err| {
            debug!(%err, "key derivation refused record parameters");
            KeepsakeError::DecryptionFailed
        })?;

        let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
            .map_err(|e| KeepsakeError::Crypto(format!("Failed to create cipher: {}", e)))?;

        let plaintext = cipher
            .decrypt(Nonce::from_slice(&note.nonce), note.ciphertext.as_slice())
            .map_err(|_| {
                debug!("authentication tag mismatch (wrong password or tampered data)");
                KeepsakeError::DecryptionFailed
            })?;

        String::from_utf8(plaintext).map_err(|_| {
            debug!("decrypted bytes are not valid UTF-8");
            KeepsakeError::DecryptionFailed
        })
    }

    /// Re-encrypt a note under a new password.
    ///
    /// Decrypts with the current password first; on any failure the
    /// original record is returned untouched to the caller. The new record
    /// always gets a fresh salt and nonce. The hint carries over unless
    /// explicitly replaced.
    pub fn change_password(
        &self,
        note: &EncryptedNote,
        current_password: &str,
        new_password: &str,
        new_hint: Option<&str>,
    ) -> Result<EncryptedNote> {
        let plaintext = Zeroizing::new(self.decrypt(note, current_password)?);
        let hint = new_hint.map(str::to_string).or_else(|| note.hint.clone());
        self.encrypt(&plaintext, new_password, hint.as_deref())
    }

    /// Remove protection from a note, consuming the record.
    ///
    /// On success the encryption metadata is zeroized and the plaintext
    /// returned; the note is a plain note from here on.
    pub fn remove_protection(&self, mut note: EncryptedNote, password: &str) -> Result<String> {
        let plaintext = self.decrypt(&note, password)?;
        note.ciphertext.zeroize();
        note.salt.zeroize();
        note.nonce.zeroize();
        note.hint = None;
        Ok(plaintext)
    }
}

/// Serde adapter: binary fields travel as standard base64 strings.
mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::MIN_PBKDF2_ITERATIONS;

    fn envelope() -> NoteEnvelope {
        NoteEnvelope::new(EnvelopeConfig {
            pbkdf2_iterations: MIN_PBKDF2_ITERATIONS,
        })
    }

    const PASSWORD: &str = "Correct-Horse7-Battery";
    const OTHER_PASSWORD: &str = "Wrong-Staple9-Basket";

    #[test]
    fn test_encrypt_decrypt_round_trip() {
        let envelope = envelope();
        let note = envelope
            .encrypt("dear future reader", PASSWORD, Some("the usual one"))
            .unwrap();

        assert_eq!(note.algorithm, AEAD_ALGORITHM);
        assert_eq!(note.key_derivation, KEY_DERIVATION);
        assert_eq!(note.iterations, MIN_PBKDF2_ITERATIONS);
        assert_eq!(note.hint.as_deref(), Some("the usual one"));

        let plaintext = envelope.decrypt(&note, PASSWORD).unwrap();
        assert_eq!(plaintext, "dear future reader");
    }

    #[test]
    fn test_empty_plaintext_round_trip() {
        let envelope = envelope();
        let note = envelope.encrypt("", PASSWORD, None).unwrap();
        assert_eq!(envelope.decrypt(&note, PASSWORD).unwrap(), "");
    }

    #[test]
    fn test_wrong_password_fails_closed() {
        let envelope = envelope();
        let note = envelope.encrypt("secret", PASSWORD, None).unwrap();
        let result = envelope.decrypt(&note, OTHER_PASSWORD);
        assert!(matches!(result, Err(KeepsakeError::DecryptionFailed)));
    }

    #[test]
    fn test_weak_password_rejected_before_encryption() {
        let envelope = envelope();
        let result = envelope.encrypt("secret", "password", None);
        match result {
            Err(KeepsakeError::WeakPassword { feedback }) => {
                assert!(!feedback.is_empty());
            }
            other => panic!("expected WeakPassword, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_salt_and_nonce_fresh_per_encryption() {
        let envelope = envelope();
        let first = envelope.encrypt("same text", PASSWORD, None).unwrap();
        let second = envelope.encrypt("same text", PASSWORD, None).unwrap();

        assert_ne!(first.salt, second.salt);
        assert_ne!(first.nonce, second.nonce);
        assert_ne!(first.ciphertext, second.ciphertext);
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let envelope = envelope();
        let mut note = envelope.encrypt("secret", PASSWORD, None).unwrap();
        let mid = note.ciphertext.len() / 2;
        note.ciphertext[mid] ^= 0xFF;

        let result = envelope.decrypt(&note, PASSWORD);
        assert!(matches!(result, Err(KeepsakeError::DecryptionFailed)));
    }

    #[test]
    fn test_foreign_algorithm_identifier_fails() {
        let envelope = envelope();
        let mut note = envelope.encrypt("secret", PASSWORD, None).unwrap();
        note.algorithm = "ROT13".to_string();

        let result = envelope.decrypt(&note, PASSWORD);
        assert!(matches!(result, Err(KeepsakeError::DecryptionFailed)));
    }

    #[test]
    fn test_change_password_reencrypts_with_fresh_material() {
        let envelope = envelope();
        let original = envelope
            .encrypt("carry me over", PASSWORD, Some("old hint"))
            .unwrap();

        let rekeyed = envelope
            .change_password(&original, PASSWORD, OTHER_PASSWORD, None)
            .unwrap();

        assert_ne!(rekeyed.salt, original.salt);
        assert_ne!(rekeyed.nonce, original.nonce);
        assert_eq!(rekeyed.hint.as_deref(), Some("old hint"));

        assert_eq!(envelope.decrypt(&rekeyed, OTHER_PASSWORD).unwrap(), "carry me over");
        assert!(matches!(
            envelope.decrypt(&rekeyed, PASSWORD),
            Err(KeepsakeError::DecryptionFailed)
        ));
    }

    #[test]
    fn test_change_password_wrong_current_leaves_record_usable() {
        let envelope = envelope();
        let note = envelope.encrypt("unchanged", PASSWORD, None).unwrap();

        let result = envelope.change_password(&note, OTHER_PASSWORD, "New-Password4!", None);
        assert!(matches!(result, Err(KeepsakeError::DecryptionFailed)));

        // The original record still decrypts.
        assert_eq!(envelope.decrypt(&note, PASSWORD).unwrap(), "unchanged");
    }

    #[test]
    fn test_change_password_replaces_hint_when_given() {
        let envelope = envelope();
        let note = envelope
            .encrypt("text", PASSWORD, Some("old hint"))
            .unwrap();
        let rekeyed = envelope
            .change_password(&note, PASSWORD, OTHER_PASSWORD, Some("new hint"))
            .unwrap();
        assert_eq!(rekeyed.hint.as_deref(), Some("new hint"));
    }

    #[test]
    fn test_remove_protection_returns_plaintext() {
        let envelope = envelope();
        let note = envelope.encrypt("set me free", PASSWORD, Some("hint")).unwrap();
        let plaintext = envelope.remove_protection(note, PASSWORD).unwrap();
        assert_eq!(plaintext, "set me free");
    }

    #[test]
    fn test_wire_shape_round_trip() {
        let envelope = envelope();
        let note = envelope
            .encrypt("wire format", PASSWORD, Some("hint"))
            .unwrap();

        let json = serde_json::to_value(&note).unwrap();
        assert!(json.get("keyDerivation").is_some());
        assert!(json.get("ciphertext").unwrap().is_string());
        assert!(json.get("salt").unwrap().is_string());
        assert!(json.get("nonce").unwrap().is_string());

        let parsed: EncryptedNote = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, note);
        assert_eq!(envelope.decrypt(&parsed, PASSWORD).unwrap(), "wire format");
    }

    #[test]
    fn test_hint_field_omitted_when_absent() {
        let envelope = envelope();
        let note = envelope.encrypt("no hint", PASSWORD, None).unwrap();
        let json = serde_json::to_string(&note).unwrap();
        assert!(!json.contains("hint"));
    }
}
