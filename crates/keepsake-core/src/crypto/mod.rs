//! Cryptographic building blocks for the content envelope.
//!
//! Built on well-audited RustCrypto implementations:
//! - **PBKDF2-HMAC-SHA256**: per-note key derivation with a recorded
//!   iteration count
//! - **AES-256-GCM**: authenticated encryption (used by [`crate::envelope`])
//!
//! ## Security model
//!
//! - Every note gets a fresh random salt and nonce; nothing is ever reused
//!   across records
//! - Derived key material is zeroized from memory on drop
//! - Plaintext passwords are never stored or logged
//!
//! ## Threat model
//!
//! We defend against theft of encrypted records and offline brute-force on
//! the password. We do NOT defend against a compromised host, keyloggers,
//! or access to an unlocked session.

pub mod key;
pub mod password;

pub use key::{derive_key, DerivedKey, MIN_PBKDF2_ITERATIONS, MIN_SALT_LEN};
pub use password::{
    generate_secure_password, validate_password, PasswordStrength, DEFAULT_GENERATED_LENGTH,
    MIN_PASSWORD_LENGTH,
};
