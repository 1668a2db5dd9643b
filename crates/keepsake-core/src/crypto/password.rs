//! Password strength scoring and secure generation.
//!
//! The scoring rubric is simple and deterministic: character
//! classes add points, repeated runs and well-known weak substrings remove
//! them, and the result is banded to 0–4. Hosts surface the feedback list
//! verbatim.

use rand::rngs::OsRng;
use rand::seq::SliceRandom;

use crate::error::{KeepsakeError, Result};

const LOWERCASE: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const UPPERCASE: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const DIGITS: &[u8] = b"0123456789";
const SYMBOLS: &[u8] = b"!@#$%^&*()-_=+[]{}:,.?";

/// Weak substrings that cost a point when present anywhere (case-insensitive).
const COMMON_PATTERNS: [&str; 5] = ["123", "abc", "password", "admin", "qwe"];

/// Minimum length for a password to be accepted at all.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Default length for generated passwords.
pub const DEFAULT_GENERATED_LENGTH: usize = 16;

/// Outcome of strength validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordStrength {
    /// Whether the password may be used for encryption.
    pub is_valid: bool,
    /// Banded score, 0 (unusable) to 4 (strong).
    pub score: u8,
    /// Every missing character class and triggered penalty, in a fixed
    /// order: length, lowercase, uppercase, digit, symbol, repeats,
    /// common patterns.
    pub feedback: Vec<String>,
}

/// Score a password against the strength rubric.
///
/// Each satisfied class (length ≥ 12, lowercase, uppercase, digit, symbol)
/// contributes one point and length ≥ 16 one bonus point; a repeated run of
/// three or more identical characters and the presence of a common weak
/// substring each subtract one. The score is clamped to 0–4. A password is
/// valid when it scores at least 2 and is at least 8 characters long.
pub fn validate_password(password: &str) -> PasswordStrength {
    let length = password.chars().count();
    let mut points: i32 = 0;
    let mut feedback = Vec::new();

    if length >= 12 {
        points += 1;
    } else {
        feedback.push("Use at least 12 characters".to_string());
    }

    if password.chars().any(|c| c.is_lowercase()) {
        points += 1;
    } else {
        feedback.push("Add lowercase letters".to_string());
    }

    if password.chars().any(|c| c.is_uppercase()) {
        points += 1;
    } else {
        feedback.push("Add uppercase letters".to_string());
    }

    if password.chars().any(|c| c.is_ascii_digit()) {
        points += 1;
    } else {
        feedback.push("Add a digit".to_string());
    }

    if password.chars().any(|c| !c.is_alphanumeric()) {
        points += 1;
    } else {
        feedback.push("Add a symbol".to_string());
    }

    if length >= 16 {
        points += 1;
    }

    if has_repeated_run(password) {
        points -= 1;
        feedback.push("Avoid repeating the same character three or more times".to_string());
    }

    let lowered = password.to_lowercase();
    if COMMON_PATTERNS.iter().any(|p| lowered.contains(p)) {
        points -= 1;
        feedback.push("Avoid common patterns like \"123\" or \"password\"".to_string());
    }

    let score = points.clamp(0, 4) as u8;

    PasswordStrength {
        is_valid: score >= 2 && length >= MIN_PASSWORD_LENGTH,
        score,
        feedback,
    }
}

/// Three or more identical characters in a row ("aaa").
fn has_repeated_run(password: &str) -> bool {
    let chars: Vec<char> = password.chars().collect();
    chars.windows(3).any(|w| w[0] == w[1] && w[1] == w[2])
}

/// Generate a random password guaranteed to contain every character class.
///
/// One character from each class is placed first, the remainder is drawn
/// from the union alphabet, and the whole string is shuffled so the
/// guaranteed characters are not positionally predictable. All randomness
/// comes from the operating system CSPRNG.
///
/// # Errors
///
/// Returns `InvalidInput` for lengths below 4 (one per class).
pub fn generate_secure_password(length: usize) -> Result<String> {
    if length < 4 {
        return Err(KeepsakeError::InvalidInput(format!(
            "Generated passwords need at least 4 characters (got {})",
            length
        )));
    }

    let mut rng = OsRng;
    let mut chars: Vec<u8> = Vec::with_capacity(length);

    for class in [LOWERCASE, UPPERCASE, DIGITS, SYMBOLS] {
        chars.push(*class.choose(&mut rng).expect("class alphabet is non-empty"));
    }

    let union: Vec<u8> = [LOWERCASE, UPPERCASE, DIGITS, SYMBOLS].concat();
    for _ in chars.len()..length {
        chars.push(*union.choose(&mut rng).expect("union alphabet is non-empty"));
    }

    chars.shuffle(&mut rng);

    Ok(String::from_utf8(chars).expect("alphabets are ASCII"))
}
