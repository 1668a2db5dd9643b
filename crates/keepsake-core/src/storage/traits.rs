//! Key-value store trait definition.
//!
//! The gate persists passphrase records and sessions through this
//! interface; it never sees a filesystem or a database. Backends only have
//! to provide byte blobs keyed by path-like strings and an atomic
//! read-modify-write per key.

use crate::error::{KeepsakeError, Result};

/// Key-value storage interface for persisted records.
///
/// All implementations must ensure:
/// - Each method call is atomic with respect to the affected key
/// - `update` runs its closure under the store's per-key serialization, so
///   concurrent read-modify-writes of the same key never lose a write
/// - Keys are opaque to the backend beyond the path-segment syntax below
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Store `value` under `key`, replacing any previous value.
    fn put(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Delete the value under `key`.
    ///
    /// # Returns
    ///
    /// `true` if a value existed.
    fn remove(&self, key: &str) -> Result<bool>;

    /// All keys starting with `prefix`, sorted.
    fn keys(&self, prefix: &str) -> Result<Vec<String>>;

    /// Atomically transform the value under `key`.
    ///
    /// The closure receives the current value and returns the next one;
    /// `None` deletes the key. No other access to `key` is interleaved
    /// between the read and the write.
    fn update(
        &self,
        key: &str,
        apply: &mut dyn FnMut(Option<&[u8]>) -> Result<Option<Vec<u8>>>,
    ) -> Result<()>;
}

/// Check that a key is made of safe path segments.
///
/// Keys are slash-separated segments of ASCII alphanumerics, `.`, `_`, and
/// `-`; `.` and `..` segments are rejected so file-backed stores can map
/// keys to paths directly.
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(KeepsakeError::InvalidInput(
            "Storage key cannot be empty".to_string(),
        ));
    }

    for segment in key.split('/') {
        if segment.is_empty() || segment == "." || segment == ".." {
            return Err(KeepsakeError::InvalidInput(format!(
                "Invalid storage key segment in {:?}",
                key
            )));
        }
        if !segment
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'.' || b == b'_' || b == b'-')
        {
            return Err(KeepsakeError::InvalidInput(format!(
                "Storage key contains unsupported characters: {:?}",
                key
            )));
        }
    }

    Ok(())
}
