//! In-memory store.
//!
//! Primary backend for tests and for extension-local deployments that keep
//! records in the host's own persistence. A single mutex guards the map,
//! which gives every operation, `update` included, per-key
//! atomicity.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::traits::{validate_key, KeyValueStore};
use crate::error::{KeepsakeError, Result};

/// Mutex-guarded map store. Cheap to clone; clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> Result<MutexGuard<'_, HashMap<String, Vec<u8>>>> {
        self.entries
            .lock()
            .map_err(|_| KeepsakeError::Storage("Failed to lock store".to_string()))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        validate_key(key)?;
        Ok(self.entries()?.get(key).cloned())
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        validate_key(key)?;
        self.entries()?.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool> {
        validate_key(key)?;
        Ok(self.entries()?.remove(key).is_some())
    }

    fn keys(&self, prefix: &str) -> Result<Vec<String>> {
        let mut keys: Vec<String> = self
            .entries()?
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }

    fn update(
        &self,
        key: &str,
        apply: &mut dyn FnMut(Option<&[u8]>) -> Result<Option<Vec<u8>>>,
    ) -> Result<()> {
        validate_key(key)?;
        let mut entries = self.entries()?;
        let next = apply(entries.get(key).map(Vec::as_slice))?;
        match next {
            Some(value) => {
                entries.insert(key.to_string(), value);
            }
            None => {
                entries.remove(key);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_get_remove() {
        let store = MemoryStore::new();
        assert_eq!(store.get("a/b").unwrap(), None);

        store.put("a/b", b"value").unwrap();
        assert_eq!(store.get("a/b").unwrap().as_deref(), Some(&b"value"[..]));

        assert!(store.remove("a/b").unwrap());
        assert!(!store.remove("a/b").unwrap());
        assert_eq!(store.get("a/b").unwrap(), None);
    }

    #[test]
    fn test_keys_filtered_and_sorted() {
        let store = MemoryStore::new();
        store.put("sessions/b", b"2").unwrap();
        store.put("sessions/a", b"1").unwrap();
        store.put("passphrase/default", b"3").unwrap();

        assert_eq!(
            store.keys("sessions/").unwrap(),
            vec!["sessions/a".to_string(), "sessions/b".to_string()]
        );
    }

    #[test]
    fn test_update_inserts_replaces_and_deletes() {
        let store = MemoryStore::new();

        store
            .update("counter", &mut |current| {
                assert!(current.is_none());
                Ok(Some(vec![1]))
            })
            .unwrap();
        assert_eq!(store.get("counter").unwrap(), Some(vec![1]));

        store
            .update("counter", &mut |current| {
                let mut value = current.unwrap().to_vec();
                value[0] += 1;
                Ok(Some(value))
            })
            .unwrap();
        assert_eq!(store.get("counter").unwrap(), Some(vec![2]));

        store.update("counter", &mut |_| Ok(None)).unwrap();
        assert_eq!(store.get("counter").unwrap(), None);
    }

    #[test]
    fn test_concurrent_updates_never_lose_writes() {
        let store = MemoryStore::new();
        store.put("counter", &[0]).unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            handles.push(std::thread::spawn(move || {
                for _ in 0..50 {
                    store
                        .update("counter", &mut |current| {
                            let mut value = current.unwrap().to_vec();
                            value[0] = value[0].wrapping_add(1);
                            Ok(Some(value))
                        })
                        .unwrap();
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        // 8 * 50 = 400 = 144 mod 256
        assert_eq!(store.get("counter").unwrap(), Some(vec![144]));
    }

    #[test]
    fn test_invalid_key_rejected() {
        let store = MemoryStore::new();
        assert!(store.put("../escape", b"x").is_err());
    }

    #[test]
    fn test_clones_share_contents() {
        let store = MemoryStore::new();
        let other = store.clone();
        store.put("shared", b"yes").unwrap();
        assert_eq!(other.get("shared").unwrap(), Some(b"yes".to_vec()));
    }
}
