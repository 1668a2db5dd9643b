//! File-per-key store.
//!
//! Each key maps to one file beneath a root directory (key segments become
//! path components). Writes go to a sibling temp file first and are moved
//! into place with an atomic rename, so a crash mid-write leaves either the
//! old record or the new one, never a torn file. Records are owner-readable
//! only on Unix.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::traits::{validate_key, KeyValueStore};
use crate::error::{KeepsakeError, Result};

/// Suffix for in-flight writes; leftover temp files are invisible to reads.
const TEMP_SUFFIX: &str = ".tmp";

/// Store backed by one JSON document per key.
pub struct JsonFileStore {
    root: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileStore {
    /// Open (creating if needed) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| {
            KeepsakeError::Storage(format!(
                "Failed to create store directory {}: {}",
                root.display(),
                e
            ))
        })?;
        Ok(Self {
            root,
            lock: Mutex::new(()),
        })
    }

    /// Root directory of this store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }

    fn read_value(&self, path: &Path) -> Result<Option<Vec<u8>>> {
        match fs::read(path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(KeepsakeError::Storage(format!(
                "Failed to read {}: {}",
                path.display(),
                err
            ))),
        }
    }

    fn write_value(&self, path: &Path, value: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                KeepsakeError::Storage(format!(
                    "Failed to create directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let temp_path = temp_path_for(path);
        fs::write(&temp_path, value).map_err(|e| {
            KeepsakeError::Storage(format!("Failed to write {}: {}", temp_path.display(), e))
        })?;
        restrict_permissions(&temp_path)?;
        rename_with_fallback(&temp_path, path)
            .map_err(|e| KeepsakeError::Storage(format!("Atomic write failed: {}", e)))
    }

    fn remove_value(&self, path: &Path) -> Result<bool> {
        match fs::remove_file(path) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(KeepsakeError::Storage(format!(
                "Failed to remove {}: {}",
                path.display(),
                err
            ))),
        }
    }

    fn collect_keys(&self, dir: &Path, relative: &str, out: &mut Vec<String>) -> Result<()> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(err) => {
                return Err(KeepsakeError::Storage(format!(
                    "Failed to list {}: {}",
                    dir.display(),
                    err
                )))
            }
        };

        for entry in entries {
            let entry = entry.map_err(|e| {
                KeepsakeError::Storage(format!("Failed to list {}: {}", dir.display(), e))
            })?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            let child = if relative.is_empty() {
                name.to_string()
            } else {
                format!("{}/{}", relative, name)
            };

            let file_type = entry.file_type().map_err(|e| {
                KeepsakeError::Storage(format!("Failed to stat {}: {}", child, e))
            })?;
            if file_type.is_dir() {
                self.collect_keys(&entry.path(), &child, out)?;
            } else if !name.ends_with(TEMP_SUFFIX) {
                out.push(child);
            }
        }
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(key)?;
        let _guard = self.guard()?;
        self.read_value(&path)
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        let path = self.path_for(key)?;
        let _guard = self.guard()?;
        self.write_value(&path, value)
    }

    fn remove(&self, key: &str) -> Result<bool> {
        let path = self.path_for(key)?;
        let _guard = self.guard()?;
        self.remove_value(&path)
    }

    fn keys(&self, prefix: &str) -> Result<Vec<String>> {
        let _guard = self.guard()?;
        let mut keys = Vec::new();
        let root = self.root.clone();
        self.collect_keys(&root, "", &mut keys)?;
        keys.retain(|k| k.starts_with(prefix));
        keys.sort();
        Ok(keys)
    }

    fn update(
        &self,
        key: &str,
        apply: &mut dyn FnMut(Option<&[u8]>) -> Result<Option<Vec<u8>>>,
    ) -> Result<()> {
        let path = self.path_for(key)?;
        let _guard = self.guard()?;
        let current = self.read_value(&path)?;
        match apply(current.as_deref())? {
            Some(next) => self.write_value(&path, &next),
            None => self.remove_value(&path).map(|_| ()),
        }
    }
}

impl JsonFileStore {
    fn guard(&self) -> Result<std::sync::MutexGuard<'_, ()>> {
        self.lock
            .lock()
            .map_err(|_| KeepsakeError::Storage("Failed to lock store".to_string()))
    }
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(TEMP_SUFFIX);
    path.with_file_name(name)
}

/// Atomically rename a file, with fallback for platforms where rename fails
/// if the target exists. The temp file is cleaned up if the rename
/// ultimately fails.
fn rename_with_fallback(temp_path: &Path, destination: &Path) -> io::Result<()> {
    if let Err(initial_err) = fs::rename(temp_path, destination) {
        let _ = fs::remove_file(destination);
        fs::rename(temp_path, destination).map_err(|retry_err| {
            let _ = fs::remove_file(temp_path);
            io::Error::new(
                retry_err.kind(),
                format!(
                    "rename failed (initial: {}, retry: {})",
                    initial_err, retry_err
                ),
            )
        })?;
    }
    Ok(())
}

fn restrict_permissions(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = fs::metadata(path)
            .map_err(|e| KeepsakeError::Storage(format!("Failed to stat {}: {}", path.display(), e)))?
            .permissions();
        perms.set_mode(0o600);
        fs::set_permissions(path, perms).map_err(|e| {
            KeepsakeError::Storage(format!(
                "Failed to set permissions on {}: {}",
                path.display(),
                e
            ))
        })?;
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_put_get_round_trip() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();

        store.put("passphrase/default", b"{\"v\":1}").unwrap();
        assert_eq!(
            store.get("passphrase/default").unwrap(),
            Some(b"{\"v\":1}".to_vec())
        );
    }

    #[test]
    fn test_reopen_sees_existing_records() {
        let dir = tempdir().unwrap();
        {
            let store = JsonFileStore::open(dir.path()).unwrap();
            store.put("sessions/abc", b"data").unwrap();
        }
        let reopened = JsonFileStore::open(dir.path()).unwrap();
        assert_eq!(reopened.get("sessions/abc").unwrap(), Some(b"data".to_vec()));
    }

    #[test]
    fn test_keys_recurse_and_skip_temp_files() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();
        store.put("sessions/one", b"1").unwrap();
        store.put("sessions/two", b"2").unwrap();
        store.put("passphrase/default", b"3").unwrap();
        fs::write(dir.path().join("sessions/stale.tmp"), b"junk").unwrap();

        assert_eq!(
            store.keys("sessions/").unwrap(),
            vec!["sessions/one".to_string(), "sessions/two".to_string()]
        );
        assert_eq!(store.keys("").unwrap().len(), 3);
    }

    #[test]
    fn test_update_deletes_on_none() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();
        store.put("sessions/gone", b"x").unwrap();

        store.update("sessions/gone", &mut |_| Ok(None)).unwrap();
        assert_eq!(store.get("sessions/gone").unwrap(), None);
    }

    #[test]
    fn test_update_transforms_value() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();
        store.put("record", b"a").unwrap();

        store
            .update("record", &mut |current| {
                let mut value = current.unwrap().to_vec();
                value.push(b'b');
                Ok(Some(value))
            })
            .unwrap();
        assert_eq!(store.get("record").unwrap(), Some(b"ab".to_vec()));
    }

    #[test]
    fn test_traversal_key_rejected() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();
        assert!(store.put("../outside", b"x").is_err());
        assert!(store.get("a/../../b").is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_records_are_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();
        store.put("passphrase/default", b"secret").unwrap();

        let mode = fs::metadata(dir.path().join("passphrase/default"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
