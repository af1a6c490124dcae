//! The keystore engine

use crate::lock::{default_lock_timeout, FileLock};
use crate::{format, KeystoreError};
use secrecy::{ExposeSecret, SecretString};
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Handle to one encrypted keystore file.
///
/// The handle is stateless between operations: every call acquires the
/// file lock, loads, optionally modifies and saves, then releases. Nothing
/// decrypted is cached, so any number of handles — in this process or any
/// other — stay coherent through the file alone.
pub struct Keystore {
    path: PathBuf,
    password: SecretString,
    lock: FileLock,
    lock_timeout: Duration,
}

impl Keystore {
    /// Bind a handle to `path`.
    ///
    /// Never touches the filesystem: the keystore file is created lazily on
    /// first write, and the lock file on first operation. `lock_timeout`
    /// falls back to `KEYSTORE_LOCK_TIMEOUT` seconds, default 30.
    pub fn open(
        path: impl Into<PathBuf>,
        password: SecretString,
        lock_timeout: Option<Duration>,
    ) -> Self {
        let path = path.into();
        let lock = FileLock::for_keystore(&path);
        let lock_timeout = lock_timeout.unwrap_or_else(default_lock_timeout);
        tracing::debug!(
            "keystore bound to {:?} (lock {:?}, timeout {:?})",
            path,
            lock.path(),
            lock_timeout
        );
        Self {
            path,
            password,
            lock,
            lock_timeout,
        }
    }

    /// The keystore file location.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Retrieve a value. Holds the lock for the read so a mid-rename file is
    /// never observed.
    pub fn get(&self, key: &str) -> Result<Option<String>, KeystoreError> {
        let _guard = self.lock.acquire(self.lock_timeout)?;
        let entries = self.load()?;
        Ok(entries.get(key).cloned())
    }

    /// Add or update one entry.
    pub fn set(&self, key: &str, value: &str) -> Result<(), KeystoreError> {
        let _guard = self.lock.acquire(self.lock_timeout)?;
        let mut entries = self.load()?;
        entries.insert(key.to_string(), value.to_string());
        self.save(&entries)?;
        tracing::debug!("keystore entry stored");
        Ok(())
    }

    /// Remove one entry. Removing an absent key is a no-op (and skips the
    /// save entirely).
    pub fn delete(&self, key: &str) -> Result<(), KeystoreError> {
        let _guard = self.lock.acquire(self.lock_timeout)?;
        let mut entries = self.load()?;
        if entries.remove(key).is_some() {
            self.save(&entries)?;
            tracing::debug!("keystore entry deleted");
        }
        Ok(())
    }

    /// The complete decrypted map.
    pub fn get_all(&self) -> Result<HashMap<String, String>, KeystoreError> {
        let _guard = self.lock.acquire(self.lock_timeout)?;
        self.load()
    }

    // Load under the already-held lock. Missing file is an empty map.
    fn load(&self) -> Result<HashMap<String, String>, KeystoreError> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let image = std::fs::read(&self.path)?;
        format::open(&image, self.password.expose_secret().as_bytes())
    }

    // Save under the already-held lock, atomically: temp file in the target
    // directory, write, flush, fsync, rename. The temp file is unlinked on
    // any failure.
    fn save(&self, entries: &HashMap<String, String>) -> Result<(), KeystoreError> {
        let image = format::seal(entries, self.password.expose_secret().as_bytes())?;

        let dir = self.path.parent().filter(|p| !p.as_os_str().is_empty());
        let dir = dir.unwrap_or_else(|| Path::new("."));

        let mut temp = tempfile::Builder::new()
            .prefix("keystore_")
            .suffix(".tmp")
            .tempfile_in(dir)?;
        temp.write_all(&image)?;
        temp.flush()?;
        temp.as_file().sync_all()?;

        temp.persist(&self.path).map_err(|err| KeystoreError::Io(err.error))?;
        tracing::debug!("keystore saved atomically to {:?}", self.path);
        Ok(())
    }
}

impl std::fmt::Debug for Keystore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keystore")
            .field("path", &self.path)
            .field("lock_timeout", &self.lock_timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn store_in(dir: &Path) -> Keystore {
        Keystore::open(
            dir.join("test.v3keystore"),
            SecretString::from("unit-password".to_string()),
            Some(Duration::from_secs(5)),
        )
    }

    #[test]
    fn file_is_created_lazily() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        assert_eq!(store.get("missing").unwrap(), None);
        assert!(!store.path().exists());

        store.set("k", "v").unwrap();
        assert!(store.path().exists());
    }

    #[test]
    fn set_get_delete_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());

        store.set("api", "k1").unwrap();
        assert_eq!(store.get("api").unwrap().as_deref(), Some("k1"));

        store.set("api", "k2").unwrap();
        assert_eq!(store.get("api").unwrap().as_deref(), Some("k2"));

        store.delete("api").unwrap();
        assert_eq!(store.get("api").unwrap(), None);
    }

    #[test]
    fn file_is_always_valid_after_operations() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());

        for i in 0..10 {
            store.set(&format!("key{i}"), &format!("value{i}")).unwrap();
        }
        store.delete("key3").unwrap();

        let raw = std::fs::read(store.path()).unwrap();
        assert!(raw.len() >= crate::MIN_FILE_LEN);

        let all = store.get_all().unwrap();
        assert_eq!(all.len(), 9);
        assert_eq!(all.get("key7").map(String::as_str), Some("value7"));
    }

    #[test]
    fn no_temp_files_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        store.set("a", "1").unwrap();
        store.set("b", "2").unwrap();

        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|name| name.ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty(), "temp files left: {leftovers:?}");
    }

    #[test]
    fn second_handle_sees_writes() {
        let dir = tempfile::tempdir().unwrap();
        let first = store_in(dir.path());
        first.set("shared", "value").unwrap();

        let second = store_in(dir.path());
        assert_eq!(second.get("shared").unwrap().as_deref(), Some("value"));
    }

    #[test]
    fn tampering_surfaces_integrity_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        store.set("k", "v").unwrap();

        let mut raw = std::fs::read(store.path()).unwrap();
        let mid = raw.len() / 2;
        raw[mid] ^= 0x01;
        std::fs::write(store.path(), &raw).unwrap();

        let err = store.get("k").unwrap_err();
        assert!(err.is_integrity());
    }
}
