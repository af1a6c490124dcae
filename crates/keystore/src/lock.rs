//! Cross-process advisory locking
//!
//! One empty `.lock` file per keystore mediates exclusion between every
//! process touching that keystore. The lock file is created on first open,
//! may outlive the process, and its content is never read.

use crate::KeystoreError;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

// Poll interval while waiting for a contended lock.
const RETRY_INTERVAL: Duration = Duration::from_millis(50);

/// Default lock acquisition timeout, overridable via
/// `KEYSTORE_LOCK_TIMEOUT` (integer seconds).
pub fn default_lock_timeout() -> Duration {
    let seconds = std::env::var("KEYSTORE_LOCK_TIMEOUT")
        .ok()
        .and_then(|value| value.trim().parse::<u64>().ok())
        .unwrap_or(30);
    Duration::from_secs(seconds)
}

/// Advisory exclusive lock bound to `<keystore_path>.lock`.
#[derive(Debug)]
pub struct FileLock {
    path: PathBuf,
}

impl FileLock {
    /// Lock for the given keystore path.
    pub fn for_keystore(keystore_path: &Path) -> Self {
        let mut file_name = keystore_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        file_name.push_str(".lock");
        Self {
            path: keystore_path.with_file_name(file_name),
        }
    }

    /// The lock file location.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Block until the exclusive lock is held, up to `timeout`.
    ///
    /// The lock is released when the returned guard drops.
    pub fn acquire(&self, timeout: Duration) -> Result<LockGuard, KeystoreError> {
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&self.path)?;

        let deadline = Instant::now() + timeout;
        loop {
            // Fully qualified: std grew same-named inherent methods on File.
            match fs2::FileExt::try_lock_exclusive(&file) {
                Ok(()) => return Ok(LockGuard { file }),
                Err(err) if is_contended(&err) => {
                    if Instant::now() >= deadline {
                        tracing::error!(
                            "timeout acquiring keystore lock {:?} after {:?}",
                            self.path,
                            timeout
                        );
                        return Err(KeystoreError::LockTimeout {
                            path: self.path.clone(),
                            timeout,
                        });
                    }
                    std::thread::sleep(RETRY_INTERVAL);
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
}

fn is_contended(err: &std::io::Error) -> bool {
    err.kind() == std::io::ErrorKind::WouldBlock
        || err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

/// Holds the exclusive lock; dropping releases it.
#[derive(Debug)]
pub struct LockGuard {
    file: File,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let _ = fs2::FileExt::unlock(&self.file);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_path_is_sibling_with_suffix() {
        let lock = FileLock::for_keystore(Path::new("/data/app.v3keystore"));
        assert_eq!(lock.path(), Path::new("/data/app.v3keystore.lock"));
    }

    #[test]
    fn acquire_and_release() {
        let dir = tempfile::tempdir().unwrap();
        let keystore = dir.path().join("t.v3keystore");
        let lock = FileLock::for_keystore(&keystore);

        let guard = lock.acquire(Duration::from_secs(1)).unwrap();
        drop(guard);

        // Re-acquirable after release.
        let again = lock.acquire(Duration::from_secs(1));
        assert!(again.is_ok());
    }

    #[test]
    fn contended_lock_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let keystore = dir.path().join("t.v3keystore");
        let lock = FileLock::for_keystore(&keystore);

        let _held = lock.acquire(Duration::from_secs(5)).unwrap();

        // A second handle in another thread must time out while the guard
        // lives. fs2 locks are per-file-handle, so the contention is real
        // even within one process.
        let path = keystore.clone();
        let result = std::thread::spawn(move || {
            let lock = FileLock::for_keystore(&path);
            lock.acquire(Duration::from_millis(200))
        })
        .join()
        .unwrap();

        assert!(matches!(result, Err(KeystoreError::LockTimeout { .. })));
    }

    #[test]
    fn timeout_env_override() {
        // Default without the variable present.
        if std::env::var("KEYSTORE_LOCK_TIMEOUT").is_err() {
            assert_eq!(default_lock_timeout(), Duration::from_secs(30));
        }
    }
}
