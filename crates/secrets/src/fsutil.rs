//! Filesystem hygiene helpers

use rand::RngCore;
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;

// Overwrite chunk size for secure deletion.
const CHUNK: usize = 64 * 1024;

/// Overwrite a file with random data `passes` times, fsync each pass, then
/// unlink it.
///
/// Used for files that held plaintext secrets (the `secrets.yaml`
/// auto-import file). A missing file counts as success; any other failure is
/// reported as `false` after logging — the caller decides whether that is
/// fatal.
pub fn secure_delete(path: &Path, passes: u32) -> bool {
    if !path.exists() {
        return true;
    }

    let result = (|| -> std::io::Result<()> {
        let size = path.metadata()?.len();
        let mut file = std::fs::OpenOptions::new().write(true).open(path)?;
        let mut rng = rand::thread_rng();
        let mut buffer = vec![0u8; CHUNK];

        for _ in 0..passes {
            file.seek(SeekFrom::Start(0))?;
            let mut remaining = size;
            while remaining > 0 {
                let take = CHUNK.min(remaining as usize);
                rng.fill_bytes(&mut buffer[..take]);
                file.write_all(&buffer[..take])?;
                remaining -= take as u64;
            }
            file.flush()?;
            file.sync_all()?;
        }
        drop(file);
        std::fs::remove_file(path)
    })();

    match result {
        Ok(()) => {
            tracing::debug!("securely deleted file {:?}", path);
            true
        }
        Err(err) => {
            tracing::error!("failed to securely delete {:?}: {err}", path);
            false
        }
    }
}

/// Reject files larger than `max_size` bytes. Missing files are rejected
/// too — the caller should have checked existence first.
pub(crate) fn validate_file_size(path: &Path, max_size: u64) -> std::io::Result<()> {
    let size = path.metadata()?.len();
    if size > max_size {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("file too large: {size} bytes (max {max_size})"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secure_delete_removes_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secrets.yaml");
        std::fs::write(&path, "secrets:\n  - name: a\n    value: b\n").unwrap();

        assert!(secure_delete(&path, 3));
        assert!(!path.exists());
    }

    #[test]
    fn secure_delete_of_missing_file_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        assert!(secure_delete(&dir.path().join("absent"), 3));
    }

    #[test]
    fn size_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f");
        std::fs::write(&path, vec![0u8; 100]).unwrap();
        assert!(validate_file_size(&path, 100).is_ok());
        assert!(validate_file_size(&path, 99).is_err());
    }
}
