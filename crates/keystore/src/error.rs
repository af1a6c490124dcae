//! Keystore failures

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Everything that can go wrong inside the keystore engine.
#[derive(Debug, Error)]
pub enum KeystoreError {
    /// The advisory file lock could not be acquired within the timeout.
    /// Retryable: another process holds the lock.
    #[error("timeout acquiring keystore lock {path:?} after {timeout:?}")]
    LockTimeout {
        /// Lock file path.
        path: PathBuf,
        /// Configured acquisition timeout.
        timeout: Duration,
    },

    /// The file failed authentication or is structurally impossible.
    /// Never silently recovered — it means tampering or corruption.
    #[error("keystore integrity check failed: {reason}")]
    Integrity {
        /// What the check found.
        reason: String,
    },

    /// No stable machine identifier could be gathered, and the requested
    /// derivation cannot be deterministic without one.
    #[error("failed to determine unique machine ID for legacy keystore password")]
    MachineIdUnavailable,

    /// The derived key was rejected by the cipher layer.
    #[error("keystore cipher error: {reason}")]
    Cipher {
        /// Underlying cause.
        reason: String,
    },

    /// Filesystem failure during load, save or lock handling.
    #[error("keystore I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The decrypted payload was not the expected JSON object.
    #[error("keystore payload error: {0}")]
    Payload(#[from] serde_json::Error),
}

impl KeystoreError {
    /// Whether a caller may reasonably retry the operation.
    pub fn is_retryable(&self) -> bool {
        matches!(self, KeystoreError::LockTimeout { .. })
    }

    /// Whether this failure indicates tampering or corruption.
    pub fn is_integrity(&self) -> bool {
        matches!(self, KeystoreError::Integrity { .. })
    }
}
