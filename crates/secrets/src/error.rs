//! Secret store failures
//!
//! Public messages carry an operation name and a correlation id, nothing
//! else; the id links to the full-detail record in the security audit sink.

use armature_error::ErrorId;
use armature_keystore::KeystoreError;
use armature_validator::ValidationError;
use thiserror::Error;

/// Classification of an audited failure, for callers that react differently
/// to retryable and non-retryable causes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretErrorKind {
    /// Input failed structural validation.
    Validation,
    /// Keystore integrity failure (tampering / corruption).
    Integrity,
    /// Keystore lock not acquired in time; retryable.
    LockTimeout,
    /// Filesystem-level failure.
    Filesystem,
    /// Anything else.
    Other,
}

/// Failure surfaced by the secrets subsystem.
#[derive(Debug, Error)]
pub enum SecretsError {
    /// An audited operation failed; details are in the audit log under the id.
    #[error("Secret operation '{operation}' failed (Error ID: {id})")]
    Operation {
        /// Operation name (`get_secret`, `set_secret`, ...).
        operation: String,
        /// Failure classification.
        kind: SecretErrorKind,
        /// Audit correlation id.
        id: ErrorId,
    },

    /// A local store could not be opened at all.
    #[error("Failed to open Secrets Store (Error ID: {id})")]
    StoreOpen {
        /// Audit correlation id.
        id: ErrorId,
    },

    /// A named store does not exist.
    #[error("unknown secrets store '{name}'")]
    UnknownStore {
        /// The name that failed to resolve.
        name: String,
    },
}

impl SecretsError {
    /// Classification of this failure.
    pub fn kind(&self) -> SecretErrorKind {
        match self {
            SecretsError::Operation { kind, .. } => *kind,
            SecretsError::StoreOpen { .. } | SecretsError::UnknownStore { .. } => {
                SecretErrorKind::Other
            }
        }
    }

    /// Whether a caller may reasonably retry.
    pub fn is_retryable(&self) -> bool {
        self.kind() == SecretErrorKind::LockTimeout
    }
}

// Internal composite so `?` works across validator and keystore calls inside
// one audited operation.
#[derive(Debug, Error)]
pub(crate) enum OpError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Keystore(#[from] KeystoreError),
    #[error("{0}")]
    Message(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl OpError {
    pub(crate) fn msg(text: impl Into<String>) -> Self {
        OpError::Message(text.into())
    }

    pub(crate) fn kind(&self) -> SecretErrorKind {
        match self {
            OpError::Validation(_) => SecretErrorKind::Validation,
            OpError::Keystore(KeystoreError::LockTimeout { .. }) => SecretErrorKind::LockTimeout,
            OpError::Keystore(err) if err.is_integrity() => SecretErrorKind::Integrity,
            OpError::Keystore(KeystoreError::Io(_)) | OpError::Io(_) => SecretErrorKind::Filesystem,
            OpError::Keystore(_) | OpError::Message(_) => SecretErrorKind::Other,
        }
    }
}

/// Audit a failed operation and convert it to the public error shape.
pub(crate) fn audited(
    operation: &str,
    key: Option<&str>,
    store_name: Option<&str>,
    err: &OpError,
) -> SecretsError {
    let id = armature_error::audit::secret_operation_error(operation, key, store_name, err);
    SecretsError::Operation {
        operation: operation.to_string(),
        kind: err.kind(),
        id,
    }
}
