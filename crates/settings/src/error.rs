//! Settings failures

use thiserror::Error;

/// Failures surfaced by the settings layer.
///
/// Reload failures never appear here — a reader that fails to reload logs
/// the cause and keeps serving its previous snapshot.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Filesystem failure reading or writing a configuration file.
    #[error("settings I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A configuration file failed to parse.
    #[error("settings parse error: {0}")]
    Parse(String),

    /// Raw content failed structural validation (size, reference count).
    #[error(transparent)]
    Validation(#[from] armature_validator::ValidationError),

    /// An unrecognised persistence scope was named.
    #[error("the settings scope '{scope}' is not recognised")]
    UnknownScope {
        /// The offending scope name.
        scope: String,
    },

    /// The persistent-setting path failed in the secret store.
    #[error(transparent)]
    Secrets(#[from] armature_secrets::SecretsError),

    /// The file watcher could not be installed.
    #[error("settings watch error: {0}")]
    Watch(String),
}
