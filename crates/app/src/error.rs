//! Runtime bootstrap failures

use thiserror::Error;

/// Failures raised while booting the context or managing workers.
#[derive(Debug, Error)]
pub enum AppError {
    /// Filesystem or process-spawn failure.
    #[error("runtime I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The logging stack refused to initialise.
    #[error("logging initialisation failed: {0}")]
    Logging(String),

    /// The secret stores refused to open.
    #[error(transparent)]
    Secrets(#[from] armature_secrets::SecretsError),

    /// The settings layer failed.
    #[error(transparent)]
    Settings(#[from] armature_settings::SettingsError),

    /// The current executable could not be determined for worker spawning.
    #[error("cannot locate current executable for worker spawn: {0}")]
    NoExecutable(String),
}
