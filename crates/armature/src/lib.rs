//! # Armature
//!
//! Cross-platform application runtime core. An application declares its
//! identity, boots an [`AppContext`], and receives:
//!
//! - a layered configuration store merging several `config.yaml` files by
//!   priority, hot-reloaded on change, with `ENV/`, `SEC/`, `<USR>` and
//!   `<APP>` alias rewriting;
//! - a hierarchy of secret stores: two local password-protected,
//!   HMAC-authenticated keystores (safe for concurrent multi-process use
//!   through file locking) plus optional cloud-backed stores behind a
//!   capability trait;
//! - an on-disk layout adapted to the host OS, development mode, container
//!   mode and spawned worker processes;
//! - a worker-job facility whose child processes re-initialise the same
//!   stack against the same keystore files.
//!
//! ```no_run
//! use armature::prelude::*;
//!
//! fn main() -> Result<(), armature::AppError> {
//!     let identity = AppIdentity::new("myapp", "My Application", "1.0.0", "Demo");
//!     let ctx = AppContext::initialise(identity, BootOptions::default())?;
//!
//!     ctx.set_secret("api_key", "k1")?;
//!     let timeout = ctx.get_secret("request_timeout", Some("30"));
//!     println!("ready (timeout {timeout:?})");
//!     Ok(())
//! }
//! ```

pub use armature_app::{
    install_signal_handlers, run_worker_if_spawned, wait_for_shutdown, AppContext, AppError,
    AppIdentity, BootOptions, Job, ShutdownFlag, WorkerContext, WorkerCoordinator, WorkerEnv,
    CMD_CLOSE,
};
pub use armature_error::ErrorId;
pub use armature_keystore::{Keystore, KeystoreError};
pub use armature_paths::{
    ApplicationPaths, OsFlavor, PathKind, PathProfile, Paths, ResourceResolver,
};
pub use armature_secrets::{
    CloudStoreConfig, CloudStoreRegistry, LocalSecretStore, SecretComplexity, SecretManager,
    SecretStore, SecretsError, APP_LOCAL_STORE, USER_LOCAL_STORE,
};
pub use armature_settings::{Settings, SettingsError, SettingsReader, SettingsScope};
pub use armature_system::{EnvironmentKind, RunMode, SystemFingerprint};

/// Re-export of the logging bootstrap.
pub mod log {
    pub use armature_log::{auto_init, init_app, init_with, Config, LoggerGuard};
}

/// Re-export of the input validators.
pub mod validator {
    pub use armature_validator::{
        validate_configuration_key, validate_file_path, validate_secret_key,
        validate_secret_value, validate_yaml_content, ValidationError,
    };
}

/// The usual imports for an application binary.
pub mod prelude {
    pub use crate::{
        AppContext, AppIdentity, BootOptions, RunMode, SecretManager, SecretStore, Settings,
        ShutdownFlag,
    };
}
