//! The application context
//!
//! One value built at boot — paths, logging, settings, secrets — passed
//! explicitly to whatever needs it. Spawned workers build their own with
//! the same recipe; nothing is shared between processes except the keystore
//! files themselves.

use crate::error::AppError;
use crate::identity::AppIdentity;
use crate::shutdown::{install_signal_handlers, ShutdownFlag};
use crate::worker::{WorkerCoordinator, WorkerEnv};
use armature_log::LoggerGuard;
use armature_paths::{ApplicationPaths, PathProfile, Paths};
use armature_secrets::{CloudStoreConfig, CloudStoreRegistry, SecretManager};
use armature_settings::Settings;
use armature_system::RunMode;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Boot-time knobs.
#[derive(Default)]
pub struct BootOptions {
    /// Console application: keep console logging on.
    pub console: bool,
    /// Explicit keystore password (otherwise environment/machine-bound).
    pub password: Option<String>,
    /// Factories for the cloud stores configuration may declare.
    pub cloud_registry: Option<CloudStoreRegistry>,
    /// Route SIGINT/SIGTERM into the running flag.
    pub handle_signals: bool,
}

impl std::fmt::Debug for BootOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BootOptions")
            .field("console", &self.console)
            .field("password_set", &self.password.is_some())
            .field("cloud_registry", &self.cloud_registry.is_some())
            .field("handle_signals", &self.handle_signals)
            .finish()
    }
}

/// Everything a configured process knows about itself.
pub struct AppContext {
    identity: AppIdentity,
    run_mode: RunMode,
    paths: ApplicationPaths,
    settings: Settings,
    secrets: Arc<SecretManager>,
    log_path: PathBuf,
    running: ShutdownFlag,
    _log_guard: LoggerGuard,
}

impl AppContext {
    /// Boot a main process: run mode, paths, logging, settings, secrets,
    /// cloud stores, startup header.
    pub fn initialise(identity: AppIdentity, options: BootOptions) -> Result<Self, AppError> {
        let run_mode = RunMode::detect();
        let profile = PathProfile::new(&identity.short_name).with_run_mode(run_mode);
        let paths = ApplicationPaths::initialise(profile);

        let (log_guard, log_path) =
            armature_log::init_app(paths.logging(), &identity.short_name, options.console, None)
                .map_err(|err| AppError::Logging(err.to_string()))?;

        let context = Self::assemble(
            identity, run_mode, paths, options, log_guard, log_path,
        )?;

        let header = format!(
            "{} ({}), Version: {}. Process ID: {}",
            context.identity.full_name,
            context.identity.short_name,
            context.identity.version,
            std::process::id()
        );
        tracing::info!("{header}");
        println!("{header}");
        println!("Log Path: {}", context.log_path.display());
        context.paths.log_paths();

        Ok(context)
    }

    /// Boot a spawned worker against the parent's log tree.
    ///
    /// Paths are recomputed with the worker id, the settings and secret
    /// stacks are rebuilt from scratch, and logging lands under
    /// `<parent_log>/job-<job>/<worker>`.
    pub fn initialise_spawned(
        identity: AppIdentity,
        env: &WorkerEnv,
        options: BootOptions,
    ) -> Result<Self, AppError> {
        let run_mode = RunMode::detect();
        let profile = PathProfile::for_worker(&identity.short_name, &env.worker_id)
            .with_run_mode(run_mode);
        let paths = ApplicationPaths::initialise(profile);

        let (log_guard, log_path) = armature_log::init_app(
            &env.parent_log_path,
            &identity.short_name,
            options.console,
            Some((&env.job_id, &env.worker_id)),
        )
        .map_err(|err| AppError::Logging(err.to_string()))?;

        Self::assemble(identity, run_mode, paths, options, log_guard, log_path)
    }

    fn assemble(
        identity: AppIdentity,
        run_mode: RunMode,
        paths: ApplicationPaths,
        options: BootOptions,
        log_guard: LoggerGuard,
        log_path: PathBuf,
    ) -> Result<Self, AppError> {
        let mut settings = Settings::initialise(paths.paths(), run_mode.is_container());

        let mut secrets =
            SecretManager::new(paths.paths(), &identity.short_name, options.password.clone())?;
        if let Some(registry) = &options.cloud_registry {
            let subtree = settings
                .get("secrets_manager.cloud_stores")
                .unwrap_or(Value::Null);
            let configs = CloudStoreConfig::parse_all(&subtree);
            secrets.load_cloud_stores(configs, registry);
        }

        let secrets = Arc::new(secrets);
        settings.attach_secret_manager(Arc::clone(&secrets));

        let running = ShutdownFlag::new();
        if options.handle_signals {
            install_signal_handlers(&running);
        }

        Ok(Self {
            identity,
            run_mode,
            paths,
            settings,
            secrets,
            log_path,
            running,
            _log_guard: log_guard,
        })
    }

    /// The application identity.
    pub fn identity(&self) -> &AppIdentity {
        &self.identity
    }

    /// The run mode decided at boot.
    pub fn run_mode(&self) -> RunMode {
        self.run_mode
    }

    /// The resolved paths.
    pub fn paths(&self) -> &ApplicationPaths {
        &self.paths
    }

    /// The raw paths record.
    pub fn paths_record(&self) -> &Paths {
        self.paths.paths()
    }

    /// The settings layer.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The secret manager.
    pub fn secrets(&self) -> &Arc<SecretManager> {
        &self.secrets
    }

    /// Directory this process logs into.
    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// The process-wide running flag.
    pub fn running(&self) -> &ShutdownFlag {
        &self.running
    }

    /// The configuration files in precedence order.
    pub fn config_file_paths(&self) -> Vec<PathBuf> {
        self.settings.config_file_paths()
    }

    /// Convenience: read a setting.
    pub fn get_setting(&self, key: &str) -> Option<Value> {
        self.settings.get(key)
    }

    /// Convenience: read a setting with a default.
    pub fn get_setting_or(&self, key: &str, default: Value) -> Value {
        self.settings.get_or(key, default)
    }

    /// Convenience: read a secret.
    pub fn get_secret(&self, key: &str, default: Option<&str>) -> Option<String> {
        self.secrets.get_secret(key, default, None).ok().flatten()
    }

    /// Convenience: store a secret in the user store.
    pub fn set_secret(&self, key: &str, value: &str) -> Result<(), AppError> {
        self.secrets.set_secret(key, value, None)?;
        Ok(())
    }

    /// A worker coordinator rooted at this process' log path.
    pub fn coordinator(&self) -> WorkerCoordinator {
        WorkerCoordinator::new(&self.log_path)
    }
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext")
            .field("identity", &self.identity)
            .field("run_mode", &self.run_mode)
            .field("log_path", &self.log_path)
            .finish_non_exhaustive()
    }
}
