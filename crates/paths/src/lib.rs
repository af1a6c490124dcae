//! # Armature application paths
//!
//! Computes where an application keeps its state — logging, app-wide data,
//! per-user data and temp — from the host OS, the run mode and the process'
//! role (main or spawned worker), then creates the directories with
//! soft-failure semantics: a directory that cannot be created is a recorded
//! warning, not an error, and the application continues with reduced
//! functionality.
//!
//! After resolution the four locations are exported as `dt_LOGGING_PATH`,
//! `dt_APP_DATA`, `dt_USR_DATA` and `dt_TMP` so external tooling observes
//! the same decisions.
//!
//! ```no_run
//! use armature_paths::{ApplicationPaths, PathProfile};
//!
//! let paths = ApplicationPaths::initialise(PathProfile::new("myapp"));
//! println!("logs in {}", paths.logging().display());
//! ```

mod profile;
mod resolve;
mod resources;

pub use profile::{OsFlavor, PathProfile};
pub use resolve::container_identifier;
pub use resources::ResourceResolver;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The four resolved locations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    /// Log files root.
    pub logging: PathBuf,
    /// System-wide / all-users application data.
    pub app_data: PathBuf,
    /// Current-user application data.
    pub usr_data: PathBuf,
    /// Temporary files root (per-worker when spawned).
    pub tmp: PathBuf,
}

impl Paths {
    /// Pure resolution from a profile and the current environment.
    pub fn resolve(profile: &PathProfile) -> Self {
        resolve::resolve(profile)
    }
}

/// Names of the four locations, used for status reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PathKind {
    /// Log root.
    Logging,
    /// App-wide data root.
    AppData,
    /// Per-user data root.
    UsrData,
    /// Temp root.
    Tmp,
}

impl PathKind {
    fn label(self) -> &'static str {
        match self {
            PathKind::Logging => "logging",
            PathKind::AppData => "app_data",
            PathKind::UsrData => "usr_data",
            PathKind::Tmp => "tmp",
        }
    }
}

/// Resolved paths plus directory lifecycle management.
#[derive(Debug)]
pub struct ApplicationPaths {
    profile: PathProfile,
    paths: Paths,
    creation_status: HashMap<PathKind, bool>,
}

impl ApplicationPaths {
    /// Resolve paths, export the `dt_*` variables, then (per the profile)
    /// clean the temp tree and create the directories.
    pub fn initialise(profile: PathProfile) -> Self {
        let paths = Paths::resolve(&profile);
        export_env(&paths);

        let mut this = Self {
            profile,
            paths,
            creation_status: HashMap::new(),
        };

        if this.profile.clean_temp {
            this.clean_tmp();
        }
        if this.profile.auto_create {
            this.ensure();
        }
        this
    }

    /// Resolve without touching the filesystem.
    pub fn resolve_only(profile: PathProfile) -> Self {
        let paths = Paths::resolve(&profile);
        export_env(&paths);
        Self {
            profile,
            paths,
            creation_status: HashMap::new(),
        }
    }

    /// Attempt to create every directory, recording success per path.
    ///
    /// Failures are warnings: the status map records them and the caller is
    /// expected to degrade rather than abort. Idempotent.
    pub fn ensure(&mut self) {
        let entries = [
            (PathKind::Tmp, self.paths.tmp.clone()),
            (PathKind::Logging, self.paths.logging.clone()),
            (PathKind::UsrData, self.paths.usr_data.clone()),
            (PathKind::AppData, self.paths.app_data.clone()),
        ];
        for (kind, path) in entries {
            let created = match std::fs::create_dir_all(&path) {
                Ok(()) => true,
                Err(err) => {
                    tracing::warn!(
                        "could not create {} directory {:?}: {err}; \
                         functionality depending on this path may be unavailable",
                        kind.label(),
                        path,
                    );
                    false
                }
            };
            self.creation_status.insert(kind, created);
        }
    }

    /// Whether a directory was created successfully. `None` until
    /// [`ApplicationPaths::ensure`] has run.
    pub fn is_available(&self, kind: PathKind) -> Option<bool> {
        self.creation_status.get(&kind).copied()
    }

    /// Best-effort recursive delete of the temp tree. Failure is logged and
    /// ignored.
    pub fn clean_tmp(&self) {
        if self.paths.tmp.exists() {
            if let Err(err) = std::fs::remove_dir_all(&self.paths.tmp) {
                tracing::warn!("could not clean temporary directory {:?}: {err}", self.paths.tmp);
            }
        }
    }

    /// Info-log all four roots.
    pub fn log_paths(&self) {
        tracing::info!("Logging Root Path: {}", self.paths.logging.display());
        tracing::info!("Application Data Root Path: {}", self.paths.app_data.display());
        tracing::info!("User Data Root Path: {}", self.paths.usr_data.display());
        tracing::info!("Temp Root Path: {}", self.paths.tmp.display());
    }

    /// The resolved locations.
    pub fn paths(&self) -> &Paths {
        &self.paths
    }

    /// The profile this resolution was computed from.
    pub fn profile(&self) -> &PathProfile {
        &self.profile
    }

    /// Log root.
    pub fn logging(&self) -> &Path {
        &self.paths.logging
    }

    /// App-wide data root.
    pub fn app_data(&self) -> &Path {
        &self.paths.app_data
    }

    /// Per-user data root.
    pub fn usr_data(&self) -> &Path {
        &self.paths.usr_data
    }

    /// Temp root.
    pub fn tmp(&self) -> &Path {
        &self.paths.tmp
    }
}

fn export_env(paths: &Paths) {
    // SAFETY: called during single-threaded process startup, before any
    // thread that reads the environment is spawned.
    unsafe {
        std::env::set_var("dt_LOGGING_PATH", &paths.logging);
        std::env::set_var("dt_APP_DATA", &paths.app_data);
        std::env::set_var("dt_USR_DATA", &paths.usr_data);
        std::env::set_var("dt_TMP", &paths.tmp);
    }
}
