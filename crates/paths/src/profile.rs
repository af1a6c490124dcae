//! Resolution inputs

use armature_system::RunMode;

/// Host OS flavour, overridable for tests and cross-layout tooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsFlavor {
    /// Microsoft Windows.
    Windows,
    /// Apple macOS.
    MacOs,
    /// Linux.
    Linux,
    /// Anything else: falls back to CWD-relative locations.
    Other,
}

impl OsFlavor {
    /// Flavour of the compilation target.
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            OsFlavor::Windows
        } else if cfg!(target_os = "macos") {
            OsFlavor::MacOs
        } else if cfg!(target_os = "linux") {
            OsFlavor::Linux
        } else {
            OsFlavor::Other
        }
    }
}

/// Everything path resolution depends on.
///
/// Resolution is a pure function of this profile plus the environment
/// snapshot at call time.
#[derive(Debug, Clone)]
pub struct PathProfile {
    /// Application short name; participates in every constructed path.
    pub app_short_name: String,
    /// Run mode (dev / container / production).
    pub run_mode: RunMode,
    /// Host OS flavour.
    pub os: OsFlavor,
    /// Whether this process is a spawned worker.
    pub spawned: bool,
    /// Worker id, suffixed onto the temp path when spawned.
    pub worker_id: Option<String>,
    /// Create directories during initialisation.
    pub auto_create: bool,
    /// Delete the temp tree before creating it.
    pub clean_temp: bool,
}

impl PathProfile {
    /// Profile for a main process with detected run mode and OS.
    pub fn new(app_short_name: impl Into<String>) -> Self {
        Self {
            app_short_name: app_short_name.into(),
            run_mode: RunMode::detect(),
            os: OsFlavor::current(),
            spawned: false,
            worker_id: None,
            auto_create: true,
            clean_temp: true,
        }
    }

    /// Profile for a spawned worker: same layout, worker-suffixed temp, no
    /// temp cleaning (the parent owns the shared tree).
    pub fn for_worker(app_short_name: impl Into<String>, worker_id: impl Into<String>) -> Self {
        Self {
            spawned: true,
            worker_id: Some(worker_id.into()),
            clean_temp: false,
            ..Self::new(app_short_name)
        }
    }

    /// Override the run mode.
    pub fn with_run_mode(mut self, run_mode: RunMode) -> Self {
        self.run_mode = run_mode;
        self
    }

    /// Override the OS flavour.
    pub fn with_os(mut self, os: OsFlavor) -> Self {
        self.os = os;
        self
    }

    /// Disable directory creation.
    pub fn without_auto_create(mut self) -> Self {
        self.auto_create = false;
        self
    }

    /// Disable temp cleaning.
    pub fn without_clean_temp(mut self) -> Self {
        self.clean_temp = false;
        self
    }
}
