//! # Armature logging
//!
//! Zero-surprise `tracing` bootstrap for the runtime and its worker
//! processes:
//!
//! - console + one application log file per process;
//! - a dedicated `security_audit.log` that receives *only* the
//!   `audit::security` target, which in turn never reaches the console or
//!   application file;
//! - worker processes log under `<parent_log>/job-<job>/<worker>/`.
//!
//! ```no_run
//! fn main() -> armature_log::Result<()> {
//!     let _guard = armature_log::auto_init()?;
//!     tracing::info!(port = 8080, "starting");
//!     Ok(())
//! }
//! ```

mod builder;
mod config;

pub use builder::{LoggerBuilder, LoggerGuard};
pub use config::{Config, Format};

use std::path::{Path, PathBuf};

/// Result type for logger bootstrap.
pub type Result<T> = anyhow::Result<T>;

// Re-export tracing macros so callers need only this crate.
pub use tracing::{debug, error, info, instrument, span, trace, warn};

/// Auto-detect and initialise a console-only configuration.
///
/// Honours `ARMATURE_LOG` / `RUST_LOG`; falls back to a development profile
/// in debug builds and a production profile otherwise.
pub fn auto_init() -> Result<LoggerGuard> {
    if std::env::var("ARMATURE_LOG").is_ok() || std::env::var("RUST_LOG").is_ok() {
        init_with(Config::from_env())
    } else if cfg!(debug_assertions) {
        init_with(Config::development())
    } else {
        init_with(Config::production())
    }
}

/// Initialise with an explicit configuration.
pub fn init_with(config: Config) -> Result<LoggerGuard> {
    LoggerBuilder::from_config(config).build()
}

/// Initialise logging for an application process under its resolved logging
/// root.
///
/// For spawned workers pass the job and worker ids; the sink directory then
/// becomes `<log_root>/job-<job_id>/<worker_id>`. Returns the guard and the
/// directory actually used (callers place `stdout.txt` captures next to it).
pub fn init_app(
    log_root: &Path,
    file_prefix: &str,
    console: bool,
    worker: Option<(&str, &str)>,
) -> Result<(LoggerGuard, PathBuf)> {
    let dir = match worker {
        Some((job_id, worker_id)) => log_root.join(format!("job-{job_id}")).join(worker_id),
        None => log_root.to_path_buf(),
    };
    std::fs::create_dir_all(&dir)?;

    let mut config = Config::from_env();
    config.console = console;
    config.dir = Some(dir.clone());
    config.file_prefix = file_prefix.to_string();

    let guard = init_with(config)?;
    Ok((guard, dir))
}
