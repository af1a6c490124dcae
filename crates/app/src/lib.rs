//! # Armature application runtime
//!
//! Ties the stack together:
//!
//! - [`AppIdentity`] — who the application says it is;
//! - [`AppContext`] — the value built once at boot holding paths, settings
//!   and secrets, passed explicitly to everything that needs them;
//! - [`WorkerCoordinator`] / [`Job`] — pools of worker *processes* that
//!   re-initialise the same stack against the same keystore files, with a
//!   per-worker control channel for cooperative shutdown;
//! - [`ShutdownFlag`] and signal wiring — SIGINT/SIGTERM clear the running
//!   flag, the main loop polls it and runs the exit callback.
//!
//! ```no_run
//! use armature_app::{AppContext, AppIdentity, BootOptions};
//!
//! fn main() -> Result<(), armature_app::AppError> {
//!     let identity = AppIdentity::new("myapp", "My Application", "1.2.0", "Example");
//!
//!     // Worker processes re-enter main; route them to their job first.
//!     if let Some(code) = armature_app::run_worker_if_spawned(&identity, |ctx| {
//!         tracing::info!("worker {} online", ctx.worker_id());
//!     })? {
//!         std::process::exit(code);
//!     }
//!
//!     let ctx = AppContext::initialise(identity, BootOptions::default())?;
//!     tracing::info!("booted; data in {}", ctx.paths().usr_data().display());
//!     Ok(())
//! }
//! ```

mod context;
mod error;
mod identity;
mod shutdown;
mod worker;

pub use context::{AppContext, BootOptions};
pub use error::AppError;
pub use identity::AppIdentity;
pub use shutdown::{install_signal_handlers, wait_for_shutdown, ShutdownFlag};
pub use worker::{
    run_worker_if_spawned, Job, WorkerContext, WorkerCoordinator, WorkerEnv, CMD_CLOSE,
};
