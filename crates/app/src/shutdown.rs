//! Cooperative shutdown
//!
//! One process-wide running flag: set at boot, cleared by SIGINT/SIGTERM or
//! an explicit close command. The main loop polls it at half-second
//! resolution and then runs the exit callback; nothing is force-killed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

// Poll interval of the shutdown wait loop.
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Shared running flag. Cleared means "shut down".
#[derive(Debug, Clone)]
pub struct ShutdownFlag(Arc<AtomicBool>);

impl ShutdownFlag {
    /// New flag in the running state.
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    /// Mark running.
    pub fn set(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Request shutdown.
    pub fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    /// Whether the process should keep running.
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

impl Default for ShutdownFlag {
    fn default() -> Self {
        Self::new()
    }
}

/// Route SIGINT and SIGTERM to the flag.
///
/// Installation can only happen once per process; a second call (worker
/// re-initialisation paths) logs and carries on.
pub fn install_signal_handlers(flag: &ShutdownFlag) {
    let flag = flag.clone();
    if let Err(err) = ctrlc::set_handler(move || {
        tracing::warn!("termination signal received; shutting down");
        flag.clear();
    }) {
        tracing::warn!("signal handler not installed: {err}");
    }
}

/// Block until the flag clears, then run the exit callback.
pub fn wait_for_shutdown(flag: &ShutdownFlag, exit_callback: Option<Box<dyn FnOnce()>>) {
    while flag.is_set() {
        std::thread::sleep(POLL_INTERVAL);
    }
    if let Some(callback) = exit_callback {
        callback();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn flag_transitions() {
        let flag = ShutdownFlag::new();
        assert!(flag.is_set());
        flag.clear();
        assert!(!flag.is_set());
        flag.set();
        assert!(flag.is_set());
    }

    #[test]
    fn clones_share_state() {
        let flag = ShutdownFlag::new();
        let other = flag.clone();
        other.clear();
        assert!(!flag.is_set());
    }

    #[test]
    fn wait_runs_the_exit_callback_after_clear() {
        let flag = ShutdownFlag::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let clearer = {
            let flag = flag.clone();
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(100));
                flag.clear();
            })
        };

        let counted = Arc::clone(&calls);
        wait_for_shutdown(
            &flag,
            Some(Box::new(move || {
                counted.fetch_add(1, Ordering::SeqCst);
            })),
        );

        clearer.join().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
