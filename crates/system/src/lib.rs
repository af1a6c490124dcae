//! # Armature host environment
//!
//! Read-only facts about the machine and the way the process was launched:
//!
//! - [`RunMode`] — DEV / CONTAINER / PRODUCTION, decided once at startup
//!   from environment flags and container markers.
//! - [`EnvironmentKind`] — container / VM / bare metal classification.
//! - [`machine_id`] — the per-OS stable machine identifier.
//! - [`SystemFingerprint`] — the best-effort, deterministic fingerprint the
//!   keystore password derivation is bound to.
//!
//! Everything here is collection, not policy: gatherers swallow their own
//! errors and return what they could find. The one hard failure in the
//! subsystem (a missing machine id when the legacy keystore password is
//! requested) is raised by the keystore crate, not here.

mod environment;
pub mod fingerprint;
mod machine_id;
mod run_mode;

pub use environment::EnvironmentKind;
pub use fingerprint::SystemFingerprint;
pub use machine_id::machine_id;
pub use run_mode::RunMode;

use std::path::Path;

/// Truthy parsing for environment flags: `1`, `true`, `yes`, `on`
/// (case-insensitive).
pub fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

/// Kernel hostname, best effort.
///
/// Prefers the `HOSTNAME` environment variable (what container runtimes
/// set), then the kernel's own view, then `/etc/hostname`.
pub fn hostname() -> String {
    if let Ok(name) = std::env::var("HOSTNAME") {
        let name = name.trim().to_string();
        if !name.is_empty() {
            return name;
        }
    }
    for path in ["/proc/sys/kernel/hostname", "/etc/hostname"] {
        if let Some(name) = read_trimmed(Path::new(path)) {
            if !name.is_empty() {
                return name;
            }
        }
    }
    "localhost".to_string()
}

pub(crate) fn read_trimmed(path: &Path) -> Option<String> {
    std::fs::read_to_string(path).ok().map(|s| s.trim().to_string())
}

pub(crate) fn run_cmd(program: &str, args: &[&str]) -> Option<String> {
    let output = std::process::Command::new(program).args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if text.is_empty() { None } else { Some(text) }
}
