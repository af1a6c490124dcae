//! Stable per-OS machine identifier

#[allow(unused_imports)]
use crate::{read_trimmed, run_cmd};
#[allow(unused_imports)]
use std::path::Path;

/// The machine's stable identifier, or `None` when the host offers none.
///
/// Sources, per OS:
/// - Linux: `/var/lib/dbus/machine-id`, then `/etc/machine-id`
/// - macOS: `IOPlatformUUID` via `ioreg`
/// - Windows: `Win32_ComputerSystemProduct` UUID via powershell
/// - OpenBSD / FreeBSD: `/etc/hostid`, then `kenv smbios.system.uuid`
///
/// Both the current keystore fingerprint and the legacy password derivation
/// consume this value, so the source order must stay stable.
pub fn machine_id() -> Option<String> {
    #[cfg(target_os = "linux")]
    {
        linux_machine_id()
    }
    #[cfg(target_os = "macos")]
    {
        macos_machine_id()
    }
    #[cfg(target_os = "windows")]
    {
        windows_machine_id()
    }
    #[cfg(any(target_os = "freebsd", target_os = "openbsd"))]
    {
        bsd_machine_id()
    }
    #[cfg(not(any(
        target_os = "linux",
        target_os = "macos",
        target_os = "windows",
        target_os = "freebsd",
        target_os = "openbsd"
    )))]
    {
        None
    }
}

#[cfg(target_os = "linux")]
fn linux_machine_id() -> Option<String> {
    for path in ["/var/lib/dbus/machine-id", "/etc/machine-id"] {
        if let Some(id) = read_trimmed(Path::new(path)) {
            if !id.is_empty() {
                return Some(id);
            }
        }
    }
    None
}

#[cfg(target_os = "macos")]
fn macos_machine_id() -> Option<String> {
    let output = run_cmd("ioreg", &["-d2", "-c", "IOPlatformExpertDevice"])?;
    output
        .lines()
        .find(|line| line.contains("IOPlatformUUID"))
        .and_then(|line| line.split('"').nth(3))
        .map(|uuid| uuid.trim().to_string())
        .filter(|uuid| !uuid.is_empty())
}

#[cfg(target_os = "windows")]
fn windows_machine_id() -> Option<String> {
    run_cmd(
        "powershell",
        &[
            "-Command",
            "Get-CimInstance -Class Win32_ComputerSystemProduct | Select-Object -ExpandProperty UUID",
        ],
    )
    .map(|id| id.trim().to_string())
    .filter(|id| !id.is_empty())
}

#[cfg(any(target_os = "freebsd", target_os = "openbsd"))]
fn bsd_machine_id() -> Option<String> {
    read_trimmed(Path::new("/etc/hostid"))
        .filter(|id| !id.is_empty())
        .or_else(|| run_cmd("kenv", &["-q", "smbios.system.uuid"]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn machine_id_is_stable_within_a_process() {
        // Two reads must agree: this is the property the fingerprint and the
        // legacy password derivation both rely on.
        assert_eq!(machine_id(), machine_id());
    }
}
