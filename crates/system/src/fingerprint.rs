//! Machine fingerprint
//!
//! A deterministic, best-effort fingerprint of the host, consumed by the
//! keystore password derivation. Every gatherer catches its own failures and
//! contributes nothing rather than erroring; a degraded fingerprint is still
//! deterministic for this machine, which is all the defensive derivation
//! needs.

use crate::{hostname, run_cmd, EnvironmentKind};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::Path;
use std::sync::OnceLock;

/// Deterministic system fingerprint bound to one application name.
///
/// The hex digest is computed once per instance and cached.
///
/// ```
/// use armature_system::SystemFingerprint;
///
/// let fp = SystemFingerprint::new("myapp");
/// assert_eq!(fp.hex(), fp.hex());
/// assert_eq!(fp.hex().len(), 64);
/// ```
pub struct SystemFingerprint {
    app_name: String,
    cached: OnceLock<String>,
}

impl SystemFingerprint {
    /// Create a fingerprint generator for the given application name.
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            cached: OnceLock::new(),
        }
    }

    /// SHA-256 hex digest of the joined component list.
    pub fn hex(&self) -> &str {
        self.cached.get_or_init(|| {
            let components = self.collect();
            let joined = components
                .iter()
                .filter(|c| !c.is_empty())
                .cloned()
                .collect::<Vec<_>>()
                .join(":");
            hex::encode(Sha256::digest(joined.as_bytes()))
        })
    }

    fn collect(&self) -> Vec<String> {
        let mut components = platform_components();

        components.push(hostname());
        if let Some(iface) = default_interface() {
            components.push(iface);
        } else {
            components.push("unknown_network".to_string());
        }

        let env_kind = EnvironmentKind::detect();
        components.push(env_kind.tag().to_string());
        if env_kind == EnvironmentKind::Container {
            components.extend(container_components());
        } else {
            components.extend(hardware_components());
        }

        components.extend(filesystem_components());
        components.push(self.app_name.clone());

        tracing::debug!(count = components.len(), "collected fingerprint components");
        components
    }
}

impl fmt::Debug for SystemFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemFingerprint")
            .field("app_name", &self.app_name)
            .finish_non_exhaustive()
    }
}

fn platform_components() -> Vec<String> {
    vec![
        std::env::consts::OS.to_string(),
        os_release().unwrap_or_else(|| "unknown_release".to_string()),
        std::env::consts::ARCH.to_string(),
        cpu_model().unwrap_or_else(|| "unknown_processor".to_string()),
    ]
}

fn os_release() -> Option<String> {
    crate::read_trimmed(Path::new("/proc/sys/kernel/osrelease")).filter(|s| !s.is_empty())
}

/// Interface carrying the default route, from `/proc/net/route`.
fn default_interface() -> Option<String> {
    let table = std::fs::read_to_string("/proc/net/route").ok()?;
    for line in table.lines().skip(1) {
        let mut fields = line.split_whitespace();
        let iface = fields.next()?;
        let destination = fields.next()?;
        if destination == "00000000" {
            return Some(iface.to_string());
        }
    }
    None
}

fn container_components() -> Vec<String> {
    let mut components = Vec::new();

    if let Ok(cgroup) = std::fs::read_to_string("/proc/self/cgroup") {
        components.push(hex::encode(Sha256::digest(cgroup.as_bytes()))[..16].to_string());
    }
    if let Ok(mount_ns) = std::fs::read_link("/proc/self/ns/mnt") {
        components.push(mount_ns.to_string_lossy().into_owned());
    }
    for var in ["HOSTNAME", "PATH", "HOME"] {
        if let Ok(value) = std::env::var(var) {
            components.push(format!("{var}={value}"));
        }
    }

    components
}

fn hardware_components() -> Vec<String> {
    let mut components = Vec::new();
    components.extend(cpu_components());
    components.extend(memory_components());
    components.extend(dmi_components());
    if let Some(mac) = primary_mac() {
        components.push(format!("mac={mac}"));
    }
    components
}

fn cpu_components() -> Vec<String> {
    let mut components = Vec::new();
    if let Ok(cpuinfo) = std::fs::read_to_string("/proc/cpuinfo") {
        for line in cpuinfo.lines() {
            if line.starts_with("processor") && line.contains('0') {
                components.push(line.trim().to_string());
            } else if line.starts_with("model name") {
                components.push(line.trim().to_string());
                break;
            }
        }
    }
    components
}

fn cpu_model() -> Option<String> {
    let cpuinfo = std::fs::read_to_string("/proc/cpuinfo").ok()?;
    cpuinfo
        .lines()
        .find(|line| line.starts_with("model name"))
        .and_then(|line| line.split(':').nth(1))
        .map(|model| model.trim().to_string())
}

fn memory_components() -> Vec<String> {
    std::fs::read_to_string("/proc/meminfo")
        .ok()
        .and_then(|meminfo| {
            meminfo
                .lines()
                .take(3)
                .find(|line| line.starts_with("MemTotal"))
                .map(|line| vec![line.trim().to_string()])
        })
        .unwrap_or_default()
}

fn dmi_components() -> Vec<String> {
    const DMI_PATHS: &[&str] = &[
        "/sys/class/dmi/id/product_uuid",
        "/sys/class/dmi/id/board_serial",
        "/sys/class/dmi/id/chassis_serial",
    ];

    let mut components = Vec::new();
    for path in DMI_PATHS {
        let path = Path::new(path);
        if let Some(value) = crate::read_trimmed(path) {
            if !value.is_empty() && value != "To be filled by O.E.M." {
                let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
                components.push(format!("{name}={value}"));
            }
        }
    }
    components
}

/// MAC address of the first physical-looking interface.
///
/// The address is read twice and accepted only when both reads agree, so a
/// randomised or flapping address can never enter the fingerprint.
pub fn primary_mac() -> Option<String> {
    let first = read_primary_mac()?;
    let second = read_primary_mac()?;
    (first == second).then_some(first)
}

fn read_primary_mac() -> Option<String> {
    let entries = std::fs::read_dir("/sys/class/net").ok()?;
    let mut names: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .filter(|name| {
            name.starts_with("eth") || name.starts_with("en") || name.starts_with("wlan")
        })
        .collect();
    names.sort();

    for name in names {
        let address_path = format!("/sys/class/net/{name}/address");
        if let Some(mac) = crate::read_trimmed(Path::new(&address_path)) {
            if !mac.is_empty() && mac != "00:00:00:00:00:00" {
                return Some(mac);
            }
        }
    }
    None
}

/// Primary MAC as an integer node id, `0` when the host exposes none.
///
/// Feeds the installation salt of the user-password derivation; determinism
/// matters more than presence, hence the zero fallback.
pub fn hardware_node_id() -> u64 {
    primary_mac()
        .map(|mac| {
            mac.split(':')
                .filter_map(|octet| u8::from_str_radix(octet, 16).ok())
                .fold(0u64, |acc, octet| (acc << 8) | u64::from(octet))
        })
        .unwrap_or(0)
}

fn filesystem_components() -> Vec<String> {
    let mut components = Vec::new();

    if let Some(uuid) = run_cmd("blkid", &["-o", "value", "-s", "UUID", "/dev/root"]) {
        components.push(format!("root_uuid={uuid}"));
    }

    if let Ok(stat) = std::fs::read_to_string("/proc/stat") {
        if let Some(boot_time) = stat
            .lines()
            .find(|line| line.starts_with("btime"))
            .and_then(|line| line.split_whitespace().nth(1))
            .and_then(|value| value.parse::<u64>().ok())
        {
            // Day-relative so the component survives reboots within a day
            // window without pinning an exact timestamp.
            components.push(format!("boot_ref={}", boot_time % 86_400));
        }
    }

    #[cfg(unix)]
    if let Ok(exe) = std::env::current_exe() {
        use std::os::unix::fs::MetadataExt;
        if let Some(meta) = exe.parent().and_then(|dir| dir.metadata().ok()) {
            components.push(format!("app_dir_inode={}", meta.ino()));
        }
    }

    components
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn digest_is_cached_and_stable() {
        let fp = SystemFingerprint::new("testapp");
        let first = fp.hex().to_string();
        assert_eq!(fp.hex(), first);
        assert_eq!(first.len(), 64);
    }

    #[test]
    fn digest_depends_on_app_name() {
        let a = SystemFingerprint::new("app-a").hex().to_string();
        let b = SystemFingerprint::new("app-b").hex().to_string();
        assert_ne!(a, b);
    }

    #[test]
    fn node_id_is_deterministic() {
        assert_eq!(hardware_node_id(), hardware_node_id());
    }
}
