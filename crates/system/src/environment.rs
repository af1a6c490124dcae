//! Container / VM / bare-metal classification

use crate::run_mode::RunMode;
use std::fmt;

/// What kind of host the process is running on. Feeds the fingerprint so a
/// keystore created in a container is never silently openable on the host
/// and vice versa.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvironmentKind {
    /// Containerised (docker, kubernetes, ...).
    Container,
    /// Virtual machine.
    Vm,
    /// Physical host.
    BareMetal,
}

impl EnvironmentKind {
    /// Classify the current host.
    pub fn detect() -> Self {
        if RunMode::container_markers_present() {
            return EnvironmentKind::Container;
        }
        if cpuinfo_names_hypervisor() {
            return EnvironmentKind::Vm;
        }
        EnvironmentKind::BareMetal
    }

    /// Tag used inside the fingerprint string.
    pub fn tag(self) -> &'static str {
        match self {
            EnvironmentKind::Container => "container",
            EnvironmentKind::Vm => "vm",
            EnvironmentKind::BareMetal => "bare_metal",
        }
    }
}

impl fmt::Display for EnvironmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

fn cpuinfo_names_hypervisor() -> bool {
    const MARKERS: &[&str] = &["hypervisor", "vmware", "virtualbox", "xen", "kvm"];
    std::fs::read_to_string("/proc/cpuinfo")
        .map(|content| {
            let content = content.to_lowercase();
            MARKERS.iter().any(|marker| content.contains(marker))
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_are_stable() {
        assert_eq!(EnvironmentKind::Container.tag(), "container");
        assert_eq!(EnvironmentKind::Vm.tag(), "vm");
        assert_eq!(EnvironmentKind::BareMetal.tag(), "bare_metal");
    }

    #[test]
    fn detect_returns_some_classification() {
        // Value depends on the host; only the call contract is testable.
        let kind = EnvironmentKind::detect();
        assert!(!kind.tag().is_empty());
    }
}
