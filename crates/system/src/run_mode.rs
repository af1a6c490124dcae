//! Run mode detection

use crate::env_flag;
use std::fmt;
use std::path::Path;

/// How the process was launched. Decided once at startup; everything
/// downstream (paths, keystore passwords, settings layering) keys off it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunMode {
    /// Developer layout: everything under the current working directory.
    Dev,
    /// Container layout: persistent state under the CWD, keystore password
    /// from the environment.
    Container,
    /// Installed layout per the host OS conventions.
    Production,
}

impl RunMode {
    /// Detect the run mode from the environment.
    ///
    /// CONTAINER wins when the `CONTAINER_MODE` flag is truthy, a container
    /// marker file exists, or an orchestrator variable is set. DEV wins next
    /// on a truthy `DEV_MODE`. Everything else is PRODUCTION.
    pub fn detect() -> Self {
        if env_flag("CONTAINER_MODE") || Self::container_markers_present() {
            RunMode::Container
        } else if env_flag("DEV_MODE") {
            RunMode::Dev
        } else {
            RunMode::Production
        }
    }

    /// True when the surrounding environment looks like a container even
    /// without the explicit flag.
    pub fn container_markers_present() -> bool {
        if Path::new("/.dockerenv").exists() {
            return true;
        }
        if std::env::var_os("KUBERNETES_SERVICE_HOST").is_some()
            || std::env::var_os("container").is_some()
        {
            return true;
        }
        cgroup_names_container()
    }

    /// Whether this mode is [`RunMode::Container`].
    pub fn is_container(self) -> bool {
        self == RunMode::Container
    }

    /// Whether this mode is [`RunMode::Dev`].
    pub fn is_dev(self) -> bool {
        self == RunMode::Dev
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            RunMode::Dev => "DEV",
            RunMode::Container => "CONTAINER",
            RunMode::Production => "PRODUCTION",
        };
        f.write_str(text)
    }
}

fn cgroup_names_container() -> bool {
    std::fs::read_to_string("/proc/1/cgroup")
        .map(|content| content.contains("docker") || content.contains("kubepods"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_canonical_names() {
        assert_eq!(RunMode::Dev.to_string(), "DEV");
        assert_eq!(RunMode::Container.to_string(), "CONTAINER");
        assert_eq!(RunMode::Production.to_string(), "PRODUCTION");
    }

    #[test]
    fn predicates() {
        assert!(RunMode::Container.is_container());
        assert!(!RunMode::Production.is_container());
        assert!(RunMode::Dev.is_dev());
    }
}
