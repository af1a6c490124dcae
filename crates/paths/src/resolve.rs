//! Per-OS path rules

use crate::profile::{OsFlavor, PathProfile};
use crate::Paths;
use armature_system::RunMode;
use std::path::PathBuf;

pub(crate) fn resolve(profile: &PathProfile) -> Paths {
    let mut tmp = tmp_root(profile);
    if profile.spawned {
        if let Some(worker_id) = &profile.worker_id {
            tmp = tmp.join(worker_id);
        }
    }

    Paths {
        logging: logging_root(profile),
        app_data: app_data_root(profile),
        usr_data: usr_data_root(profile),
        tmp,
    }
}

/// Identifier for the current container instance.
///
/// Lookup order: `CONTAINER_NAME`, `POD_NAME`, `HOSTNAME`, then the kernel
/// hostname.
pub fn container_identifier() -> String {
    for var in ["CONTAINER_NAME", "POD_NAME", "HOSTNAME"] {
        if let Ok(value) = std::env::var(var) {
            let value = value.trim().to_string();
            if !value.is_empty() {
                return value;
            }
        }
    }
    armature_system::hostname()
}

fn cwd() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

fn home_dir() -> PathBuf {
    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().to_path_buf())
        .unwrap_or_else(cwd)
}

fn env_path(var: &str) -> Option<PathBuf> {
    std::env::var_os(var)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

#[cfg(unix)]
fn is_root() -> bool {
    // SAFETY: geteuid has no preconditions and cannot fail.
    (unsafe { libc::geteuid() }) == 0
}

#[cfg(not(unix))]
fn is_root() -> bool {
    false
}

fn logging_root(profile: &PathProfile) -> PathBuf {
    let app = &profile.app_short_name;
    match profile.run_mode {
        RunMode::Container => cwd().join("logs").join(container_identifier()),
        RunMode::Dev => cwd().join("logs"),
        RunMode::Production => match profile.os {
            OsFlavor::Windows => env_path("LOCALAPPDATA")
                .unwrap_or_else(cwd)
                .join(app)
                .join("logs"),
            OsFlavor::MacOs => home_dir().join("Library/Logs").join(app),
            OsFlavor::Linux => {
                if is_root() {
                    PathBuf::from("/var/log").join(app)
                } else {
                    env_path("XDG_STATE_HOME")
                        .unwrap_or_else(|| home_dir().join(".local/state"))
                        .join(app)
                        .join("log")
                }
            }
            OsFlavor::Other => cwd().join("logs"),
        },
    }
}

fn app_data_root(profile: &PathProfile) -> PathBuf {
    let app = &profile.app_short_name;
    match profile.run_mode {
        RunMode::Container => cwd().join("data"),
        RunMode::Dev => cwd().join("data").join("app"),
        RunMode::Production => match profile.os {
            OsFlavor::Windows => env_path("ALLUSERSPROFILE").unwrap_or_else(cwd).join(app),
            OsFlavor::MacOs => PathBuf::from("/Library/Application Support").join(app),
            OsFlavor::Linux => {
                if is_root() {
                    PathBuf::from("/var/lib").join(app)
                } else {
                    env_path("XDG_CONFIG_HOME")
                        .unwrap_or_else(|| home_dir().join(".config"))
                        .join(app)
                }
            }
            OsFlavor::Other => cwd().join("data").join("app"),
        },
    }
}

fn usr_data_root(profile: &PathProfile) -> PathBuf {
    let app = &profile.app_short_name;
    match profile.run_mode {
        RunMode::Container => cwd().join("data"),
        RunMode::Dev => cwd().join("data").join("usr"),
        RunMode::Production => match profile.os {
            OsFlavor::Windows => env_path("APPDATA").unwrap_or_else(cwd).join(app),
            OsFlavor::MacOs => home_dir().join("Library/Application Support").join(app),
            OsFlavor::Linux => {
                if is_root() {
                    // Service context: configuration lives under /etc.
                    PathBuf::from("/etc").join(app)
                } else {
                    env_path("XDG_DATA_HOME")
                        .unwrap_or_else(|| home_dir().join(".local/share"))
                        .join(app)
                }
            }
            OsFlavor::Other => cwd().join("data").join("usr"),
        },
    }
}

fn tmp_root(profile: &PathProfile) -> PathBuf {
    let app = &profile.app_short_name;
    match profile.run_mode {
        RunMode::Container => {
            let suffix = format!("{}_{}", container_identifier(), std::process::id());
            cwd().join("temp").join(suffix)
        }
        RunMode::Dev => cwd().join("temp"),
        RunMode::Production => match profile.os {
            OsFlavor::Windows => env_path("TEMP")
                .unwrap_or_else(std::env::temp_dir)
                .join(app),
            OsFlavor::MacOs | OsFlavor::Linux | OsFlavor::Other => std::env::temp_dir().join(app),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::{Mutex, MutexGuard};

    // Tests mutate process-wide environment variables; serialise them.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn env_guard() -> MutexGuard<'static, ()> {
        ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn set_env(key: &str, value: &str) {
        // SAFETY: guarded by ENV_LOCK, no concurrent readers in these tests.
        unsafe { std::env::set_var(key, value) }
    }

    fn remove_env(key: &str) {
        // SAFETY: guarded by ENV_LOCK, no concurrent readers in these tests.
        unsafe { std::env::remove_var(key) }
    }

    fn profile(run_mode: RunMode) -> PathProfile {
        PathProfile::new("testapp")
            .with_run_mode(run_mode)
            .with_os(OsFlavor::Linux)
            .without_auto_create()
            .without_clean_temp()
    }

    #[test]
    fn dev_mode_uses_cwd_layout() {
        let _guard = env_guard();
        let paths = resolve(&profile(RunMode::Dev));
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(paths.logging, cwd.join("logs"));
        assert_eq!(paths.app_data, cwd.join("data/app"));
        assert_eq!(paths.usr_data, cwd.join("data/usr"));
        assert_eq!(paths.tmp, cwd.join("temp"));
    }

    #[test]
    fn container_mode_shares_data_root_and_suffixes_tmp() {
        let _guard = env_guard();
        set_env("CONTAINER_NAME", "unit-c1");
        let paths = resolve(&profile(RunMode::Container));
        remove_env("CONTAINER_NAME");

        let cwd = std::env::current_dir().unwrap();
        assert_eq!(paths.app_data, cwd.join("data"));
        assert_eq!(paths.usr_data, cwd.join("data"));
        assert_eq!(paths.logging, cwd.join("logs/unit-c1"));
        let tmp = paths.tmp.to_string_lossy().into_owned();
        assert!(tmp.contains(&format!("unit-c1_{}", std::process::id())));
    }

    #[test]
    fn container_identifier_prefers_explicit_name() {
        let _guard = env_guard();
        set_env("CONTAINER_NAME", "explicit");
        set_env("POD_NAME", "pod-7");
        assert_eq!(container_identifier(), "explicit");
        remove_env("CONTAINER_NAME");
        assert_eq!(container_identifier(), "pod-7");
        remove_env("POD_NAME");
    }

    #[test]
    fn linux_user_layout_honours_xdg_overrides() {
        let _guard = env_guard();
        set_env("XDG_STATE_HOME", "/tmp/xdg-state");
        set_env("XDG_CONFIG_HOME", "/tmp/xdg-config");
        set_env("XDG_DATA_HOME", "/tmp/xdg-data");

        let paths = resolve(&profile(RunMode::Production));

        remove_env("XDG_STATE_HOME");
        remove_env("XDG_CONFIG_HOME");
        remove_env("XDG_DATA_HOME");

        if is_root() {
            assert_eq!(paths.logging, PathBuf::from("/var/log/testapp"));
            assert_eq!(paths.app_data, PathBuf::from("/var/lib/testapp"));
            assert_eq!(paths.usr_data, PathBuf::from("/etc/testapp"));
        } else {
            assert_eq!(paths.logging, PathBuf::from("/tmp/xdg-state/testapp/log"));
            assert_eq!(paths.app_data, PathBuf::from("/tmp/xdg-config/testapp"));
            assert_eq!(paths.usr_data, PathBuf::from("/tmp/xdg-data/testapp"));
        }
    }

    #[test]
    fn worker_tmp_gains_worker_component() {
        let _guard = env_guard();
        let mut p = PathProfile::for_worker("testapp", "w-123")
            .with_run_mode(RunMode::Dev)
            .with_os(OsFlavor::Linux);
        p.auto_create = false;
        let paths = resolve(&p);
        assert_eq!(paths.tmp, std::env::current_dir().unwrap().join("temp/w-123"));
    }

    #[test]
    fn resolution_is_pure_outside_container_mode() {
        let _guard = env_guard();
        let p = profile(RunMode::Dev);
        assert_eq!(resolve(&p), resolve(&p));
    }
}
