//! Logger configuration

use std::path::PathBuf;

/// Output format for the console and application sinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    /// Human-oriented single-line output.
    #[default]
    Full,
    /// Compact output for dense consoles.
    Compact,
}

/// Logger configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Filter directive, `EnvFilter` syntax (e.g. `info`, `armature=debug`).
    pub filter: String,
    /// Console sink enabled.
    pub console: bool,
    /// Output format.
    pub format: Format,
    /// Directory for the file sinks; `None` disables them.
    pub dir: Option<PathBuf>,
    /// Base name of the application log file (`<prefix>.log`).
    pub file_prefix: String,
}

impl Config {
    /// Development profile: debug level, console only.
    pub fn development() -> Self {
        Self {
            filter: "debug".to_string(),
            ..Self::default()
        }
    }

    /// Production profile: info level, compact console.
    pub fn production() -> Self {
        Self {
            format: Format::Compact,
            ..Self::default()
        }
    }

    /// Read the filter from `ARMATURE_LOG`, then `RUST_LOG`, default `info`.
    pub fn from_env() -> Self {
        let filter = std::env::var("ARMATURE_LOG")
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or_else(|_| "info".to_string());
        Self {
            filter,
            ..Self::default()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            console: true,
            format: Format::Full,
            dir: None,
            file_prefix: "application".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_profile_is_console_info() {
        let config = Config::default();
        assert_eq!(config.filter, "info");
        assert!(config.console);
        assert!(config.dir.is_none());
    }

    #[test]
    fn development_raises_verbosity() {
        assert_eq!(Config::development().filter, "debug");
    }
}
