//! # Armature settings
//!
//! Layered application configuration:
//!
//! - one [`SettingsReader`] per `config.yaml`, each with a numeric priority
//!   (lower wins). A standard install layers the CWD config (300), the
//!   app-data config (200) and the user-data config (100); container mode
//!   has exactly the CWD config;
//! - lookups consult the secret manager first, so persistent settings
//!   shadow every file;
//! - string values are rewritten through the alias resolver (`ENV/`,
//!   `SEC/`, `<USR>`, `<APP>`) on every read;
//! - every reader's directory is watched and the file hot-reloads,
//!   debounced by content hash.
//!
//! ```no_run
//! use armature_paths::{ApplicationPaths, PathProfile};
//! use armature_settings::Settings;
//!
//! let paths = ApplicationPaths::initialise(PathProfile::new("myapp"));
//! let settings = Settings::initialise(paths.paths(), false);
//! let timeout = settings.get_or("app.timeout", serde_json::json!(30));
//! ```

mod alias;
mod error;
mod reader;
mod watcher;

pub use error::SettingsError;
pub use reader::{SettingsReader, CONFIG_FILE};
pub use watcher::SettingsWatcher;

use alias::AliasContext;
use armature_paths::Paths;
use armature_secrets::SecretManager;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Where a persisted configuration file lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsScope {
    /// The CWD config (install scope).
    App,
    /// The app-data config (all users).
    AllUser,
    /// The user-data config (current user).
    CurrentUser,
}

impl SettingsScope {
    /// Parse the scope names used in configuration tooling.
    pub fn parse(scope: &str) -> Result<Self, SettingsError> {
        match scope {
            "app" => Ok(SettingsScope::App),
            "all_user" => Ok(SettingsScope::AllUser),
            "current_user" => Ok(SettingsScope::CurrentUser),
            other => Err(SettingsError::UnknownScope {
                scope: other.to_string(),
            }),
        }
    }
}

/// Raw text and writability of one configuration scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawScopeSettings {
    /// Whether writing the file back failed.
    pub read_only: bool,
    /// Current file text (empty when absent).
    pub raw_data: String,
}

/// The layered settings facade.
pub struct Settings {
    readers: Vec<Arc<SettingsReader>>,
    _watchers: Vec<SettingsWatcher>,
    secrets: Option<Arc<SecretManager>>,
    usr_data: PathBuf,
    app_data: PathBuf,
    container_mode: bool,
}

impl Settings {
    /// Build the reader stack for the resolved paths.
    ///
    /// Container mode gets a single reader over `<cwd>/config`; otherwise
    /// the three standard layers are installed. Readers are sorted ascending
    /// by priority and each existing directory gains a file watcher.
    pub fn initialise(paths: &Paths, container_mode: bool) -> Self {
        let cwd_config = std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join("config");

        let mut readers = vec![Arc::new(SettingsReader::new(&cwd_config, 300))];
        if !container_mode {
            readers.push(Arc::new(SettingsReader::new(&paths.app_data, 200)));
            readers.push(Arc::new(SettingsReader::new(&paths.usr_data, 100)));
        }
        readers.sort_by_key(|reader| reader.priority());

        let watchers = readers
            .iter()
            .filter(|reader| {
                reader
                    .settings_file()
                    .parent()
                    .is_some_and(Path::exists)
            })
            .filter_map(|reader| match SettingsWatcher::install(Arc::clone(reader)) {
                Ok(watcher) => Some(watcher),
                Err(err) => {
                    tracing::warn!("settings watcher not installed: {err}");
                    None
                }
            })
            .collect();

        Self {
            readers,
            _watchers: watchers,
            secrets: None,
            usr_data: paths.usr_data.clone(),
            app_data: paths.app_data.clone(),
            container_mode,
        }
    }

    /// Attach the secret manager consulted by lookups and `SEC/` aliases.
    pub fn attach_secret_manager(&mut self, secrets: Arc<SecretManager>) {
        self.secrets = Some(secrets);
    }

    /// The config files currently served, ordered by priority (lowest
    /// number first).
    pub fn config_file_paths(&self) -> Vec<PathBuf> {
        self.readers
            .iter()
            .map(|reader| reader.settings_file().to_path_buf())
            .collect()
    }

    /// Look a dotted key up.
    ///
    /// The secret manager is consulted first (persistent settings shadow the
    /// files), then the readers in priority order; the first non-empty value
    /// wins. The result is passed through alias resolution. Empty or
    /// whitespace-only keys return `None`.
    pub fn get(&self, key: &str) -> Option<Value> {
        if key.trim().is_empty() {
            return None;
        }

        let raw = self.raw_lookup(key)?;
        let resolved = alias::resolve_value(raw, &self.alias_context());
        (!is_empty(&resolved)).then_some(resolved)
    }

    /// [`Settings::get`] with a default for misses and empty results.
    pub fn get_or(&self, key: &str, default: Value) -> Value {
        self.get(key).unwrap_or(default)
    }

    /// String-typed convenience over [`Settings::get`].
    pub fn get_string(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            Value::String(text) => Some(text),
            other => Some(other.to_string()),
        }
    }

    /// Persist a setting; it shadows every reader for the same key.
    pub fn set(&self, key: &str, value: &Value) -> Result<(), SettingsError> {
        armature_validator::validate_configuration_key(key)?;
        let Some(secrets) = &self.secrets else {
            tracing::warn!("no secret manager attached; persistent setting dropped");
            return Ok(());
        };
        let stored = match value {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        };
        secrets.set_persistent_setting(key, &stored)?;
        Ok(())
    }

    /// Write raw configuration text into a scope's `config.yaml`.
    pub fn persist_settings(&self, content: &str, scope: SettingsScope) -> Result<(), SettingsError> {
        armature_validator::validate_yaml_content(content)?;
        let dir = self.scope_dir(scope);
        std::fs::create_dir_all(&dir)?;
        std::fs::write(dir.join(CONFIG_FILE), content)?;
        Ok(())
    }

    /// Raw text plus writability per scope, for configuration tooling.
    ///
    /// Writability is probed by rewriting the current content in place. In
    /// container mode only the `app` scope is real; the other entries are
    /// placeholders marked read-only.
    pub fn get_raw_settings(&self) -> HashMap<String, RawScopeSettings> {
        let mut report = HashMap::new();

        let scopes: &[(&str, SettingsScope)] = if self.container_mode {
            &[("app", SettingsScope::App)]
        } else {
            &[
                ("app", SettingsScope::App),
                ("all_user", SettingsScope::AllUser),
                ("current_user", SettingsScope::CurrentUser),
            ]
        };

        for (name, scope) in scopes {
            let file = self.scope_dir(*scope).join(CONFIG_FILE);
            let raw_data = std::fs::read_to_string(&file).unwrap_or_default();
            let read_only = std::fs::write(&file, &raw_data).is_err();
            report.insert(
                (*name).to_string(),
                RawScopeSettings { read_only, raw_data },
            );
        }

        if self.container_mode {
            for name in ["all_user", "current_user"] {
                report.insert(
                    name.to_string(),
                    RawScopeSettings {
                        read_only: true,
                        raw_data: "# Not available in container mode".to_string(),
                    },
                );
            }
        }

        report
    }

    fn scope_dir(&self, scope: SettingsScope) -> PathBuf {
        let cwd_config = std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join("config");
        if self.container_mode {
            return cwd_config;
        }
        match scope {
            SettingsScope::App => cwd_config,
            SettingsScope::AllUser => self.app_data.clone(),
            SettingsScope::CurrentUser => self.usr_data.clone(),
        }
    }

    fn raw_lookup(&self, key: &str) -> Option<Value> {
        if let Some(secrets) = &self.secrets {
            if let Ok(Some(value)) = secrets.get_secret(key, None, None) {
                if !value.is_empty() {
                    return Some(Value::String(value));
                }
            }
        }

        self.readers
            .iter()
            .filter_map(|reader| reader.get(key))
            .find(|value| !is_empty(value))
    }

    fn alias_context(&self) -> AliasContext<'_> {
        AliasContext {
            usr_data: &self.usr_data,
            app_data: &self.app_data,
            secrets: self.secrets.as_deref(),
        }
    }
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("config_files", &self.config_file_paths())
            .field("container_mode", &self.container_mode)
            .field("secrets_attached", &self.secrets.is_some())
            .finish()
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}
