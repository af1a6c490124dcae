//! One configuration file, one reader

use crate::SettingsError;
use parking_lot::RwLock;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// File name every reader serves.
pub const CONFIG_FILE: &str = "config.yaml";

/// Reader bound to one `config.yaml`, carrying a numeric priority
/// (lower = higher precedence).
///
/// The reader holds the last successfully-loaded snapshot behind a
/// read-lock; lookups never touch the filesystem. Reload failures keep the
/// previous snapshot.
#[derive(Debug)]
pub struct SettingsReader {
    priority: u32,
    settings_file: PathBuf,
    snapshot: RwLock<Value>,
}

impl SettingsReader {
    /// Bind a reader to `<dir>/config.yaml` and load it immediately.
    ///
    /// A missing file is a warning and an empty snapshot, not an error.
    pub fn new(dir: &Path, priority: u32) -> Self {
        let reader = Self {
            priority,
            settings_file: dir.join(CONFIG_FILE),
            snapshot: RwLock::new(Value::Null),
        };
        if let Err(err) = reader.reload() {
            tracing::error!(
                "Error reading in settings file {:?}. {err}",
                reader.settings_file
            );
        }
        reader
    }

    /// The reader's priority.
    pub fn priority(&self) -> u32 {
        self.priority
    }

    /// The file this reader serves.
    pub fn settings_file(&self) -> &Path {
        &self.settings_file
    }

    /// Re-read the file into the snapshot.
    ///
    /// On any failure the previous snapshot is left untouched and the error
    /// is returned for the caller to log.
    pub fn reload(&self) -> Result<(), SettingsError> {
        if !self.settings_file.exists() {
            tracing::warn!("Settings file {:?} does not exist.", self.settings_file);
            return Ok(());
        }

        let content = std::fs::read_to_string(&self.settings_file)?;
        armature_validator::validate_yaml_content(&content)?;
        let value: Value = serde_yaml::from_str(&content)
            .map_err(|err| SettingsError::Parse(err.to_string()))?;

        *self.snapshot.write() = value;
        tracing::info!("Loaded settings file {:?}.", self.settings_file);
        Ok(())
    }

    /// Forget the snapshot (the watched file was deleted).
    pub fn clear(&self) {
        *self.snapshot.write() = Value::Null;
    }

    /// Dotted-key lookup over the snapshot: `get("a.b.c")` walks nested
    /// mappings. Returns a clone of the subtree, `None` when any component
    /// is missing.
    pub fn get(&self, key: &str) -> Option<Value> {
        let snapshot = self.snapshot.read();
        let mut current = &*snapshot;
        for part in key.split('.') {
            current = current.as_object()?.get(part)?;
        }
        Some(current.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn reader_with(content: &str) -> (tempfile::TempDir, SettingsReader) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), content).unwrap();
        let reader = SettingsReader::new(dir.path(), 100);
        (dir, reader)
    }

    #[test]
    fn dotted_lookup_walks_mappings() {
        let (_dir, reader) = reader_with("db:\n  host: 10.0.0.1\n  port: 5432\n");
        assert_eq!(reader.get("db.host"), Some(json!("10.0.0.1")));
        assert_eq!(reader.get("db.port"), Some(json!(5432)));
        assert_eq!(reader.get("db"), Some(json!({"host": "10.0.0.1", "port": 5432})));
        assert_eq!(reader.get("db.missing"), None);
        assert_eq!(reader.get("nope"), None);
    }

    #[test]
    fn missing_file_serves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let reader = SettingsReader::new(dir.path(), 100);
        assert_eq!(reader.get("anything"), None);
    }

    #[test]
    fn failed_reload_keeps_previous_snapshot() {
        let (dir, reader) = reader_with("key: value\n");
        assert_eq!(reader.get("key"), Some(json!("value")));

        std::fs::write(dir.path().join(CONFIG_FILE), "key: [unclosed\n").unwrap();
        assert!(reader.reload().is_err());
        assert_eq!(reader.get("key"), Some(json!("value")));
    }

    #[test]
    fn clear_empties_the_snapshot() {
        let (_dir, reader) = reader_with("key: value\n");
        reader.clear();
        assert_eq!(reader.get("key"), None);
    }
}
