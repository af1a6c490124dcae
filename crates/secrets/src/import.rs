//! `secrets.yaml` auto-import
//!
//! A `secrets.yaml` sitting next to a keystore is a one-shot drop box:
//!
//! ```yaml
//! secrets:
//!   - name: api_key
//!     value: abc123
//!   - name: tls_cert
//!     file: ./cert.pem
//!     store_as: base64
//! ```
//!
//! Each entry is imported through the store's validated `set` path;
//! individual failures are audited and skipped. The file is securely
//! deleted (multi-pass overwrite, then unlink) once processing finishes.

use crate::fsutil::{secure_delete, validate_file_size};
use crate::local::LocalSecretStore;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;
use std::path::Path;

// Ceilings for the import file and for file-sourced secrets.
const MAX_IMPORT_FILE_SIZE: u64 = 10 * 1024 * 1024;
const MAX_SECRET_FILE_SIZE: u64 = 64 * 1024;

const SECURE_DELETE_PASSES: u32 = 3;

#[derive(Debug, Deserialize)]
struct ImportFile {
    secrets: Vec<ImportEntry>,
}

#[derive(Debug, Deserialize)]
struct ImportEntry {
    name: String,
    #[serde(default)]
    value: Option<String>,
    #[serde(default)]
    file: Option<String>,
    #[serde(default = "StoreAs::raw")]
    store_as: StoreAs,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
enum StoreAs {
    Raw,
    Base64,
}

impl StoreAs {
    fn raw() -> Self {
        StoreAs::Raw
    }
}

/// Process a sibling `secrets.yaml` if one exists. Never fails the caller:
/// every failure path is audited and swallowed.
pub(crate) fn check_auto_imports(store: &LocalSecretStore) {
    let import_path = store.root_path().join("secrets.yaml");
    if !import_path.exists() {
        return;
    }

    match process_file(store, &import_path) {
        Ok(imported) => {
            tracing::info!("auto-import completed: {imported} secrets imported");
        }
        Err(err) => {
            let id = armature_error::audit::file_operation_error(
                "auto_import",
                &import_path.to_string_lossy(),
                &err,
            );
            tracing::error!("auto-import failed (Error ID: {id})");
        }
    }

    // Plaintext secrets were on disk; overwrite before unlinking.
    secure_delete(&import_path, SECURE_DELETE_PASSES);
}

fn process_file(store: &LocalSecretStore, import_path: &Path) -> Result<usize, String> {
    validate_file_size(import_path, MAX_IMPORT_FILE_SIZE).map_err(|err| err.to_string())?;

    armature_validator::validate_file_path(
        &import_path.to_string_lossy(),
        &[store.root_path()],
    )
    .map_err(|err| err.to_string())?;

    tracing::info!("Performing Auto-Import of Secrets from {:?}", import_path);

    let content = std::fs::read_to_string(import_path).map_err(|err| err.to_string())?;
    armature_validator::validate_yaml_content(&content).map_err(|err| err.to_string())?;

    let parsed: ImportFile = serde_yaml::from_str(&content)
        .map_err(|err| format!("invalid secrets.yaml format: {err}"))?;

    let mut imported = 0;
    for entry in parsed.secrets {
        match process_entry(store, &entry) {
            Ok(()) => {
                tracing::info!("Imported Secret: {}", entry.name);
                imported += 1;
            }
            Err(err) => {
                let id = armature_error::audit::secret_operation_error(
                    "auto_import_entry",
                    Some(&entry.name),
                    Some(store.store_name()),
                    &err,
                );
                tracing::error!("Failed to import secret entry (Error ID: {id})");
            }
        }
    }
    Ok(imported)
}

fn process_entry(store: &LocalSecretStore, entry: &ImportEntry) -> Result<(), String> {
    armature_validator::validate_secret_key(&entry.name).map_err(|err| err.to_string())?;

    let value = match &entry.file {
        Some(file) => {
            let cwd = std::env::current_dir().map_err(|err| err.to_string())?;
            let path = armature_validator::validate_file_path(
                file,
                &[store.root_path(), cwd.as_path()],
            )
            .map_err(|err| err.to_string())?;

            if !path.exists() {
                return Err(format!(
                    "the file specified for {} does not exist",
                    entry.name
                ));
            }
            validate_file_size(&path, MAX_SECRET_FILE_SIZE).map_err(|err| err.to_string())?;

            match entry.store_as {
                StoreAs::Raw => std::fs::read_to_string(&path).map_err(|err| err.to_string())?,
                StoreAs::Base64 => {
                    let bytes = std::fs::read(&path).map_err(|err| err.to_string())?;
                    STANDARD.encode(bytes)
                }
            }
        }
        None => entry
            .value
            .clone()
            .ok_or_else(|| format!("missing value for {}; not imported", entry.name))?,
    };

    armature_validator::validate_secret_value(&value).map_err(|err| err.to_string())?;
    store.set_secret(&entry.name, &value).map_err(|err| err.to_string())?;
    Ok(())
}
