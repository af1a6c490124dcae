//! Local encrypted secret store
//!
//! One keystore file per store, named `<app>.v3keystore` (current format) or
//! `<app>.v2keystore` (legacy, opened only to migrate). The store keeps an
//! index of user-visible keys inside the keystore itself under
//! `<store_name>.INDEX`, so secrets can be enumerated without exposing
//! values.

use crate::error::{audited, OpError};
use crate::import;
use crate::store::SecretStore;
use crate::SecretsError;
use armature_keystore::{legacy, password, Keystore};
use armature_system::env_flag;
use armature_validator::{validate_secret_key, validate_secret_value};
use secrecy::SecretString;
use std::path::{Path, PathBuf};

// Probe key used to detect read-only stores.
const WRITABILITY_PROBE_KEY: &str = "sstore_save";

/// Which on-disk format the opened keystore uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeystoreVersion {
    /// Legacy format; only live when a migration failed and was deferred.
    V2,
    /// Current format.
    V3,
}

/// A named, prioritised local secret store backed by one keystore file.
pub struct LocalSecretStore {
    store_name: String,
    priority: u32,
    root_path: PathBuf,
    app_short_name: String,
    keystore: Keystore,
    version: KeystoreVersion,
    available: bool,
    read_only: bool,
}

impl LocalSecretStore {
    /// Open (and if needed create or migrate) the store under `root_path`.
    ///
    /// `password` overrides the machine-bound derivation; when `None` the
    /// environment (`KEYSTORE_PASSWORD` / `SECRETS_STORE_PASSWORD`) is
    /// consulted first, matching the container contract.
    ///
    /// After opening, the store probes its own writability and processes a
    /// sibling `secrets.yaml` auto-import file if one exists.
    pub fn open(
        store_name: impl Into<String>,
        priority: u32,
        root_path: impl Into<PathBuf>,
        app_short_name: impl Into<String>,
        password: Option<String>,
    ) -> Result<Self, SecretsError> {
        let store_name = store_name.into();
        let root_path = root_path.into();
        let app_short_name = app_short_name.into();

        let password = password
            .or_else(|| std::env::var("KEYSTORE_PASSWORD").ok().filter(|v| !v.is_empty()))
            .or_else(|| std::env::var("SECRETS_STORE_PASSWORD").ok().filter(|v| !v.is_empty()));

        let deprecated = root_path.join(format!("{app_short_name}.keystore"));
        if deprecated.exists() {
            tracing::warn!("Old Keystore file {:?} is no longer supported.", deprecated);
        }

        let mut store = Self::initialise(store_name, priority, root_path, app_short_name, password)
            .map_err(|err| {
                let id = armature_error::audit::secret_operation_error(
                    "keystore_initialization",
                    None,
                    None,
                    &err,
                );
                SecretsError::StoreOpen { id }
            })?;

        store.available = true;
        store.read_only = !store.probe_writability();
        tracing::info!(
            "Successfully opened {:?} Secrets Store: {:?}",
            store.version,
            store.keystore.path()
        );

        import::check_auto_imports(&store);
        Ok(store)
    }

    fn initialise(
        store_name: String,
        priority: u32,
        root_path: PathBuf,
        app_short_name: String,
        password: Option<String>,
    ) -> Result<Self, OpError> {
        let v2_path = root_path.join(format!("{app_short_name}.v2keystore"));
        let v3_path = root_path.join(format!("{app_short_name}.v3keystore"));

        let (path, keystore_password, version) = select_keystore(
            &store_name,
            &app_short_name,
            &v2_path,
            &v3_path,
            password.as_deref(),
        )?;

        let keystore = Keystore::open(path, SecretString::from(keystore_password), None);
        Ok(Self {
            store_name,
            priority,
            root_path,
            app_short_name,
            keystore,
            version,
            available: false,
            read_only: true,
        })
    }

    /// Store name (`User_Local_Store` / `App_Local_Store`).
    pub fn store_name(&self) -> &str {
        &self.store_name
    }

    /// Directory holding the keystore file.
    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    /// Application short name the keystore file is named after.
    pub fn app_short_name(&self) -> &str {
        &self.app_short_name
    }

    /// Format of the file that ended up live.
    pub fn version(&self) -> KeystoreVersion {
        self.version
    }

    /// Whether the store opened successfully.
    pub fn available(&self) -> bool {
        self.available
    }

    /// Whether the writability probe failed.
    pub fn read_only(&self) -> bool {
        self.read_only
    }

    /// Retrieve a secret; `None` on miss or the `NONE` tombstone.
    pub fn get_secret(&self, key: &str) -> Result<Option<String>, SecretsError> {
        self.run("get_secret", Some(key), |store| {
            validate_secret_key(key)?;
            let entry = store.keystore.get(key)?;
            Ok(entry.filter(|value| !value.is_empty() && value != "NONE"))
        })
    }

    /// Store a secret and record it in the index.
    ///
    /// An existing entry is deleted first so the index never double-counts.
    pub fn set_secret(&self, key: &str, value: &str) -> Result<(), SecretsError> {
        self.run("set_secret", Some(key), |store| {
            validate_secret_key(key)?;
            validate_secret_value(value)?;

            if store.keystore.get(key)?.is_some() {
                store.delete_entry(key)?;
            }

            store.keystore.set(key, value)?;
            let mut index = store.load_index()?;
            if !index.iter().any(|entry| entry == key) {
                index.push(key.to_string());
            }
            store.save_index(&index)?;
            Ok(())
        })
    }

    /// Delete a secret and drop every occurrence from the index.
    pub fn delete_secret(&self, key: &str) -> Result<(), SecretsError> {
        self.run("delete_secret", Some(key), |store| {
            validate_secret_key(key)?;
            store.delete_entry(key)
        })
    }

    /// Store a persistent setting: delete-then-set without index
    /// bookkeeping (settings are not enumerable secrets).
    pub fn set_persistent_setting(&self, key: &str, value: &str) -> Result<(), SecretsError> {
        self.run("set_persistent_setting", Some(key), |store| {
            if store.keystore.get(key)?.is_some() {
                store.keystore.delete(key)?;
            }
            store.keystore.set(key, value)?;
            Ok(())
        })
    }

    /// The index of user-visible keys. Initialised to `[]` (and persisted)
    /// on first use.
    pub fn get_index(&self) -> Result<Vec<String>, SecretsError> {
        self.run("get_index", None, |store| {
            let index = store.load_index()?;
            Ok(index)
        })
    }

    fn index_key(&self) -> String {
        format!("{}.INDEX", self.store_name)
    }

    fn load_index(&self) -> Result<Vec<String>, OpError> {
        match self.keystore.get(&self.index_key())? {
            Some(raw) => serde_json::from_str(&raw)
                .map_err(|err| OpError::msg(format!("index entry is not a JSON array: {err}"))),
            None => {
                self.save_index(&[])?;
                Ok(Vec::new())
            }
        }
    }

    fn save_index(&self, index: &[String]) -> Result<(), OpError> {
        let raw = serde_json::to_string(index)
            .map_err(|err| OpError::msg(format!("index serialisation failed: {err}")))?;
        self.keystore.set(&self.index_key(), &raw)?;
        Ok(())
    }

    fn delete_entry(&self, key: &str) -> Result<(), OpError> {
        self.keystore.delete(key)?;
        let mut index = self.load_index()?;
        index.retain(|entry| entry != key);
        self.save_index(&index)?;
        Ok(())
    }

    fn probe_writability(&self) -> bool {
        let probe = || -> Result<(), OpError> {
            self.keystore.set(WRITABILITY_PROBE_KEY, "true")?;
            self.keystore.delete(WRITABILITY_PROBE_KEY)?;
            Ok(())
        };
        match probe() {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!("{err}");
                false
            }
        }
    }

    fn run<T>(
        &self,
        operation: &str,
        key: Option<&str>,
        body: impl FnOnce(&Self) -> Result<T, OpError>,
    ) -> Result<T, SecretsError> {
        body(self).map_err(|err| audited(operation, key, Some(&self.store_name), &err))
    }
}

impl SecretStore for LocalSecretStore {
    fn name(&self) -> &str {
        &self.store_name
    }

    fn priority(&self) -> u32 {
        self.priority
    }

    fn available(&self) -> bool {
        self.available
    }

    fn read_only(&self) -> bool {
        self.read_only
    }

    fn get(&self, key: &str) -> Result<Option<String>, SecretsError> {
        self.get_secret(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SecretsError> {
        self.set_secret(key, value)
    }

    fn delete(&self, key: &str) -> Result<(), SecretsError> {
        self.delete_secret(key)
    }
}

impl std::fmt::Debug for LocalSecretStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalSecretStore")
            .field("store_name", &self.store_name)
            .field("priority", &self.priority)
            .field("version", &self.version)
            .field("available", &self.available)
            .field("read_only", &self.read_only)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Format selection and migration
// ---------------------------------------------------------------------------

// Decision table, evaluated at open time:
//
// | v3 exists | v2 exists | action            |
// |-----------|-----------|-------------------|
// | yes       | any       | open v3           |
// | no        | yes       | migrate v2 -> v3  |
// | no        | no        | create v3         |
fn select_keystore(
    store_name: &str,
    app_short_name: &str,
    v2_path: &Path,
    v3_path: &Path,
    custom_password: Option<&str>,
) -> Result<(PathBuf, String, KeystoreVersion), OpError> {
    if v3_path.exists() {
        let password = v3_password(store_name, app_short_name, v3_path, custom_password);
        return Ok((v3_path.to_path_buf(), password, KeystoreVersion::V3));
    }

    if v2_path.exists() {
        return migrate_v2_to_v3(store_name, app_short_name, v2_path, v3_path, custom_password);
    }

    let password = v3_password(store_name, app_short_name, v3_path, custom_password);
    Ok((v3_path.to_path_buf(), password, KeystoreVersion::V3))
}

// One-shot migration. The v2 file is renamed `<path>_old` only after every
// valid entry has been copied into the v3 file; any earlier failure leaves
// both files in place and falls back to opening v2 so the next start
// retries.
fn migrate_v2_to_v3(
    store_name: &str,
    app_short_name: &str,
    v2_path: &Path,
    v3_path: &Path,
    custom_password: Option<&str>,
) -> Result<(PathBuf, String, KeystoreVersion), OpError> {
    tracing::info!("Found v2 keystore, performing migration to v3...");

    let v2_password = legacy::legacy_v2_password(&v2_path.to_string_lossy())?;

    let outcome = (|| -> Result<String, OpError> {
        let v2_store = Keystore::open(
            v2_path,
            SecretString::from(v2_password.clone()),
            None,
        );
        let v3_pass = v3_password(store_name, app_short_name, v3_path, custom_password);
        let v3_store = Keystore::open(v3_path, SecretString::from(v3_pass.clone()), None);

        for (key, value) in v2_store.get_all()? {
            if let Err(err) = validate_secret_key(&key) {
                tracing::warn!("Skipping invalid secret key during migration: {err}");
                continue;
            }
            if !value.is_empty() {
                v3_store.set(&key, &value)?;
            }
        }

        let backup = backup_path(v2_path);
        std::fs::rename(v2_path, &backup)?;
        tracing::info!(
            "Successfully migrated v2 keystore to v3. Backup saved as: {:?}",
            backup
        );
        Ok(v3_pass)
    })();

    match outcome {
        Ok(v3_pass) => Ok((v3_path.to_path_buf(), v3_pass, KeystoreVersion::V3)),
        Err(err) => {
            tracing::error!("Failed to migrate v2 keystore: {err}");
            tracing::info!("Falling back to v2 keystore (migration will retry next time)");
            Ok((v2_path.to_path_buf(), v2_password, KeystoreVersion::V2))
        }
    }
}

fn backup_path(v2_path: &Path) -> PathBuf {
    let mut name = v2_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.push_str("_old");
    v2_path.with_file_name(name)
}

// Password for the v3 file, in selection order: container environment
// password verbatim, strengthened custom password, machine-bound store
// password.
fn v3_password(
    store_name: &str,
    app_short_name: &str,
    v3_path: &Path,
    custom_password: Option<&str>,
) -> String {
    let in_container = env_flag("CONTAINER_MODE")
        || Path::new("/.dockerenv").exists()
        || std::env::var_os("KUBERNETES_SERVICE_HOST").is_some();
    if in_container {
        for var in ["KEYSTORE_PASSWORD", "SECRETS_STORE_PASSWORD"] {
            if let Ok(value) = std::env::var(var) {
                if !value.is_empty() {
                    tracing::info!(
                        "container environment: using {var} directly for keystore \
                         (no system fingerprint mixing)"
                    );
                    return value;
                }
            }
        }
    }

    match custom_password {
        Some(custom) => password::PasswordGenerator::new(store_name).generate(Some(custom), false),
        None => password::keystore_password(app_short_name, &v3_path.to_string_lossy()),
    }
}
