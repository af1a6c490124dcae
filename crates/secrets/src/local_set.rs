//! The pair of local stores
//!
//! Every application carries `User_Local_Store` (priority 0, user data
//! directory) and, when the app-data directory cooperates,
//! `App_Local_Store` (priority 1). Each process — main or spawned worker —
//! builds its own set and reaches the keystore files directly; coherence
//! across processes comes solely from the keystore file lock.

use crate::local::LocalSecretStore;
use crate::SecretsError;
use armature_paths::Paths;
use std::collections::HashMap;

/// Name of the user-scope local store.
pub const USER_LOCAL_STORE: &str = "User_Local_Store";

/// Name of the app-scope local store.
pub const APP_LOCAL_STORE: &str = "App_Local_Store";

/// Reported status of one local store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalStoreStatus {
    /// Whether the store opened.
    pub available: bool,
    /// Whether writes would be refused.
    pub read_only: bool,
    /// The user-visible key index (empty when unavailable).
    pub index: Vec<String>,
}

/// The local stores, ordered by priority.
#[derive(Debug)]
pub struct LocalStoreSet {
    stores: Vec<LocalSecretStore>,
}

impl LocalStoreSet {
    /// Open the user store (required) and the app store (best effort).
    ///
    /// A failing app store is skipped with a warning — a read-only
    /// installation directory is an expected production condition.
    pub fn open(
        paths: &Paths,
        app_short_name: &str,
        password: Option<String>,
    ) -> Result<Self, SecretsError> {
        let mut stores = Vec::new();

        stores.push(LocalSecretStore::open(
            USER_LOCAL_STORE,
            0,
            &paths.usr_data,
            app_short_name,
            password.clone(),
        )?);

        match LocalSecretStore::open(
            APP_LOCAL_STORE,
            1,
            &paths.app_data,
            app_short_name,
            password,
        ) {
            Ok(store) => stores.push(store),
            Err(err) => tracing::warn!("Skipping APP Local Secret Store: {err}"),
        }

        Ok(Self { stores })
    }

    /// Store names present in this set.
    pub fn store_names(&self) -> Vec<&str> {
        self.stores.iter().map(LocalSecretStore::store_name).collect()
    }

    /// Whether `name` names one of the local stores (present or not).
    pub fn is_local_name(name: &str) -> bool {
        name == USER_LOCAL_STORE || name == APP_LOCAL_STORE
    }

    fn find(&self, store_name: &str) -> Option<&LocalSecretStore> {
        self.stores.iter().find(|store| store.store_name() == store_name)
    }

    /// Look a secret up across the local stores.
    ///
    /// With `store_name` set, only that store is queried (an unavailable
    /// store is an error-logged miss). Otherwise available stores are walked
    /// in priority order and the first hit wins.
    pub fn get_secret(
        &self,
        key: &str,
        store_name: Option<&str>,
    ) -> Result<Option<String>, SecretsError> {
        if let Some(name) = store_name {
            let Some(store) = self.find(name) else {
                tracing::error!("Store {name} is not available to retrieve secret.");
                return Ok(None);
            };
            if !store.available() {
                tracing::error!("Store {name} is not available to retrieve secret.");
                return Ok(None);
            }
            return store.get_secret(key);
        }

        for store in &self.stores {
            if !store.available() {
                continue;
            }
            if let Some(value) = store.get_secret(key)? {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }

    /// Write into the named store when it is available and writable;
    /// otherwise warn and do nothing.
    pub fn set_secret(
        &self,
        key: &str,
        value: &str,
        store_name: &str,
    ) -> Result<(), SecretsError> {
        match self.find(store_name) {
            Some(store) if store.available() && !store.read_only() => store.set_secret(key, value),
            Some(store) => {
                tracing::warn!(
                    "Secrets Store {} is either not available or is read only.",
                    store.store_name()
                );
                Ok(())
            }
            None => {
                tracing::warn!("Secrets Store {store_name} does not exist.");
                Ok(())
            }
        }
    }

    /// Delete from the named store.
    pub fn delete_secret(&self, key: &str, store_name: &str) -> Result<(), SecretsError> {
        match self.find(store_name) {
            Some(store) => store.delete_secret(key),
            None => Ok(()),
        }
    }

    /// Persist a setting into the user store.
    pub fn set_persistent_setting(&self, key: &str, value: &str) -> Result<(), SecretsError> {
        match self.find(USER_LOCAL_STORE) {
            Some(store) if store.available() && !store.read_only() => {
                store.set_persistent_setting(key, value)
            }
            _ => {
                tracing::warn!(
                    "Secrets Store {USER_LOCAL_STORE} is either not available or is read only."
                );
                Ok(())
            }
        }
    }

    /// Status report for both well-known stores, present or not.
    pub fn stores_index(&self) -> HashMap<String, LocalStoreStatus> {
        let mut report = HashMap::new();
        for name in [USER_LOCAL_STORE, APP_LOCAL_STORE] {
            let status = match self.find(name) {
                Some(store) => LocalStoreStatus {
                    available: store.available(),
                    read_only: store.read_only(),
                    index: store.get_index().unwrap_or_default(),
                },
                None => LocalStoreStatus {
                    available: false,
                    read_only: true,
                    index: Vec::new(),
                },
            };
            report.insert(name.to_string(), status);
        }
        report
    }
}
