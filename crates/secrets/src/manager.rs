//! The unified secret manager

use crate::generate::SecretComplexity;
use crate::local_set::{LocalStoreSet, LocalStoreStatus, USER_LOCAL_STORE};
use crate::store::{CloudStoreConfig, CloudStoreRegistry, SecretStore};
use crate::SecretsError;
use armature_paths::Paths;
use std::collections::HashMap;

/// Facade over the local store pair and any registered cloud stores.
///
/// Resolution order for reads: the local stores (priority 0 and 1), then
/// available cloud stores sorted by their numeric priority. A
/// store-qualified key (`<StoreName>.<rest>`, where the prefix names a known
/// store) restricts the lookup to that store — strictly, for reads and
/// writes alike.
pub struct SecretManager {
    locals: LocalStoreSet,
    cloud_stores: Vec<Box<dyn SecretStore>>,
}

impl SecretManager {
    /// Build the manager with its local stores opened under `paths`.
    pub fn new(
        paths: &Paths,
        app_short_name: &str,
        password: Option<String>,
    ) -> Result<Self, SecretsError> {
        let locals = LocalStoreSet::open(paths, app_short_name, password)?;
        Ok(Self {
            locals,
            cloud_stores: Vec::new(),
        })
    }

    /// Construct cloud stores from configuration through the factory
    /// registry.
    ///
    /// A factory failure (missing session, SDK refusal) skips that one store
    /// with an audit record; the others still load. Stores end up sorted by
    /// priority.
    pub fn load_cloud_stores(
        &mut self,
        configs: Vec<CloudStoreConfig>,
        registry: &CloudStoreRegistry,
    ) {
        for config in configs {
            match registry.build(&config) {
                Some(Ok(store)) => {
                    tracing::info!(
                        "Initialised cloud secrets store {} (priority {})",
                        config.name,
                        config.priority
                    );
                    self.cloud_stores.push(store);
                }
                Some(Err(err)) => {
                    let id = armature_error::audit::authentication_error(
                        "cloud_store_open",
                        &config.name,
                        &err,
                    );
                    tracing::warn!(
                        "Cloud store {} unavailable (Error ID: {id}); continuing without it",
                        config.name
                    );
                }
                None => {
                    tracing::warn!(
                        "No factory registered for cloud store type '{}' (store {})",
                        config.store_type,
                        config.name
                    );
                }
            }
        }
        self.cloud_stores.sort_by_key(|store| store.priority());
    }

    /// Every store name currently known (local and cloud).
    pub fn store_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .locals
            .store_names()
            .into_iter()
            .map(str::to_string)
            .collect();
        names.extend(self.cloud_stores.iter().map(|store| store.name().to_string()));
        names
    }

    /// Status of the two well-known local stores.
    pub fn local_stores_index(&self) -> HashMap<String, LocalStoreStatus> {
        self.locals.stores_index()
    }

    // Split `<StoreName>.<rest>` when the prefix names a known store.
    fn parse_qualified<'k>(
        &self,
        key: &'k str,
        store_name: Option<&'k str>,
    ) -> (&'k str, Option<&'k str>) {
        if store_name.is_none() {
            if let Some((prefix, rest)) = key.split_once('.') {
                if !rest.contains('.') && self.knows_store(prefix) {
                    return (rest, Some(prefix));
                }
            }
        }
        (key, store_name)
    }

    fn knows_store(&self, name: &str) -> bool {
        LocalStoreSet::is_local_name(name)
            || self.cloud_stores.iter().any(|store| store.name() == name)
    }

    /// Retrieve a secret.
    ///
    /// Empty keys miss defensively. Absent an explicit (or key-qualified)
    /// store name, the local stores are consulted first, then each available
    /// cloud store in priority order; the first non-empty value wins.
    pub fn get_secret(
        &self,
        key: &str,
        default: Option<&str>,
        store_name: Option<&str>,
    ) -> Result<Option<String>, SecretsError> {
        if key.trim().is_empty() {
            tracing::debug!("empty key passed to get_secret, returning default value");
            return Ok(default.map(str::to_string));
        }

        let (key, store_name) = self.parse_qualified(key, store_name);

        let mut value = None;
        let local_scope = store_name.is_none_or(LocalStoreSet::is_local_name);
        if local_scope {
            value = self.locals.get_secret(key, store_name)?;
        }

        if value.is_none() && !matches!(store_name, Some(name) if LocalStoreSet::is_local_name(name))
        {
            value = self.lookup_cloud(key, store_name);
        }

        if value.is_none() {
            tracing::debug!("secret not found, returning default value");
            value = default.map(str::to_string);
        }
        Ok(value)
    }

    fn lookup_cloud(&self, key: &str, store_name: Option<&str>) -> Option<String> {
        if let Some(name) = store_name {
            let store = self.cloud_stores.iter().find(|store| store.name() == name)?;
            if !store.available() {
                tracing::error!("Store {name} is not available to retrieve secret.");
                return None;
            }
            return self.cloud_get(store.as_ref(), key);
        }

        for store in &self.cloud_stores {
            if !store.available() {
                continue;
            }
            if let Some(value) = self.cloud_get(store.as_ref(), key) {
                return Some(value);
            }
        }
        None
    }

    // Cloud failures are misses: the store stays in rotation and the error
    // is audited as an authentication problem against that store.
    fn cloud_get(&self, store: &dyn SecretStore, key: &str) -> Option<String> {
        match store.get(key) {
            Ok(value) => value.filter(|v| !v.is_empty()),
            Err(err) => {
                let id =
                    armature_error::audit::authentication_error("get_secret", store.name(), &err);
                tracing::warn!(
                    "cloud store {} failed to serve secret (Error ID: {id})",
                    store.name()
                );
                None
            }
        }
    }

    /// Store a secret in the named store (default `User_Local_Store`).
    ///
    /// An unavailable or read-only target logs a warning and does nothing;
    /// an explicit store name is never silently redirected elsewhere.
    pub fn set_secret(
        &self,
        key: &str,
        value: &str,
        store_name: Option<&str>,
    ) -> Result<(), SecretsError> {
        let store_name = store_name.filter(|name| !name.is_empty()).unwrap_or(USER_LOCAL_STORE);

        if LocalStoreSet::is_local_name(store_name) {
            return self.locals.set_secret(key, value, store_name);
        }

        match self.cloud_stores.iter().find(|store| store.name() == store_name) {
            Some(store) if store.available() && !store.read_only() => store.set(key, value),
            Some(store) => {
                tracing::warn!(
                    "Secrets Store {} is either not available or is read only.",
                    store.name()
                );
                Ok(())
            }
            None => {
                tracing::warn!("Secrets Store {store_name} does not exist.");
                Ok(())
            }
        }
    }

    /// Delete a secret from the named store (default `User_Local_Store`).
    pub fn delete_secret(&self, key: &str, store_name: Option<&str>) -> Result<(), SecretsError> {
        let store_name = store_name.filter(|name| !name.is_empty()).unwrap_or(USER_LOCAL_STORE);

        if LocalStoreSet::is_local_name(store_name) {
            return self.locals.delete_secret(key, store_name);
        }

        match self.cloud_stores.iter().find(|store| store.name() == store_name) {
            Some(store) => store.delete(key),
            None => Ok(()),
        }
    }

    /// Persist a user-visible setting; it shadows every configuration
    /// reader for the same dotted key.
    pub fn set_persistent_setting(&self, key: &str, value: &str) -> Result<(), SecretsError> {
        self.locals.set_persistent_setting(key, value)
    }

    /// Mint a random secret, store it under `name`, and return it.
    ///
    /// Length is bounded to 12..=1024; the generated value satisfies the
    /// chosen complexity's character classes and contains no weak patterns.
    pub fn create_secret(
        &self,
        name: &str,
        length: usize,
        complexity: SecretComplexity,
        store_name: Option<&str>,
    ) -> Result<String, SecretsError> {
        armature_validator::validate_secret_key(name)
            .map_err(crate::error::OpError::from)
            .map_err(|err| crate::error::audited("create_secret", Some(name), store_name, &err))?;

        let secret = crate::generate::generate(length, complexity)
            .map_err(|err| crate::error::audited("create_secret", Some(name), store_name, &err))?;

        self.set_secret(name, &secret, store_name)?;
        tracing::info!(
            "generated secret '{name}' with length {length}, complexity {complexity:?}"
        );
        Ok(secret)
    }
}

impl std::fmt::Debug for SecretManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretManager")
            .field("locals", &self.locals)
            .field(
                "cloud_stores",
                &self
                    .cloud_stores
                    .iter()
                    .map(|store| (store.name().to_string(), store.priority()))
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}
