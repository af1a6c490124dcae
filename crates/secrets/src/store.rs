//! The secret store capability
//!
//! Cloud back-ends (AWS Secrets Manager, Azure Key Vault, ...) are opaque to
//! the core: they implement [`SecretStore`] and are constructed by factories
//! the application registers per `store_type`. The core never inspects the
//! implementation — it only orders stores by priority and checks
//! availability and writability.

use crate::SecretsError;
use std::collections::HashMap;

/// Capability every secret store exposes.
///
/// Implementations must be `Send + Sync`; the manager shares them across
/// threads.
pub trait SecretStore: Send + Sync {
    /// Registered store name.
    fn name(&self) -> &str;

    /// Numeric priority; lower wins. Local stores take 0 and 1, cloud
    /// stores are assigned 2 and up.
    fn priority(&self) -> u32;

    /// Whether the store answered its availability probe at open time.
    fn available(&self) -> bool;

    /// Whether writes should be refused cleanly.
    fn read_only(&self) -> bool;

    /// Retrieve a secret, `None` on miss.
    fn get(&self, key: &str) -> Result<Option<String>, SecretsError>;

    /// Store a secret.
    fn set(&self, key: &str, value: &str) -> Result<(), SecretsError>;

    /// Delete a secret. Deleting an absent key succeeds.
    fn delete(&self, key: &str) -> Result<(), SecretsError>;
}

/// Declaration of one cloud store, read from configuration under
/// `secrets_manager.cloud_stores.<name>`.
#[derive(Debug, Clone)]
pub struct CloudStoreConfig {
    /// Store name, the configuration map key.
    pub name: String,
    /// Back-end type the factory registry resolves (`aws`, `azure`, ...).
    pub store_type: String,
    /// Numeric priority (≥ 2 by convention).
    pub priority: u32,
    /// The store's configuration subtree, passed to the factory verbatim.
    pub settings: serde_json::Value,
}

impl CloudStoreConfig {
    /// Parse the `secrets_manager.cloud_stores` subtree.
    ///
    /// Entries without a `store_type` or `priority` are skipped with a
    /// warning; a malformed subtree yields an empty list.
    pub fn parse_all(cloud_stores: &serde_json::Value) -> Vec<CloudStoreConfig> {
        let Some(map) = cloud_stores.as_object() else {
            return Vec::new();
        };

        let mut configs = Vec::new();
        for (name, settings) in map {
            let store_type = settings.get("store_type").and_then(|v| v.as_str());
            let priority = settings.get("priority").and_then(serde_json::Value::as_u64);
            match (store_type, priority) {
                (Some(store_type), Some(priority)) => configs.push(CloudStoreConfig {
                    name: name.clone(),
                    store_type: store_type.to_string(),
                    priority: priority as u32,
                    settings: settings.clone(),
                }),
                _ => {
                    tracing::warn!(
                        "cloud store '{name}' is missing store_type or priority; skipping"
                    );
                }
            }
        }
        configs
    }
}

/// Factory building a cloud store from its configuration.
///
/// A factory failure marks that one store unavailable; the rest still load.
pub type CloudStoreFactory =
    Box<dyn Fn(&CloudStoreConfig) -> Result<Box<dyn SecretStore>, SecretsError> + Send + Sync>;

/// Registry of cloud store factories, keyed by `store_type`.
#[derive(Default)]
pub struct CloudStoreRegistry {
    factories: HashMap<String, CloudStoreFactory>,
}

impl CloudStoreRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory for a store type, replacing any previous one.
    pub fn register(
        &mut self,
        store_type: impl Into<String>,
        factory: CloudStoreFactory,
    ) -> &mut Self {
        self.factories.insert(store_type.into(), factory);
        self
    }

    /// Build a store, or `None` when no factory covers the type.
    pub fn build(&self, config: &CloudStoreConfig) -> Option<Result<Box<dyn SecretStore>, SecretsError>> {
        self.factories
            .get(&config.store_type)
            .map(|factory| factory(config))
    }
}

impl std::fmt::Debug for CloudStoreRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudStoreRegistry")
            .field("store_types", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn parses_well_formed_entries_and_skips_broken_ones() {
        let subtree = json!({
            "vault1": { "store_type": "aws", "priority": 2, "session_name": "prod" },
            "vault2": { "store_type": "azure", "priority": 3 },
            "broken": { "priority": 4 },
        });

        let mut configs = CloudStoreConfig::parse_all(&subtree);
        configs.sort_by_key(|c| c.priority);

        assert_eq!(configs.len(), 2);
        assert_eq!(configs[0].name, "vault1");
        assert_eq!(configs[0].store_type, "aws");
        assert_eq!(configs[1].name, "vault2");
    }

    #[test]
    fn non_object_subtree_is_empty() {
        assert!(CloudStoreConfig::parse_all(&json!(null)).is_empty());
        assert!(CloudStoreConfig::parse_all(&json!([1, 2])).is_empty());
    }
}
