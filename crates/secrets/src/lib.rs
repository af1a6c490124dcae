//! # Armature secrets
//!
//! The secret storage hierarchy:
//!
//! - [`LocalSecretStore`] — one encrypted keystore file plus an in-keystore
//!   index of user-visible keys, with input validation, a writability probe,
//!   automatic import of a sibling `secrets.yaml`, and a one-shot migration
//!   from the previous keystore format.
//! - [`LocalStoreSet`] — the two local stores every application carries:
//!   `User_Local_Store` (priority 0, user data dir) and `App_Local_Store`
//!   (priority 1, app data dir, optional when that directory is not
//!   writable).
//! - [`SecretManager`] — the unified facade: store-qualified keys, local
//!   stores first, then registered cloud stores in priority order. Cloud
//!   back-ends are opaque capabilities behind the [`SecretStore`] trait,
//!   constructed by caller-registered factories.
//!
//! Every externally-triggered operation is audited: failures fan out to the
//! public/internal/security sinks and surface to the caller with only a
//! correlation id.

mod error;
mod fsutil;
mod generate;
mod import;
mod local;
mod local_set;
mod manager;
mod store;

pub use error::{SecretErrorKind, SecretsError};
pub use fsutil::secure_delete;
pub use generate::SecretComplexity;
pub use local::{KeystoreVersion, LocalSecretStore};
pub use local_set::{LocalStoreSet, LocalStoreStatus, APP_LOCAL_STORE, USER_LOCAL_STORE};
pub use manager::SecretManager;
pub use store::{CloudStoreConfig, CloudStoreRegistry, SecretStore};
