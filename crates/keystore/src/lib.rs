//! # Armature keystore
//!
//! A password-protected key/value store persisted in a single encrypted
//! file, safe for concurrent access from many processes:
//!
//! - **Integrity**: the file carries an HMAC-SHA256 over salt and
//!   ciphertext; verification is constant-time with a padded floor so
//!   "wrong password" and "tampered file" are indistinguishable by timing.
//! - **Atomicity**: every save writes a temporary file in the target
//!   directory, fsyncs, then renames into place. A partially-written
//!   keystore is never observable.
//! - **Cross-process safety**: every operation — reads included — holds an
//!   exclusive advisory lock on the sibling `.lock` file for the duration of
//!   its load-modify-save cycle.
//!
//! The crate also owns password derivation: the current machine-bound
//! scheme (with the container-environment override) in [`password`], and the
//! legacy scheme retained only to decrypt files produced by the previous
//! format in [`legacy`].
//!
//! ```no_run
//! use armature_keystore::Keystore;
//! use secrecy::SecretString;
//!
//! # fn main() -> Result<(), armature_keystore::KeystoreError> {
//! let store = Keystore::open("app.v3keystore", SecretString::from("p@ss".to_string()), None);
//! store.set("api", "k1")?;
//! assert_eq!(store.get("api")?.as_deref(), Some("k1"));
//! # Ok(())
//! # }
//! ```

mod error;
mod format;
pub mod legacy;
mod lock;
pub mod password;
mod store;

pub use error::KeystoreError;
pub use format::{HMAC_LEN, KDF_ITERATIONS, MIN_FILE_LEN, SALT_LEN};
pub use lock::{default_lock_timeout, FileLock, LockGuard};
pub use store::Keystore;
