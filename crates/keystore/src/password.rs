//! Keystore password derivation (current regime)
//!
//! The password for a keystore is chosen by an ordered rule set:
//!
//! 1. In a container with `KEYSTORE_PASSWORD` (or, as a fallback,
//!    `SECRETS_STORE_PASSWORD`) set, that string is used **verbatim** — no
//!    fingerprinting, no salt, no KDF. This is the only way several
//!    container instances can share one keystore file.
//! 2. A user-supplied password is strengthened with the system fingerprint
//!    (PBKDF2-HMAC-SHA256, 100 000 iterations, installation-specific salt).
//! 3. Otherwise the password is derived from the machine fingerprint and the
//!    store path, so the file is bound to this machine without the user
//!    managing anything.
//!
//! The derivation constants (domain tag, salts, iteration counts) are format
//! constants; changing any of them orphans existing keystores.

use armature_system::{env_flag, fingerprint, hostname, machine_id, EnvironmentKind,
    SystemFingerprint};
use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use base64::Engine;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

/// PBKDF2 iteration count for password derivation (stronger than the file
/// format's own 20 000 because this guards the master password).
pub const PASSWORD_ITERATIONS: u32 = 100_000;

// Domain tag for the store-bound salt; fixed by the v3 derivation format.
const V3_SALT_TAG: &str = "dtPyAppFramework-v3-";

fn pbkdf2_sha256(input: &[u8], salt: &[u8]) -> Zeroizing<[u8; 32]> {
    let mut out = Zeroizing::new([0u8; 32]);
    pbkdf2::pbkdf2_hmac::<Sha256>(input, salt, PASSWORD_ITERATIONS, &mut out[..]);
    out
}

/// The container-environment password, when one applies.
///
/// `KEYSTORE_PASSWORD` wins over `SECRETS_STORE_PASSWORD`; both are ignored
/// outside a container environment.
pub fn container_env_password() -> Option<String> {
    let in_container =
        env_flag("CONTAINER_MODE") || EnvironmentKind::detect() == EnvironmentKind::Container;
    if !in_container {
        return None;
    }

    for var in ["KEYSTORE_PASSWORD", "SECRETS_STORE_PASSWORD"] {
        if let Ok(value) = std::env::var(var) {
            if !value.is_empty() {
                tracing::info!("using container environment password from {var} for keystore");
                return Some(value);
            }
        }
    }
    None
}

/// Password generator bound to one application name.
///
/// Covers rules 1 and 2 above plus a fingerprint-only fallback; the
/// store-bound rule 3 lives in [`keystore_password`] because it keys on the
/// store path rather than the application fingerprint.
#[derive(Debug)]
pub struct PasswordGenerator {
    app_name: String,
    salt: String,
    fingerprint: SystemFingerprint,
}

impl PasswordGenerator {
    /// Generator with the installation-specific salt.
    pub fn new(app_name: impl Into<String>) -> Self {
        let app_name = app_name.into();
        let salt = installation_salt(&app_name);
        let fingerprint = SystemFingerprint::new(app_name.clone());
        Self {
            app_name,
            salt,
            fingerprint,
        }
    }

    /// Generator with a caller-provided salt.
    pub fn with_salt(app_name: impl Into<String>, salt: impl Into<String>) -> Self {
        let app_name = app_name.into();
        Self {
            fingerprint: SystemFingerprint::new(app_name.clone()),
            app_name,
            salt: salt.into(),
        }
    }

    /// Apply the ordered selection rules.
    ///
    /// With `user_override` set, a custom password is taken verbatim rather
    /// than strengthened.
    pub fn generate(&self, custom_password: Option<&str>, user_override: bool) -> String {
        if let Some(env_password) = container_env_password() {
            return env_password;
        }

        match custom_password {
            Some(password) if user_override => {
                tracing::info!("using user-provided password without system strengthening");
                password.to_string()
            }
            Some(password) => {
                tracing::info!("using user-provided password with system strengthening");
                self.strengthen(password)
            }
            None => {
                tracing::info!("generating system-based password");
                self.system_password()
            }
        }
    }

    fn strengthen(&self, password: &str) -> String {
        let combined = Zeroizing::new(format!(
            "{password}:{}:{}",
            self.fingerprint.hex(),
            self.app_name
        ));
        let derived = pbkdf2_sha256(combined.as_bytes(), self.salt.as_bytes());
        URL_SAFE.encode(&derived[..])
    }

    fn system_password(&self) -> String {
        let derived = pbkdf2_sha256(self.fingerprint.hex().as_bytes(), self.salt.as_bytes());
        URL_SAFE.encode(&derived[..])
    }
}

/// Machine-bound keystore password for a concrete store path (rule 3).
///
/// Seed: `"{app_name}:{store_path}:{machine_fingerprint}"`; salt: the first
/// 16 bytes of SHA-256 over the v3 domain tag plus the application name.
/// Output is standard base64 of the derived 32 bytes.
pub fn keystore_password(app_name: &str, store_path: &str) -> String {
    let machine = machine_fingerprint();
    let seed = Zeroizing::new(format!("{app_name}:{store_path}:{machine}"));
    let salt = application_salt(app_name);
    let derived = pbkdf2_sha256(seed.as_bytes(), &salt);
    STANDARD.encode(&derived[..])
}

// Machine-level identifiers, '|'-joined. Best effort with a deterministic
// platform fallback; the derivation stays defensive either way.
fn machine_fingerprint() -> String {
    let mut identifiers = Vec::new();

    if let Some(id) = machine_id() {
        identifiers.push(format!("machine_id:{id}"));
    }
    if let Some(mac) = fingerprint::primary_mac() {
        identifiers.push(format!("mac:{mac}"));
    }
    identifiers.push(format!("hostname:{}", hostname()));

    if identifiers.is_empty() {
        identifiers.push(format!(
            "fallback:{}-{}",
            std::env::consts::OS,
            std::env::consts::ARCH
        ));
    }

    identifiers.join("|")
}

fn application_salt(app_name: &str) -> [u8; 16] {
    let digest = Sha256::digest(format!("{V3_SALT_TAG}{app_name}").as_bytes());
    let mut salt = [0u8; 16];
    salt.copy_from_slice(&digest[..16]);
    salt
}

// Installation salt: node name, hardware node id, architecture and app name,
// hashed and truncated to 32 hex characters.
fn installation_salt(app_name: &str) -> String {
    let combined = format!(
        "{}:{}:{}:{app_name}",
        hostname(),
        fingerprint::hardware_node_id(),
        std::env::consts::ARCH
    );
    hex::encode(Sha256::digest(combined.as_bytes()))[..32].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::{Mutex, MutexGuard};

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn env_guard() -> MutexGuard<'static, ()> {
        ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn set_env(key: &str, value: &str) {
        // SAFETY: guarded by ENV_LOCK.
        unsafe { std::env::set_var(key, value) }
    }

    fn remove_env(key: &str) {
        // SAFETY: guarded by ENV_LOCK.
        unsafe { std::env::remove_var(key) }
    }

    #[test]
    fn container_password_is_verbatim() {
        let _guard = env_guard();
        set_env("CONTAINER_MODE", "true");
        set_env("KEYSTORE_PASSWORD", "p@ss");

        let generator = PasswordGenerator::new("testapp");
        assert_eq!(generator.generate(None, false), "p@ss");
        // Even a custom password loses to the container environment.
        assert_eq!(generator.generate(Some("custom"), false), "p@ss");

        remove_env("KEYSTORE_PASSWORD");
        set_env("SECRETS_STORE_PASSWORD", "fallback");
        assert_eq!(generator.generate(None, false), "fallback");

        remove_env("SECRETS_STORE_PASSWORD");
        remove_env("CONTAINER_MODE");
    }

    #[test]
    fn env_password_ignored_outside_container() {
        let _guard = env_guard();
        set_env("KEYSTORE_PASSWORD", "p@ss");
        remove_env("CONTAINER_MODE");

        if EnvironmentKind::detect() != EnvironmentKind::Container {
            let generator = PasswordGenerator::new("testapp");
            assert_ne!(generator.generate(None, false), "p@ss");
        }
        remove_env("KEYSTORE_PASSWORD");
    }

    #[test]
    fn derivations_are_deterministic() {
        let _guard = env_guard();
        remove_env("KEYSTORE_PASSWORD");
        remove_env("SECRETS_STORE_PASSWORD");
        remove_env("CONTAINER_MODE");

        let generator = PasswordGenerator::new("testapp");
        if EnvironmentKind::detect() != EnvironmentKind::Container {
            assert_eq!(
                generator.generate(Some("secret"), false),
                generator.generate(Some("secret"), false)
            );
            assert_ne!(
                generator.generate(Some("secret"), false),
                generator.generate(Some("other"), false)
            );
        }

        assert_eq!(
            keystore_password("testapp", "/data/a.v3keystore"),
            keystore_password("testapp", "/data/a.v3keystore")
        );
        assert_ne!(
            keystore_password("testapp", "/data/a.v3keystore"),
            keystore_password("testapp", "/data/b.v3keystore")
        );
    }

    #[test]
    fn user_override_bypasses_strengthening() {
        let _guard = env_guard();
        remove_env("KEYSTORE_PASSWORD");
        remove_env("SECRETS_STORE_PASSWORD");
        remove_env("CONTAINER_MODE");

        if EnvironmentKind::detect() != EnvironmentKind::Container {
            let generator = PasswordGenerator::new("testapp");
            assert_eq!(generator.generate(Some("verbatim"), true), "verbatim");
        }
    }

    #[test]
    fn salts_are_bound_to_app_name() {
        assert_ne!(installation_salt("a"), installation_salt("b"));
        assert_ne!(application_salt("a"), application_salt("b"));
        assert_eq!(installation_salt("a").len(), 32);
    }
}
