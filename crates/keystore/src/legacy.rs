//! Legacy password derivation (previous keystore format)
//!
//! Retained solely so a pre-existing `.v2keystore` can be decrypted once
//! during migration. The scheme is known-weak (cyclic XOR over the machine
//! id) and is deliberately kept bit-compatible with the files it has to
//! open; nothing new is ever encrypted with it.

use crate::KeystoreError;
use armature_system::machine_id;
use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use base64::Engine;

/// Derive the legacy password for a `.v2keystore` at `store_path`.
///
/// # Errors
///
/// Fails hard with [`KeystoreError::MachineIdUnavailable`] when the host
/// offers no stable machine id — without one the legacy password cannot be
/// reproduced, so the migration must not guess.
pub fn legacy_v2_password(store_path: &str) -> Result<String, KeystoreError> {
    let machine = machine_id().ok_or(KeystoreError::MachineIdUnavailable)?;
    Ok(derive(&machine, store_path))
}

// The historical recipe, step for step: concatenate, strip to letters,
// cyclic XOR, base64, truncate to 32 chars, url-safe base64 the result.
fn derive(machine_id: &str, store_path: &str) -> String {
    let base = format!("{machine_id}{store_path}");
    let key: String = base.chars().filter(char::is_ascii_alphabetic).collect();

    let xored: String = if key.is_empty() {
        String::new()
    } else {
        base.chars()
            .zip(key.chars().cycle())
            .filter_map(|(x, y)| char::from_u32((x as u32) ^ (y as u32)))
            .collect()
    };

    let encoded = STANDARD.encode(xored.as_bytes());
    let truncated: String = encoded.chars().take(32).collect();
    URL_SAFE.encode(truncated.as_bytes())
}
