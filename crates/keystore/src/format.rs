//! On-disk format
//!
//! ```text
//! offset 0      : 16 bytes  salt
//! offset 16     : N  bytes  Fernet token (url-safe base64 text)
//! offset 16+N   : 32 bytes  HMAC-SHA256(key, salt ‖ token)
//! ```
//!
//! The encryption key is `base64url(PBKDF2-HMAC-SHA256(password, salt,
//! 20 000, 32))` and doubles as the HMAC key (the base64 text itself, as the
//! format defines it). The iteration count is fixed by the format; raising
//! it means a new file version.

use crate::KeystoreError;
use armature_error::timing::{constant_time_eq, MinDuration};
use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use fernet::Fernet;
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;
use std::collections::HashMap;
use std::time::Duration;
use zeroize::Zeroizing;

/// Length of the leading salt.
pub const SALT_LEN: usize = 16;

/// Length of the trailing HMAC tag.
pub const HMAC_LEN: usize = 32;

/// Minimum legal file length (salt + tag around an empty token).
pub const MIN_FILE_LEN: usize = SALT_LEN + HMAC_LEN;

/// PBKDF2 iteration count — fixed by the on-disk format.
pub const KDF_ITERATIONS: u32 = 20_000;

// Floor applied to HMAC verification so timing does not reveal which check
// failed.
const VERIFY_FLOOR: Duration = Duration::from_millis(10);

type HmacSha256 = Hmac<Sha256>;

/// Derive the Fernet/HMAC key for one salt.
pub(crate) fn derive_key(password: &[u8], salt: &[u8]) -> Zeroizing<String> {
    let mut key = Zeroizing::new([0u8; 32]);
    pbkdf2::pbkdf2_hmac::<Sha256>(password, salt, KDF_ITERATIONS, &mut key[..]);
    Zeroizing::new(URL_SAFE.encode(&key[..]))
}

fn tag_for(key: &str, salt: &[u8], token: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key.as_bytes()).expect("HMAC accepts any key length");
    mac.update(salt);
    mac.update(token);
    mac.finalize().into_bytes().to_vec()
}

/// Encrypt and authenticate a map into the file image.
pub(crate) fn seal(
    entries: &HashMap<String, String>,
    password: &[u8],
) -> Result<Vec<u8>, KeystoreError> {
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);

    let key = derive_key(password, &salt);
    let fernet = Fernet::new(&key).ok_or_else(|| KeystoreError::Cipher {
        reason: "derived key rejected".to_string(),
    })?;

    let plaintext = Zeroizing::new(serde_json::to_vec(entries)?);
    let token = fernet.encrypt(&plaintext);
    let tag = tag_for(&key, &salt, token.as_bytes());

    let mut image = Vec::with_capacity(SALT_LEN + token.len() + HMAC_LEN);
    image.extend_from_slice(&salt);
    image.extend_from_slice(token.as_bytes());
    image.extend_from_slice(&tag);
    Ok(image)
}

/// Verify and decrypt a file image back into a map.
///
/// Verification is constant-time and padded to a floor of 10 ms on every
/// path, success included.
pub(crate) fn open(image: &[u8], password: &[u8]) -> Result<HashMap<String, String>, KeystoreError> {
    let guard = MinDuration::start(VERIFY_FLOOR);

    if image.len() < MIN_FILE_LEN {
        guard.pad();
        return Err(KeystoreError::Integrity {
            reason: format!("file too small ({} bytes)", image.len()),
        });
    }

    let salt = &image[..SALT_LEN];
    let token = &image[SALT_LEN..image.len() - HMAC_LEN];
    let stored_tag = &image[image.len() - HMAC_LEN..];

    let key = derive_key(password, salt);
    let computed = tag_for(&key, salt, token);
    let authentic = constant_time_eq(&computed, stored_tag);
    guard.pad();

    if !authentic {
        return Err(KeystoreError::Integrity {
            reason: "HMAC verification failed; file may have been tampered with".to_string(),
        });
    }

    let fernet = Fernet::new(&key).ok_or_else(|| KeystoreError::Cipher {
        reason: "derived key rejected".to_string(),
    })?;
    let token = std::str::from_utf8(token).map_err(|_| KeystoreError::Integrity {
        reason: "ciphertext is not a valid token".to_string(),
    })?;
    let plaintext = Zeroizing::new(fernet.decrypt(token).map_err(|_| KeystoreError::Integrity {
        reason: "token decryption failed".to_string(),
    })?);

    Ok(serde_json::from_slice(&plaintext)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::time::Instant;

    fn sample() -> HashMap<String, String> {
        HashMap::from([
            ("api".to_string(), "k1".to_string()),
            ("db/password".to_string(), "hunter2".to_string()),
        ])
    }

    #[test]
    fn seal_then_open_roundtrips() {
        let image = seal(&sample(), b"password").unwrap();
        assert!(image.len() >= MIN_FILE_LEN);
        let restored = open(&image, b"password").unwrap();
        assert_eq!(restored, sample());
    }

    #[test]
    fn wrong_password_is_integrity_failure() {
        let image = seal(&sample(), b"password").unwrap();
        let err = open(&image, b"other").unwrap_err();
        assert!(err.is_integrity());
    }

    #[test]
    fn single_bit_flip_is_detected() {
        let mut image = seal(&sample(), b"password").unwrap();
        let mid = image.len() / 2;
        image[mid] ^= 0x01;
        let err = open(&image, b"password").unwrap_err();
        assert!(err.is_integrity());
    }

    #[test]
    fn short_file_is_rejected() {
        let err = open(&[0u8; MIN_FILE_LEN - 1], b"password").unwrap_err();
        assert!(err.is_integrity());
    }

    #[test]
    fn verification_takes_at_least_the_floor() {
        let image = seal(&sample(), b"password").unwrap();

        let start = Instant::now();
        let _ = open(&image, b"password").unwrap();
        assert!(start.elapsed() >= VERIFY_FLOOR);

        let mut tampered = image;
        let mid = tampered.len() / 2;
        tampered[mid] ^= 0x01;
        let start = Instant::now();
        let _ = open(&tampered, b"password").unwrap_err();
        assert!(start.elapsed() >= VERIFY_FLOOR);
    }

    #[test]
    fn salts_are_fresh_per_seal() {
        let a = seal(&sample(), b"password").unwrap();
        let b = seal(&sample(), b"password").unwrap();
        assert_ne!(a[..SALT_LEN], b[..SALT_LEN]);
    }
}
