//! Secret key and value validation

use crate::ValidationError;
use regex::Regex;
use std::sync::LazyLock;

/// Maximum UTF-8 size of a secret value.
pub const MAX_SECRET_VALUE_SIZE: usize = 64 * 1024;

static SAFE_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9._/-]{1,255}$").expect("static pattern"));

static PATH_TRAVERSAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\.\.[\\/]|[\\/]\.\.|^\.\.[\\/]|[\\/]\.\.$").expect("static pattern")
});

static SCRIPT_INJECTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<script|javascript:|on\w+\s*=|eval\s*\(").expect("static pattern")
});

// Device names Windows reserves regardless of extension.
const RESERVED_NAMES: &[&str] = &[
    "con", "prn", "aux", "nul", "com1", "com2", "com3", "com4", "com5", "com6", "com7", "com8",
    "com9", "lpt1", "lpt2", "lpt3", "lpt4", "lpt5", "lpt6", "lpt7", "lpt8", "lpt9",
];

/// Validate a secret key name.
///
/// A valid key matches `^[A-Za-z0-9._/-]{1,255}$`, contains no `..`
/// traversal, and is not a Windows-reserved device name.
///
/// # Errors
///
/// Returns the first rule that fired; the key itself is never echoed.
pub fn validate_secret_key(key: &str) -> Result<(), ValidationError> {
    if key.is_empty() || key.chars().all(char::is_whitespace) {
        return Err(ValidationError::EmptySecretKey);
    }
    if key.len() > 255 {
        return Err(ValidationError::InvalidSecretKey {
            reason: "too long (max 255 chars)",
        });
    }
    if key.contains("..") || PATH_TRAVERSAL.is_match(key) {
        return Err(ValidationError::InvalidSecretKey {
            reason: "path traversal detected",
        });
    }
    if !SAFE_KEY.is_match(key) {
        return Err(ValidationError::InvalidSecretKey {
            reason: "invalid characters",
        });
    }
    if RESERVED_NAMES.contains(&key.to_ascii_lowercase().as_str()) {
        return Err(ValidationError::InvalidSecretKey {
            reason: "reserved device name",
        });
    }
    Ok(())
}

/// Validate a secret value: non-empty, at most [`MAX_SECRET_VALUE_SIZE`]
/// UTF-8 bytes.
///
/// Script-injection-looking content is logged as a warning but not rejected;
/// secret values are opaque to the runtime.
pub fn validate_secret_value(value: &str) -> Result<(), ValidationError> {
    let size = value.len();
    if size > MAX_SECRET_VALUE_SIZE {
        return Err(ValidationError::SecretValueTooLarge {
            size,
            max: MAX_SECRET_VALUE_SIZE,
        });
    }
    if value.is_empty() {
        return Err(ValidationError::EmptySecretValue);
    }
    if SCRIPT_INJECTION.is_match(value) {
        tracing::warn!("potential script injection detected in secret value");
    }
    Ok(())
}

pub(crate) fn traversal_pattern() -> &'static Regex {
    &PATH_TRAVERSAL
}
