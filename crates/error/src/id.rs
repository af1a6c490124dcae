//! Error correlation identifiers

use rand::RngCore;
use std::fmt;

/// Random correlation token linking a public error message to the audit log.
///
/// Rendered as 16 lowercase hex characters. A fresh id is generated for every
/// audited failure; the public message carries only the id, while the
/// security sink records the full detail under the same id.
///
/// # Examples
///
/// ```
/// use armature_error::ErrorId;
///
/// let id = ErrorId::new();
/// assert_eq!(id.to_string().len(), 16);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ErrorId([u8; 8]);

impl ErrorId {
    /// Generate a fresh random id.
    pub fn new() -> Self {
        let mut bytes = [0u8; 8];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Hex form of the id (16 characters).
    pub fn as_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl Default for ErrorId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ErrorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn hex_form_is_sixteen_lowercase_chars() {
        let id = ErrorId::new();
        let hex = id.as_hex();
        assert_eq!(hex.len(), 16);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn ids_are_distinct() {
        // Two draws colliding would mean the RNG is broken.
        assert_ne!(ErrorId::new(), ErrorId::new());
    }
}
