//! Validation failures

use thiserror::Error;

/// Why an input was rejected.
///
/// Messages describe the rule that fired, never the value that tripped it —
/// offending values may be secrets or attacker-controlled.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Secret key was empty or whitespace-only.
    #[error("secret key cannot be empty")]
    EmptySecretKey,

    /// Secret key failed a structural rule.
    #[error("invalid secret key: {reason}")]
    InvalidSecretKey {
        /// Which rule fired.
        reason: &'static str,
    },

    /// Secret value was empty.
    #[error("secret value cannot be empty")]
    EmptySecretValue,

    /// Secret value exceeded the size ceiling.
    #[error("secret value too large ({size} bytes, max {max})")]
    SecretValueTooLarge {
        /// Observed UTF-8 size.
        size: usize,
        /// Permitted maximum.
        max: usize,
    },

    /// File path was empty or whitespace-only.
    #[error("file path cannot be empty")]
    EmptyPath,

    /// Path contained a `..` traversal component.
    #[error("path traversal detected")]
    PathTraversal,

    /// Path resolved outside every allowed directory.
    #[error("path not in allowed directories")]
    PathOutsideAllowed,

    /// YAML document exceeded the size ceiling.
    #[error("YAML content too large ({size} bytes, max {max})")]
    YamlTooLarge {
        /// Observed UTF-8 size.
        size: usize,
        /// Permitted maximum.
        max: usize,
    },

    /// YAML document carried enough anchors/references to look like an
    /// expansion attack.
    #[error("excessive YAML references detected")]
    YamlExcessiveReferences,

    /// Configuration key failed a structural rule.
    #[error("invalid configuration key: {reason}")]
    InvalidConfigurationKey {
        /// Which rule fired.
        reason: &'static str,
    },
}
