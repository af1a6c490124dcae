//! Configuration key and YAML content validation

use crate::ValidationError;
use regex::Regex;
use std::sync::LazyLock;

/// Maximum UTF-8 size of a configuration YAML document.
pub const MAX_YAML_SIZE: usize = 10 * 1024 * 1024;

// Anchor/alias ceiling before a document is treated as an expansion attack.
const MAX_YAML_REFERENCES: usize = 100;

static CONFIG_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9._-]+$").expect("static pattern"));

/// Validate a dotted configuration key such as `database.host`.
pub fn validate_configuration_key(key: &str) -> Result<(), ValidationError> {
    if key.is_empty() || key.chars().all(char::is_whitespace) {
        return Err(ValidationError::InvalidConfigurationKey {
            reason: "cannot be empty",
        });
    }
    if key.len() > 500 {
        return Err(ValidationError::InvalidConfigurationKey {
            reason: "too long (max 500 chars)",
        });
    }
    if !CONFIG_KEY.is_match(key) {
        return Err(ValidationError::InvalidConfigurationKey {
            reason: "invalid characters",
        });
    }
    if key.contains("..") || key.starts_with('.') || key.ends_with('.') {
        return Err(ValidationError::InvalidConfigurationKey {
            reason: "invalid dot usage",
        });
    }
    Ok(())
}

/// Validate raw YAML text before it is handed to the parser.
///
/// Enforces the size ceiling and the billion-laughs guard: more than
/// 100 anchors (`&`) or aliases (`*`) is rejected outright.
pub fn validate_yaml_content(content: &str) -> Result<(), ValidationError> {
    let size = content.len();
    if size > MAX_YAML_SIZE {
        return Err(ValidationError::YamlTooLarge {
            size,
            max: MAX_YAML_SIZE,
        });
    }

    let anchors = content.matches('&').count();
    let aliases = content.matches('*').count();
    if anchors > MAX_YAML_REFERENCES || aliases > MAX_YAML_REFERENCES {
        return Err(ValidationError::YamlExcessiveReferences);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("database.host")]
    #[case("settings.proxies.tor_proxy")]
    #[case("a-b_c.d")]
    fn accepts_valid_config_keys(#[case] key: &str) {
        assert!(validate_configuration_key(key).is_ok());
    }

    #[rstest]
    #[case("")]
    #[case(".leading")]
    #[case("trailing.")]
    #[case("a..b")]
    #[case("a b")]
    #[case("a/b")]
    fn rejects_invalid_config_keys(#[case] key: &str) {
        assert!(validate_configuration_key(key).is_err());
    }

    #[test]
    fn yaml_reference_guard() {
        assert!(validate_yaml_content("a: 1\nb: two\n").is_ok());

        let bomb = "&a ".repeat(101);
        assert!(matches!(
            validate_yaml_content(&bomb),
            Err(ValidationError::YamlExcessiveReferences)
        ));

        let aliases = "*a ".repeat(101);
        assert!(matches!(
            validate_yaml_content(&aliases),
            Err(ValidationError::YamlExcessiveReferences)
        ));
    }

    #[test]
    fn yaml_size_guard() {
        let big = "x".repeat(MAX_YAML_SIZE + 1);
        assert!(matches!(
            validate_yaml_content(&big),
            Err(ValidationError::YamlTooLarge { .. })
        ));
    }
}
