//! # Armature input validation
//!
//! Structural validation of everything that crosses the runtime's public
//! surface: secret keys and values, file paths, YAML documents and
//! configuration keys. Validators reject early, before any store is touched,
//! and their errors never echo the offending value back.
//!
//! ```
//! use armature_validator::{validate_secret_key, validate_secret_value};
//!
//! assert!(validate_secret_key("db/password").is_ok());
//! assert!(validate_secret_key("../etc/passwd").is_err());
//! assert!(validate_secret_value("hunter2").is_ok());
//! ```

mod config;
mod error;
mod path;
mod secret;

pub use config::{validate_configuration_key, validate_yaml_content, MAX_YAML_SIZE};
pub use error::ValidationError;
pub use path::validate_file_path;
pub use secret::{validate_secret_key, validate_secret_value, MAX_SECRET_VALUE_SIZE};
