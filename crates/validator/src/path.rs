//! File path validation

use crate::secret::traversal_pattern;
use crate::ValidationError;
use std::path::{Path, PathBuf};

/// Validate a file path and return its canonical-ish absolute form.
///
/// Rejects empty paths and `..` traversal. When `allowed_dirs` is non-empty
/// the resolved path must sit under at least one of them.
///
/// The path is normalised against the current directory without requiring it
/// to exist (imports may name files that are created later by the caller).
pub fn validate_file_path(
    file_path: &str,
    allowed_dirs: &[&Path],
) -> Result<PathBuf, ValidationError> {
    if file_path.is_empty() || file_path.chars().all(char::is_whitespace) {
        return Err(ValidationError::EmptyPath);
    }
    if traversal_pattern().is_match(file_path) {
        return Err(ValidationError::PathTraversal);
    }

    let path = Path::new(file_path);
    let resolved = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };
    // Canonicalise when possible so symlinked allowed-dirs still match.
    let resolved = resolved.canonicalize().unwrap_or(resolved);

    if !allowed_dirs.is_empty() {
        let permitted = allowed_dirs.iter().any(|dir| {
            let dir = dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf());
            resolved.starts_with(dir)
        });
        if !permitted {
            return Err(ValidationError::PathOutsideAllowed);
        }
    }

    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_and_traversal() {
        assert!(matches!(
            validate_file_path("", &[]),
            Err(ValidationError::EmptyPath)
        ));
        assert!(matches!(
            validate_file_path("../secrets.yaml", &[]),
            Err(ValidationError::PathTraversal)
        ));
    }

    #[test]
    fn enforces_allowed_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let inside = dir.path().join("secrets.yaml");
        std::fs::write(&inside, "x").unwrap();

        let ok = validate_file_path(inside.to_str().unwrap(), &[dir.path()]);
        assert!(ok.is_ok());

        let other = tempfile::tempdir().unwrap();
        let out = validate_file_path(inside.to_str().unwrap(), &[other.path()]);
        assert!(matches!(out, Err(ValidationError::PathOutsideAllowed)));
    }

    #[test]
    fn absolute_path_without_constraint_passes() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("f");
        std::fs::write(&file, "x").unwrap();
        let resolved = validate_file_path(file.to_str().unwrap(), &[]).unwrap();
        assert!(resolved.is_absolute());
    }
}
