//! Three-sink audit trail
//!
//! Every externally-triggered failure is reported to three parallel sinks
//! with one correlation id:
//!
//! | sink | target | contents |
//! |---|---|---|
//! | public | [`PUBLIC_TARGET`] | operation name + error id, nothing else |
//! | internal | [`INTERNAL_TARGET`] | operation, store, key *hash*, error type, id |
//! | security | [`SECURITY_TARGET`] | full detail: raw key, error message, pid, user, id |
//!
//! The sinks are plain `tracing` targets; `armature-log` routes the security
//! target to its own file and keeps it out of the console and application
//! log.

use crate::ErrorId;
use sha2::{Digest, Sha256};
use std::fmt::Display;

/// Target for the public sink — safe for user display.
pub const PUBLIC_TARGET: &str = "audit::public";

/// Target for the internal sink — operational logs, no secret material.
pub const INTERNAL_TARGET: &str = "audit::internal";

/// Target for the security sink — full detail, separate file.
pub const SECURITY_TARGET: &str = "audit::security";

/// First 16 hex characters of the SHA-256 of `value`.
///
/// Used so the internal sink can correlate repeated failures on the same key
/// without ever recording the key itself.
pub fn key_hash(value: &str) -> String {
    let digest = Sha256::digest(value.as_bytes());
    hex::encode(digest)[..16].to_string()
}

fn effective_user() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string())
}

/// Report a failed secret operation to all three sinks.
///
/// Returns the correlation id so the caller can embed it in the error it
/// surfaces.
pub fn secret_operation_error(
    operation: &str,
    key: Option<&str>,
    store_name: Option<&str>,
    error: &dyn Display,
) -> ErrorId {
    let id = ErrorId::new();
    let store = store_name.unwrap_or("unknown");

    if key.is_some() {
        tracing::error!(
            target: "audit::public",
            "Secret operation '{operation}' failed (Error ID: {id})"
        );
    } else {
        tracing::error!(
            target: "audit::public",
            "Secret store operation failed (Error ID: {id})"
        );
    }

    tracing::error!(
        target: "audit::internal",
        "ErrorID: {id} | Operation: {operation} | Store: {store} | KeyHash: {} | Error: {}",
        key.map_or_else(|| "unknown".to_string(), key_hash),
        error_type_of(error),
    );

    tracing::error!(
        target: "audit::security",
        "ErrorID: {id} | Operation: {operation} | Store: {store} | Key: {} | Error: {error} | PID: {} | User: {}",
        key.unwrap_or("unknown"),
        std::process::id(),
        effective_user(),
    );

    id
}

/// Report a failed file operation to all three sinks.
///
/// The public and internal sinks never see the path; the internal sink gets
/// its hash.
pub fn file_operation_error(operation: &str, path: &str, error: &dyn Display) -> ErrorId {
    let id = ErrorId::new();

    tracing::error!(
        target: "audit::public",
        "File operation '{operation}' failed (Error ID: {id})"
    );

    tracing::error!(
        target: "audit::internal",
        "ErrorID: {id} | Operation: {operation} | PathHash: {} | Error: {}",
        key_hash(path),
        error_type_of(error),
    );

    tracing::error!(
        target: "audit::security",
        "ErrorID: {id} | Operation: {operation} | FilePath: {path} | Error: {error} | PID: {} | User: {}",
        std::process::id(),
        effective_user(),
    );

    id
}

/// Report an authentication failure against an external store.
pub fn authentication_error(operation: &str, target: &str, error: &dyn Display) -> ErrorId {
    let id = ErrorId::new();

    tracing::error!(
        target: "audit::public",
        "Authentication failed for {operation} (Error ID: {id})"
    );

    tracing::error!(
        target: "audit::internal",
        "ErrorID: {id} | Operation: {operation} | Target: {target} | Error: {}",
        error_type_of(error),
    );

    tracing::error!(
        target: "audit::security",
        "ErrorID: {id} | Operation: {operation} | Target: {target} | Error: {error} | PID: {} | User: {}",
        std::process::id(),
        effective_user(),
    );

    id
}

// The Display text frequently embeds secret-adjacent detail; the internal
// sink records only the leading classification token (up to the first ':').
fn error_type_of(error: &dyn Display) -> String {
    let text = error.to_string();
    match text.split_once(':') {
        Some((head, _)) if !head.trim().is_empty() => head.trim().to_string(),
        _ => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn key_hash_is_stable_prefix() {
        let a = key_hash("api.token");
        let b = key_hash("api.token");
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
        assert_ne!(a, key_hash("api.token2"));
    }

    #[test]
    fn error_type_takes_leading_token() {
        assert_eq!(error_type_of(&"lock timeout: 30s on /x"), "lock timeout");
        assert_eq!(error_type_of(&"plain message"), "plain message");
    }

    #[test]
    fn sinks_return_fresh_ids() {
        let a = secret_operation_error("get_secret", Some("k"), Some("User_Local_Store"), &"boom");
        let b = secret_operation_error("get_secret", Some("k"), Some("User_Local_Store"), &"boom");
        assert_ne!(a, b);
    }
}
