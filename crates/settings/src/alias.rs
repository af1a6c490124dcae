//! Alias resolution
//!
//! String leaves loaded from configuration are rewritten once per read:
//!
//! | prefix | rewrite |
//! |---|---|
//! | `ENV/<name>` | value of the environment variable, or the original string when unset |
//! | `SEC/<key>` | secret from the secret manager, or nothing when missing |
//! | `<USR>` | the user-data path |
//! | `<APP>` | the app-data path |
//!
//! Resolution is idempotent: resolving an already-resolved value changes
//! nothing.

use armature_secrets::SecretManager;
use serde_json::Value;
use std::path::Path;

/// What the resolver substitutes against.
pub(crate) struct AliasContext<'a> {
    pub usr_data: &'a Path,
    pub app_data: &'a Path,
    pub secrets: Option<&'a SecretManager>,
}

/// Walk a value and rewrite every string leaf.
pub(crate) fn resolve_value(value: Value, ctx: &AliasContext<'_>) -> Value {
    match value {
        Value::String(text) => resolve_str(&text, ctx),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| resolve_value(item, ctx))
                .collect(),
        ),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, item)| (key, resolve_value(item, ctx)))
                .collect(),
        ),
        other => other,
    }
}

fn resolve_str(text: &str, ctx: &AliasContext<'_>) -> Value {
    if let Some(name) = text.strip_prefix("ENV/") {
        let name = name.trim();
        if name.is_empty() {
            return Value::String(text.to_string());
        }
        return match std::env::var(name) {
            Ok(value) => Value::String(value),
            Err(_) => Value::String(text.to_string()),
        };
    }

    if let Some(key) = text.strip_prefix("SEC/") {
        let key = key.trim();
        if key.is_empty() {
            return Value::Null;
        }
        let looked_up = ctx
            .secrets
            .and_then(|secrets| secrets.get_secret(key, None, None).ok().flatten());
        return match looked_up {
            Some(value) => Value::String(value),
            None => Value::Null,
        };
    }

    if text.starts_with("<USR>") {
        let substituted = text.replace("<USR>", &ctx.usr_data.to_string_lossy());
        return Value::String(substituted.trim().to_string());
    }

    if text.starts_with("<APP>") {
        let substituted = text.replace("<APP>", &ctx.app_data.to_string_lossy());
        return Value::String(substituted.trim().to_string());
    }

    Value::String(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::{Mutex, MutexGuard};

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn env_guard() -> MutexGuard<'static, ()> {
        ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn ctx<'a>() -> AliasContext<'a> {
        AliasContext {
            usr_data: Path::new("/home/user/.local/share/app"),
            app_data: Path::new("/var/lib/app"),
            secrets: None,
        }
    }

    #[test]
    fn env_alias_reads_the_environment() {
        let _guard = env_guard();
        // SAFETY: guarded by ENV_LOCK.
        unsafe { std::env::set_var("ALIAS_TEST_HOST", "10.0.0.1") };

        let resolved = resolve_value(json!({"host": "ENV/ALIAS_TEST_HOST"}), &ctx());
        assert_eq!(resolved, json!({"host": "10.0.0.1"}));

        // SAFETY: guarded by ENV_LOCK.
        unsafe { std::env::remove_var("ALIAS_TEST_HOST") };
    }

    #[test]
    fn unset_env_keeps_the_original_string() {
        let _guard = env_guard();
        let resolved = resolve_value(json!("ENV/ALIAS_TEST_UNSET"), &ctx());
        assert_eq!(resolved, json!("ENV/ALIAS_TEST_UNSET"));
    }

    #[test]
    fn missing_secret_resolves_to_null() {
        let resolved = resolve_value(json!("SEC/absent"), &ctx());
        assert_eq!(resolved, Value::Null);
        // Empty secret reference too.
        assert_eq!(resolve_value(json!("SEC/"), &ctx()), Value::Null);
    }

    #[test]
    fn path_aliases_substitute() {
        let resolved = resolve_value(json!("<USR>/cache"), &ctx());
        assert_eq!(resolved, json!("/home/user/.local/share/app/cache"));

        let resolved = resolve_value(json!("<APP>/plugins"), &ctx());
        assert_eq!(resolved, json!("/var/lib/app/plugins"));
    }

    #[test]
    fn resolution_is_idempotent() {
        let _guard = env_guard();
        let original = json!({
            "plain": "value",
            "nested": {"list": ["<USR>/a", 42, true]},
        });
        let once = resolve_value(original, &ctx());
        let twice = resolve_value(once.clone(), &ctx());
        assert_eq!(once, twice);
    }

    #[test]
    fn non_string_leaves_pass_through() {
        let original = json!({"n": 1, "b": false, "nil": null});
        assert_eq!(resolve_value(original.clone(), &ctx()), original);
    }
}
