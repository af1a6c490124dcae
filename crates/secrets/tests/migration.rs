//! Legacy-format migration: decision table, one-shot copy, rename, and the
//! fall-back-on-failure path.
//!
//! The legacy password is machine-bound; hosts without a stable machine id
//! cannot derive it, so those tests bail out early there (the behaviour
//! under test is then the hard failure itself, covered in the keystore
//! crate).

use armature_keystore::{legacy, Keystore};
use armature_secrets::{KeystoreVersion, LocalSecretStore};
use secrecy::SecretString;
use std::path::Path;

fn seed_v2(dir: &Path, entries: &[(&str, &str)]) -> bool {
    let v2_path = dir.join("testapp.v2keystore");
    let Ok(password) = legacy::legacy_v2_password(&v2_path.to_string_lossy()) else {
        return false;
    };
    let store = Keystore::open(&v2_path, SecretString::from(password), None);
    for (key, value) in entries {
        store.set(key, value).unwrap();
    }
    true
}

#[test]
fn v2_is_migrated_to_v3_and_renamed() {
    let dir = tempfile::tempdir().unwrap();
    if !seed_v2(
        dir.path(),
        &[("a", "1"), ("b", "2"), ("valid.key", "3"), ("bad key!", "skipped")],
    ) {
        eprintln!("no machine id on this host; skipping");
        return;
    }

    let store = LocalSecretStore::open("User_Local_Store", 0, dir.path(), "testapp", None).unwrap();

    assert_eq!(store.version(), KeystoreVersion::V3);
    assert!(dir.path().join("testapp.v3keystore").exists());
    assert!(dir.path().join("testapp.v2keystore_old").exists());
    assert!(!dir.path().join("testapp.v2keystore").exists());

    assert_eq!(store.get_secret("a").unwrap().as_deref(), Some("1"));
    assert_eq!(store.get_secret("b").unwrap().as_deref(), Some("2"));
    assert_eq!(store.get_secret("valid.key").unwrap().as_deref(), Some("3"));
}

#[test]
fn migration_is_idempotent_across_reopens() {
    let dir = tempfile::tempdir().unwrap();
    if !seed_v2(dir.path(), &[("k", "v")]) {
        eprintln!("no machine id on this host; skipping");
        return;
    }

    let first = LocalSecretStore::open("User_Local_Store", 0, dir.path(), "testapp", None).unwrap();
    assert_eq!(first.get_secret("k").unwrap().as_deref(), Some("v"));
    drop(first);

    // Second open finds v3 and must not attempt another migration.
    let second = LocalSecretStore::open("User_Local_Store", 0, dir.path(), "testapp", None).unwrap();
    assert_eq!(second.version(), KeystoreVersion::V3);
    assert_eq!(second.get_secret("k").unwrap().as_deref(), Some("v"));
    assert!(dir.path().join("testapp.v2keystore_old").exists());
}

#[test]
fn failed_migration_leaves_both_files_and_falls_back() {
    if armature_system::machine_id().is_none() {
        eprintln!("no machine id on this host; skipping");
        return;
    }

    let dir = tempfile::tempdir().unwrap();
    let v2_path = dir.path().join("testapp.v2keystore");

    // A v2 file sealed with the wrong password: migration cannot read it.
    let wrong = Keystore::open(&v2_path, SecretString::from("not-the-legacy-password".to_string()), None);
    wrong.set("locked", "away").unwrap();

    let store = LocalSecretStore::open("User_Local_Store", 0, dir.path(), "testapp", None).unwrap();

    // Fallback to v2; files untouched, retry happens next start.
    assert_eq!(store.version(), KeystoreVersion::V2);
    assert!(v2_path.exists());
    assert!(!dir.path().join("testapp.v3keystore").exists());
    assert!(!dir.path().join("testapp.v2keystore_old").exists());
}

#[test]
fn no_files_creates_v3() {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalSecretStore::open("User_Local_Store", 0, dir.path(), "testapp", None).unwrap();
    assert_eq!(store.version(), KeystoreVersion::V3);

    store.set_secret("first", "secret").unwrap();
    assert!(dir.path().join("testapp.v3keystore").exists());
    assert!(!dir.path().join("testapp.v2keystore").exists());
}
