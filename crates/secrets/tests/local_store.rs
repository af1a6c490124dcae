//! Local store behaviour: index maintenance, validation, probes,
//! auto-import.

use armature_secrets::{LocalSecretStore, SecretErrorKind, SecretsError};
use std::path::Path;

fn open_store(dir: &Path) -> LocalSecretStore {
    LocalSecretStore::open("User_Local_Store", 0, dir, "testapp", None).unwrap()
}

#[test]
fn fresh_store_set_get_index() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(dir.path());

    assert!(store.available());
    assert!(!store.read_only());

    store.set_secret("api", "k1").unwrap();
    assert_eq!(store.get_secret("api").unwrap().as_deref(), Some("k1"));
    assert_eq!(store.get_index().unwrap(), vec!["api".to_string()]);

    // The keystore file appeared on first write.
    assert!(dir.path().join("testapp.v3keystore").exists());
}

#[test]
fn index_tracks_set_and_delete() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(dir.path());

    store.set_secret("a", "1").unwrap();
    store.set_secret("b", "2").unwrap();
    store.set_secret("a", "1-updated").unwrap();

    let mut index = store.get_index().unwrap();
    index.sort();
    assert_eq!(index, vec!["a".to_string(), "b".to_string()]);

    store.delete_secret("a").unwrap();
    assert_eq!(store.get_index().unwrap(), vec!["b".to_string()]);
    assert_eq!(store.get_secret("a").unwrap(), None);
}

#[test]
fn invalid_key_is_rejected_without_touching_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(dir.path());
    store.set_secret("good", "value").unwrap();

    let before = std::fs::read(dir.path().join("testapp.v3keystore")).unwrap();

    let err = store.set_secret("../etc/passwd", "x").unwrap_err();
    match err {
        SecretsError::Operation { kind, .. } => assert_eq!(kind, SecretErrorKind::Validation),
        other => panic!("unexpected error: {other}"),
    }

    let after = std::fs::read(dir.path().join("testapp.v3keystore")).unwrap();
    assert_eq!(before, after, "validation failure must not modify the file");
}

#[test]
fn empty_value_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(dir.path());
    assert!(store.set_secret("k", "").is_err());
}

#[test]
fn public_error_message_carries_only_an_id() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(dir.path());
    let err = store.set_secret("bad key!", "value").unwrap_err();
    let message = err.to_string();
    assert!(message.contains("Error ID: "), "got: {message}");
    assert!(!message.contains("bad key!"), "message leaked the key: {message}");
}

#[test]
fn persistent_settings_bypass_the_index() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(dir.path());

    store.set_persistent_setting("app.timeout", "30").unwrap();
    store.set_persistent_setting("app.timeout", "60").unwrap();

    assert_eq!(store.get_secret("app.timeout").unwrap().as_deref(), Some("60"));
    assert!(store.get_index().unwrap().is_empty());
}

#[test]
fn two_handles_share_one_file() {
    let dir = tempfile::tempdir().unwrap();
    let first = open_store(dir.path());
    first.set_secret("shared", "value").unwrap();

    let second = open_store(dir.path());
    assert_eq!(second.get_secret("shared").unwrap().as_deref(), Some("value"));

    let mut index = second.get_index().unwrap();
    index.sort();
    assert_eq!(index, vec!["shared".to_string()]);
}

#[test]
fn auto_import_ingests_and_securely_deletes() {
    let dir = tempfile::tempdir().unwrap();

    let payload = dir.path().join("cert.bin");
    std::fs::write(&payload, b"\x00\x01binary").unwrap();

    std::fs::write(
        dir.path().join("secrets.yaml"),
        format!(
            "secrets:\n\
             \x20 - name: api_key\n\
             \x20   value: abc123\n\
             \x20 - name: cert\n\
             \x20   file: {}\n\
             \x20   store_as: base64\n\
             \x20 - name: 'bad key!'\n\
             \x20   value: skipped\n",
            payload.display()
        ),
    )
    .unwrap();

    let store = open_store(dir.path());

    assert_eq!(store.get_secret("api_key").unwrap().as_deref(), Some("abc123"));
    let cert = store.get_secret("cert").unwrap().unwrap();
    use base64::Engine;
    let decoded = base64::engine::general_purpose::STANDARD.decode(cert).unwrap();
    assert_eq!(decoded, b"\x00\x01binary");

    // The drop box is gone and the invalid entry was skipped, not fatal.
    assert!(!dir.path().join("secrets.yaml").exists());
    let mut index = store.get_index().unwrap();
    index.sort();
    assert_eq!(index, vec!["api_key".to_string(), "cert".to_string()]);
}
