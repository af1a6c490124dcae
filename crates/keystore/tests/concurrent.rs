//! Concurrency properties of the keystore engine.
//!
//! The file lock is the only coherence mechanism, so these tests drive many
//! independent handles (the same situation as many processes) against one
//! file and assert the no-corruption guarantee: after any interleaving the
//! file decrypts, authenticates and parses. Lost updates are legal;
//! corruption is not.

use armature_keystore::{Keystore, KeystoreError, MIN_FILE_LEN};
use secrecy::SecretString;
use std::path::Path;
use std::time::Duration;

fn open(dir: &Path, timeout: Duration) -> Keystore {
    Keystore::open(
        dir.join("shared.v3keystore"),
        SecretString::from("concurrency-password".to_string()),
        Some(timeout),
    )
}

#[test]
fn interleaved_writers_never_corrupt_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let workers = 4;
    let ops_per_worker = 12;

    let handles: Vec<_> = (0..workers)
        .map(|worker| {
            let dir = dir.path().to_path_buf();
            std::thread::spawn(move || {
                let store = open(&dir, Duration::from_secs(30));
                for op in 0..ops_per_worker {
                    let key = format!("counter-{}", op % 3);
                    match op % 4 {
                        0 | 1 => store.set(&key, &format!("w{worker}-op{op}")).unwrap(),
                        2 => {
                            let _ = store.get(&key).unwrap();
                        }
                        _ => store.delete(&key).unwrap(),
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    // The end state is unspecified, but the file must be whole.
    let store = open(dir.path(), Duration::from_secs(30));
    let all = store.get_all().unwrap();
    for value in all.values() {
        assert!(value.starts_with('w'));
    }

    let raw = std::fs::read(dir.path().join("shared.v3keystore")).unwrap();
    assert!(raw.len() >= MIN_FILE_LEN);
}

#[test]
fn reader_times_out_while_writer_holds_the_lock() {
    let dir = tempfile::tempdir().unwrap();
    let store = open(dir.path(), Duration::from_secs(5));
    store.set("x", "1").unwrap();

    // Hold the lock directly, standing in for a slow process.
    let lock = armature_keystore::FileLock::for_keystore(&dir.path().join("shared.v3keystore"));
    let guard = lock.acquire(Duration::from_secs(5)).unwrap();

    let impatient = open(dir.path(), Duration::from_millis(300));
    let started = std::time::Instant::now();
    let err = impatient.get("x").unwrap_err();
    assert!(matches!(err, KeystoreError::LockTimeout { .. }));
    assert!(started.elapsed() >= Duration::from_millis(300));

    drop(guard);

    // The patient handle completes once the lock is free.
    assert_eq!(store.get("x").unwrap().as_deref(), Some("1"));
}

#[test]
fn distinct_passwords_cannot_read_each_other() {
    let dir = tempfile::tempdir().unwrap();
    let writer = Keystore::open(
        dir.path().join("shared.v3keystore"),
        SecretString::from("password-a".to_string()),
        Some(Duration::from_secs(5)),
    );
    writer.set("k", "v").unwrap();

    let intruder = Keystore::open(
        dir.path().join("shared.v3keystore"),
        SecretString::from("password-b".to_string()),
        Some(Duration::from_secs(5)),
    );
    let err = intruder.get("k").unwrap_err();
    assert!(err.is_integrity());
}
