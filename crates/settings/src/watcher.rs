//! Configuration file watching
//!
//! One watcher per reader, watching the reader's directory
//! (non-recursively) for its `config.yaml`. Events flow through a bounded
//! channel into a background thread; the thread debounces modifications by
//! SHA-256 of the current file bytes so editors that fire several events per
//! save trigger one reload.

use crate::reader::{SettingsReader, CONFIG_FILE};
use crate::SettingsError;
use notify::{Event, EventKind, RecursiveMode, Watcher};
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::mpsc::{sync_channel, Receiver, SyncSender, TrySendError};
use std::sync::Arc;

// Bounded queue between the notify callback and the worker thread. When the
// queue is full the event is dropped; a follow-up event or the hash check
// recovers the state.
const EVENT_QUEUE_DEPTH: usize = 64;

/// Watches one reader's directory and keeps the reader loaded.
///
/// Dropping the watcher stops the background thread.
pub struct SettingsWatcher {
    // Dropping the notify watcher closes the event source and, with it, the
    // worker's channel; the detached worker then drains and exits.
    _watcher: notify::RecommendedWatcher,
    _worker: std::thread::JoinHandle<()>,
}

impl std::fmt::Debug for SettingsWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsWatcher").finish_non_exhaustive()
    }
}

impl SettingsWatcher {
    /// Install a watcher for `reader`. The watched directory must exist;
    /// callers skip watching otherwise.
    pub fn install(reader: Arc<SettingsReader>) -> Result<Self, SettingsError> {
        let (tx, rx): (SyncSender<Event>, Receiver<Event>) = sync_channel(EVENT_QUEUE_DEPTH);

        let mut watcher = notify::recommended_watcher(move |result: Result<Event, notify::Error>| {
            match result {
                Ok(event) => match tx.try_send(event) {
                    Ok(()) | Err(TrySendError::Full(_)) => {}
                    Err(TrySendError::Disconnected(_)) => {}
                },
                Err(err) => tracing::error!("settings watch error: {err}"),
            }
        })
        .map_err(|err| SettingsError::Watch(err.to_string()))?;

        let dir = reader
            .settings_file()
            .parent()
            .ok_or_else(|| SettingsError::Watch("settings file has no parent".to_string()))?;
        watcher
            .watch(dir, RecursiveMode::NonRecursive)
            .map_err(|err| SettingsError::Watch(err.to_string()))?;

        let worker = std::thread::Builder::new()
            .name("settings-watch".to_string())
            .spawn(move || event_loop(&reader, &rx))
            .map_err(|err| SettingsError::Watch(err.to_string()))?;

        Ok(Self {
            _watcher: watcher,
            _worker: worker,
        })
    }
}

fn event_loop(reader: &Arc<SettingsReader>, rx: &Receiver<Event>) {
    let mut known_hash = file_sha256(reader.settings_file());

    while let Ok(event) = rx.recv() {
        if !event
            .paths
            .iter()
            .any(|path| path.file_name().is_some_and(|name| name == CONFIG_FILE))
        {
            continue;
        }

        match event.kind {
            EventKind::Remove(_) => {
                tracing::warn!("Config Watch File Deleted: {:?}", reader.settings_file());
                reader.clear();
                known_hash = None;
            }
            EventKind::Create(_) => {
                tracing::warn!("Config Watch File Created: {:?}", reader.settings_file());
                known_hash = file_sha256(reader.settings_file());
                reload(reader);
            }
            EventKind::Modify(_) => {
                let new_hash = file_sha256(reader.settings_file());
                if new_hash != known_hash {
                    tracing::warn!("Config Watch File Changed: {:?}", reader.settings_file());
                    known_hash = new_hash;
                    reload(reader);
                }
            }
            _ => {}
        }
    }
}

fn reload(reader: &Arc<SettingsReader>) {
    if let Err(err) = reader.reload() {
        tracing::error!(
            "Error reading in settings file {:?}. {err}",
            reader.settings_file()
        );
    }
}

fn file_sha256(path: &Path) -> Option<String> {
    let bytes = std::fs::read(path).ok()?;
    Some(hex::encode(Sha256::digest(&bytes)))
}
