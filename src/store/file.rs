use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::broadcast;
use tracing::warn;

use crate::store::backend::{StorageBackend, StorageEvent, StoreError};
use crate::store::hash::content_digest;

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Digest recorded after a local `delete`, so the watcher can tell our own
/// removals apart from a foreign process deleting the same file.
const TOMBSTONE: &str = "tombstone";

/// Durable backend keeping one JSON document per key under `base_dir`.
///
/// A filesystem watcher on the directory turns writes from other processes
/// into [`StorageEvent`]s. Events caused by this instance's own writes are
/// filtered out by comparing the file's content digest against the digest
/// recorded at write time.
pub struct FileBackend {
    base_dir: PathBuf,
    events: broadcast::Sender<StorageEvent>,
    last_written: Arc<Mutex<HashMap<String, String>>>,
    _watcher: Mutex<RecommendedWatcher>,
}

impl FileBackend {
    pub fn new(base_dir: PathBuf) -> Result<Self, StoreError> {
        fs::create_dir_all(&base_dir)?;
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let last_written = Arc::new(Mutex::new(HashMap::new()));

        let tx = events.clone();
        let own_writes = last_written.clone();
        let watched_dir = base_dir.clone();
        let mut watcher =
            notify::recommended_watcher(move |result: notify::Result<notify::Event>| {
                let event = match result {
                    Ok(event) => event,
                    Err(err) => {
                        warn!(error = %err, "storage watcher error");
                        return;
                    }
                };
                if !matches!(
                    event.kind,
                    EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
                ) {
                    return;
                }
                for path in event.paths {
                    let Some(key) = key_for_path(&watched_dir, &path) else {
                        continue;
                    };
                    let digest = match fs::read_to_string(&path) {
                        Ok(text) => content_digest(&text),
                        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                            TOMBSTONE.to_string()
                        }
                        Err(err) => {
                            warn!(key = %key, error = %err, "could not inspect changed storage file");
                            continue;
                        }
                    };
                    let own = own_writes
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .get(&key)
                        .cloned();
                    if own.as_deref() == Some(digest.as_str()) {
                        continue;
                    }
                    let _ = tx.send(StorageEvent { key });
                }
            })?;
        watcher.watch(&base_dir, RecursiveMode::NonRecursive)?;

        Ok(Self {
            base_dir,
            events,
            last_written,
            _watcher: Mutex::new(watcher),
        })
    }

    pub fn resolve_path(&self, key: &str) -> PathBuf {
        let normalized = key.trim_start_matches('/');
        self.base_dir.join(format!("{normalized}.json"))
    }

    fn record_own_write(&self, key: &str, digest: String) {
        self.last_written
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), digest);
    }
}

impl StorageBackend for FileBackend {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(self.resolve_path(key)) {
            Ok(text) => Ok(Some(text)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.record_own_write(key, content_digest(value));
        let path = self.resolve_path(key);
        // Write-then-rename keeps the watcher from ever observing a
        // half-written document.
        let staging = path.with_extension("json.tmp");
        fs::write(&staging, value)?;
        fs::rename(&staging, &path)?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.record_own_write(key, TOMBSTONE.to_string());
        match fs::remove_file(self.resolve_path(key)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    fn watch(&self) -> broadcast::Receiver<StorageEvent> {
        self.events.subscribe()
    }
}

fn key_for_path(base_dir: &Path, path: &Path) -> Option<String> {
    if path.parent() != Some(base_dir) {
        return None;
    }
    path.file_name()?
        .to_str()?
        .strip_suffix(".json")
        .map(str::to_string)
}
