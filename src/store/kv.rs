use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::store::backend::{StorageBackend, StoreError};

/// Typed view over a [`StorageBackend`]. Values are stored as JSON documents
/// and always replaced wholesale; there is no partial update of a key.
#[derive(Clone)]
pub struct KvStore {
    backend: Arc<dyn StorageBackend>,
}

impl KvStore {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self { backend }
    }

    /// Reads and decodes the value under `key`. Malformed durable state is
    /// logged and reported as absent rather than surfaced as an error.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.backend.read(key) {
            Ok(raw) => raw?,
            Err(err) => {
                warn!(key, error = %err, "could not read stored value");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(key, error = %err, "discarding malformed stored value");
                None
            }
        }
    }

    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let encoded = serde_json::to_string(value).map_err(|source| StoreError::Encode {
            key: key.to_string(),
            source,
        })?;
        self.backend.write(key, &encoded)
    }

    pub fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.backend.delete(key)
    }

    /// Invokes `callback` once immediately with the current value under
    /// `key` (possibly `None`), then again each time another execution
    /// context changes that key. The subscriber's own writes through this
    /// store do not notify. Must be called within a Tokio runtime.
    pub fn subscribe<T, F>(&self, key: &str, callback: F) -> Subscription
    where
        T: DeserializeOwned + Send + 'static,
        F: Fn(Option<T>) + Send + Sync + 'static,
    {
        callback(self.get(key));

        let mut events = self.backend.watch();
        let store = self.clone();
        let key = key.to_string();
        let handle = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) if event.key == key => callback(store.get(&key)),
                    Ok(_) => {}
                    // Dropped events may have included ours; re-deliver the
                    // current state instead of guessing.
                    Err(RecvError::Lagged(_)) => callback(store.get(&key)),
                    Err(RecvError::Closed) => break,
                }
            }
        });
        Subscription { handle }
    }
}

/// Handle returned by [`KvStore::subscribe`]. Notifications stop when it is
/// unsubscribed or dropped.
pub struct Subscription {
    handle: JoinHandle<()>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        self.handle.abort();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
