use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use tokio::sync::broadcast;

use crate::store::backend::{StorageBackend, StorageEvent, StoreError};

/// In-memory backend, used in tests and by embedders that do not want
/// durable state. Foreign-context mutations are simulated through
/// [`apply_external`](MemoryBackend::apply_external).
pub struct MemoryBackend {
    entries: Mutex<HashMap<String, String>>,
    events: broadcast::Sender<StorageEvent>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            entries: Mutex::new(HashMap::new()),
            events,
        }
    }

    /// Applies a mutation as if it came from another execution context
    /// sharing the same medium, and broadcasts the change.
    pub fn apply_external(&self, key: &str, value: Option<&str>) {
        {
            let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
            match value {
                Some(value) => entries.insert(key.to_string(), value.to_string()),
                None => entries.remove(key),
            };
        }
        let _ = self.events.send(StorageEvent {
            key: key.to_string(),
        });
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageBackend for MemoryBackend {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }

    fn watch(&self) -> broadcast::Receiver<StorageEvent> {
        self.events.subscribe()
    }
}
