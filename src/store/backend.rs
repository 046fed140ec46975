use thiserror::Error;
use tokio::sync::broadcast;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode value for key '{key}': {source}")]
    Encode {
        key: String,
        source: serde_json::Error,
    },
    #[error("storage watcher failed: {0}")]
    Watch(#[from] notify::Error),
}

/// A change to a stored key made by another execution context sharing the
/// same durable medium. Changes made through a backend's own `write`/`delete`
/// are never reported on its watch channel.
#[derive(Clone, Debug)]
pub struct StorageEvent {
    pub key: String,
}

/// Key-scoped durable text storage. Implementations must broadcast external
/// mutations on the channel returned by [`watch`](StorageBackend::watch) so
/// that subscribers can react to writes from other processes.
pub trait StorageBackend: Send + Sync {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn write(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn delete(&self, key: &str) -> Result<(), StoreError>;
    fn watch(&self) -> broadcast::Receiver<StorageEvent>;
}
