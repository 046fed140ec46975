pub mod backend;
pub mod file;
pub mod hash;
pub mod kv;
pub mod memory;

pub use backend::{StorageBackend, StorageEvent, StoreError};
pub use file::FileBackend;
pub use kv::{KvStore, Subscription};
pub use memory::MemoryBackend;
