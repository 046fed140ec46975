use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::gemini::ImagePayload;
use crate::store::{KvStore, StoreError, Subscription};

pub const GALLERY_KEY: &str = "trendai-gallery";

/// A saved generation result. Immutable once created; removed only by an
/// explicit delete or a wholesale clear of the gallery key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedImage {
    pub id: String,
    pub source_image: ImagePayload,
    pub generated_image: ImagePayload,
    pub trend_id: String,
    pub prompt: String,
    pub timestamp: i64,
}

impl GeneratedImage {
    pub fn new(
        source_image: ImagePayload,
        generated_image: ImagePayload,
        trend_id: impl Into<String>,
        prompt: impl Into<String>,
    ) -> Self {
        let now = Utc::now().timestamp_millis();
        Self {
            id: format!("trendai-{now}"),
            source_image,
            generated_image,
            trend_id: trend_id.into(),
            prompt: prompt.into(),
            timestamp: now,
        }
    }
}

/// The persisted collection of saved generation results, stored wholesale
/// under a single key in insertion order.
#[derive(Clone)]
pub struct Gallery {
    store: KvStore,
}

impl Gallery {
    pub fn new(store: KvStore) -> Self {
        Self { store }
    }

    fn stored(&self) -> Vec<GeneratedImage> {
        self.store.get(GALLERY_KEY).unwrap_or_default()
    }

    pub fn save(&self, image: GeneratedImage) -> Result<(), StoreError> {
        let mut images = self.stored();
        images.push(image);
        self.store.set(GALLERY_KEY, &images)
    }

    /// Newest first. Storage keeps insertion order; the display ordering is
    /// applied at read time.
    pub fn list(&self) -> Vec<GeneratedImage> {
        let mut images = self.stored();
        images.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        images
    }

    pub fn delete(&self, id: &str) -> Result<(), StoreError> {
        let mut images = self.stored();
        images.retain(|image| image.id != id);
        self.store.set(GALLERY_KEY, &images)
    }

    pub fn clear(&self) -> Result<(), StoreError> {
        self.store.remove(GALLERY_KEY)
    }

    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(Option<Vec<GeneratedImage>>) + Send + Sync + 'static,
    {
        self.store.subscribe(GALLERY_KEY, callback)
    }
}
