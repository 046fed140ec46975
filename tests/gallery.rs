use std::sync::Arc;

use trendai::gallery::{GALLERY_KEY, GeneratedImage, Gallery};
use trendai::gemini::ImagePayload;
use trendai::store::{KvStore, MemoryBackend};
use trendai::trends;

fn gallery() -> (Gallery, KvStore) {
    let store = KvStore::new(Arc::new(MemoryBackend::new()));
    (Gallery::new(store.clone()), store)
}

fn payload(data: &str) -> ImagePayload {
    ImagePayload {
        data: data.to_string(),
        mime_type: "image/png".to_string(),
    }
}

fn record(id: &str, timestamp: i64) -> GeneratedImage {
    GeneratedImage {
        id: id.to_string(),
        source_image: payload("c291cmNl"),
        generated_image: payload("Z2VuZXJhdGVk"),
        trend_id: "90s-film-aesthetic".to_string(),
        prompt: "make it retro".to_string(),
        timestamp,
    }
}

#[test]
fn save_and_list_round_trip_is_lossless() {
    let (gallery, _) = gallery();
    let image = record("trendai-1000", 1000);
    gallery.save(image.clone()).unwrap();

    let listed = gallery.list();
    assert_eq!(listed, vec![image]);
}

#[test]
fn storage_keeps_insertion_order_and_list_sorts_newest_first() {
    let (gallery, store) = gallery();
    gallery.save(record("trendai-1000", 1000)).unwrap();
    gallery.save(record("trendai-3000", 3000)).unwrap();
    gallery.save(record("trendai-2000", 2000)).unwrap();

    let stored: Vec<GeneratedImage> = store.get(GALLERY_KEY).unwrap();
    let stored_ids: Vec<&str> = stored.iter().map(|image| image.id.as_str()).collect();
    assert_eq!(stored_ids, ["trendai-1000", "trendai-3000", "trendai-2000"]);

    let listed_ids: Vec<String> = gallery.list().into_iter().map(|image| image.id).collect();
    assert_eq!(listed_ids, ["trendai-3000", "trendai-2000", "trendai-1000"]);
}

#[test]
fn delete_removes_only_the_matching_record() {
    let (gallery, _) = gallery();
    gallery.save(record("trendai-1000", 1000)).unwrap();
    gallery.save(record("trendai-2000", 2000)).unwrap();

    gallery.delete("trendai-1000").unwrap();
    let remaining: Vec<String> = gallery.list().into_iter().map(|image| image.id).collect();
    assert_eq!(remaining, ["trendai-2000"]);

    // Deleting an unknown id is a no-op.
    gallery.delete("trendai-9999").unwrap();
    assert_eq!(gallery.list().len(), 1);
}

#[test]
fn clear_empties_the_gallery() {
    let (gallery, _) = gallery();
    gallery.save(record("trendai-1000", 1000)).unwrap();
    gallery.clear().unwrap();
    assert!(gallery.list().is_empty());
}

#[test]
fn new_records_get_time_derived_ids() {
    let image = GeneratedImage::new(
        payload("c291cmNl"),
        payload("Z2VuZXJhdGVk"),
        "polaroid-flash-photo",
        "polaroid look",
    );
    assert!(image.id.starts_with("trendai-"));
    assert_eq!(image.id, format!("trendai-{}", image.timestamp));
}

#[test]
fn records_serialize_with_the_historical_field_names() {
    let image = record("trendai-1000", 1000);
    let value = serde_json::to_value(&image).unwrap();
    let keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
    assert!(keys.contains(&"sourceImage"));
    assert!(keys.contains(&"generatedImage"));
    assert!(keys.contains(&"trendId"));
    assert_eq!(value["sourceImage"]["mimeType"], "image/png");
}

#[test]
fn gallery_records_may_reference_retired_trends() {
    let (gallery, _) = gallery();
    let mut image = record("trendai-1000", 1000);
    image.trend_id = "retired-trend".to_string();
    gallery.save(image).unwrap();

    let listed = gallery.list();
    assert_eq!(trends::display_name(&listed[0].trend_id), "Unknown trend");
}
