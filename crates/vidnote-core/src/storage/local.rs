//! Local durable backend.
//!
//! Every video's annotations live as one JSON list under a single key.

use super::{
    AnnotationBackend, BackendKind, BoxFuture, KeyValueStore, MemoryKeyValue, StorageError,
    StorageResult, StoredList,
};
use crate::annotation::Annotation;
use std::sync::Arc;

/// Key holding the annotation list.
pub const LOCAL_STORAGE_KEY: &str = "video-annotations";

/// Backend over a [`KeyValueStore`].
#[derive(Clone)]
pub struct LocalBackend {
    store: Arc<dyn KeyValueStore>,
}

impl LocalBackend {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Backend over a fresh in-memory store.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryKeyValue::new()))
    }

    /// Everything stored, for all videos.
    fn read_all(&self) -> StorageResult<StoredList> {
        let Some(raw) = self.store.get(LOCAL_STORAGE_KEY)? else {
            return Ok(StoredList::default());
        };
        let value = serde_json::from_str(&raw)
            .map_err(|e| StorageError::Serialization(format!("Invalid local payload: {}", e)))?;
        Ok(StoredList::from_value(value, "local storage"))
    }
}

impl AnnotationBackend for LocalBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Local
    }

    fn fetch(&self, video_id: &str) -> BoxFuture<'_, StorageResult<Vec<Annotation>>> {
        let video_id = video_id.to_string();
        Box::pin(async move {
            let mut annotations = self.read_all()?.annotations;
            annotations.retain(|a| a.video_id == video_id);
            Ok(annotations)
        })
    }

    fn store(&self, annotations: &[Annotation], video_id: &str) -> BoxFuture<'_, StorageResult<()>> {
        let video_id = video_id.to_string();
        let annotations = annotations.to_vec();
        Box::pin(async move {
            // An unreadable payload is overwritten rather than blocking saves.
            let mut all = self.read_all().unwrap_or_else(|e| {
                log::warn!("Replacing unreadable local annotations: {e}");
                StoredList::default()
            });
            all.remove_video(&video_id);
            let count = annotations.len();
            all.annotations
                .extend(annotations.into_iter().map(|a| a.with_video_id(video_id.as_str())));

            let json = all
                .to_value()
                .map(|value| value.to_string())
                .map_err(|e| StorageError::Serialization(e.to_string()))?;
            self.store.set(LOCAL_STORAGE_KEY, &json)?;
            log::debug!("Saved {count} annotations for video {video_id} locally");
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::{AnnotationId, Shape, TextContent};
    use crate::storage::test_util::block_on;

    fn note(id: u64, video_id: &str) -> Annotation {
        Annotation::new(
            AnnotationId::new(id as f64),
            "#fff",
            0.0,
            2.0,
            Shape::Text(TextContent { x: 1.0, y: 2.0, text: format!("note {id}") }),
        )
        .with_video_id(video_id)
    }

    #[test]
    fn test_empty_store_loads_empty() {
        let backend = LocalBackend::in_memory();
        assert!(block_on(backend.fetch("default")).unwrap().is_empty());
    }

    #[test]
    fn test_save_and_load() {
        let backend = LocalBackend::in_memory();
        let list = vec![note(1, "default"), note(2, "default")];

        block_on(backend.store(&list, "default")).unwrap();
        assert_eq!(block_on(backend.fetch("default")).unwrap(), list);
    }

    #[test]
    fn test_save_replaces_only_that_video() {
        let backend = LocalBackend::in_memory();
        block_on(backend.store(&[note(1, "a")], "a")).unwrap();
        block_on(backend.store(&[note(2, "b"), note(3, "b")], "b")).unwrap();
        block_on(backend.store(&[note(4, "b")], "b")).unwrap();

        let a = block_on(backend.fetch("a")).unwrap();
        let b = block_on(backend.fetch("b")).unwrap();
        assert_eq!(a.iter().map(|x| x.id.value()).collect::<Vec<_>>(), vec![1.0]);
        assert_eq!(b.iter().map(|x| x.id.value()).collect::<Vec<_>>(), vec![4.0]);
    }

    #[test]
    fn test_fractional_ids_load_and_survive_saves() {
        let store = Arc::new(MemoryKeyValue::new());
        store
            .set(
                LOCAL_STORAGE_KEY,
                r##"[
                    {"id":1700000000000.4567,"tool":"text","color":"#fff","start":0,"end":2,
                     "x":1,"y":2,"text":"old","videoId":"a"},
                    {"id":1700000000001.25,"tool":"spline","videoId":"b"}
                ]"##,
            )
            .unwrap();
        let backend = LocalBackend::new(store.clone());

        let loaded = block_on(backend.fetch("a")).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, AnnotationId::new(1700000000000.4567));

        block_on(backend.store(&[note(7, "b")], "a")).unwrap();
        let raw = store.get(LOCAL_STORAGE_KEY).unwrap().unwrap();
        assert!(raw.contains("1700000000001.25"));
        assert!(raw.contains("spline"));
        assert!(!raw.contains("old"));
    }

    #[test]
    fn test_malformed_payload_loads_empty() {
        let store = Arc::new(MemoryKeyValue::new());
        store.set(LOCAL_STORAGE_KEY, "{ not json").unwrap();
        let backend = LocalBackend::new(store.clone());

        assert!(block_on(backend.fetch("default")).is_err());
        assert!(block_on(backend.load_all("default")).is_empty());

        store.set(LOCAL_STORAGE_KEY, r#"{"annotations": []}"#).unwrap();
        assert!(block_on(backend.fetch("default")).unwrap().is_empty());
    }

    #[test]
    fn test_save_overwrites_malformed_payload() {
        let store = Arc::new(MemoryKeyValue::new());
        store.set(LOCAL_STORAGE_KEY, "][").unwrap();
        let backend = LocalBackend::new(store);

        assert!(block_on(backend.save_all(&[note(9, "default")], "default")));
        assert_eq!(block_on(backend.load_all("default")).len(), 1);
    }
}
