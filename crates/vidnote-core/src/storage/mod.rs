//! Storage abstraction for persistence.

mod file;
mod local;
mod memory;
mod remote;
mod sync;

pub use file::FileKeyValue;
pub use local::{LOCAL_STORAGE_KEY, LocalBackend};
pub use memory::MemoryKeyValue;
pub use remote::{DEFAULT_API_BASE_URL, RemoteBackend};
pub use sync::{
    DEFAULT_SAVE_DEBOUNCE, FlushReport, FlushStatus, LoadedBatch, PendingFlush, PendingLoad,
    PersistenceSync,
};

use crate::annotation::{Annotation, AnnotationId, DEFAULT_VIDEO_ID, IdGenerator};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;
use thiserror::Error;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("Storage error: {0}")]
    Other(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Boxed future for async operations.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Which backend persists annotations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Local,
    Remote,
}

impl BackendKind {
    pub fn toggled(self) -> Self {
        match self {
            BackendKind::Local => BackendKind::Remote,
            BackendKind::Remote => BackendKind::Local,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            BackendKind::Local => "local",
            BackendKind::Remote => "remote",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BackendKind {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(BackendKind::Local),
            "remote" => Ok(BackendKind::Remote),
            other => Err(StorageError::Other(format!("Unknown backend: {other}"))),
        }
    }
}

/// Synchronous string key-value store (the local durable store).
pub trait KeyValueStore: Send + Sync {
    /// Value stored under `key`, or `None` if the key was never written.
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Replace the value stored under `key`.
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;
}

/// A place annotations are loaded from and saved to, per video.
///
/// Returned futures own everything they need, so they can outlive the
/// arguments they were created from.
pub trait AnnotationBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Annotations stored for `video_id`.
    fn fetch(&self, video_id: &str) -> BoxFuture<'_, StorageResult<Vec<Annotation>>>;

    /// Replace the annotations stored for `video_id`.
    fn store(&self, annotations: &[Annotation], video_id: &str) -> BoxFuture<'_, StorageResult<()>>;

    /// Like [`fetch`](Self::fetch), but any failure yields an empty list.
    fn load_all(&self, video_id: &str) -> BoxFuture<'_, Vec<Annotation>> {
        let kind = self.kind();
        let fetched = self.fetch(video_id);
        Box::pin(async move {
            match fetched.await {
                Ok(annotations) => annotations,
                Err(e) => {
                    log::warn!("Failed to load annotations from {kind} storage: {e}");
                    Vec::new()
                }
            }
        })
    }

    /// Like [`store`](Self::store), but reports success as a flag.
    fn save_all(&self, annotations: &[Annotation], video_id: &str) -> BoxFuture<'_, bool> {
        let kind = self.kind();
        let stored = self.store(annotations, video_id);
        Box::pin(async move {
            match stored.await {
                Ok(()) => true,
                Err(e) => {
                    log::error!("Failed to save annotations to {kind} storage: {e}");
                    false
                }
            }
        })
    }
}

/// A persisted annotation list.
///
/// Elements that do not parse as annotations are kept verbatim in
/// `unparsed`, so rewriting the list never loses them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoredList {
    pub annotations: Vec<Annotation>,
    pub unparsed: Vec<serde_json::Value>,
}

impl StoredList {
    /// Split a JSON payload that should be a list of annotations.
    ///
    /// A payload that is not a list is treated as empty.
    pub fn from_value(value: serde_json::Value, source: &str) -> Self {
        let serde_json::Value::Array(items) = value else {
            log::warn!("Ignoring {source} payload: expected a list of annotations");
            return Self::default();
        };
        let mut list = Self::default();
        for item in items {
            match serde_json::from_value::<Annotation>(item.clone()) {
                Ok(annotation) => list.annotations.push(annotation),
                Err(e) => {
                    log::warn!("Skipping malformed annotation from {source}: {e}");
                    list.unparsed.push(item);
                }
            }
        }
        list
    }

    /// Drop every entry that belongs to `video_id`.
    pub fn remove_video(&mut self, video_id: &str) {
        self.annotations.retain(|a| a.video_id != video_id);
        self.unparsed.retain(|item| raw_video_id(item) != video_id);
    }

    /// Raise `ids` above every id in the list, parsed or not.
    pub fn observe_ids(&self, ids: &mut IdGenerator) {
        ids.observe(&self.annotations);
        for item in &self.unparsed {
            if let Some(id) = item.get("id").and_then(|v| v.as_f64()) {
                ids.observe_id(AnnotationId::new(id));
            }
        }
    }

    /// Parsed records first, then the unparsed elements in their original order.
    pub fn to_value(&self) -> serde_json::Result<serde_json::Value> {
        let mut items = Vec::with_capacity(self.annotations.len() + self.unparsed.len());
        for annotation in &self.annotations {
            items.push(serde_json::to_value(annotation)?);
        }
        items.extend(self.unparsed.iter().cloned());
        Ok(serde_json::Value::Array(items))
    }
}

fn raw_video_id(item: &serde_json::Value) -> &str {
    item.get("videoId")
        .and_then(|v| v.as_str())
        .unwrap_or(DEFAULT_VIDEO_ID)
}

/// Parse a JSON payload that should be a list of annotations.
///
/// A payload that is not a list is treated as empty; elements that don't
/// parse are skipped.
pub fn parse_annotation_list(value: serde_json::Value, source: &str) -> Vec<Annotation> {
    StoredList::from_value(value, source).annotations
}
