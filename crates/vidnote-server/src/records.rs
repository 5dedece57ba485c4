//! Annotation records kept in a JSON file.
//!
//! The file is the source of truth: every request reads it and every
//! change rewrites it. A single lock serializes access. Entries that do not
//! parse as annotations are written back untouched.

use crate::error::ApiError;
use serde_json::{Map, Value};
use std::fmt::Display;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{error, info, warn};
use vidnote_core::annotation::now_iso8601;
use vidnote_core::storage::StoredList;
use vidnote_core::{Annotation, AnnotationId, DEFAULT_VIDEO_ID, IdGenerator, Shape};

/// Fields a new annotation must carry.
const REQUIRED_FIELDS: [&str; 3] = ["tool", "start", "end"];

pub struct AnnotationFile {
    path: PathBuf,
    /// Held for the whole read-modify-write of each request.
    ids: Mutex<IdGenerator>,
}

impl AnnotationFile {
    /// Open the data file, creating it with an empty list if missing.
    pub async fn open(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        if !fs::try_exists(&path).await? {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent).await?;
            }
            fs::write(&path, "[]").await?;
            info!("Created data file {}", path.display());
        }
        Ok(Self {
            path,
            ids: Mutex::new(IdGenerator::new()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current contents. An unreadable or non-list file reads as empty.
    async fn read(&self) -> StoredList {
        let raw = match fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Failed to read {}: {e}", self.path.display());
                return StoredList::default();
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => StoredList::from_value(value, "data file"),
            Err(e) => {
                warn!("Failed to parse {}: {e}", self.path.display());
                StoredList::default()
            }
        }
    }

    async fn write(&self, stored: &StoredList) -> io::Result<()> {
        let value = stored.to_value().map_err(io::Error::other)?;
        let json = serde_json::to_string_pretty(&value).map_err(io::Error::other)?;
        fs::write(&self.path, json).await
    }

    pub async fn all(&self) -> Vec<Annotation> {
        let _guard = self.ids.lock().await;
        self.read().await.annotations
    }

    pub async fn for_video(&self, video_id: &str) -> Vec<Annotation> {
        let _guard = self.ids.lock().await;
        let mut records = self.read().await.annotations;
        records.retain(|a| a.video_id == video_id);
        records
    }

    /// Add one annotation. Fields in `body` override the generated
    /// `id`/`createdAt`/`updatedAt`.
    pub async fn create(&self, body: Value) -> Result<Annotation, ApiError> {
        let Value::Object(fields) = body else {
            return Err(ApiError::BadRequest("Request body must be a JSON object".to_string()));
        };
        if let Some(field) = REQUIRED_FIELDS.iter().find(|f| is_missing(fields.get(**f))) {
            return Err(ApiError::BadRequest(format!("Missing required field: {field}")));
        }

        let mut ids = self.ids.lock().await;
        let mut stored = self.read().await;
        stored.observe_ids(&mut ids);

        let now = now_iso8601();
        let mut record = Map::new();
        record.insert("id".to_string(), id_value(&mut ids)?);
        record.insert("createdAt".to_string(), Value::from(now.clone()));
        record.insert("updatedAt".to_string(), Value::from(now));
        record.extend(fields);
        let annotation = validate(Value::Object(record))?;

        stored.annotations.push(annotation.clone());
        self.write(&stored)
            .await
            .map_err(|e| internal("Failed to create annotation", e))?;
        Ok(annotation)
    }

    /// Replace the records of one video, or all records when `video_id` is
    /// absent. Returns the saved records.
    pub async fn save_bulk(
        &self,
        annotations: Value,
        video_id: Option<String>,
    ) -> Result<Vec<Annotation>, ApiError> {
        let Value::Array(items) = annotations else {
            return Err(ApiError::BadRequest("Annotations must be an array".to_string()));
        };
        let target = video_id.filter(|v| !v.is_empty());

        let mut ids = self.ids.lock().await;
        let mut stored = self.read().await;
        stored.observe_ids(&mut ids);

        let now = now_iso8601();
        let mut saved = Vec::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            let Value::Object(mut fields) = item else {
                return Err(ApiError::BadRequest(format!("Annotation at index {index} must be an object")));
            };
            if is_missing(fields.get("id")) {
                fields.insert("id".to_string(), id_value(&mut ids)?);
            }
            let video = target.as_deref().unwrap_or(DEFAULT_VIDEO_ID);
            fields.insert("videoId".to_string(), Value::from(video));
            if is_missing(fields.get("createdAt")) {
                fields.insert("createdAt".to_string(), Value::from(now.clone()));
            }
            fields.insert("updatedAt".to_string(), Value::from(now.clone()));
            let annotation = validate(Value::Object(fields))
                .map_err(|e| ApiError::BadRequest(format!("Annotation at index {index}: {e}")))?;
            saved.push(annotation);
        }

        match &target {
            Some(video) => {
                stored.remove_video(video);
                stored.annotations.extend(saved.iter().cloned());
            }
            None => {
                stored = StoredList {
                    annotations: saved.clone(),
                    unparsed: Vec::new(),
                }
            }
        }
        self.write(&stored)
            .await
            .map_err(|e| internal("Failed to save annotations", e))?;
        Ok(saved)
    }

    /// Merge `body` into the record with `id`, keeping its id and creation time.
    pub async fn update(&self, id: &str, body: Value) -> Result<Annotation, ApiError> {
        let Value::Object(changes) = body else {
            return Err(ApiError::BadRequest("Request body must be a JSON object".to_string()));
        };

        let _guard = self.ids.lock().await;
        let mut stored = self.read().await;
        let index = position(&stored.annotations, id).ok_or_else(ApiError::annotation_not_found)?;
        let existing = &stored.annotations[index];

        let mut merged = match serde_json::to_value(existing) {
            Ok(Value::Object(fields)) => fields,
            Ok(_) => return Err(internal("Failed to update annotation", "record is not an object")),
            Err(e) => return Err(internal("Failed to update annotation", e)),
        };
        merged.extend(changes);
        merged.insert("id".to_string(), to_json(existing.id)?);
        merged.insert("createdAt".to_string(), Value::from(existing.created_at.clone()));
        merged.insert("updatedAt".to_string(), Value::from(now_iso8601()));
        let updated = validate(Value::Object(merged))?;

        stored.annotations[index] = updated.clone();
        self.write(&stored)
            .await
            .map_err(|e| internal("Failed to update annotation", e))?;
        Ok(updated)
    }

    /// Remove and return the record with `id`.
    pub async fn delete(&self, id: &str) -> Result<Annotation, ApiError> {
        let _guard = self.ids.lock().await;
        let mut stored = self.read().await;
        let index = position(&stored.annotations, id).ok_or_else(ApiError::annotation_not_found)?;
        let removed = stored.annotations.remove(index);
        self.write(&stored)
            .await
            .map_err(|e| internal("Failed to delete annotation", e))?;
        Ok(removed)
    }

    pub async fn clear(&self) -> Result<(), ApiError> {
        let _guard = self.ids.lock().await;
        self.write(&StoredList::default())
            .await
            .map_err(|e| internal("Failed to delete annotations", e))
    }
}

/// Absent, null, `false` and `""` all count as missing; `0` does not.
fn is_missing(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) | Some(Value::Bool(false)) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    }
}

fn validate(record: Value) -> Result<Annotation, ApiError> {
    let mut annotation: Annotation = serde_json::from_value(record)
        .map_err(|e| ApiError::BadRequest(format!("Invalid annotation: {e}")))?;
    if let Shape::Rectangle(g) | Shape::Circle(g) = &mut annotation.shape {
        g.normalize();
    }
    if !annotation.has_valid_window() {
        return Err(ApiError::BadRequest(format!(
            "Invalid annotation: end ({}) is before start ({})",
            annotation.end, annotation.start
        )));
    }
    Ok(annotation)
}

/// Path ids match numerically, so `5`, `5.0` and `5.00` name one record.
fn position(records: &[Annotation], id: &str) -> Option<usize> {
    let id: AnnotationId = id.parse().ok()?;
    records.iter().position(|a| a.id == id)
}

fn id_value(ids: &mut IdGenerator) -> Result<Value, ApiError> {
    let id = ids
        .next_id()
        .map_err(|e| internal("Failed to assign annotation id", e))?;
    to_json(id)
}

fn to_json(id: AnnotationId) -> Result<Value, ApiError> {
    serde_json::to_value(id).map_err(|e| internal("Failed to encode annotation id", e))
}

fn internal(context: &str, cause: impl Display) -> ApiError {
    error!("{context}: {cause}");
    ApiError::Internal(context.to_string())
}
