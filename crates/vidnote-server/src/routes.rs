//! HTTP routes under `/api`.

use crate::error::ApiError;
use crate::records::AnnotationFile;
use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use vidnote_core::Annotation;
use vidnote_core::annotation::now_iso8601;

type Shared = State<Arc<AnnotationFile>>;

/// Success envelope.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn data(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            timestamp: None,
        }
    }

    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: None,
            message: Some(message.into()),
            timestamp: None,
        }
    }

    fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkRequest {
    #[serde(default)]
    pub annotations: Value,
    #[serde(default)]
    pub video_id: Option<String>,
}

pub fn router(records: Arc<AnnotationFile>) -> Router {
    let api = Router::new()
        .route("/annotations", get(list_all).post(create).delete(delete_all))
        .route("/annotations/bulk", post(save_bulk))
        .route(
            "/annotations/{key}",
            get(list_for_video).put(update).delete(delete_one),
        )
        .route("/health", get(health));

    Router::new()
        .nest("/api", api)
        .fallback(not_found)
        .with_state(records)
}

fn json_body(body: Result<Json<Value>, JsonRejection>) -> Result<Value, ApiError> {
    body.map(|Json(value)| value)
        .map_err(|e| ApiError::BadRequest(e.body_text()))
}

async fn list_all(State(records): Shared) -> Json<ApiResponse<Vec<Annotation>>> {
    Json(ApiResponse::data(records.all().await))
}

async fn list_for_video(
    State(records): Shared,
    Path(video_id): Path<String>,
) -> Json<ApiResponse<Vec<Annotation>>> {
    Json(ApiResponse::data(records.for_video(&video_id).await))
}

async fn create(
    State(records): Shared,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<Annotation>>), ApiError> {
    let created = records.create(json_body(body)?).await?;
    tracing::debug!("Created annotation {}", created.id);
    Ok((StatusCode::CREATED, Json(ApiResponse::data(created))))
}

async fn save_bulk(
    State(records): Shared,
    body: Result<Json<BulkRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<Vec<Annotation>>>, ApiError> {
    let Json(request) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let saved = records.save_bulk(request.annotations, request.video_id).await?;
    let message = format!("Saved {} annotations", saved.len());
    tracing::info!("{message}");
    Ok(Json(ApiResponse::data(saved).with_message(message)))
}

async fn update(
    State(records): Shared,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<ApiResponse<Annotation>>, ApiError> {
    let updated = records.update(&id, json_body(body)?).await?;
    Ok(Json(ApiResponse::data(updated)))
}

async fn delete_one(
    State(records): Shared,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Annotation>>, ApiError> {
    let removed = records.delete(&id).await?;
    Ok(Json(ApiResponse::data(removed)))
}

async fn delete_all(State(records): Shared) -> Result<Json<ApiResponse<()>>, ApiError> {
    records.clear().await?;
    Ok(Json(ApiResponse::message("All annotations deleted")))
}

/// Health check
async fn health() -> Json<ApiResponse<()>> {
    Json(ApiResponse {
        timestamp: Some(now_iso8601()),
        ..ApiResponse::message("Annotation API is running")
    })
}

async fn not_found() -> ApiError {
    ApiError::NotFound("Route not found".to_string())
}
