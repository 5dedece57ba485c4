//! Remote annotation service backend (JSON over HTTP).

use super::{
    AnnotationBackend, BackendKind, BoxFuture, StorageError, StorageResult, parse_annotation_list,
};
use crate::annotation::Annotation;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Base URL of a locally running annotation service.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:3001/api";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Response envelope shared by every endpoint.
#[derive(Debug, Deserialize)]
struct Envelope {
    success: bool,
    #[serde(default)]
    data: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl Envelope {
    fn into_result(self) -> StorageResult<Option<serde_json::Value>> {
        if self.success {
            Ok(self.data)
        } else {
            Err(StorageError::Http(
                self.error.unwrap_or_else(|| "request failed".to_string()),
            ))
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BulkSave<'a> {
    annotations: &'a [Annotation],
    video_id: &'a str,
}

/// Backend talking to the annotation service.
#[derive(Clone)]
pub struct RemoteBackend {
    base_url: String,
    agent: ureq::Agent,
}

impl RemoteBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(REQUEST_TIMEOUT))
            .build()
            .into();
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            agent,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `{base}/annotations/{videoId}`, with the id as one encoded segment.
    fn annotations_url(&self, video_id: &str) -> StorageResult<String> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| StorageError::Other(format!("Invalid API URL {}: {e}", self.base_url)))?;
        url.path_segments_mut()
            .map_err(|_| StorageError::Other(format!("Invalid API URL {}", self.base_url)))?
            .pop_if_empty()
            .push("annotations")
            .push(video_id);
        Ok(url.into())
    }

    fn bulk_url(&self) -> String {
        format!("{}/annotations/bulk", self.base_url)
    }
}

impl Default for RemoteBackend {
    fn default() -> Self {
        Self::new(DEFAULT_API_BASE_URL)
    }
}

fn http_error(url: &str, e: ureq::Error) -> StorageError {
    StorageError::Http(format!("{url}: {e}"))
}

impl AnnotationBackend for RemoteBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Remote
    }

    fn fetch(&self, video_id: &str) -> BoxFuture<'_, StorageResult<Vec<Annotation>>> {
        let url = self.annotations_url(video_id);
        Box::pin(async move {
            let url = url?;
            log::debug!("GET {url}");
            let mut response = self.agent.get(&url).call().map_err(|e| http_error(&url, e))?;
            let envelope: Envelope = response
                .body_mut()
                .read_json()
                .map_err(|e| StorageError::Serialization(format!("{url}: {e}")))?;
            let data = envelope.into_result()?.unwrap_or(serde_json::Value::Null);
            Ok(parse_annotation_list(data, "remote service"))
        })
    }

    fn store(&self, annotations: &[Annotation], video_id: &str) -> BoxFuture<'_, StorageResult<()>> {
        let url = self.bulk_url();
        let body = serde_json::to_value(BulkSave { annotations, video_id });
        Box::pin(async move {
            let body = body.map_err(|e| StorageError::Serialization(e.to_string()))?;
            log::debug!("POST {url}");
            let mut response = self.agent.post(&url).send_json(&body).map_err(|e| http_error(&url, e))?;
            let envelope: Envelope = response
                .body_mut()
                .read_json()
                .map_err(|e| StorageError::Serialization(format!("{url}: {e}")))?;
            if let Some(message) = &envelope.message {
                log::debug!("Remote save: {message}");
            }
            envelope.into_result().map(|_| ())
        })
    }
}
