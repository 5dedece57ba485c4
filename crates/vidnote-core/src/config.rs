//! Session configuration.

use crate::annotation::DEFAULT_VIDEO_ID;
use crate::state::DEFAULT_ANNOTATION_DURATION;
use crate::storage::{BackendKind, DEFAULT_API_BASE_URL, DEFAULT_SAVE_DEBOUNCE, FileKeyValue};
use std::path::PathBuf;
use std::time::Duration;

/// How often the host samples the playback position by default.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Configuration for an annotation session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub video_id: String,
    pub api_base_url: String,
    /// Directory of the local file store. `None` keeps local data in memory.
    pub storage_dir: Option<PathBuf>,
    pub save_debounce: Duration,
    pub poll_interval: Duration,
    /// Visibility window length, in seconds, for new annotations.
    pub default_duration: f64,
    pub initial_backend: BackendKind,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            video_id: DEFAULT_VIDEO_ID.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            storage_dir: FileKeyValue::default_dir().ok(),
            save_debounce: DEFAULT_SAVE_DEBOUNCE,
            poll_interval: DEFAULT_POLL_INTERVAL,
            default_duration: DEFAULT_ANNOTATION_DURATION,
            initial_backend: BackendKind::Local,
        }
    }
}

impl SessionConfig {
    /// Defaults overridden by `VIDNOTE_*` environment variables.
    pub fn from_env() -> Self {
        Self::default().with_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides looked up by variable name.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(video_id) = lookup("VIDNOTE_VIDEO_ID").filter(|v| !v.is_empty()) {
            self.video_id = video_id;
        }
        if let Some(url) = lookup("VIDNOTE_API_URL").filter(|v| !v.is_empty()) {
            self.api_base_url = url;
        }
        if let Some(dir) = lookup("VIDNOTE_STORAGE_DIR").filter(|v| !v.is_empty()) {
            self.storage_dir = Some(PathBuf::from(dir));
        }
        if let Some(backend) = lookup("VIDNOTE_BACKEND") {
            match backend.parse() {
                Ok(kind) => self.initial_backend = kind,
                Err(e) => log::warn!("Ignoring VIDNOTE_BACKEND: {e}"),
            }
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.video_id, "default");
        assert_eq!(config.api_base_url, "http://localhost:3001/api");
        assert_eq!(config.save_debounce, Duration::from_millis(1000));
        assert_eq!(config.poll_interval, Duration::from_millis(100));
        assert_eq!(config.default_duration, 2.0);
        assert_eq!(config.initial_backend, BackendKind::Local);
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("VIDNOTE_VIDEO_ID", "lecture-3"),
            ("VIDNOTE_STORAGE_DIR", "/tmp/vidnote"),
            ("VIDNOTE_BACKEND", "Remote"),
        ]
        .into_iter()
        .collect();
        let config =
            SessionConfig::default().with_overrides(|name| vars.get(name).map(|v| v.to_string()));

        assert_eq!(config.video_id, "lecture-3");
        assert_eq!(config.storage_dir, Some(PathBuf::from("/tmp/vidnote")));
        assert_eq!(config.initial_backend, BackendKind::Remote);
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
    }

    #[test]
    fn test_bad_backend_is_ignored() {
        let config = SessionConfig::default()
            .with_overrides(|name| (name == "VIDNOTE_BACKEND").then(|| "ftp".to_string()));
        assert_eq!(config.initial_backend, BackendKind::Local);
    }
}
