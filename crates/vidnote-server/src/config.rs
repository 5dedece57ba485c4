//! Server configuration from the environment.

use axum::http::{HeaderValue, Method, header};
use std::path::PathBuf;
use tower_http::cors::CorsLayer;
use tracing::warn;

pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_DATA_FILE: &str = "annotations.json";

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub port: u16,
    pub data_file: PathBuf,
    /// Allowed browser origin. `None` allows any origin.
    pub cors_origin: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            data_file: PathBuf::from(DEFAULT_DATA_FILE),
            cors_origin: None,
        }
    }
}

impl ServerConfig {
    /// Read `PORT`, `VIDNOTE_DATA_FILE` and `CORS_ORIGIN`.
    pub fn from_env() -> Self {
        Self::default().with_overrides(|name| std::env::var(name).ok())
    }

    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(port) = lookup("PORT") {
            match port.parse() {
                Ok(port) => self.port = port,
                Err(e) => warn!("Ignoring PORT={port}: {e}"),
            }
        }
        if let Some(path) = lookup("VIDNOTE_DATA_FILE").filter(|p| !p.is_empty()) {
            self.data_file = PathBuf::from(path);
        }
        self.cors_origin = lookup("CORS_ORIGIN").filter(|o| !o.is_empty());
        self
    }

    pub fn cors_layer(&self) -> CorsLayer {
        let Some(origin) = &self.cors_origin else {
            return CorsLayer::permissive();
        };
        match HeaderValue::from_str(origin) {
            Ok(origin) => CorsLayer::new()
                .allow_origin(origin)
                .allow_credentials(true)
                .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
                .allow_headers([header::CONTENT_TYPE]),
            Err(e) => {
                warn!("Invalid CORS_ORIGIN {origin:?} ({e}), allowing any origin");
                CorsLayer::permissive()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default().with_overrides(|_| None);
        assert_eq!(config.port, 3001);
        assert_eq!(config.data_file, PathBuf::from("annotations.json"));
        assert_eq!(config.cors_origin, None);
    }

    #[test]
    fn test_overrides() {
        let config = ServerConfig::default().with_overrides(|name| match name {
            "PORT" => Some("8080".to_string()),
            "VIDNOTE_DATA_FILE" => Some("/var/lib/vidnote.json".to_string()),
            "CORS_ORIGIN" => Some("http://localhost:3000".to_string()),
            _ => None,
        });
        assert_eq!(config.port, 8080);
        assert_eq!(config.data_file, PathBuf::from("/var/lib/vidnote.json"));
        assert_eq!(config.cors_origin.as_deref(), Some("http://localhost:3000"));
    }

    #[test]
    fn test_bad_port_keeps_default() {
        let config = ServerConfig::default()
            .with_overrides(|name| (name == "PORT").then(|| "http".to_string()));
        assert_eq!(config.port, DEFAULT_PORT);
    }
}
