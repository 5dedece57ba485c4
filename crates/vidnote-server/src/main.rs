//! vidnote annotation service
//!
//! Stores video annotations in a JSON file and serves them over HTTP.
//!
//! ## Endpoints
//!
//! ```text
//! GET    /api/annotations             all annotations
//! GET    /api/annotations/{videoId}   annotations of one video
//! POST   /api/annotations             create one
//! POST   /api/annotations/bulk        replace a video's (or all) annotations
//! PUT    /api/annotations/{id}        merge changes into one
//! DELETE /api/annotations/{id}        delete one
//! DELETE /api/annotations             delete all
//! GET    /api/health                  liveness
//! ```
//!
//! Every response is `{ "success": bool, "data"?, "error"?, "message"? }`.

mod config;
mod error;
mod records;
mod routes;

use config::ServerConfig;
use records::AnnotationFile;
use std::{net::SocketAddr, sync::Arc};
use tower_http::trace::TraceLayer;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vidnote_server=info,tower_http=info".into()),
        )
        .init();

    let config = ServerConfig::from_env();
    let records = Arc::new(AnnotationFile::open(config.data_file.clone()).await?);

    let app = routes::router(Arc::clone(&records))
        .layer(config.cors_layer())
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Annotation API listening on {}", addr);
    info!("Data file: {}", records.path().display());

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
