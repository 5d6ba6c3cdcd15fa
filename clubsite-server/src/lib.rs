//! clubsite-server library interface
//!
//! Exposes the router and service wiring so integration tests can drive the
//! full HTTP stack against in-memory or fake backends.

pub mod api;
pub mod auth;
pub mod db;
pub mod error;
pub mod orchestrator;
pub mod reader;
pub mod storage;

pub use crate::error::{ApiError, ApiResult};

use axum::extract::DefaultBodyLimit;
use axum::Router;
use chrono::{DateTime, Utc};
use clubsite_common::config::ServiceConfig;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{IdentityVerifier, TokenVerifier};
use crate::db::{DocumentStore, DocumentWriter};
use crate::orchestrator::Orchestrator;
use crate::reader::{ContentReader, LegacyCsv};
use crate::storage::{ObjectStore, Uploader};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub verifier: Arc<IdentityVerifier>,
    pub orchestrator: Arc<Orchestrator>,
    pub reader: Arc<ContentReader>,
    /// Multipart body limit in bytes
    pub max_upload_bytes: usize,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    /// Wire the service objects around the given backends
    pub fn from_parts(
        verifier: Arc<dyn TokenVerifier>,
        objects: Arc<dyn ObjectStore>,
        documents: Arc<dyn DocumentStore>,
        config: &ServiceConfig,
    ) -> Self {
        let secrets = config.secrets();
        let timeouts = &config.timeouts;

        let uploader = Uploader::new(
            objects,
            Duration::from_millis(timeouts.upload_ms),
            secrets.clone(),
        );
        let writer = DocumentWriter::new(
            documents.clone(),
            Duration::from_millis(timeouts.write_ms),
            secrets.clone(),
        );

        Self {
            verifier: Arc::new(IdentityVerifier::new(
                verifier,
                Duration::from_millis(timeouts.verify_ms),
            )),
            orchestrator: Arc::new(Orchestrator::new(uploader, writer)),
            reader: Arc::new(ContentReader::new(
                documents,
                LegacyCsv::new(config.legacy.csv_dir.clone()),
                secrets,
            )),
            max_upload_bytes: config.server.max_upload_bytes,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let middleware = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(DefaultBodyLimit::max(state.max_upload_bytes));

    Router::new()
        .merge(api::health_routes())
        .merge(api::admin_routes())
        .merge(api::public_routes())
        .merge(api::download_routes())
        .layer(middleware)
        .with_state(state)
}
