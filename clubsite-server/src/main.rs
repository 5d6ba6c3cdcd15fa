//! clubsite-server - club website backend
//!
//! Serves the public JSON API for news, board members, pilots, sponsors and
//! static page content, plus the admin API that uploads files to object
//! storage and writes documents to the document database.

use anyhow::{Context, Result};
use clap::Parser;
use clubsite_common::config::{BackendKind, ConfigResolver, ServiceConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use clubsite_server::auth::{IdentityToolkitVerifier, StaticTokenVerifier, TokenVerifier};
use clubsite_server::db::{DocumentStore, FirestoreStore, MemoryDocumentStore};
use clubsite_server::storage::{GcsObjectStore, MemoryObjectStore, ObjectStore};
use clubsite_server::AppState;

/// Command-line arguments for clubsite-server
#[derive(Parser, Debug)]
#[command(name = "clubsite-server")]
#[command(about = "Club website content service")]
#[command(version)]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long, env = "CLUBSITE_CONFIG")]
    config: Option<PathBuf>,

    /// Listen address, overrides `server.bind`
    #[arg(short, long)]
    bind: Option<String>,

    /// Backend implementations to use, overrides `backend.kind`
    #[arg(long, value_parser = ["google", "memory"])]
    backend: Option<String>,
}

type Backends = (Arc<dyn TokenVerifier>, Arc<dyn ObjectStore>, Arc<dyn DocumentStore>);

fn google_backends(config: &ServiceConfig) -> Result<Backends> {
    let client = reqwest::Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")?;

    if config.auth.identity_api_key.is_none() {
        warn!("No identity provider API key configured: admin writes will fail with NOT_CONFIGURED");
    }
    if config.storage.bucket.is_none() {
        warn!("No storage bucket configured: uploads will fail with STORAGE_UNAVAILABLE");
    }
    if config.firestore.project_id.is_none() {
        warn!("No document database project configured: reads and writes will fail with NOT_CONFIGURED");
    }
    if config.backend.access_token.is_none() {
        warn!("No access token configured: storage and database calls are unauthenticated");
    }

    let token = config.backend.access_token.clone();
    let verifier: Arc<dyn TokenVerifier> =
        Arc::new(IdentityToolkitVerifier::new(client.clone(), &config.auth));
    let objects: Arc<dyn ObjectStore> =
        Arc::new(GcsObjectStore::new(client.clone(), &config.storage, token.clone()));
    let documents: Arc<dyn DocumentStore> =
        Arc::new(FirestoreStore::new(client, &config.firestore, token));
    Ok((verifier, objects, documents))
}

fn memory_backends(config: &ServiceConfig) -> Backends {
    warn!("Using in-memory backends: data is lost on restart");
    if config.auth.static_tokens.is_empty() {
        warn!("No static admin tokens configured: admin writes will fail with NOT_CONFIGURED");
    }

    // Memory objects are not served over HTTP; the prefix only shapes URLs
    let public_prefix = format!("http://{}/objects/", config.server.bind);
    let verifier: Arc<dyn TokenVerifier> =
        Arc::new(StaticTokenVerifier::new(config.auth.static_tokens.clone()));
    let objects: Arc<dyn ObjectStore> = Arc::new(MemoryObjectStore::new(public_prefix));
    let documents: Arc<dyn DocumentStore> = Arc::new(MemoryDocumentStore::new());
    (verifier, objects, documents)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting clubsite-server v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let args = Args::parse();

    let mut config = ConfigResolver::new(args.config)
        .load()
        .context("Failed to load configuration")?;
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    match args.backend.as_deref() {
        Some("memory") => config.backend.kind = BackendKind::Memory,
        Some("google") => config.backend.kind = BackendKind::Google,
        _ => {}
    }

    info!("Backend: {:?}", config.backend.kind);
    let (verifier, objects, documents) = match config.backend.kind {
        BackendKind::Google => google_backends(&config)?,
        BackendKind::Memory => memory_backends(&config),
    };

    let state = AppState::from_parts(verifier, objects, documents, &config);
    let app = clubsite_server::build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.server.bind))?;
    info!("Listening on http://{}", config.server.bind);
    info!("Health check: http://{}/health", config.server.bind);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
