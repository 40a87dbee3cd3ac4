use std::sync::Arc;
use std::time::Duration;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use doc_vault::{
    api,
    config::{Config, StorageBackend},
    lifecycle::LifecycleEngine,
    object_store as obj,
    share::ShareEngine,
    storage::Database,
    AppState,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());

    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();
    match log_format.to_lowercase().as_str() {
        "gcp" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_stackdriver::layer())
                .init();
        }
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_target(true)
                        .with_span_list(false),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    info!(version = env!("CARGO_PKG_VERSION"), "doc-vault starting");

    // Load configuration
    let config = Config::load()?;

    // Initialize database
    let db = Database::open(&config.node.data_dir)?;
    info!("Database opened at: {}", config.node.data_dir);

    // Initialize object store backend
    let mut local_blobs = None;
    let object_store: Arc<dyn obj::ObjectStore> = match config.storage.backend {
        StorageBackend::Local => {
            let store = Arc::new(obj::LocalStore::new(
                &config.storage.local_storage_path,
                &config.storage.public_base_url,
                config.storage.blob_signing_secret.as_deref(),
            )?);
            info!(
                "Using local storage backend at: {}",
                config.storage.local_storage_path
            );
            local_blobs = Some(Arc::clone(&store));
            store
        }
        StorageBackend::Gcs => {
            let bucket = config
                .storage
                .gcs_bucket
                .as_deref()
                .expect("GCS_BUCKET validated in config");
            let store =
                obj::GcsStore::new(bucket, config.storage.gcs_credentials_file.as_deref()).await?;
            info!("Using GCS storage backend, bucket: {}", bucket);
            Arc::new(store)
        }
    };

    // Wire up the engines; the database doubles as the metadata store adapter.
    let meta: Arc<dyn doc_vault::storage::MetadataStore> = Arc::new(db.clone());
    let lifecycle = LifecycleEngine::new(Arc::clone(&meta), Arc::clone(&object_store));
    let shares = ShareEngine::new(
        Arc::clone(&meta),
        Arc::clone(&object_store),
        Duration::from_secs(config.share.public_link_ttl_secs),
        Duration::from_secs(config.share.access_link_ttl_secs),
    );

    // Create shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        db,
        object_store,
        local_blobs,
        lifecycle,
        shares,
    });

    // Build and start the HTTP server
    let app = api::create_router(Arc::clone(&state));
    let listener = tokio::net::TcpListener::bind(&config.node.bind_address).await?;
    info!("Listening on: {}", config.node.bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, draining connections");
}
