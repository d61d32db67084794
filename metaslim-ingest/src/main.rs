//! metaslim-ingest - Study Ingest Service
//!
//! Extracts weight-loss drug trial cohorts from literature via the Gemini
//! API and reconciles them into the study dataset (local SQLite, or
//! Firestore when configured). Serves the ingest HTTP API with SSE
//! progress streaming.

use anyhow::Result;
use clap::Parser;
use metaslim_common::config::{ensure_root_folder, resolve_root_folder, TomlConfig};
use metaslim_common::events::EventBus;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use metaslim_ingest::extractors::GeminiClient;
use metaslim_ingest::services::Ingestor;
use metaslim_ingest::store::{FirestoreStore, SqliteStore, StudyStore};
use metaslim_ingest::AppState;

#[derive(Debug, Parser)]
#[command(name = "metaslim-ingest", about = "MetaSlim study ingest service")]
struct Args {
    /// Root folder holding the local database
    #[arg(long)]
    root_folder: Option<String>,

    /// Listen port
    #[arg(long, env = "METASLIM_PORT", default_value_t = 5731)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    info!("Starting metaslim-ingest (Study Ingest) service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    // Resolve root folder and open the local database
    let toml_config = TomlConfig::load_default();
    let root_folder = resolve_root_folder(
        args.root_folder.as_deref(),
        "METASLIM_ROOT_FOLDER",
        &toml_config,
    );
    let db_path = ensure_root_folder(&root_folder)
        .map_err(|e| anyhow::anyhow!("Failed to initialize root folder: {}", e))?;
    info!("Database: {}", db_path.display());

    let db_pool = metaslim_ingest::db::init_database_pool(&db_path).await?;
    info!("Database connection established");

    // Event bus for SSE broadcasting and dataset-change notification
    let event_bus = EventBus::new(100);

    // Select the store collaborator: Firestore when configured, SQLite otherwise
    let (store, store_backend): (Arc<dyn StudyStore>, String) =
        match metaslim_ingest::config::resolve_firestore(&toml_config) {
            Some(settings) => {
                info!("Using Firestore store (project: {})", settings.project_id);
                let store =
                    FirestoreStore::new(settings.project_id, settings.api_key, event_bus.clone())
                        .map_err(|e| anyhow::anyhow!("Firestore client init failed: {}", e))?;
                (Arc::new(store), "firestore".to_string())
            }
            None => {
                info!("Using local SQLite store");
                let store = SqliteStore::new(db_pool.clone(), event_bus.clone())
                    .await
                    .map_err(|e| anyhow::anyhow!("SQLite store init failed: {}", e))?;
                (Arc::new(store), "sqlite".to_string())
            }
        };

    // Extraction collaborator
    let gemini_api_key =
        metaslim_ingest::config::resolve_gemini_api_key(&db_pool, &toml_config).await?;
    let extractor = GeminiClient::new(gemini_api_key)
        .map_err(|e| anyhow::anyhow!("Gemini client init failed: {}", e))?;

    let ingestor = Arc::new(Ingestor::new(
        Arc::new(extractor),
        Arc::clone(&store),
        event_bus.clone(),
    ));

    // Create application state and serve
    let state = AppState::new(db_pool, store, ingestor, event_bus, store_backend);
    let app = metaslim_ingest::build_router(state);

    let listener = tokio::net::TcpListener::bind(("127.0.0.1", args.port)).await?;
    info!("Listening on http://127.0.0.1:{}", args.port);
    info!("Health check: http://127.0.0.1:{}/health", args.port);

    axum::serve(listener, app).await?;

    Ok(())
}
