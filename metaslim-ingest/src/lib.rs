//! metaslim-ingest library interface
//!
//! Exposes the ingest pipeline (extraction, filtering, reconciliation,
//! storage) and the HTTP surface for integration testing.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod reconcile;
pub mod services;
pub mod store;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use metaslim_common::events::EventBus;
use services::Ingestor;
use sqlx::SqlitePool;
use std::sync::Arc;
use store::StudyStore;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Local database (settings; studies when the SQLite store is active)
    pub db: SqlitePool,
    /// Active study store collaborator
    pub store: Arc<dyn StudyStore>,
    /// Ingest orchestrator
    pub ingestor: Arc<Ingestor>,
    /// Event bus for SSE broadcasting
    pub event_bus: EventBus,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Active backend name for diagnostics ("sqlite" or "firestore")
    pub store_backend: String,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        store: Arc<dyn StudyStore>,
        ingestor: Arc<Ingestor>,
        event_bus: EventBus,
        store_backend: String,
    ) -> Self {
        Self {
            db,
            store,
            ingestor,
            event_bus,
            startup_time: Utc::now(),
            store_backend,
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    Router::new()
        .merge(api::extract_routes())
        .merge(api::studies_routes())
        .route("/events", get(api::event_stream))
        .merge(api::health_routes())
        .with_state(state)
}
