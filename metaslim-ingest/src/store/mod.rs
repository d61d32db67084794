//! Study storage collaborators
//!
//! The reconciler and the API talk to storage only through the `StudyStore`
//! trait, injected at construction time. Two implementations exist:
//! `SqliteStore` (local fallback, always available) and `FirestoreStore`
//! (remote-backed, selected when a Firestore project is configured).
//!
//! Every successful mutation emits `MetaslimEvent::StudiesChanged` on the
//! shared event bus; `subscribe` turns that feed into the callback-style
//! observer the UI layer consumes.

mod firestore;
mod seed;
mod sqlite;

pub use firestore::FirestoreStore;
pub use seed::seed_records;
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use metaslim_common::events::MetaslimEvent;
use metaslim_common::normalize::normalize_for_display;
use metaslim_common::{CandidateRecord, Study, StudyId};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::warn;

/// Storage layer errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("study not found: {0}")]
    NotFound(StudyId),

    #[error("remote store error {status}: {message}")]
    Remote { status: u16, message: String },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Storage collaborator for the study dataset.
///
/// One mutation call per reconciliation decision; implementations assign
/// `id` and `created_at` at insert time and never change them afterwards.
#[async_trait]
pub trait StudyStore: Send + Sync {
    /// Insert a new study from an accepted candidate. Returns the assigned id.
    async fn add(&self, record: &CandidateRecord) -> Result<StudyId, StoreError>;

    /// Overwrite the candidate fields of an existing study.
    ///
    /// `id` and `created_at` are untouched. Fails with `NotFound` when the
    /// id does not exist.
    async fn update(&self, id: &str, record: &CandidateRecord) -> Result<(), StoreError>;

    /// Remove one study.
    async fn delete(&self, id: &str) -> Result<(), StoreError>;

    /// Remove the entire dataset.
    async fn delete_all(&self) -> Result<(), StoreError>;

    /// Full dataset snapshot, newest `created_at` first.
    async fn list(&self) -> Result<Vec<Study>, StoreError>;

    /// Change notification feed; fires after every successful mutation.
    fn changes(&self) -> broadcast::Receiver<MetaslimEvent>;
}

/// Handle for an active dataset subscription.
///
/// Dropping the handle (or calling `unsubscribe`) stops delivery.
pub struct StudySubscription {
    task: tokio::task::JoinHandle<()>,
}

impl StudySubscription {
    pub fn unsubscribe(self) {
        self.task.abort();
    }
}

impl Drop for StudySubscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Observe the dataset through a callback.
///
/// The callback receives the full display-normalized snapshot (newest first)
/// once immediately and again after every dataset change. Errors reading the
/// snapshot are logged and skipped; the subscription stays alive.
pub fn subscribe<F>(store: Arc<dyn StudyStore>, mut callback: F) -> StudySubscription
where
    F: FnMut(Vec<Study>) + Send + 'static,
{
    let mut rx = store.changes();
    let task = tokio::spawn(async move {
        deliver_snapshot(store.as_ref(), &mut callback).await;
        loop {
            match rx.recv().await {
                Ok(MetaslimEvent::StudiesChanged { .. }) => {
                    deliver_snapshot(store.as_ref(), &mut callback).await;
                }
                Ok(_) => {}
                // Lagging means we missed change events; the snapshot read
                // below covers whatever they carried.
                Err(broadcast::error::RecvError::Lagged(_)) => {
                    deliver_snapshot(store.as_ref(), &mut callback).await;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });
    StudySubscription { task }
}

async fn deliver_snapshot<F>(store: &dyn StudyStore, callback: &mut F)
where
    F: FnMut(Vec<Study>) + Send,
{
    match store.list().await {
        Ok(studies) => callback(normalize_for_display(studies)),
        Err(e) => warn!("Subscription snapshot read failed: {}", e),
    }
}
