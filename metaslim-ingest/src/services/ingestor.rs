//! Per-document ingest orchestration
//!
//! Drives one submission (one or more documents) through extraction and
//! reconciliation. Documents run strictly sequentially and in isolation:
//! a failed document is reported and the next one still runs. Lifecycle
//! events stream to SSE clients via the shared event bus.

use crate::extractors::{CohortExtractor, ExtractError};
use crate::reconcile::{reconcile, ReconcileError};
use crate::store::{StoreError, StudyStore};
use chrono::Utc;
use metaslim_common::events::{EventBus, MetaslimEvent};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

/// One submitted document
#[derive(Debug, Clone)]
pub enum DocumentInput {
    /// Pasted or pre-extracted literature text
    Text { name: String, text: String },
    /// Literature screenshot or figure
    Image {
        name: String,
        mime_type: String,
        data: Vec<u8>,
    },
}

impl DocumentInput {
    pub fn name(&self) -> &str {
        match self {
            DocumentInput::Text { name, .. } => name,
            DocumentInput::Image { name, .. } => name,
        }
    }
}

/// Result reported for one document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentOutcome {
    pub name: String,
    pub success: bool,
    pub message: String,
}

/// Failure of one document's pipeline
#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    /// Snapshot read failure ahead of reconciliation
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct Ingestor {
    extractor: Arc<dyn CohortExtractor>,
    store: Arc<dyn StudyStore>,
    event_bus: EventBus,
}

impl Ingestor {
    pub fn new(
        extractor: Arc<dyn CohortExtractor>,
        store: Arc<dyn StudyStore>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            extractor,
            store,
            event_bus,
        }
    }

    /// Process a submission document by document.
    ///
    /// Returns one outcome per input, in input order.
    pub async fn ingest(&self, documents: Vec<DocumentInput>) -> Vec<DocumentOutcome> {
        let batch_id = Uuid::new_v4();
        let mut outcomes = Vec::with_capacity(documents.len());

        for document in documents {
            let name = document.name().to_string();
            self.event_bus.emit_lossy(MetaslimEvent::DocumentStarted {
                batch_id,
                document: name.clone(),
                timestamp: Utc::now(),
            });

            match self.process_document(batch_id, &document).await {
                Ok(message) => {
                    info!(document = %name, "Document ingested: {}", message);
                    self.event_bus.emit_lossy(MetaslimEvent::DocumentCompleted {
                        batch_id,
                        document: name.clone(),
                        message: message.clone(),
                        timestamp: Utc::now(),
                    });
                    outcomes.push(DocumentOutcome {
                        name,
                        success: true,
                        message,
                    });
                }
                Err(e) => {
                    let message = user_facing_message(&e);
                    warn!(document = %name, error = %e, "Document ingest failed");
                    self.event_bus.emit_lossy(MetaslimEvent::DocumentFailed {
                        batch_id,
                        document: name.clone(),
                        message: message.clone(),
                        timestamp: Utc::now(),
                    });
                    outcomes.push(DocumentOutcome {
                        name,
                        success: false,
                        message,
                    });
                }
            }
        }

        outcomes
    }

    async fn process_document(
        &self,
        batch_id: Uuid,
        document: &DocumentInput,
    ) -> Result<String, IngestError> {
        let name = document.name().to_string();
        self.progress(batch_id, &name, "AI is extracting data...");

        let candidates = match document {
            DocumentInput::Text { text, .. } => self.extractor.extract_text(text).await?,
            DocumentInput::Image {
                mime_type, data, ..
            } => self.extractor.extract_image(mime_type, data).await?,
        };

        self.progress(
            batch_id,
            &name,
            &format!(
                "Found {} cohort(s), filtering and saving...",
                candidates.len()
            ),
        );

        // Fresh snapshot per document so later documents match against
        // studies promoted by earlier ones
        let snapshot = self.store.list().await?;
        let outcome = reconcile(&candidates, &snapshot, self.store.as_ref()).await?;
        Ok(outcome.message())
    }

    fn progress(&self, batch_id: Uuid, document: &str, message: &str) {
        self.event_bus.emit_lossy(MetaslimEvent::DocumentProgress {
            batch_id,
            document: document.to_string(),
            message: message.to_string(),
            timestamp: Utc::now(),
        });
    }
}

/// Map a pipeline failure to the message shown to the curator.
///
/// Transport-layer interpretation (quota, key, permissions) lives here at
/// the caller side; the reconciliation core never inspects those. Batch
/// outcomes (`NoValidCohorts`, `AllOutOfScope`) pass through verbatim.
pub fn user_facing_message(error: &IngestError) -> String {
    if matches!(
        error,
        IngestError::Reconcile(ReconcileError::NoValidCohorts { .. })
            | IngestError::Reconcile(ReconcileError::AllOutOfScope)
    ) {
        return error.to_string();
    }
    if matches!(error, IngestError::Extract(ExtractError::MissingApiKey)) {
        return "Gemini API key is invalid or not configured. Check the key.".to_string();
    }

    let message = error.to_string();
    let lower = message.to_lowercase();
    if lower.contains("quota") || lower.contains("429") {
        return "API quota exceeded. Wait a moment and retry, or check your Google AI Studio usage."
            .to_string();
    }
    if lower.contains("api key not valid") || lower.contains("api_key_invalid") || lower.contains("400")
    {
        return "Gemini API key is invalid or not configured. Check the key.".to_string();
    }
    if lower.contains("permission") || lower.contains("403") {
        return "Insufficient database permissions. Check the Firestore security rules.".to_string();
    }
    format!("Processing failed: {}", message)
}
