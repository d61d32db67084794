//! AI extraction boundary
//!
//! The reconciliation pipeline consumes extraction as a collaborator behind
//! the `CohortExtractor` trait; `GeminiClient` is the production
//! implementation. Tests substitute their own.

pub mod gemini_client;

pub use gemini_client::{ExtractError, GeminiClient};

use async_trait::async_trait;
use metaslim_common::CandidateRecord;

/// Extraction collaborator: unstructured literature in, candidate records out.
///
/// Implementations do not validate the records they return; the ingest
/// filter is the single authority on what is persistable.
#[async_trait]
pub trait CohortExtractor: Send + Sync {
    /// Extract cohorts from plain literature text
    async fn extract_text(&self, text: &str) -> Result<Vec<CandidateRecord>, ExtractError>;

    /// Extract cohorts from a literature screenshot or figure
    async fn extract_image(
        &self,
        mime_type: &str,
        data: &[u8],
    ) -> Result<Vec<CandidateRecord>, ExtractError>;
}
