//! Extraction submission endpoint
//!
//! Accepts a batch of documents (pasted text and/or base64 images) and
//! reports one outcome per document. Document failures are isolated: an
//! unreadable payload or a failed extraction never blocks the documents
//! after it.

use crate::error::{ApiError, ApiResult};
use crate::services::{DocumentInput, DocumentOutcome};
use crate::AppState;
use axum::{extract::State, routing::post, Json, Router};
use base64::Engine;
use serde::{Deserialize, Serialize};

/// POST /api/extract request body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractRequest {
    pub documents: Vec<DocumentPayload>,
}

/// One submitted document: either pasted text or a base64 image
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentPayload {
    /// Display name for progress reporting; defaults to "pasted text"
    pub name: Option<String>,
    pub text: Option<String>,
    pub image_base64: Option<String>,
    pub mime_type: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractResponse {
    pub results: Vec<DocumentResult>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentResult {
    pub name: String,
    pub status: &'static str,
    pub message: String,
}

impl DocumentResult {
    fn from_outcome(outcome: DocumentOutcome) -> Self {
        Self {
            name: outcome.name,
            status: if outcome.success { "success" } else { "error" },
            message: outcome.message,
        }
    }

    fn rejected(name: String, message: String) -> Self {
        Self {
            name,
            status: "error",
            message,
        }
    }
}

/// Convert one payload into pipeline input.
///
/// Image payloads without a declared mime type are sniffed; only image
/// uploads are accepted (PDFs must arrive as already-extracted text).
fn into_input(payload: DocumentPayload, index: usize) -> Result<DocumentInput, (String, String)> {
    let name = payload
        .name
        .unwrap_or_else(|| format!("pasted text {}", index + 1));

    if let Some(text) = payload.text {
        if text.trim().is_empty() {
            return Err((name, "document text is empty".to_string()));
        }
        return Ok(DocumentInput::Text { name, text });
    }

    if let Some(encoded) = payload.image_base64 {
        let data = base64::engine::general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|e| (name.clone(), format!("invalid base64 image data: {}", e)))?;
        let mime_type = match payload.mime_type {
            Some(mime) => mime,
            None => infer::get(&data)
                .map(|kind| kind.mime_type().to_string())
                .unwrap_or_default(),
        };
        if !mime_type.starts_with("image/") {
            return Err((name, "unsupported file format; upload an image or paste text".to_string()));
        }
        return Ok(DocumentInput::Image {
            name,
            mime_type,
            data,
        });
    }

    Err((name, "document carries neither text nor image data".to_string()))
}

/// POST /api/extract
pub async fn submit_documents(
    State(state): State<AppState>,
    Json(request): Json<ExtractRequest>,
) -> ApiResult<Json<ExtractResponse>> {
    if request.documents.is_empty() {
        return Err(ApiError::BadRequest("no documents submitted".to_string()));
    }

    // Validate everything up front; invalid payloads become per-document
    // error results without stopping the rest
    let mut slots: Vec<Result<DocumentInput, (String, String)>> = Vec::new();
    for (index, payload) in request.documents.into_iter().enumerate() {
        slots.push(into_input(payload, index));
    }

    let inputs: Vec<DocumentInput> = slots
        .iter()
        .filter_map(|slot| slot.as_ref().ok().cloned())
        .collect();
    let mut outcomes = state.ingestor.ingest(inputs).await.into_iter();

    let results = slots
        .into_iter()
        .map(|slot| match slot {
            Ok(_) => {
                // One outcome per accepted input, in order
                let outcome = outcomes
                    .next()
                    .expect("ingest returns one outcome per input");
                DocumentResult::from_outcome(outcome)
            }
            Err((name, message)) => DocumentResult::rejected(name, message),
        })
        .collect();

    Ok(Json(ExtractResponse { results }))
}

/// Build extraction routes
pub fn extract_routes() -> Router<AppState> {
    Router::new().route("/api/extract", post(submit_documents))
}
