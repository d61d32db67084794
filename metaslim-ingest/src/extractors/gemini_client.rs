//! Gemini API client
//!
//! Schema-constrained JSON extraction of trial cohorts from literature text
//! or images, via the `generateContent` REST endpoint.

use super::CohortExtractor;
use async_trait::async_trait;
use base64::Engine;
use metaslim_common::normalize::display_drug_name;
use metaslim_common::CandidateRecord;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Mutex;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-2.5-flash";
const RATE_LIMIT_MS: u64 = 1000;
/// Literature text beyond this many characters is truncated before upload
const MAX_TEXT_CHARS: usize = 30_000;

/// Gemini client errors
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Gemini API key is not configured")]
    MissingApiKey,

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Gemini API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("the model returned an empty response; the content may hold no analyzable data")]
    EmptyResponse,

    #[error("malformed extraction response: {0}")]
    Parse(String),
}

/// Wire shape of the constrained model output
#[derive(Debug, Deserialize)]
struct ExtractionPayload {
    studies: Vec<CandidateRecord>,
}

/// Rate limiter enforcing a minimum interval between requests
struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    fn new(min_interval_ms: u64) -> Self {
        Self {
            last_request: Mutex::new(None),
            min_interval: Duration::from_millis(min_interval_ms),
        }
    }

    /// Wait if necessary to comply with the interval
    async fn wait(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < self.min_interval {
                let wait_time = self.min_interval - elapsed;
                tracing::debug!("Rate limiting: waiting {:?}", wait_time);
                tokio::time::sleep(wait_time).await;
            }
        }

        *last = Some(Instant::now());
    }
}

/// Gemini extraction client
pub struct GeminiClient {
    http_client: reqwest::Client,
    api_key: Option<String>,
    model: String,
    rate_limiter: Arc<RateLimiter>,
}

impl GeminiClient {
    /// Build a client. A missing key is tolerated at construction so the
    /// service can start unconfigured; extraction calls then fail with
    /// `MissingApiKey`.
    pub fn new(api_key: Option<String>) -> Result<Self, ExtractError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;
        if api_key.is_none() {
            tracing::warn!("Gemini API key is missing; extraction will not work");
        }
        Ok(Self {
            http_client,
            api_key,
            model: DEFAULT_MODEL.to_string(),
            rate_limiter: Arc::new(RateLimiter::new(RATE_LIMIT_MS)),
        })
    }

    async fn call(&self, parts: Vec<Value>) -> Result<Vec<CandidateRecord>, ExtractError> {
        let api_key = self.api_key.as_ref().ok_or(ExtractError::MissingApiKey)?;

        self.rate_limiter.wait().await;

        let url = format!("{}/models/{}:generateContent", GEMINI_BASE_URL, self.model);
        let body = json!({
            "contents": [{ "parts": parts }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": response_schema(),
                "temperature": 0.1,
            },
        });

        let response = self
            .http_client
            .post(&url)
            .query(&[("key", api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ExtractError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let envelope: Value = response.json().await?;
        let text = envelope["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .unwrap_or("");
        if text.trim().is_empty() {
            return Err(ExtractError::EmptyResponse);
        }

        let payload: ExtractionPayload = serde_json::from_str(text)
            .map_err(|e| ExtractError::Parse(format!("missing or invalid 'studies' array: {}", e)))?;

        Ok(title_case_drug_names(payload.studies))
    }
}

/// Title-case extracted drug names so repeated extractions of one drug agree
fn title_case_drug_names(mut studies: Vec<CandidateRecord>) -> Vec<CandidateRecord> {
    for study in &mut studies {
        if !study.drug_name.is_empty() {
            study.drug_name = display_drug_name(&study.drug_name);
        }
    }
    studies
}

/// Truncate literature text to the upload limit on a char boundary
fn clip_text(text: &str) -> &str {
    match text.char_indices().nth(MAX_TEXT_CHARS) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

#[async_trait]
impl CohortExtractor for GeminiClient {
    async fn extract_text(&self, text: &str) -> Result<Vec<CandidateRecord>, ExtractError> {
        let prompt = format!(
            "{}\n\nLiterature content:\n{}",
            EXTRACTION_PROMPT,
            clip_text(text)
        );
        self.call(vec![json!({ "text": prompt })]).await
    }

    async fn extract_image(
        &self,
        mime_type: &str,
        data: &[u8],
    ) -> Result<Vec<CandidateRecord>, ExtractError> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(data);
        self.call(vec![
            json!({ "inlineData": { "mimeType": mime_type, "data": encoded } }),
            json!({ "text": EXTRACTION_PROMPT }),
        ])
        .await
    }
}

/// Extraction instructions sent with every document
const EXTRACTION_PROMPT: &str = r#"You are a professional medical literature analyst.
Your task is to extract key information about weight-loss drugs from the provided clinical-trial text, screenshots or figures, following the JSON schema.

Important rules:
- Analysis strategy: when a document reports several analysis strategies (e.g. Intention-To-Treat / Treatment Policy vs. Per-Protocol), always prefer the Intention-To-Treat results, which better reflect real-world treatment effect.
- Table mining: tables are the key source of precise numbers, especially adverse-event rates (nausea, vomiting, diarrhea, constipation, SAE).
  - Scan every table carefully. Match each row (usually one dose arm) against the column it belongs to (e.g. "Nausea N(%)").
  - Watch the data format: cells may read "N (%)" or a bare percentage. Always extract the percentage. For "45 (22.5%)" extract 22.5.
  - Skip placebo rows and columns entirely.
- Exclude placebo: never extract data for placebo arms, anywhere in the document. Only treatment arms containing the actual drug count.
- Stratified analyses: one document may analyze several populations independently (for example a Chinese-population study reporting separate data for participants with and without type 2 diabetes). Emit each independently analyzed population cohort as its own study object, and return the array of all of them.

Key extraction points, per independent cohort:
1. Drug information: generic name, class (e.g. GLP-1 RA, GIP/GLP-1), sponsor company.
2. Trial design: trial name/identifier (e.g. SURMOUNT-1), phase, whether the cohort has type 2 diabetes (hasT2D), whether the cohort is predominantly Chinese (isChineseCohort), duration in weeks, formulation (one of "subcutaneous-injection", "oral", "other"), dosing frequency (e.g. "once weekly", "once daily").
3. Efficacy: weight-loss percentage per dose arm.
4. Safety: nausea, vomiting, diarrhea, constipation and serious-adverse-event rates per dose arm, as percentages.

If a value is not reported in the document, use 0 for numbers and "" for strings. Make sure every numeric field is a number, not a string."#;

/// Response schema constraining the model to the candidate-record shape
fn response_schema() -> Value {
    let dose_schema = json!({
        "type": "OBJECT",
        "properties": {
            "dose": { "type": "STRING", "description": "Dose label, e.g. '5mg'" },
            "weightLossPercent": { "type": "NUMBER", "description": "Body-weight reduction, percent" },
            "nauseaPercent": { "type": "NUMBER", "description": "Nausea incidence, percent" },
            "vomitingPercent": { "type": "NUMBER", "description": "Vomiting incidence, percent" },
            "diarrheaPercent": { "type": "NUMBER", "description": "Diarrhea incidence, percent" },
            "constipationPercent": { "type": "NUMBER", "description": "Constipation incidence, percent" },
            "saePercent": { "type": "NUMBER", "description": "Serious adverse event incidence, percent" },
        },
        "required": [
            "dose", "weightLossPercent", "nauseaPercent", "vomitingPercent",
            "diarrheaPercent", "constipationPercent", "saePercent",
        ],
    });

    let study_schema = json!({
        "type": "OBJECT",
        "properties": {
            "drugName": { "type": "STRING", "description": "Generic drug name" },
            "drugClass": { "type": "STRING", "description": "Drug class (e.g. GLP-1 RA, GIP/GLP-1)" },
            "company": { "type": "STRING", "description": "Sponsor company" },
            "trialName": { "type": "STRING", "description": "Trial name (e.g. SURMOUNT-1)" },
            "phase": {
                "type": "STRING",
                "description": "Trial phase (e.g. Phase 3). Must be one of 'Phase 1', 'Phase 2', 'Phase 3'. Return '' when the document does not clearly state one of these.",
            },
            "hasT2D": { "type": "BOOLEAN", "description": "Whether this cohort is a type-2-diabetes population" },
            "isChineseCohort": { "type": "BOOLEAN", "description": "Whether this cohort is predominantly Chinese (e.g. STEP-China)" },
            "durationWeeks": { "type": "INTEGER", "description": "Trial duration in weeks" },
            "formulation": {
                "type": "STRING",
                "description": "Formulation. Must be one of 'subcutaneous-injection', 'oral', 'other'.",
            },
            "frequency": { "type": "STRING", "description": "Dosing frequency (e.g. 'once weekly', 'once daily')" },
            "summary": { "type": "STRING", "description": "One-sentence summary of the cohort's key finding" },
            "doses": { "type": "ARRAY", "items": dose_schema },
        },
        "required": [
            "drugName", "drugClass", "company", "trialName", "phase", "hasT2D",
            "isChineseCohort", "durationWeeks", "formulation", "frequency", "doses",
        ],
    });

    json!({
        "type": "OBJECT",
        "properties": {
            "studies": {
                "type": "ARRAY",
                "description": "All study cohorts extracted from the document. One document may hold several independently analyzed cohorts.",
                "items": study_schema,
            },
        },
        "required": ["studies"],
    })
}
