//! Remote Firestore study store
//!
//! Talks to the Firestore REST surface
//! (`projects/{project}/databases/(default)/documents/...`). Documents use
//! the typed `Value` encoding the REST API requires, so most of this module
//! is the study <-> Firestore value mapping.
//!
//! Change events are emitted for mutations made through this process;
//! out-of-band remote writes become visible on the next `list()`.

use super::{StoreError, StudyStore};
use async_trait::async_trait;
use chrono::Utc;
use metaslim_common::events::{EventBus, MetaslimEvent};
use metaslim_common::{CandidateRecord, DoseObservation, Formulation, Study, StudyId};
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::sync::broadcast;

const FIRESTORE_BASE_URL: &str = "https://firestore.googleapis.com/v1";
const COLLECTION_NAME: &str = "weight_loss_studies";

/// Fields overwritten by an update; `createdAt` is deliberately absent.
const UPDATE_FIELD_PATHS: &[&str] = &[
    "drugName",
    "drugClass",
    "company",
    "trialName",
    "phase",
    "hasT2D",
    "isChineseCohort",
    "durationWeeks",
    "formulation",
    "frequency",
    "doses",
    "summary",
];

pub struct FirestoreStore {
    http_client: reqwest::Client,
    project_id: String,
    api_key: Option<String>,
    bus: EventBus,
}

impl FirestoreStore {
    pub fn new(
        project_id: String,
        api_key: Option<String>,
        bus: EventBus,
    ) -> Result<Self, StoreError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http_client,
            project_id,
            api_key,
            bus,
        })
    }

    fn collection_url(&self) -> String {
        format!(
            "{}/projects/{}/databases/(default)/documents/{}",
            FIRESTORE_BASE_URL, self.project_id, COLLECTION_NAME
        )
    }

    fn document_url(&self, id: &str) -> String {
        format!("{}/{}", self.collection_url(), id)
    }

    fn key_params(&self) -> Vec<(&'static str, String)> {
        match &self.api_key {
            Some(key) => vec![("key", key.clone())],
            None => vec![],
        }
    }

    fn notify(&self) {
        self.bus.emit_lossy(MetaslimEvent::StudiesChanged {
            timestamp: Utc::now(),
        });
    }
}

async fn error_from_response(response: reqwest::Response) -> StoreError {
    let status = response.status();
    let message = response.text().await.unwrap_or_default();
    StoreError::Remote {
        status: status.as_u16(),
        message,
    }
}

// ---------------------------------------------------------------------------
// Firestore value encoding
// ---------------------------------------------------------------------------

fn string_value(s: &str) -> Value {
    json!({ "stringValue": s })
}

fn bool_value(b: bool) -> Value {
    json!({ "booleanValue": b })
}

fn integer_value(n: i64) -> Value {
    // The REST API represents 64-bit integers as decimal strings
    json!({ "integerValue": n.to_string() })
}

fn double_value(x: f64) -> Value {
    json!({ "doubleValue": x })
}

fn dose_value(dose: &DoseObservation) -> Value {
    json!({
        "mapValue": {
            "fields": {
                "dose": string_value(&dose.dose),
                "weightLossPercent": double_value(dose.weight_loss_percent),
                "nauseaPercent": double_value(dose.nausea_percent),
                "vomitingPercent": double_value(dose.vomiting_percent),
                "diarrheaPercent": double_value(dose.diarrhea_percent),
                "constipationPercent": double_value(dose.constipation_percent),
                "saePercent": double_value(dose.sae_percent),
            }
        }
    })
}

fn record_fields(record: &CandidateRecord) -> Value {
    let doses: Vec<Value> = record.doses.iter().map(dose_value).collect();
    json!({
        "drugName": string_value(&record.drug_name),
        "drugClass": string_value(&record.drug_class),
        "company": string_value(&record.company),
        "trialName": string_value(&record.trial_name),
        "phase": string_value(&record.phase),
        "hasT2D": bool_value(record.has_t2d),
        "isChineseCohort": bool_value(record.is_chinese_cohort),
        "durationWeeks": integer_value(record.duration_weeks),
        "formulation": string_value(record.formulation.as_str()),
        "frequency": string_value(&record.frequency),
        "doses": { "arrayValue": { "values": doses } },
        "summary": string_value(record.summary.as_deref().unwrap_or("")),
    })
}

// ---------------------------------------------------------------------------
// Firestore value decoding
// ---------------------------------------------------------------------------

fn field_str(fields: &Value, key: &str) -> String {
    fields[key]["stringValue"].as_str().unwrap_or("").to_string()
}

fn field_bool(fields: &Value, key: &str) -> bool {
    fields[key]["booleanValue"].as_bool().unwrap_or(false)
}

fn field_i64(fields: &Value, key: &str) -> i64 {
    // Integers come back as strings; tolerate doubles from hand-edited docs
    let value = &fields[key];
    if let Some(s) = value["integerValue"].as_str() {
        return s.parse().unwrap_or(0);
    }
    value["doubleValue"].as_f64().unwrap_or(0.0) as i64
}

fn field_f64(fields: &Value, key: &str) -> f64 {
    let value = &fields[key];
    if let Some(x) = value["doubleValue"].as_f64() {
        return x;
    }
    value["integerValue"]
        .as_str()
        .and_then(|s| s.parse().ok())
        .unwrap_or(0.0)
}

fn decode_dose(value: &Value) -> DoseObservation {
    let fields = &value["mapValue"]["fields"];
    DoseObservation {
        dose: field_str(fields, "dose"),
        weight_loss_percent: field_f64(fields, "weightLossPercent"),
        nausea_percent: field_f64(fields, "nauseaPercent"),
        vomiting_percent: field_f64(fields, "vomitingPercent"),
        diarrhea_percent: field_f64(fields, "diarrheaPercent"),
        constipation_percent: field_f64(fields, "constipationPercent"),
        sae_percent: field_f64(fields, "saePercent"),
    }
}

fn decode_document(doc: &Value) -> Result<Study, StoreError> {
    let name = doc["name"].as_str().unwrap_or_default();
    let id = name.rsplit('/').next().unwrap_or_default().to_string();
    if id.is_empty() {
        return Err(StoreError::Remote {
            status: 0,
            message: format!("document without a name: {}", doc),
        });
    }

    let fields = &doc["fields"];
    let doses = fields["doses"]["arrayValue"]["values"]
        .as_array()
        .map(|values| values.iter().map(decode_dose).collect())
        .unwrap_or_default();
    let summary = {
        let s = field_str(fields, "summary");
        if s.is_empty() {
            None
        } else {
            Some(s)
        }
    };

    Ok(Study {
        id,
        record: CandidateRecord {
            drug_name: field_str(fields, "drugName"),
            drug_class: field_str(fields, "drugClass"),
            company: field_str(fields, "company"),
            trial_name: field_str(fields, "trialName"),
            phase: field_str(fields, "phase"),
            has_t2d: field_bool(fields, "hasT2D"),
            is_chinese_cohort: field_bool(fields, "isChineseCohort"),
            duration_weeks: field_i64(fields, "durationWeeks"),
            formulation: Formulation::from_wire(&field_str(fields, "formulation")),
            frequency: field_str(fields, "frequency"),
            doses,
            summary,
        },
        created_at: field_i64(fields, "createdAt"),
    })
}

#[async_trait]
impl StudyStore for FirestoreStore {
    async fn add(&self, record: &CandidateRecord) -> Result<StudyId, StoreError> {
        let mut fields = record_fields(record);
        fields["createdAt"] = integer_value(Utc::now().timestamp_millis());

        let response = self
            .http_client
            .post(self.collection_url())
            .query(&self.key_params())
            .json(&json!({ "fields": fields }))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let doc: Value = response.json().await?;
        let id = doc["name"]
            .as_str()
            .and_then(|name| name.rsplit('/').next())
            .unwrap_or_default()
            .to_string();
        self.notify();
        Ok(id)
    }

    async fn update(&self, id: &str, record: &CandidateRecord) -> Result<(), StoreError> {
        let mut params: Vec<(&str, String)> = self.key_params();
        // Guard against resurrecting a deleted document
        params.push(("currentDocument.exists", "true".to_string()));
        for path in UPDATE_FIELD_PATHS {
            params.push(("updateMask.fieldPaths", (*path).to_string()));
        }

        let response = self
            .http_client
            .patch(self.document_url(id))
            .query(&params)
            .json(&json!({ "fields": record_fields(record) }))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound(id.to_string()));
        }
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        self.notify();
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let mut params = self.key_params();
        params.push(("currentDocument.exists", "true".to_string()));

        let response = self
            .http_client
            .delete(self.document_url(id))
            .query(&params)
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound(id.to_string()));
        }
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        self.notify();
        Ok(())
    }

    async fn delete_all(&self) -> Result<(), StoreError> {
        let studies = self.list().await?;
        for study in &studies {
            let response = self
                .http_client
                .delete(self.document_url(&study.id))
                .query(&self.key_params())
                .send()
                .await?;
            // A concurrent delete is fine; anything else aborts
            if !response.status().is_success() && response.status() != StatusCode::NOT_FOUND {
                return Err(error_from_response(response).await);
            }
        }
        self.notify();
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Study>, StoreError> {
        let mut studies = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut params = self.key_params();
            params.push(("pageSize", "300".to_string()));
            if let Some(token) = &page_token {
                params.push(("pageToken", token.clone()));
            }

            let response = self
                .http_client
                .get(self.collection_url())
                .query(&params)
                .send()
                .await?;
            if !response.status().is_success() {
                return Err(error_from_response(response).await);
            }

            let body: Value = response.json().await?;
            if let Some(documents) = body["documents"].as_array() {
                for doc in documents {
                    studies.push(decode_document(doc)?);
                }
            }

            match body["nextPageToken"].as_str() {
                Some(token) if !token.is_empty() => page_token = Some(token.to_string()),
                _ => break,
            }
        }

        studies.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(studies)
    }

    fn changes(&self) -> broadcast::Receiver<MetaslimEvent> {
        self.bus.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> CandidateRecord {
        CandidateRecord {
            drug_name: "Mazdutide".to_string(),
            drug_class: "GLP-1/GCGR".to_string(),
            company: "Innovent".to_string(),
            trial_name: "GLORY-1".to_string(),
            phase: "Phase 3".to_string(),
            has_t2d: false,
            is_chinese_cohort: true,
            duration_weeks: 48,
            formulation: Formulation::SubcutaneousInjection,
            frequency: "once weekly".to_string(),
            doses: vec![DoseObservation {
                dose: "6mg".to_string(),
                weight_loss_percent: 14.5,
                nausea_percent: 18.0,
                vomiting_percent: 7.0,
                diarrhea_percent: 12.0,
                constipation_percent: 10.0,
                sae_percent: 1.2,
            }],
            summary: Some("Significant weight loss in Chinese adults.".to_string()),
        }
    }

    #[test]
    fn record_round_trips_through_firestore_encoding() {
        let record = sample_record();
        let mut fields = record_fields(&record);
        fields["createdAt"] = integer_value(1_700_000_000_000);

        let doc = json!({
            "name": format!(
                "projects/p/databases/(default)/documents/{}/doc-42",
                COLLECTION_NAME
            ),
            "fields": fields,
        });

        let study = decode_document(&doc).unwrap();
        assert_eq!(study.id, "doc-42");
        assert_eq!(study.created_at, 1_700_000_000_000);
        assert_eq!(study.record, record);
    }

    #[test]
    fn integer_fields_decode_from_string_encoding() {
        let doc = json!({
            "name": "projects/p/databases/(default)/documents/c/x",
            "fields": {
                "drugName": { "stringValue": "Orforglipron" },
                "trialName": { "stringValue": "ATTAIN-1" },
                "durationWeeks": { "integerValue": "72" },
                "createdAt": { "integerValue": "123456" },
            }
        });
        let study = decode_document(&doc).unwrap();
        assert_eq!(study.record.duration_weeks, 72);
        assert_eq!(study.created_at, 123_456);
        assert!(study.record.doses.is_empty());
        assert_eq!(study.record.summary, None);
    }

    #[test]
    fn update_mask_never_touches_created_at() {
        assert!(!UPDATE_FIELD_PATHS.contains(&"createdAt"));
        assert!(!UPDATE_FIELD_PATHS.contains(&"id"));
    }
}
