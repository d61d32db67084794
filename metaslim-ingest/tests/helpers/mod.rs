//! Test helper utilities
//!
//! Shared builders and a recording mock store for exercising the
//! reconciliation pipeline without a real backend.

use async_trait::async_trait;
use metaslim_common::events::{EventBus, MetaslimEvent};
use metaslim_common::{CandidateRecord, DoseObservation, Study, StudyId};
use metaslim_ingest::store::{StoreError, StudyStore};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;
use tokio::sync::broadcast;

/// One recorded mutation issued against the mock store
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    Add {
        assigned_id: StudyId,
        record: CandidateRecord,
    },
    Update {
        id: StudyId,
        record: CandidateRecord,
    },
}

/// In-memory store that records every mutation it receives.
///
/// Optionally fails after a configured number of mutation attempts to test
/// fail-fast batch abort.
pub struct RecordingStore {
    studies: Mutex<Vec<Study>>,
    mutations: Mutex<Vec<Mutation>>,
    bus: EventBus,
    clock: AtomicI64,
    fail_after: Option<usize>,
    attempts: AtomicI64,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::with_studies(Vec::new())
    }

    pub fn with_studies(studies: Vec<Study>) -> Self {
        Self {
            studies: Mutex::new(studies),
            mutations: Mutex::new(Vec::new()),
            bus: EventBus::new(64),
            clock: AtomicI64::new(1_000),
            fail_after: None,
            attempts: AtomicI64::new(0),
        }
    }

    /// Fail every mutation once `count` attempts have been made
    pub fn failing_after(count: usize) -> Self {
        Self {
            fail_after: Some(count),
            ..Self::new()
        }
    }

    pub fn mutations(&self) -> Vec<Mutation> {
        self.mutations.lock().unwrap().clone()
    }

    pub fn studies(&self) -> Vec<Study> {
        self.studies.lock().unwrap().clone()
    }

    fn check_failure(&self) -> Result<(), StoreError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) as usize;
        if let Some(limit) = self.fail_after {
            if attempt >= limit {
                return Err(StoreError::Remote {
                    status: 500,
                    message: "injected store failure".to_string(),
                });
            }
        }
        Ok(())
    }
}

#[async_trait]
impl StudyStore for RecordingStore {
    async fn add(&self, record: &CandidateRecord) -> Result<StudyId, StoreError> {
        self.check_failure()?;
        let created_at = self.clock.fetch_add(1, Ordering::SeqCst);
        let id = format!("study-{}", created_at);
        self.studies.lock().unwrap().push(Study {
            id: id.clone(),
            record: record.clone(),
            created_at,
        });
        self.mutations.lock().unwrap().push(Mutation::Add {
            assigned_id: id.clone(),
            record: record.clone(),
        });
        self.bus.emit_lossy(MetaslimEvent::StudiesChanged {
            timestamp: chrono::Utc::now(),
        });
        Ok(id)
    }

    async fn update(&self, id: &str, record: &CandidateRecord) -> Result<(), StoreError> {
        self.check_failure()?;
        let mut studies = self.studies.lock().unwrap();
        let study = studies
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        study.record = record.clone();
        drop(studies);
        self.mutations.lock().unwrap().push(Mutation::Update {
            id: id.to_string(),
            record: record.clone(),
        });
        self.bus.emit_lossy(MetaslimEvent::StudiesChanged {
            timestamp: chrono::Utc::now(),
        });
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let mut studies = self.studies.lock().unwrap();
        let before = studies.len();
        studies.retain(|s| s.id != id);
        if studies.len() == before {
            return Err(StoreError::NotFound(id.to_string()));
        }
        drop(studies);
        self.bus.emit_lossy(MetaslimEvent::StudiesChanged {
            timestamp: chrono::Utc::now(),
        });
        Ok(())
    }

    async fn delete_all(&self) -> Result<(), StoreError> {
        self.studies.lock().unwrap().clear();
        self.bus.emit_lossy(MetaslimEvent::StudiesChanged {
            timestamp: chrono::Utc::now(),
        });
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Study>, StoreError> {
        let mut studies = self.studies.lock().unwrap().clone();
        studies.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(studies)
    }

    fn changes(&self) -> broadcast::Receiver<MetaslimEvent> {
        self.bus.subscribe()
    }
}

/// Candidate with one dose arm and sensible defaults
pub fn candidate(drug: &str, trial: &str, phase: &str) -> CandidateRecord {
    CandidateRecord {
        drug_name: drug.to_string(),
        drug_class: "GLP-1 RA".to_string(),
        company: "Test Pharma".to_string(),
        trial_name: trial.to_string(),
        phase: phase.to_string(),
        duration_weeks: 48,
        frequency: "once weekly".to_string(),
        doses: vec![dose("5mg", 12.5)],
        ..Default::default()
    }
}

pub fn dose(label: &str, weight_loss: f64) -> DoseObservation {
    DoseObservation {
        dose: label.to_string(),
        weight_loss_percent: weight_loss,
        nausea_percent: 20.0,
        vomiting_percent: 5.0,
        diarrhea_percent: 10.0,
        constipation_percent: 8.0,
        sae_percent: 1.5,
    }
}

/// Persisted study wrapping `candidate`
pub fn stored_study(id: &str, drug: &str, trial: &str, phase: &str) -> Study {
    Study {
        id: id.to_string(),
        record: candidate(drug, trial, phase),
        created_at: 1,
    }
}
