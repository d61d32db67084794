//! Reconciler: one storage mutation per accepted candidate
//!
//! Processes a batch (the candidates extracted from one document or pasted
//! text block) strictly sequentially against the snapshot the caller read at
//! batch start, awaiting each mutation before considering the next
//! candidate. Store failures propagate immediately: at-least-attempt-once
//! per record, no rollback of mutations already applied in the batch.

use super::filter::{classify, Classification, RejectReason};
use crate::store::{StoreError, StudyStore};
use metaslim_common::{CandidateRecord, IdentityKey, Study, StudyId};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, info};

/// Batch-level reconciliation failures
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Nothing in the batch could be persisted and not every rejection was
    /// phase-related. `nothing_extracted` marks the immediate failure for an
    /// empty extraction batch, which reads differently to the curator.
    #[error("{}", no_valid_cohorts_message(.nothing_extracted))]
    NoValidCohorts { nothing_extracted: bool },

    /// Every candidate in a non-empty batch fell outside phases 1-3
    #[error("all extracted cohorts were non phase-1-3 studies")]
    AllOutOfScope,

    /// Storage mutation failure, propagated verbatim; aborts the remainder
    /// of the batch
    #[error(transparent)]
    Store(#[from] StoreError),
}

fn no_valid_cohorts_message(nothing_extracted: &bool) -> &'static str {
    if *nothing_extracted {
        "AI failed to extract any valid cohort from the content"
    } else {
        "no valid new study cohort was found"
    }
}

/// Counters for one reconciled batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub added: usize,
    pub updated: usize,
    pub filtered_out: usize,
}

impl BatchOutcome {
    /// Compose the success summary from the non-zero counters.
    pub fn message(&self) -> String {
        let mut parts = Vec::new();
        if self.added > 0 {
            parts.push(format!("successfully added {} cohort(s)", self.added));
        }
        if self.updated > 0 {
            parts.push(format!("successfully updated {} cohort(s)", self.updated));
        }
        if self.filtered_out > 0 {
            parts.push(format!(
                "{} non phase-1-3 studies ignored",
                self.filtered_out
            ));
        }
        format!("{}.", parts.join("，"))
    }
}

/// Reconcile one batch of candidates into the study dataset.
///
/// `snapshot` is the dataset as the caller read it at batch start; it is
/// never re-read here. Identity keys claimed by earlier candidates in the
/// same batch are tracked so that an in-batch duplicate becomes an update
/// against the freshly inserted study rather than a second insert.
pub async fn reconcile(
    candidates: &[CandidateRecord],
    snapshot: &[Study],
    store: &dyn StudyStore,
) -> Result<BatchOutcome, ReconcileError> {
    if candidates.is_empty() {
        return Err(ReconcileError::NoValidCohorts {
            nothing_extracted: true,
        });
    }

    let mut outcome = BatchOutcome::default();
    let mut claimed: HashMap<IdentityKey, StudyId> = HashMap::new();

    for candidate in candidates {
        match classify(candidate, snapshot) {
            Classification::Reject(RejectReason::MissingRequiredFields) => {
                debug!(
                    drug = %candidate.drug_name,
                    trial = %candidate.trial_name,
                    "Skipping structurally invalid candidate"
                );
            }
            Classification::Reject(RejectReason::OutOfScopePhase) => {
                debug!(
                    drug = %candidate.drug_name,
                    phase = %candidate.phase,
                    "Ignoring out-of-scope phase"
                );
                outcome.filtered_out += 1;
            }
            Classification::Accept { match_id } => {
                let key = candidate.identity_key();
                let target = match_id.or_else(|| claimed.get(&key).cloned());
                match target {
                    Some(id) => {
                        store.update(&id, candidate).await?;
                        outcome.updated += 1;
                        claimed.insert(key, id);
                    }
                    None => {
                        let id = store.add(candidate).await?;
                        outcome.added += 1;
                        claimed.insert(key, id);
                    }
                }
            }
        }
    }

    if outcome.added == 0 && outcome.updated == 0 {
        if outcome.filtered_out == candidates.len() {
            return Err(ReconcileError::AllOutOfScope);
        }
        return Err(ReconcileError::NoValidCohorts {
            nothing_extracted: false,
        });
    }

    info!(
        added = outcome.added,
        updated = outcome.updated,
        filtered_out = outcome.filtered_out,
        "Reconciliation complete"
    );
    Ok(outcome)
}
