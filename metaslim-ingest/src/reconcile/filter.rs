//! Record filter: per-candidate accept/reject decisions
//!
//! Pure functions over the candidate and the caller's dataset snapshot; no
//! side effects, nothing external called.

use metaslim_common::{CandidateRecord, Study, StudyId};

/// Why a candidate was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Missing drug name, trial name, or any dose arm. Dropped silently:
    /// structurally broken extraction output is noise, not a user-facing
    /// condition.
    MissingRequiredFields,
    /// Phase string names none of phases 1-3. Counted and reported in the
    /// batch summary.
    OutOfScopePhase,
}

/// Filter verdict for one candidate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// Persistable. `match_id` carries the id of the snapshot study with the
    /// same identity key when one exists (update), `None` for a new cohort
    /// (insert).
    Accept { match_id: Option<StudyId> },
    Reject(RejectReason),
}

/// Whether a phase string falls inside the phase 1-3 scope.
///
/// Substring test rather than exact match: trial registries routinely write
/// combined phases ("Phase 1/2", "Phase 2/3"), and those belong in scope.
/// "Phase 4", preclinical labels and the empty string all fail.
pub fn phase_in_scope(phase: &str) -> bool {
    phase.contains('1') || phase.contains('2') || phase.contains('3')
}

/// Classify one candidate against the dataset snapshot.
///
/// Rules apply in order; the first failing rule wins:
/// 1. structural validity (drug name, trial name, at least one dose)
/// 2. phase scope
/// 3. accept, with duplicate lookup by identity key
pub fn classify(candidate: &CandidateRecord, snapshot: &[Study]) -> Classification {
    if candidate.drug_name.is_empty()
        || candidate.trial_name.is_empty()
        || candidate.doses.is_empty()
    {
        return Classification::Reject(RejectReason::MissingRequiredFields);
    }

    if !phase_in_scope(&candidate.phase) {
        return Classification::Reject(RejectReason::OutOfScopePhase);
    }

    let key = candidate.identity_key();
    let match_id = snapshot
        .iter()
        .find(|study| study.identity_key() == key)
        .map(|study| study.id.clone());

    Classification::Accept { match_id }
}
