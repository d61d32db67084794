//! Core domain types for MetaSlim
//!
//! The unit of storage is a `Study`: one clinical-trial population (cohort)
//! analyzed independently. The AI extraction boundary produces
//! `CandidateRecord`s, which are strictly typed here and validated by the
//! ingest filter before any of them reaches storage.
//!
//! Wire names are camelCase to match the extraction response schema and the
//! stored document shape.

use serde::{Deserialize, Serialize};

/// Store-assigned study identifier.
///
/// Remote documents carry server-generated ids; the local store assigns
/// UUIDv4 strings. Never reassigned after insert.
pub type StudyId = String;

/// Efficacy and tolerability observations for one dose arm.
///
/// Percentages are non-negative; 0 means "not reported in the literature".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DoseObservation {
    /// Dose label, e.g. "5mg"
    pub dose: String,
    /// Mean body-weight reduction, percent
    pub weight_loss_percent: f64,
    /// Nausea incidence, percent
    pub nausea_percent: f64,
    /// Vomiting incidence, percent
    pub vomiting_percent: f64,
    /// Diarrhea incidence, percent
    pub diarrhea_percent: f64,
    /// Constipation incidence, percent
    pub constipation_percent: f64,
    /// Serious adverse event incidence, percent
    pub sae_percent: f64,
}

/// Drug formulation reported by the trial.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Formulation {
    #[serde(rename = "subcutaneous-injection")]
    SubcutaneousInjection,
    #[serde(rename = "oral")]
    Oral,
    #[serde(rename = "other")]
    Other,
    /// Not reported in the source literature (empty string on the wire).
    /// Unrecognized wire values also fold here rather than failing the batch.
    #[default]
    #[serde(rename = "", other)]
    Unspecified,
}

impl Formulation {
    /// Wire/storage representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Formulation::SubcutaneousInjection => "subcutaneous-injection",
            Formulation::Oral => "oral",
            Formulation::Other => "other",
            Formulation::Unspecified => "",
        }
    }

    /// Parse a stored wire value
    pub fn from_wire(value: &str) -> Self {
        match value {
            "subcutaneous-injection" => Formulation::SubcutaneousInjection,
            "oral" => Formulation::Oral,
            "other" => Formulation::Other,
            _ => Formulation::Unspecified,
        }
    }
}

/// One cohort as extracted by the AI collaborator, before validation.
///
/// Every field defaults so that partially-populated extraction output
/// deserializes into a rejectable record instead of failing the whole batch.
/// The ingest filter is the authority on which of these are persistable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CandidateRecord {
    /// Generic drug name; required for acceptance
    pub drug_name: String,
    /// Classification label, e.g. "GLP-1 RA", "GIP/GLP-1"
    pub drug_class: String,
    /// Sponsor organization as written in the literature (not yet normalized)
    pub company: String,
    /// Trial identifier/name, e.g. "SURMOUNT-1"; required for acceptance
    pub trial_name: String,
    /// Trial phase string; must contain "1", "2" or "3" to be in scope
    pub phase: String,
    /// Whether this cohort is a type-2-diabetes population
    #[serde(rename = "hasT2D")]
    pub has_t2d: bool,
    /// Whether this cohort is a predominantly Chinese population
    pub is_chinese_cohort: bool,
    /// Trial duration in weeks
    pub duration_weeks: i64,
    pub formulation: Formulation,
    /// Free-text dosing frequency, e.g. "once weekly"
    pub frequency: String,
    /// Per-dose observations; at least one entry required for acceptance
    pub doses: Vec<DoseObservation>,
    /// Optional one-line synopsis of the cohort's key finding
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl CandidateRecord {
    pub fn identity_key(&self) -> IdentityKey {
        IdentityKey::new(
            &self.drug_name,
            &self.trial_name,
            self.has_t2d,
            self.is_chinese_cohort,
        )
    }
}

/// A persisted study cohort.
///
/// `id` and `created_at` are assigned by the store at insert time and never
/// touched by updates. `created_at` orders display (newest first) and is
/// never part of identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Study {
    pub id: StudyId,
    #[serde(flatten)]
    pub record: CandidateRecord,
    /// Insert timestamp, epoch milliseconds
    pub created_at: i64,
}

impl Study {
    pub fn identity_key(&self) -> IdentityKey {
        self.record.identity_key()
    }
}

/// Natural identity of a study cohort: the 4-tuple deciding insert vs update.
///
/// Drug and trial names are compared whitespace-trimmed and lowercased.
/// Dose, duration and summary fields are deliberately excluded: repeated
/// extractions of the same cohort are expected to correct those, and must
/// overwrite rather than duplicate the cohort.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdentityKey {
    drug_name: String,
    trial_name: String,
    has_t2d: bool,
    is_chinese_cohort: bool,
}

impl IdentityKey {
    pub fn new(drug_name: &str, trial_name: &str, has_t2d: bool, is_chinese_cohort: bool) -> Self {
        Self {
            drug_name: drug_name.trim().to_lowercase(),
            trial_name: trial_name.trim().to_lowercase(),
            has_t2d,
            is_chinese_cohort,
        }
    }
}
