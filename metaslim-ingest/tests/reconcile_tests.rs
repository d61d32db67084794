//! Reconciliation pipeline integration tests
//!
//! Exercises the full insert-or-update loop against the recording mock
//! store: scenario coverage for batch outcomes, duplicate handling and
//! fail-fast store error propagation.

mod helpers;

use helpers::{candidate, stored_study, Mutation, RecordingStore};
use metaslim_ingest::reconcile::{reconcile, ReconcileError};

#[tokio::test]
async fn single_valid_candidate_into_empty_dataset_is_added() {
    // Given: one valid Phase 3 candidate and an empty dataset
    let store = RecordingStore::new();
    let batch = vec![candidate("Tirzepatide", "SURMOUNT-1", "Phase 3")];

    // When: the batch is reconciled
    let outcome = reconcile(&batch, &[], &store).await.unwrap();

    // Then: exactly one insert, and the summary names it
    assert_eq!(outcome.added, 1);
    assert_eq!(outcome.updated, 0);
    assert_eq!(outcome.filtered_out, 0);
    assert_eq!(outcome.message(), "successfully added 1 cohort(s).");
    assert!(matches!(store.mutations()[..], [Mutation::Add { .. }]));
}

#[tokio::test]
async fn mixed_batch_reports_add_and_filtered_parts() {
    // Given: one Phase 4 candidate and one valid Phase 3 candidate
    let store = RecordingStore::new();
    let batch = vec![
        candidate("Semaglutide", "SELECT", "Phase 4"),
        candidate("Tirzepatide", "SURMOUNT-1", "Phase 3"),
    ];

    let outcome = reconcile(&batch, &[], &store).await.unwrap();

    assert_eq!(outcome.added, 1);
    assert_eq!(outcome.filtered_out, 1);
    assert_eq!(
        outcome.message(),
        "successfully added 1 cohort(s)，1 non phase-1-3 studies ignored."
    );
}

#[tokio::test]
async fn all_out_of_scope_batch_fails_accordingly() {
    let store = RecordingStore::new();
    let batch = vec![candidate("Semaglutide", "SELECT", "Phase 4")];

    let err = reconcile(&batch, &[], &store).await.unwrap_err();

    assert!(matches!(err, ReconcileError::AllOutOfScope));
    assert!(store.mutations().is_empty());
}

#[tokio::test]
async fn sole_structural_reject_fails_with_no_valid_cohorts() {
    // The only rejection is not phase-related, so the failure must not
    // claim everything was out of scope
    let store = RecordingStore::new();
    let mut invalid = candidate("Tirzepatide", "SURMOUNT-1", "Phase 3");
    invalid.doses.clear();

    let err = reconcile(&[invalid], &[], &store).await.unwrap_err();

    assert!(matches!(
        err,
        ReconcileError::NoValidCohorts {
            nothing_extracted: false
        }
    ));
    assert!(store.mutations().is_empty());
}

#[tokio::test]
async fn empty_batch_fails_immediately_without_store_calls() {
    let store = RecordingStore::new();

    let err = reconcile(&[], &[], &store).await.unwrap_err();

    assert!(matches!(
        err,
        ReconcileError::NoValidCohorts {
            nothing_extracted: true
        }
    ));
    assert_eq!(
        err.to_string(),
        "AI failed to extract any valid cohort from the content"
    );
    assert!(store.mutations().is_empty());
}

#[tokio::test]
async fn matching_snapshot_study_is_updated_not_duplicated() {
    // Given: the dataset already holds this cohort under different casing
    let existing = stored_study("existing-1", "tirzepatide", "surmount-1", "Phase 3");
    let store = RecordingStore::with_studies(vec![existing.clone()]);
    let mut batch_candidate = candidate("Tirzepatide", "SURMOUNT-1", "Phase 3");
    batch_candidate.doses.push(helpers::dose("10mg", 19.5));

    let outcome = reconcile(
        &[batch_candidate.clone()],
        &[existing],
        &store,
    )
    .await
    .unwrap();

    assert_eq!(outcome.updated, 1);
    assert_eq!(outcome.added, 0);
    assert_eq!(outcome.message(), "successfully updated 1 cohort(s).");
    assert_eq!(
        store.mutations(),
        vec![Mutation::Update {
            id: "existing-1".to_string(),
            record: batch_candidate,
        }]
    );
}

#[tokio::test]
async fn reconciling_twice_is_idempotent() {
    // First pass inserts; a second pass over the refreshed snapshot must
    // update the same study, leaving one entry for the identity key
    let store = RecordingStore::new();
    let batch = vec![candidate("Mazdutide", "GLORY-1", "Phase 3")];

    let first = reconcile(&batch, &[], &store).await.unwrap();
    assert_eq!(first.added, 1);

    let snapshot = store.studies();
    let second = reconcile(&batch, &snapshot, &store).await.unwrap();
    assert_eq!(second.added, 0);
    assert_eq!(second.updated, 1);

    assert_eq!(store.studies().len(), 1);
}

#[tokio::test]
async fn in_batch_duplicate_updates_the_fresh_insert() {
    // Two candidates for the same identity key in one batch. The snapshot
    // is not re-read mid-batch; claimed-key tracking turns the second into
    // an update of the study the first one inserted, instead of the
    // historical double insert.
    let store = RecordingStore::new();
    let first = candidate("Retatrutide", "TRIUMPH-3", "Phase 2");
    let mut second = first.clone();
    second.doses = vec![helpers::dose("12mg", 24.2)];

    let outcome = reconcile(&[first, second.clone()], &[], &store)
        .await
        .unwrap();

    assert_eq!(outcome.added, 1);
    assert_eq!(outcome.updated, 1);

    let studies = store.studies();
    assert_eq!(studies.len(), 1, "one study per identity key");
    assert_eq!(studies[0].record.doses, second.doses);

    let mutations = store.mutations();
    match (&mutations[0], &mutations[1]) {
        (Mutation::Add { assigned_id, .. }, Mutation::Update { id, .. }) => {
            assert_eq!(assigned_id, id, "update targets the in-batch insert");
        }
        other => panic!("unexpected mutation sequence: {:?}", other),
    }
}

#[tokio::test]
async fn structurally_invalid_candidates_are_skipped_silently() {
    // Invalid entries are dropped without counting toward any counter
    let store = RecordingStore::new();
    let invalid = candidate("", "NN9838-4621", "Phase 1");
    let batch = vec![invalid, candidate("Amycretin", "NN9838-4621", "Phase 1")];

    let outcome = reconcile(&batch, &[], &store).await.unwrap();

    assert_eq!(outcome.added, 1);
    assert_eq!(outcome.filtered_out, 0);
    assert_eq!(outcome.message(), "successfully added 1 cohort(s).");
}

#[tokio::test]
async fn store_failure_aborts_the_remainder_of_the_batch() {
    // Given: a store that fails its first mutation
    let store = RecordingStore::failing_after(0);
    let batch = vec![
        candidate("Tirzepatide", "SURMOUNT-1", "Phase 3"),
        candidate("Semaglutide", "STEP 1", "Phase 3"),
    ];

    let err = reconcile(&batch, &[], &store).await.unwrap_err();

    // Then: the failure propagates verbatim and the second candidate is
    // never attempted
    assert!(matches!(err, ReconcileError::Store(_)));
    assert!(store.mutations().is_empty());
    assert!(store.studies().is_empty());
}

#[tokio::test]
async fn candidates_are_processed_in_input_order() {
    let store = RecordingStore::new();
    let batch = vec![
        candidate("Orforglipron", "ATTAIN-1", "Phase 3"),
        candidate("Cagrisema", "REDEFINE-1", "Phase 3"),
    ];

    reconcile(&batch, &[], &store).await.unwrap();

    let names: Vec<String> = store
        .mutations()
        .into_iter()
        .map(|m| match m {
            Mutation::Add { record, .. } => record.drug_name,
            Mutation::Update { record, .. } => record.drug_name,
        })
        .collect();
    assert_eq!(names, vec!["Orforglipron", "Cagrisema"]);
}
