//! Dataset subscription tests
//!
//! The subscribe helper must deliver the full display-normalized snapshot
//! immediately and after every change, and stop on unsubscribe.

mod helpers;

use helpers::{candidate, RecordingStore};
use metaslim_common::Study;
use metaslim_ingest::store::{subscribe, StudyStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;

async fn next_snapshot(rx: &mut mpsc::UnboundedReceiver<Vec<Study>>) -> Vec<Study> {
    timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("snapshot not delivered in time")
        .expect("subscription channel closed")
}

#[tokio::test]
async fn subscriber_receives_initial_and_post_change_snapshots() {
    let store: Arc<RecordingStore> = Arc::new(RecordingStore::new());
    let (tx, mut rx) = mpsc::unbounded_channel();

    let subscription = subscribe(store.clone(), move |studies| {
        tx.send(studies).ok();
    });

    // Initial snapshot of the empty dataset
    let initial = next_snapshot(&mut rx).await;
    assert!(initial.is_empty());

    // A mutation triggers a fresh snapshot
    store
        .add(&candidate("tirzepatide", "SURMOUNT-1", "Phase 3"))
        .await
        .unwrap();

    let updated = next_snapshot(&mut rx).await;
    assert_eq!(updated.len(), 1);
    // Snapshots are display-normalized on the way out
    assert_eq!(updated[0].record.drug_name, "Tirzepatide");

    subscription.unsubscribe();
}

#[tokio::test]
async fn snapshots_arrive_newest_first() {
    let store: Arc<RecordingStore> = Arc::new(RecordingStore::new());
    store
        .add(&candidate("Tirzepatide", "SURMOUNT-1", "Phase 3"))
        .await
        .unwrap();
    store
        .add(&candidate("Semaglutide", "STEP 1", "Phase 3"))
        .await
        .unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let _subscription = subscribe(store.clone(), move |studies| {
        tx.send(studies).ok();
    });

    let snapshot = next_snapshot(&mut rx).await;
    assert_eq!(snapshot[0].record.drug_name, "Semaglutide");
    assert_eq!(snapshot[1].record.drug_name, "Tirzepatide");
}

#[tokio::test]
async fn unsubscribe_stops_delivery() {
    let store: Arc<RecordingStore> = Arc::new(RecordingStore::new());
    let (tx, mut rx) = mpsc::unbounded_channel();

    let subscription = subscribe(store.clone(), move |studies| {
        tx.send(studies).ok();
    });
    let _ = next_snapshot(&mut rx).await;

    subscription.unsubscribe();

    store
        .add(&candidate("Mazdutide", "GLORY-1", "Phase 3"))
        .await
        .unwrap();

    // No further snapshot arrives once the subscription is gone
    let result = timeout(Duration::from_millis(300), rx.recv()).await;
    assert!(result.is_err() || result.unwrap().is_none());
}
