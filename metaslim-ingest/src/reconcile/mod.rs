//! Extraction reconciliation pipeline
//!
//! Candidate records produced by the AI extraction boundary pass through two
//! stages before reaching storage:
//! - **filter**: per-candidate accept/reject with a reject reason, plus
//!   duplicate detection against the dataset snapshot
//! - **reconciler**: one storage mutation per accepted candidate
//!   (insert-or-update on the natural identity key), outcome counters, and
//!   the user-facing batch summary

pub mod filter;
pub mod reconciler;

pub use filter::{classify, Classification, RejectReason};
pub use reconciler::{reconcile, BatchOutcome, ReconcileError};
