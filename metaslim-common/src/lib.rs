//! # MetaSlim Common Library
//!
//! Shared code for MetaSlim services including:
//! - Domain types (studies, dose observations, candidate records)
//! - Event types (MetaslimEvent enum) and the broadcast EventBus
//! - Configuration loading
//! - Display normalization (company names, drug-name casing)

pub mod config;
pub mod error;
pub mod events;
pub mod normalize;
pub mod types;

pub use error::{Error, Result};
pub use types::{CandidateRecord, DoseObservation, Formulation, IdentityKey, Study, StudyId};
