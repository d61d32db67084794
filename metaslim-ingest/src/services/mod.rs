//! Service layer for metaslim-ingest

pub mod ingestor;

pub use ingestor::{DocumentInput, DocumentOutcome, IngestError, Ingestor};
