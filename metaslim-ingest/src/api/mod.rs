//! HTTP API handlers for metaslim-ingest

pub mod extract;
pub mod health;
pub mod sse;
pub mod studies;

pub use extract::extract_routes;
pub use health::health_routes;
pub use sse::event_stream;
pub use studies::studies_routes;
