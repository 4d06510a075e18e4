//! HTTP adapters - REST API implementations.
//!
//! The ingestion API is the only surface; `/health` reports liveness.

pub mod ingestion;

// Re-export key types for convenience
pub use ingestion::{health_routes, ingestion_routes, IngestionHandlers};
