//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `ai` - Language model providers and the model-backed summarizer
//! - `document` - PDF, Word and spreadsheet text readers
//! - `services` - Owner registry and project store clients
//! - `storage` - Tool call log
//! - `http` - axum REST API

pub mod ai;
pub mod document;
pub mod http;
pub mod services;
pub mod storage;
