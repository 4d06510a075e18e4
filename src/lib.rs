//! Project Ingestion - conversational intake of real-estate project records
//!
//! A session gathers the fields of one project draft from chat messages and
//! uploaded documents (PDF, DOCX, XLSX/XLS), merges candidates by confidence,
//! surfaces conflicts for the user to settle, and finalizes the draft once
//! every required field is present.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
pub mod server;
