//! Document extraction: admission, flattening and field detection.
//!
//! Format readers live behind the `DocumentTextReader` port; this module
//! owns everything that happens once the text is flat.

mod confidence;
mod document;
mod errors;
mod flat_text;
mod patterns;
mod structured;

pub use confidence::ConfidencePolicy;
pub use document::{DocumentFormat, DocumentUpload, ProcessingStatus, RawDocument, UploadPolicy};
pub use errors::ExtractionError;
pub use flat_text::FlatText;
pub use patterns::PatternExtractor;
pub use structured::{extraction_input, extraction_instructions, ModelFieldReader, ModelOutputError};
