//! Document Reader Port - format-specific text extraction.
//!
//! Readers are synchronous and CPU bound; callers run them on the blocking
//! pool. They only flatten text; field detection happens in the domain.

use crate::domain::extraction::{DocumentFormat, ExtractionError, FlatText};

/// Port for turning document bytes into flat text.
///
/// # Contract
///
/// Implementations must:
/// - Return `ParseFailure` for corrupt or undecodable input
/// - Return `EmptyDocument` when the document decodes but holds no text
/// - Return `UnsupportedFormat` for formats they do not handle
pub trait DocumentTextReader: Send + Sync {
    fn read(&self, format: DocumentFormat, bytes: &[u8]) -> Result<FlatText, ExtractionError>;
}
