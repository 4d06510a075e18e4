//! Uploaded documents and their processing lifecycle.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use super::errors::ExtractionError;
use crate::domain::foundation::{InvalidTransition, SessionId, StateMachine, Timestamp, UploadId};
use crate::domain::project::ExtractedFieldSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Pdf,
    Docx,
    Xlsx,
    Xls,
}

impl DocumentFormat {
    pub const ALL: [DocumentFormat; 4] = [
        DocumentFormat::Pdf,
        DocumentFormat::Docx,
        DocumentFormat::Xlsx,
        DocumentFormat::Xls,
    ];

    pub fn extension(&self) -> &'static str {
        match self {
            DocumentFormat::Pdf => "pdf",
            DocumentFormat::Docx => "docx",
            DocumentFormat::Xlsx => "xlsx",
            DocumentFormat::Xls => "xls",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            DocumentFormat::Pdf => "application/pdf",
            DocumentFormat::Docx => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            DocumentFormat::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            DocumentFormat::Xls => "application/vnd.ms-excel",
        }
    }

    pub fn is_spreadsheet(&self) -> bool {
        matches!(self, DocumentFormat::Xlsx | DocumentFormat::Xls)
    }

    /// Resolves a declared media type, which may be a MIME type or a bare
    /// extension. Falls back to the file name's extension.
    pub fn resolve(media_type: &str, file_name: Option<&str>) -> Result<Self, ExtractionError> {
        let declared = media_type.trim().trim_start_matches('.').to_lowercase();
        let by_declared = DocumentFormat::ALL
            .into_iter()
            .find(|format| format.mime_type() == declared || format.extension() == declared);
        if let Some(format) = by_declared {
            return Ok(format);
        }
        let by_name = file_name
            .and_then(|name| name.rsplit_once('.'))
            .map(|(_, ext)| ext.to_lowercase())
            .and_then(|ext| DocumentFormat::ALL.into_iter().find(|format| format.extension() == ext));
        by_name.ok_or_else(|| ExtractionError::unsupported(media_type))
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Raw bytes plus what the caller claims they are.
#[derive(Debug, Clone)]
pub struct RawDocument {
    pub file_name: Option<String>,
    pub media_type: String,
    pub bytes: Vec<u8>,
}

impl RawDocument {
    pub fn new(media_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: None,
            media_type: media_type.into(),
            bytes,
        }
    }

    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }

    /// Hex SHA-256 of the content.
    pub fn fingerprint(&self) -> String {
        Sha256::digest(&self.bytes)
            .iter()
            .map(|byte| format!("{:02x}", byte))
            .collect()
    }
}

/// Size and type allow-list applied before any parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPolicy {
    pub max_bytes: usize,
    pub allowed: Vec<DocumentFormat>,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            max_bytes: 10 * 1024 * 1024,
            allowed: DocumentFormat::ALL.to_vec(),
        }
    }
}

impl UploadPolicy {
    pub fn admit(&self, raw: &RawDocument) -> Result<DocumentFormat, ExtractionError> {
        let format = DocumentFormat::resolve(&raw.media_type, raw.file_name.as_deref())?;
        if !self.allowed.contains(&format) {
            return Err(ExtractionError::unsupported(format.extension()));
        }
        if raw.bytes.len() > self.max_bytes {
            return Err(ExtractionError::FileTooLarge {
                size: raw.bytes.len(),
                limit: self.max_bytes,
            });
        }
        if raw.bytes.is_empty() {
            return Err(ExtractionError::EmptyDocument);
        }
        Ok(format)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProcessingStatus::Pending => "pending",
            ProcessingStatus::Processing => "processing",
            ProcessingStatus::Completed => "completed",
            ProcessingStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

impl StateMachine for ProcessingStatus {
    fn valid_transitions(&self) -> Vec<Self> {
        match self {
            ProcessingStatus::Pending => vec![ProcessingStatus::Processing, ProcessingStatus::Failed],
            ProcessingStatus::Processing => vec![ProcessingStatus::Completed, ProcessingStatus::Failed],
            ProcessingStatus::Completed | ProcessingStatus::Failed => vec![],
        }
    }
}

/// Upload record. Persisting it is the caller's job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentUpload {
    id: UploadId,
    session_id: SessionId,
    file_name: Option<String>,
    format: DocumentFormat,
    size_bytes: usize,
    fingerprint: String,
    status: ProcessingStatus,
    fields: Option<ExtractedFieldSet>,
    error: Option<ExtractionError>,
    created_at: Timestamp,
    updated_at: Timestamp,
}

impl DocumentUpload {
    pub fn new(session_id: SessionId, raw: &RawDocument, format: DocumentFormat) -> Self {
        let now = Timestamp::now();
        Self {
            id: UploadId::new(),
            session_id,
            file_name: raw.file_name.clone(),
            format,
            size_bytes: raw.bytes.len(),
            fingerprint: raw.fingerprint(),
            status: ProcessingStatus::Pending,
            fields: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id(&self) -> UploadId {
        self.id
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    pub fn format(&self) -> DocumentFormat {
        self.format
    }

    pub fn size_bytes(&self) -> usize {
        self.size_bytes
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn status(&self) -> ProcessingStatus {
        self.status
    }

    pub fn fields(&self) -> Option<&ExtractedFieldSet> {
        self.fields.as_ref()
    }

    pub fn error(&self) -> Option<&ExtractionError> {
        self.error.as_ref()
    }

    pub fn created_at(&self) -> &Timestamp {
        &self.created_at
    }

    pub fn updated_at(&self) -> &Timestamp {
        &self.updated_at
    }

    pub fn start_processing(&mut self) -> Result<(), InvalidTransition<ProcessingStatus>> {
        self.status = self.status.transition_to(ProcessingStatus::Processing)?;
        self.updated_at = Timestamp::now();
        Ok(())
    }

    pub fn complete(&mut self, fields: ExtractedFieldSet) -> Result<(), InvalidTransition<ProcessingStatus>> {
        self.status = self.status.transition_to(ProcessingStatus::Completed)?;
        self.fields = Some(fields);
        self.updated_at = Timestamp::now();
        Ok(())
    }

    pub fn fail(&mut self, error: ExtractionError) -> Result<(), InvalidTransition<ProcessingStatus>> {
        self.status = self.status.transition_to(ProcessingStatus::Failed)?;
        self.error = Some(error);
        self.updated_at = Timestamp::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod formats {
        use super::*;

        #[test]
        fn resolves_mime_types() {
            assert_eq!(DocumentFormat::resolve("application/pdf", None).unwrap(), DocumentFormat::Pdf);
            assert_eq!(
                DocumentFormat::resolve(DocumentFormat::Xlsx.mime_type(), None).unwrap(),
                DocumentFormat::Xlsx
            );
        }

        #[test]
        fn resolves_bare_extensions() {
            assert_eq!(DocumentFormat::resolve(".DOCX", None).unwrap(), DocumentFormat::Docx);
        }

        #[test]
        fn falls_back_to_file_name() {
            let format = DocumentFormat::resolve("application/octet-stream", Some("brochure.xls")).unwrap();
            assert_eq!(format, DocumentFormat::Xls);
        }

        #[test]
        fn rejects_unknown_types() {
            let err = DocumentFormat::resolve("image/png", Some("plan.png")).unwrap_err();
            assert_eq!(err, ExtractionError::unsupported("image/png"));
        }
    }

    mod policy {
        use super::*;

        #[test]
        fn rejects_oversized_files() {
            let policy = UploadPolicy {
                max_bytes: 4,
                ..UploadPolicy::default()
            };
            let err = policy.admit(&RawDocument::new("pdf", vec![0; 5])).unwrap_err();
            assert!(matches!(err, ExtractionError::FileTooLarge { size: 5, limit: 4 }));
        }

        #[test]
        fn rejects_formats_outside_allow_list() {
            let policy = UploadPolicy {
                allowed: vec![DocumentFormat::Pdf],
                ..UploadPolicy::default()
            };
            assert!(policy.admit(&RawDocument::new("xlsx", vec![1])).is_err());
        }

        #[test]
        fn empty_file_is_empty_document() {
            let err = UploadPolicy::default().admit(&RawDocument::new("pdf", vec![])).unwrap_err();
            assert_eq!(err, ExtractionError::EmptyDocument);
        }
    }

    mod lifecycle {
        use super::*;

        fn upload() -> DocumentUpload {
            let raw = RawDocument::new("pdf", b"%PDF".to_vec()).with_file_name("brochure.pdf");
            DocumentUpload::new(SessionId::new(), &raw, DocumentFormat::Pdf)
        }

        #[test]
        fn starts_pending_with_fingerprint() {
            let upload = upload();
            assert_eq!(upload.status(), ProcessingStatus::Pending);
            assert_eq!(upload.fingerprint().len(), 64);
            assert_eq!(upload.file_name(), Some("brochure.pdf"));
        }

        #[test]
        fn completes_through_processing() {
            let mut upload = upload();
            upload.start_processing().unwrap();
            upload.complete(ExtractedFieldSet::new()).unwrap();
            assert_eq!(upload.status(), ProcessingStatus::Completed);
            assert!(upload.fields().is_some());
        }

        #[test]
        fn cannot_complete_without_processing() {
            let mut upload = upload();
            assert!(upload.complete(ExtractedFieldSet::new()).is_err());
            assert_eq!(upload.status(), ProcessingStatus::Pending);
        }

        #[test]
        fn pending_upload_can_fail_directly() {
            let mut upload = upload();
            upload.fail(ExtractionError::Cancelled).unwrap();
            assert_eq!(upload.status(), ProcessingStatus::Failed);
            assert_eq!(upload.error(), Some(&ExtractionError::Cancelled));
        }

        #[test]
        fn identical_bytes_share_a_fingerprint() {
            let a = RawDocument::new("pdf", b"same".to_vec());
            let b = RawDocument::new("docx", b"same".to_vec());
            assert_eq!(a.fingerprint(), b.fingerprint());
        }
    }
}
