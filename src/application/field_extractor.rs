//! Pattern extraction with an optional model-assisted pass.

use std::sync::Arc;

use crate::domain::extraction::{
    extraction_input, extraction_instructions, ConfidencePolicy, FlatText, ModelFieldReader, PatternExtractor,
};
use crate::domain::foundation::SessionId;
use crate::domain::project::{ExtractedFieldSet, Origin};
use crate::ports::{AIProvider, CompletionRequest, Message, RequestMetadata, RequestPurpose};

/// Runs the deterministic pattern pass and, when asked, the model pass.
///
/// Model values are scored against the source text by `ModelFieldReader`;
/// they are added to the pattern hits without displacing them.
pub struct FieldExtractor {
    ai: Arc<dyn AIProvider>,
    patterns: PatternExtractor,
    reader: ModelFieldReader,
    input_chars: usize,
}

impl FieldExtractor {
    pub fn new(ai: Arc<dyn AIProvider>, policy: ConfidencePolicy, input_chars: usize) -> Self {
        Self {
            ai,
            patterns: PatternExtractor::new(policy),
            reader: ModelFieldReader::new(policy),
            input_chars,
        }
    }

    pub async fn extract(
        &self,
        session_id: SessionId,
        text: &FlatText,
        origin: Origin,
        use_model: bool,
    ) -> ExtractedFieldSet {
        let mut hits = self.patterns.extract(text, origin);
        if !use_model || text.is_blank() {
            return hits;
        }

        let request = CompletionRequest::new(RequestPurpose::Extraction, RequestMetadata::new(session_id))
            .with_system_prompt(extraction_instructions())
            .with_message(Message::user(extraction_input(text, self.input_chars)))
            .with_temperature(0.0);

        let answer = match self.ai.complete(request).await {
            Ok(response) => response.content,
            Err(err) => {
                tracing::warn!(%session_id, error = %err, "model extraction failed, keeping pattern hits");
                return hits;
            }
        };

        match self.reader.read(&answer, text, &hits, origin) {
            Ok(model_fields) => {
                let model_only: ExtractedFieldSet = model_fields
                    .iter()
                    .filter(|(path, _)| hits.get(*path).is_none())
                    .fold(ExtractedFieldSet::new(), |set, (path, candidate)| {
                        set.with(path, candidate.clone())
                    });
                tracing::debug!(%session_id, added = model_only.len(), "model extraction merged");
                hits.absorb(model_only);
            }
            Err(err) => {
                tracing::warn!(%session_id, error = %err, "model extraction answer unusable");
            }
        }
        hits
    }
}
