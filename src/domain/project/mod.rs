//! Project record: schema, draft, candidate values and the merge policy.

mod completion;
mod draft;
mod extracted;
mod merger;
mod schema;
mod value;

pub use completion::CompletionReport;
pub use draft::{AcceptedField, FieldConflict, ProjectDraft};
pub use extracted::{ExtractedFieldSet, FieldCandidate, Origin};
pub use merger::{ConflictResolution, FieldMerger, MergeConfig, MergeError, MergeOutcome};
pub use schema::{is_tax_id, FieldKind, FieldPath, CURRENCIES, PROJECT_STATUSES};
pub use value::{parse_amount, parse_bool, parse_year_month, FieldValue};
