//! Ingestion command and query handlers.

mod change_session_state;
mod generate_description;
mod get_status;
mod resolve_conflict;
mod send_message;
mod start_session;
mod upload_document;

pub use change_session_state::{
    ChangeSessionStateCommand, ChangeSessionStateHandler, ChangeSessionStateResult, SessionAction,
};
pub use generate_description::{GenerateDescriptionCommand, GenerateDescriptionHandler, GenerateDescriptionResult};
pub use get_status::{
    ConflictView, FieldView, GetSessionStatusHandler, GetSessionStatusQuery, MessageView, SessionSnapshot, UploadView,
};
pub use resolve_conflict::{ResolveConflictCommand, ResolveConflictHandler, ResolveConflictResult};
pub use send_message::{SendMessageCommand, SendMessageHandler, SendMessageResult};
pub use start_session::{StartSessionCommand, StartSessionHandler, StartSessionResult};
pub use upload_document::{
    CancelUploadCommand, CancelUploadHandler, GetUploadHandler, GetUploadQuery, UploadDocumentCommand,
    UploadDocumentHandler, UploadDocumentResult,
};
