//! Explicit, injectable registry of live sessions.
//!
//! Each session sits behind its own [`tokio::sync::Mutex`], so operations
//! on one session are serialized while different sessions proceed in
//! parallel. The handle also carries the cancellation flag and the
//! bookkeeping for background document extraction.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex, MutexGuard as StdMutexGuard};
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard, RwLock};
use tokio::task::JoinHandle;

use crate::domain::extraction::{DocumentUpload, ProcessingStatus};
use crate::domain::foundation::{SessionId, Timestamp, UploadId};
use crate::domain::session::{ConversationSession, SessionError};

pub struct SessionHandle {
    id: SessionId,
    session: Mutex<ConversationSession>,
    cancelled: AtomicBool,
    uploads: RwLock<HashMap<UploadId, DocumentUpload>>,
    tasks: StdMutex<HashMap<UploadId, JoinHandle<()>>>,
}

impl SessionHandle {
    pub fn new(session: ConversationSession) -> Self {
        Self {
            id: session.id(),
            session: Mutex::new(session),
            cancelled: AtomicBool::new(false),
            uploads: RwLock::new(HashMap::new()),
            tasks: StdMutex::new(HashMap::new()),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Exclusive access to the session for the duration of one operation.
    pub async fn lock(&self) -> MutexGuard<'_, ConversationSession> {
        self.session.lock().await
    }

    /// Raised before a cancel waits for the session lock, so an in-flight
    /// turn or extraction can stop early and discard its results.
    pub fn mark_cancelled(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn clear_cancelled(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Uploads
    // ─────────────────────────────────────────────────────────────────────

    pub async fn upload(&self, id: UploadId) -> Option<DocumentUpload> {
        self.uploads.read().await.get(&id).cloned()
    }

    pub async fn uploads(&self) -> Vec<DocumentUpload> {
        let mut uploads: Vec<DocumentUpload> = self.uploads.read().await.values().cloned().collect();
        uploads.sort_by(|a, b| a.created_at().as_datetime().cmp(b.created_at().as_datetime()));
        uploads
    }

    /// A live or completed upload with this content. Failed uploads are
    /// skipped so the same file can be sent again.
    pub async fn find_by_fingerprint(&self, fingerprint: &str) -> Option<DocumentUpload> {
        self.uploads
            .read()
            .await
            .values()
            .find(|upload| upload.fingerprint() == fingerprint && upload.status() != ProcessingStatus::Failed)
            .cloned()
    }

    pub async fn put_upload(&self, upload: DocumentUpload) {
        self.uploads.write().await.insert(upload.id(), upload);
    }

    /// Applies `change` to a stored upload and returns the updated record.
    pub async fn update_upload<F>(&self, id: UploadId, change: F) -> Option<DocumentUpload>
    where
        F: FnOnce(&mut DocumentUpload),
    {
        let mut uploads = self.uploads.write().await;
        let upload = uploads.get_mut(&id)?;
        change(upload);
        Some(upload.clone())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Background extraction tasks
    // ─────────────────────────────────────────────────────────────────────

    fn tasks(&self) -> StdMutexGuard<'_, HashMap<UploadId, JoinHandle<()>>> {
        self.tasks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn track_task(&self, id: UploadId, task: JoinHandle<()>) {
        self.tasks().insert(id, task);
    }

    pub fn finish_task(&self, id: UploadId) {
        self.tasks().remove(&id);
    }

    /// Aborts a running extraction. Returns false if none was running.
    pub fn abort_task(&self, id: UploadId) -> bool {
        match self.tasks().remove(&id) {
            Some(task) if !task.is_finished() => {
                task.abort();
                true
            }
            _ => false,
        }
    }

    pub fn abort_all_tasks(&self) -> Vec<UploadId> {
        self.tasks()
            .drain()
            .filter(|(_, task)| !task.is_finished())
            .map(|(id, task)| {
                task.abort();
                id
            })
            .collect()
    }
}

#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<SessionId, Arc<SessionHandle>>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, session: ConversationSession) -> Arc<SessionHandle> {
        let handle = Arc::new(SessionHandle::new(session));
        self.sessions.write().await.insert(handle.id(), Arc::clone(&handle));
        handle
    }

    pub async fn get(&self, id: SessionId) -> Result<Arc<SessionHandle>, SessionError> {
        self.sessions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(SessionError::NotFound(id))
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Removes terminal sessions untouched for longer than `retention`.
    /// Sessions busy with an operation are skipped and reconsidered on the
    /// next sweep.
    pub async fn evict_expired(&self, retention: Duration) -> Vec<SessionId> {
        let cutoff = Timestamp::now().minus_secs(retention.as_secs());
        let mut sessions = self.sessions.write().await;
        let expired: Vec<SessionId> = sessions
            .values()
            .filter(|handle| {
                handle
                    .session
                    .try_lock()
                    .map(|session| session.is_expired(&cutoff))
                    .unwrap_or(false)
            })
            .map(|handle| handle.id())
            .collect();
        for id in &expired {
            if let Some(handle) = sessions.remove(id) {
                handle.abort_all_tasks();
            }
        }
        if !expired.is_empty() {
            tracing::info!(evicted = expired.len(), remaining = sessions.len(), "evicted expired sessions");
        }
        expired
    }
}
