//! In-memory owner registry and project store.
//!
//! Both fakes can be scripted with failures (consumed one per call) and a
//! per-call delay, which is how tests exercise timeouts and retries. The
//! project store can also answer late after it has already committed.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::sleep;

use crate::domain::foundation::ProjectId;
use crate::ports::{OwnerRecord, OwnerRegistry, ProjectRecord, ProjectStore, ServiceError};

#[derive(Debug, Clone, Default)]
struct Script {
    failures: Arc<RwLock<VecDeque<ServiceError>>>,
    delay: Arc<RwLock<Duration>>,
    calls: Arc<AtomicUsize>,
}

impl Script {
    /// Counts the call, waits out the delay and pops a scripted failure.
    async fn enter(&self) -> Result<(), ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.read().await;
        if !delay.is_zero() {
            sleep(delay).await;
        }
        match self.failures.write().await.pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryOwnerRegistry {
    owners: Arc<RwLock<HashMap<String, OwnerRecord>>>,
    script: Script,
}

impl InMemoryOwnerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, owner: OwnerRecord) {
        self.owners.write().await.insert(normalize_tax_id(&owner.tax_id), owner);
    }

    /// The next call fails with `err`. Queued failures are used in order.
    pub async fn fail_next(&self, err: ServiceError) {
        self.script.failures.write().await.push_back(err);
    }

    pub async fn set_delay(&self, delay: Duration) {
        *self.script.delay.write().await = delay;
    }

    pub fn call_count(&self) -> usize {
        self.script.calls.load(Ordering::SeqCst)
    }
}

/// Tax ids compare on digits only, so `900.123.456-7` finds `900123456-7`.
fn normalize_tax_id(tax_id: &str) -> String {
    tax_id.chars().filter(char::is_ascii_digit).collect()
}

#[async_trait]
impl OwnerRegistry for InMemoryOwnerRegistry {
    async fn find_by_tax_id(&self, tax_id: &str) -> Result<Option<OwnerRecord>, ServiceError> {
        self.script.enter().await?;
        Ok(self.owners.read().await.get(&normalize_tax_id(tax_id)).cloned())
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryProjectStore {
    projects: Arc<RwLock<HashMap<ProjectId, Map<String, Value>>>>,
    by_key: Arc<RwLock<HashMap<String, ProjectId>>>,
    next_id: Arc<AtomicUsize>,
    creates: Arc<AtomicUsize>,
    late_reply: Arc<RwLock<Option<Duration>>>,
    script: Script,
}

impl InMemoryProjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn fail_next(&self, err: ServiceError) {
        self.script.failures.write().await.push_back(err);
    }

    pub async fn set_delay(&self, delay: Duration) {
        *self.script.delay.write().await = delay;
    }

    /// The next successful create commits first and then answers after `delay`.
    pub async fn reply_late_once(&self, delay: Duration) {
        *self.late_reply.write().await = Some(delay);
    }

    /// Number of projects actually created (failed attempts excluded).
    pub fn create_count(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn call_count(&self) -> usize {
        self.script.calls.load(Ordering::SeqCst)
    }

    pub async fn project_count(&self) -> usize {
        self.projects.read().await.len()
    }

    pub async fn stored(&self, id: &ProjectId) -> Option<Map<String, Value>> {
        self.projects.read().await.get(id).cloned()
    }
}

#[async_trait]
impl ProjectStore for InMemoryProjectStore {
    async fn create(&self, idempotency_key: &str, fields: Map<String, Value>) -> Result<ProjectId, ServiceError> {
        self.script.enter().await?;
        let id = {
            let mut by_key = self.by_key.write().await;
            if let Some(existing) = by_key.get(idempotency_key) {
                return Ok(existing.clone());
            }
            let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
            let id = ProjectId::new(format!("P-{}", n)).map_err(|e| ServiceError::rejected(e.to_string()))?;
            self.projects.write().await.insert(id.clone(), fields);
            by_key.insert(idempotency_key.to_string(), id.clone());
            self.creates.fetch_add(1, Ordering::SeqCst);
            id
        };
        let late = self.late_reply.write().await.take();
        if let Some(delay) = late {
            sleep(delay).await;
        }
        Ok(id)
    }

    async fn update(&self, id: &ProjectId, fields: Map<String, Value>) -> Result<ProjectRecord, ServiceError> {
        self.script.enter().await?;
        let mut projects = self.projects.write().await;
        let stored = projects
            .get_mut(id)
            .ok_or_else(|| ServiceError::not_found(format!("project {}", id.as_str())))?;
        stored.extend(fields);
        Ok(ProjectRecord {
            id: id.clone(),
            fields: stored.clone(),
        })
    }

    async fn get(&self, id: &ProjectId) -> Result<ProjectRecord, ServiceError> {
        self.script.enter().await?;
        self.projects
            .read()
            .await
            .get(id)
            .map(|fields| ProjectRecord {
                id: id.clone(),
                fields: fields.clone(),
            })
            .ok_or_else(|| ServiceError::not_found(format!("project {}", id.as_str())))
    }
}
