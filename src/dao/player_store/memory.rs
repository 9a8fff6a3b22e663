//! In-memory player store used by tests and single-process deployments that
//! do not need durability.

use std::sync::Arc;

use dashmap::DashMap;
use futures::future::BoxFuture;

use crate::dao::{
    models::{AnswerEntity, PlayerEntity, TaskEntity, canonical_email},
    player_store::{PlayerStore, apply_initialize, apply_save},
    storage::StorageResult,
};

/// Volatile [`PlayerStore`] keeping records in a concurrent map.
#[derive(Clone, Default)]
pub struct MemoryStore {
    records: Arc<DashMap<String, PlayerEntity>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl PlayerStore for MemoryStore {
    fn initialize(
        &self,
        name: String,
        email: String,
        tasks: Vec<TaskEntity>,
    ) -> BoxFuture<'static, StorageResult<PlayerEntity>> {
        let records = self.records.clone();
        Box::pin(async move {
            let email = canonical_email(&email);
            let existing = records.get(&email).map(|entry| entry.clone());
            let record = apply_initialize(existing, &name, email.clone(), tasks);
            records.insert(email, record.clone());
            Ok(record)
        })
    }

    fn save_progress(
        &self,
        email: String,
        score: u32,
        answers: Vec<AnswerEntity>,
    ) -> BoxFuture<'static, StorageResult<PlayerEntity>> {
        let records = self.records.clone();
        Box::pin(async move {
            let email = canonical_email(&email);
            let existing = records.get(&email).map(|entry| entry.clone());
            let record = apply_save(existing, email.clone(), score, answers);
            records.insert(email, record.clone());
            Ok(record)
        })
    }

    fn find(&self, email: String) -> BoxFuture<'static, StorageResult<Option<PlayerEntity>>> {
        let records = self.records.clone();
        Box::pin(async move {
            let email = canonical_email(&email);
            Ok(records.get(&email).map(|entry| entry.clone()))
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}
