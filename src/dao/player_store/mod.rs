//! Abstraction over the persistence layer for player records.

pub mod file;
pub mod memory;

use futures::future::BoxFuture;

use crate::dao::{
    models::{AnswerEntity, PlayerEntity, TaskEntity},
    storage::StorageResult,
};

/// Key-value style store holding one [`PlayerEntity`] per canonical email.
///
/// All operations canonicalize the email they are given, and every write is a
/// read-modify-write over the full record. A single active game session is
/// assumed; no concurrent-writer coordination is provided beyond internal
/// serialization of individual operations.
pub trait PlayerStore: Send + Sync {
    /// Create or reset the record for `email`: tasks are overwritten, score
    /// and answers reset, and the stored name is kept when the new one is
    /// blank. Returns the stored record.
    fn initialize(
        &self,
        name: String,
        email: String,
        tasks: Vec<TaskEntity>,
    ) -> BoxFuture<'static, StorageResult<PlayerEntity>>;

    /// Merge `score` and `answers` into the existing record for `email`,
    /// creating an empty base when absent. Returns the merged record.
    fn save_progress(
        &self,
        email: String,
        score: u32,
        answers: Vec<AnswerEntity>,
    ) -> BoxFuture<'static, StorageResult<PlayerEntity>>;

    /// Canonical lookup; `None` when the identity was never initialized.
    fn find(&self, email: String) -> BoxFuture<'static, StorageResult<Option<PlayerEntity>>>;

    /// Probe the backing medium.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
}

/// Record transformation behind [`PlayerStore::initialize`], shared by all
/// backends so their merge semantics cannot drift apart.
pub(super) fn apply_initialize(
    existing: Option<PlayerEntity>,
    name: &str,
    email: String,
    tasks: Vec<TaskEntity>,
) -> PlayerEntity {
    let name = name.trim();
    match existing {
        Some(mut record) => {
            if !name.is_empty() {
                record.name = name.to_string();
            }
            record.email = email;
            record.tasks = tasks;
            record.score = 0;
            record.answers.clear();
            record.updated_at = std::time::SystemTime::now();
            record
        }
        None => PlayerEntity::new(name.to_string(), email, tasks),
    }
}

/// Record transformation behind [`PlayerStore::save_progress`].
pub(super) fn apply_save(
    existing: Option<PlayerEntity>,
    email: String,
    score: u32,
    answers: Vec<AnswerEntity>,
) -> PlayerEntity {
    let mut record = existing.unwrap_or_else(|| PlayerEntity::empty(email.clone()));
    record.email = email;
    record.score = score;
    record.answers = answers;
    record.updated_at = std::time::SystemTime::now();
    record
}

#[cfg(test)]
mod tests {
    use super::memory::MemoryStore;
    use super::*;

    fn task(answer: &str, factor: u32) -> TaskEntity {
        TaskEntity {
            prompt: format!("videos/{answer}.mp4"),
            right_answer: answer.into(),
            factor,
        }
    }

    #[tokio::test]
    async fn lookup_is_case_and_whitespace_insensitive() {
        let store = MemoryStore::new();
        store
            .initialize("Al".into(), "  A@B.com ".into(), vec![task("git", 5)])
            .await
            .unwrap();

        let found = store.find("a@b.com".into()).await.unwrap().unwrap();
        assert_eq!(found.email, "a@b.com");
        assert_eq!(found.name, "Al");

        let same = store.find("  A@B.COM ".into()).await.unwrap().unwrap();
        assert_eq!(same, found);
    }

    #[tokio::test]
    async fn initialize_resets_progress_but_keeps_name_when_blank() {
        let store = MemoryStore::new();
        store
            .initialize("Al".into(), "a@b.com".into(), vec![task("git", 5)])
            .await
            .unwrap();
        store
            .save_progress(
                "a@b.com".into(),
                5,
                vec![AnswerEntity {
                    user_input: Some("git".into()),
                    is_right: true,
                }],
            )
            .await
            .unwrap();

        let reset = store
            .initialize("  ".into(), "A@B.COM".into(), vec![task("docker", 3)])
            .await
            .unwrap();
        assert_eq!(reset.name, "Al");
        assert_eq!(reset.score, 0);
        assert!(reset.answers.is_empty());
        assert_eq!(reset.tasks, vec![task("docker", 3)]);
    }

    #[tokio::test]
    async fn save_merges_into_existing_record() {
        let store = MemoryStore::new();
        store
            .initialize("Al".into(), "a@b.com".into(), vec![task("git", 5)])
            .await
            .unwrap();

        let answers = vec![AnswerEntity {
            user_input: Some("git".into()),
            is_right: true,
        }];
        store
            .save_progress("A@b.com ".into(), 5, answers.clone())
            .await
            .unwrap();

        let found = store.find("a@b.com".into()).await.unwrap().unwrap();
        assert_eq!(found.score, 5);
        assert_eq!(found.answers, answers);
        // Fields outside the save payload are preserved.
        assert_eq!(found.name, "Al");
        assert_eq!(found.tasks, vec![task("git", 5)]);
    }

    #[tokio::test]
    async fn save_without_prior_record_creates_an_empty_base() {
        let store = MemoryStore::new();
        let record = store
            .save_progress("ghost@b.com".into(), 3, Vec::new())
            .await
            .unwrap();
        assert_eq!(record.name, "");
        assert!(record.tasks.is_empty());
        assert_eq!(record.score, 3);
    }

    #[tokio::test]
    async fn find_unknown_identity_is_none() {
        let store = MemoryStore::new();
        assert!(store.find("nobody@b.com".into()).await.unwrap().is_none());
    }
}
