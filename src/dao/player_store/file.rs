//! File-backed player store.
//!
//! Records live in a single JSON document mapping canonical emails to player
//! records, mirroring the abstract key-value contract of [`PlayerStore`].
//! Every operation is a full read-modify-write of the document, serialized by
//! an internal lock.

use std::{path::PathBuf, sync::Arc};

use futures::future::BoxFuture;
use indexmap::IndexMap;
use tokio::{fs, sync::Mutex};

use crate::dao::{
    models::{AnswerEntity, PlayerEntity, TaskEntity, canonical_email},
    player_store::{PlayerStore, apply_initialize, apply_save},
    storage::{StorageError, StorageResult},
};

type RecordMap = IndexMap<String, PlayerEntity>;

#[derive(Debug)]
struct FileStoreInner {
    path: PathBuf,
    /// Serializes read-modify-write cycles; the store assumes a single active
    /// session but routes may still probe it concurrently.
    write_lock: Mutex<()>,
}

/// [`PlayerStore`] persisting records to a JSON file on local disk.
#[derive(Clone, Debug)]
pub struct FileStore {
    inner: Arc<FileStoreInner>,
}

impl FileStore {
    /// Open the store at `path`, creating parent directories and validating
    /// that any existing document decodes.
    pub async fn connect(path: PathBuf) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await.map_err(|source| {
                    StorageError::unavailable(
                        format!("creating store directory `{}`", parent.display()),
                        source,
                    )
                })?;
            }
        }

        let store = Self {
            inner: Arc::new(FileStoreInner {
                path,
                write_lock: Mutex::new(()),
            }),
        };

        // Fail fast on an unreadable or undecodable document instead of at
        // the first round save.
        store.load().await?;
        Ok(store)
    }

    async fn load(&self) -> StorageResult<RecordMap> {
        let path = &self.inner.path;
        match fs::read(path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|source| {
                StorageError::corrupted(format!("decoding store file `{}`", path.display()), source)
            }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(RecordMap::new()),
            Err(source) => Err(StorageError::unavailable(
                format!("reading store file `{}`", path.display()),
                source,
            )),
        }
    }

    async fn persist(&self, records: &RecordMap) -> StorageResult<()> {
        let path = &self.inner.path;
        let bytes = serde_json::to_vec_pretty(records).map_err(|source| {
            StorageError::corrupted(format!("encoding store file `{}`", path.display()), source)
        })?;
        fs::write(path, bytes).await.map_err(|source| {
            StorageError::unavailable(format!("writing store file `{}`", path.display()), source)
        })
    }

    /// Apply `mutate` to the record under the canonical email and persist the
    /// whole document before returning the stored record.
    async fn map_record<F>(&self, email: String, mutate: F) -> StorageResult<PlayerEntity>
    where
        F: FnOnce(Option<PlayerEntity>, String) -> PlayerEntity,
    {
        let _guard = self.inner.write_lock.lock().await;
        let email = canonical_email(&email);
        let mut records = self.load().await?;
        let record = mutate(records.shift_remove(&email), email.clone());
        records.insert(email, record.clone());
        self.persist(&records).await?;
        Ok(record)
    }
}

impl PlayerStore for FileStore {
    fn initialize(
        &self,
        name: String,
        email: String,
        tasks: Vec<TaskEntity>,
    ) -> BoxFuture<'static, StorageResult<PlayerEntity>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .map_record(email, |existing, email| {
                    apply_initialize(existing, &name, email, tasks)
                })
                .await
        })
    }

    fn save_progress(
        &self,
        email: String,
        score: u32,
        answers: Vec<AnswerEntity>,
    ) -> BoxFuture<'static, StorageResult<PlayerEntity>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .map_record(email, |existing, email| {
                    apply_save(existing, email, score, answers)
                })
                .await
        })
    }

    fn find(&self, email: String) -> BoxFuture<'static, StorageResult<Option<PlayerEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let email = canonical_email(&email);
            let records = store.load().await?;
            Ok(records.get(&email).cloned())
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.load().await.map(|_| ()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::models::TaskEntity;
    use uuid::Uuid;

    fn scratch_path() -> PathBuf {
        std::env::temp_dir().join(format!("charades-store-{}.json", Uuid::new_v4().simple()))
    }

    fn task() -> TaskEntity {
        TaskEntity {
            prompt: "videos/git.mp4".into(),
            right_answer: "git".into(),
            factor: 5,
        }
    }

    #[tokio::test]
    async fn records_survive_reopening_the_store() {
        let path = scratch_path();

        {
            let store = FileStore::connect(path.clone()).await.unwrap();
            store
                .initialize("Al".into(), "A@B.com".into(), vec![task()])
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
        }

        let reopened = FileStore::connect(path.clone()).await.unwrap();
        let record = reopened.find("  a@B.COM ".into()).await.unwrap().unwrap();
        assert_eq!(record.name, "Al");
        assert_eq!(record.score, 5);
        assert_eq!(record.answers.len(), 1);

        let _ = fs::remove_file(path).await;
    }

    #[tokio::test]
    async fn connect_rejects_an_undecodable_document() {
        let path = scratch_path();
        fs::write(&path, b"not json").await.unwrap();

        let err = FileStore::connect(path.clone()).await.unwrap_err();
        assert!(matches!(err, StorageError::Corrupted { .. }));

        let _ = fs::remove_file(path).await;
    }
}
