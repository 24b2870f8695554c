use async_trait::async_trait;
use learn_core::model::{LearningProgress, UserId};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Persistence contract for chapter progress.
///
/// Adapters impose no deadline of their own: dropping a returned future
/// abandons the call, so callers wanting a timeout wrap it themselves.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Fetch one chapter record.
    ///
    /// Returns `Ok(None)` when the user has never touched the chapter.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn get(
        &self,
        user_id: UserId,
        topic: &str,
        chapter: &str,
    ) -> Result<Option<LearningProgress>, StorageError>;

    /// All records of a user, most recently visited first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn list_by_user(&self, user_id: UserId) -> Result<Vec<LearningProgress>, StorageError>;

    /// Records of a user within one topic, most recently visited first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn list_by_topic(
        &self,
        user_id: UserId,
        topic: &str,
    ) -> Result<Vec<LearningProgress>, StorageError>;

    /// Insert or replace the record keyed by `(user_id, topic, chapter)`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be stored.
    async fn upsert(&self, progress: &LearningProgress) -> Result<(), StorageError>;
}

type ProgressKey = (UserId, String, String);

fn key_of(progress: &LearningProgress) -> ProgressKey {
    (
        progress.user_id,
        progress.topic.clone(),
        progress.chapter.clone(),
    )
}

/// Most recent visit first; chapter name keeps equal timestamps stable.
pub(crate) fn by_recent_visit(a: &LearningProgress, b: &LearningProgress) -> Ordering {
    b.last_visit_at
        .cmp(&a.last_visit_at)
        .then_with(|| a.topic.cmp(&b.topic))
        .then_with(|| a.chapter.cmp(&b.chapter))
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    records: Arc<Mutex<HashMap<ProgressKey, LearningProgress>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn collect<F>(&self, filter: F) -> Result<Vec<LearningProgress>, StorageError>
    where
        F: Fn(&LearningProgress) -> bool,
    {
        let guard = self
            .records
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut out: Vec<LearningProgress> =
            guard.values().filter(|p| filter(p)).cloned().collect();
        out.sort_by(by_recent_visit);
        Ok(out)
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn get(
        &self,
        user_id: UserId,
        topic: &str,
        chapter: &str,
    ) -> Result<Option<LearningProgress>, StorageError> {
        let guard = self
            .records
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard
            .get(&(user_id, topic.to_string(), chapter.to_string()))
            .cloned())
    }

    async fn list_by_user(&self, user_id: UserId) -> Result<Vec<LearningProgress>, StorageError> {
        self.collect(|p| p.user_id == user_id)
    }

    async fn list_by_topic(
        &self,
        user_id: UserId,
        topic: &str,
    ) -> Result<Vec<LearningProgress>, StorageError> {
        self.collect(|p| p.user_id == user_id && p.topic == topic)
    }

    async fn upsert(&self, progress: &LearningProgress) -> Result<(), StorageError> {
        let mut guard = self
            .records
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let key = key_of(progress);
        let mut incoming = progress.clone();
        if let Some(existing) = guard.get(&key) {
            // first visit belongs to the original insert
            incoming.first_visit_at = existing.first_visit_at;
        }
        guard.insert(key, incoming);
        Ok(())
    }
}

/// Aggregates repository trait objects for easy wiring in apps/tests.
#[derive(Clone)]
pub struct Storage {
    pub progress: Arc<dyn ProgressRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let progress: Arc<dyn ProgressRepository> = Arc::new(InMemoryRepository::new());
        Self { progress }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use learn_core::model::ChapterStatus;
    use learn_core::time::fixed_now;

    fn build(user: u64, topic: &str, chapter: &str) -> LearningProgress {
        LearningProgress::new(UserId::new(user), topic, chapter, fixed_now())
    }

    #[tokio::test]
    async fn missing_record_is_none() {
        let repo = InMemoryRepository::new();
        let got = repo
            .get(UserId::new(1), "variables", "storage")
            .await
            .unwrap();
        assert!(got.is_none());
    }

    #[tokio::test]
    async fn upsert_replaces_by_key() {
        let repo = InMemoryRepository::new();
        let mut p = build(1, "variables", "storage");
        repo.upsert(&p).await.unwrap();

        p.read_duration = 300;
        p.status = ChapterStatus::InProgress;
        p.first_visit_at = fixed_now() + Duration::days(3);
        repo.upsert(&p).await.unwrap();

        let all = repo.list_by_user(UserId::new(1)).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].read_duration, 300);
        assert_eq!(all[0].status, ChapterStatus::InProgress);
        assert_eq!(all[0].first_visit_at, fixed_now());
    }

    #[tokio::test]
    async fn lists_are_scoped_and_ordered_by_recent_visit() {
        let repo = InMemoryRepository::new();
        let mut older = build(1, "variables", "storage");
        older.last_visit_at = fixed_now() - Duration::hours(1);
        let newer = build(1, "variables", "static");
        let other_topic = build(1, "types", "map");
        let other_user = build(2, "variables", "storage");
        for p in [&older, &newer, &other_topic, &other_user] {
            repo.upsert(p).await.unwrap();
        }

        let by_user = repo.list_by_user(UserId::new(1)).await.unwrap();
        assert_eq!(by_user.len(), 3);
        assert_eq!(by_user[2].chapter, "storage");

        let by_topic = repo
            .list_by_topic(UserId::new(1), "variables")
            .await
            .unwrap();
        let chapters: Vec<&str> = by_topic.iter().map(|p| p.chapter.as_str()).collect();
        assert_eq!(chapters, ["static", "storage"]);
    }

    #[test]
    fn repository_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<InMemoryRepository>();
        let storage = Storage::in_memory();
        let _ = Arc::clone(&storage.progress);
    }
}
