use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use learn_core::model::{LearningProgress, UserId};

type UserEntries = BTreeMap<String, Vec<LearningProgress>>;

/// Best-effort copy of the most recent writes per user and topic.
///
/// Read paths fall back to it when the repository answers with an empty
/// list, which happens with eventually consistent stores and test doubles.
/// The lock is never held across an `.await`.
#[derive(Debug, Default)]
pub struct ProgressCache {
    entries: Mutex<HashMap<UserId, UserEntries>>,
}

impl ProgressCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // Entries are whole-record snapshots, consistent even after a poison.
    fn lock(&self) -> MutexGuard<'_, HashMap<UserId, UserEntries>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store `progress`, replacing the entry for the same chapter if present.
    pub fn record(&self, progress: &LearningProgress) {
        let mut guard = self.lock();
        let chapters = guard
            .entry(progress.user_id)
            .or_default()
            .entry(progress.topic.clone())
            .or_default();
        match chapters.iter_mut().find(|p| p.chapter == progress.chapter) {
            Some(slot) => *slot = progress.clone(),
            None => chapters.push(progress.clone()),
        }
    }

    /// Every cached record of a user, grouped by topic name.
    #[must_use]
    pub fn user_entries(&self, user_id: UserId) -> Vec<LearningProgress> {
        self.lock()
            .get(&user_id)
            .map(|topics| topics.values().flatten().cloned().collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn topic_entries(&self, user_id: UserId, topic: &str) -> Vec<LearningProgress> {
        self.lock()
            .get(&user_id)
            .and_then(|topics| topics.get(topic))
            .cloned()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use learn_core::time::fixed_now;

    fn build(user: u64, topic: &str, chapter: &str, read: u64) -> LearningProgress {
        let mut p = LearningProgress::new(UserId::new(user), topic, chapter, fixed_now());
        p.read_duration = read;
        p
    }

    #[test]
    fn record_replaces_same_chapter() {
        let cache = ProgressCache::new();
        cache.record(&build(1, "variables", "storage", 10));
        cache.record(&build(1, "variables", "storage", 40));
        cache.record(&build(1, "variables", "static", 5));

        let entries = cache.topic_entries(UserId::new(1), "variables");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].chapter, "storage");
        assert_eq!(entries[0].read_duration, 40);
    }

    #[test]
    fn lookups_are_scoped_per_user_and_topic() {
        let cache = ProgressCache::new();
        cache.record(&build(1, "variables", "storage", 10));
        cache.record(&build(1, "types", "map", 10));
        cache.record(&build(2, "types", "map", 10));

        let user_one = cache.user_entries(UserId::new(1));
        let topics: Vec<&str> = user_one.iter().map(|p| p.topic.as_str()).collect();
        assert_eq!(topics, ["types", "variables"]);

        assert!(cache.user_entries(UserId::new(3)).is_empty());
        assert!(cache.topic_entries(UserId::new(2), "variables").is_empty());
    }

    #[test]
    fn concurrent_writers_do_not_lose_chapters() {
        let cache = std::sync::Arc::new(ProgressCache::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cache = std::sync::Arc::clone(&cache);
                std::thread::spawn(move || {
                    cache.record(&build(1, "types", &format!("chapter-{i}"), i));
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(cache.topic_entries(UserId::new(1), "types").len(), 8);
    }
}
