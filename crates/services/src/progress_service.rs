use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use learn_core::Calculator;
use learn_core::model::{
    ChapterProgressView, ChapterStatus, LearningProgress, NextChapter, OverallProgress,
    TopicProgress, UserId,
};
use storage::repository::ProgressRepository;

use crate::Clock;
use crate::cache::ProgressCache;
use crate::error::ProgressServiceError;
use crate::merge::merge_progress;
use crate::request::{ProgressResponse, UpdateProgressRequest, validate_topic, validate_user};

/// Validates, merges and persists chapter progress, and shapes read responses.
///
/// The only component doing I/O. Concurrent writes to the same chapter are
/// last-write-wins: each call reads, merges and upserts without a version
/// check.
#[derive(Clone)]
pub struct ProgressService {
    clock: Clock,
    calculator: Arc<Calculator>,
    repo: Arc<dyn ProgressRepository>,
    cache: Arc<ProgressCache>,
}

impl ProgressService {
    #[must_use]
    pub fn new(clock: Clock, calculator: Calculator, repo: Arc<dyn ProgressRepository>) -> Self {
        Self {
            clock,
            calculator: Arc::new(calculator),
            repo,
            cache: Arc::new(ProgressCache::new()),
        }
    }

    //
    // ─── WRITES ────────────────────────────────────────────────────────────────
    //

    /// Merge a progress update into the stored chapter record and return the
    /// refreshed roll-ups.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Validation` before any repository call
    /// when the request is malformed.
    /// Returns `ProgressServiceError::Storage` if loading or persisting fails.
    pub async fn create_or_update_progress(
        &self,
        request: UpdateProgressRequest,
    ) -> Result<ProgressResponse, ProgressServiceError> {
        let update = request.validate(self.calculator.catalog())?;
        if update.force_sync {
            debug!(
                user_id = %update.user_id,
                topic = %update.topic,
                chapter = %update.chapter,
                "force_sync requested; merging as usual"
            );
        }

        let now = self.clock.now();
        let existing = self
            .repo
            .get(update.user_id, &update.topic, &update.chapter)
            .await?;
        let mut merged = merge_progress(existing, &update, now);
        let computed = self
            .calculator
            .chapter_status(&merged, update.estimated_seconds);
        // Completion is sticky once stamped, whatever estimate this write used.
        merged.status = if merged.completed_at.is_some() {
            ChapterStatus::Completed
        } else {
            computed
        };
        if merged.status.is_completed() && merged.completed_at.is_none() {
            merged.completed_at = Some(now);
        }

        debug!(
            user_id = %merged.user_id,
            topic = %merged.topic,
            chapter = %merged.chapter,
            status = %merged.status,
            read_duration = merged.read_duration,
            scroll_progress = merged.scroll_progress,
            "persisting merged progress"
        );
        self.repo.upsert(&merged).await?;
        self.cache.record(&merged);

        let records = self.load_user_records(merged.user_id).await?;
        let (overall, topics) = self.calculator.overall_progress(&records);
        let topic = topics
            .into_iter()
            .find(|t| t.id == merged.topic)
            .unwrap_or_else(|| self.calculator.empty_topic(&merged.topic));

        Ok(ProgressResponse {
            status: merged.status,
            overall,
            topic,
            read_duration: merged.read_duration,
            scroll_progress: merged.scroll_progress,
            last_position: merged.last_position,
        })
    }

    //
    // ─── READS ─────────────────────────────────────────────────────────────────
    //

    /// Account-wide roll-up plus per-topic summaries in display order.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Validation` for a zero user id.
    /// Returns `ProgressServiceError::Storage` if repository access fails.
    pub async fn get_overall_progress(
        &self,
        user_id: u64,
    ) -> Result<(OverallProgress, Vec<TopicProgress>), ProgressServiceError> {
        let user_id = validate_user(user_id)?;
        let records = self.load_user_records(user_id).await?;
        Ok(self.calculator.overall_progress(&records))
    }

    /// One topic's summary and its raw chapter records.
    ///
    /// The summary is zero-valued when the user has no records in the topic.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Validation` for a zero user id or an
    /// unsupported topic.
    /// Returns `ProgressServiceError::Storage` if repository access fails.
    pub async fn get_topic_progress(
        &self,
        user_id: u64,
        topic: &str,
    ) -> Result<(TopicProgress, Vec<LearningProgress>), ProgressServiceError> {
        let user_id = validate_user(user_id)?;
        let topic = validate_topic(self.calculator.catalog(), topic)?;
        let records = self.load_topic_records(user_id, &topic).await?;
        let summary = self.topic_summary(&topic, &records);
        Ok((summary, records))
    }

    /// Like `get_topic_progress`, with each chapter enriched for display.
    ///
    /// # Errors
    ///
    /// Same as `get_topic_progress`.
    pub async fn get_topic_chapters(
        &self,
        user_id: u64,
        topic: &str,
    ) -> Result<(TopicProgress, Vec<ChapterProgressView>), ProgressServiceError> {
        let (summary, records) = self.get_topic_progress(user_id, topic).await?;
        Ok((summary, self.enrich_chapters(&records)))
    }

    /// Every stored record of a user, most recently visited first.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Validation` for a zero user id.
    /// Returns `ProgressServiceError::Storage` if repository access fails.
    pub async fn list_by_user(
        &self,
        user_id: u64,
    ) -> Result<Vec<LearningProgress>, ProgressServiceError> {
        let user_id = validate_user(user_id)?;
        self.load_user_records(user_id).await
    }

    /// The first chapter the user has not completed, scanning topics by weight
    /// and chapters in catalog order.
    ///
    /// Returns `Ok(None)` once every catalog chapter is completed.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Validation` for a zero user id.
    /// Returns `ProgressServiceError::Storage` if repository access fails.
    pub async fn get_next_unfinished_chapter(
        &self,
        user_id: u64,
    ) -> Result<Option<NextChapter>, ProgressServiceError> {
        let user_id = validate_user(user_id)?;
        let records = self.load_user_records(user_id).await?;
        let seen: HashMap<(&str, &str), &LearningProgress> = records
            .iter()
            .map(|p| ((p.topic.as_str(), p.chapter.as_str()), p))
            .collect();

        let catalog = self.calculator.catalog();
        for topic in catalog.topics_by_weight() {
            for chapter in catalog.chapters(topic) {
                match seen.get(&(topic, chapter.as_str())) {
                    Some(record) if record.status.is_completed() => {}
                    Some(record) => {
                        return Ok(Some(NextChapter {
                            topic: topic.to_string(),
                            chapter: chapter.clone(),
                            status: record.status,
                            progress: record.scroll_progress.min(100),
                        }));
                    }
                    None => {
                        return Ok(Some(NextChapter {
                            topic: topic.to_string(),
                            chapter: chapter.clone(),
                            status: ChapterStatus::NotStarted,
                            progress: 0,
                        }));
                    }
                }
            }
        }
        Ok(None)
    }

    //
    // ─── RESPONSE SHAPING ──────────────────────────────────────────────────────
    //

    /// Attach a display percent to each record and align the display status
    /// with it. The input is left untouched and nothing is persisted.
    #[must_use]
    pub fn enrich_chapters(&self, records: &[LearningProgress]) -> Vec<ChapterProgressView> {
        records.iter().map(|record| self.enrich(record)).collect()
    }

    fn enrich(&self, record: &LearningProgress) -> ChapterProgressView {
        let estimate = self
            .calculator
            .estimated_seconds(&record.topic, &record.chapter)
            .max(1);
        let from_read = (u128::from(record.read_duration) * 100 / u128::from(estimate)).min(100);
        let from_read = u8::try_from(from_read).unwrap_or(100);
        let percent = record.scroll_progress.max(from_read).min(100);

        let mut view = record.clone();
        view.status = if percent >= 100 {
            ChapterStatus::Completed
        } else {
            self.calculator.chapter_status(record, Some(estimate))
        };
        ChapterProgressView {
            progress: view,
            percent,
        }
    }

    //
    // ─── LOADING ───────────────────────────────────────────────────────────────
    //

    async fn load_user_records(
        &self,
        user_id: UserId,
    ) -> Result<Vec<LearningProgress>, ProgressServiceError> {
        let records = self.repo.list_by_user(user_id).await?;
        if !records.is_empty() {
            return Ok(records);
        }
        let cached = self.cache.user_entries(user_id);
        if !cached.is_empty() {
            warn!(
                user_id = %user_id,
                cached = cached.len(),
                "repository returned no records; using cached progress"
            );
        }
        Ok(cached)
    }

    async fn load_topic_records(
        &self,
        user_id: UserId,
        topic: &str,
    ) -> Result<Vec<LearningProgress>, ProgressServiceError> {
        let records = self.repo.list_by_topic(user_id, topic).await?;
        if !records.is_empty() {
            return Ok(records);
        }
        let cached = self.cache.topic_entries(user_id, topic);
        if !cached.is_empty() {
            warn!(
                user_id = %user_id,
                topic,
                cached = cached.len(),
                "repository returned no topic records; using cached progress"
            );
        }
        Ok(cached)
    }

    fn topic_summary(&self, topic: &str, records: &[LearningProgress]) -> TopicProgress {
        let (_, topics) = self.calculator.overall_progress(records);
        topics
            .into_iter()
            .find(|t| t.id == topic)
            .unwrap_or_else(|| self.calculator.empty_topic(topic))
    }
}
