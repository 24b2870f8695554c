use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::catalog::Catalog;
use crate::model::{ChapterStatus, LearningProgress, OverallProgress, TopicProgress};
use crate::time::study_day;

//
// ─── SETTINGS ──────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum CalculatorSettingsError {
    #[error("completion fraction must be in (0, 1], got {0}")]
    InvalidCompletionFraction(f64),

    #[error("completed scroll threshold must be <= 100, got {0}")]
    InvalidScrollThreshold(u8),

    #[error("default estimate must be > 0 seconds")]
    InvalidDefaultEstimate,
}

/// Thresholds used by the chapter status rules.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalculatorSettings {
    completion_fraction: f64,
    completed_scroll_threshold: u8,
    default_estimate_secs: u64,
}

impl CalculatorSettings {
    /// Creates validated settings.
    ///
    /// # Errors
    ///
    /// Returns `CalculatorSettingsError` if the fraction is outside (0, 1],
    /// the scroll threshold exceeds 100, or the default estimate is zero.
    pub fn new(
        completion_fraction: f64,
        completed_scroll_threshold: u8,
        default_estimate_secs: u64,
    ) -> Result<Self, CalculatorSettingsError> {
        if !completion_fraction.is_finite()
            || completion_fraction <= 0.0
            || completion_fraction > 1.0
        {
            return Err(CalculatorSettingsError::InvalidCompletionFraction(
                completion_fraction,
            ));
        }
        if completed_scroll_threshold > 100 {
            return Err(CalculatorSettingsError::InvalidScrollThreshold(
                completed_scroll_threshold,
            ));
        }
        if default_estimate_secs == 0 {
            return Err(CalculatorSettingsError::InvalidDefaultEstimate);
        }
        Ok(Self {
            completion_fraction,
            completed_scroll_threshold,
            default_estimate_secs,
        })
    }

    /// Share of the estimated reading time a learner must spend.
    #[must_use]
    pub fn completion_fraction(&self) -> f64 {
        self.completion_fraction
    }

    #[must_use]
    pub fn completed_scroll_threshold(&self) -> u8 {
        self.completed_scroll_threshold
    }

    /// Estimate used when neither the caller nor the catalog provides one.
    #[must_use]
    pub fn default_estimate_secs(&self) -> u64 {
        self.default_estimate_secs
    }
}

impl Default for CalculatorSettings {
    fn default() -> Self {
        Self {
            completion_fraction: 0.8,
            completed_scroll_threshold: 90,
            default_estimate_secs: 600,
        }
    }
}

//
// ─── CALCULATOR ────────────────────────────────────────────────────────────────
//

/// Pure derivation of chapter status and topic/overall roll-ups.
///
/// Holds no mutable state; cloning is cheap since the catalog is shared.
#[derive(Debug, Clone)]
pub struct Calculator {
    catalog: Arc<Catalog>,
    settings: CalculatorSettings,
}

impl Calculator {
    #[must_use]
    pub fn new(catalog: Arc<Catalog>, settings: CalculatorSettings) -> Self {
        Self { catalog, settings }
    }

    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    #[must_use]
    pub fn settings(&self) -> &CalculatorSettings {
        &self.settings
    }

    /// Expected reading time for a chapter: catalog entry, else the default.
    #[must_use]
    pub fn estimated_seconds(&self, topic: &str, chapter: &str) -> u64 {
        self.catalog
            .estimated_seconds(topic, chapter)
            .unwrap_or(self.settings.default_estimate_secs)
    }

    /// Reading time required before a chapter may count as completed.
    #[must_use]
    pub fn needed_read_seconds(&self, estimate: u64) -> u64 {
        #[allow(
            clippy::cast_precision_loss,
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss
        )]
        let needed = (estimate as f64 * self.settings.completion_fraction).floor() as u64;
        if needed == 0 { estimate } else { needed }
    }

    /// Derive a chapter's status. Rules are checked in order, first match wins:
    ///
    /// 1. `completed`: quiz passed, scrolled past the threshold, read long enough
    /// 2. `tested`: scored but not passed
    /// 3. `in_progress`: any reading signal
    /// 4. `not_started`
    ///
    /// `estimated_seconds` overrides the catalog estimate when it is `Some(> 0)`.
    #[must_use]
    pub fn chapter_status(
        &self,
        progress: &LearningProgress,
        estimated_seconds: Option<u64>,
    ) -> ChapterStatus {
        let estimate = estimated_seconds
            .filter(|secs| *secs > 0)
            .unwrap_or_else(|| self.estimated_seconds(&progress.topic, &progress.chapter));
        let needed = self.needed_read_seconds(estimate);

        if progress.quiz_passed
            && progress.scroll_progress >= self.settings.completed_scroll_threshold
            && progress.read_duration >= needed
        {
            return ChapterStatus::Completed;
        }
        if progress.quiz_score > 0 && !progress.quiz_passed {
            return ChapterStatus::Tested;
        }
        if progress.has_activity() {
            return ChapterStatus::InProgress;
        }
        ChapterStatus::NotStarted
    }

    /// Roll records up into per-topic summaries and an overall summary.
    ///
    /// Topics are returned sorted by `sort_topics`. Only topics present in
    /// `records` contribute to the overall figures.
    #[must_use]
    pub fn overall_progress(
        &self,
        records: &[LearningProgress],
    ) -> (OverallProgress, Vec<TopicProgress>) {
        let mut by_topic: BTreeMap<&str, TopicAccumulator<'_>> = BTreeMap::new();
        let mut study_days = HashSet::new();
        let mut total_study_time = 0_u64;

        for record in records {
            by_topic
                .entry(record.topic.as_str())
                .or_default()
                .add(record);
            study_days.insert(study_day(record.last_visit_at));
            total_study_time = total_study_time.saturating_add(record.read_duration);
        }

        let mut topics = Vec::with_capacity(by_topic.len());
        let mut weighted_sum = 0_u64;
        let mut total_weight = 0_u64;
        let mut overall = OverallProgress {
            study_days: u32::try_from(study_days.len()).unwrap_or(u32::MAX),
            total_study_time,
            ..OverallProgress::default()
        };

        for (topic, acc) in by_topic {
            let summary = self.summarize(topic, &acc);
            weighted_sum += u64::from(summary.progress) * u64::from(summary.weight);
            total_weight += u64::from(summary.weight);
            overall.completed_chapters = overall
                .completed_chapters
                .saturating_add(summary.completed_chapters);
            overall.total_chapters = overall
                .total_chapters
                .saturating_add(summary.total_chapters);
            topics.push(summary);
        }

        let progress = if total_weight == 0 {
            weighted_sum
        } else {
            weighted_sum / total_weight
        };
        overall.progress = u8::try_from(progress.min(100)).unwrap_or(100);

        (overall, self.sort_topics(topics))
    }

    /// Zero-valued summary for a topic the user has no records in yet.
    #[must_use]
    pub fn empty_topic(&self, topic: &str) -> TopicProgress {
        TopicProgress {
            id: topic.to_string(),
            name: self.catalog.topic_name(topic).to_string(),
            weight: self.catalog.topic_weight(topic),
            progress: 0,
            completed_chapters: 0,
            total_chapters: self.catalog.chapter_total(topic),
            last_visit_at: None,
        }
    }

    /// Order topics by weight (descending), then catalog display order, then id.
    #[must_use]
    pub fn sort_topics(&self, mut topics: Vec<TopicProgress>) -> Vec<TopicProgress> {
        topics.sort_by(|a, b| self.compare_topics(a, b));
        topics
    }

    fn compare_topics(&self, a: &TopicProgress, b: &TopicProgress) -> Ordering {
        b.weight
            .cmp(&a.weight)
            .then_with(|| {
                self.catalog
                    .order_index(&a.id)
                    .cmp(&self.catalog.order_index(&b.id))
            })
            .then_with(|| a.id.cmp(&b.id))
    }

    fn summarize(&self, topic: &str, acc: &TopicAccumulator<'_>) -> TopicProgress {
        let observed = u32::try_from(acc.chapters.len()).unwrap_or(u32::MAX);
        let total = match self.catalog.chapter_total(topic) {
            0 if observed > 0 => observed,
            0 => 1,
            configured => configured,
        };
        let percent = (u64::from(acc.completed) * 100 / u64::from(total)).min(100);

        TopicProgress {
            id: topic.to_string(),
            name: self.catalog.topic_name(topic).to_string(),
            weight: self.catalog.topic_weight(topic),
            progress: u8::try_from(percent).unwrap_or(100),
            completed_chapters: acc.completed,
            total_chapters: total,
            last_visit_at: acc.latest_visit,
        }
    }
}

impl Default for Calculator {
    fn default() -> Self {
        Self::new(Arc::new(Catalog::builtin()), CalculatorSettings::default())
    }
}

#[derive(Default)]
struct TopicAccumulator<'a> {
    chapters: HashSet<&'a str>,
    completed: u32,
    latest_visit: Option<DateTime<Utc>>,
}

impl<'a> TopicAccumulator<'a> {
    fn add(&mut self, record: &'a LearningProgress) {
        self.chapters.insert(record.chapter.as_str());
        if record.status.is_completed() {
            self.completed = self.completed.saturating_add(1);
        }
        if self.latest_visit.is_none_or(|t| record.last_visit_at > t) {
            self.latest_visit = Some(record.last_visit_at);
        }
    }
}
