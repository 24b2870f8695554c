use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::progress::{ChapterStatus, LearningProgress};

/// Roll-up of one topic for a single user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicProgress {
    pub id: String,
    pub name: String,
    pub weight: u32,
    /// Completed share of the topic, 0..=100.
    pub progress: u8,
    pub completed_chapters: u32,
    pub total_chapters: u32,
    pub last_visit_at: Option<DateTime<Utc>>,
}

/// Account-wide roll-up across every topic the user has touched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverallProgress {
    /// Weighted percentage, 0..=100.
    pub progress: u8,
    pub completed_chapters: u32,
    pub total_chapters: u32,
    pub study_days: u32,
    /// Seconds.
    pub total_study_time: u64,
}

/// Recommended chapter to continue with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NextChapter {
    pub topic: String,
    pub chapter: String,
    pub status: ChapterStatus,
    pub progress: u8,
}

/// Response-only view of a chapter: the record with a display status that
/// agrees with `percent`. Never written back to storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterProgressView {
    #[serde(flatten)]
    pub progress: LearningProgress,
    pub percent: u8,
}
