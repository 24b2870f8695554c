use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::UserId;

//
// ─── STATUS ────────────────────────────────────────────────────────────────────
//

/// Learning status of a single chapter, derived from reading and quiz signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChapterStatus {
    #[default]
    NotStarted,
    InProgress,
    Tested,
    Completed,
}

impl ChapterStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ChapterStatus::NotStarted => "not_started",
            ChapterStatus::InProgress => "in_progress",
            ChapterStatus::Tested => "tested",
            ChapterStatus::Completed => "completed",
        }
    }

    #[must_use]
    pub fn is_completed(self) -> bool {
        matches!(self, ChapterStatus::Completed)
    }
}

impl fmt::Display for ChapterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid chapter status: {0}")]
pub struct ParseStatusError(pub String);

impl FromStr for ChapterStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not_started" => Ok(ChapterStatus::NotStarted),
            "in_progress" => Ok(ChapterStatus::InProgress),
            "tested" => Ok(ChapterStatus::Tested),
            "completed" => Ok(ChapterStatus::Completed),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}

/// Largest accumulated reading time; the stores keep it in a signed 64-bit column.
pub const MAX_READ_DURATION: u64 = i64::MAX.unsigned_abs();

//
// ─── RECORD ────────────────────────────────────────────────────────────────────
//

/// Persisted progress of one user in one chapter.
///
/// Unique per `(user_id, topic, chapter)`. Counters only move forward through
/// merges: `read_duration` accumulates, `scroll_progress` keeps its maximum,
/// and the quiz fields are sticky.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningProgress {
    pub user_id: UserId,
    pub topic: String,
    pub chapter: String,
    pub status: ChapterStatus,
    /// Total seconds spent reading.
    pub read_duration: u64,
    /// Furthest scroll position seen, 0..=100.
    pub scroll_progress: u8,
    /// Opaque client anchor (e.g. a serialized scroll offset).
    pub last_position: String,
    pub quiz_score: u32,
    pub quiz_passed: bool,
    pub first_visit_at: DateTime<Utc>,
    pub last_visit_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl LearningProgress {
    /// A fresh, untouched record stamped with `now` as both first and last visit.
    #[must_use]
    pub fn new(
        user_id: UserId,
        topic: impl Into<String>,
        chapter: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            topic: topic.into(),
            chapter: chapter.into(),
            status: ChapterStatus::NotStarted,
            read_duration: 0,
            scroll_progress: 0,
            last_position: String::new(),
            quiz_score: 0,
            quiz_passed: false,
            first_visit_at: now,
            last_visit_at: now,
            completed_at: None,
        }
    }

    /// True if any reading signal has been recorded.
    #[must_use]
    pub fn has_activity(&self) -> bool {
        self.read_duration > 0 || self.scroll_progress > 0 || !self.last_position.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn status_string_roundtrip() {
        for status in [
            ChapterStatus::NotStarted,
            ChapterStatus::InProgress,
            ChapterStatus::Tested,
            ChapterStatus::Completed,
        ] {
            assert_eq!(status.as_str().parse::<ChapterStatus>().unwrap(), status);
        }
        assert!("done".parse::<ChapterStatus>().is_err());
    }

    #[test]
    fn new_record_is_not_started() {
        let now = fixed_now();
        let record = LearningProgress::new(UserId::new(7), "variables", "storage", now);
        assert_eq!(record.status, ChapterStatus::NotStarted);
        assert_eq!(record.first_visit_at, now);
        assert_eq!(record.last_visit_at, now);
        assert!(!record.has_activity());
        assert!(record.completed_at.is_none());
    }

    #[test]
    fn serializes_with_camel_case_and_snake_status() {
        let mut record =
            LearningProgress::new(UserId::new(7), "variables", "storage", fixed_now());
        record.status = ChapterStatus::InProgress;
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["userId"], 7);
        assert_eq!(json["status"], "in_progress");
        assert_eq!(json["scrollProgress"], 0);
    }
}
