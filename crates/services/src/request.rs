use serde::{Deserialize, Serialize};

use learn_core::ValidationError;
use learn_core::catalog::Catalog;
use learn_core::model::{ChapterStatus, OverallProgress, TopicProgress, UserId};

/// Partial progress update sent by a client.
///
/// `read_duration` is the delta since the previous update, not a total.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateProgressRequest {
    pub user_id: u64,
    pub topic: String,
    pub chapter: String,
    pub read_duration: i64,
    pub scroll_progress: i32,
    pub last_position: String,
    pub quiz_score: u32,
    pub quiz_passed: bool,
    /// Overrides the catalog reading estimate for the status decision.
    pub estimated_seconds: Option<u64>,
    /// Accepted for client compatibility; merge semantics are unchanged.
    pub force_sync: bool,
}

impl UpdateProgressRequest {
    #[must_use]
    pub fn new(user_id: u64, topic: impl Into<String>, chapter: impl Into<String>) -> Self {
        Self {
            user_id,
            topic: topic.into(),
            chapter: chapter.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn read(mut self, seconds: i64) -> Self {
        self.read_duration = seconds;
        self
    }

    #[must_use]
    pub fn scroll(mut self, percent: i32) -> Self {
        self.scroll_progress = percent;
        self
    }

    #[must_use]
    pub fn position(mut self, position: impl Into<String>) -> Self {
        self.last_position = position.into();
        self
    }

    #[must_use]
    pub fn quiz(mut self, score: u32, passed: bool) -> Self {
        self.quiz_score = score;
        self.quiz_passed = passed;
        self
    }

    #[must_use]
    pub fn estimate(mut self, seconds: u64) -> Self {
        self.estimated_seconds = Some(seconds);
        self
    }

    /// Check and normalize the request against `catalog`.
    ///
    /// Topic and chapter are trimmed; scroll positions above 100 are capped.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for a zero user id, an unsupported topic, an
    /// empty chapter, or a negative read duration or scroll position.
    pub fn validate(self, catalog: &Catalog) -> Result<ValidatedUpdate, ValidationError> {
        let user_id = validate_user(self.user_id)?;
        let topic = validate_topic(catalog, &self.topic)?;
        let chapter = self.chapter.trim();
        if chapter.is_empty() {
            return Err(ValidationError::EmptyChapter);
        }
        let read_delta = u64::try_from(self.read_duration)
            .map_err(|_| ValidationError::NegativeReadDuration(self.read_duration))?;
        if self.scroll_progress < 0 {
            return Err(ValidationError::NegativeScrollProgress(self.scroll_progress));
        }
        let scroll_progress = u8::try_from(self.scroll_progress.min(100)).unwrap_or(100);

        Ok(ValidatedUpdate {
            user_id,
            topic,
            chapter: chapter.to_string(),
            read_delta,
            scroll_progress,
            last_position: self.last_position,
            quiz_score: self.quiz_score,
            quiz_passed: self.quiz_passed,
            estimated_seconds: self.estimated_seconds.filter(|secs| *secs > 0),
            force_sync: self.force_sync,
        })
    }
}

/// A request that passed validation; fields are in domain units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedUpdate {
    pub user_id: UserId,
    pub topic: String,
    pub chapter: String,
    pub read_delta: u64,
    pub scroll_progress: u8,
    pub last_position: String,
    pub quiz_score: u32,
    pub quiz_passed: bool,
    pub estimated_seconds: Option<u64>,
    pub force_sync: bool,
}

pub(crate) fn validate_user(raw: u64) -> Result<UserId, ValidationError> {
    let user_id = UserId::new(raw);
    if user_id.is_valid() {
        Ok(user_id)
    } else {
        Err(ValidationError::MissingUser)
    }
}

pub(crate) fn validate_topic(catalog: &Catalog, raw: &str) -> Result<String, ValidationError> {
    let topic = raw.trim();
    if catalog.is_supported(topic) {
        Ok(topic.to_string())
    } else {
        Err(ValidationError::UnsupportedTopic(topic.to_string()))
    }
}

/// Result of a progress write: the chapter's new state plus fresh roll-ups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressResponse {
    pub status: ChapterStatus,
    pub overall: OverallProgress,
    pub topic: TopicProgress,
    pub read_duration: u64,
    pub scroll_progress: u8,
    pub last_position: String,
}

/// Overall roll-up with per-topic summaries in display order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressOverview {
    pub overall: OverallProgress,
    pub topics: Vec<TopicProgress>,
}

/// One topic's summary and its chapter entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicReport<C> {
    pub topic: TopicProgress,
    pub chapters: Vec<C>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_normalizes_input() {
        let catalog = Catalog::builtin();
        let update = UpdateProgressRequest::new(5, " variables ", " storage ")
            .read(30)
            .scroll(150)
            .estimate(0)
            .validate(&catalog)
            .unwrap();
        assert_eq!(update.user_id, UserId::new(5));
        assert_eq!(update.topic, "variables");
        assert_eq!(update.chapter, "storage");
        assert_eq!(update.read_delta, 30);
        assert_eq!(update.scroll_progress, 100);
        assert_eq!(update.estimated_seconds, None);
    }

    #[test]
    fn validation_rejects_bad_input() {
        let catalog = Catalog::builtin();
        let base = UpdateProgressRequest::new(1, "variables", "storage");

        let cases = [
            (
                UpdateProgressRequest { user_id: 0, ..base.clone() },
                ValidationError::MissingUser,
            ),
            (
                UpdateProgressRequest::new(1, "unknown_topic", "storage"),
                ValidationError::UnsupportedTopic("unknown_topic".into()),
            ),
            (
                UpdateProgressRequest::new(1, "variables", "   "),
                ValidationError::EmptyChapter,
            ),
            (base.clone().read(-1), ValidationError::NegativeReadDuration(-1)),
            (base.clone().scroll(-5), ValidationError::NegativeScrollProgress(-5)),
        ];

        for (request, expected) in cases {
            assert_eq!(request.validate(&catalog).unwrap_err(), expected);
        }
    }

    #[test]
    fn deserializes_camel_case_with_defaults() {
        let request: UpdateProgressRequest = serde_json::from_str(
            r#"{"userId": 9, "topic": "types", "chapter": "map", "readDuration": 45, "forceSync": true}"#,
        )
        .unwrap();
        assert_eq!(request.user_id, 9);
        assert_eq!(request.read_duration, 45);
        assert_eq!(request.scroll_progress, 0);
        assert!(request.force_sync);
        assert!(request.estimated_seconds.is_none());
    }
}
