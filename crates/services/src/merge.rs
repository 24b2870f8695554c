use chrono::{DateTime, Utc};

use learn_core::model::{LearningProgress, MAX_READ_DURATION};

use crate::request::ValidatedUpdate;

/// Fold an update into the stored record, or into a fresh one when the user
/// has never touched the chapter.
///
/// Reading time accumulates, scroll keeps its maximum, and the quiz fields are
/// sticky. Status is left alone; the caller recomputes it.
#[must_use]
pub fn merge_progress(
    existing: Option<LearningProgress>,
    update: &ValidatedUpdate,
    now: DateTime<Utc>,
) -> LearningProgress {
    let mut merged = existing.unwrap_or_else(|| {
        LearningProgress::new(
            update.user_id,
            update.topic.as_str(),
            update.chapter.as_str(),
            now,
        )
    });

    merged.read_duration = merged
        .read_duration
        .saturating_add(update.read_delta)
        .min(MAX_READ_DURATION);
    merged.scroll_progress = merged.scroll_progress.max(update.scroll_progress).min(100);
    if !update.last_position.trim().is_empty() {
        merged.last_position.clone_from(&update.last_position);
    }
    if update.quiz_score > 0 {
        merged.quiz_score = update.quiz_score;
    }
    merged.quiz_passed |= update.quiz_passed;
    merged.last_visit_at = now;
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use learn_core::model::{ChapterStatus, UserId};
    use learn_core::time::fixed_now;
    use proptest::prelude::*;

    fn update(read: u64, scroll: u8) -> ValidatedUpdate {
        ValidatedUpdate {
            user_id: UserId::new(1),
            topic: "variables".into(),
            chapter: "storage".into(),
            read_delta: read,
            scroll_progress: scroll,
            last_position: String::new(),
            quiz_score: 0,
            quiz_passed: false,
            estimated_seconds: None,
            force_sync: false,
        }
    }

    #[test]
    fn first_write_starts_from_defaults() {
        let merged = merge_progress(None, &update(120, 40), fixed_now());
        assert_eq!(merged.user_id, UserId::new(1));
        assert_eq!(merged.read_duration, 120);
        assert_eq!(merged.scroll_progress, 40);
        assert_eq!(merged.status, ChapterStatus::NotStarted);
        assert_eq!(merged.first_visit_at, fixed_now());
        assert_eq!(merged.last_visit_at, fixed_now());
    }

    #[test]
    fn later_writes_accumulate_and_keep_sticky_fields() {
        let mut first = update(120, 70);
        first.last_position = "anchor-2".into();
        first.quiz_score = 85;
        first.quiz_passed = true;
        let stored = merge_progress(None, &first, fixed_now());

        let later = fixed_now() + Duration::minutes(10);
        let merged = merge_progress(Some(stored), &update(480, 30), later);

        assert_eq!(merged.read_duration, 600);
        assert_eq!(merged.scroll_progress, 70);
        assert_eq!(merged.last_position, "anchor-2");
        assert_eq!(merged.quiz_score, 85);
        assert!(merged.quiz_passed);
        assert_eq!(merged.first_visit_at, fixed_now());
        assert_eq!(merged.last_visit_at, later);
    }

    #[test]
    fn blank_position_does_not_overwrite() {
        let mut with_anchor = update(0, 0);
        with_anchor.last_position = "p-9".into();
        let stored = merge_progress(None, &with_anchor, fixed_now());

        let mut blank = update(0, 0);
        blank.last_position = "   ".into();
        let merged = merge_progress(Some(stored), &blank, fixed_now());
        assert_eq!(merged.last_position, "p-9");
    }

    #[test]
    fn read_duration_saturates_at_storable_maximum() {
        let huge = u64::try_from(i64::MAX).unwrap();
        let stored = merge_progress(None, &update(huge, 0), fixed_now());
        let merged = merge_progress(Some(stored), &update(huge, 0), fixed_now());
        assert_eq!(merged.read_duration, MAX_READ_DURATION);
        assert_eq!(merged.read_duration, huge);
    }

    proptest! {
        #[test]
        fn merged_counters_never_decrease(
            steps in prop::collection::vec((0_u64..10_000, 0_u8..=100, any::<bool>()), 1..20)
        ) {
            let mut current: Option<LearningProgress> = None;
            for (read, scroll, passed) in steps {
                let mut next = update(read, scroll);
                next.quiz_passed = passed;
                let before = current.clone();
                let merged = merge_progress(current, &next, fixed_now());
                if let Some(before) = before {
                    prop_assert_eq!(merged.read_duration, before.read_duration + read);
                    prop_assert!(merged.scroll_progress >= before.scroll_progress);
                    prop_assert!(merged.quiz_passed || !before.quiz_passed);
                }
                prop_assert!(merged.scroll_progress <= 100);
                current = Some(merged);
            }
        }
    }
}
